#[path = "common/mod.rs"]
mod common;

use std::fs;

use common::Install;
use predicates::{boolean::PredicateBooleanExt, str::contains};

#[test]
fn status_on_a_never_written_record_exits_three() {
    let install = Install::new();

    install
        .launcher()
        .arg("status")
        .assert()
        .code(3)
        .stdout(contains("INFO: Not running"));

    assert!(install.pid_file().exists());
    assert_eq!(fs::read_to_string(install.pid_file()).unwrap(), "");
}

#[test]
fn status_ignores_garbage_and_dead_records() {
    let install = Install::new();
    fs::create_dir_all(install.pid_file().parent().unwrap()).unwrap();

    for content in ["not-a-pid\n", "-4\n", "999999999\n"] {
        fs::write(install.pid_file(), content).unwrap();
        install
            .launcher()
            .arg("status")
            .assert()
            .code(3)
            .stdout(contains("Not running"));
    }
}

#[test]
fn status_reports_a_live_recorded_process() {
    let install = Install::new();
    fs::create_dir_all(install.pid_file().parent().unwrap()).unwrap();
    let pid = std::process::id();
    fs::write(install.pid_file(), format!("{pid}\n")).unwrap();

    install
        .launcher()
        .arg("status")
        .assert()
        .success()
        .stdout(contains(format!("INFO: Running as {pid}")));

    fs::write(install.pid_file(), "").unwrap();
}

#[test]
fn signed_pid_records_are_not_running() {
    let install = Install::new();
    fs::create_dir_all(install.pid_file().parent().unwrap()).unwrap();
    let pid = std::process::id();
    fs::write(install.pid_file(), format!("+{pid}\n")).unwrap();

    install
        .launcher()
        .arg("status")
        .assert()
        .code(3)
        .stdout(contains("Not running"));

    fs::write(install.pid_file(), "").unwrap();
}

#[test]
fn explicit_pid_file_is_used() {
    let install = Install::new();
    let pid_file = install.root.join("custom/launcher.pid");

    install
        .launcher()
        .arg("--pid-file")
        .arg(&pid_file)
        .arg("status")
        .assert()
        .code(3);

    assert!(pid_file.exists());
    assert!(!install.pid_file().exists());
}

#[test]
fn stop_on_a_never_written_record_succeeds() {
    let install = Install::new();

    install
        .launcher()
        .arg("stop")
        .assert()
        .success()
        .stdout(contains("Not running"))
        .stderr(contains("ERROR").not());
}
