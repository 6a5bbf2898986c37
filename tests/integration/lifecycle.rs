#[path = "common/mod.rs"]
mod common;

use std::{fs, process::Stdio, thread, time::Duration};

use common::{
    Install, is_process_alive, started_pid, wait_for_file_value, wait_for_path,
    wait_for_process_exit,
};
use predicates::str::contains;

#[test]
fn start_status_stop_round_trip() {
    let install = Install::new();

    let output = install
        .launcher()
        .arg("start")
        .output()
        .expect("failed to run start");
    assert!(output.status.success(), "start failed: {output:?}");
    let pid = started_pid(&output.stdout);

    wait_for_file_value(&install.pid_file(), &pid.to_string());
    assert!(is_process_alive(pid));

    install
        .launcher()
        .arg("status")
        .assert()
        .success()
        .stdout(contains(format!("INFO: Running as {pid}")));

    let args_file = install.root.join("worker.args");
    wait_for_path(&args_file);
    wait_for_path(&install.root.join("worker.cwd"));
    let cwd = fs::read_to_string(install.root.join("worker.cwd")).unwrap();
    assert_eq!(
        std::path::Path::new(cwd.trim()).canonicalize().unwrap(),
        install.root.canonicalize().unwrap()
    );
    let args = fs::read_to_string(&args_file).unwrap();
    assert!(args.contains("-Dnode.environment=test"), "{args}");
    assert!(args.contains("-Dlog.output-file="), "{args}");
    assert!(args.trim_end().ends_with("com.example.Server"), "{args}");
    assert!(install.launcher_log().exists());

    install
        .launcher()
        .arg("stop")
        .assert()
        .success()
        .stdout(contains(format!("INFO: Stopped {pid}")));

    wait_for_process_exit(pid);
    assert_eq!(fs::read_to_string(install.pid_file()).unwrap(), "");

    install
        .launcher()
        .arg("status")
        .assert()
        .code(3)
        .stdout(contains("INFO: Not running"));
}

#[test]
fn kill_ends_a_started_worker() {
    let install = Install::new();

    let output = install.launcher().arg("start").output().unwrap();
    assert!(output.status.success(), "start failed: {output:?}");
    let pid = started_pid(&output.stdout);
    wait_for_path(&install.root.join("worker.args"));

    install
        .launcher()
        .arg("kill")
        .assert()
        .success()
        .stdout(contains(format!("INFO: Killed {pid}")));

    wait_for_process_exit(pid);
    assert_eq!(install.recorded_pid(), None);
}

#[test]
fn restart_replaces_the_worker() {
    let install = Install::new();

    let output = install.launcher().arg("start").output().unwrap();
    assert!(output.status.success(), "start failed: {output:?}");
    let first = started_pid(&output.stdout);
    wait_for_path(&install.root.join("worker.args"));

    let output = install.launcher().arg("restart").output().unwrap();
    assert!(output.status.success(), "restart failed: {output:?}");
    let second = started_pid(&output.stdout);

    assert_ne!(first, second);
    wait_for_process_exit(first);
    wait_for_file_value(&install.pid_file(), &second.to_string());
    assert!(is_process_alive(second));

    install.launcher().arg("stop").assert().success();
    wait_for_process_exit(second);
}

#[test]
fn restart_when_nothing_runs_just_starts() {
    let install = Install::new();

    let output = install.launcher().arg("restart").output().unwrap();
    assert!(output.status.success(), "restart failed: {output:?}");
    let pid = started_pid(&output.stdout);
    wait_for_file_value(&install.pid_file(), &pid.to_string());

    install.launcher().arg("stop").assert().success();
    wait_for_process_exit(pid);
}

#[test]
fn run_keeps_the_worker_in_the_foreground() {
    let install = Install::new();

    let mut child = install
        .std_launcher()
        .arg("run")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .expect("failed to spawn run");
    let pid = child.id();

    wait_for_file_value(&install.pid_file(), &pid.to_string());
    wait_for_path(&install.root.join("worker.cwd"));

    let args = fs::read_to_string(install.root.join("worker.args")).unwrap();
    assert!(!args.contains("-Dlog.output-file="), "{args}");

    install
        .launcher()
        .arg("status")
        .assert()
        .success()
        .stdout(contains(format!("Running as {pid}")));

    install
        .launcher()
        .arg("start")
        .assert()
        .failure()
        .stderr(contains(format!("ERROR: already running as {pid}")));

    install
        .launcher()
        .arg("stop")
        .assert()
        .success()
        .stdout(contains(format!("Stopped {pid}")));

    let status = child.wait().expect("failed to reap worker");
    assert!(!status.success());
}

#[test]
fn stop_with_stale_record_is_tolerated() {
    let install = Install::new();
    fs::create_dir_all(install.pid_file().parent().unwrap()).unwrap();
    fs::write(install.pid_file(), "999999999\n").unwrap();

    install
        .launcher()
        .arg("stop")
        .assert()
        .success()
        .stdout(contains("INFO: Not running"));

    install
        .launcher()
        .arg("kill")
        .assert()
        .success()
        .stdout(contains("INFO: Not running"));
}

#[test]
fn stop_timeout_gives_up_on_a_stubborn_worker() {
    let install = Install::new();
    fs::write(
        install.root.join("jvm/bin/java"),
        "#!/bin/sh\ntrap '' TERM\npwd > worker.cwd\nwhile true; do sleep 1; done\n",
    )
    .unwrap();

    let output = install.launcher().arg("start").output().unwrap();
    assert!(output.status.success(), "start failed: {output:?}");
    let pid = started_pid(&output.stdout);
    wait_for_path(&install.root.join("worker.cwd"));
    // Give the shell time to install its trap.
    thread::sleep(Duration::from_millis(200));

    install
        .launcher()
        .args(["--stop-timeout", "1", "stop"])
        .assert()
        .failure()
        .stderr(contains(format!("pid {pid} did not exit within 1s")));
    assert!(is_process_alive(pid));

    install.launcher().arg("kill").assert().success();
    wait_for_process_exit(pid);
}
