#[path = "common/mod.rs"]
mod common;

use std::{
    process::{Output, Stdio},
    sync::{Arc, Barrier},
    thread,
};

use common::{Install, is_process_alive, wait_for_file_value, wait_for_process_exit};
use predicates::str::contains;

fn started(output: &Output) -> Option<u32> {
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .find_map(|line| line.strip_prefix("INFO: Started as "))
        .and_then(|pid| pid.trim().parse().ok())
}

#[test]
fn concurrent_starts_spawn_exactly_one_worker() {
    let install = Arc::new(Install::new());
    let barrier = Arc::new(Barrier::new(2));

    let handles: Vec<_> = (0..2)
        .map(|_| {
            let install = Arc::clone(&install);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let mut command = install.std_launcher();
                command
                    .arg("start")
                    .stdout(Stdio::piped())
                    .stderr(Stdio::piped());
                barrier.wait();
                command.output().expect("failed to run start")
            })
        })
        .collect();

    let outputs: Vec<Output> = handles
        .into_iter()
        .map(|handle| handle.join().expect("start thread panicked"))
        .collect();

    let winners: Vec<u32> = outputs.iter().filter_map(started).collect();
    assert_eq!(winners.len(), 1, "outputs: {outputs:?}");
    let pid = winners[0];

    let loser = outputs
        .iter()
        .find(|output| started(output).is_none())
        .expect("one start must lose");
    assert_eq!(loser.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&loser.stderr);
    assert!(
        stderr.contains(&format!("ERROR: already running as {pid}")),
        "{stderr}"
    );

    wait_for_file_value(&install.pid_file(), &pid.to_string());
    assert!(is_process_alive(pid));

    install
        .launcher()
        .arg("stop")
        .assert()
        .success()
        .stdout(contains(format!("Stopped {pid}")));
    wait_for_process_exit(pid);
}

#[test]
fn concurrent_status_checks_agree() {
    let install = Arc::new(Install::new());

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let install = Arc::clone(&install);
            thread::spawn(move || {
                install
                    .std_launcher()
                    .arg("status")
                    .output()
                    .expect("failed to run status")
            })
        })
        .collect();

    for handle in handles {
        let output = handle.join().expect("status thread panicked");
        assert_eq!(output.status.code(), Some(3), "{output:?}");
    }
}
