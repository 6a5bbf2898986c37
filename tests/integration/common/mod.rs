#![allow(dead_code)]

use std::{
    fs,
    os::unix::fs::PermissionsExt,
    path::{Path, PathBuf},
    thread,
    time::{Duration, Instant},
};

use assert_cmd::Command;
use sysinfo::{Pid, ProcessStatus, ProcessesToUpdate, System};
use tempfile::{TempDir, tempdir};

/// Stand-in for `bin/java`: records its arguments and working directory, then idles.
const FAKE_JAVA: &str = r#"#!/bin/sh
printf '%s\n' "$@" > worker.args
pwd > worker.cwd
exec sleep 30
"#;

/// A relocatable install tree holding a copy of the launcher binary.
///
/// ```text
/// INSTALL/bin/launcher
/// INSTALL/bin/launcher.properties
/// INSTALL/etc/{jvm.config,config.properties,node.properties}
/// INSTALL/jvm/bin/java
/// ```
pub struct Install {
    _temp: TempDir,
    pub root: PathBuf,
}

impl Install {
    pub fn new() -> Self {
        let temp = tempdir().expect("failed to create tempdir");
        let root = temp.path().join("install");

        fs::create_dir_all(root.join("bin")).expect("failed to create bin dir");
        fs::create_dir_all(root.join("etc")).expect("failed to create etc dir");
        fs::create_dir_all(root.join("jvm/bin")).expect("failed to create jvm dir");

        fs::copy(
            assert_cmd::cargo::cargo_bin!("launcher"),
            root.join("bin/launcher"),
        )
        .expect("failed to copy launcher binary");

        fs::write(
            root.join("bin/launcher.properties"),
            "main-class=com.example.Server\n",
        )
        .expect("failed to write launcher.properties");
        fs::write(root.join("etc/jvm.config"), "-server\n-Xmx16m\n")
            .expect("failed to write jvm.config");
        fs::write(root.join("etc/config.properties"), "http-server.http.port=0\n")
            .expect("failed to write config.properties");
        fs::write(
            root.join("etc/node.properties"),
            "node.environment=test\nnode.id=integration\n",
        )
        .expect("failed to write node.properties");

        let java = root.join("jvm/bin/java");
        fs::write(&java, FAKE_JAVA).expect("failed to write fake java");
        fs::set_permissions(&java, fs::Permissions::from_mode(0o755))
            .expect("failed to make fake java executable");

        Self { _temp: temp, root }
    }

    pub fn launcher_path(&self) -> PathBuf {
        self.root.join("bin/launcher")
    }

    /// Launcher invocation with the fake JVM selected.
    pub fn launcher(&self) -> Command {
        let mut command = Command::new(self.launcher_path());
        command
            .current_dir(&self.root)
            .env_remove("JAVA_HOME")
            .env_remove("RUST_LOG")
            .env("NO_COLOR", "1")
            .arg("--jvm-dir")
            .arg(self.root.join("jvm"));
        command
    }

    /// Same as [`Install::launcher`] for callers that need to spawn without waiting.
    pub fn std_launcher(&self) -> std::process::Command {
        let mut command = std::process::Command::new(self.launcher_path());
        command
            .current_dir(&self.root)
            .env_remove("JAVA_HOME")
            .env_remove("RUST_LOG")
            .env("NO_COLOR", "1")
            .arg("--jvm-dir")
            .arg(self.root.join("jvm"));
        command
    }

    pub fn pid_file(&self) -> PathBuf {
        self.root.join("var/run/launcher.pid")
    }

    pub fn launcher_log(&self) -> PathBuf {
        self.root.join("var/log/launcher.log")
    }

    pub fn recorded_pid(&self) -> Option<u32> {
        fs::read_to_string(self.pid_file())
            .ok()
            .and_then(|content| content.trim().parse().ok())
    }

    /// Kills whatever the record points at so a failed test leaves nothing behind.
    pub fn cleanup(&self) {
        if let Some(pid) = self.recorded_pid()
            && pid != std::process::id()
            && is_process_alive(pid)
        {
            let _ = force_kill(pid);
        }
    }
}

impl Drop for Install {
    fn drop(&mut self) {
        self.cleanup();
    }
}

fn force_kill(pid: u32) -> std::io::Result<std::process::ExitStatus> {
    std::process::Command::new("kill")
        .arg("-9")
        .arg(pid.to_string())
        .status()
}

pub fn is_process_alive(pid: u32) -> bool {
    let mut system = System::new();
    system.refresh_processes(ProcessesToUpdate::All, true);
    system
        .process(Pid::from_u32(pid))
        .is_some_and(|process| process.status() != ProcessStatus::Zombie)
}

pub fn wait_for_path(path: &Path) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if path.exists() {
            return;
        }
        thread::sleep(Duration::from_millis(100));
    }
    panic!("Timed out waiting for {:?} to exist", path);
}

pub fn wait_for_file_value(path: &Path, expected: &str) {
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        if let Ok(content) = fs::read_to_string(path)
            && content.trim() == expected
        {
            return;
        }

        if Instant::now() >= deadline {
            panic!("Timed out waiting for value '{}' in {:?}", expected, path);
        }

        thread::sleep(Duration::from_millis(100));
    }
}

pub fn wait_for_process_exit(pid: u32) {
    let deadline = Instant::now() + Duration::from_secs(10);
    while Instant::now() < deadline {
        if !is_process_alive(pid) {
            return;
        }
        thread::sleep(Duration::from_millis(100));
    }
    panic!("Timed out waiting for PID {} to exit", pid);
}

/// Extracts the pid from an `INFO: Started as <pid>` line.
pub fn started_pid(stdout: &[u8]) -> u32 {
    let stdout = String::from_utf8_lossy(stdout);
    stdout
        .lines()
        .find_map(|line| line.strip_prefix("INFO: Started as "))
        .and_then(|pid| pid.trim().parse().ok())
        .unwrap_or_else(|| panic!("no start line in {stdout:?}"))
}
