//! OS process control: identity, liveness probing and signal delivery.
use nix::{
    sys::signal::{self, Signal},
    unistd::{self, Pid},
};
use tracing::debug;

/// Capabilities the supervisor needs from the operating system.
pub trait ProcessControl {
    /// Pid of the calling process.
    fn current_pid(&self) -> i32;

    /// Whether `pid` names a running process. Never affects the target.
    fn exists(&self, pid: i32) -> bool;

    /// Delivers `signal` to `pid`.
    fn signal(&self, pid: i32, signal: Signal) -> nix::Result<()>;
}

/// [`ProcessControl`] backed by `kill(2)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsProcess;

impl ProcessControl for OsProcess {
    fn current_pid(&self) -> i32 {
        unistd::getpid().as_raw()
    }

    fn exists(&self, pid: i32) -> bool {
        match signal::kill(Pid::from_raw(pid), None) {
            Ok(()) => !is_zombie(pid),
            Err(err) => {
                debug!("Liveness check for pid {pid} failed: {err}");
                false
            }
        }
    }

    fn signal(&self, pid: i32, signal: Signal) -> nix::Result<()> {
        debug!("Sending {signal} to pid {pid}");
        signal::kill(Pid::from_raw(pid), signal)
    }
}

/// A zombie has exited and only awaits reaping, so it counts as dead.
#[cfg(target_os = "linux")]
fn is_zombie(pid: i32) -> bool {
    let Ok(stat) = std::fs::read_to_string(format!("/proc/{pid}/stat")) else {
        return false;
    };
    // The state is the first field after the parenthesised command name.
    stat.rfind(')')
        .and_then(|end| stat[end + 1..].trim_start().chars().next())
        .is_some_and(|state| state == 'Z' || state == 'X')
}

#[cfg(not(target_os = "linux"))]
fn is_zombie(_pid: i32) -> bool {
    false
}
