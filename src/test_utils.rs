use std::{
    path::PathBuf,
    sync::{Mutex, OnceLock},
};

/// Global lock for process-wide state touched by tests.
/// Tests that modify environment variables or the working directory should acquire
/// this lock to prevent race conditions between parallel test executions.
pub static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

pub fn env_lock() -> std::sync::MutexGuard<'static, ()> {
    ENV_LOCK
        .get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Restores the working directory when dropped.
pub struct CwdGuard {
    previous: PathBuf,
}

impl CwdGuard {
    pub fn new() -> Self {
        Self {
            previous: std::env::current_dir().expect("current dir"),
        }
    }
}

impl Default for CwdGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for CwdGuard {
    fn drop(&mut self) {
        let _ = std::env::set_current_dir(&self.previous);
    }
}
