//! Detaching from the invoking session and handing the process over to the worker.
use std::{
    env,
    fs::File,
    io,
    os::unix::{io::AsRawFd, process::CommandExt},
    path::Path,
    process::{Command, Stdio},
};

use tracing::debug;

use crate::{error::LauncherError, launch::LaunchCommand, runtime::open_append};

/// Process-level operations used to become (or start) a daemon.
pub trait Daemonizer {
    /// Re-invokes the launcher with `args` in a new session rooted at `cwd`
    /// and returns the child's pid without waiting for it.
    fn detach(&self, args: &[String], cwd: &Path) -> io::Result<i32>;

    /// Appends stdout and stderr to `log`.
    fn redirect_output(&self, log: &Path) -> Result<(), LauncherError>;

    /// Points stdin at the null device.
    fn redirect_stdin_to_null(&self) -> Result<(), LauncherError>;

    /// Replaces the current process image. Only returns on failure.
    fn exec(&self, command: &LaunchCommand) -> LauncherError;
}

/// [`Daemonizer`] that re-executes the current binary instead of forking.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReexecDaemonizer;

fn dup_onto(file: &File, targets: &[libc::c_int]) -> io::Result<()> {
    let fd = file.as_raw_fd();
    for &target in targets {
        if unsafe { libc::dup2(fd, target) } < 0 {
            return Err(io::Error::last_os_error());
        }
    }
    Ok(())
}

impl Daemonizer for ReexecDaemonizer {
    fn detach(&self, args: &[String], cwd: &Path) -> io::Result<i32> {
        let executable = env::current_exe()?;
        let mut command = Command::new(&executable);
        command
            .args(args)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        unsafe {
            command.pre_exec(|| {
                if libc::setsid() < 0 {
                    return Err(io::Error::last_os_error());
                }
                Ok(())
            });
        }

        debug!("Detaching {:?} with args {:?} in {:?}", executable, args, cwd);
        let child = command.spawn()?;
        Ok(child.id() as i32)
    }

    fn redirect_output(&self, log: &Path) -> Result<(), LauncherError> {
        let redirect_error = |source| LauncherError::Redirect {
            stream: "stdout and stderr",
            source,
        };
        let file = open_append(log).map_err(redirect_error)?;
        dup_onto(&file, &[libc::STDOUT_FILENO, libc::STDERR_FILENO]).map_err(redirect_error)
    }

    fn redirect_stdin_to_null(&self) -> Result<(), LauncherError> {
        let redirect_error = |source| LauncherError::Redirect {
            stream: "stdin",
            source,
        };
        let devnull = File::open("/dev/null").map_err(redirect_error)?;
        dup_onto(&devnull, &[libc::STDIN_FILENO]).map_err(redirect_error)
    }

    fn exec(&self, command: &LaunchCommand) -> LauncherError {
        debug!("Executing {:?} {:?}", command.program, command.args);
        let source = command.to_command().exec();
        LauncherError::Exec {
            program: command.program.clone(),
            source,
        }
    }
}
