//! Lifecycle commands for the single supervised worker.
//!
//! Each invocation runs exactly one command against the PID file, which is
//! passed in explicitly as a [`PidRecord`]. Process probing and daemonization
//! sit behind [`ProcessControl`] and [`Daemonizer`].
use std::{
    env,
    path::{Path, PathBuf},
    thread,
    time::{Duration, Instant},
};

use nix::{errno::Errno, sys::signal::Signal};
use tracing::{debug, info, warn};

use crate::{
    cli::{Command, rewrite_args},
    config::Options,
    constants::STOP_POLL_INTERVAL,
    daemon::{Daemonizer, ReexecDaemonizer},
    error::LauncherError,
    launch::LaunchCommand,
    pidfile::{PidRecord, ProcessState},
    process::{OsProcess, ProcessControl},
};

/// What a lifecycle command did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// A detached worker was started.
    Started(i32),
    /// The worker exited after SIGTERM.
    Stopped(i32),
    /// The worker exited after SIGKILL.
    Killed(i32),
    /// The previous worker (if any) was stopped and a new one started.
    Restarted {
        /// Pid that was stopped.
        previous: Option<i32>,
        /// Pid of the new worker.
        current: i32,
    },
    /// The worker is alive.
    Running(i32),
    /// No live worker is recorded.
    NotRunning,
}

impl Outcome {
    /// Line printed for the operator.
    pub fn message(&self) -> String {
        match self {
            Outcome::Started(pid) => format!("Started as {pid}"),
            Outcome::Stopped(pid) => format!("Stopped {pid}"),
            Outcome::Killed(pid) => format!("Killed {pid}"),
            Outcome::Restarted { current, .. } => format!("Started as {current}"),
            Outcome::Running(pid) => format!("Running as {pid}"),
            Outcome::NotRunning => "Not running".to_string(),
        }
    }
}

/// Drives one lifecycle command against the PID file.
pub struct Supervisor<C = OsProcess, D = ReexecDaemonizer> {
    options: Options,
    control: C,
    daemonizer: D,
    args: Vec<String>,
    poll_interval: Duration,
    stop_timeout: Option<Duration>,
}

impl Supervisor {
    /// Supervisor backed by the real OS. `args` is the launcher's own command
    /// line (without the program name), reused when detaching.
    pub fn new(options: Options, args: Vec<String>) -> Self {
        Self::with_parts(options, OsProcess, ReexecDaemonizer, args)
    }
}

impl<C: ProcessControl, D: Daemonizer> Supervisor<C, D> {
    /// Supervisor with explicit process and daemon capabilities.
    pub fn with_parts(options: Options, control: C, daemonizer: D, args: Vec<String>) -> Self {
        Self {
            options,
            control,
            daemonizer,
            args,
            poll_interval: STOP_POLL_INTERVAL,
            stop_timeout: None,
        }
    }

    /// Bounds how long stop and kill wait for the worker to exit.
    pub fn with_stop_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.stop_timeout = timeout;
        self
    }

    /// Overrides the liveness polling interval.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Resolved options this supervisor acts on.
    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Runs `command`. `help` and unknown words are handled by the caller.
    pub fn execute<P: PidRecord>(
        &self,
        command: Command,
        pid_file: &mut P,
    ) -> Result<Outcome, LauncherError> {
        debug!("Executing {:?}", command);
        match command {
            Command::Run => self.run(pid_file),
            Command::Start => self.start(pid_file),
            Command::Stop => self.stop(pid_file),
            Command::Restart => self.restart(pid_file),
            Command::Kill => self.kill(pid_file),
            Command::Status => Ok(self.status(pid_file)),
            Command::Help | Command::Unknown => Err(LauncherError::UnknownCommand(
                format!("{command:?}").to_lowercase(),
            )),
        }
    }

    /// Fails if a process other than this one owns the record.
    fn ensure_not_running<P: PidRecord>(&self, pid_file: &mut P) -> Result<bool, LauncherError> {
        match pid_file.state(&self.control) {
            ProcessState::RecordedAndAlive(pid) if pid == self.control.current_pid() => Ok(true),
            ProcessState::RecordedAndAlive(pid) => Err(LauncherError::AlreadyRunning(pid)),
            ProcessState::RecordedButDead(pid) => {
                debug!("Ignoring stale pid {pid}");
                Ok(false)
            }
            ProcessState::NoRecord => Ok(false),
        }
    }

    fn enter_data_dir(&self) -> Result<(), LauncherError> {
        env::set_current_dir(&self.options.data_dir).map_err(|source| LauncherError::Path {
            what: "failed to change to the data dir",
            path: self.options.data_dir.clone(),
            source,
        })
    }

    /// Runs the worker in the foreground by replacing this process.
    ///
    /// Only returns if the worker could not be started.
    pub fn run<P: PidRecord>(&self, pid_file: &mut P) -> Result<Outcome, LauncherError> {
        self.ensure_not_running(pid_file)?;

        self.options.make_data_dir()?;
        self.options.create_app_symlinks()?;
        self.enter_data_dir()?;
        let command = LaunchCommand::build(&self.options, false)?;

        pid_file.write_pid(self.control.current_pid())?;
        self.daemonizer.redirect_stdin_to_null()?;

        Err(self.daemonizer.exec(&command))
    }

    /// Starts the worker as a daemon.
    ///
    /// The invoking launcher detaches a copy of itself and records the copy's
    /// pid. The copy recognises its own pid in the record and execs the worker
    /// with output appended to the launcher log.
    pub fn start<P: PidRecord>(&self, pid_file: &mut P) -> Result<Outcome, LauncherError> {
        let is_child = self.ensure_not_running(pid_file)?;

        self.options.make_data_dir()?;
        self.options.create_app_symlinks()?;
        self.options.make_launcher_log_dir()?;
        let original_cwd = env::current_dir().map_err(|source| LauncherError::Path {
            what: "cannot determine the working directory",
            path: PathBuf::from("."),
            source,
        })?;
        self.enter_data_dir()?;
        let command = LaunchCommand::build(&self.options, true)?;

        if is_child {
            debug!("Recognised own pid in the record; launching the worker");
            self.daemonizer.redirect_output(&self.options.launcher_log)?;
            return Err(self.daemonizer.exec(&command));
        }

        self.spawn_detached(pid_file, &original_cwd)
    }

    fn spawn_detached<P: PidRecord>(
        &self,
        pid_file: &mut P,
        cwd: &Path,
    ) -> Result<Outcome, LauncherError> {
        pid_file.acquire_lock()?;

        // Another start may have won between the first check and the lock.
        if let Ok(pid) = pid_file.read_pid()
            && self.control.exists(pid)
        {
            pid_file.release_lock()?;
            return Err(LauncherError::AlreadyRunning(pid));
        }

        let args = rewrite_args(&self.args);
        let pid = match self.daemonizer.detach(&args, cwd) {
            Ok(pid) => pid,
            Err(err) => {
                pid_file.release_lock()?;
                return Err(LauncherError::Detach(err));
            }
        };

        pid_file.write_pid(pid)?;
        info!("Detached worker launcher as pid {pid}");
        Ok(Outcome::Started(pid))
    }

    /// Sends `signal` to a live worker and waits for it to exit.
    ///
    /// Returns `None` when nothing was running.
    fn terminate<P: PidRecord>(
        &self,
        pid_file: &mut P,
        signal: Signal,
    ) -> Result<Option<i32>, LauncherError> {
        let ProcessState::RecordedAndAlive(pid) = pid_file.state(&self.control) else {
            return Ok(None);
        };

        match self.control.signal(pid, signal) {
            Ok(()) => {}
            Err(Errno::ESRCH) => warn!("Pid {pid} exited before {signal} was delivered"),
            Err(source) => return Err(LauncherError::Signal { pid, source }),
        }

        let started = Instant::now();
        while pid_file.alive(&self.control) {
            if let Some(timeout) = self.stop_timeout
                && started.elapsed() >= timeout
            {
                return Err(LauncherError::StopTimeout { pid, timeout });
            }
            thread::sleep(self.poll_interval);
        }

        pid_file.clear_pid()?;
        Ok(Some(pid))
    }

    /// Stops the worker with SIGTERM.
    pub fn stop<P: PidRecord>(&self, pid_file: &mut P) -> Result<Outcome, LauncherError> {
        Ok(self
            .terminate(pid_file, Signal::SIGTERM)?
            .map_or(Outcome::NotRunning, Outcome::Stopped))
    }

    /// Stops the worker with SIGKILL.
    pub fn kill<P: PidRecord>(&self, pid_file: &mut P) -> Result<Outcome, LauncherError> {
        Ok(self
            .terminate(pid_file, Signal::SIGKILL)?
            .map_or(Outcome::NotRunning, Outcome::Killed))
    }

    /// Stops the worker if it is running, then starts a new one.
    pub fn restart<P: PidRecord>(&self, pid_file: &mut P) -> Result<Outcome, LauncherError> {
        let previous = self.terminate(pid_file, Signal::SIGTERM)?;
        match self.start(pid_file)? {
            Outcome::Started(current) => Ok(Outcome::Restarted { previous, current }),
            other => Ok(other),
        }
    }

    /// Reports whether the worker is alive.
    pub fn status<P: PidRecord>(&self, pid_file: &mut P) -> Outcome {
        match pid_file.state(&self.control) {
            ProcessState::RecordedAndAlive(pid) => Outcome::Running(pid),
            _ => Outcome::NotRunning,
        }
    }
}
