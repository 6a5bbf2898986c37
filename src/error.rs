//! Error handling for the launcher.
use std::{io, path::PathBuf, time::Duration};

use thiserror::Error;

/// Defines all fatal errors a launcher invocation can hit.
#[derive(Debug, Error)]
pub enum LauncherError {
    /// A property source could not be read or decoded.
    #[error("could not read {what} {path:?}: {source}")]
    ConfigRead {
        /// Which configuration source failed (e.g. "launcher config").
        what: &'static str,
        /// Path of the source.
        path: PathBuf,
        /// The underlying parse or read error.
        #[source]
        source: PropertiesError,
    },

    /// A required key is absent from a property file.
    #[error("there is no property named {key} in {path:?}")]
    MissingProperty {
        /// The key that was looked up.
        key: String,
        /// The file that was searched.
        path: PathBuf,
    },

    /// A `${ENV:...}` value is not closed.
    #[error("malformed property {0}, does not end with }}")]
    MalformedEnvProperty(String),

    /// A `${ENV:...}` value names a variable that is not set.
    #[error("could not find environment variable: {0}")]
    MissingEnvironmentVariable(String),

    /// A `-D` argument lacks a `=`.
    #[error("property is malformed: {0}")]
    MalformedSystemProperty(String),

    /// A `-D` argument sets a key that has its own flag.
    #[error("cannot specify {key} using -D option (use {flag})")]
    ReservedSystemProperty {
        /// The rejected key.
        key: String,
        /// The flag that must be used instead.
        flag: &'static str,
    },

    /// A file or directory is missing, unreadable or not writable.
    #[error("{what} {path:?}: {source}")]
    Path {
        /// Human-readable description of the path's role.
        what: &'static str,
        /// The offending path.
        path: PathBuf,
        /// The underlying error that occurred.
        #[source]
        source: io::Error,
    },

    /// Error for the PID file.
    #[error(transparent)]
    PidFile(#[from] PidFileError),

    /// Another live process owns the PID file.
    #[error("already running as {0}")]
    AlreadyRunning(i32),

    /// The detached child could not be spawned.
    #[error("failed to fork the current process: {0}")]
    Detach(#[source] io::Error),

    /// Standard streams could not be redirected.
    #[error("failed to redirect the {stream}: {source}")]
    Redirect {
        /// The stream(s) being redirected.
        stream: &'static str,
        /// The underlying error that occurred.
        #[source]
        source: io::Error,
    },

    /// Replacing the process image with the worker failed.
    #[error("failed to exec {program:?}: {source}")]
    Exec {
        /// Program that was being executed.
        program: PathBuf,
        /// The underlying error that occurred.
        #[source]
        source: io::Error,
    },

    /// A signal could not be delivered for a reason other than the target being gone.
    #[error("signaling pid {pid} failed due to: {source}")]
    Signal {
        /// Target pid.
        pid: i32,
        /// Errno reported by `kill(2)`.
        #[source]
        source: nix::errno::Errno,
    },

    /// The worker outlived the optional `--stop-timeout`.
    #[error("pid {pid} did not exit within {}s", timeout.as_secs())]
    StopTimeout {
        /// Target pid.
        pid: i32,
        /// The configured bound.
        timeout: Duration,
    },

    /// The command word is not recognised.
    #[error("unknown command: {0}")]
    UnknownCommand(String),

    /// No command word was given.
    #[error("no command given")]
    MissingCommand,
}

/// Error type for the legacy property format.
#[derive(Debug, Error)]
pub enum PropertiesError {
    /// A `\u` escape is not followed by four hex digits.
    #[error("malformed \\uxxxx encoding")]
    MalformedEscape,

    /// The underlying reader failed.
    #[error("{0}")]
    Io(#[from] io::Error),
}

/// Error type for PID file operations.
#[derive(Debug, Error)]
pub enum PidFileError {
    /// The PID file (or its directory) could not be opened.
    #[error("failed to open pid file {path:?}: {source}")]
    Open {
        /// PID file path.
        path: PathBuf,
        /// The underlying error that occurred.
        #[source]
        source: io::Error,
    },

    /// Acquiring the advisory lock failed.
    #[error("failed to lock pid file {path:?}: {source}")]
    Lock {
        /// PID file path.
        path: PathBuf,
        /// The underlying error that occurred.
        #[source]
        source: io::Error,
    },

    /// Releasing the advisory lock failed.
    #[error("failed to unlock pid file {path:?}: {source}")]
    Unlock {
        /// PID file path.
        path: PathBuf,
        /// The underlying error that occurred.
        #[source]
        source: io::Error,
    },

    /// Reading the PID file failed.
    #[error("failed to read pid file: {0}")]
    Read(#[source] io::Error),

    /// Writing or truncating the PID file failed.
    #[error("failed to write pid file: {0}")]
    Write(#[source] io::Error),

    /// The PID file holds no pid.
    #[error("pid file is empty")]
    Empty,

    /// The PID file holds something other than a positive integer.
    #[error("pid file contains an invalid pid: {0:?}")]
    Invalid(String),
}
