//! Launcher is a small lifecycle manager for a single long-running JVM worker.
//! It resolves the worker's configuration from legacy property files, starts it
//! in the foreground or as a daemon, and stops, kills or reports on it through
//! a lockable PID file shared by every invocation.

/// CLI interface.
pub mod cli;

/// Configuration resolution.
pub mod config;

/// Shared constants.
pub mod constants;

/// Daemonization.
pub mod daemon;

/// Error handling.
pub mod error;

/// Worker command line.
pub mod launch;

/// Console output and logging.
pub mod logs;

/// PID file and its advisory lock.
pub mod pidfile;

/// OS process probing and signalling.
pub mod process;

/// Legacy property file parsing.
pub mod properties;

/// Filesystem helpers.
pub mod runtime;

/// Lifecycle commands.
pub mod supervisor;

#[cfg(test)]
mod test_utils;
