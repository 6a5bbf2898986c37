//! Operator-facing console output and diagnostic logging setup.
use std::{
    env,
    io::{self, IsTerminal, Write},
};

use crossterm::style::Stylize;
use tracing_subscriber::EnvFilter;

use crate::cli::LogLevelArg;

/// Filter used when neither `--log-level` nor `RUST_LOG` is set.
const DEFAULT_FILTER: &str = "warn";

/// Installs the `tracing` subscriber. Diagnostics go to stderr so stdout stays
/// reserved for `INFO:` lines.
pub fn init_logging(level: Option<LogLevelArg>) {
    let filter = if let Some(level) = level {
        EnvFilter::new(level.as_str())
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn format_info(message: &str, color: bool) -> String {
    if color {
        format!("{}: {}", "INFO".green().bold(), message.cyan())
    } else {
        format!("INFO: {message}")
    }
}

fn format_error(message: &str, color: bool) -> String {
    if color {
        format!("{}: {}", "ERROR".red().bold(), message.yellow())
    } else {
        format!("ERROR: {message}")
    }
}

fn use_color(stream: &impl IsTerminal) -> bool {
    stream.is_terminal() && env::var_os("NO_COLOR").is_none_or(|value| value.is_empty())
}

/// Prints `INFO: message` on stdout.
pub fn print_info(message: &str) {
    let mut stdout = io::stdout().lock();
    let line = format_info(message, use_color(&stdout));
    let _ = writeln!(stdout, "{line}");
}

/// Prints `ERROR: message` on stderr.
pub fn print_error(message: &str) {
    let mut stderr = io::stderr().lock();
    let line = format_error(message, use_color(&stderr));
    let _ = writeln!(stderr, "{line}");
}
