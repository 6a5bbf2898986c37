//! Command-line interface for the launcher.
use std::{path::PathBuf, str::FromStr};

use clap::{Arg, CommandFactory, Parser};
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter, EnumString, IntoStaticStr};
use tracing::level_filters::LevelFilter;

use crate::error::LauncherError;

/// Wrapper around `LevelFilter` so clap can parse log levels from either
/// string names ("info", "debug", etc.) or numeric shorthands (0-5).
#[derive(Clone, Copy, Debug)]
pub struct LogLevelArg(LevelFilter);

impl LogLevelArg {
    /// String representation suitable for `RUST_LOG`.
    pub fn as_str(&self) -> &'static str {
        match self.0 {
            LevelFilter::OFF => "off",
            LevelFilter::ERROR => "error",
            LevelFilter::WARN => "warn",
            LevelFilter::INFO => "info",
            LevelFilter::DEBUG => "debug",
            LevelFilter::TRACE => "trace",
        }
    }
}

impl FromStr for LogLevelArg {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err("log level cannot be empty".into());
        }

        if let Ok(number) = trimmed.parse::<u8>() {
            let level = match number {
                0 => LevelFilter::OFF,
                1 => LevelFilter::ERROR,
                2 => LevelFilter::WARN,
                3 => LevelFilter::INFO,
                4 => LevelFilter::DEBUG,
                5 => LevelFilter::TRACE,
                _ => {
                    return Err(format!(
                        "unsupported log level number '{number}' (expected 0-5)"
                    ));
                }
            };

            return Ok(LogLevelArg(level));
        }

        let lowercase = trimmed.to_ascii_lowercase();
        let level = match lowercase.as_str() {
            "off" => Some(LevelFilter::OFF),
            "error" | "err" => Some(LevelFilter::ERROR),
            "warn" | "warning" => Some(LevelFilter::WARN),
            "info" | "information" => Some(LevelFilter::INFO),
            "debug" => Some(LevelFilter::DEBUG),
            "trace" => Some(LevelFilter::TRACE),
            _ => None,
        }
        .ok_or_else(|| format!("invalid log level '{trimmed}'"))?;

        Ok(LogLevelArg(level))
    }
}

/// Lifecycle commands understood by the launcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter, EnumString, IntoStaticStr)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Command {
    /// Run the worker in the foreground.
    Run,
    /// Start the worker as a daemon.
    Start,
    /// Stop the worker with SIGTERM.
    Stop,
    /// Stop, then start.
    Restart,
    /// Stop the worker with SIGKILL.
    Kill,
    /// Report whether the worker is running.
    Status,
    /// Print usage.
    Help,
    /// Anything else.
    #[strum(disabled)]
    Unknown,
}

impl Command {
    /// Names accepted on the command line.
    pub fn names() -> Vec<&'static str> {
        Command::iter()
            .filter(|command| *command != Command::Unknown)
            .map(|command| command.into())
            .collect()
    }
}

/// Command-line interface for the launcher.
#[derive(Parser, Debug, Default)]
#[command(name = "launcher", version)]
#[command(
    about = "Starts, stops and monitors a single long-running worker process",
    long_about = None,
    after_help = "Commands: run, start, stop, restart, kill, status, help"
)]
pub struct Cli {
    /// Override the logging verbosity for this invocation only.
    #[arg(long, value_name = "LEVEL")]
    pub log_level: Option<LogLevelArg>,

    /// Verbose output.
    #[arg(short, long)]
    pub verbose: bool,

    /// Defaults to INSTALL_PATH/etc.
    #[arg(long, value_name = "DIR")]
    pub etc_dir: Option<PathBuf>,

    /// Defaults to INSTALL_PATH/bin/launcher.properties.
    #[arg(long, value_name = "FILE")]
    pub launcher_config: Option<PathBuf>,

    /// Defaults to ETC_DIR/node.properties.
    #[arg(long, value_name = "FILE")]
    pub node_config: Option<PathBuf>,

    /// Defaults to ETC_DIR/jvm.config.
    #[arg(long, value_name = "FILE")]
    pub jvm_config: Option<PathBuf>,

    /// Defaults to ETC_DIR/config.properties.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Defaults to ETC_DIR/secrets.toml.
    #[arg(long, value_name = "FILE")]
    pub secrets_config: Option<PathBuf>,

    /// Defaults to ETC_DIR/log.properties.
    #[arg(long, value_name = "FILE")]
    pub log_levels_file: Option<PathBuf>,

    /// JVM installation directory (defaults to JAVA_HOME).
    #[arg(long, value_name = "DIR")]
    pub jvm_dir: Option<PathBuf>,

    /// Defaults to INSTALL_PATH.
    #[arg(long, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    /// Defaults to DATA_DIR/var/run/launcher.pid.
    #[arg(long, value_name = "FILE")]
    pub pid_file: Option<PathBuf>,

    /// Defaults to DATA_DIR/var/log/launcher.log (only in daemon mode).
    #[arg(long, value_name = "FILE")]
    pub launcher_log_file: Option<PathBuf>,

    /// Defaults to DATA_DIR/var/log/server.log (only in daemon mode).
    #[arg(long, value_name = "FILE")]
    pub server_log_file: Option<PathBuf>,

    /// Give up waiting for the worker to exit after this many seconds (stop, kill, restart).
    #[arg(long, value_name = "SECONDS")]
    pub stop_timeout: Option<u64>,

    /// Sets a JVM option. Can be used multiple times.
    #[arg(short = 'J', value_name = "OPTION", allow_hyphen_values = true)]
    pub jvm_options: Vec<String>,

    /// Sets a system property. Can be used multiple times.
    #[arg(short = 'D', value_name = "KEY=VALUE")]
    pub system_properties: Vec<String>,

    /// The command to execute.
    #[arg(value_name = "COMMAND")]
    pub command: Vec<String>,
}

impl Cli {
    /// Decodes the positional command word.
    pub fn parse_command(&self) -> Result<Command, LauncherError> {
        match self.command.as_slice() {
            [] => Err(LauncherError::MissingCommand),
            [word] => word
                .parse()
                .map_err(|_| LauncherError::UnknownCommand(word.clone())),
            words => Err(LauncherError::UnknownCommand(words.join(" "))),
        }
    }
}

/// Parses command-line arguments and returns a `Cli` struct.
pub fn parse_args() -> Cli {
    Cli::parse()
}

fn takes_value(cli: &clap::Command, matches: impl Fn(&Arg) -> bool) -> bool {
    cli.get_arguments()
        .any(|arg| matches(arg) && arg.get_action().takes_values())
}

/// Position of the command word in `args`, skipping flags and the values they consume.
fn command_index<S: AsRef<str>>(args: &[S]) -> Option<usize> {
    let cli = <Cli as CommandFactory>::command();

    let mut index = 0;
    while index < args.len() {
        let arg = args[index].as_ref();
        if arg == "--" {
            return (index + 1 < args.len()).then_some(index + 1);
        }

        if let Some(long) = arg.strip_prefix("--") {
            if !long.contains('=') && takes_value(&cli, |flag| flag.get_long() == Some(long)) {
                index += 1;
            }
        } else if let Some(shorts) = arg.strip_prefix('-')
            && !shorts.is_empty()
        {
            // A value-taking short flag swallows the rest of its cluster, or the next word.
            for (offset, short) in shorts.char_indices() {
                if takes_value(&cli, |flag| flag.get_short() == Some(short)) {
                    if offset + short.len_utf8() == shorts.len() {
                        index += 1;
                    }
                    break;
                }
            }
        } else {
            return Some(index);
        }
        index += 1;
    }
    None
}

/// Rewrites an invocation so a detached child re-entering it starts instead of restarting.
///
/// Only the command word changes; flag values that happen to read `restart` are kept.
pub fn rewrite_args<S: AsRef<str>>(args: &[S]) -> Vec<String> {
    let mut rewritten: Vec<String> = args.iter().map(|arg| arg.as_ref().to_string()).collect();
    if let Some(index) = command_index(args)
        && rewritten[index].parse::<Command>() == Ok(Command::Restart)
    {
        rewritten[index] = Command::Start.to_string();
    }
    rewritten
}
