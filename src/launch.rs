//! Assembly of the worker's command line.
use std::{path::PathBuf, process::Command};

use serde::Serialize;

use crate::{config::Options, constants::MAIN_CLASS_KEY, error::LauncherError};

/// Program and arguments the worker is started with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LaunchCommand {
    /// `JVM_DIR/bin/java`, or `java` looked up on `PATH`.
    pub program: PathBuf,
    /// Arguments after the program.
    pub args: Vec<String>,
}

impl LaunchCommand {
    /// Builds the command for `options`. `daemon` adds the server log location.
    pub fn build(options: &Options, daemon: bool) -> Result<Self, LauncherError> {
        let main_class = options
            .launcher_config
            .get(MAIN_CLASS_KEY)
            .ok_or_else(|| LauncherError::MissingProperty {
                key: MAIN_CLASS_KEY.to_string(),
                path: options.launcher_config_path.clone(),
            })?;

        let program = options
            .jvm_dir
            .as_ref()
            .map(|dir| dir.join("bin/java"))
            .unwrap_or_else(|| PathBuf::from("java"));

        let mut args = options.jvm_config.clone();
        args.extend(options.jvm_options.iter().cloned());

        let mut properties: Vec<_> = options.system_properties.iter().collect();
        properties.sort();
        args.extend(
            properties
                .into_iter()
                .map(|(key, value)| format!("-D{key}={value}")),
        );

        args.push(format!("-Dconfig={}", options.config_path.display()));
        if daemon {
            args.push(format!("-Dlog.output-file={}", options.server_log.display()));
        }
        if let Some(levels) = &options.log_levels_file
            && levels.is_file()
        {
            args.push(format!("-Dlog.levels-file={}", levels.display()));
        }

        args.push("-cp".to_string());
        args.push(format!("{}/*", options.install_path.join("lib").display()));
        args.push(main_class.clone());

        Ok(Self { program, args })
    }

    /// A `std::process::Command` ready to spawn or exec.
    pub fn to_command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command.args(&self.args);
        command
    }
}
