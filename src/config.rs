//! Resolution and merging of the launcher's configuration sources.
//!
//! Paths come from explicit flags first and fall back to conventional
//! locations under the install, etc and data directories. Property sources
//! are parsed with [`crate::properties`] and merged by plain overwrite.
use std::{
    collections::HashMap,
    env,
    path::{Path, PathBuf},
};

use serde::Serialize;
use tracing::debug;

use crate::{
    cli::Cli,
    constants::{
        APP_PLUGIN_DIRS, DEFAULT_CONFIG, DEFAULT_ETC_DIR, DEFAULT_JVM_CONFIG,
        DEFAULT_LAUNCHER_CONFIG, DEFAULT_LAUNCHER_LOG, DEFAULT_LOG_LEVELS, DEFAULT_NODE_CONFIG,
        DEFAULT_PID_FILE, DEFAULT_SECRETS_CONFIG, DEFAULT_SERVER_LOG, NODE_DATA_DIR_KEY,
    },
    error::LauncherError,
    properties::{self, decode_env_property, parse_system_properties},
    runtime::{self, create_symlink, ensure_writable, require_dir, require_file},
};

/// Everything a lifecycle command needs to know about where things live.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Options {
    /// Print resolved options and the launch command.
    pub verbose: bool,
    /// Directory the launcher is installed in.
    pub install_path: PathBuf,
    /// Configuration directory.
    pub etc_dir: PathBuf,
    /// `launcher.properties`.
    pub launcher_config_path: PathBuf,
    /// `node.properties`, when present.
    pub node_config_path: Option<PathBuf>,
    /// `jvm.config`.
    pub jvm_config_path: PathBuf,
    /// Application config handed to the worker.
    pub config_path: PathBuf,
    /// Log levels file handed to the worker, when present.
    pub log_levels_file: Option<PathBuf>,
    /// Secrets config, when present.
    pub secrets_config_path: Option<PathBuf>,
    /// JVM installation, when not using `java` from `PATH`.
    pub jvm_dir: Option<PathBuf>,
    /// Working directory of the worker.
    pub data_dir: PathBuf,
    /// Lockable pid record.
    pub pid_file: PathBuf,
    /// Daemon-mode stdout/stderr of the worker.
    pub launcher_log: PathBuf,
    /// Daemon-mode application log.
    pub server_log: PathBuf,

    /// Parsed `launcher.properties`.
    pub launcher_config: HashMap<String, String>,
    /// Parsed `node.properties`.
    pub node_config: HashMap<String, String>,
    /// Logical lines of `jvm.config`.
    pub jvm_config: Vec<String>,
    /// `-J` options.
    pub jvm_options: Vec<String>,
    /// `-D` options overlaid with the node config.
    pub system_properties: HashMap<String, String>,
}

fn path_error(what: &'static str, path: &Path) -> impl FnOnce(std::io::Error) -> LauncherError {
    let path = path.to_path_buf();
    move |source| LauncherError::Path { what, path, source }
}

fn load_properties(
    what: &'static str,
    path: &Path,
) -> Result<HashMap<String, String>, LauncherError> {
    properties::load_file(path).map_err(|source| LauncherError::ConfigRead {
        what,
        path: path.to_path_buf(),
        source,
    })
}

/// Picks the explicit value or the default, and checks it exists as a file.
fn resolve_file(
    what: &'static str,
    explicit: Option<&PathBuf>,
    default: PathBuf,
) -> Result<PathBuf, LauncherError> {
    let path = explicit.cloned().unwrap_or(default);
    require_file(&path).map_err(path_error(what, &path))?;
    Ok(path)
}

/// An explicit file must exist; the default is used only if it does.
fn resolve_optional_file(
    what: &'static str,
    explicit: Option<&PathBuf>,
    default: PathBuf,
) -> Result<Option<PathBuf>, LauncherError> {
    match explicit {
        Some(path) => {
            require_file(path).map_err(path_error(what, path))?;
            Ok(Some(path.clone()))
        }
        None => Ok(require_file(&default).is_ok().then_some(default)),
    }
}

fn resolve_writable(
    what: &'static str,
    explicit: Option<&PathBuf>,
    default: PathBuf,
) -> Result<PathBuf, LauncherError> {
    let path = explicit.cloned().unwrap_or(default);
    ensure_writable(&path).map_err(path_error(what, &path))?;
    Ok(path)
}

fn resolve_jvm_dir(explicit: Option<&PathBuf>) -> Result<Option<PathBuf>, LauncherError> {
    let candidate = explicit.cloned().or_else(|| {
        env::var_os("JAVA_HOME")
            .filter(|value| !value.is_empty())
            .map(PathBuf::from)
    });
    let Some(jvm_dir) = candidate else {
        return Ok(None);
    };
    require_dir(&jvm_dir).map_err(path_error("JVM installation path is invalid:", &jvm_dir))?;
    let java = jvm_dir.join("bin/java");
    require_file(&java).map_err(path_error("JVM installation path is invalid:", &java))?;
    Ok(Some(jvm_dir))
}

impl Options {
    /// Resolves every path and loads every property source named by `cli`.
    pub fn resolve(cli: &Cli, install_path: &Path) -> Result<Self, LauncherError> {
        let etc_dir = cli
            .etc_dir
            .clone()
            .unwrap_or_else(|| install_path.join(DEFAULT_ETC_DIR));
        require_dir(&etc_dir).map_err(path_error("etc directory is missing:", &etc_dir))?;

        let launcher_config_path = resolve_file(
            "launcher config file is missing:",
            cli.launcher_config.as_ref(),
            install_path.join(DEFAULT_LAUNCHER_CONFIG),
        )?;
        let launcher_config = load_properties("launcher config file", &launcher_config_path)?;

        let node_config_path = resolve_optional_file(
            "node config file is missing:",
            cli.node_config.as_ref(),
            etc_dir.join(DEFAULT_NODE_CONFIG),
        )?;
        let node_config = match &node_config_path {
            Some(path) => load_properties("node config file", path)?,
            None => HashMap::new(),
        };

        let jvm_config_path = resolve_file(
            "JVM config file is missing:",
            cli.jvm_config.as_ref(),
            etc_dir.join(DEFAULT_JVM_CONFIG),
        )?;
        let jvm_config = properties::load_lines(&jvm_config_path).map_err(|source| {
            LauncherError::ConfigRead {
                what: "JVM config file",
                path: jvm_config_path.clone(),
                source,
            }
        })?;

        let config_path = resolve_file(
            "config file is missing:",
            cli.config.as_ref(),
            etc_dir.join(DEFAULT_CONFIG),
        )?;

        let secrets_config_path = resolve_optional_file(
            "secrets config file is missing:",
            cli.secrets_config.as_ref(),
            etc_dir.join(DEFAULT_SECRETS_CONFIG),
        )?;

        let log_levels_file = resolve_optional_file(
            "log levels file is missing:",
            cli.log_levels_file.as_ref(),
            etc_dir.join(DEFAULT_LOG_LEVELS),
        )?;

        let jvm_dir = resolve_jvm_dir(cli.jvm_dir.as_ref())?;

        let node_data_dir = node_config
            .get(NODE_DATA_DIR_KEY)
            .map(|value| decode_env_property(value))
            .transpose()?
            .filter(|value| !value.is_empty())
            .map(PathBuf::from);
        let data_dir = resolve_writable(
            "data dir is invalid:",
            cli.data_dir.as_ref().or(node_data_dir.as_ref()),
            install_path.to_path_buf(),
        )?;

        let pid_file = resolve_writable(
            "pid file is not writeable:",
            cli.pid_file.as_ref(),
            data_dir.join(DEFAULT_PID_FILE),
        )?;
        let launcher_log = resolve_writable(
            "launcher log is not writeable:",
            cli.launcher_log_file.as_ref(),
            data_dir.join(DEFAULT_LAUNCHER_LOG),
        )?;
        let server_log = resolve_writable(
            "server log is not writeable:",
            cli.server_log_file.as_ref(),
            data_dir.join(DEFAULT_SERVER_LOG),
        )?;

        let mut system_properties = parse_system_properties(&cli.system_properties)?;
        system_properties.extend(
            node_config
                .iter()
                .map(|(key, value)| (key.clone(), value.clone())),
        );

        let options = Self {
            verbose: cli.verbose,
            install_path: install_path.to_path_buf(),
            etc_dir,
            launcher_config_path,
            node_config_path,
            jvm_config_path,
            config_path,
            log_levels_file,
            secrets_config_path,
            jvm_dir,
            data_dir,
            pid_file,
            launcher_log,
            server_log,
            launcher_config,
            node_config,
            jvm_config,
            jvm_options: cli.jvm_options.clone(),
            system_properties,
        };
        debug!("Resolved options: {:?}", options);
        Ok(options)
    }

    /// Pretty JSON dump for `--verbose`.
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|err| format!("{{\"error\": \"{err}\"}}"))
    }

    /// Links `etc` and the plugin directories into the data directory so
    /// relative references such as `etc/log.properties` keep working from the
    /// worker's cwd. Missing sources are skipped.
    pub fn create_app_symlinks(&self) -> Result<(), LauncherError> {
        let data_etc = self.data_dir.join(DEFAULT_ETC_DIR);
        if self.etc_dir != data_etc {
            create_symlink(&self.etc_dir, &data_etc).map_err(path_error(
                "failed to symlink the etc dir inside the data dir:",
                &data_etc,
            ))?;
        }

        if self.install_path != self.data_dir {
            for dir in APP_PLUGIN_DIRS {
                let link = self.data_dir.join(dir);
                create_symlink(&self.install_path.join(dir), &link).map_err(path_error(
                    "failed to symlink a plugin dir inside the data dir:",
                    &link,
                ))?;
            }
        }

        Ok(())
    }

    /// Creates the data directory.
    pub fn make_data_dir(&self) -> Result<(), LauncherError> {
        runtime::make_dirs(&self.data_dir)
            .map_err(path_error("failed to create the data dir", &self.data_dir))
    }

    /// Creates the directory holding the launcher log.
    pub fn make_launcher_log_dir(&self) -> Result<(), LauncherError> {
        match self.launcher_log.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => runtime::make_dirs(dir)
                .map_err(path_error("failed to create the launcher log dir", dir)),
            _ => Ok(()),
        }
    }
}
