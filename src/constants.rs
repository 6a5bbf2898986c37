//! Constants and default locations used throughout the launcher.
//!
//! Relative paths are joined onto the install, etc or data directory at
//! resolution time.

use std::time::Duration;

// ============================================================================
// Exit Codes
// ============================================================================

/// LSB "program is not running" status. Package managers rely on it during
/// uninstallation, so `status` must return exactly this value.
pub const LSB_NOT_RUNNING: i32 = 3;

/// Exit code for every fatal error.
pub const EXIT_FAILURE: i32 = 1;

// ============================================================================
// Process Control
// ============================================================================

/// Interval between liveness checks while waiting for a signalled worker to exit.
pub const STOP_POLL_INTERVAL: Duration = Duration::from_millis(100);

// ============================================================================
// Default Locations
// ============================================================================

/// Etc directory, relative to the install path.
pub const DEFAULT_ETC_DIR: &str = "etc";

/// Launcher config, relative to the install path.
pub const DEFAULT_LAUNCHER_CONFIG: &str = "bin/launcher.properties";

/// Node config, relative to the etc directory.
pub const DEFAULT_NODE_CONFIG: &str = "node.properties";

/// JVM config, relative to the etc directory.
pub const DEFAULT_JVM_CONFIG: &str = "jvm.config";

/// Application config, relative to the etc directory.
pub const DEFAULT_CONFIG: &str = "config.properties";

/// Log levels file, relative to the etc directory.
pub const DEFAULT_LOG_LEVELS: &str = "log.properties";

/// Secrets config, relative to the etc directory.
pub const DEFAULT_SECRETS_CONFIG: &str = "secrets.toml";

/// Install directories linked into a separate data directory.
pub const APP_PLUGIN_DIRS: [&str; 2] = ["plugin", "secrets-plugin"];

/// PID file, relative to the data directory.
pub const DEFAULT_PID_FILE: &str = "var/run/launcher.pid";

/// Launcher log (daemon mode only), relative to the data directory.
pub const DEFAULT_LAUNCHER_LOG: &str = "var/log/launcher.log";

/// Server log (daemon mode only), relative to the data directory.
pub const DEFAULT_SERVER_LOG: &str = "var/log/server.log";

// ============================================================================
// Property Keys
// ============================================================================

/// Node config key overriding the data directory.
pub const NODE_DATA_DIR_KEY: &str = "node.data-dir";

/// Launcher config key naming the worker's entry point.
pub const MAIN_CLASS_KEY: &str = "main-class";

/// Prefix of a value that is resolved from the environment.
pub const ENV_PROPERTY_PREFIX: &str = "${ENV:";

/// Suffix closing an environment indirection.
pub const ENV_PROPERTY_SUFFIX: &str = "}";

/// System properties that may not be set with `-D`, paired with the flag to use instead.
pub const RESERVED_SYSTEM_PROPERTIES: [(&str, &str); 3] = [
    ("config", "--config"),
    ("log.output-file", "--server-log-file"),
    ("log.levels-file", "--log-levels-file"),
];
