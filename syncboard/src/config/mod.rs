//! Configuration for the Syncboard demo.
//!
//! Supports layered configuration with the following priority (highest first):
//! 1. CLI arguments
//! 2. Environment variables (via clap `env` attribute)
//! 3. TOML config file (`~/.config/syncboard/config.toml`)
//! 4. Compiled defaults
//!
//! Missing config file is not an error (defaults are used). An explicit
//! `--config` path that doesn't exist is an error.

use std::path::PathBuf;
use std::time::Duration;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadFile {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to parse the TOML configuration.
    #[error("failed to parse config file: {0}")]
    ParseToml(#[from] toml::de::Error),
}

// ---------------------------------------------------------------------------
// TOML file structs (all fields Option for partial overrides)
// ---------------------------------------------------------------------------

/// Top-level TOML config file structure.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ConfigFile {
    board: BoardFileConfig,
    demo: DemoFileConfig,
}

/// `[board]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct BoardFileConfig {
    poll_interval_secs: Option<u64>,
    notice_buffer: Option<usize>,
    topic_capacity: Option<usize>,
}

/// `[demo]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct DemoFileConfig {
    admin: Option<String>,
    employee: Option<String>,
}

// ---------------------------------------------------------------------------
// Resolved configuration (concrete types, all fields populated)
// ---------------------------------------------------------------------------

/// Fully resolved demo configuration.
#[derive(Debug, Clone)]
pub struct BoardConfig {
    /// Interval between full snapshot reloads.
    pub poll_interval: Duration,
    /// Buffer size for each client's notice channel.
    pub notice_buffer: usize,
    /// Per-subscriber frame buffer of the event topic.
    pub topic_capacity: usize,
    /// Directory name of the admin session.
    pub admin_name: String,
    /// Directory name of the employee session.
    pub employee_name: String,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(15),
            notice_buffer: 32,
            topic_capacity: 256,
            admin_name: "Morgan".to_string(),
            employee_name: "Alex".to_string(),
        }
    }
}

impl BoardConfig {
    /// Load configuration by merging CLI args, env vars, and a TOML file.
    ///
    /// If `--config` is given and the file does not exist, returns an
    /// error. If no `--config` is given, the default path
    /// (`~/.config/syncboard/config.toml`) is tried and silently ignored
    /// if missing.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the config file cannot be read or
    /// parsed.
    pub fn load(cli: &CliArgs) -> Result<Self, ConfigError> {
        let file = load_config_file(cli.config.as_deref())?;
        Ok(Self::resolve(cli, &file))
    }

    /// Resolve a `BoardConfig` from CLI args and a parsed config file.
    ///
    /// Priority: CLI > file > default. This is separated from `load()` to
    /// enable unit testing without CLI parsing.
    #[must_use]
    fn resolve(cli: &CliArgs, file: &ConfigFile) -> Self {
        let defaults = Self::default();

        Self {
            poll_interval: cli
                .poll_interval_secs
                .or(file.board.poll_interval_secs)
                .map_or(defaults.poll_interval, Duration::from_secs),
            notice_buffer: file.board.notice_buffer.unwrap_or(defaults.notice_buffer),
            topic_capacity: file.board.topic_capacity.unwrap_or(defaults.topic_capacity),
            admin_name: file.demo.admin.clone().unwrap_or(defaults.admin_name),
            employee_name: cli
                .employee
                .clone()
                .or_else(|| file.demo.employee.clone())
                .unwrap_or(defaults.employee_name),
        }
    }
}

/// CLI arguments parsed by clap.
#[derive(clap::Parser, Debug, Default)]
#[command(version, about = "Shared task board with live client synchronization")]
pub struct CliArgs {
    /// Seconds between full snapshot reloads.
    #[arg(long, env = "SYNCBOARD_POLL_SECS")]
    pub poll_interval_secs: Option<u64>,

    /// Directory name of the employee session for the demo.
    #[arg(long, env = "SYNCBOARD_EMPLOYEE")]
    pub employee: Option<String>,

    /// Path to config file (default: `~/.config/syncboard/config.toml`).
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Log level filter (trace, debug, info, warn, error).
    #[arg(long, default_value = "info", env = "SYNCBOARD_LOG")]
    pub log_level: String,

    /// Path to log file (default: log to stderr).
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

/// Load and parse a TOML config file.
///
/// If `explicit_path` is `Some`, the file must exist (error if not).
/// If `explicit_path` is `None`, the default path is tried and missing file
/// is treated as empty config.
fn load_config_file(explicit_path: Option<&std::path::Path>) -> Result<ConfigFile, ConfigError> {
    let path = if let Some(p) = explicit_path {
        let contents = std::fs::read_to_string(p).map_err(|e| ConfigError::ReadFile {
            path: p.to_path_buf(),
            source: e,
        })?;
        return Ok(toml::from_str(&contents)?);
    } else {
        let Some(config_dir) = dirs::config_dir() else {
            // No config dir available; use defaults.
            return Ok(ConfigFile::default());
        };
        config_dir.join("syncboard").join("config.toml")
    };

    match std::fs::read_to_string(&path) {
        Ok(contents) => Ok(toml::from_str(&contents)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ConfigFile::default()),
        Err(e) => Err(ConfigError::ReadFile { path, source: e }),
    }
}
