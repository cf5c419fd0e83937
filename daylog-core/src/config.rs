//! Configuration loading and management
//!
//! Configuration is loaded from `~/.config/daylog/config.toml`
//!
//! This module follows the XDG Base Directory Specification:
//! - Config: `$XDG_CONFIG_HOME/daylog/` (~/.config/daylog/)
//! - Data: `$XDG_DATA_HOME/daylog/` (~/.local/share/daylog/)
//! - State/Logs: `$XDG_STATE_HOME/daylog/` (~/.local/state/daylog/)

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::PathBuf;

/// Largest window (in days) accepted for recent stats and moving averages.
pub const MAX_WINDOW_DAYS: u32 = 3650;

/// Returns a best-effort home directory path.
fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Returns XDG_CONFIG_HOME or ~/.config
fn xdg_config_home() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"))
}

/// Returns XDG_DATA_HOME or ~/.local/share
fn xdg_data_home() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/share"))
}

/// Returns XDG_STATE_HOME or ~/.local/state
fn xdg_state_home() -> PathBuf {
    std::env::var("XDG_STATE_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/state"))
}

/// Main configuration struct
#[derive(Debug, Deserialize)]
pub struct Config {
    /// Owner identity used when a command does not name one
    #[serde(default = "default_owner")]
    pub owner: String,

    /// Statistics configuration
    #[serde(default)]
    pub stats: StatsConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            owner: default_owner(),
            stats: StatsConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

fn default_owner() -> String {
    "local".to_string()
}

/// Statistics configuration
#[derive(Debug, Deserialize, Clone)]
pub struct StatsConfig {
    /// Window sizes (days) for the recent numeric stats
    #[serde(default = "default_recent_windows")]
    pub recent_windows: Vec<u32>,

    /// Moving-average period used when none is requested
    #[serde(default = "default_ma_period")]
    pub default_ma_period: u32,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            recent_windows: default_recent_windows(),
            default_ma_period: default_ma_period(),
        }
    }
}

impl StatsConfig {
    /// Validate configuration, returning error message if invalid
    pub fn validate(&self) -> Result<()> {
        if let Some(bad) = self
            .recent_windows
            .iter()
            .find(|w| **w == 0 || **w > MAX_WINDOW_DAYS)
        {
            return Err(Error::Config(format!(
                "stats.recent_windows entries must be between 1 and {}, got {}",
                MAX_WINDOW_DAYS, bad
            )));
        }
        if self.default_ma_period == 0 || self.default_ma_period > MAX_WINDOW_DAYS {
            return Err(Error::Config(format!(
                "stats.default_ma_period must be between 1 and {}",
                MAX_WINDOW_DAYS
            )));
        }
        Ok(())
    }
}

fn default_recent_windows() -> Vec<u32> {
    vec![7, 30, 90]
}

fn default_ma_period() -> u32 {
    30
}

/// Logging configuration
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Maximum number of log files to keep
    #[serde(default = "default_max_log_files")]
    pub max_files: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            max_files: default_max_log_files(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_log_files() -> usize {
    5
}

impl Config {
    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            return Ok(Config::default());
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &PathBuf) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read config file {:?}: {}", path, e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;

        config.stats.validate()?;
        if config.owner.trim().is_empty() {
            return Err(Error::Config("owner must not be empty".to_string()));
        }

        Ok(config)
    }

    /// Returns the default config file path
    ///
    /// `$XDG_CONFIG_HOME/daylog/config.toml` (~/.config/daylog/config.toml)
    pub fn config_path() -> PathBuf {
        xdg_config_home().join("daylog").join("config.toml")
    }

    /// Returns the data directory path (for SQLite database)
    pub fn data_dir() -> PathBuf {
        xdg_data_home().join("daylog")
    }

    /// Returns the state directory path (for logs)
    pub fn state_dir() -> PathBuf {
        xdg_state_home().join("daylog")
    }

    /// Returns the database file path
    ///
    /// `$XDG_DATA_HOME/daylog/data.db` (~/.local/share/daylog/data.db)
    pub fn database_path() -> PathBuf {
        Self::data_dir().join("data.db")
    }

    /// Ensure XDG base directory environment variables are set.
    ///
    /// CLI binaries call this before anything reads these env vars so that
    /// path resolution is stable for the whole process.
    pub fn ensure_xdg_env() {
        let home = home_dir();

        if std::env::var("XDG_DATA_HOME").is_err() {
            std::env::set_var("XDG_DATA_HOME", home.join(".local/share"));
        }

        if std::env::var("XDG_STATE_HOME").is_err() {
            std::env::set_var("XDG_STATE_HOME", home.join(".local/state"));
        }

        if std::env::var("XDG_CONFIG_HOME").is_err() {
            std::env::set_var("XDG_CONFIG_HOME", home.join(".config"));
        }
    }
}
