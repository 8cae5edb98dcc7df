//! Configuration management for Pomodesk

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::timer::{
    Durations, DEFAULT_BREAK_INTERVAL, DEFAULT_LONG_BREAK_MINUTES, DEFAULT_SHORT_BREAK_MINUTES,
    DEFAULT_WORK_MINUTES,
};

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Port for the HTTP API (bound on 127.0.0.1)
    #[serde(default = "default_port")]
    pub port: u16,

    /// SQLite database holding the task list
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,

    /// Mirror the task list to the database (default: true)
    #[serde(default = "default_persist_tasks")]
    pub persist_tasks: bool,

    /// Initial work phase length in minutes (default: 25)
    #[serde(default = "default_work_minutes")]
    pub work_minutes: u32,

    /// Initial short break length in minutes (default: 5)
    #[serde(default = "default_short_break_minutes")]
    pub short_break_minutes: u32,

    /// Initial long break length in minutes (default: 15)
    #[serde(default = "default_long_break_minutes")]
    pub long_break_minutes: u32,

    /// Work phases before a long break (default: 4)
    #[serde(default = "default_break_interval")]
    pub break_interval: u32,

    /// Keep counting down into the next phase when one expires, instead of
    /// waiting for the user to start it (default: false)
    #[serde(default)]
    pub auto_continue: bool,

    /// How long shutdown waits for the timer to stop, in milliseconds (default: 200)
    #[serde(default = "default_shutdown_grace_ms")]
    pub shutdown_grace_ms: u64,

    /// Log file retention in days (default: 7)
    #[serde(default = "default_log_retention_days")]
    pub log_retention_days: u64,
}

fn default_port() -> u16 {
    5001
}

fn default_database_path() -> PathBuf {
    config_dir().join("tasks.db")
}

fn default_persist_tasks() -> bool {
    true
}

fn default_work_minutes() -> u32 {
    DEFAULT_WORK_MINUTES
}

fn default_short_break_minutes() -> u32 {
    DEFAULT_SHORT_BREAK_MINUTES
}

fn default_long_break_minutes() -> u32 {
    DEFAULT_LONG_BREAK_MINUTES
}

fn default_break_interval() -> u32 {
    DEFAULT_BREAK_INTERVAL
}

fn default_shutdown_grace_ms() -> u64 {
    200
}

fn default_log_retention_days() -> u64 {
    7
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: default_port(),
            database_path: default_database_path(),
            persist_tasks: default_persist_tasks(),
            work_minutes: default_work_minutes(),
            short_break_minutes: default_short_break_minutes(),
            long_break_minutes: default_long_break_minutes(),
            break_interval: default_break_interval(),
            auto_continue: false,
            shutdown_grace_ms: default_shutdown_grace_ms(),
            log_retention_days: default_log_retention_days(),
        }
    }
}

impl Config {
    /// Load configuration from file, or return default if not found
    pub fn load() -> Result<Self> {
        let path = config_file_path();
        if path.exists() {
            let content = std::fs::read_to_string(&path).context("Failed to read config file")?;
            toml::from_str(&content).context("Failed to parse config file")
        } else {
            Ok(Self::default())
        }
    }

    /// Initial timer durations
    ///
    /// Falls back to the built-in defaults if any configured value is zero.
    pub fn durations(&self) -> Durations {
        let durations = Durations {
            work_minutes: self.work_minutes,
            short_break_minutes: self.short_break_minutes,
            long_break_minutes: self.long_break_minutes,
            break_interval: self.break_interval,
        };
        if durations.is_valid() {
            durations
        } else {
            tracing::warn!("Configured durations must be positive, using defaults");
            Durations::default()
        }
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }
}

/// Get the base configuration directory (~/.pomodesk)
/// Falls back to ./.pomodesk if home directory cannot be determined
pub fn config_dir() -> PathBuf {
    try_config_dir().unwrap_or_else(|| {
        tracing::warn!("Could not determine home directory, using current directory for config");
        PathBuf::from(".pomodesk")
    })
}

/// Try to get the base configuration directory, returning None if home dir is unavailable
pub fn try_config_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".pomodesk"))
}

/// Get the path to the config file
pub fn config_file_path() -> PathBuf {
    config_dir().join("config.toml")
}

/// Get the path to the logs directory
pub fn logs_dir() -> PathBuf {
    config_dir().join("logs")
}

/// Ensure all required directories exist
pub fn ensure_directories() -> Result<()> {
    std::fs::create_dir_all(config_dir()).context("Failed to create config directory")?;

    std::fs::create_dir_all(logs_dir()).context("Failed to create logs directory")?;

    Ok(())
}
