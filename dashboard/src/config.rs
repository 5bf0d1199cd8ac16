//! Configuration management for the farmdash dashboard
//!
//! Supports JSON config files and environment variables.

use anyhow::{Context, Result};
use farmdash_core::summary::{decimal_places, BLOCK_TIME_MINUTES, UNITS_PER_COIN};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Dashboard configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardConfig {
    /// Where the farm snapshot comes from
    #[serde(default)]
    pub snapshot: SnapshotConfig,

    /// Currency and estimate settings
    #[serde(default)]
    pub display: DisplayConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotConfig {
    /// Snapshot JSON file written by the farm services bridge
    #[serde(default = "default_snapshot_path")]
    pub path: PathBuf,

    /// Re-read interval in watch mode (seconds)
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayConfig {
    #[serde(default = "default_currency")]
    pub currency: String,

    /// Smallest units per whole coin
    #[serde(default = "default_units_per_coin")]
    pub units_per_coin: u64,

    #[serde(default = "default_block_time")]
    pub block_time_minutes: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Disable colored output
    #[serde(default)]
    pub no_color: bool,

    /// Quiet mode
    #[serde(default)]
    pub quiet: bool,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            snapshot: SnapshotConfig::default(),
            display: DisplayConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            path: default_snapshot_path(),
            poll_interval_secs: default_poll_interval(),
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            currency: default_currency(),
            units_per_coin: default_units_per_coin(),
            block_time_minutes: default_block_time(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            no_color: false,
            quiet: false,
        }
    }
}

const LOG_LEVELS: [&str; 6] = ["off", "error", "warn", "info", "debug", "trace"];

impl DashboardConfig {
    /// Load config from file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file {}", path.as_ref().display()))?;

        let config: DashboardConfig =
            serde_json::from_str(&content).context("Failed to parse config JSON")?;

        Ok(config)
    }

    /// Save config to file, creating parent directories
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("Failed to serialize config")?;

        if let Some(dir) = path.as_ref().parent() {
            fs::create_dir_all(dir)?;
        }
        fs::write(path.as_ref(), json).context("Failed to write config file")?;

        Ok(())
    }

    /// `~/.farmdash/dashboard.json`
    pub fn default_path() -> Result<PathBuf> {
        Ok(farmdash_dir()?.join("dashboard.json"))
    }

    /// Load config from default location, falling back to defaults
    pub fn load_default() -> Result<Self> {
        let path = Self::default_path()?;

        if path.exists() {
            Self::from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Apply `FARMDASH_*` overrides from a variable lookup.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup("FARMDASH_SNAPSHOT") {
            self.snapshot.path = PathBuf::from(path);
        }
        if let Some(secs) = lookup("FARMDASH_POLL_SECS") {
            self.snapshot.poll_interval_secs = secs
                .trim()
                .parse()
                .with_context(|| format!("Invalid FARMDASH_POLL_SECS: {}", secs))?;
        }
        if let Some(level) = lookup("FARMDASH_LOG") {
            self.logging.level = level.trim().to_lowercase();
        }
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.snapshot.poll_interval_secs == 0 {
            anyhow::bail!("Poll interval must be at least 1 second");
        }

        if decimal_places(self.display.units_per_coin).is_none() {
            anyhow::bail!(
                "units_per_coin must be a power of ten, got {}",
                self.display.units_per_coin
            );
        }

        if !(self.display.block_time_minutes > 0.0) {
            anyhow::bail!("block_time_minutes must be positive");
        }

        if !LOG_LEVELS.contains(&self.logging.level.as_str()) {
            anyhow::bail!(
                "Invalid log level: {}. Valid: {:?}",
                self.logging.level,
                LOG_LEVELS
            );
        }

        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.snapshot.poll_interval_secs)
    }

    pub fn log_filter(&self) -> log::LevelFilter {
        self.logging.level.parse().unwrap_or(log::LevelFilter::Info)
    }
}

fn farmdash_dir() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Could not determine home directory")?;
    Ok(home.join(".farmdash"))
}

// Default value functions
fn default_snapshot_path() -> PathBuf {
    farmdash_dir()
        .map(|dir| dir.join("farm.json"))
        .unwrap_or_else(|_| PathBuf::from("farm.json"))
}

fn default_poll_interval() -> u64 {
    5
}

fn default_currency() -> String {
    "XCH".to_string()
}

fn default_units_per_coin() -> u64 {
    UNITS_PER_COIN
}

fn default_block_time() -> f64 {
    BLOCK_TIME_MINUTES
}

fn default_log_level() -> String {
    "info".to_string()
}
