//! Configuration loading and management
//!
//! Handles parsing of `config.toml` in the data directory.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::category::Category;
use crate::stats::DEFAULT_RECENT_WINDOW_DAYS;

/// File name of the configuration inside the data directory
pub const CONFIG_FILE: &str = "config.toml";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Task defaults
    #[serde(default)]
    pub tasks: TasksConfig,

    /// Statistics configuration
    #[serde(default)]
    pub stats: StatsConfig,

    /// Session configuration
    #[serde(default)]
    pub session: SessionConfig,
}

/// Task defaults
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TasksConfig {
    /// Category used when `add` is not given one
    #[serde(default)]
    pub default_category: Category,
}

/// Statistics configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsConfig {
    /// Trailing window for recent activity, in days
    #[serde(default = "default_recent_window_days")]
    pub recent_window_days: u32,
}

fn default_recent_window_days() -> u32 {
    DEFAULT_RECENT_WINDOW_DAYS
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            recent_window_days: default_recent_window_days(),
        }
    }
}

/// Session configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Storage partition used when nobody is signed in
    #[serde(default = "default_guest_id")]
    pub guest_id: String,
}

fn default_guest_id() -> String {
    "guest".to_string()
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            guest_id: default_guest_id(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load `config.toml` from the data directory, or return defaults
    pub fn load_from_dir(data_dir: &Path) -> Self {
        let config_path = Self::path_in(data_dir);
        if !config_path.exists() {
            return Self::default();
        }
        match Self::load(&config_path) {
            Ok(config) => config,
            Err(err) => {
                tracing::warn!(path = %config_path.display(), error = %err, "ignoring invalid config");
                Self::default()
            }
        }
    }

    pub fn path_in(data_dir: &Path) -> PathBuf {
        data_dir.join(CONFIG_FILE)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> crate::error::Result<()> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    fn validate(&self) -> crate::error::Result<()> {
        self.stats.validate()?;
        self.session.validate()?;
        Ok(())
    }
}

impl StatsConfig {
    fn validate(&self) -> crate::error::Result<()> {
        if self.recent_window_days == 0 {
            return Err(crate::error::Error::InvalidConfig(
                "stats.recent_window_days must be >= 1".to_string(),
            ));
        }
        if self.recent_window_days > 365 {
            return Err(crate::error::Error::InvalidConfig(
                "stats.recent_window_days must be <= 365".to_string(),
            ));
        }
        Ok(())
    }
}

impl SessionConfig {
    fn validate(&self) -> crate::error::Result<()> {
        let guest = self.guest_id.trim();
        if guest.is_empty() {
            return Err(crate::error::Error::InvalidConfig(
                "session.guest_id cannot be empty".to_string(),
            ));
        }
        crate::storage::validate_key(&crate::storage::storage_key(guest)).map_err(|err| {
            crate::error::Error::InvalidConfig(format!("session.guest_id: {err}"))
        })
    }
}
