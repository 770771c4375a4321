//! dvgraph Configuration Management
//!
//! Provides configuration loading with support for:
//! - Global config: `~/.dvgraph/config.toml`
//! - Local config: `.dvgraph/config.toml` (in workspace)
//! - CLI overrides via `ConfigOverrides`
//!
//! Configuration is merged in order: global → local → CLI overrides.

mod error;
mod loader;

pub use error::ConfigError;
pub use loader::ConfigLoader;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default location of the lineage database, relative to the workspace
pub const DEFAULT_DATABASE_PATH: &str = ".dvgraph/graph.db";

/// Default busy timeout for the store, in milliseconds
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5000;

/// Log levels accepted in `logging.level`
pub const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Root configuration for dvgraph.
///
/// Represents the fully merged configuration from all sources.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct GraphConfig {
    /// Storage configuration
    pub storage: StorageConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Storage configuration for the lineage database.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StorageConfig {
    /// SQLite database file (default: `.dvgraph/graph.db`)
    pub database_path: PathBuf,

    /// How long a write waits on a locked database, in milliseconds
    pub busy_timeout_ms: u64,

    /// Reject duplicate (kind, name, version) rows at the database level
    pub enforce_unique_identity: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from(DEFAULT_DATABASE_PATH),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            enforce_unique_identity: true,
        }
    }
}

impl StorageConfig {
    /// Busy timeout as a `Duration`
    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (text, json)
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable text format
    #[default]
    Text,
    /// JSON structured logging
    Json,
}

/// CLI overrides for configuration values.
///
/// Used to apply command-line arguments over file-based config.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    /// Override database path
    pub database_path: Option<PathBuf>,

    /// Override log level
    pub log_level: Option<String>,
}

impl GraphConfig {
    /// Apply CLI overrides to this configuration.
    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) {
        if let Some(ref path) = overrides.database_path {
            self.storage.database_path = path.clone();
        }

        if let Some(ref level) = overrides.log_level {
            self.logging.level = level.clone();
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.storage.database_path.as_os_str().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "storage.database_path",
                reason: "must not be empty".to_string(),
            });
        }

        let level = self.logging.level.to_lowercase();
        if !LOG_LEVELS.contains(&level.as_str()) {
            return Err(ConfigError::InvalidValue {
                key: "logging.level",
                reason: format!(
                    "unknown level '{}', expected one of {}",
                    self.logging.level,
                    LOG_LEVELS.join(", ")
                ),
            });
        }
        Ok(())
    }

    /// Get the effective database path for a workspace.
    pub fn database_path(&self, workspace_root: &Path) -> PathBuf {
        if self.storage.database_path.is_absolute() {
            self.storage.database_path.clone()
        } else {
            workspace_root.join(&self.storage.database_path)
        }
    }
}
