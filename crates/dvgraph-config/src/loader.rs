//! Layered config loading.
//!
//! Each config file is read as a [`ConfigLayer`] in which every field is
//! optional. Layers are applied over the defaults in order (global file,
//! then workspace file), so a field takes the value of the last file that
//! sets it, even when that value equals the default. CLI overrides go on top.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::error::ConfigError;
use crate::{ConfigOverrides, GraphConfig, LogFormat};

const CONFIG_DIR: &str = ".dvgraph";
const CONFIG_FILE: &str = "config.toml";

/// The fields one config file sets.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConfigLayer {
    storage: StorageLayer,
    logging: LoggingLayer,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct StorageLayer {
    database_path: Option<PathBuf>,
    busy_timeout_ms: Option<u64>,
    enforce_unique_identity: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct LoggingLayer {
    level: Option<String>,
    format: Option<LogFormat>,
}

impl ConfigLayer {
    fn read(path: &Path) -> Result<Option<Self>, ConfigError> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        let layer = toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), "Read config layer");
        Ok(Some(layer))
    }

    fn apply_to(self, config: &mut GraphConfig) {
        let storage = &mut config.storage;
        if let Some(path) = self.storage.database_path {
            storage.database_path = path;
        }
        if let Some(ms) = self.storage.busy_timeout_ms {
            storage.busy_timeout_ms = ms;
        }
        if let Some(unique) = self.storage.enforce_unique_identity {
            storage.enforce_unique_identity = unique;
        }

        let logging = &mut config.logging;
        if let Some(level) = self.logging.level {
            logging.level = level;
        }
        if let Some(format) = self.logging.format {
            logging.format = format;
        }
    }
}

/// Locates and merges the global and workspace config files.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    /// `~/.dvgraph`, or `None` when there is no home directory
    global_dir: Option<PathBuf>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Loader whose global config lives under the user's home directory.
    pub fn new() -> Self {
        Self {
            global_dir: dirs::home_dir().map(|home| home.join(CONFIG_DIR)),
        }
    }

    /// Loader with an explicit global config directory.
    pub fn with_global_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            global_dir: Some(dir.into()),
        }
    }

    pub fn global_config_path(&self) -> Option<PathBuf> {
        self.global_dir.as_ref().map(|dir| dir.join(CONFIG_FILE))
    }

    pub fn local_config_path(&self, workspace_root: &Path) -> PathBuf {
        workspace_root.join(CONFIG_DIR).join(CONFIG_FILE)
    }

    /// Merge defaults, the global file, the workspace file and `overrides`,
    /// then validate. Missing files are skipped.
    pub fn load(
        &self,
        workspace_root: &Path,
        overrides: Option<&ConfigOverrides>,
    ) -> Result<GraphConfig, ConfigError> {
        let mut config = GraphConfig::default();

        let files = self
            .global_config_path()
            .into_iter()
            .chain(std::iter::once(self.local_config_path(workspace_root)));
        for path in files {
            if let Some(layer) = ConfigLayer::read(&path)? {
                layer.apply_to(&mut config);
            }
        }

        if let Some(overrides) = overrides {
            config.apply_overrides(overrides);
        }
        config.validate()?;
        Ok(config)
    }

    /// Write a default global config unless one exists; returns its path.
    pub fn init_global(&self) -> Result<PathBuf, ConfigError> {
        let path = self.global_config_path().ok_or(ConfigError::NoHomeDir)?;
        write_default(path)
    }

    /// Write a default workspace config unless one exists; returns its path.
    pub fn init_local(&self, workspace_root: &Path) -> Result<PathBuf, ConfigError> {
        write_default(self.local_config_path(workspace_root))
    }
}

fn write_default(path: PathBuf) -> Result<PathBuf, ConfigError> {
    if path.exists() {
        return Ok(path);
    }

    let text = toml::to_string_pretty(&GraphConfig::default())?;
    let write = |path: &Path| -> std::io::Result<()> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        std::fs::write(path, text)
    };
    write(&path).map_err(|source| ConfigError::Write {
        path: path.clone(),
        source,
    })?;

    debug!(path = %path.display(), "Wrote default config");
    Ok(path)
}
