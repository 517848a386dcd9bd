//! Taskflow configuration file.
//!
//! A small JSON document in the standard configuration directory
//! (`~/.config/taskflow/config.json` on most platforms) records where task
//! assets live, the default log filter, and navigation switches. A missing file
//! yields defaults; an unparsable one is reported and also yields defaults.

use std::env;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use dirs_next::config_dir;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::expand_tilde;

/// Environment variable overriding the configuration file path.
pub const CONFIG_PATH_ENV: &str = "TASKFLOW_CONFIG_PATH";

/// Environment variable overriding the asset root.
pub const ASSET_ROOT_ENV: &str = "TASKFLOW_ASSET_ROOT";

/// Default filename of the configuration document.
pub const CONFIG_FILE_NAME: &str = "config.json";

/// Log filter used when neither the file nor `RUST_LOG` sets one.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Error surfaced when reading or writing the configuration fails.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("config serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Navigation switches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavigationConfig {
    /// Ends navigation when a skip decorator is offered a step it already skipped.
    pub guard_revisits: bool,
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self { guard_revisits: true }
    }
}

/// Persisted configuration values.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskflowConfig {
    /// Directory holding `task/`, `task/info/` and `task/transformer/`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asset_root: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_filter: Option<String>,
    pub navigation: NavigationConfig,
}

impl TaskflowConfig {
    /// Loads the configuration from the default location and applies environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::load_from(&default_config_path())?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Loads the configuration stored at `path` without environment overrides.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match fs::read_to_string(path) {
            Ok(data) => match serde_json::from_str(&data) {
                Ok(config) => {
                    debug!(path = %path.display(), "loaded configuration");
                    Ok(config)
                }
                Err(error) => {
                    warn!(
                        path = %path.display(),
                        error = %error,
                        "Failed to parse configuration file; using defaults"
                    );
                    Ok(Self::default())
                }
            },
            Err(error) if error.kind() == ErrorKind::NotFound => Ok(Self::default()),
            Err(error) => Err(ConfigError::Io(error)),
        }
    }

    /// Writes the configuration as pretty JSON, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_string_pretty(self)?;
        fs::write(path, data)?;
        Ok(())
    }

    /// Replaces file values with those set in the environment.
    pub fn apply_env_overrides(&mut self) {
        if let Some(root) = non_empty_env(ASSET_ROOT_ENV) {
            self.asset_root = Some(expand_tilde(&root));
        }
    }

    /// Log filter to install when `RUST_LOG` is unset.
    pub fn log_filter(&self) -> &str {
        self.log_filter.as_deref().unwrap_or(DEFAULT_LOG_FILTER)
    }
}

/// Configuration file path: `$TASKFLOW_CONFIG_PATH` or the platform config directory.
pub fn default_config_path() -> PathBuf {
    if let Some(path) = non_empty_env(CONFIG_PATH_ENV) {
        return expand_tilde(&path);
    }

    config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("taskflow")
        .join(CONFIG_FILE_NAME)
}

fn non_empty_env(name: &str) -> Option<String> {
    let value = env::var(name).ok()?;
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
