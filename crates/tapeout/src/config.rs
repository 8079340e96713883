//! Configuration and path resolution
//!
//! Everything lives under the tapeout home directory (`TAPEOUT_HOME`, else
//! `~/.tapeout`):
//!
//! ```text
//! ~/.tapeout/
//! ├── config.toml
//! ├── tapeout.sqlite3
//! ├── public_metrics/latest.json
//! └── logs/
//! ```

use crate::collab::analysis::DEFAULT_ANALYZER_TIMEOUT_SECS;
use crate::collab::publish::DEFAULT_PUBLISHER_TIMEOUT_SECS;
use crate::collab::CommandSpec;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const HOME_ENV: &str = "TAPEOUT_HOME";
pub const CONFIG_FILE: &str = "config.toml";
pub const DATABASE_FILE: &str = "tapeout.sqlite3";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Cannot read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid config {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Missing config value: {0}")]
    Missing(&'static str),
}

/// Resolve the tapeout home directory.
///
/// Priority:
/// 1) TAPEOUT_HOME
/// 2) ~/.tapeout
/// 3) ./.tapeout
pub fn tapeout_home() -> PathBuf {
    if let Ok(path) = std::env::var(HOME_ENV) {
        if !path.is_empty() {
            return PathBuf::from(path);
        }
    }
    match dirs::home_dir() {
        Some(home) => home.join(".tapeout"),
        None => PathBuf::from(".").join(".tapeout"),
    }
}

/// Logs directory: ~/.tapeout/logs
pub fn logs_dir() -> PathBuf {
    tapeout_home().join("logs")
}

/// Default config file: ~/.tapeout/config.toml
pub fn default_config_path() -> PathBuf {
    tapeout_home().join(CONFIG_FILE)
}

/// Contents of `config.toml`. Every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TapeoutConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub designs_root: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics_snapshot_path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analyzer: Option<CommandSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publisher: Option<CommandSpec>,
}

impl TapeoutConfig {
    /// Load a config file that must exist.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content, path)
    }

    /// Load `explicit` if given, else the default config file, falling back
    /// to defaults when that file does not exist.
    pub fn load_or_default(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        let path = default_config_path();
        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    fn parse(content: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Designs root, preferring `cli_override`.
    pub fn designs_root(&self, cli_override: Option<&Path>) -> Result<PathBuf, ConfigError> {
        cli_override
            .map(Path::to_path_buf)
            .or_else(|| self.designs_root.clone())
            .ok_or(ConfigError::Missing("designs_root"))
    }

    /// Database path, preferring `cli_override`.
    pub fn database_path(&self, cli_override: Option<&Path>) -> PathBuf {
        self.database_path_in(&tapeout_home(), cli_override)
    }

    pub fn metrics_snapshot_path(&self) -> PathBuf {
        self.metrics_snapshot_path_in(&tapeout_home())
    }

    pub fn analyzer_spec(&self) -> Result<CommandSpec, ConfigError> {
        let mut spec = self.analyzer.clone().ok_or(ConfigError::Missing("analyzer.program"))?;
        spec.timeout_secs.get_or_insert(DEFAULT_ANALYZER_TIMEOUT_SECS);
        Ok(spec)
    }

    pub fn publisher_spec(&self) -> Result<CommandSpec, ConfigError> {
        let mut spec = self.publisher.clone().ok_or(ConfigError::Missing("publisher.program"))?;
        spec.timeout_secs.get_or_insert(DEFAULT_PUBLISHER_TIMEOUT_SECS);
        Ok(spec)
    }

    fn database_path_in(&self, home: &Path, cli_override: Option<&Path>) -> PathBuf {
        cli_override
            .map(Path::to_path_buf)
            .or_else(|| self.database_path.clone())
            .unwrap_or_else(|| home.join(DATABASE_FILE))
    }

    fn metrics_snapshot_path_in(&self, home: &Path) -> PathBuf {
        self.metrics_snapshot_path
            .clone()
            .unwrap_or_else(|| home.join("public_metrics").join("latest.json"))
    }
}
