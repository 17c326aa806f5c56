//! History configuration.
//!
//! ```toml
//! merge_window_ms = 500
//! coalescing = true
//! ```

use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::coalesce::DEFAULT_MERGE_WINDOW;

/// Tunables of a [`CommandHistory`](crate::history::CommandHistory).
///
/// Every field has a default, so an empty document is a valid config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// How long after the previous execution a matching command may still
    /// coalesce into it, in milliseconds.
    pub merge_window_ms: u64,
    /// Set to `false` to record every command as its own entry.
    pub coalescing: bool,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            merge_window_ms: DEFAULT_MERGE_WINDOW.as_millis() as u64,
            coalescing: true,
        }
    }
}

/// Error loading a [`HistoryConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", .path.display())]
    Io { path: PathBuf, source: io::Error },
    #[error("failed to parse history config: {0}")]
    Parse(#[from] toml::de::Error),
}

impl HistoryConfig {
    pub fn merge_window(&self) -> Duration {
        Duration::from_millis(self.merge_window_ms)
    }

    /// Parses a config from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Loads a config from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&content)?;
        log::debug!("Loaded history config from {}: {config:?}", path.display());
        Ok(config)
    }
}
