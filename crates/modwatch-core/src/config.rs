//! Watch configuration loaded from `modwatch.toml`

use crate::eligibility::Eligibility;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Config file looked up in the project root.
pub const CONFIG_FILE: &str = "modwatch.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Project root; the dependency directory is resolved against it.
    pub project_root: PathBuf,
    /// Third-party dependency directory name under the project root.
    pub dependency_dir: String,
    /// Coalescing window for bursts of native change events.
    pub debounce_ms: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        WatchConfig {
            project_root: PathBuf::from("."),
            dependency_dir: "vendor".to_string(),
            debounce_ms: 50,
        }
    }
}

impl WatchConfig {
    pub fn for_root(project_root: impl Into<PathBuf>) -> Self {
        WatchConfig {
            project_root: project_root.into(),
            ..Self::default()
        }
    }

    /// Parse a config file. A relative `project_root` is taken relative to
    /// the file's directory.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config: WatchConfig = toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        if config.project_root.is_relative() {
            if let Some(dir) = path.parent() {
                config.project_root = dir.join(&config.project_root);
            }
        }
        tracing::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Load `modwatch.toml` from `root` if present, otherwise defaults rooted there.
    pub fn discover(root: &Path) -> Result<Self, ConfigError> {
        let file = root.join(CONFIG_FILE);
        if file.is_file() {
            Self::from_file(&file)
        } else {
            Ok(Self::for_root(root))
        }
    }

    pub fn dependency_root(&self) -> PathBuf {
        self.project_root.join(&self.dependency_dir)
    }

    pub fn eligibility(&self) -> Eligibility {
        Eligibility::new(self.dependency_root())
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}
