use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use furion_schema::FURION_KIT_DATABASE;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{DisabledBackend, FileBackend, MemoryBackend, StorageBackend};

pub const ENV_DATA_DIR: &str = "FURION_DATA_DIR";
pub const ENV_BACKEND: &str = "FURION_BACKEND";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {message}")]
    Read { path: PathBuf, message: String },
    #[error("cannot parse config: {0}")]
    Parse(String),
    #[error("unknown backend '{0}' (expected memory, file or disabled)")]
    UnknownBackend(String),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    Memory,
    #[default]
    File,
    Disabled,
}

impl std::str::FromStr for BackendKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(BackendKind::Memory),
            "file" => Ok(BackendKind::File),
            "disabled" => Ok(BackendKind::Disabled),
            other => Err(ConfigError::UnknownBackend(other.to_string())),
        }
    }
}

/// Store settings, typically from `furion.yaml`:
///
/// ```yaml
/// backend: file
/// data_dir: ./furion-data
/// database: furion-kit
/// max_log_bytes: 1048576
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: BackendKind,
    pub data_dir: PathBuf,
    pub database: String,
    pub max_log_bytes: Option<u64>,
    pub max_entries: Option<usize>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::File,
            data_dir: PathBuf::from("./furion-data"),
            database: FURION_KIT_DATABASE.to_string(),
            max_log_bytes: None,
            max_entries: None,
        }
    }
}

impl StoreConfig {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::from_yaml_str(&text)
    }

    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Apply `FURION_DATA_DIR` / `FURION_BACKEND` from the process environment.
    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    pub fn with_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(dir) = lookup(ENV_DATA_DIR).filter(|d| !d.is_empty()) {
            self.data_dir = PathBuf::from(dir);
        }
        if let Some(kind) = lookup(ENV_BACKEND).filter(|k| !k.is_empty()) {
            self.backend = kind.parse()?;
        }
        Ok(self)
    }

    pub fn build_backend(&self) -> Arc<dyn StorageBackend> {
        match self.backend {
            BackendKind::Memory => {
                let mut b = MemoryBackend::new();
                if let Some(max) = self.max_entries {
                    b = b.with_max_entries(max);
                }
                Arc::new(b)
            }
            BackendKind::File => {
                let mut b = FileBackend::new(&self.data_dir);
                if let Some(max) = self.max_log_bytes {
                    b = b.with_max_bytes(max);
                }
                Arc::new(b)
            }
            BackendKind::Disabled => Arc::new(DisabledBackend),
        }
    }
}
