//! Application configuration.

use psicotrain_core::ViewerConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment variable naming a config file when none is passed on the command line.
pub const CONFIG_ENV: &str = "PSICOTRAIN_CONFIG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {0}: {1}")]
    Io(PathBuf, String),
    #[error("Invalid config {0}: {1}")]
    Parse(PathBuf, String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub title: String,
    /// Exercise catalog JSON, a file path natively and a URL on the web.
    pub catalog_path: String,
    pub answer_key_path: String,
    /// Where native state is kept. Defaults to the platform data directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_dir: Option<PathBuf>,
    /// Root that catalog page paths are resolved against.
    pub content_root: String,
    pub viewer: ViewerConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            title: "PsicoTrain".to_string(),
            catalog_path: "data/exercises.json".to_string(),
            answer_key_path: "data/answers.json".to_string(),
            storage_dir: None,
            content_root: ".".to_string(),
            viewer: ViewerConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn from_json(path: &Path, json: &str) -> ConfigResult<Self> {
        serde_json::from_str(json).map_err(|e| ConfigError::Parse(path.to_path_buf(), e.to_string()))
    }

    /// Load from `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        match std::fs::read_to_string(path) {
            Ok(json) => Self::from_json(path, &json),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::warn!("Config {} not found, using defaults", path.display());
                Ok(Self::default())
            }
            Err(e) => Err(ConfigError::Io(path.to_path_buf(), e.to_string())),
        }
    }

    /// Load from the given argument, else from `PSICOTRAIN_CONFIG`, else defaults.
    pub fn from_args_or_env(arg: Option<String>) -> ConfigResult<Self> {
        match arg.or_else(|| std::env::var(CONFIG_ENV).ok()) {
            Some(path) => Self::load(Path::new(&path)),
            None => Ok(Self::default()),
        }
    }
}
