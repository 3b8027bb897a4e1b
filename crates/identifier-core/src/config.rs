//! Indexing and application configuration.

use std::path::{Path, PathBuf};

use derive_builder::Builder;
use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::record::ChecksumAlgorithm;

/// Default model used for folder descriptions.
pub const DEFAULT_MODEL: &str = "google-gemini-2.0-pro-exp-02-05";

/// Configuration for one indexing run.
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct IndexConfig {
    /// Root directory to index.
    pub root: PathBuf,

    /// Number of concurrent workers.
    #[builder(default = "3")]
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Capacity of the bounded job queue.
    #[builder(default = "100")]
    #[serde(default = "default_queue_size")]
    pub job_queue_size: usize,

    /// Capacity of the bounded result queue.
    #[builder(default = "100")]
    #[serde(default = "default_queue_size")]
    pub result_queue_size: usize,

    /// Engine actions requested for every file.
    #[builder(default = "default_actions()")]
    #[serde(default = "default_actions")]
    pub actions: Vec<String>,

    /// Checksum algorithms requested for every file.
    #[builder(default = "vec![ChecksumAlgorithm::Sha512]")]
    #[serde(default = "default_algorithms")]
    pub algorithms: Vec<ChecksumAlgorithm>,

    /// Start of the run in seconds since the epoch. Written to `last_seen`.
    #[builder(default = "chrono::Utc::now().timestamp()")]
    #[serde(default)]
    pub started_at: i64,
}

fn default_workers() -> usize {
    3
}

fn default_queue_size() -> usize {
    100
}

fn default_actions() -> Vec<String> {
    vec!["siegfried".to_string(), "xml".to_string()]
}

fn default_algorithms() -> Vec<ChecksumAlgorithm> {
    vec![ChecksumAlgorithm::Sha512]
}

impl IndexConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        match self.root {
            Some(ref root) if root.as_os_str().is_empty() => {
                return Err("Root path cannot be empty".to_string());
            }
            None => return Err("Root path is required".to_string()),
            _ => {}
        }
        if self.workers == Some(0) {
            return Err("At least one worker is required".to_string());
        }
        if self.job_queue_size == Some(0) || self.result_queue_size == Some(0) {
            return Err("Queue sizes must be positive".to_string());
        }
        if let Some(ref algorithms) = self.algorithms {
            if !algorithms.contains(&ChecksumAlgorithm::Sha512) {
                return Err("sha512 is required for duplicate detection".to_string());
            }
        }
        Ok(())
    }
}

impl IndexConfig {
    /// Create a new config builder.
    pub fn builder() -> IndexConfigBuilder {
        IndexConfigBuilder::default()
    }

    /// Create a config with defaults for the given root.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            workers: default_workers(),
            job_queue_size: default_queue_size(),
            result_queue_size: default_queue_size(),
            actions: default_actions(),
            algorithms: default_algorithms(),
            started_at: chrono::Utc::now().timestamp(),
        }
    }

    /// Requested actions, sorted and without repeats.
    pub fn normalized_actions(&self) -> Vec<String> {
        self.actions.iter().cloned().sorted().dedup().collect()
    }
}

/// Settings file contents (`config.toml`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub indexer: IndexerSettings,
    pub log: LogSettings,
    pub ai: AiSettings,
}

/// `[indexer]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexerSettings {
    pub workers: usize,
    pub actions: Vec<String>,
}

impl Default for IndexerSettings {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            actions: default_actions(),
        }
    }
}

/// `[log]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    pub level: String,
    pub file: Option<PathBuf>,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: "ERROR".to_string(),
            file: None,
        }
    }
}

/// `[ai]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AiSettings {
    pub model: String,
    pub api_key: String,
    /// Override for the driver's base URL.
    pub endpoint: Option<String>,
}

impl Default for AiSettings {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            api_key: "%%GEMINI_API_KEY%%".to_string(),
            endpoint: None,
        }
    }
}

impl AppConfig {
    /// Location of the per-user config file.
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("identifier").join("config.toml"))
    }

    /// Load the config.
    ///
    /// An explicit path must exist and parse. Without one, the per-user file
    /// is used when present and defaults otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load_file(path),
            None => match Self::config_path() {
                Some(path) if path.is_file() => Self::load_file(&path),
                _ => Ok(Self::default()),
            },
        }
    }

    fn load_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        if config.indexer.workers == 0 {
            return Err(ConfigError::Invalid {
                message: "indexer.workers must be at least 1".to_string(),
            });
        }
        tracing::debug!(path = %path.display(), "loaded config");
        Ok(config)
    }
}
