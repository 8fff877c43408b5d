use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub backend: BackendConfig,
    pub limits: LimitsConfig,
    pub storage: StorageConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_env("MEDASSIST")
    }

    /// Load configuration from environment with custom prefix
    pub fn load_from_env(prefix: &str) -> Result<Self, ConfigError> {
        let config = Self::defaults()?
            .add_source(
                Environment::with_prefix(prefix)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;
        config.try_deserialize()
    }

    /// Load configuration from file with environment overrides
    pub fn load_from_file(path: &str) -> Result<Self, ConfigError> {
        let config = Self::defaults()?
            .add_source(File::with_name(path).required(false))
            .add_source(
                Environment::with_prefix("MEDASSIST")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;
        config.try_deserialize()
    }

    fn defaults() -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
        Config::builder()
            .set_default("backend.store_url", "http://localhost:3000")?
            .set_default("backend.processing_url", "http://localhost:8000")?
            .set_default("backend.quick_timeout_secs", 30)?
            .set_default("backend.processing_timeout_secs", 300)?
            .set_default("limits.max_file_size", 5 * 1024 * 1024)?
            .set_default("limits.max_batch_size", 25 * 1024 * 1024)?
            .set_default("limits.max_files_per_request", 10)?
            .set_default("storage.data_dir", ".medassist")
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            backend: BackendConfig::default(),
            limits: LimitsConfig::default(),
            storage: StorageConfig::default(),
        }
    }
}

/// Store and processing backend configuration
#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
    pub store_url: String,
    pub processing_url: String,
    #[serde(default = "default_quick_timeout_secs")]
    pub quick_timeout_secs: u64,
    #[serde(default = "default_processing_timeout_secs")]
    pub processing_timeout_secs: u64,
}

impl BackendConfig {
    pub fn new(store_url: String, processing_url: String) -> Self {
        Self {
            store_url,
            processing_url,
            quick_timeout_secs: default_quick_timeout_secs(),
            processing_timeout_secs: default_processing_timeout_secs(),
        }
    }

    pub fn with_timeouts(mut self, quick_secs: u64, processing_secs: u64) -> Self {
        self.quick_timeout_secs = quick_secs;
        self.processing_timeout_secs = processing_secs;
        self
    }

    pub fn quick_timeout(&self) -> Duration {
        Duration::from_secs(self.quick_timeout_secs)
    }

    pub fn processing_timeout(&self) -> Duration {
        Duration::from_secs(self.processing_timeout_secs)
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self::new(
            "http://localhost:3000".to_string(),
            "http://localhost:8000".to_string(),
        )
    }
}

fn default_quick_timeout_secs() -> u64 {
    30
}

fn default_processing_timeout_secs() -> u64 {
    300 // processing may involve heavy backend work
}

/// Upload size and batching limits
#[derive(Debug, Clone, Deserialize)]
pub struct LimitsConfig {
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: u64,
    #[serde(default = "default_max_files_per_request")]
    pub max_files_per_request: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_file_size: default_max_file_size(),
            max_batch_size: default_max_batch_size(),
            max_files_per_request: default_max_files_per_request(),
        }
    }
}

fn default_max_file_size() -> u64 {
    5 * 1024 * 1024
}

fn default_max_batch_size() -> u64 {
    25 * 1024 * 1024
}

fn default_max_files_per_request() -> usize {
    10
}

/// Client-local storage configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(".medassist"),
        }
    }
}
