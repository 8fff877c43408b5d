//! CLI configuration management

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable that points the CLI at another config file
pub const CONFIG_PATH_ENV: &str = "MEDASSIST_CLI_CONFIG";

/// Keys accepted by `config get` and `config set`
pub const KEYS: [&str; 6] = [
    "store_url",
    "processing_url",
    "data_dir",
    "local_store",
    "quick_timeout_secs",
    "processing_timeout_secs",
];

/// User-level CLI settings, layered over the library configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct CliConfig {
    /// Store backend URL
    pub store_url: Option<String>,
    /// Processing backend URL
    pub processing_url: Option<String>,
    /// Directory for client-local state
    pub data_dir: Option<PathBuf>,
    /// Use a filesystem store rooted here instead of the store backend
    pub local_store: Option<PathBuf>,
    /// Timeout for store, delete, list and chat calls
    pub quick_timeout_secs: Option<u64>,
    /// Timeout for processing calls
    pub processing_timeout_secs: Option<u64>,
}

impl CliConfig {
    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            toml::from_str(&content).with_context(|| format!("Invalid config file {}", path.display()))
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to the default path
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        Ok(())
    }

    /// The configuration file path
    pub fn config_path() -> Result<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            return Ok(PathBuf::from(path));
        }
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
        Ok(config_dir.join("medassist").join("config.toml"))
    }

    /// Get a configuration value
    pub fn get(&self, key: &str) -> Result<Option<String>> {
        let value = match key {
            "store_url" => self.store_url.clone(),
            "processing_url" => self.processing_url.clone(),
            "data_dir" => self.data_dir.as_ref().map(|p| p.display().to_string()),
            "local_store" => self.local_store.as_ref().map(|p| p.display().to_string()),
            "quick_timeout_secs" => self.quick_timeout_secs.map(|t| t.to_string()),
            "processing_timeout_secs" => self.processing_timeout_secs.map(|t| t.to_string()),
            _ => bail!("Unknown configuration key: {} (expected one of {})", key, KEYS.join(", ")),
        };
        Ok(value)
    }

    /// Set a configuration value
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "store_url" => self.store_url = Some(value.to_string()),
            "processing_url" => self.processing_url = Some(value.to_string()),
            "data_dir" => self.data_dir = Some(PathBuf::from(value)),
            "local_store" => self.local_store = Some(PathBuf::from(value)),
            "quick_timeout_secs" => {
                self.quick_timeout_secs = Some(value.parse().context("Timeout must be a number of seconds")?);
            }
            "processing_timeout_secs" => {
                self.processing_timeout_secs =
                    Some(value.parse().context("Timeout must be a number of seconds")?);
            }
            _ => bail!("Unknown configuration key: {} (expected one of {})", key, KEYS.join(", ")),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_and_get() {
        let mut config = CliConfig::default();
        config.set("store_url", "http://store:3000").unwrap();
        config.set("quick_timeout_secs", "12").unwrap();

        assert_eq!(config.get("store_url").unwrap().as_deref(), Some("http://store:3000"));
        assert_eq!(config.quick_timeout_secs, Some(12));
        assert_eq!(config.get("processing_url").unwrap(), None);
    }

    #[test]
    fn test_rejects_unknown_key_and_bad_timeout() {
        let mut config = CliConfig::default();
        assert!(config.set("api_key", "x").is_err());
        assert!(config.set("processing_timeout_secs", "soon").is_err());
        assert!(config.get("api_key").is_err());
    }

    #[test]
    fn test_round_trip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = CliConfig::default();
        config.set("data_dir", "/tmp/medassist").unwrap();
        config.set("processing_url", "http://proc:8000").unwrap();
        config.save_to(&path).unwrap();

        assert_eq!(CliConfig::load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = CliConfig::load_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, CliConfig::default());
    }
}
