//! Building a session from flags, the CLI config file and the environment

use anyhow::{Context as _, Result};
use medassist_core::{AppConfig, BackendConfig, Category, FileStorage, LimitsConfig, LogNotifier};
use medassist_session::{guest_id, SessionBackends, SessionError, WorkspaceSession};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

use crate::config::CliConfig;
use crate::output::OutputFormat;

/// Values given on the command line or through their env variables
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub store_url: Option<String>,
    pub processing_url: Option<String>,
    pub data_dir: Option<PathBuf>,
    pub local_store: Option<PathBuf>,
}

/// Effective settings after layering
#[derive(Debug, Clone)]
pub struct Settings {
    pub backend: BackendConfig,
    pub limits: LimitsConfig,
    pub data_dir: PathBuf,
    pub local_store: Option<PathBuf>,
}

/// Flags win over the CLI config file, which wins over `AppConfig`.
pub fn resolve(overrides: &Overrides, file: &CliConfig, app: AppConfig) -> Settings {
    let mut backend = app.backend;
    if let Some(url) = overrides.store_url.clone().or_else(|| file.store_url.clone()) {
        backend.store_url = url;
    }
    if let Some(url) = overrides
        .processing_url
        .clone()
        .or_else(|| file.processing_url.clone())
    {
        backend.processing_url = url;
    }
    if let Some(secs) = file.quick_timeout_secs {
        backend.quick_timeout_secs = secs;
    }
    if let Some(secs) = file.processing_timeout_secs {
        backend.processing_timeout_secs = secs;
    }

    Settings {
        backend,
        limits: app.limits,
        data_dir: overrides
            .data_dir
            .clone()
            .or_else(|| file.data_dir.clone())
            .unwrap_or(app.storage.data_dir),
        local_store: overrides
            .local_store
            .clone()
            .or_else(|| file.local_store.clone()),
    }
}

/// An open session plus how to print results
pub struct Context {
    pub session: WorkspaceSession,
    pub format: OutputFormat,
}

impl Context {
    pub fn open(overrides: &Overrides, format: OutputFormat) -> Result<Self> {
        let app = AppConfig::load().context("Failed to load configuration")?;
        let settings = resolve(overrides, &CliConfig::load()?, app);
        debug!(
            store = %settings.backend.store_url,
            processing = %settings.backend.processing_url,
            data_dir = %settings.data_dir.display(),
            "Opening session"
        );

        let storage = Arc::new(
            FileStorage::open(&settings.data_dir).with_context(|| {
                format!("Failed to open data directory {}", settings.data_dir.display())
            })?,
        );
        let guest = guest_id(storage.as_ref())?;
        let backends =
            SessionBackends::from_config(&settings.backend, &guest, settings.local_store.clone())?;
        let session =
            WorkspaceSession::open(storage, backends, &settings.limits, Arc::new(LogNotifier))?;

        Ok(Self { session, format })
    }

    /// Name of the active workspace, for headings
    pub fn active_name(&self) -> Result<String> {
        Ok(self.session.active_workspace()?.name)
    }
}

pub fn parse_category(value: &str) -> Result<Category> {
    value.parse::<Category>().map_err(anyhow::Error::msg)
}

/// Report a library error by its user-facing message; `--verbose` prints
/// the underlying error below it.
pub fn friendly(err: impl Into<SessionError>) -> anyhow::Error {
    let err = err.into();
    let message = err.user_message();
    anyhow::Error::new(err).context(message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_win_over_file_and_defaults() {
        let overrides = Overrides {
            store_url: Some("http://flag:3000".to_string()),
            ..Default::default()
        };
        let file = CliConfig {
            store_url: Some("http://file:3000".to_string()),
            processing_url: Some("http://file:8000".to_string()),
            processing_timeout_secs: Some(60),
            ..Default::default()
        };

        let settings = resolve(&overrides, &file, AppConfig::default());

        assert_eq!(settings.backend.store_url, "http://flag:3000");
        assert_eq!(settings.backend.processing_url, "http://file:8000");
        assert_eq!(settings.backend.processing_timeout_secs, 60);
        assert_eq!(settings.backend.quick_timeout_secs, 30);
        assert_eq!(settings.data_dir, PathBuf::from(".medassist"));
        assert!(settings.local_store.is_none());
    }

    #[test]
    fn test_parse_category() {
        assert_eq!(parse_category("Medical").unwrap(), Category::Medical);
        assert_eq!(parse_category("patient-documents").unwrap(), Category::Patient);
        assert!(parse_category("billing").is_err());
    }
}
