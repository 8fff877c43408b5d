//! Backend selection

use medassist_core::{BackendConfig, ChatBackend, ProcessingBackend, StoreBackend};
use medassist_sdk::{LocalStore, ProcessingClient, StoreClient};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

use crate::Result;

/// The three backend seams a session talks to
#[derive(Clone)]
pub struct SessionBackends {
    pub store: Arc<dyn StoreBackend>,
    pub processing: Arc<dyn ProcessingBackend>,
    pub chat: Arc<dyn ChatBackend>,
}

impl SessionBackends {
    pub fn new(
        store: Arc<dyn StoreBackend>,
        processing: Arc<dyn ProcessingBackend>,
        chat: Arc<dyn ChatBackend>,
    ) -> Self {
        Self {
            store,
            processing,
            chat,
        }
    }

    /// HTTP clients for both services, or a filesystem store when
    /// `local_store` is given.
    pub fn from_config(
        config: &BackendConfig,
        guest_id: &str,
        local_store: Option<PathBuf>,
    ) -> Result<Self> {
        let processing = Arc::new(
            ProcessingClient::builder()
                .base_url(&config.processing_url)
                .quick_timeout(config.quick_timeout())
                .processing_timeout(config.processing_timeout())
                .build()?,
        );

        let store: Arc<dyn StoreBackend> = match local_store {
            Some(root) => {
                debug!(root = %root.display(), "Using local filesystem store");
                Arc::new(LocalStore::new(root))
            }
            None => Arc::new(
                StoreClient::builder()
                    .base_url(&config.store_url)
                    .guest_id(guest_id)
                    .timeout(config.quick_timeout())
                    .build()?,
            ),
        };

        Ok(Self {
            store,
            processing: processing.clone(),
            chat: processing,
        })
    }
}

impl std::fmt::Debug for SessionBackends {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionBackends").finish_non_exhaustive()
    }
}
