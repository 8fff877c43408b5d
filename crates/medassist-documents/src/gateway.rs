//! Two-phase upload: store, then process
//!
//! The phases are not transactional. A successful store followed by a failed
//! process leaves the files stored; callers report that as a partial failure
//! and may call [`UploadGateway::process`] again on its own.

use medassist_core::{
    BackendError, Category, ErrorKind, FilePayload, ProcessResult, ProcessingBackend,
    StoreBackend, StoreReceipt, StoredFile,
};
use medassist_ingestion::DroppedFile;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, instrument, warn};

/// Failure of a single gateway call
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GatewayError {
    /// Store call got no response or a 5xx
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(BackendError),

    /// Store call was refused (4xx)
    #[error("Storage rejected the request: {0}")]
    StorageRejected(BackendError),

    /// Processing call answered with an error
    #[error("Processing rejected the request: {0}")]
    ProcessingRejected(BackendError),

    /// Processing call got no response
    #[error("Processing unavailable: {0}")]
    ProcessingUnavailable(BackendError),
}

impl GatewayError {
    fn from_store(err: BackendError) -> Self {
        if err.is_retryable() {
            GatewayError::StorageUnavailable(err)
        } else {
            GatewayError::StorageRejected(err)
        }
    }

    fn from_processing(err: BackendError) -> Self {
        match err.kind() {
            ErrorKind::Network => GatewayError::ProcessingUnavailable(err),
            _ => GatewayError::ProcessingRejected(err),
        }
    }

    pub fn backend(&self) -> &BackendError {
        match self {
            GatewayError::StorageUnavailable(e)
            | GatewayError::StorageRejected(e)
            | GatewayError::ProcessingRejected(e)
            | GatewayError::ProcessingUnavailable(e) => e,
        }
    }

    pub fn into_backend(self) -> BackendError {
        match self {
            GatewayError::StorageUnavailable(e)
            | GatewayError::StorageRejected(e)
            | GatewayError::ProcessingRejected(e)
            | GatewayError::ProcessingUnavailable(e) => e,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.backend().kind()
    }

    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            GatewayError::StorageUnavailable(_) | GatewayError::ProcessingUnavailable(_)
        )
    }

    pub fn user_message(&self) -> String {
        self.backend().user_message()
    }
}

/// Outcome of a successful upload
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadReport {
    pub reference_names: Vec<String>,
    pub stored: Vec<StoredFile>,
    pub process_result: ProcessResult,
    /// Files left out by validation
    pub dropped: Vec<DroppedFile>,
}

impl UploadReport {
    pub fn is_partial_batch(&self) -> bool {
        !self.dropped.is_empty()
    }
}

/// Handle to a secondary backend call running on its own task.
///
/// Failures are logged when they happen. Awaiting [`BestEffort::outcome`] is
/// optional; dropping the handle lets the call finish in the background.
#[derive(Debug)]
pub struct BestEffort<T> {
    label: &'static str,
    handle: JoinHandle<Result<T, BackendError>>,
}

impl<T: Send + 'static> BestEffort<T> {
    pub fn spawn<F>(label: &'static str, call: F) -> Self
    where
        F: Future<Output = Result<T, BackendError>> + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            let result = call.await;
            if let Err(ref e) = result {
                warn!(call = label, error = %e, "Best-effort call failed");
            }
            result
        });
        Self { label, handle }
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the call and return what it produced.
    pub async fn outcome(self) -> Result<T, BackendError> {
        match self.handle.await {
            Ok(result) => result,
            Err(e) => Err(BackendError::unexpected(format!("{} task failed: {}", self.label, e))),
        }
    }
}

/// Sequences store and process calls against the two backends
#[derive(Clone)]
pub struct UploadGateway {
    store: Arc<dyn StoreBackend>,
    processing: Arc<dyn ProcessingBackend>,
}

impl UploadGateway {
    pub fn new(store: Arc<dyn StoreBackend>, processing: Arc<dyn ProcessingBackend>) -> Self {
        Self { store, processing }
    }

    /// Persist one request-sized chunk of files.
    #[instrument(skip(self, files), fields(category = %category, count = files.len()))]
    pub async fn store(
        &self,
        category: Category,
        files: Vec<FilePayload>,
        workspace_name: &str,
    ) -> Result<StoreReceipt, GatewayError> {
        let receipt = self
            .store
            .store(category, workspace_name, files)
            .await
            .map_err(GatewayError::from_store)?;
        debug!(references = receipt.files.len(), "Stored chunk");
        Ok(receipt)
    }

    /// Submit stored references for processing.
    #[instrument(skip(self, references), fields(category = %category, count = references.len()))]
    pub async fn process(
        &self,
        category: Category,
        references: &[String],
        workspace_name: &str,
    ) -> Result<ProcessResult, GatewayError> {
        self.processing
            .process_files(category, references, workspace_name)
            .await
            .map_err(GatewayError::from_processing)
    }

    /// URL ingestion goes straight to processing.
    #[instrument(skip(self), fields(category = %category))]
    pub async fn process_url(
        &self,
        category: Category,
        url: &str,
        workspace_name: &str,
    ) -> Result<ProcessResult, GatewayError> {
        self.processing
            .process_url(category, url, workspace_name)
            .await
            .map_err(GatewayError::from_processing)
    }

    #[instrument(skip(self), fields(category = %category))]
    pub async fn delete(
        &self,
        category: Category,
        file_name: &str,
        workspace_name: &str,
    ) -> Result<(), GatewayError> {
        self.store
            .delete(category, workspace_name, file_name)
            .await
            .map_err(GatewayError::from_store)
    }

    /// Tell the processing backend a document is gone, without waiting.
    pub fn notify_removed(
        &self,
        category: Category,
        file_name: &str,
        workspace_name: &str,
    ) -> BestEffort<()> {
        let processing = Arc::clone(&self.processing);
        let file_name = file_name.to_string();
        let workspace_name = workspace_name.to_string();

        BestEffort::spawn("remove_document", async move {
            processing
                .remove_document(category, &file_name, &workspace_name)
                .await
        })
    }
}

impl std::fmt::Debug for UploadGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadGateway").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_classification() {
        assert!(matches!(
            GatewayError::from_store(BackendError::network("refused")),
            GatewayError::StorageUnavailable(_)
        ));
        assert!(matches!(
            GatewayError::from_store(BackendError::server(503, None)),
            GatewayError::StorageUnavailable(_)
        ));

        let rejected = GatewayError::from_store(BackendError::server(
            400,
            Some("Workspace name is required".to_string()),
        ));
        assert!(matches!(rejected, GatewayError::StorageRejected(_)));
        assert!(!rejected.is_retryable());
        assert_eq!(rejected.user_message(), "Workspace name is required");
    }

    #[test]
    fn test_processing_error_classification() {
        let timeout = GatewayError::from_processing(BackendError::timeout("elapsed"));
        assert!(matches!(timeout, GatewayError::ProcessingUnavailable(_)));
        assert!(timeout.is_retryable());

        let rejected = GatewayError::from_processing(BackendError::server(500, None));
        assert!(matches!(rejected, GatewayError::ProcessingRejected(_)));
        assert!(!rejected.is_retryable());
        assert_eq!(rejected.kind(), ErrorKind::Server);
    }

    #[tokio::test]
    async fn test_best_effort_outcome() {
        let ok = BestEffort::spawn("ok", async { Ok::<_, BackendError>(7) });
        assert_eq!(ok.label(), "ok");
        assert_eq!(ok.outcome().await, Ok(7));

        let failed = BestEffort::spawn("fail", async {
            Err::<(), _>(BackendError::server(500, None))
        });
        assert_eq!(failed.outcome().await, Err(BackendError::server(500, None)));
    }
}
