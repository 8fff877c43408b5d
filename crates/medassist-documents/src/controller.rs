//! Per-category document controller
//!
//! Holds the user-visible state for one category. The document list is only
//! ever rebuilt from the workspace store's folder data: a sync observer
//! registered on the store replaces it whenever the store commits a change.

use medassist_core::{
    Category, FilePayload, ProcessResult, WorkspaceEvent, WorkspaceObserver, WorkspaceSnapshot,
};
use medassist_ingestion::{normalize_url, validate_batch, PendingUrl, ValidationError, ValidationPolicy};
use medassist_workspace::WorkspaceStore;
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::gateway::{BestEffort, UploadGateway, UploadReport};
use crate::{workspace_cause, DocumentError, FailedStep, Result};

/// Snapshot of what a category view shows
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ControllerState {
    pub documents: Vec<String>,
    pub loading: bool,
    pub error: Option<String>,
}

#[derive(Debug, Default)]
struct ViewState {
    documents: Vec<String>,
    error: Option<String>,
}

/// Keeps a controller's documents in step with the workspace store
struct DocumentSync {
    category: Category,
    view: Arc<RwLock<ViewState>>,
}

impl WorkspaceObserver for DocumentSync {
    fn on_workspace_event(&self, event: &WorkspaceEvent, snapshot: &WorkspaceSnapshot) {
        let documents = snapshot
            .active
            .as_ref()
            .map(|ws| ws.files(self.category).to_vec())
            .unwrap_or_default();

        debug!(
            category = %self.category,
            event = event.event_type(),
            count = documents.len(),
            "Syncing documents"
        );
        self.view.write().documents = documents;
    }
}

/// Decrements the in-flight counter when dropped, including on early
/// returns and cancelled futures.
struct InFlight<'a>(&'a AtomicUsize);

impl<'a> InFlight<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Drives uploads, deletions and URL ingestion for one category
pub struct CategoryController {
    category: Category,
    gateway: UploadGateway,
    workspaces: Arc<WorkspaceStore>,
    policy: ValidationPolicy,
    view: Arc<RwLock<ViewState>>,
    in_flight: AtomicUsize,
    pending_url: Mutex<PendingUrl>,
}

impl CategoryController {
    /// Create a controller and subscribe its document sync to `workspaces`.
    pub fn attach(
        category: Category,
        gateway: UploadGateway,
        workspaces: Arc<WorkspaceStore>,
        policy: ValidationPolicy,
    ) -> Self {
        let initial = workspaces
            .active_workspace()
            .map(|ws| ws.files(category).to_vec())
            .unwrap_or_default();
        let view = Arc::new(RwLock::new(ViewState {
            documents: initial,
            error: None,
        }));

        workspaces.subscribe(Arc::new(DocumentSync {
            category,
            view: Arc::clone(&view),
        }));

        Self {
            category,
            gateway,
            workspaces,
            policy,
            view,
            in_flight: AtomicUsize::new(0),
            pending_url: Mutex::new(PendingUrl::new()),
        }
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn policy(&self) -> &ValidationPolicy {
        &self.policy
    }

    pub fn state(&self) -> ControllerState {
        let view = self.view.read();
        ControllerState {
            documents: view.documents.clone(),
            loading: self.is_loading(),
            error: view.error.clone(),
        }
    }

    pub fn documents(&self) -> Vec<String> {
        self.view.read().documents.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst) > 0
    }

    pub fn error(&self) -> Option<String> {
        self.view.read().error.clone()
    }

    pub fn clear_error(&self) {
        self.view.write().error = None;
    }

    /// Validate, store in chunks, process all references, then refresh.
    pub async fn upload(
        &self,
        files: Vec<FilePayload>,
        workspace_name: &str,
    ) -> Result<UploadReport> {
        self.track(workspace_name, self.run_upload(files, workspace_name))
            .await
    }

    /// Delete a stored document, refresh, and notify processing on the side.
    pub async fn delete(&self, file_name: &str, workspace_name: &str) -> Result<BestEffort<()>> {
        self.track(workspace_name, async {
            self.gateway
                .delete(self.category, file_name, workspace_name)
                .await?;
            info!(category = %self.category, file = %file_name, "Deleted document");

            let refreshed = self.refresh(vec![file_name.to_string()]).await;
            let side_call = self
                .gateway
                .notify_removed(self.category, file_name, workspace_name);
            refreshed.map(|_| side_call)
        })
        .await
    }

    /// Normalize and submit a URL, then refresh.
    pub async fn process_url(&self, url: &str, workspace_name: &str) -> Result<ProcessResult> {
        self.track(workspace_name, async {
            let url = normalize_url(url)?;
            self.submit_url(url, workspace_name).await
        })
        .await
    }

    /// Replace the pending URL, returning the one it displaced.
    pub fn set_pending_url(&self, input: &str) -> std::result::Result<Option<String>, ValidationError> {
        self.pending_url.lock().set(input)
    }

    pub fn pending_url(&self) -> Option<String> {
        self.pending_url.lock().get().map(str::to_string)
    }

    pub fn clear_pending_url(&self) {
        self.pending_url.lock().clear();
    }

    /// Submit the pending URL; it stays pending if the submission fails.
    pub async fn submit_pending_url(&self, workspace_name: &str) -> Result<ProcessResult> {
        self.track(workspace_name, async {
            let url = self
                .pending_url()
                .ok_or(DocumentError::Validation(ValidationError::EmptyUrl))?;

            let result = self.submit_url(url.clone(), workspace_name).await;
            if !matches!(result, Err(DocumentError::Gateway(_))) {
                let mut slot = self.pending_url.lock();
                if slot.get() == Some(url.as_str()) {
                    slot.clear();
                }
            }
            result
        })
        .await
    }

    /// Re-run processing alone after a partial failure.
    pub async fn retry_process(
        &self,
        references: &[String],
        workspace_name: &str,
    ) -> Result<ProcessResult> {
        self.track(workspace_name, async {
            if references.is_empty() {
                return Err(ValidationError::NoValidFiles.into());
            }
            let result = self
                .gateway
                .process(self.category, references, workspace_name)
                .await?;
            self.refresh(references.to_vec()).await?;
            Ok::<_, DocumentError>(result)
        })
        .await
    }

    async fn run_upload(
        &self,
        files: Vec<FilePayload>,
        workspace_name: &str,
    ) -> Result<UploadReport> {
        let batch = validate_batch(files, &self.policy)?;
        if batch.is_partial() {
            info!(
                category = %self.category,
                dropped = batch.dropped.len(),
                "Some files were left out of the upload"
            );
        }

        let dropped = batch.dropped.clone();
        let mut references = Vec::new();
        let mut stored = Vec::new();

        for chunk in batch.into_chunks() {
            match self.gateway.store(self.category, chunk, workspace_name).await {
                Ok(receipt) => {
                    references.extend(receipt.reference_names());
                    stored.extend(receipt.files);
                }
                Err(e) if references.is_empty() => return Err(e.into()),
                Err(e) => {
                    return Err(DocumentError::PartialFailure {
                        references,
                        step: FailedStep::Store,
                        cause: e.into_backend(),
                    })
                }
            }
        }

        let process_result = match self
            .gateway
            .process(self.category, &references, workspace_name)
            .await
        {
            Ok(result) => result,
            Err(e) => {
                return Err(DocumentError::PartialFailure {
                    references,
                    step: FailedStep::Process,
                    cause: e.into_backend(),
                })
            }
        };

        self.refresh(references.clone()).await?;

        info!(
            category = %self.category,
            workspace = %workspace_name,
            count = references.len(),
            "Uploaded documents"
        );

        Ok(UploadReport {
            reference_names: references,
            stored,
            process_result,
            dropped,
        })
    }

    async fn submit_url(&self, url: String, workspace_name: &str) -> Result<ProcessResult> {
        let result = self
            .gateway
            .process_url(self.category, &url, workspace_name)
            .await?;
        self.refresh(vec![url]).await?;
        Ok(result)
    }

    /// Refresh the workspace store; a failure here follows a successful
    /// backend call, so it is partial.
    async fn refresh(&self, references: Vec<String>) -> Result<()> {
        self.workspaces
            .refresh_workspaces()
            .await
            .map(|_| ())
            .map_err(|e| DocumentError::PartialFailure {
                references,
                step: FailedStep::Refresh,
                cause: workspace_cause(e),
            })
    }

    /// Run an operation with loading tracked and `error` maintained.
    async fn track<T, F>(&self, workspace_name: &str, operation: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        let _guard = InFlight::enter(&self.in_flight);
        self.clear_error();

        let result = operation.await;
        if let Err(ref e) = result {
            self.record_failure(workspace_name, e);
        }
        result
    }

    fn record_failure(&self, workspace_name: &str, err: &DocumentError) {
        let still_active = self
            .workspaces
            .active_workspace()
            .is_some_and(|ws| ws.name == workspace_name);

        if !still_active {
            debug!(
                category = %self.category,
                workspace = %workspace_name,
                error = %err,
                "Discarding failure for a workspace that is no longer active"
            );
            return;
        }

        warn!(
            category = %self.category,
            workspace = %workspace_name,
            kind = %err.kind(),
            error = %err,
            "Document operation failed"
        );
        self.view.write().error = Some(err.user_message());
    }
}

impl std::fmt::Debug for CategoryController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CategoryController")
            .field("category", &self.category)
            .field("state", &self.state())
            .finish()
    }
}
