//! Seams between MedAssist components and the outside world.

use async_trait::async_trait;

use crate::error::{BackendError, StorageError};
use crate::types::{
    Category, ChatReply, FilePayload, ProcessResult, StoreReceipt, WorkspaceListing,
};

/// Local file-persistence service: durable bytes and directory listing.
#[async_trait]
pub trait StoreBackend: Send + Sync {
    /// Persist raw files under the workspace's category folder.
    ///
    /// Implementations must create the category folder if absent.
    async fn store(
        &self,
        category: Category,
        workspace_name: &str,
        files: Vec<FilePayload>,
    ) -> Result<StoreReceipt, BackendError>;

    /// Remove a stored file by reference name; 404 when absent.
    async fn delete(
        &self,
        category: Category,
        workspace_name: &str,
        file_name: &str,
    ) -> Result<(), BackendError>;

    /// All workspaces known for the current identity, with their folders.
    async fn list_workspaces(&self) -> Result<Vec<WorkspaceListing>, BackendError>;
}

/// Opaque remote processing service.
#[async_trait]
pub trait ProcessingBackend: Send + Sync {
    async fn process_files(
        &self,
        category: Category,
        references: &[String],
        workspace_name: &str,
    ) -> Result<ProcessResult, BackendError>;

    async fn process_url(
        &self,
        category: Category,
        url: &str,
        workspace_name: &str,
    ) -> Result<ProcessResult, BackendError>;

    /// Tell the processing side a stored document went away.
    async fn remove_document(
        &self,
        category: Category,
        file_name: &str,
        workspace_name: &str,
    ) -> Result<(), BackendError>;
}

/// Remote chat endpoint.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn chat(&self, message: &str) -> Result<ChatReply, BackendError>;
}

/// Client-local durable key/value storage.
pub trait StateStorage: Send + Sync {
    fn load(&self, key: &str) -> Result<Option<String>, StorageError>;

    fn save(&self, key: &str, value: &str) -> Result<(), StorageError>;

    fn remove(&self, key: &str) -> Result<(), StorageError>;
}
