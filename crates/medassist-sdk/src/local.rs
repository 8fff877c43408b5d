//! Filesystem-backed store backend
//!
//! Lays files out as `<root>/<workspace>/<folder type>/<reference name>` and
//! answers the listing call by scanning that tree.

use async_trait::async_trait;
use chrono::Utc;
use medassist_core::{
    BackendError, Category, FilePayload, Folder, StoreBackend, StoreReceipt, StoredFile,
    WorkspaceListing,
};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::error::{Result, SdkError};

/// Store backend writing into a local directory
#[derive(Debug, Clone)]
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn workspace_dir(&self, workspace_name: &str) -> Result<PathBuf> {
        let name = workspace_name.trim();
        if name.is_empty() {
            return Err(SdkError::InvalidInput("Workspace name is required".to_string()));
        }
        if name == "." || name == ".." || name.contains(['/', '\\']) {
            return Err(SdkError::InvalidInput(format!(
                "Invalid workspace name: {}",
                workspace_name
            )));
        }
        Ok(self.root.join(name))
    }

    fn category_dir(&self, category: Category, workspace_name: &str) -> Result<PathBuf> {
        Ok(self
            .workspace_dir(workspace_name)?
            .join(category.folder_type()))
    }

    /// Write files and assign each a collision-resistant reference name
    #[instrument(skip(self, files), fields(count = files.len()))]
    pub async fn write_files(
        &self,
        category: Category,
        workspace_name: &str,
        files: Vec<FilePayload>,
    ) -> Result<StoreReceipt> {
        let dir = self.category_dir(category, workspace_name)?;
        fs::create_dir_all(&dir).await?;

        let mut stored = Vec::with_capacity(files.len());
        for file in files {
            let saved_as = reference_name(&file.name);
            fs::write(dir.join(&saved_as), &file.data).await?;
            stored.push(StoredFile {
                original_name: file.name.clone(),
                saved_as,
                size: file.size(),
                content_type: file.content_type.clone(),
            });
        }

        info!(
            workspace = %workspace_name,
            category = %category,
            count = stored.len(),
            "Stored files"
        );

        Ok(StoreReceipt {
            message: "Files uploaded successfully".to_string(),
            processed_files: stored.len(),
            files: stored,
        })
    }

    #[instrument(skip(self))]
    pub async fn remove_file(
        &self,
        category: Category,
        workspace_name: &str,
        file_name: &str,
    ) -> Result<()> {
        if file_name.is_empty() || file_name.contains(['/', '\\']) || file_name == ".." {
            return Err(SdkError::InvalidInput(format!("Invalid file name: {}", file_name)));
        }

        let path = self.category_dir(category, workspace_name)?.join(file_name);
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(SdkError::NotFound("File not found".to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Scan the root for workspaces and their category folders
    pub async fn scan(&self) -> Result<Vec<WorkspaceListing>> {
        let mut listings = Vec::new();
        let mut entries = match fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(listings),
            Err(e) => return Err(e.into()),
        };

        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();

            let mut folders = Vec::new();
            for category in Category::ALL {
                let dir = entry.path().join(category.folder_type());
                if let Some(files) = list_files(&dir).await? {
                    folders.push(Folder::new(category, files));
                }
            }

            listings.push(WorkspaceListing { name, folders });
        }

        listings.sort_by(|a, b| a.name.cmp(&b.name));
        debug!(count = listings.len(), "Scanned local store");
        Ok(listings)
    }
}

/// Sorted file names of a directory, `None` when it does not exist
async fn list_files(dir: &Path) -> Result<Option<Vec<String>>> {
    let mut entries = match fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        if entry.file_type().await?.is_file() {
            files.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    files.sort();
    Ok(Some(files))
}

fn reference_name(original: &str) -> String {
    let sanitized: String = original
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let id = Uuid::new_v4().simple().to_string();
    format!("{}-{}-{}", Utc::now().timestamp_millis(), &id[..8], sanitized)
}

#[async_trait]
impl StoreBackend for LocalStore {
    async fn store(
        &self,
        category: Category,
        workspace_name: &str,
        files: Vec<FilePayload>,
    ) -> std::result::Result<StoreReceipt, BackendError> {
        self.write_files(category, workspace_name, files)
            .await
            .map_err(BackendError::from)
    }

    async fn delete(
        &self,
        category: Category,
        workspace_name: &str,
        file_name: &str,
    ) -> std::result::Result<(), BackendError> {
        self.remove_file(category, workspace_name, file_name)
            .await
            .map_err(BackendError::from)
    }

    async fn list_workspaces(&self) -> std::result::Result<Vec<WorkspaceListing>, BackendError> {
        self.scan().await.map_err(BackendError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn payload(name: &str) -> FilePayload {
        FilePayload::new(name, "text/plain", b"notes".to_vec())
    }

    #[test]
    fn test_reference_name_sanitized() {
        let name = reference_name("my scan (1).pdf");
        assert!(name.ends_with("-my_scan__1_.pdf"));
        assert_ne!(name, reference_name("my scan (1).pdf"));
    }

    #[tokio::test]
    async fn test_store_creates_folders_and_lists() {
        let dir = TempDir::new().unwrap();
        let store = LocalStore::new(dir.path());

        let receipt = store
            .store(Category::Medical, "Alpha", vec![payload("a.txt"), payload("a.txt")])
            .await
            .unwrap();
        assert_eq!(receipt.files.len(), 2);
        // same original name, distinct references
        assert_ne!(receipt.files[0].saved_as, receipt.files[1].saved_as);

        // second store into the existing folder
        store
            .store(Category::Medical, "Alpha", vec![payload("b.txt")])
            .await
            .unwrap();

        let listing = store.list_workspaces().await.unwrap();
        assert_eq!(listing.len(), 1);
        assert_eq!(listing[0].name, "Alpha");
        assert_eq!(listing[0].folders.len(), 1);
        assert_eq!(listing[0].folders[0].category, Category::Medical);
        assert_eq!(listing[0].folders[0].files.len(), 3);
    }

    #[tokio::test]
    async fn test_delete_missing_is_not_found() {
        let dir = TempDir::new().unwrap();
        let store = LocalStore::new(dir.path());

        let receipt = store
            .store(Category::Patient, "Alpha", vec![payload("a.txt")])
            .await
            .unwrap();
        let saved = &receipt.files[0].saved_as;

        store.delete(Category::Patient, "Alpha", saved).await.unwrap();
        let err = store
            .delete(Category::Patient, "Alpha", saved)
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_rejects_bad_workspace_names() {
        let dir = TempDir::new().unwrap();
        let store = LocalStore::new(dir.path());

        for name in ["", "  ", "..", "a/b"] {
            let err = store
                .store(Category::Medical, name, vec![payload("a.txt")])
                .await
                .unwrap_err();
            assert_eq!(err.status_code(), Some(400), "name {:?}", name);
        }
    }

    #[tokio::test]
    async fn test_missing_root_lists_nothing() {
        let dir = TempDir::new().unwrap();
        let store = LocalStore::new(dir.path().join("absent"));
        assert!(store.list_workspaces().await.unwrap().is_empty());
    }
}
