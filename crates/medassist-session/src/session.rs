//! The workspace session

use medassist_conversation::ChatSessionManager;
use medassist_core::{
    Category, FilePayload, LimitsConfig, Notifier, ProcessResult, StateStorage, Workspace,
    WorkspaceEvent, WorkspaceObserver, WorkspaceSnapshot,
};
use medassist_documents::{BestEffort, CategoryController, UploadGateway, UploadReport};
use medassist_ingestion::ValidationPolicy;
use medassist_workspace::WorkspaceStore;
use std::sync::Arc;
use tracing::{debug, info};

use crate::backends::SessionBackends;
use crate::{Result, SessionError};

/// Resets the chat whenever the active workspace moves
struct ChatBinding {
    chat: Arc<ChatSessionManager>,
}

impl WorkspaceObserver for ChatBinding {
    fn on_workspace_event(&self, event: &WorkspaceEvent, snapshot: &WorkspaceSnapshot) {
        if let WorkspaceEvent::ActiveChanged { current, .. } = event {
            debug!(active = ?current, "Rescoping chat to active workspace");
            self.chat.switch_workspace(snapshot.active.as_ref());
        }
    }
}

/// One user's workspaces, documents and chat
pub struct WorkspaceSession {
    workspaces: Arc<WorkspaceStore>,
    medical: CategoryController,
    patient: CategoryController,
    chat: Arc<ChatSessionManager>,
}

impl WorkspaceSession {
    /// Load persisted state, create the default workspace on first run and
    /// register the document and chat observers.
    pub fn open(
        storage: Arc<dyn StateStorage>,
        backends: SessionBackends,
        limits: &LimitsConfig,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self> {
        let workspaces = Arc::new(WorkspaceStore::open(
            Arc::clone(&storage),
            Arc::clone(&backends.store),
        )?);
        workspaces.ensure_default_workspace()?;

        let gateway = UploadGateway::new(backends.store, backends.processing);
        let controller = |category| {
            CategoryController::attach(
                category,
                gateway.clone(),
                Arc::clone(&workspaces),
                ValidationPolicy::for_category(category).with_limits(limits),
            )
        };
        let medical = controller(Category::Medical);
        let patient = controller(Category::Patient);

        let chat = Arc::new(ChatSessionManager::open(backends.chat, storage, notifier)?);
        chat.switch_workspace(workspaces.active_workspace().as_ref());
        workspaces.subscribe(Arc::new(ChatBinding {
            chat: Arc::clone(&chat),
        }));

        info!(
            workspaces = workspaces.len(),
            active = ?workspaces.active_id(),
            "Session ready"
        );

        Ok(Self {
            workspaces,
            medical,
            patient,
            chat,
        })
    }

    pub fn workspaces(&self) -> &WorkspaceStore {
        &self.workspaces
    }

    pub fn controller(&self, category: Category) -> &CategoryController {
        match category {
            Category::Medical => &self.medical,
            Category::Patient => &self.patient,
        }
    }

    pub fn chat(&self) -> &ChatSessionManager {
        &self.chat
    }

    pub fn active_workspace(&self) -> Result<Workspace> {
        self.workspaces
            .active_workspace()
            .ok_or(SessionError::NoActiveWorkspace)
    }

    /// Reload folder listings; controllers pick them up through their observers.
    pub async fn refresh(&self) -> Result<Vec<Workspace>> {
        Ok(self.workspaces.refresh_workspaces().await?)
    }

    pub async fn upload(&self, category: Category, files: Vec<FilePayload>) -> Result<UploadReport> {
        let workspace = self.active_workspace()?;
        Ok(self
            .controller(category)
            .upload(files, &workspace.name)
            .await?)
    }

    pub async fn delete_document(
        &self,
        category: Category,
        file_name: &str,
    ) -> Result<BestEffort<()>> {
        let workspace = self.active_workspace()?;
        Ok(self
            .controller(category)
            .delete(file_name, &workspace.name)
            .await?)
    }

    pub async fn process_url(&self, category: Category, url: &str) -> Result<ProcessResult> {
        let workspace = self.active_workspace()?;
        Ok(self
            .controller(category)
            .process_url(url, &workspace.name)
            .await?)
    }

    pub async fn retry_process(
        &self,
        category: Category,
        references: &[String],
    ) -> Result<ProcessResult> {
        let workspace = self.active_workspace()?;
        Ok(self
            .controller(category)
            .retry_process(references, &workspace.name)
            .await?)
    }
}

impl std::fmt::Debug for WorkspaceSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkspaceSession")
            .field("workspaces", &self.workspaces)
            .field("medical", &self.medical)
            .field("patient", &self.patient)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use medassist_core::{
        BackendError, ChatBackend, ChatReply, CollectingNotifier, Folder, MemoryStorage,
        ProcessingBackend, StoreBackend, StoreReceipt, StoredFile, WorkspaceListing,
    };
    use parking_lot::Mutex;
    use std::collections::BTreeMap;

    /// All three backends in one, keyed by workspace name
    #[derive(Default)]
    struct FakeBackends {
        files: Mutex<BTreeMap<String, Vec<String>>>,
    }

    #[async_trait]
    impl StoreBackend for FakeBackends {
        async fn store(
            &self,
            _category: Category,
            workspace_name: &str,
            files: Vec<FilePayload>,
        ) -> std::result::Result<StoreReceipt, BackendError> {
            let stored: Vec<StoredFile> = files
                .iter()
                .map(|f| StoredFile {
                    original_name: f.name.clone(),
                    saved_as: format!("ref-{}", f.name),
                    size: f.size(),
                    content_type: f.content_type.clone(),
                })
                .collect();
            self.files
                .lock()
                .entry(workspace_name.to_string())
                .or_default()
                .extend(stored.iter().map(|f| f.saved_as.clone()));
            Ok(StoreReceipt {
                message: String::new(),
                processed_files: stored.len(),
                files: stored,
            })
        }

        async fn delete(
            &self,
            _category: Category,
            _workspace_name: &str,
            _file_name: &str,
        ) -> std::result::Result<(), BackendError> {
            Ok(())
        }

        async fn list_workspaces(
            &self,
        ) -> std::result::Result<Vec<WorkspaceListing>, BackendError> {
            Ok(self
                .files
                .lock()
                .iter()
                .map(|(name, files)| WorkspaceListing {
                    name: name.clone(),
                    folders: vec![Folder::new(Category::Medical, files.clone())],
                })
                .collect())
        }
    }

    #[async_trait]
    impl ProcessingBackend for FakeBackends {
        async fn process_files(
            &self,
            _category: Category,
            references: &[String],
            _workspace_name: &str,
        ) -> std::result::Result<ProcessResult, BackendError> {
            Ok(ProcessResult(serde_json::json!({"processedFiles": references.len()})))
        }

        async fn process_url(
            &self,
            _category: Category,
            _url: &str,
            _workspace_name: &str,
        ) -> std::result::Result<ProcessResult, BackendError> {
            Ok(ProcessResult(serde_json::json!({})))
        }

        async fn remove_document(
            &self,
            _category: Category,
            _file_name: &str,
            _workspace_name: &str,
        ) -> std::result::Result<(), BackendError> {
            Ok(())
        }
    }

    #[async_trait]
    impl ChatBackend for FakeBackends {
        async fn chat(&self, message: &str) -> std::result::Result<ChatReply, BackendError> {
            Ok(ChatReply::Text(format!("re: {}", message)))
        }
    }

    fn open_session(storage: Arc<MemoryStorage>) -> WorkspaceSession {
        let fake = Arc::new(FakeBackends::default());
        let backends = SessionBackends::new(fake.clone(), fake.clone(), fake);
        WorkspaceSession::open(
            storage,
            backends,
            &LimitsConfig::default(),
            Arc::new(CollectingNotifier::new()),
        )
        .unwrap()
    }

    #[test]
    fn test_first_run_creates_default_workspace() {
        let session = open_session(Arc::new(MemoryStorage::new()));
        let active = session.active_workspace().unwrap();

        assert_eq!(active.name, "My Workspace");
        assert!(session.chat().visible_messages()[0]
            .content
            .display()
            .contains("My Workspace"));
    }

    #[tokio::test]
    async fn test_upload_uses_active_workspace() {
        let session = open_session(Arc::new(MemoryStorage::new()));
        let file = FilePayload::new("a.pdf", "application/pdf", vec![1, 2, 3]);

        let report = session.upload(Category::Medical, vec![file]).await.unwrap();

        assert_eq!(report.reference_names, vec!["ref-a.pdf"]);
        assert_eq!(
            session.controller(Category::Medical).documents(),
            vec!["ref-a.pdf"]
        );
        assert!(session.controller(Category::Patient).documents().is_empty());
    }

    #[tokio::test]
    async fn test_switching_workspace_resets_chat() {
        let session = open_session(Arc::new(MemoryStorage::new()));
        session.chat().send("Hello").await.unwrap();
        assert!(session.chat().active_thread().is_some());

        let beta = session.workspaces().create_workspace("Beta").unwrap();

        assert!(session.chat().active_thread().is_none());
        assert_eq!(session.chat().threads().len(), 1);
        assert!(session.chat().threads_for_workspace(&beta.id).is_empty());
        assert!(session.chat().visible_messages()[0]
            .content
            .display()
            .contains("Beta"));
    }

    #[test]
    fn test_reopen_keeps_state() {
        let storage = Arc::new(MemoryStorage::new());
        let first = open_session(storage.clone());
        let beta = first.workspaces().create_workspace("Beta").unwrap();
        drop(first);

        let second = open_session(storage);
        assert_eq!(second.workspaces().len(), 2);
        assert_eq!(second.active_workspace().unwrap().id, beta.id);
    }
}
