//! Chat session manager
//!
//! Owns the thread history, the visible conversation and the send state
//! machine. Locks are only held between awaits: the user message is applied
//! before the backend call and the reply after it.

use chrono::Utc;
use medassist_core::{
    load_json, save_json, ChatBackend, ChatReply, Notice, Notifier, StateStorage, ThreadId,
    Workspace, WorkspaceId,
};
use parking_lot::RwLock;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::history::{ChatMessage, ChatThread, MessageContent};
use crate::{ChatError, Result};

/// Storage key of the persisted thread history
pub const CHAT_HISTORY_KEY: &str = "chatHistory";

/// Assistant reply shown in place of a failed exchange
pub const ERROR_REPLY: &str =
    "Sorry, I encountered an error while processing your request. Please try again.";

/// Send state of the visible conversation.
///
/// `Received` and `Failed` describe the last exchange and accept a new send
/// like `Idle` does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatStatus {
    Idle,
    Sending,
    Received,
    Failed,
}

#[derive(Debug, Clone)]
struct ScopedWorkspace {
    id: WorkspaceId,
    name: String,
}

struct ChatState {
    /// Newest first
    threads: Vec<ChatThread>,
    active_thread: Option<ThreadId>,
    visible: Vec<ChatMessage>,
    status: ChatStatus,
    workspace: Option<ScopedWorkspace>,
    /// Bumped whenever the visible conversation is replaced
    epoch: u64,
}

impl ChatState {
    /// Append to a stored thread and move it to the front.
    fn append_to_thread(&mut self, id: ThreadId, message: ChatMessage) -> bool {
        let Some(pos) = self.threads.iter().position(|t| t.id == id) else {
            return false;
        };
        let mut thread = self.threads.remove(pos);
        thread.push(message);
        self.threads.insert(0, thread);
        true
    }

    fn reset_visible(&mut self, messages: Vec<ChatMessage>) {
        self.visible = messages;
        self.status = ChatStatus::Idle;
        self.epoch += 1;
    }
}

/// What a send needs to remember across the backend call
struct SendTicket {
    epoch: u64,
    thread: Option<ThreadId>,
    workspace_id: Option<WorkspaceId>,
    user: ChatMessage,
}

/// Clears the typing placeholder when a send is dropped before it settles
struct PendingSend<'a> {
    state: &'a RwLock<ChatState>,
    epoch: u64,
    settled: bool,
}

impl<'a> PendingSend<'a> {
    fn new(state: &'a RwLock<ChatState>, epoch: u64) -> Self {
        Self {
            state,
            epoch,
            settled: false,
        }
    }

    fn settle(mut self) {
        self.settled = true;
    }
}

impl Drop for PendingSend<'_> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        let mut state = self.state.write();
        if state.epoch != self.epoch || state.status != ChatStatus::Sending {
            return;
        }
        state.visible.retain(|m| !m.is_typing);
        state.status = ChatStatus::Idle;
        debug!("Chat send dropped before a reply arrived");
    }
}

/// Greeting seeded into a fresh conversation
pub fn greeting(workspace_name: Option<&str>) -> String {
    match workspace_name {
        Some(name) => format!(
            "Hello! I'm your medical assistant for the \"{}\" workspace. How can I help you today?",
            name
        ),
        None => "Hello! I'm your medical assistant. How can I help you today?".to_string(),
    }
}

/// Manages chat threads scoped to the active workspace
pub struct ChatSessionManager {
    state: RwLock<ChatState>,
    backend: Arc<dyn ChatBackend>,
    storage: Arc<dyn StateStorage>,
    notifier: Arc<dyn Notifier>,
}

impl ChatSessionManager {
    /// Load thread history and start with a generic greeting.
    pub fn open(
        backend: Arc<dyn ChatBackend>,
        storage: Arc<dyn StateStorage>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self> {
        let mut threads: Vec<ChatThread> =
            load_json(storage.as_ref(), CHAT_HISTORY_KEY)?.unwrap_or_default();
        threads.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        info!(threads = threads.len(), "Loaded chat history");

        Ok(Self {
            state: RwLock::new(ChatState {
                threads,
                active_thread: None,
                visible: vec![ChatMessage::assistant(greeting(None).as_str())],
                status: ChatStatus::Idle,
                workspace: None,
                epoch: 0,
            }),
            backend,
            storage,
            notifier,
        })
    }

    pub fn status(&self) -> ChatStatus {
        self.state.read().status
    }

    pub fn visible_messages(&self) -> Vec<ChatMessage> {
        self.state.read().visible.clone()
    }

    pub fn active_thread(&self) -> Option<ChatThread> {
        let state = self.state.read();
        let id = state.active_thread?;
        state.threads.iter().find(|t| t.id == id).cloned()
    }

    /// All stored threads, newest first
    pub fn threads(&self) -> Vec<ChatThread> {
        self.state.read().threads.clone()
    }

    pub fn threads_for_workspace(&self, workspace_id: &WorkspaceId) -> Vec<ChatThread> {
        self.state
            .read()
            .threads
            .iter()
            .filter(|t| t.belongs_to(workspace_id))
            .cloned()
            .collect()
    }

    pub fn thread(&self, id: ThreadId) -> Option<ChatThread> {
        self.state
            .read()
            .threads
            .iter()
            .find(|t| t.id == id)
            .cloned()
    }

    /// Send a message and append the reply.
    ///
    /// On backend failure the fixed error reply is shown, a notice goes to
    /// the notifier and the error is returned. Dropping the future before
    /// the reply arrives leaves the conversation idle again.
    #[instrument(skip(self, message), fields(len = message.len()))]
    pub async fn send(&self, message: &str) -> Result<ChatReply> {
        if message.trim().is_empty() {
            return Err(ChatError::EmptyMessage);
        }

        let ticket = self.begin_send(message)?;
        let pending = PendingSend::new(&self.state, ticket.epoch);
        let outcome = self.backend.chat(message).await;
        pending.settle();

        match outcome {
            Ok(reply) => {
                self.complete(ticket, reply.clone());
                Ok(reply)
            }
            Err(e) => {
                self.fail(ticket);
                warn!(error = %e, "Chat request failed");
                self.notifier.notify(Notice::error(e.user_message()));
                Err(ChatError::Backend(e))
            }
        }
    }

    fn begin_send(&self, message: &str) -> Result<SendTicket> {
        let user = ChatMessage::user(message);
        let ticket = {
            let mut state = self.state.write();
            if state.status == ChatStatus::Sending {
                return Err(ChatError::Busy);
            }

            state.visible.push(user.clone());
            if let Some(id) = state.active_thread {
                state.append_to_thread(id, user.clone());
            }
            state.visible.push(ChatMessage::typing());
            state.status = ChatStatus::Sending;

            SendTicket {
                epoch: state.epoch,
                thread: state.active_thread,
                workspace_id: state.workspace.as_ref().map(|w| w.id.clone()),
                user,
            }
        };

        if ticket.thread.is_some() {
            self.persist();
        }
        Ok(ticket)
    }

    fn complete(&self, ticket: SendTicket, reply: ChatReply) {
        let reply_message = ChatMessage::assistant(MessageContent::from(reply));
        {
            let mut state = self.state.write();
            let current = state.epoch == ticket.epoch;

            match ticket.thread {
                Some(id) => {
                    if !state.append_to_thread(id, reply_message.clone()) {
                        debug!(thread = %id, "Reply for a deleted thread dropped from history");
                    }
                }
                None => {
                    let thread = ChatThread::from_exchange(
                        ticket.user,
                        reply_message.clone(),
                        ticket.workspace_id,
                    );
                    debug!(thread = %thread.id, title = %thread.title, "Created chat thread");
                    if current {
                        state.active_thread = Some(thread.id);
                    }
                    state.threads.insert(0, thread);
                }
            }

            if current {
                state.visible.retain(|m| !m.is_typing);
                state.visible.push(reply_message);
                state.status = ChatStatus::Received;
            } else {
                debug!("Conversation changed while waiting; reply kept in history only");
            }
        }

        self.persist();
    }

    fn fail(&self, ticket: SendTicket) {
        let mut state = self.state.write();
        if state.epoch != ticket.epoch {
            return;
        }
        state.visible.retain(|m| !m.is_typing);
        state.visible.push(ChatMessage::assistant(ERROR_REPLY));
        state.status = ChatStatus::Failed;
    }

    /// Clear the active thread and greet again; history is kept.
    pub fn new_chat(&self) {
        let mut state = self.state.write();
        let name = state.workspace.as_ref().map(|w| w.name.clone());
        state.active_thread = None;
        state.reset_visible(vec![ChatMessage::assistant(
            greeting(name.as_deref()).as_str(),
        )]);
    }

    /// Scope the conversation to `workspace` and show its greeting.
    pub fn switch_workspace(&self, workspace: Option<&Workspace>) {
        let mut state = self.state.write();
        state.workspace = workspace.map(|w| ScopedWorkspace {
            id: w.id.clone(),
            name: w.name.clone(),
        });
        state.active_thread = None;
        state.reset_visible(vec![ChatMessage::assistant(
            greeting(workspace.map(|w| w.name.as_str())).as_str(),
        )]);
        debug!(workspace = ?workspace.map(|w| &w.name), "Chat switched workspace");
    }

    /// Make a stored thread the active one and show its messages.
    pub fn select_thread(&self, id: ThreadId) -> Result<ChatThread> {
        let mut state = self.state.write();
        let thread = state
            .threads
            .iter()
            .find(|t| t.id == id)
            .cloned()
            .ok_or(ChatError::ThreadNotFound(id))?;

        state.active_thread = Some(id);
        state.reset_visible(thread.messages.clone());
        Ok(thread)
    }

    pub fn delete_thread(&self, id: ThreadId) -> Result<()> {
        {
            let mut state = self.state.write();
            let before = state.threads.len();
            state.threads.retain(|t| t.id != id);
            if state.threads.len() == before {
                return Err(ChatError::ThreadNotFound(id));
            }

            if state.active_thread == Some(id) {
                let name = state.workspace.as_ref().map(|w| w.name.clone());
                state.active_thread = None;
                state.reset_visible(vec![ChatMessage::assistant(
                    greeting(name.as_deref()).as_str(),
                )]);
            }
        }

        let threads = self.threads();
        save_json(self.storage.as_ref(), CHAT_HISTORY_KEY, &threads)?;
        Ok(())
    }

    fn persist(&self) {
        let threads = self.threads();
        if let Err(e) = save_json(self.storage.as_ref(), CHAT_HISTORY_KEY, &threads) {
            warn!(error = %e, "Failed to persist chat history");
        }
    }

    /// Timestamp of the newest thread activity, if any
    pub fn last_activity(&self) -> Option<chrono::DateTime<Utc>> {
        self.state.read().threads.iter().map(|t| t.timestamp).max()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use medassist_core::{BackendError, CollectingNotifier, MemoryStorage, NoticeLevel};
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;
    use tokio::sync::Notify;

    /// Replies with a canned answer, fails on demand, or waits for a signal.
    struct FakeChat {
        fail: Mutex<bool>,
        gate: Option<Arc<Notify>>,
        received: Mutex<Vec<String>>,
    }

    impl FakeChat {
        fn new() -> Self {
            Self {
                fail: Mutex::new(false),
                gate: None,
                received: Mutex::new(Vec::new()),
            }
        }

        fn gated(gate: Arc<Notify>) -> Self {
            Self {
                gate: Some(gate),
                ..Self::new()
            }
        }
    }

    #[async_trait]
    impl ChatBackend for FakeChat {
        async fn chat(&self, message: &str) -> std::result::Result<ChatReply, BackendError> {
            self.received.lock().push(message.to_string());
            if let Some(ref gate) = self.gate {
                gate.notified().await;
            }
            if *self.fail.lock() {
                return Err(BackendError::server(500, Some("model offline".to_string())));
            }
            Ok(ChatReply::Text(format!("echo: {}", message)))
        }
    }

    fn manager_with(
        chat: FakeChat,
    ) -> (
        Arc<ChatSessionManager>,
        Arc<FakeChat>,
        Arc<MemoryStorage>,
        Arc<CollectingNotifier>,
    ) {
        let chat = Arc::new(chat);
        let storage = Arc::new(MemoryStorage::new());
        let notifier = Arc::new(CollectingNotifier::new());
        let manager = Arc::new(
            ChatSessionManager::open(chat.clone(), storage.clone(), notifier.clone()).unwrap(),
        );
        (manager, chat, storage, notifier)
    }

    #[tokio::test]
    async fn test_first_message_creates_thread() {
        let (manager, chat, _, _) = manager_with(FakeChat::new());
        let alpha = Workspace::new("Alpha");
        manager.switch_workspace(Some(&alpha));

        manager.send("Hello").await.unwrap();

        let thread = manager.active_thread().unwrap();
        assert_eq!(thread.title, "Hello");
        assert_eq!(thread.preview, "Hello");
        assert_eq!(thread.messages.len(), 2);
        assert_eq!(thread.workspace_id, Some(alpha.id.clone()));

        let long = "This is a longer message that should be truncated for the title field";
        manager.send(long).await.unwrap();

        let thread = manager.active_thread().unwrap();
        assert_eq!(thread.title, "Hello");
        assert_eq!(thread.messages.len(), 4);
        assert_eq!(manager.threads().len(), 1);
        assert_eq!(*chat.received.lock(), vec!["Hello".to_string(), long.to_string()]);
        assert_eq!(manager.status(), ChatStatus::Received);
    }

    #[tokio::test]
    async fn test_rejects_blank_message() {
        let (manager, chat, _, _) = manager_with(FakeChat::new());
        assert!(matches!(manager.send("  \n").await, Err(ChatError::EmptyMessage)));
        assert!(chat.received.lock().is_empty());
    }

    #[tokio::test]
    async fn test_failure_appends_error_reply_and_notifies() {
        let (manager, chat, _, notifier) = manager_with(FakeChat::new());
        *chat.fail.lock() = true;

        let err = manager.send("Hello").await.unwrap_err();
        assert_eq!(err.user_message(), "model offline");

        let visible = manager.visible_messages();
        let last = visible.last().unwrap();
        assert!(!last.is_user);
        assert_eq!(last.content.display(), ERROR_REPLY);
        assert!(visible.iter().all(|m| !m.is_typing));
        assert!(manager.active_thread().is_none());
        assert_eq!(manager.status(), ChatStatus::Failed);

        let notices = notifier.drain();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].level, NoticeLevel::Error);
    }

    #[tokio::test]
    async fn test_busy_while_sending_and_typing_placeholder() {
        let gate = Arc::new(Notify::new());
        let (manager, _, _, _) = manager_with(FakeChat::gated(gate.clone()));

        let pending = {
            let manager = manager.clone();
            tokio::spawn(async move { manager.send("first").await })
        };
        while manager.status() != ChatStatus::Sending {
            tokio::task::yield_now().await;
        }

        assert!(manager.visible_messages().last().unwrap().is_typing);
        assert!(matches!(manager.send("second").await, Err(ChatError::Busy)));

        gate.notify_one();
        pending.await.unwrap().unwrap();
        assert!(manager.visible_messages().iter().all(|m| !m.is_typing));
    }

    #[tokio::test]
    async fn test_aborted_send_releases_conversation() {
        let gate = Arc::new(Notify::new());
        let (manager, _, _, _) = manager_with(FakeChat::gated(gate.clone()));

        let pending = {
            let manager = manager.clone();
            tokio::spawn(async move { manager.send("first").await })
        };
        while manager.status() != ChatStatus::Sending {
            tokio::task::yield_now().await;
        }

        pending.abort();
        assert!(pending.await.unwrap_err().is_cancelled());

        assert_eq!(manager.status(), ChatStatus::Idle);
        assert!(manager.visible_messages().iter().all(|m| !m.is_typing));

        // the stored permit lets the next request through
        gate.notify_one();
        let reply = manager.send("second").await.unwrap();
        assert_eq!(reply, ChatReply::Text("echo: second".to_string()));
        assert_eq!(manager.status(), ChatStatus::Received);
    }

    #[tokio::test]
    async fn test_resumed_thread_moves_to_front() {
        let (manager, _, _, _) = manager_with(FakeChat::new());
        manager.send("Hello").await.unwrap();
        let first = manager.active_thread().unwrap().id;

        manager.new_chat();
        manager.send("Another topic").await.unwrap();
        assert_ne!(manager.threads()[0].id, first);

        manager.select_thread(first).unwrap();
        manager.send("Back to the first").await.unwrap();

        let threads = manager.threads();
        assert_eq!(threads[0].id, first);
        assert!(threads[0].timestamp >= threads[1].timestamp);
    }

    #[tokio::test]
    async fn test_late_reply_stays_out_of_view() {
        let gate = Arc::new(Notify::new());
        let (manager, _, _, _) = manager_with(FakeChat::gated(gate.clone()));
        let alpha = Workspace::new("Alpha");
        let beta = Workspace::new("Beta");
        manager.switch_workspace(Some(&alpha));

        let pending = {
            let manager = manager.clone();
            tokio::spawn(async move { manager.send("about alpha").await })
        };
        while manager.status() != ChatStatus::Sending {
            tokio::task::yield_now().await;
        }

        manager.switch_workspace(Some(&beta));
        gate.notify_one();
        pending.await.unwrap().unwrap();

        // stored under Alpha, not shown in Beta's conversation
        assert_eq!(manager.threads_for_workspace(&alpha.id).len(), 1);
        assert!(manager.threads_for_workspace(&beta.id).is_empty());
        assert!(manager.active_thread().is_none());
        assert_eq!(manager.visible_messages().len(), 1);
        assert!(manager.visible_messages()[0]
            .content
            .display()
            .contains("Beta"));
    }

    #[tokio::test]
    async fn test_new_chat_keeps_history() {
        let (manager, _, _, _) = manager_with(FakeChat::new());
        manager.switch_workspace(Some(&Workspace::new("Alpha")));
        manager.send("Hello").await.unwrap();

        manager.new_chat();
        assert!(manager.active_thread().is_none());
        assert_eq!(manager.threads().len(), 1);
        assert_eq!(
            manager.visible_messages()[0].content.display(),
            greeting(Some("Alpha"))
        );

        manager.send("Another topic").await.unwrap();
        assert_eq!(manager.threads().len(), 2);
        assert_eq!(manager.threads()[0].title, "Another topic");
    }

    #[tokio::test]
    async fn test_select_and_delete_thread() {
        let (manager, _, storage, _) = manager_with(FakeChat::new());
        manager.send("Hello").await.unwrap();
        let id = manager.active_thread().unwrap().id;

        manager.new_chat();
        let selected = manager.select_thread(id).unwrap();
        assert_eq!(manager.visible_messages(), selected.messages);

        manager.delete_thread(id).unwrap();
        assert!(manager.threads().is_empty());
        assert!(manager.active_thread().is_none());
        assert_eq!(storage.raw(CHAT_HISTORY_KEY).as_deref(), Some("[]"));
        assert!(matches!(
            manager.delete_thread(id),
            Err(ChatError::ThreadNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_history_survives_reopen() {
        let (manager, chat, storage, notifier) = manager_with(FakeChat::new());
        manager.send("Hello").await.unwrap();
        let before = manager.threads();

        let reopened = ChatSessionManager::open(chat, storage, notifier).unwrap();
        assert_eq!(reopened.threads(), before);
        assert!(reopened.active_thread().is_none());
    }

    #[test]
    fn test_greetings() {
        assert!(greeting(Some("Alpha")).contains("\"Alpha\""));
        assert!(!greeting(None).contains('"'));
    }
}
