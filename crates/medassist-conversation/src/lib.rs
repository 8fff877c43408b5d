//! Chat session management for MedAssist
//!
//! This crate provides:
//! - Chat threads bound to a workspace, with persisted history
//! - The send state machine with optimistic updates and late-reply handling
//! - Rendering of plain and structured assistant replies
//! - Thread export in JSON, Markdown and plain text

pub mod history;
pub mod manager;
pub mod render;

pub use history::{export_thread, ChatMessage, ChatThread, ExportFormat, MessageContent};
pub use manager::{ChatSessionManager, ChatStatus, CHAT_HISTORY_KEY, ERROR_REPLY};
pub use render::render_reply;

use medassist_core::{BackendError, ErrorKind, StorageError, ThreadId};
use thiserror::Error;

/// Errors that can occur in chat operations
#[derive(Error, Debug)]
pub enum ChatError {
    #[error("Message must not be empty")]
    EmptyMessage,

    #[error("A message is already being sent")]
    Busy,

    #[error("Thread not found: {0}")]
    ThreadNotFound(ThreadId),

    #[error("Chat request failed: {0}")]
    Backend(#[from] BackendError),

    #[error("Chat history error: {0}")]
    Persistence(#[from] StorageError),
}

impl ChatError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ChatError::EmptyMessage | ChatError::Busy | ChatError::ThreadNotFound(_) => {
                ErrorKind::Validation
            }
            ChatError::Backend(e) => e.kind(),
            ChatError::Persistence(_) => ErrorKind::Unexpected,
        }
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            ChatError::Busy => true,
            ChatError::Backend(e) => e.is_retryable(),
            _ => false,
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            ChatError::Backend(e) => e.user_message(),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ChatError>;
