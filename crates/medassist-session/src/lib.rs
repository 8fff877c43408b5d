//! Session binding for MedAssist
//!
//! Wires one workspace store, the two category controllers and the chat
//! manager together, and keeps chat scoped to the active workspace.

pub mod backends;
pub mod identity;
pub mod session;

pub use backends::SessionBackends;
pub use identity::{guest_id, GUEST_ID_KEY};
pub use session::WorkspaceSession;

use medassist_conversation::ChatError;
use medassist_core::{ErrorKind, StorageError};
use medassist_documents::DocumentError;
use medassist_sdk::SdkError;
use medassist_workspace::WorkspaceError;
use thiserror::Error;

/// Errors raised while building or using a session
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("No workspace is active")]
    NoActiveWorkspace,

    #[error(transparent)]
    Workspace(#[from] WorkspaceError),

    #[error(transparent)]
    Document(#[from] DocumentError),

    #[error(transparent)]
    Chat(#[from] ChatError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Backend setup failed: {0}")]
    Setup(#[from] SdkError),
}

impl SessionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SessionError::NoActiveWorkspace => ErrorKind::Validation,
            SessionError::Workspace(e) => e.kind(),
            SessionError::Document(e) => e.kind(),
            SessionError::Chat(e) => e.kind(),
            SessionError::Storage(_) | SessionError::Setup(_) => ErrorKind::Unexpected,
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            SessionError::Workspace(e) => e.user_message(),
            SessionError::Document(e) => e.user_message(),
            SessionError::Chat(e) => e.user_message(),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SessionError>;
