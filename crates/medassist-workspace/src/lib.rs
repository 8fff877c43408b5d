//! Workspace store for MedAssist
//!
//! Owns the set of workspaces and the active pointer, persists both through a
//! [`StateStorage`](medassist_core::StateStorage) adapter and tells registered
//! observers about every committed change.

pub mod store;

pub use store::{
    WorkspaceStore, ACTIVE_WORKSPACE_KEY, DEFAULT_WORKSPACE_NAME, WORKSPACES_KEY,
};

use medassist_core::{BackendError, ErrorKind, StorageError, WorkspaceId};
use thiserror::Error;

/// Errors raised by workspace operations
#[derive(Error, Debug)]
pub enum WorkspaceError {
    #[error("Cannot delete the last remaining workspace")]
    MinimumWorkspace,

    #[error("Workspace not found: {0}")]
    NotFound(WorkspaceId),

    #[error("Workspace name must not be empty")]
    InvalidName,

    #[error("A workspace named '{0}' already exists")]
    DuplicateName(String),

    #[error("Persistence error: {0}")]
    Persistence(#[from] StorageError),

    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),
}

impl WorkspaceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            WorkspaceError::MinimumWorkspace
            | WorkspaceError::NotFound(_)
            | WorkspaceError::InvalidName
            | WorkspaceError::DuplicateName(_) => ErrorKind::Validation,
            WorkspaceError::Persistence(_) => ErrorKind::Unexpected,
            WorkspaceError::Backend(e) => e.kind(),
        }
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            WorkspaceError::Backend(e) => e.is_retryable(),
            _ => false,
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            WorkspaceError::MinimumWorkspace => {
                "You must keep at least one workspace.".to_string()
            }
            WorkspaceError::Backend(e) => e.user_message(),
            WorkspaceError::Persistence(e) => format!("Unexpected error: {}", e),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, WorkspaceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(WorkspaceError::MinimumWorkspace.kind(), ErrorKind::Validation);
        assert_eq!(
            WorkspaceError::Backend(BackendError::network("refused")).kind(),
            ErrorKind::Network
        );
        assert!(WorkspaceError::Backend(BackendError::server(503, None)).is_retryable());
        assert_eq!(
            WorkspaceError::DuplicateName("Alpha".to_string()).user_message(),
            "A workspace named 'Alpha' already exists"
        );
    }
}
