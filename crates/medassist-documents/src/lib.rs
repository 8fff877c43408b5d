//! Document ingestion for MedAssist
//!
//! The [`UploadGateway`] runs the two-phase upload against the store and
//! processing backends; a [`CategoryController`] drives it for one document
//! category and keeps the user-visible state (documents, loading, error).

pub mod controller;
pub mod gateway;

pub use controller::{CategoryController, ControllerState};
pub use gateway::{BestEffort, GatewayError, UploadGateway, UploadReport};

use medassist_core::{BackendError, ErrorKind};
use medassist_ingestion::ValidationError;
use medassist_workspace::WorkspaceError;
use serde::Serialize;
use thiserror::Error;

/// Step that failed after an earlier step already had an effect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailedStep {
    /// A later chunk failed to store after earlier chunks were stored
    Store,
    /// Processing failed after the files were stored
    Process,
    /// The backend call succeeded but the workspace refresh did not
    Refresh,
}

/// Errors surfaced by document operations
#[derive(Error, Debug)]
pub enum DocumentError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error("Partial failure at {step:?} step ({} reference(s) affected): {cause}", references.len())]
    PartialFailure {
        references: Vec<String>,
        step: FailedStep,
        cause: BackendError,
    },

    #[error(transparent)]
    Workspace(#[from] WorkspaceError),
}

impl DocumentError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DocumentError::Validation(e) => e.kind(),
            DocumentError::Gateway(e) => e.kind(),
            DocumentError::PartialFailure { .. } => ErrorKind::PartialFailure,
            DocumentError::Workspace(e) => e.kind(),
        }
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            DocumentError::Validation(_) => false,
            DocumentError::Gateway(e) => e.is_retryable(),
            DocumentError::PartialFailure { cause, .. } => cause.is_retryable(),
            DocumentError::Workspace(e) => e.is_retryable(),
        }
    }

    /// References already stored (or submitted) when a partial failure hit
    pub fn stored_references(&self) -> &[String] {
        match self {
            DocumentError::PartialFailure { references, .. } => references,
            _ => &[],
        }
    }

    /// Stored references that still need a processing call. Empty when the
    /// failure came after processing succeeded.
    pub fn unprocessed_references(&self) -> &[String] {
        match self {
            DocumentError::PartialFailure {
                references,
                step: FailedStep::Store | FailedStep::Process,
                ..
            } => references,
            _ => &[],
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            DocumentError::Validation(e) => e.user_message(),
            DocumentError::Gateway(e) => e.user_message(),
            DocumentError::PartialFailure {
                references,
                step,
                cause,
            } => match step {
                FailedStep::Store => format!(
                    "Only {} file(s) were saved before the upload failed: {}",
                    references.len(),
                    cause.user_message()
                ),
                FailedStep::Process => format!(
                    "Files were saved but could not be processed: {} You can retry processing.",
                    cause.user_message()
                ),
                FailedStep::Refresh => format!(
                    "The request succeeded but the document list could not be refreshed: {}",
                    cause.user_message()
                ),
            },
            DocumentError::Workspace(e) => e.user_message(),
        }
    }
}

pub(crate) fn workspace_cause(err: WorkspaceError) -> BackendError {
    match err {
        WorkspaceError::Backend(e) => e,
        other => BackendError::unexpected(other.to_string()),
    }
}

pub type Result<T> = std::result::Result<T, DocumentError>;
