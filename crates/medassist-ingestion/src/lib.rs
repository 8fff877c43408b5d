//! Upload validation for MedAssist
//!
//! Pure functions that decide what part of a user's submission may go over
//! the network:
//!
//! - Per-category MIME allow-lists and per-file size ceilings
//! - A cumulative batch ceiling that rejects the whole submission
//! - Request-sized chunking of the accepted files
//! - URL normalization and the single pending-URL slot

pub mod candidate;
pub mod links;
pub mod validation;

// Re-exports
pub use candidate::read_candidate;
pub use links::{normalize_url, PendingUrl};
pub use validation::{
    validate_batch, DropReason, DroppedFile, ValidatedBatch, ValidationPolicy,
};

use medassist_core::ErrorKind;

/// Input rejected before any network call
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("No valid files to upload")]
    NoValidFiles,

    #[error("Total upload size {total} bytes exceeds the limit of {limit} bytes")]
    BatchTooLarge { total: u64, limit: u64 },

    #[error("URL must not be empty")]
    EmptyUrl,

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl ValidationError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Validation
    }

    pub fn user_message(&self) -> String {
        match self {
            ValidationError::NoValidFiles => {
                "None of the selected files are supported or within the size limit.".to_string()
            }
            ValidationError::BatchTooLarge { limit, .. } => format!(
                "The selected files exceed the total upload limit of {} MB.",
                limit / (1024 * 1024)
            ),
            ValidationError::EmptyUrl => "Please enter a URL.".to_string(),
            ValidationError::InvalidUrl(input) => format!("'{}' is not a valid web address.", input),
        }
    }
}

pub type Result<T> = std::result::Result<T, ValidationError>;
