//! Error types for the MedAssist backend clients

use medassist_core::BackendError;
use thiserror::Error;

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, SdkError>;

/// Errors that can occur when talking to a backend
#[derive(Error, Debug)]
pub enum SdkError {
    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response
    #[error("API error ({status}): {}", .message.as_deref().unwrap_or("no message"))]
    Api { status: u16, message: Option<String> },

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parsing failed
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// Local filesystem failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),
}

impl SdkError {
    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            SdkError::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            SdkError::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Get the HTTP status code if available
    pub fn status_code(&self) -> Option<u16> {
        match self {
            SdkError::Api { status, .. } => Some(*status),
            SdkError::Http(e) => e.status().map(|s| s.as_u16()),
            SdkError::NotFound(_) => Some(404),
            SdkError::InvalidInput(_) => Some(400),
            _ => None,
        }
    }
}

impl From<SdkError> for BackendError {
    fn from(err: SdkError) -> Self {
        match err {
            SdkError::Http(e) if e.is_timeout() => BackendError::timeout(e.to_string()),
            SdkError::Http(e) if e.is_decode() || e.is_builder() => {
                BackendError::unexpected(e.to_string())
            }
            SdkError::Http(e) => match e.status() {
                Some(status) => BackendError::server(status.as_u16(), None),
                // no status means no response was received
                None => BackendError::network(e.to_string()),
            },
            SdkError::Api { status, message } => BackendError::server(status, message),
            SdkError::NotFound(message) => BackendError::server(404, Some(message)),
            SdkError::InvalidInput(message) => BackendError::server(400, Some(message)),
            other => BackendError::unexpected(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use medassist_core::ErrorKind;

    #[test]
    fn test_api_error_conversion() {
        let err = SdkError::Api {
            status: 422,
            message: Some("Unsupported document".to_string()),
        };
        assert_eq!(err.status_code(), Some(422));
        assert!(!err.is_retryable());

        let backend: BackendError = err.into();
        assert_eq!(backend.kind(), ErrorKind::Server);
        assert_eq!(backend.user_message(), "Unsupported document");
    }

    #[test]
    fn test_local_errors_are_unexpected() {
        let io = SdkError::Io(std::io::Error::new(std::io::ErrorKind::Other, "disk full"));
        let backend: BackendError = io.into();
        assert_eq!(backend.kind(), ErrorKind::Unexpected);

        let missing: BackendError = SdkError::NotFound("scan.pdf".to_string()).into();
        assert!(missing.is_not_found());
    }

    #[test]
    fn test_malformed_request_is_not_retryable() {
        let err = reqwest::multipart::Part::bytes(b"scan".to_vec())
            .mime_str("not a mime type")
            .unwrap_err();
        assert!(err.is_builder());

        let backend: BackendError = SdkError::Http(err).into();
        assert_eq!(backend.kind(), ErrorKind::Unexpected);
        assert!(!backend.is_retryable());
    }
}
