//! Error taxonomy shared by every MedAssist component.

use thiserror::Error;

/// Classification of a failure as the user should understand it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad input, recoverable by user correction; never sent over the network
    Validation,
    /// No response received
    Network,
    /// HTTP error response
    Server,
    /// Some side effect already happened before the failure
    PartialFailure,
    /// Client-side unexpected failure
    Unexpected,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::Validation => write!(f, "validation"),
            ErrorKind::Network => write!(f, "network"),
            ErrorKind::Server => write!(f, "server"),
            ErrorKind::PartialFailure => write!(f, "partial_failure"),
            ErrorKind::Unexpected => write!(f, "unexpected"),
        }
    }
}

/// Transport-agnostic failure of a backend call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// No response was received (connection failure or timeout)
    #[error("No response from server: {message}")]
    Network { message: String, timed_out: bool },

    /// The backend answered with an HTTP error status
    #[error("Server error ({status}){}", .message.as_deref().map(|m| format!(": {}", m)).unwrap_or_default())]
    Server { status: u16, message: Option<String> },

    /// Failure on the client side (decoding, I/O, bad URL)
    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl BackendError {
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
            timed_out: false,
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
            timed_out: true,
        }
    }

    pub fn server(status: u16, message: Option<String>) -> Self {
        Self::Server { status, message }
    }

    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            BackendError::Network { .. } => ErrorKind::Network,
            BackendError::Server { .. } => ErrorKind::Server,
            BackendError::Unexpected(_) => ErrorKind::Unexpected,
        }
    }

    /// Get the HTTP status code if available
    pub fn status_code(&self) -> Option<u16> {
        match self {
            BackendError::Server { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Network failures and 5xx responses may succeed on a later attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            BackendError::Network { .. } => true,
            BackendError::Server { status, .. } => *status >= 500,
            BackendError::Unexpected(_) => false,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status_code() == Some(404)
    }

    /// Human-readable message; a server-provided message wins.
    pub fn user_message(&self) -> String {
        match self {
            BackendError::Network { timed_out: true, .. } => {
                "The server did not respond in time. Please try again.".to_string()
            }
            BackendError::Network { .. } => {
                "No response from server. Please check your connection and try again.".to_string()
            }
            BackendError::Server {
                message: Some(message),
                ..
            } if !message.trim().is_empty() => message.clone(),
            BackendError::Server { status, .. } => {
                format!("Request failed with status {}", status)
            }
            BackendError::Unexpected(message) => format!("Unexpected error: {}", message),
        }
    }
}

/// Errors raised by client-local durable storage
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Corrupt value under '{key}': {source}")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_message_preferred() {
        let err = BackendError::server(400, Some("Workspace name is required".to_string()));
        assert_eq!(err.user_message(), "Workspace name is required");
        assert_eq!(err.kind(), ErrorKind::Server);
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_generic_server_message() {
        let err = BackendError::server(502, None);
        assert_eq!(err.user_message(), "Request failed with status 502");
        assert!(err.is_retryable());

        let blank = BackendError::server(500, Some("  ".to_string()));
        assert_eq!(blank.user_message(), "Request failed with status 500");
    }

    #[test]
    fn test_network_distinct_from_server() {
        let net = BackendError::network("connection refused");
        let timeout = BackendError::timeout("deadline elapsed");
        let unexpected = BackendError::unexpected("invalid JSON");

        assert_eq!(net.kind(), ErrorKind::Network);
        assert_eq!(timeout.kind(), ErrorKind::Network);
        assert_ne!(net.user_message(), timeout.user_message());
        assert!(unexpected.user_message().starts_with("Unexpected error"));
        assert!(!unexpected.is_retryable());
    }

    #[test]
    fn test_display() {
        let err = BackendError::server(404, Some("File not found".to_string()));
        assert_eq!(err.to_string(), "Server error (404): File not found");
        assert!(err.is_not_found());
        assert_eq!(BackendError::server(500, None).to_string(), "Server error (500)");
    }
}
