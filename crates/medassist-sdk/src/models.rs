//! Wire models for the store and processing backends

use medassist_core::{ChatReply, WorkspaceListing};
use serde::{Deserialize, Serialize};

/// Body of the file processing request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessFilesRequest {
    pub files: Vec<String>,
    pub workspace_name: String,
}

/// Body of the URL processing request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessUrlRequest {
    pub url: String,
    pub workspace_name: String,
}

/// Body of the document removal notification
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveDocumentRequest {
    pub file_name: String,
    pub workspace_name: String,
}

/// Chat request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

/// Chat response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub reply: ChatReply,
}

/// Listing endpoint response
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkspaceListResponse {
    #[serde(default)]
    pub workspaces: Vec<WorkspaceListing>,
}

/// Pull a human-readable message out of an error body.
///
/// JSON bodies with a `message`, `error` or `detail` string win; otherwise
/// the trimmed raw body is used if there is one.
pub fn extract_error_message(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(value) = serde_json::from_str::<serde_json::Value>(trimmed) {
        let from_json = ["message", "error", "detail"]
            .iter()
            .find_map(|key| value.get(*key).and_then(|v| v.as_str()))
            .map(str::to_string);
        if from_json.is_some() {
            return from_json;
        }
    }

    Some(trimmed.to_string())
}
