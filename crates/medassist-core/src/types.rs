use chrono::{DateTime, Utc};
use rand::{distributions::Alphanumeric, Rng};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// Newtype wrappers for type safety

/// Client-generated workspace identifier (`ws-<unix-millis>-<suffix>`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkspaceId(String);

impl WorkspaceId {
    /// Generate a fresh, time-based id with a random suffix.
    pub fn generate() -> Self {
        let suffix: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(6)
            .map(|b| char::from(b).to_ascii_lowercase())
            .collect();
        Self(format!("ws-{}-{}", Utc::now().timestamp_millis(), suffix))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for WorkspaceId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for WorkspaceId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl std::fmt::Display for WorkspaceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ThreadId(Uuid);

impl ThreadId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ThreadId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ThreadId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for ThreadId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(Uuid);

impl MessageId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// Document categories

/// One of the two document classes, each with its own storage and
/// processing pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "medical_documents")]
    Medical,
    #[serde(rename = "patient_documents")]
    Patient,
}

impl Category {
    pub const ALL: [Category; 2] = [Category::Medical, Category::Patient];

    /// Folder type as reported by the store backend listing.
    pub fn folder_type(&self) -> &'static str {
        match self {
            Category::Medical => "medical_documents",
            Category::Patient => "patient_documents",
        }
    }

    /// Path segment used by the category-specific endpoints.
    pub fn slug(&self) -> &'static str {
        match self {
            Category::Medical => "medical-documents",
            Category::Patient => "patient-documents",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Category::Medical => "medical",
            Category::Patient => "patient",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl std::str::FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "medical" | "medical_documents" | "medical-documents" => Ok(Category::Medical),
            "patient" | "patient_documents" | "patient-documents" => Ok(Category::Patient),
            _ => Err(format!("Unknown category: {}", s)),
        }
    }
}

// Workspace types

/// Category listing derived from the store backend's directory scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Folder {
    #[serde(rename = "type")]
    pub category: Category,
    #[serde(default)]
    pub files: Vec<String>,
}

impl Folder {
    pub fn new(category: Category, files: Vec<String>) -> Self {
        Self { category, files }
    }
}

/// A named container scoping documents and chat history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workspace {
    pub id: WorkspaceId,
    pub name: String,
    #[serde(default)]
    pub folders: Vec<Folder>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub collaborators: Vec<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
}

impl Workspace {
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: WorkspaceId::generate(),
            name: name.into(),
            folders: Vec::new(),
            created_at: now,
            updated_at: now,
            collaborators: Vec::new(),
            kind: None,
            file_path: None,
        }
    }

    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    pub fn with_collaborators(mut self, collaborators: Vec<String>) -> Self {
        self.collaborators = collaborators;
        self
    }

    /// Files of one category; a missing folder means no documents yet.
    pub fn files(&self, category: Category) -> &[String] {
        self.folders
            .iter()
            .find(|f| f.category == category)
            .map(|f| f.files.as_slice())
            .unwrap_or(&[])
    }
}

/// One workspace entry from the store backend's listing endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceListing {
    pub name: String,
    #[serde(default)]
    pub folders: Vec<Folder>,
}

// Upload types

/// Raw file bytes on their way to the store backend.
#[derive(Clone, PartialEq, Eq)]
pub struct FilePayload {
    pub name: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

impl FilePayload {
    pub fn new(name: impl Into<String>, content_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            data,
        }
    }

    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }
}

impl std::fmt::Debug for FilePayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilePayload")
            .field("name", &self.name)
            .field("content_type", &self.content_type)
            .field("size", &self.data.len())
            .finish()
    }
}

/// A file as recorded by the store backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredFile {
    pub original_name: String,
    /// Backend-assigned reference name.
    pub saved_as: String,
    pub size: u64,
    #[serde(rename = "type")]
    pub content_type: String,
}

/// Response of the store call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreReceipt {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub processed_files: usize,
    #[serde(default)]
    pub files: Vec<StoredFile>,
}

impl StoreReceipt {
    pub fn reference_names(&self) -> Vec<String> {
        self.files.iter().map(|f| f.saved_as.clone()).collect()
    }
}

/// Application-defined result of the processing backend, kept opaque.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProcessResult(pub serde_json::Value);

impl ProcessResult {
    /// Number of processed files if the backend reports one.
    pub fn processed_count(&self) -> Option<u64> {
        ["processedFiles", "processed_files", "count"]
            .iter()
            .find_map(|key| self.0.get(*key).and_then(|v| v.as_u64()))
    }
}

// Chat types

/// Chat endpoint reply: plain text or any structured JSON payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChatReply {
    Text(String),
    Structured(serde_json::Value),
}
