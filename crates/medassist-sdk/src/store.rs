//! HTTP client for the store backend

use async_trait::async_trait;
use medassist_core::{
    BackendError, Category, FilePayload, StoreBackend, StoreReceipt, WorkspaceListing,
};
use reqwest::{header, multipart, Client};
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

use crate::error::{Result, SdkError};
use crate::http::{
    build_http, ensure_success, handle_response, parse_base_url, push_segments,
    DEFAULT_QUICK_TIMEOUT,
};
use crate::models::WorkspaceListResponse;

/// Client for the local file-persistence service
#[derive(Clone)]
pub struct StoreClient {
    http: Client,
    base_url: Url,
    guest_id: Option<String>,
    timeout: Duration,
}

impl std::fmt::Debug for StoreClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreClient")
            .field("base_url", &self.base_url)
            .field("guest_id", &self.guest_id)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Builder for creating a StoreClient
#[derive(Default)]
pub struct StoreClientBuilder {
    base_url: Option<String>,
    guest_id: Option<String>,
    timeout: Option<Duration>,
    user_agent: Option<String>,
}

impl StoreClientBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the base URL of the store backend
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Guest identity sent as the `guestId` cookie on listing requests
    pub fn guest_id(mut self, guest_id: impl Into<String>) -> Self {
        self.guest_id = Some(guest_id.into());
        self
    }

    /// Set the request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set a custom user agent
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    pub fn build(self) -> Result<StoreClient> {
        Ok(StoreClient {
            http: build_http(self.user_agent)?,
            base_url: parse_base_url(self.base_url, "http://localhost:3000")?,
            guest_id: self.guest_id,
            timeout: self.timeout.unwrap_or(DEFAULT_QUICK_TIMEOUT),
        })
    }
}

impl StoreClient {
    pub fn builder() -> StoreClientBuilder {
        StoreClientBuilder::new()
    }

    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Self::builder().base_url(base_url).build()
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn category_url(&self, category: Category) -> Result<Url> {
        push_segments(self.base_url.clone(), &["api", "upload", category.slug()])
    }

    /// Upload files as a multipart form
    #[instrument(skip(self, files), fields(count = files.len()))]
    pub async fn upload(
        &self,
        category: Category,
        workspace_name: &str,
        files: Vec<FilePayload>,
    ) -> Result<StoreReceipt> {
        if workspace_name.trim().is_empty() {
            return Err(SdkError::InvalidInput("workspace name is required".to_string()));
        }

        let mut form = multipart::Form::new().text("workspaceName", workspace_name.to_string());
        for file in files {
            let part = multipart::Part::bytes(file.data)
                .file_name(file.name)
                .mime_str(&file.content_type)?;
            form = form.part("files", part);
        }

        let response = self
            .http
            .post(self.category_url(category)?)
            .timeout(self.timeout)
            .multipart(form)
            .send()
            .await?;

        let receipt: StoreReceipt = handle_response(response).await?;
        debug!(stored = receipt.files.len(), "Store call completed");
        Ok(receipt)
    }

    /// Delete a stored file by reference name
    #[instrument(skip(self))]
    pub async fn remove(
        &self,
        category: Category,
        workspace_name: &str,
        file_name: &str,
    ) -> Result<()> {
        let mut url = push_segments(self.category_url(category)?, &[file_name])?;
        url.query_pairs_mut()
            .append_pair("workspaceName", workspace_name);

        let response = self
            .http
            .delete(url)
            .timeout(self.timeout)
            .send()
            .await?;

        match ensure_success(response).await {
            Ok(_) => Ok(()),
            Err(SdkError::Api {
                status: 404,
                message,
            }) => Err(SdkError::NotFound(
                message.unwrap_or_else(|| file_name.to_string()),
            )),
            Err(e) => Err(e),
        }
    }

    /// List workspaces and their category folders for the guest identity
    #[instrument(skip(self))]
    pub async fn workspaces(&self) -> Result<Vec<WorkspaceListing>> {
        let mut req = self
            .http
            .get(push_segments(self.base_url.clone(), &["api", "workspaces"])?)
            .timeout(self.timeout);

        if let Some(ref guest_id) = self.guest_id {
            req = req.header(header::COOKIE, format!("guestId={}", guest_id));
        }

        let response = req.send().await?;
        let listing: WorkspaceListResponse = handle_response(response).await?;
        Ok(listing.workspaces)
    }
}

#[async_trait]
impl StoreBackend for StoreClient {
    async fn store(
        &self,
        category: Category,
        workspace_name: &str,
        files: Vec<FilePayload>,
    ) -> std::result::Result<StoreReceipt, BackendError> {
        self.upload(category, workspace_name, files)
            .await
            .map_err(BackendError::from)
    }

    async fn delete(
        &self,
        category: Category,
        workspace_name: &str,
        file_name: &str,
    ) -> std::result::Result<(), BackendError> {
        self.remove(category, workspace_name, file_name)
            .await
            .map_err(BackendError::from)
    }

    async fn list_workspaces(&self) -> std::result::Result<Vec<WorkspaceListing>, BackendError> {
        self.workspaces().await.map_err(BackendError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use medassist_core::ErrorKind;
    use wiremock::matchers::{body_string_contains, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn pdf(name: &str) -> FilePayload {
        FilePayload::new(name, "application/pdf", b"%PDF-1.4".to_vec())
    }

    #[test]
    fn test_builder() {
        let client = StoreClient::builder()
            .base_url("http://localhost:3000")
            .guest_id("guest-1")
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap();

        assert_eq!(client.base_url().as_str(), "http://localhost:3000/");
        assert_eq!(
            client.category_url(Category::Medical).unwrap().as_str(),
            "http://localhost:3000/api/upload/medical-documents"
        );
    }

    #[tokio::test]
    async fn test_upload_multipart() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/upload/medical-documents"))
            .and(body_string_contains("name=\"workspaceName\""))
            .and(body_string_contains("Alpha"))
            .and(body_string_contains("filename=\"scan.pdf\""))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "message": "Files uploaded successfully",
                "processedFiles": 1,
                "files": [{"originalName": "scan.pdf", "savedAs": "1700000000000-ab12cd34-scan.pdf", "size": 8, "type": "application/pdf"}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = StoreClient::new(server.uri()).unwrap();
        let receipt = client
            .store(Category::Medical, "Alpha", vec![pdf("scan.pdf")])
            .await
            .unwrap();

        assert_eq!(receipt.reference_names(), vec!["1700000000000-ab12cd34-scan.pdf"]);
    }

    #[tokio::test]
    async fn test_upload_server_error_is_retryable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
            .mount(&server)
            .await;

        let client = StoreClient::new(server.uri()).unwrap();
        let err = client
            .store(Category::Patient, "Alpha", vec![pdf("a.pdf")])
            .await
            .unwrap_err();

        assert_eq!(err.status_code(), Some(503));
        assert!(err.is_retryable());
        assert_eq!(err.user_message(), "maintenance");
    }

    #[tokio::test]
    async fn test_upload_requires_workspace_name() {
        let client = StoreClient::new("http://localhost:9").unwrap();
        let err = client
            .upload(Category::Medical, " ", vec![pdf("a.pdf")])
            .await
            .unwrap_err();

        assert!(matches!(err, SdkError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_delete_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/api/upload/patient-documents/missing.pdf"))
            .and(query_param("workspaceName", "Alpha"))
            .respond_with(
                ResponseTemplate::new(404).set_body_json(serde_json::json!({"error": "File not found"})),
            )
            .mount(&server)
            .await;

        let client = StoreClient::new(server.uri()).unwrap();
        let err = client
            .delete(Category::Patient, "Alpha", "missing.pdf")
            .await
            .unwrap_err();

        assert!(err.is_not_found());
        assert_eq!(err.user_message(), "File not found");
    }

    #[tokio::test]
    async fn test_list_sends_guest_cookie() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/workspaces"))
            .and(header("cookie", "guestId=guest-42"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "workspaces": [
                    {"name": "Alpha", "folders": [{"type": "medical_documents", "files": ["a.pdf"]}]},
                    {"name": "Beta", "folders": []}
                ]
            })))
            .mount(&server)
            .await;

        let client = StoreClient::builder()
            .base_url(server.uri())
            .guest_id("guest-42")
            .build()
            .unwrap();
        let listing = client.list_workspaces().await.unwrap();

        assert_eq!(listing.len(), 2);
        assert_eq!(listing[0].folders[0].category, Category::Medical);
        assert!(listing[1].folders.is_empty());
    }

    #[tokio::test]
    async fn test_connection_refused_is_network_error() {
        // Port 9 (discard) is not expected to accept HTTP connections
        let client = StoreClient::builder()
            .base_url("http://127.0.0.1:9")
            .timeout(Duration::from_secs(2))
            .build()
            .unwrap();

        let err = client.list_workspaces().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Network);
        assert!(err.is_retryable());
    }
}
