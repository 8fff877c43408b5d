//! HTTP client for the processing and chat backend

use async_trait::async_trait;
use medassist_core::{BackendError, Category, ChatBackend, ChatReply, ProcessResult, ProcessingBackend};
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

use crate::error::{Result, SdkError};
use crate::http::{
    build_http, ensure_success, handle_response, parse_base_url, push_segments,
    DEFAULT_PROCESSING_TIMEOUT, DEFAULT_QUICK_TIMEOUT,
};
use crate::models::{
    ChatRequest, ChatResponse, ProcessFilesRequest, ProcessUrlRequest, RemoveDocumentRequest,
};

/// Client for the remote processing service
#[derive(Clone)]
pub struct ProcessingClient {
    http: Client,
    base_url: Url,
    quick_timeout: Duration,
    processing_timeout: Duration,
}

impl std::fmt::Debug for ProcessingClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessingClient")
            .field("base_url", &self.base_url)
            .field("quick_timeout", &self.quick_timeout)
            .field("processing_timeout", &self.processing_timeout)
            .finish()
    }
}

/// Builder for creating a ProcessingClient
#[derive(Default)]
pub struct ProcessingClientBuilder {
    base_url: Option<String>,
    quick_timeout: Option<Duration>,
    processing_timeout: Option<Duration>,
    user_agent: Option<String>,
}

impl ProcessingClientBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Timeout for short calls (removal notifications)
    pub fn quick_timeout(mut self, timeout: Duration) -> Self {
        self.quick_timeout = Some(timeout);
        self
    }

    /// Timeout for processing and chat calls
    pub fn processing_timeout(mut self, timeout: Duration) -> Self {
        self.processing_timeout = Some(timeout);
        self
    }

    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    pub fn build(self) -> Result<ProcessingClient> {
        Ok(ProcessingClient {
            http: build_http(self.user_agent)?,
            base_url: parse_base_url(self.base_url, "http://localhost:8000")?,
            quick_timeout: self.quick_timeout.unwrap_or(DEFAULT_QUICK_TIMEOUT),
            processing_timeout: self.processing_timeout.unwrap_or(DEFAULT_PROCESSING_TIMEOUT),
        })
    }
}

impl ProcessingClient {
    pub fn builder() -> ProcessingClientBuilder {
        ProcessingClientBuilder::new()
    }

    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Self::builder().base_url(base_url).build()
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        push_segments(self.base_url.clone(), segments)
    }

    /// Submit stored reference names for processing
    #[instrument(skip(self, references), fields(count = references.len()))]
    pub async fn submit_files(
        &self,
        category: Category,
        references: &[String],
        workspace_name: &str,
    ) -> Result<ProcessResult> {
        if references.is_empty() {
            return Err(SdkError::InvalidInput("no files to process".to_string()));
        }

        let request = ProcessFilesRequest {
            files: references.to_vec(),
            workspace_name: workspace_name.to_string(),
        };

        let response = self
            .http
            .post(self.endpoint(&["process", category.slug()])?)
            .timeout(self.processing_timeout)
            .json(&request)
            .send()
            .await?;

        let result: ProcessResult = handle_response(response).await?;
        debug!(processed = ?result.processed_count(), "Processing call completed");
        Ok(result)
    }

    /// Submit a remote URL for processing
    #[instrument(skip(self))]
    pub async fn submit_url(
        &self,
        category: Category,
        url: &str,
        workspace_name: &str,
    ) -> Result<ProcessResult> {
        let request = ProcessUrlRequest {
            url: url.to_string(),
            workspace_name: workspace_name.to_string(),
        };

        let response = self
            .http
            .post(self.endpoint(&["process", category.slug(), "url"])?)
            .timeout(self.processing_timeout)
            .json(&request)
            .send()
            .await?;

        handle_response(response).await
    }

    /// Tell the processing side that a stored document was removed
    #[instrument(skip(self))]
    pub async fn notify_removed(
        &self,
        category: Category,
        file_name: &str,
        workspace_name: &str,
    ) -> Result<()> {
        let request = RemoveDocumentRequest {
            file_name: file_name.to_string(),
            workspace_name: workspace_name.to_string(),
        };

        let response = self
            .http
            .post(self.endpoint(&["process", category.slug(), "remove"])?)
            .timeout(self.quick_timeout)
            .json(&request)
            .send()
            .await?;

        ensure_success(response).await?;
        Ok(())
    }

    /// Send a chat message and return the reply as the backend shaped it
    #[instrument(skip(self, message), fields(len = message.len()))]
    pub async fn send_message(&self, message: &str) -> Result<ChatReply> {
        let request = ChatRequest {
            message: message.to_string(),
        };

        let response = self
            .http
            .post(self.endpoint(&["chat"])?)
            .timeout(self.processing_timeout)
            .json(&request)
            .send()
            .await?;

        let body: ChatResponse = handle_response(response).await?;
        Ok(body.reply)
    }
}

#[async_trait]
impl ProcessingBackend for ProcessingClient {
    async fn process_files(
        &self,
        category: Category,
        references: &[String],
        workspace_name: &str,
    ) -> std::result::Result<ProcessResult, BackendError> {
        self.submit_files(category, references, workspace_name)
            .await
            .map_err(BackendError::from)
    }

    async fn process_url(
        &self,
        category: Category,
        url: &str,
        workspace_name: &str,
    ) -> std::result::Result<ProcessResult, BackendError> {
        self.submit_url(category, url, workspace_name)
            .await
            .map_err(BackendError::from)
    }

    async fn remove_document(
        &self,
        category: Category,
        file_name: &str,
        workspace_name: &str,
    ) -> std::result::Result<(), BackendError> {
        self.notify_removed(category, file_name, workspace_name)
            .await
            .map_err(BackendError::from)
    }
}

#[async_trait]
impl ChatBackend for ProcessingClient {
    async fn chat(&self, message: &str) -> std::result::Result<ChatReply, BackendError> {
        self.send_message(message).await.map_err(BackendError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use medassist_core::ErrorKind;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_process_files() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/process/medical-documents"))
            .and(body_json(serde_json::json!({
                "files": ["1-a.pdf", "2-b.pdf"],
                "workspaceName": "Alpha"
            })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"processedFiles": 2})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = ProcessingClient::new(server.uri()).unwrap();
        let result = client
            .process_files(
                Category::Medical,
                &["1-a.pdf".to_string(), "2-b.pdf".to_string()],
                "Alpha",
            )
            .await
            .unwrap();

        assert_eq!(result.processed_count(), Some(2));
    }

    #[tokio::test]
    async fn test_process_url_endpoint() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/process/patient-documents/url"))
            .and(body_json(serde_json::json!({
                "url": "https://example.com/",
                "workspaceName": "Alpha"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"status": "ok"})))
            .mount(&server)
            .await;

        let client = ProcessingClient::new(server.uri()).unwrap();
        let result = client
            .process_url(Category::Patient, "https://example.com/", "Alpha")
            .await
            .unwrap();

        assert_eq!(result.0["status"], "ok");
    }

    #[tokio::test]
    async fn test_processing_timeout_is_network_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/process/medical-documents"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
            .mount(&server)
            .await;

        let client = ProcessingClient::builder()
            .base_url(server.uri())
            .processing_timeout(Duration::from_millis(100))
            .build()
            .unwrap();

        let err = client
            .process_files(Category::Medical, &["a.pdf".to_string()], "Alpha")
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Network);
        assert_eq!(
            err.user_message(),
            "The server did not respond in time. Please try again."
        );
    }

    #[tokio::test]
    async fn test_remove_document_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/process/medical-documents/remove"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = ProcessingClient::new(server.uri()).unwrap();
        let err = client
            .remove_document(Category::Medical, "a.pdf", "Alpha")
            .await
            .unwrap_err();

        assert_eq!(err.user_message(), "Request failed with status 500");
    }

    #[tokio::test]
    async fn test_chat_reply_shapes() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat"))
            .and(body_json(serde_json::json!({"message": "Hello"})))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"reply": "Hi there"})),
            )
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/chat"))
            .and(body_json(serde_json::json!({"message": "Sources?"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "reply": {"answer": "See below", "sources": ["a.pdf"]}
            })))
            .mount(&server)
            .await;

        let client = ProcessingClient::new(server.uri()).unwrap();

        assert_eq!(
            client.chat("Hello").await.unwrap(),
            ChatReply::Text("Hi there".to_string())
        );
        match client.chat("Sources?").await.unwrap() {
            ChatReply::Structured(value) => assert_eq!(value["sources"][0], "a.pdf"),
            other => panic!("expected structured reply, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_malformed_chat_body_is_unexpected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let client = ProcessingClient::new(server.uri()).unwrap();
        let err = client.chat("Hello").await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Unexpected);
    }
}
