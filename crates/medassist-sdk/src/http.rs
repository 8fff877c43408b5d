//! Shared HTTP plumbing for the backend clients

use reqwest::{header, Client, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;
use url::Url;

use crate::error::{Result, SdkError};
use crate::models::extract_error_message;

pub(crate) const DEFAULT_QUICK_TIMEOUT: Duration = Duration::from_secs(30);
pub(crate) const DEFAULT_PROCESSING_TIMEOUT: Duration = Duration::from_secs(300);

pub(crate) fn default_user_agent() -> String {
    format!("medassist-sdk/{}", env!("CARGO_PKG_VERSION"))
}

/// Build the underlying reqwest client.
///
/// No client-wide timeout is set; every request carries its own.
pub(crate) fn build_http(user_agent: Option<String>) -> Result<Client> {
    let mut headers = header::HeaderMap::new();
    headers.insert(
        header::ACCEPT,
        header::HeaderValue::from_static("application/json"),
    );

    Client::builder()
        .user_agent(user_agent.unwrap_or_else(default_user_agent))
        .default_headers(headers)
        .build()
        .map_err(SdkError::Http)
}

pub(crate) fn parse_base_url(raw: Option<String>, fallback: &str) -> Result<Url> {
    let raw = raw.unwrap_or_else(|| fallback.to_string());
    let url = Url::parse(&raw)?;
    if url.cannot_be_a_base() {
        return Err(SdkError::Config(format!("{} cannot be used as a base URL", raw)));
    }
    Ok(url)
}

/// Append escaped path segments to `url`.
pub(crate) fn push_segments(mut url: Url, segments: &[&str]) -> Result<Url> {
    url.path_segments_mut()
        .map_err(|_| SdkError::Config("base URL cannot have path segments".to_string()))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// Decode a successful response or turn an error status into `SdkError::Api`.
pub(crate) async fn handle_response<T: DeserializeOwned>(response: Response) -> Result<T> {
    let response = ensure_success(response).await?;
    response.json().await.map_err(SdkError::Http)
}

pub(crate) async fn ensure_success(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(SdkError::Api {
        status: status.as_u16(),
        message: extract_error_message(&body),
    })
}
