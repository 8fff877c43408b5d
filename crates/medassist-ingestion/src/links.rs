//! URL normalization and the pending-URL slot

use tracing::debug;
use url::Url;

use crate::{Result, ValidationError};

/// Trim, default the scheme to https, and canonicalize.
pub fn normalize_url(input: &str) -> Result<String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyUrl);
    }

    let candidate = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    };

    let parsed = Url::parse(&candidate).map_err(|_| ValidationError::InvalidUrl(trimmed.to_string()))?;

    match parsed.scheme() {
        "http" | "https" if parsed.host_str().is_some_and(|h| !h.is_empty()) => {
            Ok(parsed.to_string())
        }
        _ => Err(ValidationError::InvalidUrl(trimmed.to_string())),
    }
}

/// Holds at most one pending URL; setting a new one replaces the old one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingUrl {
    url: Option<String>,
}

impl PendingUrl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Normalize and store `input`, returning the URL it replaced.
    pub fn set(&mut self, input: &str) -> Result<Option<String>> {
        let normalized = normalize_url(input)?;
        let previous = self.url.replace(normalized);
        if let Some(ref old) = previous {
            debug!(replaced = %old, "Pending URL replaced");
        }
        Ok(previous)
    }

    pub fn get(&self) -> Option<&str> {
        self.url.as_deref()
    }

    pub fn take(&mut self) -> Option<String> {
        self.url.take()
    }

    pub fn clear(&mut self) {
        self.url = None;
    }

    pub fn is_empty(&self) -> bool {
        self.url.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_trims_and_canonicalizes() {
        assert_eq!(
            normalize_url("  https://Example.COM/guidelines  ").unwrap(),
            "https://example.com/guidelines"
        );
        assert_eq!(normalize_url("example.com").unwrap(), "https://example.com/");
    }

    #[test]
    fn test_blank_input_rejected() {
        assert_eq!(normalize_url(""), Err(ValidationError::EmptyUrl));
        assert_eq!(normalize_url(" \t\n"), Err(ValidationError::EmptyUrl));
    }

    #[test]
    fn test_invalid_urls_rejected() {
        assert!(matches!(
            normalize_url("ftp://files.example.com/a.pdf"),
            Err(ValidationError::InvalidUrl(_))
        ));
        assert!(matches!(
            normalize_url("http://"),
            Err(ValidationError::InvalidUrl(_))
        ));
        assert!(matches!(
            normalize_url("https://exa mple.com"),
            Err(ValidationError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_pending_url_single_slot() {
        let mut pending = PendingUrl::new();
        assert!(pending.is_empty());

        assert_eq!(pending.set("https://a.example/one").unwrap(), None);
        let replaced = pending.set("https://b.example/two").unwrap();

        assert_eq!(replaced.as_deref(), Some("https://a.example/one"));
        assert_eq!(pending.get(), Some("https://b.example/two"));
        assert_eq!(pending.take().as_deref(), Some("https://b.example/two"));
        assert!(pending.is_empty());
    }

    #[test]
    fn test_pending_url_keeps_previous_on_error() {
        let mut pending = PendingUrl::new();
        pending.set("https://a.example/").unwrap();

        assert!(pending.set("  ").is_err());
        assert_eq!(pending.get(), Some("https://a.example/"));
    }
}
