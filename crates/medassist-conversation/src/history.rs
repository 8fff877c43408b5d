//! Chat threads, messages and export

use chrono::{DateTime, Utc};
use medassist_core::{ChatReply, MessageId, ThreadId, WorkspaceId};
use serde::{Deserialize, Serialize};

const TITLE_CHARS: usize = 30;
const PREVIEW_CHARS: usize = 50;

/// Message body: plain text or a structured payload from the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Structured(serde_json::Value),
}

impl From<ChatReply> for MessageContent {
    fn from(reply: ChatReply) -> Self {
        match reply {
            ChatReply::Text(text) => MessageContent::Text(text),
            ChatReply::Structured(value) => MessageContent::Structured(value),
        }
    }
}

impl From<&str> for MessageContent {
    fn from(text: &str) -> Self {
        MessageContent::Text(text.to_string())
    }
}

/// A single message in a conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: MessageId,
    pub content: MessageContent,
    pub is_user: bool,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_typing: bool,
}

impl ChatMessage {
    fn new(content: MessageContent, is_user: bool) -> Self {
        Self {
            id: MessageId::new(),
            content,
            is_user,
            timestamp: Utc::now(),
            is_typing: false,
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(MessageContent::Text(text.into()), true)
    }

    pub fn assistant(content: impl Into<MessageContent>) -> Self {
        Self::new(content.into(), false)
    }

    /// Placeholder shown while a reply is pending
    pub fn typing() -> Self {
        Self {
            is_typing: true,
            ..Self::new(MessageContent::Text(String::new()), false)
        }
    }
}

/// One conversation with its own history and a fixed title
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatThread {
    pub id: ThreadId,
    pub title: String,
    pub preview: String,
    pub timestamp: DateTime<Utc>,
    pub messages: Vec<ChatMessage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspace_id: Option<WorkspaceId>,
}

impl ChatThread {
    /// Start a thread from its first exchange; title and preview come from
    /// the user's message.
    pub fn from_exchange(
        user: ChatMessage,
        reply: ChatMessage,
        workspace_id: Option<WorkspaceId>,
    ) -> Self {
        let text = match &user.content {
            MessageContent::Text(text) => text.trim().to_string(),
            MessageContent::Structured(value) => value.to_string(),
        };

        Self {
            id: ThreadId::new(),
            title: truncate_chars(&text, TITLE_CHARS),
            preview: truncate_chars(&text, PREVIEW_CHARS),
            timestamp: Utc::now(),
            messages: vec![user, reply],
            workspace_id,
        }
    }

    pub fn push(&mut self, message: ChatMessage) {
        self.timestamp = message.timestamp.max(self.timestamp);
        self.messages.push(message);
    }

    pub fn belongs_to(&self, workspace_id: &WorkspaceId) -> bool {
        self.workspace_id.as_ref() == Some(workspace_id)
    }
}

/// First `max` characters of `text`, with `...` appended when cut.
pub fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((end, _)) => format!("{}...", &text[..end]),
        None => text.to_string(),
    }
}

/// Export format for a thread
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Json,
    Markdown,
    Text,
}

impl std::str::FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "markdown" | "md" => Ok(ExportFormat::Markdown),
            "text" | "txt" => Ok(ExportFormat::Text),
            _ => Err(format!("Unknown export format: {}", s)),
        }
    }
}

/// Render a whole thread for saving or printing
pub fn export_thread(thread: &ChatThread, format: ExportFormat) -> serde_json::Result<String> {
    match format {
        ExportFormat::Json => serde_json::to_string_pretty(thread),
        ExportFormat::Markdown => {
            let mut out = format!("# {}\n\n", thread.title);
            for message in &thread.messages {
                out.push_str(&format!(
                    "**{}** ({})\n\n{}\n\n",
                    speaker(message),
                    message.timestamp.format("%Y-%m-%d %H:%M"),
                    message.content.display()
                ));
            }
            Ok(out)
        }
        ExportFormat::Text => {
            let mut out = format!("{}\n{}\n\n", thread.title, "=".repeat(thread.title.chars().count()));
            for message in &thread.messages {
                out.push_str(&format!(
                    "[{}] {}: {}\n",
                    message.timestamp.format("%Y-%m-%d %H:%M:%S"),
                    speaker(message),
                    message.content.display()
                ));
            }
            Ok(out)
        }
    }
}

fn speaker(message: &ChatMessage) -> &'static str {
    if message.is_user {
        "You"
    } else {
        "Assistant"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_truncate_counts_chars() {
        assert_eq!(truncate_chars("Hello", 30), "Hello");
        assert_eq!(truncate_chars("abcdef", 3), "abc...");
        assert_eq!(truncate_chars("abc", 3), "abc");
        // multi-byte characters are never split
        assert_eq!(truncate_chars("héllo wörld", 4), "héll...");
    }

    #[test]
    fn test_thread_title_fixed_from_first_message() {
        let text = "This is a longer message that should be truncated for the title field";
        let thread = ChatThread::from_exchange(
            ChatMessage::user(text),
            ChatMessage::assistant("ok"),
            None,
        );

        assert_eq!(thread.title, "This is a longer message that ...");
        assert_eq!(
            thread.preview,
            "This is a longer message that should be truncated ..."
        );
        assert_eq!(thread.messages.len(), 2);
    }

    #[test]
    fn test_message_wire_format() {
        let message = ChatMessage::user("Hi");
        let value = serde_json::to_value(&message).unwrap();
        assert_eq!(value["isUser"], true);
        assert_eq!(value["content"], "Hi");
        assert!(value.get("isTyping").is_none());

        let typing = serde_json::to_value(ChatMessage::typing()).unwrap();
        assert_eq!(typing["isTyping"], true);
    }

    #[test]
    fn test_structured_content_round_trip() {
        let message = ChatMessage::assistant(MessageContent::Structured(
            serde_json::json!({"answer": "x", "sources": ["a.pdf"]}),
        ));
        let raw = serde_json::to_string(&message).unwrap();
        let back: ChatMessage = serde_json::from_str(&raw).unwrap();
        assert_eq!(back, message);
    }

    #[test]
    fn test_export_markdown() {
        let thread = ChatThread::from_exchange(
            ChatMessage::user("Hello"),
            ChatMessage::assistant("Hi there"),
            None,
        );
        let md = export_thread(&thread, ExportFormat::Markdown).unwrap();

        assert!(md.starts_with("# Hello\n"));
        assert!(md.contains("**You**"));
        assert!(md.contains("Hi there"));
        assert_eq!("md".parse::<ExportFormat>().unwrap(), ExportFormat::Markdown);
    }
}
