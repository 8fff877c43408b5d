//! Display rendering for assistant replies

use medassist_core::ChatReply;
use serde_json::Value;

use crate::history::MessageContent;

/// Turn a reply into display text without dropping any of it.
pub fn render_reply(reply: &ChatReply) -> String {
    match reply {
        ChatReply::Text(text) => text.clone(),
        ChatReply::Structured(value) => render_value(value),
    }
}

fn render_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string()),
    }
}

impl MessageContent {
    pub fn display(&self) -> String {
        match self {
            MessageContent::Text(text) => text.clone(),
            MessageContent::Structured(value) => render_value(value),
        }
    }
}
