//! Workspace change events and transient user notifications.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::types::{Workspace, WorkspaceId};

/// A committed change to the workspace store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorkspaceEvent {
    /// A workspace was added (and made active)
    Added { id: WorkspaceId },
    /// A workspace was removed
    Deleted { id: WorkspaceId },
    /// The active pointer moved
    ActiveChanged {
        previous: Option<WorkspaceId>,
        current: Option<WorkspaceId>,
    },
    /// Folder listings were reloaded from the store backend
    Refreshed,
}

impl WorkspaceEvent {
    /// Event type name (e.g., "workspace.refreshed")
    pub fn event_type(&self) -> &'static str {
        match self {
            WorkspaceEvent::Added { .. } => "workspace.added",
            WorkspaceEvent::Deleted { .. } => "workspace.deleted",
            WorkspaceEvent::ActiveChanged { .. } => "workspace.active_changed",
            WorkspaceEvent::Refreshed => "workspace.refreshed",
        }
    }

    /// Check if the event matches a given type pattern.
    pub fn matches(&self, pattern: &str) -> bool {
        if pattern == "*" {
            return true;
        }
        if let Some(prefix) = pattern.strip_suffix(".*") {
            return self.event_type().starts_with(prefix);
        }
        self.event_type() == pattern
    }
}

/// State of the store right after an event was committed.
#[derive(Debug, Clone, Default)]
pub struct WorkspaceSnapshot {
    pub workspaces: Vec<Workspace>,
    pub active: Option<Workspace>,
}

impl WorkspaceSnapshot {
    pub fn active_id(&self) -> Option<&WorkspaceId> {
        self.active.as_ref().map(|w| &w.id)
    }
}

/// Receives workspace events synchronously, in registration order.
pub trait WorkspaceObserver: Send + Sync {
    fn on_workspace_event(&self, event: &WorkspaceEvent, snapshot: &WorkspaceSnapshot);
}

/// Severity of a transient notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Info,
    Success,
    Error,
}

/// A transient, user-facing notification (toast)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl Notice {
    pub fn new(level: NoticeLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Error, message)
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Success, message)
    }
}

/// Sink for transient notifications.
pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice);
}

/// Writes notices to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notice: Notice) {
        match notice.level {
            NoticeLevel::Error => warn!(message = %notice.message, "notice"),
            _ => info!(message = %notice.message, "notice"),
        }
    }
}

/// Keeps notices in memory until drained.
#[derive(Debug, Default)]
pub struct CollectingNotifier {
    notices: Mutex<Vec<Notice>>,
}

impl CollectingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn drain(&self) -> Vec<Notice> {
        std::mem::take(&mut *self.notices.lock())
    }

    pub fn len(&self) -> usize {
        self.notices.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Notifier for CollectingNotifier {
    fn notify(&self, notice: Notice) {
        self.notices.lock().push(notice);
    }
}
