pub mod config;
pub mod error;
pub mod events;
pub mod storage;
pub mod traits;
pub mod types;

pub use config::*;
pub use error::*;
pub use types::*;

pub use events::{
    CollectingNotifier, LogNotifier, Notice, NoticeLevel, Notifier, WorkspaceEvent,
    WorkspaceObserver, WorkspaceSnapshot,
};
pub use storage::{load_json, save_json, FileStorage, MemoryStorage};
pub use traits::{ChatBackend, ProcessingBackend, StateStorage, StoreBackend};
