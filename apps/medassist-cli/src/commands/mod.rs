//! CLI command implementations

pub mod chat;
pub mod completions;
pub mod config;
pub mod docs;
pub mod history;
pub mod workspace;
