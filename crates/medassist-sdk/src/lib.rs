//! # MedAssist SDK
//!
//! Backend adapters for the MedAssist client: an HTTP client for the store
//! backend, an HTTP client for the processing and chat backend, and a
//! filesystem store for running without a store service.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use medassist_core::{Category, FilePayload, ProcessingBackend, StoreBackend};
//! use medassist_sdk::{ProcessingClient, StoreClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = StoreClient::builder()
//!         .base_url("http://localhost:3000")
//!         .guest_id("3f0c9a52-guest")
//!         .build()?;
//!     let processing = ProcessingClient::new("http://localhost:8000")?;
//!
//!     let file = FilePayload::new("scan.pdf", "application/pdf", std::fs::read("scan.pdf")?);
//!     let receipt = store.store(Category::Medical, "My Workspace", vec![file]).await?;
//!     processing
//!         .process_files(Category::Medical, &receipt.reference_names(), "My Workspace")
//!         .await?;
//!
//!     Ok(())
//! }
//! ```

mod error;
mod http;
mod local;
mod models;
mod processing;
mod store;

pub use error::{Result, SdkError};
pub use local::LocalStore;
pub use models::*;
pub use processing::{ProcessingClient, ProcessingClientBuilder};
pub use store::{StoreClient, StoreClientBuilder};

/// SDK version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
