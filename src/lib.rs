//! # ota-loader
//!
//! Embeddable client-side orchestrator for over-the-air content updates.
//!
//! ## Design Philosophy
//!
//! ota-loader is designed to be:
//! - **Resumable** - The device may be killed mid-download at any time;
//!   a later run picks up exactly where the last one stopped
//! - **Durable** - An update is only promoted to "ready" once every asset
//!   is verified present and committed to the catalog
//! - **Library-first** - No CLI or UI, purely a Rust crate for embedding
//! - **Transport-agnostic** - Manifest and asset acquisition are traits;
//!   remote (HTTP) and embedded-bundle sources ship in the box
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use ota_loader::{AcceptAll, Catalog, Loader, UpdatesConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = UpdatesConfig {
//!         update_url: Some("https://updates.example.com/manifest".parse()?),
//!         ..Default::default()
//!     };
//!
//!     let catalog = Arc::new(Catalog::new(&config.catalog_path).await?);
//!
//!     // One loader per run; `run` consumes it
//!     let loader = Loader::remote(catalog, config)?;
//!     match loader.run(&AcceptAll).await? {
//!         Some(update) => println!("update {} is {:?}", update.id, update.status),
//!         None => println!("declined, nothing to do"),
//!     }
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Configuration types
pub mod config;
/// Catalog persistence layer
pub mod db;
/// Error types
pub mod error;
/// Core loader implementation (decomposed into focused submodules)
pub mod loader;
/// Manifest and asset sources
pub mod sources;
/// Core types
pub mod types;
/// Hashing and filename utilities
pub mod utils;

// Re-export commonly used types
pub use config::UpdatesConfig;
pub use db::Catalog;
pub use error::{CatalogError, Error, Result};
pub use loader::{AcceptAll, Loader, UpdateEventHandler};
pub use sources::{AssetSource, EmbeddedSource, ManifestSource, RemoteSource};
pub use types::{
    AssetFetch, AssetKey, AssetRecord, Manifest, UpdateId, UpdateRecord, UpdateStatus,
};
