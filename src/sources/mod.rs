//! Manifest and asset acquisition
//!
//! This module provides a trait-based architecture for acquiring manifests
//! and materializing assets. The loader core is transport-agnostic; it drives
//! whatever sources it was constructed with.
//!
//! ## Architecture
//!
//! Two capability traits define the surface the loader consumes:
//!
//! - [`ManifestSource`]: fetch and parse one manifest
//! - [`AssetSource`]: materialize one asset into the updates directory,
//!   plus the skip policy and terminal-status hooks
//!
//! Two implementations are provided, each covering both traits:
//!
//! - [`RemoteSource`]: HTTP manifest and asset downloads with SHA-256
//!   verification
//! - [`EmbeddedSource`]: manifest and assets shipped inside the application
//!   bundle, copied into the updates directory
//!
//! ## Usage
//!
//! ```no_run
//! use ota_loader::sources::{ManifestSource, RemoteSource};
//! use ota_loader::UpdatesConfig;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = UpdatesConfig {
//!         update_url: Some("https://updates.example.com/manifest".parse()?),
//!         ..Default::default()
//!     };
//!
//!     let source = RemoteSource::new(&config)?;
//!     let manifest = source.load_manifest(&config).await?;
//!     println!("latest update: {}", manifest.id);
//!     Ok(())
//! }
//! ```

mod embedded;
mod remote;
mod traits;

pub use embedded::EmbeddedSource;
pub use remote::RemoteSource;
pub use traits::{AssetSource, ManifestSource};
