//! Error types for ota-loader
//!
//! This module provides error handling for the library, including:
//! - Domain-specific error types (Manifest, Asset, Catalog, etc.)
//! - Context information (asset key, failed/total counts, file path)
//!
//! Per-asset fetch failures are absorbed into the loader's completion
//! aggregation and only surface as [`Error::AssetsFailed`] once every asset
//! has resolved; they never abort sibling in-flight fetches.

use thiserror::Error;

use crate::types::AssetKey;

/// Result type alias for ota-loader operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for ota-loader
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
    },

    /// Catalog operation failed
    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Manifest could not be fetched or parsed
    ///
    /// Aborts the run immediately with no catalog mutation.
    #[error("manifest error: {message}")]
    Manifest {
        /// What went wrong while acquiring the manifest
        message: String,
        /// Underlying cause, when one exists
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A single asset fetch failed
    ///
    /// Reported per-asset by sources; the loader buckets these and fails the
    /// run with [`Error::AssetsFailed`] after all siblings resolve.
    #[error("failed to load asset {key}: {message}")]
    Asset {
        /// Key of the asset that failed
        key: AssetKey,
        /// What went wrong
        message: String,
    },

    /// One or more assets failed to load during a run
    #[error("failed to load all assets: {failed} of {total} errored")]
    AssetsFailed {
        /// Number of assets that errored
        failed: usize,
        /// Total number of assets in the manifest
        total: usize,
    },

    /// Downloaded content did not match the hash declared by the manifest
    #[error("hash mismatch for asset {key}: expected {expected}, got {actual}")]
    HashMismatch {
        /// Key of the mismatching asset
        key: AssetKey,
        /// Hash declared by the manifest
        expected: String,
        /// Hash computed from the downloaded bytes
        actual: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Network error
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Build a manifest error from a message alone
    pub fn manifest(message: impl Into<String>) -> Self {
        Error::Manifest {
            message: message.into(),
            source: None,
        }
    }

    /// Build a manifest error wrapping an underlying cause
    pub fn manifest_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Error::Manifest {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

/// Catalog-related errors
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Failed to connect to the catalog database
    #[error("failed to connect to catalog: {0}")]
    ConnectionFailed(String),

    /// Failed to run migrations
    #[error("failed to run migrations: {0}")]
    MigrationFailed(String),

    /// Query failed
    #[error("query failed: {0}")]
    QueryFailed(String),

    /// Record not found
    #[error("record not found: {0}")]
    NotFound(String),
}
