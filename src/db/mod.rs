//! Catalog persistence layer for ota-loader
//!
//! Handles SQLite persistence for updates, assets, their many-to-many
//! association, and manifest auxiliary metadata.
//!
//! ## Submodules
//!
//! Methods on [`Catalog`] are organized by domain:
//! - [`migrations`] — Catalog lifecycle, schema migrations
//! - [`updates`] — Update record CRUD and status transitions
//! - [`assets`] — Asset record CRUD, metadata merge, update association
//! - [`metadata`] — Manifest auxiliary metadata (per scope key)
//!
//! The catalog serializes its own writes through the connection pool; callers
//! do not need additional locking around it.

use chrono::{TimeZone, Utc};
use sqlx::{FromRow, sqlite::SqlitePool};
use url::Url;

use crate::types::{AssetRecord, UpdateRecord, UpdateStatus};

mod assets;
mod metadata;
mod migrations;
mod updates;

/// Update record as stored in SQLite
#[derive(Debug, Clone, FromRow)]
pub struct UpdateRow {
    /// Manifest-assigned identifier
    pub id: String,
    /// Logical namespace the update belongs to
    pub scope_key: String,
    /// Status code (see [`UpdateStatus::from_i32`])
    pub status: i32,
    /// Key of the entry-point asset, once known
    pub launch_asset_key: Option<String>,
    /// Whether assets were deliberately skipped when this update finished
    pub has_skipped_assets: i32,
    /// Unix timestamp when the record was first created
    pub created_at: i64,
}

impl From<UpdateRow> for UpdateRecord {
    fn from(row: UpdateRow) -> Self {
        UpdateRecord {
            id: row.id.into(),
            scope_key: row.scope_key,
            status: UpdateStatus::from_i32(row.status),
            launch_asset_key: row.launch_asset_key.map(Into::into),
            has_skipped_assets: row.has_skipped_assets != 0,
        }
    }
}

/// Asset record as stored in SQLite
#[derive(Debug, Clone, FromRow)]
pub struct AssetRow {
    /// Catalog-wide dedup identity
    pub key: String,
    /// Source URL, when the asset is remotely fetchable
    pub url: Option<String>,
    /// Lowercase hex SHA-256 of the asset contents
    pub content_hash: Option<String>,
    /// On-disk location relative to the updates directory
    pub relative_path: Option<String>,
    /// Whether this asset is an update's entry point
    pub is_launch_asset: i32,
    /// Unix timestamp when the asset was first materialized
    pub download_time: Option<i64>,
}

impl From<AssetRow> for AssetRecord {
    fn from(row: AssetRow) -> Self {
        AssetRecord {
            key: row.key.into(),
            // A stored URL that no longer parses is dropped rather than
            // poisoning the whole row
            url: row.url.and_then(|u| Url::parse(&u).ok()),
            content_hash: row.content_hash,
            relative_path: row.relative_path,
            is_launch_asset: row.is_launch_asset != 0,
            download_time: row
                .download_time
                .and_then(|t| Utc.timestamp_opt(t, 0).single()),
        }
    }
}

/// Catalog handle for ota-loader
///
/// Cheap to clone is not needed here; the loader shares it via `Arc`.
pub struct Catalog {
    pool: SqlitePool,
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
