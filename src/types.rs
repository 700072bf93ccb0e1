//! Core types for ota-loader

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

/// Unique identifier for an update, assigned by the manifest author
///
/// Update ids are never generated locally; the server (or embedded bundle)
/// declares them and the catalog keys update records by them.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UpdateId(pub String);

impl UpdateId {
    /// Create a new UpdateId
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the inner string value
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for UpdateId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for UpdateId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl std::fmt::Display for UpdateId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// Implement sqlx Type, Encode, and Decode for database operations
impl sqlx::Type<sqlx::Sqlite> for UpdateId {
    fn type_info() -> sqlx::sqlite::SqliteTypeInfo {
        <String as sqlx::Type<sqlx::Sqlite>>::type_info()
    }

    fn compatible(ty: &sqlx::sqlite::SqliteTypeInfo) -> bool {
        <String as sqlx::Type<sqlx::Sqlite>>::compatible(ty)
    }
}

impl<'q> sqlx::Encode<'q, sqlx::Sqlite> for UpdateId {
    fn encode_by_ref(
        &self,
        buf: &mut Vec<sqlx::sqlite::SqliteArgumentValue<'q>>,
    ) -> Result<sqlx::encode::IsNull, Box<dyn std::error::Error + Send + Sync>> {
        sqlx::Encode::<sqlx::Sqlite>::encode_by_ref(&self.0, buf)
    }
}

impl<'r> sqlx::Decode<'r, sqlx::Sqlite> for UpdateId {
    fn decode(value: sqlx::sqlite::SqliteValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let id = <String as sqlx::Decode<sqlx::Sqlite>>::decode(value)?;
        Ok(Self(id))
    }
}

/// Logical dedup identity of an asset
///
/// Asset keys are unique across the whole catalog regardless of which updates
/// reference the asset; two manifests naming the same key share one record.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetKey(pub String);

impl AssetKey {
    /// Create a new AssetKey
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Get the inner string value
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for AssetKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

impl From<&str> for AssetKey {
    fn from(key: &str) -> Self {
        Self(key.to_string())
    }
}

impl std::fmt::Display for AssetKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl sqlx::Type<sqlx::Sqlite> for AssetKey {
    fn type_info() -> sqlx::sqlite::SqliteTypeInfo {
        <String as sqlx::Type<sqlx::Sqlite>>::type_info()
    }

    fn compatible(ty: &sqlx::sqlite::SqliteTypeInfo) -> bool {
        <String as sqlx::Type<sqlx::Sqlite>>::compatible(ty)
    }
}

impl<'q> sqlx::Encode<'q, sqlx::Sqlite> for AssetKey {
    fn encode_by_ref(
        &self,
        buf: &mut Vec<sqlx::sqlite::SqliteArgumentValue<'q>>,
    ) -> Result<sqlx::encode::IsNull, Box<dyn std::error::Error + Send + Sync>> {
        sqlx::Encode::<sqlx::Sqlite>::encode_by_ref(&self.0, buf)
    }
}

impl<'r> sqlx::Decode<'r, sqlx::Sqlite> for AssetKey {
    fn decode(value: sqlx::sqlite::SqliteValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let key = <String as sqlx::Decode<sqlx::Sqlite>>::decode(value)?;
        Ok(Self(key))
    }
}

/// Update lifecycle status
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateStatus {
    /// Created but not all assets are verified present
    Pending,
    /// All required assets verified present, promotable to launch
    Ready,
    /// Loaded from the app's embedded bundle
    Embedded,
}

impl UpdateStatus {
    /// Convert integer status code to UpdateStatus enum
    pub fn from_i32(status: i32) -> Self {
        match status {
            0 => UpdateStatus::Pending,
            1 => UpdateStatus::Ready,
            2 => UpdateStatus::Embedded,
            _ => UpdateStatus::Pending, // Default to Pending for unknown status
        }
    }

    /// Convert UpdateStatus enum to integer status code
    pub fn to_i32(&self) -> i32 {
        match self {
            UpdateStatus::Pending => 0,
            UpdateStatus::Ready => 1,
            UpdateStatus::Embedded => 2,
        }
    }

    /// Whether this is a terminal (launchable) status
    ///
    /// Terminal updates never regress to `Pending` and are not reprocessed
    /// when a manifest with the same id is seen again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, UpdateStatus::Ready | UpdateStatus::Embedded)
    }
}

/// One candidate update version tracked by the catalog
#[derive(Clone, Debug, PartialEq)]
pub struct UpdateRecord {
    /// Manifest-assigned identifier
    pub id: UpdateId,
    /// Logical namespace the update belongs to (app/channel)
    pub scope_key: String,
    /// Current lifecycle status
    pub status: UpdateStatus,
    /// The asset designated as entry point, if any
    pub launch_asset_key: Option<AssetKey>,
    /// Whether any assets were deliberately skipped when this update finished
    pub has_skipped_assets: bool,
}

/// One binary resource referenced by one or more updates
///
/// Wire manifests populate `key`, `url`, `content_hash` and the launch flag;
/// `relative_path` and `download_time` are local-only and stamped when the
/// asset is first materialized under the updates directory.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AssetRecord {
    /// Catalog-wide dedup identity
    pub key: AssetKey,
    /// Where a remote source fetches the asset from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<Url>,
    /// Lowercase hex SHA-256 of the asset contents
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_hash: Option<String>,
    /// On-disk location relative to the updates directory, once materialized
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relative_path: Option<String>,
    /// Whether this asset is the update's entry point
    #[serde(default)]
    pub is_launch_asset: bool,
    /// When the asset was first materialized locally
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_time: Option<DateTime<Utc>>,
}

impl AssetRecord {
    /// Create a bare asset record with only its key set
    pub fn new(key: impl Into<AssetKey>) -> Self {
        Self {
            key: key.into(),
            url: None,
            content_hash: None,
            relative_path: None,
            is_launch_asset: false,
            download_time: None,
        }
    }

    /// Hash-or-key identifier used in log messages
    pub(crate) fn log_identifier(&self) -> String {
        match &self.content_hash {
            Some(hash) => format!("hash {}", hash),
            None => format!("key {}", self.key),
        }
    }
}

/// Server-declared (or bundle-declared) description of an update
///
/// A manifest names the update, its scope, and the full list of assets the
/// update requires. The wire format is JSON; remote and embedded sources
/// share it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Manifest {
    /// Update identifier assigned by the manifest author
    pub id: UpdateId,
    /// Logical namespace the update belongs to
    pub scope_key: String,
    /// Runtime version this update is compatible with
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime_version: Option<String>,
    /// Whether this manifest represents a live, unoptimized development build
    ///
    /// Development builds manage their own resources; no assets are fetched.
    #[serde(default)]
    pub is_development: bool,
    /// Assets the update requires
    #[serde(default)]
    pub assets: Vec<AssetRecord>,
    /// Server-advertised auxiliary configuration, persisted on success
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl Manifest {
    /// Key of the asset flagged as the update's entry point, if any
    pub fn launch_asset_key(&self) -> Option<AssetKey> {
        self.assets
            .iter()
            .find(|a| a.is_launch_asset)
            .map(|a| a.key.clone())
    }

    /// Build a fresh `Pending` update record for this manifest
    pub fn update_record(&self) -> UpdateRecord {
        UpdateRecord {
            id: self.id.clone(),
            scope_key: self.scope_key.clone(),
            status: UpdateStatus::Pending,
            launch_asset_key: self.launch_asset_key(),
            has_skipped_assets: false,
        }
    }
}

/// Outcome of a single asset fetch against an [`AssetSource`](crate::sources::AssetSource)
#[must_use]
#[derive(Clone, Debug)]
pub struct AssetFetch {
    /// The asset record, with `relative_path`/`content_hash`/`download_time`
    /// stamped by the source
    pub asset: AssetRecord,
    /// False when the source found the content already present at its
    /// destination instead of materializing it anew
    pub newly_downloaded: bool,
}
