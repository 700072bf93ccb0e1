//! Manifest auxiliary metadata, keyed by scope.
//!
//! Servers advertise configuration alongside a manifest (header overrides,
//! rollout filters). The loader persists it on every successful run,
//! including declined no-op runs, so the next manifest request reflects the
//! newest server state.

use crate::error::CatalogError;
use crate::types::Manifest;
use crate::{Error, Result};

use super::Catalog;

impl Catalog {
    /// Persist a manifest's auxiliary metadata for its scope
    ///
    /// A manifest without metadata leaves any previously stored value alone.
    pub async fn save_manifest_metadata(&self, manifest: &Manifest) -> Result<()> {
        let Some(metadata) = &manifest.metadata else {
            return Ok(());
        };

        let value = serde_json::to_string(metadata)?;

        sqlx::query(
            r#"
            INSERT INTO manifest_metadata (scope_key, value, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(scope_key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&manifest.scope_key)
        .bind(&value)
        .bind(chrono::Utc::now().timestamp())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Catalog(CatalogError::QueryFailed(format!(
                "Failed to save manifest metadata: {}",
                e
            )))
        })?;

        Ok(())
    }

    /// Load the stored manifest metadata for a scope, if any
    pub async fn load_manifest_metadata(
        &self,
        scope_key: &str,
    ) -> Result<Option<serde_json::Value>> {
        let value: Option<String> =
            sqlx::query_scalar("SELECT value FROM manifest_metadata WHERE scope_key = ?")
                .bind(scope_key)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| {
                    Error::Catalog(CatalogError::QueryFailed(format!(
                        "Failed to load manifest metadata: {}",
                        e
                    )))
                })?;

        match value {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }
}
