//! Asset record CRUD, metadata merge, and update association.

use crate::error::CatalogError;
use crate::types::{AssetKey, AssetRecord, UpdateId};
use crate::{Error, Result};

use super::{AssetRow, Catalog};

impl Catalog {
    /// Load an asset record by its catalog-wide key
    pub async fn load_asset_by_key(&self, key: &AssetKey) -> Result<Option<AssetRecord>> {
        let row = sqlx::query_as::<_, AssetRow>(
            r#"
            SELECT key, url, content_hash, relative_path, is_launch_asset, download_time
            FROM assets
            WHERE key = ?
            "#,
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            Error::Catalog(CatalogError::QueryFailed(format!(
                "Failed to load asset: {}",
                e
            )))
        })?;

        Ok(row.map(Into::into))
    }

    /// Merge a manifest's asset metadata into an existing catalog record
    ///
    /// The key stays authoritative; url, hash, path and download time are
    /// taken from whichever side has them (the stored record wins when both
    /// do), and the launch flag is OR-ed. The merged record is persisted and
    /// returned for the caller to continue with.
    pub async fn merge_asset_metadata(
        &self,
        existing: &AssetRecord,
        incoming: &AssetRecord,
    ) -> Result<AssetRecord> {
        let merged = AssetRecord {
            key: existing.key.clone(),
            url: existing.url.clone().or_else(|| incoming.url.clone()),
            content_hash: existing
                .content_hash
                .clone()
                .or_else(|| incoming.content_hash.clone()),
            relative_path: existing
                .relative_path
                .clone()
                .or_else(|| incoming.relative_path.clone()),
            is_launch_asset: existing.is_launch_asset || incoming.is_launch_asset,
            download_time: existing.download_time.or(incoming.download_time),
        };

        sqlx::query(
            r#"
            UPDATE assets
            SET url = ?, content_hash = ?, relative_path = ?, is_launch_asset = ?, download_time = ?
            WHERE key = ?
            "#,
        )
        .bind(merged.url.as_ref().map(|u| u.to_string()))
        .bind(&merged.content_hash)
        .bind(&merged.relative_path)
        .bind(merged.is_launch_asset as i32)
        .bind(merged.download_time.map(|t| t.timestamp()))
        .bind(&merged.key)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Catalog(CatalogError::QueryFailed(format!(
                "Failed to merge asset metadata: {}",
                e
            )))
        })?;

        Ok(merged)
    }

    /// Associate an already-materialized asset with an update
    ///
    /// Returns `false` when no catalog row exists for the asset's key, the
    /// signal that the filesystem and catalog have drifted apart and the
    /// caller must re-derive the record instead.
    pub async fn associate_existing_asset(
        &self,
        update_id: &UpdateId,
        asset: &AssetRecord,
    ) -> Result<bool> {
        let found: Option<String> = sqlx::query_scalar("SELECT key FROM assets WHERE key = ?")
            .bind(&asset.key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                Error::Catalog(CatalogError::QueryFailed(format!(
                    "Failed to look up asset for association: {}",
                    e
                )))
            })?;

        if found.is_none() {
            return Ok(false);
        }

        sqlx::query("INSERT OR IGNORE INTO updates_assets (update_id, asset_key) VALUES (?, ?)")
            .bind(update_id)
            .bind(&asset.key)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                Error::Catalog(CatalogError::QueryFailed(format!(
                    "Failed to associate asset with update: {}",
                    e
                )))
            })?;

        if asset.is_launch_asset {
            self.set_launch_asset(update_id, asset).await?;
        }

        Ok(true)
    }

    /// Bulk-persist finished assets and associate them with an update
    ///
    /// Runs in a single transaction: asset rows are upserted (fresh values
    /// from the fetch win over stale stored ones), join rows inserted, and
    /// the update's launch asset key stamped.
    pub async fn insert_finished_assets(
        &self,
        assets: &[AssetRecord],
        update_id: &UpdateId,
    ) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            Error::Catalog(CatalogError::QueryFailed(format!(
                "Failed to begin transaction: {}",
                e
            )))
        })?;

        for asset in assets {
            sqlx::query(
                r#"
                INSERT INTO assets (key, url, content_hash, relative_path, is_launch_asset, download_time)
                VALUES (?, ?, ?, ?, ?, ?)
                ON CONFLICT(key) DO UPDATE SET
                    url = COALESCE(excluded.url, assets.url),
                    content_hash = COALESCE(excluded.content_hash, assets.content_hash),
                    relative_path = COALESCE(excluded.relative_path, assets.relative_path),
                    is_launch_asset = MAX(excluded.is_launch_asset, assets.is_launch_asset),
                    download_time = COALESCE(excluded.download_time, assets.download_time)
                "#,
            )
            .bind(&asset.key)
            .bind(asset.url.as_ref().map(|u| u.to_string()))
            .bind(&asset.content_hash)
            .bind(&asset.relative_path)
            .bind(asset.is_launch_asset as i32)
            .bind(asset.download_time.map(|t| t.timestamp()))
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                Error::Catalog(CatalogError::QueryFailed(format!(
                    "Failed to upsert finished asset: {}",
                    e
                )))
            })?;

            sqlx::query("INSERT OR IGNORE INTO updates_assets (update_id, asset_key) VALUES (?, ?)")
                .bind(update_id)
                .bind(&asset.key)
                .execute(&mut *tx)
                .await
                .map_err(|e| {
                    Error::Catalog(CatalogError::QueryFailed(format!(
                        "Failed to associate finished asset: {}",
                        e
                    )))
                })?;

            if asset.is_launch_asset {
                sqlx::query("UPDATE updates SET launch_asset_key = ? WHERE id = ?")
                    .bind(&asset.key)
                    .bind(update_id)
                    .execute(&mut *tx)
                    .await
                    .map_err(|e| {
                        Error::Catalog(CatalogError::QueryFailed(format!(
                            "Failed to stamp launch asset key: {}",
                            e
                        )))
                    })?;
            }
        }

        tx.commit().await.map_err(|e| {
            Error::Catalog(CatalogError::QueryFailed(format!(
                "Failed to commit finished assets: {}",
                e
            )))
        })?;

        Ok(())
    }

    async fn set_launch_asset(&self, update_id: &UpdateId, asset: &AssetRecord) -> Result<()> {
        sqlx::query("UPDATE updates SET launch_asset_key = ? WHERE id = ?")
            .bind(&asset.key)
            .bind(update_id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                Error::Catalog(CatalogError::QueryFailed(format!(
                    "Failed to stamp launch asset key: {}",
                    e
                )))
            })?;

        Ok(())
    }

    /// Keys of all assets associated with an update
    ///
    /// Mainly useful for diagnostics and tests; the loader itself reconciles
    /// from the manifest side.
    pub async fn load_asset_keys_for_update(
        &self,
        update_id: &UpdateId,
    ) -> Result<Vec<AssetKey>> {
        let keys: Vec<String> = sqlx::query_scalar(
            "SELECT asset_key FROM updates_assets WHERE update_id = ? ORDER BY asset_key",
        )
        .bind(update_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            Error::Catalog(CatalogError::QueryFailed(format!(
                "Failed to list assets for update: {}",
                e
            )))
        })?;

        Ok(keys.into_iter().map(Into::into).collect())
    }
}
