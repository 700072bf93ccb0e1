//! Update record CRUD and status transitions.

use crate::error::CatalogError;
use crate::types::{UpdateId, UpdateRecord, UpdateStatus};
use crate::{Error, Result};

use super::{Catalog, UpdateRow};

impl Catalog {
    /// Insert a new update record
    pub async fn insert_update(&self, update: &UpdateRecord) -> Result<()> {
        let now = chrono::Utc::now().timestamp();

        sqlx::query(
            r#"
            INSERT INTO updates (
                id, scope_key, status, launch_asset_key, has_skipped_assets, created_at
            ) VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&update.id)
        .bind(&update.scope_key)
        .bind(update.status.to_i32())
        .bind(&update.launch_asset_key)
        .bind(update.has_skipped_assets as i32)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Catalog(CatalogError::QueryFailed(format!(
                "Failed to insert update: {}",
                e
            )))
        })?;

        Ok(())
    }

    /// Load an update record by its manifest-assigned id
    pub async fn load_update_by_id(&self, id: &UpdateId) -> Result<Option<UpdateRecord>> {
        let row = sqlx::query_as::<_, UpdateRow>(
            r#"
            SELECT id, scope_key, status, launch_asset_key, has_skipped_assets, created_at
            FROM updates
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            Error::Catalog(CatalogError::QueryFailed(format!(
                "Failed to load update: {}",
                e
            )))
        })?;

        Ok(row.map(Into::into))
    }

    /// Overwrite the scope key stored for an update
    ///
    /// Used when a freshly fetched manifest carries the same id as an existing
    /// record but a different scope key (a tolerated server-side anomaly).
    pub async fn set_update_scope_key(&self, id: &UpdateId, scope_key: &str) -> Result<()> {
        sqlx::query("UPDATE updates SET scope_key = ? WHERE id = ?")
            .bind(scope_key)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                Error::Catalog(CatalogError::QueryFailed(format!(
                    "Failed to set update scope key: {}",
                    e
                )))
            })?;

        Ok(())
    }

    /// Promote a pending update to a terminal status
    ///
    /// Only `Pending` rows are touched, so an already-terminal update never
    /// regresses or flips between terminal statuses.
    pub async fn mark_update_finished(
        &self,
        id: &UpdateId,
        has_skipped_assets: bool,
        status: UpdateStatus,
    ) -> Result<()> {
        if !status.is_terminal() {
            return Err(Error::Catalog(CatalogError::QueryFailed(format!(
                "Refusing to finish update {} with non-terminal status {:?}",
                id, status
            ))));
        }

        sqlx::query(
            r#"
            UPDATE updates
            SET status = ?, has_skipped_assets = ?
            WHERE id = ? AND status = ?
            "#,
        )
        .bind(status.to_i32())
        .bind(has_skipped_assets as i32)
        .bind(id)
        .bind(UpdateStatus::Pending.to_i32())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Catalog(CatalogError::QueryFailed(format!(
                "Failed to mark update finished: {}",
                e
            )))
        })?;

        Ok(())
    }
}
