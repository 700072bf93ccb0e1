//! Update-record reconciliation and per-asset load decisions.

use std::sync::Arc;

use crate::config::UpdatesConfig;
use crate::db::Catalog;
use crate::error::{CatalogError, Error, Result};
use crate::sources::AssetSource;
use crate::types::{AssetRecord, Manifest, UpdateId, UpdateRecord};
use crate::utils;

use super::aggregator::AssetLoadResult;
use super::{Loader, UpdateEventHandler};

impl Loader {
    /// Reconcile the manifest's update record and drive asset loading
    pub(crate) async fn process_manifest(
        &self,
        manifest: Manifest,
        handler: &dyn UpdateEventHandler,
    ) -> Result<Option<UpdateRecord>> {
        if manifest.is_development {
            // The development runtime manages its own resources; record the
            // update but don't fetch or cache anything
            let update = match self.catalog.load_update_by_id(&manifest.id).await? {
                Some(existing) => existing,
                None => {
                    let record = manifest.update_record();
                    self.catalog.insert_update(&record).await?;
                    record
                }
            };
            self.catalog
                .mark_update_finished(&update.id, false, self.asset_source.terminal_status())
                .await?;
            let update = self.reload_update(&update.id).await?;
            self.catalog.save_manifest_metadata(&manifest).await?;
            return Ok(Some(update));
        }

        let new_update = manifest.update_record();
        let existing = self.catalog.load_update_by_id(&new_update.id).await?;

        let existing = match existing {
            Some(mut record) => {
                // Two updates sharing an id but not a scope key means
                // something went wrong server-side; overwrite the stored
                // scope key and try to launch something rather than show the
                // user a cryptic error
                if record.scope_key != new_update.scope_key {
                    tracing::error!(
                        update_id = %record.id,
                        stored_scope = %record.scope_key,
                        manifest_scope = %new_update.scope_key,
                        "Loaded an update with the same id but a different scope key than one \
                         already in the catalog; overwriting the scope key"
                    );
                    self.catalog
                        .set_update_scope_key(&record.id, &new_update.scope_key)
                        .await?;
                    record.scope_key = new_update.scope_key.clone();
                }
                Some(record)
            }
            None => None,
        };

        if let Some(record) = &existing
            && record.status.is_terminal()
        {
            // Already fully loaded and ready to go
            tracing::info!(update_id = %record.id, "Update already present in catalog; skipping asset loading");
            self.catalog.save_manifest_metadata(&manifest).await?;
            return Ok(Some(record.clone()));
        }

        let update = match existing {
            // A non-terminal record means a prior run was interrupted; reuse
            // it and re-reconcile every asset
            Some(record) => record,
            None => {
                self.catalog.insert_update(&new_update).await?;
                new_update
            }
        };

        self.load_assets(update, manifest, handler).await
    }

    /// Fetch the current catalog state of an update that must exist
    pub(crate) async fn reload_update(&self, id: &UpdateId) -> Result<UpdateRecord> {
        self.catalog.load_update_by_id(id).await?.ok_or_else(|| {
            Error::Catalog(CatalogError::NotFound(format!(
                "update {} disappeared from catalog",
                id
            )))
        })
    }
}

/// Decide one asset's outcome: skip, already-exists, or fetch
///
/// Runs as an independent spawned task per asset; any catalog or fetch
/// failure resolves to `Errored` so the completion join always closes.
pub(crate) async fn reconcile_asset(
    catalog: Arc<Catalog>,
    source: Arc<dyn AssetSource>,
    config: Arc<UpdatesConfig>,
    asset: AssetRecord,
) -> (AssetRecord, AssetLoadResult) {
    if source.should_skip(&asset) {
        tracing::debug!(key = %asset.key, "Asset declared out of scope by skip policy");
        return (asset, AssetLoadResult::Skipped);
    }

    // An asset with this key may already be in the catalog from another
    // update; merge the manifest's metadata into the existing record
    let asset = match catalog.load_asset_by_key(&asset.key).await {
        Ok(Some(existing)) => match catalog.merge_asset_metadata(&existing, &asset).await {
            Ok(merged) => merged,
            Err(e) => {
                tracing::error!(key = %asset.key, error = %e, "Failed to merge asset metadata");
                return (asset, AssetLoadResult::Errored);
            }
        },
        Ok(None) => asset,
        Err(e) => {
            tracing::error!(key = %asset.key, error = %e, "Failed to look up asset in catalog");
            return (asset, AssetLoadResult::Errored);
        }
    };

    // If a local copy is already on disk, don't fetch it again
    if let Some(relative_path) = &asset.relative_path
        && utils::file_exists(&config.updates_dir.join(relative_path)).await
    {
        return (asset, AssetLoadResult::AlreadyExists);
    }

    match source.load_asset(&asset, &config.updates_dir, &config).await {
        Ok(fetch) => {
            let result = if fetch.newly_downloaded {
                AssetLoadResult::Finished
            } else {
                AssetLoadResult::AlreadyExists
            };
            (fetch.asset, result)
        }
        Err(e) => {
            let identifier = asset.log_identifier();
            tracing::error!(error = %e, "Failed to load asset with {identifier}");
            (asset, AssetLoadResult::Errored)
        }
    }
}
