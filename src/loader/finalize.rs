//! Finalization: association, drift recovery, and terminal promotion.

use chrono::Utc;

use crate::error::{Error, Result};
use crate::types::{Manifest, UpdateRecord};
use crate::utils;

use super::aggregator::{Buckets, CompletionAggregator};
use super::{Loader, UpdateEventHandler};

impl Loader {
    /// Commit the run's outcome once every asset has resolved
    ///
    /// Finished assets are persisted even when siblings errored, so a later
    /// run resumes where this one stopped instead of re-fetching. The update
    /// is only promoted to a terminal status when nothing errored.
    pub(crate) async fn finalize(
        &self,
        update: UpdateRecord,
        manifest: Manifest,
        aggregator: CompletionAggregator,
        handler: &dyn UpdateEventHandler,
    ) -> Result<Option<UpdateRecord>> {
        let Buckets {
            mut finished,
            existing,
            errored,
            skipped,
            total,
        } = aggregator.into_buckets();

        for asset in existing {
            let found = self
                .catalog
                .associate_existing_asset(&update.id, &asset)
                .await?;

            if !found {
                // The catalog and filesystem have drifted apart: a file is
                // present on disk but no catalog row could be linked to it.
                // Re-derive a record from the file instead of failing the run.
                tracing::warn!(
                    key = %asset.key,
                    update_id = %update.id,
                    "No catalog row for on-disk asset; re-deriving record from disk"
                );
                handler.on_catalog_drift(&asset);

                let mut recovered = asset;
                recovered.content_hash = match &recovered.relative_path {
                    Some(relative_path) => {
                        utils::sha256_file(&self.config.updates_dir.join(relative_path))
                            .await
                            .ok()
                    }
                    None => None,
                };
                recovered.download_time = Some(Utc::now());
                finished.push(recovered);
            }
        }

        self.catalog
            .insert_finished_assets(&finished, &update.id)
            .await?;

        let failed = errored.len();
        if failed > 0 {
            tracing::error!(
                update_id = %update.id,
                failed,
                total,
                "Failed to load all assets"
            );
            return Err(Error::AssetsFailed { failed, total });
        }

        self.catalog
            .mark_update_finished(
                &update.id,
                !skipped.is_empty(),
                self.asset_source.terminal_status(),
            )
            .await?;

        let update = self.reload_update(&update.id).await?;
        self.catalog.save_manifest_metadata(&manifest).await?;

        tracing::info!(
            update_id = %update.id,
            status = ?update.status,
            skipped = skipped.len(),
            "Update finished"
        );

        Ok(Some(update))
    }
}
