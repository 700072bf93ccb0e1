//! Core update loader split into focused submodules.
//!
//! The [`Loader`] struct and its run sequence are organized by domain:
//! - [`reconcile`] - Update-record reconciliation and per-asset decisions
//! - [`aggregator`] - Fan-in join over concurrent asset outcomes
//! - [`finalize`] - Existing-asset association, drift recovery, promotion
//!
//! A `Loader` is a one-shot handle: [`Loader::run`] consumes it, so a second
//! start of the same run is a compile error rather than a runtime fault.
//! Construct a fresh loader for every run.

mod aggregator;
mod finalize;
mod reconcile;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::task::JoinSet;

use crate::config::UpdatesConfig;
use crate::db::Catalog;
use crate::error::{Error, Result};
use crate::sources::{AssetSource, EmbeddedSource, ManifestSource, RemoteSource};
use crate::types::{AssetRecord, Manifest, UpdateRecord};

use aggregator::{AssetLoadResult, CompletionAggregator};
use reconcile::reconcile_asset;

/// Callbacks a [`Loader`] run reports through
///
/// The terminal outcome of a run is its return value; this trait carries the
/// mid-run hooks. Progress callbacks arrive from the loader's single consumer
/// loop, so implementations never see two calls race.
pub trait UpdateEventHandler: Send + Sync {
    /// Decide whether to proceed with a freshly fetched manifest
    ///
    /// Returning false short-circuits the run as a no-op success, useful
    /// when the caller already holds an equivalent update.
    fn should_load(&self, _manifest: &Manifest) -> bool {
        true
    }

    /// Called each time an asset resolves, in completion order
    ///
    /// `successful` counts assets loaded or found on disk, `failed` counts
    /// errored assets; both are monotonically non-decreasing and their sum
    /// reaches `total` exactly once, at the final call of the run.
    fn on_asset_progress(
        &self,
        _asset: &AssetRecord,
        _successful: usize,
        _failed: usize,
        _total: usize,
    ) {
    }

    /// Called when an on-disk asset had no catalog row and was re-derived
    ///
    /// Frequent drift indicates an operational problem worth investigating;
    /// the run itself recovers and continues.
    fn on_catalog_drift(&self, _asset: &AssetRecord) {}
}

/// Handler accepting every manifest and ignoring progress
///
/// Convenience for callers that only care about the run's return value.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAll;

impl UpdateEventHandler for AcceptAll {}

/// Orchestrates one end-to-end update load
///
/// Fetches a manifest, reconciles the update and its assets against the
/// catalog and filesystem, fans out whatever fetches are needed, and durably
/// commits the result. See the crate docs for the full lifecycle.
pub struct Loader {
    pub(crate) catalog: Arc<Catalog>,
    pub(crate) config: Arc<UpdatesConfig>,
    pub(crate) manifest_source: Arc<dyn ManifestSource>,
    pub(crate) asset_source: Arc<dyn AssetSource>,
}

impl Loader {
    /// Create a loader with explicit sources
    pub fn new(
        catalog: Arc<Catalog>,
        config: UpdatesConfig,
        manifest_source: Arc<dyn ManifestSource>,
        asset_source: Arc<dyn AssetSource>,
    ) -> Self {
        Self {
            catalog,
            config: Arc::new(config),
            manifest_source,
            asset_source,
        }
    }

    /// Create a loader fetching manifest and assets over HTTP
    pub fn remote(catalog: Arc<Catalog>, config: UpdatesConfig) -> Result<Self> {
        let source = Arc::new(RemoteSource::new(&config)?);
        Ok(Self::new(catalog, config, source.clone(), source))
    }

    /// Create a loader reading the update shipped inside the app bundle
    pub fn embedded(
        catalog: Arc<Catalog>,
        config: UpdatesConfig,
        bundle_dir: impl Into<PathBuf>,
    ) -> Self {
        let source = Arc::new(EmbeddedSource::new(bundle_dir));
        Self::new(catalog, config, source.clone(), source)
    }

    /// Drive one run to its terminal outcome
    ///
    /// Consumes the loader. Returns `Ok(Some(update))` when an update is
    /// ready (or was already), `Ok(None)` when the handler declined the
    /// manifest, and `Err` when the manifest could not be acquired, any
    /// asset failed, or the catalog could not be written during finalize.
    pub async fn run(self, handler: &dyn UpdateEventHandler) -> Result<Option<UpdateRecord>> {
        tokio::fs::create_dir_all(&self.config.updates_dir)
            .await
            .map_err(|e| {
                Error::Io(std::io::Error::new(
                    e.kind(),
                    format!(
                        "Failed to create updates directory '{}': {}",
                        self.config.updates_dir.display(),
                        e
                    ),
                ))
            })?;

        let manifest = match self.manifest_source.load_manifest(&self.config).await {
            Ok(manifest) => manifest,
            Err(e) => {
                tracing::error!(error = %e, "Failed to load manifest");
                return Err(e);
            }
        };

        if !handler.should_load(&manifest) {
            tracing::info!(
                update_id = %manifest.id,
                "Caller declined manifest; finishing with no new update"
            );
            self.catalog.save_manifest_metadata(&manifest).await?;
            return Ok(None);
        }

        self.process_manifest(manifest, handler).await
    }

    /// Fan out per-asset reconciliation and join the outcomes
    ///
    /// All bucket mutation, the progress callback, and the completion
    /// decision happen in the single `join_next` consumer loop below, so
    /// concurrent completions cannot race on the termination condition. A
    /// manifest with no assets falls straight through to finalize.
    pub(crate) async fn load_assets(
        &self,
        update: UpdateRecord,
        manifest: Manifest,
        handler: &dyn UpdateEventHandler,
    ) -> Result<Option<UpdateRecord>> {
        let total = manifest.assets.len();
        let mut aggregator = CompletionAggregator::new(total);
        let mut tasks = JoinSet::new();
        let mut in_flight: HashMap<tokio::task::Id, AssetRecord> = HashMap::new();

        for asset in manifest.assets.clone() {
            let catalog = Arc::clone(&self.catalog);
            let source = Arc::clone(&self.asset_source);
            let config = Arc::clone(&self.config);
            let handle = tasks.spawn(reconcile_asset(catalog, source, config, asset.clone()));
            in_flight.insert(handle.id(), asset);
        }

        while let Some(joined) = tasks.join_next_with_id().await {
            let (asset, result) = match joined {
                Ok((task_id, outcome)) => {
                    in_flight.remove(&task_id);
                    outcome
                }
                Err(e) => {
                    // A panicked reconcile task still has to land in a bucket
                    // or the join would come up short
                    let asset = in_flight
                        .remove(&e.id())
                        .unwrap_or_else(|| AssetRecord::new("unknown"));
                    tracing::error!(key = %asset.key, error = %e, "Asset task aborted");
                    (asset, AssetLoadResult::Errored)
                }
            };

            let progress = aggregator.record(asset.clone(), result);
            handler.on_asset_progress(&asset, progress.successful, progress.failed, progress.total);
        }

        debug_assert!(aggregator.is_complete());

        self.finalize(update, manifest, aggregator, handler).await
    }
}
