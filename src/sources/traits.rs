//! Capability traits for manifest and asset acquisition

use async_trait::async_trait;
use std::path::Path;

use crate::config::UpdatesConfig;
use crate::types::{AssetFetch, AssetRecord, Manifest, UpdateStatus};

/// Trait for acquiring a manifest
///
/// A manifest source performs exactly one asynchronous acquisition per call;
/// it owns transport, parsing and (where applicable) signature verification.
/// Timeouts are the source's responsibility; the loader treats a hung
/// source as a hung run.
#[async_trait]
pub trait ManifestSource: Send + Sync {
    /// Fetch and parse the latest manifest
    ///
    /// # Errors
    ///
    /// Returns [`Error::Manifest`](crate::Error::Manifest) when the manifest
    /// cannot be acquired or parsed. The loader aborts the run on this error
    /// without touching the catalog.
    async fn load_manifest(&self, config: &UpdatesConfig) -> crate::Result<Manifest>;
}

/// Trait for materializing a single asset
///
/// Implementations are called once per asset per run, concurrently and in no
/// particular order. Each call must either materialize the asset under
/// `updates_dir` or report that the content was already present there.
#[async_trait]
pub trait AssetSource: Send + Sync {
    /// Materialize one asset into `updates_dir`
    ///
    /// On success the returned record carries `relative_path`, plus a
    /// verified `content_hash` and fresh `download_time` when the content was
    /// actually transferred. `newly_downloaded` is false when the destination
    /// file already existed.
    ///
    /// # Errors
    ///
    /// Fetch failures are reported per-asset; the loader buckets them and
    /// continues with the asset's siblings.
    async fn load_asset(
        &self,
        asset: &AssetRecord,
        updates_dir: &Path,
        config: &UpdatesConfig,
    ) -> crate::Result<AssetFetch>;

    /// Policy hook: declare an asset out of scope for fetching
    ///
    /// Skipped assets are never looked up in the catalog or fetched; they are
    /// recorded so the finished update can be flagged as partial-by-design.
    fn should_skip(&self, _asset: &AssetRecord) -> bool {
        false
    }

    /// Terminal status an update loaded through this source finishes with
    fn terminal_status(&self) -> UpdateStatus {
        UpdateStatus::Ready
    }
}
