//! Shared test helpers for driving Loader runs against mock sources.

use std::collections::HashSet;
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use tempfile::TempDir;

use crate::config::UpdatesConfig;
use crate::db::Catalog;
use crate::error::Error;
use crate::sources::{AssetSource, ManifestSource};
use crate::types::{AssetFetch, AssetRecord, Manifest, UpdateStatus};
use crate::utils;

/// Build a config rooted inside `temp_dir`
pub(crate) fn test_config(temp_dir: &TempDir) -> UpdatesConfig {
    UpdatesConfig {
        updates_dir: temp_dir.path().join("updates"),
        catalog_path: temp_dir.path().join("catalog.db"),
        ..Default::default()
    }
}

/// Open a catalog inside `temp_dir`, returning it with the tempdir
/// (which must be kept alive).
pub(crate) async fn test_catalog(temp_dir: &TempDir) -> Arc<Catalog> {
    Arc::new(
        Catalog::new(&temp_dir.path().join("catalog.db"))
            .await
            .unwrap(),
    )
}

/// Build a manifest with the given id and assets, scope "test-scope"
pub(crate) fn manifest(id: &str, assets: Vec<AssetRecord>) -> Manifest {
    Manifest {
        id: id.into(),
        scope_key: "test-scope".to_string(),
        runtime_version: Some("1.0.0".to_string()),
        is_development: false,
        assets,
        metadata: Some(serde_json::json!({ "channel": "main" })),
    }
}

/// Build a bare asset for a manifest
pub(crate) fn asset(key: &str) -> AssetRecord {
    AssetRecord::new(key)
}

/// Manifest source that always yields a clone of one manifest
pub(crate) struct StaticManifestSource {
    pub manifest: Manifest,
}

#[async_trait]
impl ManifestSource for StaticManifestSource {
    async fn load_manifest(&self, _config: &UpdatesConfig) -> crate::Result<Manifest> {
        Ok(self.manifest.clone())
    }
}

/// Manifest source that always fails
pub(crate) struct FailingManifestSource;

#[async_trait]
impl ManifestSource for FailingManifestSource {
    async fn load_manifest(&self, _config: &UpdatesConfig) -> crate::Result<Manifest> {
        Err(Error::manifest("simulated manifest outage"))
    }
}

/// Asset source writing deterministic content per key, with configurable
/// failure and skip sets; records which keys were actually fetched.
#[derive(Default)]
pub(crate) struct MockAssetSource {
    pub fail_keys: HashSet<String>,
    pub skip_keys: HashSet<String>,
    pub fetched: Mutex<Vec<String>>,
}

impl MockAssetSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(keys: &[&str]) -> Self {
        Self {
            fail_keys: keys.iter().map(|k| k.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn skipping(keys: &[&str]) -> Self {
        Self {
            skip_keys: keys.iter().map(|k| k.to_string()).collect(),
            ..Self::default()
        }
    }

    /// Keys fetched so far, in completion order
    pub fn fetched_keys(&self) -> Vec<String> {
        self.fetched.lock().unwrap().clone()
    }

    /// Deterministic content for a key
    pub fn content_for(key: &str) -> Vec<u8> {
        format!("content:{key}").into_bytes()
    }
}

#[async_trait]
impl AssetSource for MockAssetSource {
    async fn load_asset(
        &self,
        asset: &AssetRecord,
        updates_dir: &Path,
        _config: &UpdatesConfig,
    ) -> crate::Result<AssetFetch> {
        self.fetched
            .lock()
            .unwrap()
            .push(asset.key.as_str().to_string());

        if self.fail_keys.contains(asset.key.as_str()) {
            return Err(Error::Asset {
                key: asset.key.clone(),
                message: "simulated fetch failure".to_string(),
            });
        }

        let filename = utils::filename_for_asset(asset);
        let destination = updates_dir.join(&filename);

        if utils::file_exists(&destination).await {
            let mut found = asset.clone();
            found.relative_path = Some(filename);
            return Ok(AssetFetch {
                asset: found,
                newly_downloaded: false,
            });
        }

        let bytes = Self::content_for(asset.key.as_str());
        tokio::fs::write(&destination, &bytes).await?;

        let mut downloaded = asset.clone();
        downloaded.content_hash = Some(utils::sha256_bytes(&bytes));
        downloaded.relative_path = Some(filename);
        downloaded.download_time = Some(Utc::now());

        Ok(AssetFetch {
            asset: downloaded,
            newly_downloaded: true,
        })
    }

    fn should_skip(&self, asset: &AssetRecord) -> bool {
        self.skip_keys.contains(asset.key.as_str())
    }

    fn terminal_status(&self) -> UpdateStatus {
        UpdateStatus::Ready
    }
}

/// Assemble a loader over mock sources
pub(crate) fn test_loader(
    catalog: &Arc<Catalog>,
    temp_dir: &TempDir,
    manifest: Manifest,
    source: Arc<MockAssetSource>,
) -> crate::loader::Loader {
    crate::loader::Loader::new(
        Arc::clone(catalog),
        test_config(temp_dir),
        Arc::new(StaticManifestSource { manifest }),
        source,
    )
}

/// Handler recording every progress callback and drift notification
#[derive(Default)]
pub(crate) struct RecordingHandler {
    pub decline: bool,
    pub progress: Mutex<Vec<(String, usize, usize, usize)>>,
    pub drifted: Mutex<Vec<String>>,
}

impl RecordingHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn declining() -> Self {
        Self {
            decline: true,
            ..Self::default()
        }
    }

    pub fn progress_events(&self) -> Vec<(String, usize, usize, usize)> {
        self.progress.lock().unwrap().clone()
    }

    pub fn drifted_keys(&self) -> Vec<String> {
        self.drifted.lock().unwrap().clone()
    }
}

impl super::UpdateEventHandler for RecordingHandler {
    fn should_load(&self, _manifest: &Manifest) -> bool {
        !self.decline
    }

    fn on_asset_progress(
        &self,
        asset: &AssetRecord,
        successful: usize,
        failed: usize,
        total: usize,
    ) {
        self.progress.lock().unwrap().push((
            asset.key.as_str().to_string(),
            successful,
            failed,
            total,
        ));
    }

    fn on_catalog_drift(&self, asset: &AssetRecord) {
        self.drifted
            .lock()
            .unwrap()
            .push(asset.key.as_str().to_string());
    }
}
