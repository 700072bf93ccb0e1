//! Embedded-bundle manifest and asset source

use async_trait::async_trait;
use chrono::Utc;
use std::path::{Path, PathBuf};

use crate::config::UpdatesConfig;
use crate::error::{Error, Result};
use crate::types::{AssetFetch, AssetRecord, Manifest, UpdateStatus};
use crate::utils;

/// Manifest filename inside the bundle directory
const MANIFEST_FILENAME: &str = "manifest.json";

/// Loads the update shipped inside the application bundle
///
/// The bundle directory contains a `manifest.json` plus each referenced
/// asset at the path named by its key. Assets are copied into the updates
/// directory so embedded and remotely loaded updates are launched the same
/// way. Updates loaded through this source finish as
/// [`UpdateStatus::Embedded`].
pub struct EmbeddedSource {
    bundle_dir: PathBuf,
}

impl EmbeddedSource {
    /// Create an embedded source reading from `bundle_dir`
    pub fn new(bundle_dir: impl Into<PathBuf>) -> Self {
        Self {
            bundle_dir: bundle_dir.into(),
        }
    }
}

#[async_trait]
impl crate::sources::ManifestSource for EmbeddedSource {
    async fn load_manifest(&self, _config: &UpdatesConfig) -> Result<Manifest> {
        let path = self.bundle_dir.join(MANIFEST_FILENAME);

        let raw = tokio::fs::read(&path)
            .await
            .map_err(|e| Error::manifest_with_source("failed to read embedded manifest", e))?;

        let manifest: Manifest = serde_json::from_slice(&raw)
            .map_err(|e| Error::manifest_with_source("failed to parse embedded manifest", e))?;

        Ok(manifest)
    }
}

#[async_trait]
impl crate::sources::AssetSource for EmbeddedSource {
    async fn load_asset(
        &self,
        asset: &AssetRecord,
        updates_dir: &Path,
        _config: &UpdatesConfig,
    ) -> Result<AssetFetch> {
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

        let source_path = self.bundle_dir.join(asset.key.as_str());
        let bytes = tokio::fs::read(&source_path).await.map_err(|e| Error::Asset {
            key: asset.key.clone(),
            message: format!("failed to read bundled file {}: {}", source_path.display(), e),
        })?;

        let actual_hash = utils::sha256_bytes(&bytes);
        if let Some(expected) = &asset.content_hash
            && expected != &actual_hash
        {
            // A bundle whose contents disagree with its own manifest is
            // corrupted; refusing here beats launching a broken update
            return Err(Error::HashMismatch {
                key: asset.key.clone(),
                expected: expected.clone(),
                actual: actual_hash,
            });
        }

        tokio::fs::write(&destination, &bytes).await?;

        let mut copied = asset.clone();
        copied.content_hash = Some(actual_hash);
        copied.relative_path = Some(filename);
        copied.download_time = Some(Utc::now());

        Ok(AssetFetch {
            asset: copied,
            newly_downloaded: true,
        })
    }

    fn terminal_status(&self) -> UpdateStatus {
        UpdateStatus::Embedded
    }
}
