//! HTTP-backed manifest and asset source

use async_trait::async_trait;
use chrono::Utc;
use std::path::Path;

use crate::config::UpdatesConfig;
use crate::error::{Error, Result};
use crate::types::{AssetFetch, AssetRecord, Manifest};
use crate::utils;

/// Request header carrying the client's runtime version, when configured
const RUNTIME_VERSION_HEADER: &str = "ota-runtime-version";

/// Fetches manifests and assets over HTTP
///
/// One shared `reqwest` client with the configured timeout; per-request
/// headers come from [`UpdatesConfig::request_headers`]. Downloaded asset
/// bytes are SHA-256 verified against the manifest-declared hash before
/// anything is written to disk.
pub struct RemoteSource {
    client: reqwest::Client,
}

impl RemoteSource {
    /// Create a remote source using the config's request timeout
    pub fn new(config: &UpdatesConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self { client })
    }

    fn request(&self, url: url::Url, config: &UpdatesConfig) -> reqwest::RequestBuilder {
        let mut req = self.client.get(url);
        for (name, value) in &config.request_headers {
            req = req.header(name, value);
        }
        if let Some(runtime_version) = &config.runtime_version {
            req = req.header(RUNTIME_VERSION_HEADER, runtime_version);
        }
        req
    }
}

#[async_trait]
impl crate::sources::ManifestSource for RemoteSource {
    async fn load_manifest(&self, config: &UpdatesConfig) -> Result<Manifest> {
        let url = config.update_url.clone().ok_or_else(|| Error::Config {
            message: "update_url is required for a remote manifest source".to_string(),
        })?;

        let response = self
            .request(url, config)
            .send()
            .await
            .map_err(|e| Error::manifest_with_source("failed to request manifest", e))?
            .error_for_status()
            .map_err(|e| {
                Error::manifest_with_source("update server returned an error status", e)
            })?;

        let manifest: Manifest = response
            .json()
            .await
            .map_err(|e| Error::manifest_with_source("failed to parse manifest", e))?;

        tracing::debug!(
            update_id = %manifest.id,
            scope_key = %manifest.scope_key,
            assets = manifest.assets.len(),
            "Fetched manifest"
        );

        Ok(manifest)
    }
}

#[async_trait]
impl crate::sources::AssetSource for RemoteSource {
    async fn load_asset(
        &self,
        asset: &AssetRecord,
        updates_dir: &Path,
        config: &UpdatesConfig,
    ) -> Result<AssetFetch> {
        let url = asset.url.clone().ok_or_else(|| Error::Asset {
            key: asset.key.clone(),
            message: "asset has no download url".to_string(),
        })?;

        let filename = utils::filename_for_asset(asset);
        let destination = updates_dir.join(&filename);

        // A previous run (or a sibling update) may already have materialized
        // this content under the same filename
        if utils::file_exists(&destination).await {
            let mut found = asset.clone();
            found.relative_path = Some(filename);
            return Ok(AssetFetch {
                asset: found,
                newly_downloaded: false,
            });
        }

        let bytes = self
            .request(url, config)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| Error::Asset {
                key: asset.key.clone(),
                message: format!("request failed: {}", e),
            })?
            .bytes()
            .await
            .map_err(|e| Error::Asset {
                key: asset.key.clone(),
                message: format!("failed to read response body: {}", e),
            })?;

        let actual_hash = utils::sha256_bytes(&bytes);
        if let Some(expected) = &asset.content_hash
            && expected != &actual_hash
        {
            return Err(Error::HashMismatch {
                key: asset.key.clone(),
                expected: expected.clone(),
                actual: actual_hash,
            });
        }

        tokio::fs::write(&destination, &bytes).await?;

        let mut downloaded = asset.clone();
        downloaded.content_hash = Some(actual_hash);
        downloaded.relative_path = Some(filename);
        downloaded.download_time = Some(Utc::now());

        Ok(AssetFetch {
            asset: downloaded,
            newly_downloaded: true,
        })
    }
}
