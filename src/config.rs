//! Configuration types for ota-loader

use serde::{Deserialize, Serialize};
use std::{collections::HashMap, path::PathBuf, time::Duration};
use url::Url;

/// Main configuration for a [`Loader`](crate::Loader) run
///
/// Everything a run needs that is not supplied by the manifest itself:
/// where the catalog lives, where assets are materialized, and how the
/// remote source talks to the update server.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UpdatesConfig {
    /// URL the remote source fetches manifests from (None for embedded-only setups)
    #[serde(default)]
    pub update_url: Option<Url>,

    /// Directory assets are materialized into (default: "./updates")
    #[serde(default = "default_updates_dir")]
    pub updates_dir: PathBuf,

    /// Path to the SQLite catalog (default: "./updates/catalog.db")
    #[serde(default = "default_catalog_path")]
    pub catalog_path: PathBuf,

    /// Runtime version advertised to the update server on manifest requests
    #[serde(default)]
    pub runtime_version: Option<String>,

    /// Extra headers sent with manifest and asset requests
    #[serde(default)]
    pub request_headers: HashMap<String, String>,

    /// Timeout for a single manifest or asset request (default: 30 seconds)
    ///
    /// This is the only cancellation the loader knows about; a timed-out
    /// request surfaces as an ordinary fetch failure.
    #[serde(default = "default_request_timeout", with = "duration_serde")]
    pub request_timeout: Duration,
}

impl Default for UpdatesConfig {
    fn default() -> Self {
        Self {
            update_url: None,
            updates_dir: default_updates_dir(),
            catalog_path: default_catalog_path(),
            runtime_version: None,
            request_headers: HashMap::new(),
            request_timeout: default_request_timeout(),
        }
    }
}

fn default_updates_dir() -> PathBuf {
    PathBuf::from("./updates")
}

fn default_catalog_path() -> PathBuf {
    PathBuf::from("./updates/catalog.db")
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

// Duration serialization helper (serializes as whole seconds)
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
