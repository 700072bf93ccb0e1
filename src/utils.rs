//! Utility functions for asset hashing and filename derivation

use crate::error::Result;
use crate::types::AssetRecord;
use sha2::{Digest, Sha256};
use std::path::Path;
use tokio::io::AsyncReadExt;

/// Read buffer size for streaming file hashes
const HASH_BUF_SIZE: usize = 64 * 1024;

/// Compute the lowercase hex SHA-256 of a file's contents
///
/// Streams the file in chunks rather than reading it whole; update bundles
/// routinely carry multi-megabyte assets.
pub async fn sha256_file(path: &Path) -> Result<String> {
    let mut file = tokio::fs::File::open(path).await?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; HASH_BUF_SIZE];

    loop {
        let n = file.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }

    Ok(bytes_to_hex(&hasher.finalize()))
}

/// Compute the lowercase hex SHA-256 of a byte slice
pub fn sha256_bytes(bytes: &[u8]) -> String {
    bytes_to_hex(&Sha256::digest(bytes))
}

/// Lowercase hex encoding
pub(crate) fn bytes_to_hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        use std::fmt::Write;
        // writing to a String cannot fail
        let _ = write!(out, "{:02x}", b);
    }
    out
}

/// Derive the on-disk filename for an asset
///
/// Prefers the content hash so renamed-but-identical assets collapse to one
/// file; falls back to a sanitized form of the key. The key's extension is
/// preserved either way so downstream consumers can sniff file types.
pub fn filename_for_asset(asset: &AssetRecord) -> String {
    let extension = Path::new(asset.key.as_str())
        .extension()
        .and_then(|e| e.to_str());

    match &asset.content_hash {
        Some(hash) => match extension {
            Some(ext) => format!("{}.{}", hash, ext),
            None => hash.clone(),
        },
        None => sanitize_filename(asset.key.as_str()),
    }
}

/// Replace path separators and other hostile characters in a key
fn sanitize_filename(key: &str) -> String {
    key.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Whether a file exists at `path`
///
/// Permission errors read as absent, matching `Path::exists` semantics.
pub(crate) async fn file_exists(path: &Path) -> bool {
    tokio::fs::try_exists(path).await.unwrap_or(false)
}
