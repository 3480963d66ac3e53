//! Artifact metadata and the update descriptor.
//!
//! The descriptor tells the update-discovery service where to download the
//! complete update and how to verify it:
//!
//! ```json
//! {
//!     "complete": {
//!         "hash": "<sha512 hex>",
//!         "hash_function": "sha512",
//!         "size": 1234,
//!         "url": "https://example.org/updates/app-complete.mar"
//!     }
//! }
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha512};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use crate::constants::{DESCRIPTOR_FILE, HASH_BUFFER_SIZE, HASH_FUNCTION};
use crate::core::UpdateError;
use crate::utils::write_json_file;

/// Size, checksum and download location of one update artifact.
///
/// Field order is the serialized order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactMetadata {
    /// Lowercase hex digest of the whole file
    pub hash: String,
    /// Always `sha512`
    pub hash_function: String,
    /// File size in bytes
    pub size: u64,
    /// Base URL joined with the artifact's file name
    pub url: String,
}

impl ArtifactMetadata {
    /// Computes metadata for the artifact at `path`.
    ///
    /// The file is hashed on the blocking pool. Fails with
    /// [`UpdateError::ArtifactMissing`] if `path` does not exist.
    pub async fn from_artifact(path: &Path, base_url: &str) -> Result<Self> {
        let owned = path.to_path_buf();
        let base_url = base_url.to_string();
        tokio::task::spawn_blocking(move || Self::from_artifact_blocking(&owned, &base_url))
            .await
            .context("Hashing task panicked")?
    }

    /// Synchronous form of [`ArtifactMetadata::from_artifact`].
    pub fn from_artifact_blocking(path: &Path, base_url: &str) -> Result<Self> {
        if !path.is_file() {
            return Err(UpdateError::ArtifactMissing {
                path: path.display().to_string(),
            }
            .into());
        }

        let size = std::fs::metadata(path)
            .with_context(|| format!("Cannot stat artifact: {}", path.display()))?
            .len();
        let hash = sha512_hex(path)?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| UpdateError::ArtifactMissing {
                path: path.display().to_string(),
            })?;

        Ok(Self {
            hash,
            hash_function: HASH_FUNCTION.to_string(),
            size,
            url: join_url(base_url, file_name),
        })
    }
}

/// Streams `path` through SHA-512 and returns the lowercase hex digest.
pub fn sha512_hex(path: &Path) -> Result<String> {
    let mut file = File::open(path)
        .with_context(|| format!("Cannot read file for checksum calculation: {}", path.display()))?;
    let mut hasher = Sha512::new();
    let mut buf = vec![0u8; HASH_BUFFER_SIZE];
    loop {
        let n = file
            .read(&mut buf)
            .with_context(|| format!("Read failed while hashing: {}", path.display()))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// Joins `base` and `file_name` with exactly one `/`.
pub fn join_url(base: &str, file_name: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), file_name.trim_start_matches('/'))
}

/// The `complete_info.json` document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateDescriptor {
    /// Metadata of the complete (full) update container
    pub complete: ArtifactMetadata,
}

impl UpdateDescriptor {
    /// Wraps metadata for a complete update.
    pub const fn complete(metadata: ArtifactMetadata) -> Self {
        Self {
            complete: metadata,
        }
    }

    /// Writes the descriptor into `update_dir`, replacing any previous one.
    ///
    /// Returns the descriptor path.
    pub fn write_to(&self, update_dir: &Path) -> Result<PathBuf> {
        let path = update_dir.join(DESCRIPTOR_FILE);
        write_json_file(&path, self, 4)?;
        tracing::debug!(target: "pipeline", "Wrote descriptor {}", path.display());
        Ok(path)
    }
}
