//! Installer archive extraction.
//!
//! The installer produced by the product build is a compressed archive. The
//! [`ArchiveExtractor`] trait decompresses it into the staging directory and returns
//! the root of the extracted install tree. [`NativeExtractor`] handles the formats
//! the product ships:
//!
//! | Extension        | Format           |
//! |------------------|------------------|
//! | `.tar.gz`, `.tgz` | gzip-compressed tar |
//! | `.zip`           | zip              |
//!
//! When every entry of the archive lives under one top-level directory, the
//! returned path is that directory rather than the staging directory itself.
//! Entries that would escape the destination (`..`, absolute paths) are refused.

use anyhow::{Context, Result};
use std::collections::BTreeSet;
use std::fs::File;
use std::future::Future;
use std::path::{Component, Path, PathBuf};

use crate::core::UpdateError;
use crate::utils::fs::ensure_dir;

/// Decompresses an installer archive into a destination directory.
pub trait ArchiveExtractor {
    /// Extracts `archive` into `dest` and returns the extracted tree's root.
    fn extract(&self, archive: &Path, dest: &Path) -> impl Future<Output = Result<PathBuf>> + Send;
}

/// Supported archive formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    /// gzip-compressed tar
    TarGz,
    /// zip
    Zip,
}

impl ArchiveFormat {
    /// Detects the format from the file name.
    pub fn detect(path: &Path) -> Result<Self> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();

        if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
            Ok(Self::TarGz)
        } else if name.ends_with(".zip") {
            Ok(Self::Zip)
        } else {
            Err(UpdateError::UnsupportedArchive {
                path: path.display().to_string(),
            }
            .into())
        }
    }
}

/// In-process extractor for tar.gz and zip installers.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeExtractor;

impl ArchiveExtractor for NativeExtractor {
    async fn extract(&self, archive: &Path, dest: &Path) -> Result<PathBuf> {
        let archive = archive.to_path_buf();
        let dest = dest.to_path_buf();
        tokio::task::spawn_blocking(move || extract_blocking(&archive, &dest))
            .await
            .context("Extraction task panicked")?
    }
}

/// Synchronous extraction used by [`NativeExtractor`].
pub fn extract_blocking(archive: &Path, dest: &Path) -> Result<PathBuf> {
    let format = ArchiveFormat::detect(archive)?;
    ensure_dir(dest)?;

    tracing::info!(
        target: "archive",
        "Extracting {} into {}",
        archive.display(),
        dest.display()
    );

    let top_level = match format {
        ArchiveFormat::TarGz => unpack_tar_gz(archive, dest),
        ArchiveFormat::Zip => unpack_zip(archive, dest),
    }
    .map_err(|e| UpdateError::ExtractionFailed {
        archive: archive.display().to_string(),
        reason: format!("{e:#}"),
    })?;

    let root = single_root(&top_level, dest).unwrap_or_else(|| dest.to_path_buf());

    if format == ArchiveFormat::Zip {
        replace_whitespace_in_children(&root)?;
    }

    tracing::debug!(target: "archive", "Extracted tree root: {}", root.display());
    Ok(root)
}

/// Unpacks a tar.gz, returning the set of top-level entry names.
fn unpack_tar_gz(archive: &Path, dest: &Path) -> Result<BTreeSet<String>> {
    let file = File::open(archive).with_context(|| format!("Failed to open {}", archive.display()))?;
    let mut tar = tar::Archive::new(flate2::read::GzDecoder::new(file));
    tar.set_preserve_permissions(true);

    let mut top_level = BTreeSet::new();
    for entry in tar.entries().context("Failed to read tar entries")? {
        let mut entry = entry.context("Failed to read tar entry")?;
        let path = entry.path().context("Invalid tar entry path")?.into_owned();
        if let Some(first) = first_component(&path) {
            top_level.insert(first);
        }
        // unpack_in refuses entries that would land outside dest
        if !entry
            .unpack_in(dest)
            .with_context(|| format!("Failed to unpack {}", path.display()))?
        {
            anyhow::bail!("Archive entry escapes destination: {}", path.display());
        }
    }
    Ok(top_level)
}

/// Unpacks a zip, returning the set of top-level entry names.
fn unpack_zip(archive: &Path, dest: &Path) -> Result<BTreeSet<String>> {
    let file = File::open(archive).with_context(|| format!("Failed to open {}", archive.display()))?;
    let mut zip = zip::ZipArchive::new(file).context("Failed to read zip archive")?;

    let mut top_level = BTreeSet::new();
    for i in 0..zip.len() {
        let entry = zip.by_index(i).context("Failed to read zip entry")?;
        let Some(path) = entry.enclosed_name() else {
            anyhow::bail!("Archive entry escapes destination: {}", entry.name());
        };
        if let Some(first) = first_component(&path) {
            top_level.insert(first);
        }
    }

    zip.extract(dest).context("Failed to extract zip archive")?;
    Ok(top_level)
}

fn first_component(path: &Path) -> Option<String> {
    path.components().find_map(|c| match c {
        Component::Normal(name) => Some(name.to_string_lossy().to_string()),
        _ => None,
    })
}

/// The lone top-level directory, if the archive had exactly one.
fn single_root(top_level: &BTreeSet<String>, dest: &Path) -> Option<PathBuf> {
    if top_level.len() != 1 {
        return None;
    }
    let candidate = dest.join(top_level.iter().next()?);
    candidate.is_dir().then_some(candidate)
}

/// Windows installers unpack to directory names containing spaces, which the
/// container build script cannot handle. Rename them with underscores.
fn replace_whitespace_in_children(root: &Path) -> Result<()> {
    for entry in std::fs::read_dir(root).with_context(|| format!("Failed to read {}", root.display()))? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().to_string();
        if name.contains(' ') {
            let renamed = root.join(name.replace(' ', "_"));
            tracing::debug!(target: "archive", "Replacing whitespace in {}", name);
            // Left over from a previous run into the same staging directory
            if renamed.is_dir() {
                std::fs::remove_dir_all(&renamed)
                    .with_context(|| format!("Failed to remove stale {}", renamed.display()))?;
            } else if renamed.exists() {
                std::fs::remove_file(&renamed)
                    .with_context(|| format!("Failed to remove stale {}", renamed.display()))?;
            }
            std::fs::rename(entry.path(), &renamed)
                .with_context(|| format!("Failed to rename {} to {}", name, renamed.display()))?;
        }
    }
    Ok(())
}
