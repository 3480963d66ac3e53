//! Workdir layout and installer discovery.
//!
//! Every path the pipeline touches derives from one workdir root:
//!
//! ```text
//! <workdir>/
//! ├── installation/<product>/archive/install/en-US/<installer>   input archive
//! ├── mar/current-build/                                          staging tree
//! └── update/                                                     container + descriptor
//!     ├── <prefix>-complete.mar
//!     └── complete_info.json
//! ```
//!
//! [`WorkdirLayout`] only creates directories; it never cleans them up.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::constants::{CURRENT_BUILD_DIR, INSTALLATION_DIR, INSTALLER_SUBPATH, MAR_DIR, UPDATE_DIR};
use crate::core::UpdateError;
use crate::utils::fs::{ensure_dir, list_regular_files};

/// How to pick the installer when the archive directory holds several files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InstallerSelection {
    /// Fail unless exactly one file is present.
    #[default]
    ExactlyOne,
    /// Take the first file by byte-wise file-name order.
    LexicographicFirst,
}

/// Paths derived from a single workdir root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkdirLayout {
    root: PathBuf,
    staging: PathBuf,
    update: PathBuf,
}

impl WorkdirLayout {
    /// Derives the layout for `root`. Nothing is touched on disk.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            staging: root.join(MAR_DIR).join(CURRENT_BUILD_DIR),
            update: root.join(UPDATE_DIR),
            root,
        }
    }

    /// The workdir root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Scratch directory receiving the extracted install tree.
    #[must_use]
    pub fn staging_dir(&self) -> &Path {
        &self.staging
    }

    /// Directory receiving the container and its descriptor.
    #[must_use]
    pub fn update_dir(&self) -> &Path {
        &self.update
    }

    /// `<root>/installation/<product>/archive/install/en-US`
    #[must_use]
    pub fn installer_dir(&self, product: &str) -> PathBuf {
        INSTALLER_SUBPATH
            .iter()
            .fold(self.root.join(INSTALLATION_DIR).join(product), |path, segment| path.join(segment))
    }

    /// Creates the workdir, staging and update directories if absent.
    ///
    /// Idempotent. Filesystem errors (permission denied, a file in the way) are
    /// returned as-is; nothing is retried.
    pub fn ensure_dirs(&self) -> Result<()> {
        if self.root.exists() && !self.root.is_dir() {
            return Err(UpdateError::InvalidWorkdir {
                path: self.root.display().to_string(),
                reason: "path exists and is not a directory".to_string(),
            }
            .into());
        }

        ensure_dir(&self.staging)
            .with_context(|| format!("Failed to create staging directory {}", self.staging.display()))?;
        ensure_dir(&self.update)
            .with_context(|| format!("Failed to create update directory {}", self.update.display()))?;

        tracing::debug!(
            target: "layout",
            "Workdir ready: staging={}, update={}",
            self.staging.display(),
            self.update.display()
        );
        Ok(())
    }

    /// Finds the product's installer archive.
    ///
    /// # Errors
    ///
    /// - [`UpdateError::InstallerNotFound`] if the directory is missing or holds no files
    /// - [`UpdateError::MultipleInstallers`] if several files are present and the policy
    ///   is [`InstallerSelection::ExactlyOne`]
    pub fn locate_installer(&self, product: &str, selection: InstallerSelection) -> Result<PathBuf> {
        let dir = self.installer_dir(product);
        let mut files = list_regular_files(&dir)?;

        match (files.len(), selection) {
            (0, _) => Err(UpdateError::InstallerNotFound {
                dir: dir.display().to_string(),
            }
            .into()),
            (1, _) => Ok(files.remove(0)),
            (count, InstallerSelection::ExactlyOne) => Err(UpdateError::MultipleInstallers {
                dir: dir.display().to_string(),
                count,
                candidates: files
                    .iter()
                    .filter_map(|p| p.file_name())
                    .map(|n| n.to_string_lossy().to_string())
                    .collect(),
            }
            .into()),
            (count, InstallerSelection::LexicographicFirst) => {
                let chosen = files.remove(0);
                tracing::warn!(
                    target: "layout",
                    "{} installers found in {}, using {}",
                    count,
                    dir.display(),
                    chosen.display()
                );
                Ok(chosen)
            }
        }
    }
}
