//! Update container naming and creation.
//!
//! The container format (MAR) is produced by an external packaging tool. This
//! module computes the container's name and drives the tool through the
//! [`ContainerBuilder`] trait, so tests and other platforms can substitute their
//! own builder.

use anyhow::Result;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::constants::{COMPLETE_SUFFIX, CONTAINER_EXTENSION, ENV_MAR};
use crate::core::UpdateError;
use crate::tool::ToolCommand;
use crate::utils::remove_file_if_exists;

/// File name of a complete update container: `<prefix>-complete.mar`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactName {
    prefix: String,
    file_name: String,
}

impl ArtifactName {
    /// Builds the complete-update name for `prefix`.
    ///
    /// # Errors
    ///
    /// [`UpdateError::InvalidArtifactName`] if the prefix is empty or contains a
    /// path separator.
    pub fn complete(prefix: &str) -> Result<Self> {
        let reason = if prefix.is_empty() {
            Some("prefix is empty")
        } else if prefix.contains(['/', '\\']) {
            Some("prefix contains a path separator")
        } else {
            None
        };
        if let Some(reason) = reason {
            return Err(UpdateError::InvalidArtifactName {
                prefix: prefix.to_string(),
                reason: reason.to_string(),
            }
            .into());
        }

        Ok(Self {
            prefix: prefix.to_string(),
            file_name: format!("{prefix}{COMPLETE_SUFFIX}.{CONTAINER_EXTENSION}"),
        })
    }

    /// The prefix the name was built from.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// The container file name.
    #[must_use]
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// The container path inside `dir`.
    #[must_use]
    pub fn path_in(&self, dir: &Path) -> PathBuf {
        dir.join(&self.file_name)
    }
}

/// Assembles an extracted install tree into an update container.
pub trait ContainerBuilder {
    /// Builds the container at `container` from the tree rooted at `source_dir`.
    fn build(&self, container: &Path, source_dir: &Path) -> impl Future<Output = Result<()>> + Send;
}

/// Runs the container build script as `<tool> <container> <source_dir>`.
///
/// The script calls the MAR tool itself, so the configured MAR path is exported
/// to it as `MAR`.
#[derive(Debug, Clone)]
pub struct ScriptContainerBuilder {
    tool: PathBuf,
    mar_tool: PathBuf,
    timeout: Option<Duration>,
}

impl ScriptContainerBuilder {
    /// Creates a builder invoking `tool` and exporting `mar_tool` as `MAR`.
    pub fn new(tool: impl Into<PathBuf>, mar_tool: impl Into<PathBuf>) -> Self {
        Self {
            tool: tool.into(),
            mar_tool: mar_tool.into(),
            timeout: None,
        }
    }

    /// Bounds how long the script may run. `None` waits indefinitely.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

impl ContainerBuilder for ScriptContainerBuilder {
    async fn build(&self, container: &Path, source_dir: &Path) -> Result<()> {
        remove_file_if_exists(container)?;

        ToolCommand::new(&self.tool)
            .arg(container)
            .arg(source_dir)
            .env(ENV_MAR, &self.mar_tool)
            .with_timeout(self.timeout)
            .with_context("build container")
            .execute_success()
            .await?;

        // A zero exit without the container is a tool defect, not a success.
        if !container.is_file() {
            return Err(UpdateError::ArtifactMissing {
                path: container.display().to_string(),
            }
            .into());
        }
        Ok(())
    }
}
