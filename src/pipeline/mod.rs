//! The build-and-sign pipeline.
//!
//! One run takes a product's installer archive and produces a signed complete
//! update container plus its descriptor. Stages run strictly in order:
//!
//! 1. [`Stage::ResolvePaths`] derives the [`WorkdirLayout`] and creates its directories
//! 2. [`Stage::LocateInstaller`] finds the installer archive
//! 3. [`Stage::Extract`] unpacks it into the staging directory
//! 4. [`Stage::BuildContainer`] packs the extracted tree into `<prefix>-complete.mar`
//! 5. [`Stage::Sign`] signs the container in place
//! 6. [`Stage::EmitMetadata`] hashes the signed container and writes `complete_info.json`
//!
//! The first failure aborts the run. Nothing is retried and nothing is cleaned up;
//! the returned error carries a [`StageFailure`] naming the failed stage and the
//! last one that completed.

use anyhow::{Context, Result};
use std::fmt;
use std::future::Future;
use std::path::PathBuf;

use crate::archive::ArchiveExtractor;
use crate::container::{ArtifactName, ContainerBuilder};
use crate::core::StageFailure;
use crate::layout::{InstallerSelection, WorkdirLayout};
use crate::metadata::{ArtifactMetadata, UpdateDescriptor};
use crate::signing::{CertificateReference, Signer};
use crate::utils::StageSpinner;

/// A pipeline stage, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    ResolvePaths,
    LocateInstaller,
    Extract,
    BuildContainer,
    Sign,
    EmitMetadata,
}

impl Stage {
    /// Every stage in execution order.
    pub const ALL: [Self; 6] = [
        Self::ResolvePaths,
        Self::LocateInstaller,
        Self::Extract,
        Self::BuildContainer,
        Self::Sign,
        Self::EmitMetadata,
    ];

    /// Stable kebab-case identifier.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ResolvePaths => "resolve-paths",
            Self::LocateInstaller => "locate-installer",
            Self::Extract => "extract",
            Self::BuildContainer => "build-container",
            Self::Sign => "sign",
            Self::EmitMetadata => "emit-metadata",
        }
    }

    /// Spinner message shown while the stage runs.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::ResolvePaths => "Preparing workdir",
            Self::LocateInstaller => "Locating installer",
            Self::Extract => "Extracting installer",
            Self::BuildContainer => "Building update container",
            Self::Sign => "Signing update container",
            Self::EmitMetadata => "Writing update metadata",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inputs of one run. All fields are required.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildRequest {
    /// Product whose installer is packaged
    pub product: String,
    /// Workdir root; relative paths are made absolute before use
    pub workdir: PathBuf,
    /// Container file name prefix
    pub prefix: String,
    /// Signing key
    pub certificate: CertificateReference,
    /// URL the container will be published under
    pub base_url: String,
}

/// Outcome of a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildReport {
    /// The signed container
    pub container: PathBuf,
    /// The written `complete_info.json`
    pub descriptor: PathBuf,
    /// Metadata recorded in the descriptor
    pub metadata: ArtifactMetadata,
    /// Completed stages in order
    pub completed: Vec<Stage>,
}

/// Orchestrates extraction, container build, signing and metadata emission.
pub struct FullUpdatePipeline<E, B, S> {
    extractor: E,
    builder: B,
    signer: S,
    selection: InstallerSelection,
    progress: bool,
}

impl<E, B, S> FullUpdatePipeline<E, B, S>
where
    E: ArchiveExtractor,
    B: ContainerBuilder,
    S: Signer,
{
    /// Creates a pipeline with the default installer policy and no spinners.
    pub fn new(extractor: E, builder: B, signer: S) -> Self {
        Self {
            extractor,
            builder,
            signer,
            selection: InstallerSelection::default(),
            progress: false,
        }
    }

    /// Sets the installer selection policy.
    #[must_use]
    pub const fn with_selection(mut self, selection: InstallerSelection) -> Self {
        self.selection = selection;
        self
    }

    /// Shows a spinner per stage.
    #[must_use]
    pub const fn with_progress(mut self, progress: bool) -> Self {
        self.progress = progress;
        self
    }

    /// Runs every stage once.
    ///
    /// # Errors
    ///
    /// Returns the first stage error with a [`StageFailure`] context attached.
    pub async fn run(&self, request: &BuildRequest) -> Result<BuildReport> {
        let mut tracker = StageTracker::new(self.progress);
        tracing::info!(
            target: "pipeline",
            "Building complete update for '{}' in {}",
            request.product,
            request.workdir.display()
        );

        let (layout, name) = tracker
            .run(Stage::ResolvePaths, async {
                let name = ArtifactName::complete(&request.prefix)?;
                let root = std::path::absolute(&request.workdir).with_context(|| {
                    format!("Cannot resolve workdir {}", request.workdir.display())
                })?;
                let layout = WorkdirLayout::new(root);
                layout.ensure_dirs()?;
                Ok::<_, anyhow::Error>((layout, name))
            })
            .await?;

        let installer = tracker
            .run(Stage::LocateInstaller, async {
                layout.locate_installer(&request.product, self.selection)
            })
            .await?;
        tracing::info!(target: "pipeline", "Installer: {}", installer.display());

        let extracted = tracker
            .run(Stage::Extract, self.extractor.extract(&installer, layout.staging_dir()))
            .await?;
        tracing::debug!(target: "pipeline", "Extracted tree: {}", extracted.display());

        let container = name.path_in(layout.update_dir());
        tracker
            .run(Stage::BuildContainer, self.builder.build(&container, &extracted))
            .await?;

        tracker
            .run(
                Stage::Sign,
                self.signer.sign(
                    layout.update_dir(),
                    &request.certificate,
                    &container,
                    name.prefix(),
                ),
            )
            .await?;

        let (metadata, descriptor) = tracker
            .run(Stage::EmitMetadata, async {
                let metadata = ArtifactMetadata::from_artifact(&container, &request.base_url).await?;
                let descriptor =
                    UpdateDescriptor::complete(metadata.clone()).write_to(layout.update_dir())?;
                Ok::<_, anyhow::Error>((metadata, descriptor))
            })
            .await?;

        tracing::info!(
            target: "pipeline",
            "Complete update ready: {} ({} bytes)",
            container.display(),
            metadata.size
        );

        Ok(BuildReport {
            container,
            descriptor,
            metadata,
            completed: tracker.completed,
        })
    }
}

struct StageTracker {
    completed: Vec<Stage>,
    progress: bool,
}

impl StageTracker {
    const fn new(progress: bool) -> Self {
        Self {
            completed: Vec::new(),
            progress,
        }
    }

    async fn run<T>(&mut self, stage: Stage, step: impl Future<Output = Result<T>>) -> Result<T> {
        let spinner = StageSpinner::start(self.progress, stage.description());
        tracing::debug!(target: "pipeline", "Stage '{stage}' started");

        match step.await {
            Ok(value) => {
                // Headless runs (CI, --no-progress) still get one line per stage.
                if spinner.is_hidden() {
                    tracing::info!(target: "pipeline", "Stage '{stage}' completed");
                }
                spinner.finish_with_message(format!("✓ {}", stage.description()));
                self.completed.push(stage);
                Ok(value)
            }
            Err(err) => {
                spinner.finish_and_clear();
                let failure = StageFailure {
                    stage,
                    last_completed: self.completed.last().copied(),
                };
                tracing::error!(target: "pipeline", "{failure}: {err:#}");
                Err(err.context(failure))
            }
        }
    }
}
