//! Error handling for fullupdate
//!
//! This module provides the error types and user-friendly error reporting for the
//! complete-update builder. The error system follows two principles:
//! 1. **Strongly-typed errors** so pipeline stages and tests can match on failure modes
//! 2. **User-friendly messages** with actionable suggestions for the release engineer
//!
//! # Architecture
//!
//! - [`UpdateError`] - Enumerated error types for every failure in the pipeline
//! - [`ErrorContext`] - Wrapper that adds details and suggestions for CLI display
//! - [`StageFailure`] - Context attached by the orchestrator naming the failed stage
//!
//! # Error Categories
//!
//! - **Configuration**: [`UpdateError::InvalidWorkdir`], [`UpdateError::InstallerNotFound`],
//!   [`UpdateError::MultipleInstallers`], [`UpdateError::InvalidArtifactName`],
//!   [`UpdateError::ConfigError`]
//! - **Extraction**: [`UpdateError::UnsupportedArchive`], [`UpdateError::ExtractionFailed`]
//! - **Subprocess**: [`UpdateError::ToolNotFound`], [`UpdateError::ToolFailed`],
//!   [`UpdateError::ToolTimedOut`]
//! - **Signing**: [`UpdateError::CertificateNotFound`], [`UpdateError::SigningFailed`]
//! - **I/O**: [`UpdateError::ArtifactMissing`]; raw I/O failures stay in `anyhow` with path context
//!
//! Nothing in the pipeline recovers from an error locally. Every error surfaces to the
//! invoking process, which prints it through [`user_friendly_error`] and exits nonzero.
//!
//! # Examples
//!
//! ```rust,no_run
//! use fullupdate_cli::core::{UpdateError, ErrorContext};
//!
//! let context = ErrorContext::new(UpdateError::ToolNotFound {
//!     tool: "mar".to_string(),
//! })
//! .with_suggestion("Set the MAR environment variable to the mar executable")
//! .with_details("Signing is delegated to the mar tool");
//!
//! context.display();
//! ```

use colored::Colorize;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

use crate::pipeline::Stage;

/// The main error type for fullupdate operations
///
/// Each variant names a specific failure mode and carries the paths or tool names
/// needed to diagnose it from a CI log alone.
#[derive(Error, Debug, Clone)]
pub enum UpdateError {
    /// The workdir root cannot be used as a filesystem root
    #[error("Invalid workdir: {path}")]
    InvalidWorkdir {
        /// The workdir that was rejected
        path: String,
        /// Why the workdir is unusable
        reason: String,
    },

    /// No installer archive was found under the product's archive directory
    ///
    /// The directory is either missing or holds no regular files.
    #[error("No installer found in {dir}")]
    InstallerNotFound {
        /// The directory that was searched
        dir: String,
    },

    /// More than one candidate installer archive was found
    #[error("Expected exactly one installer in {dir}, found {count}")]
    MultipleInstallers {
        /// The directory that was searched
        dir: String,
        /// Number of candidate files
        count: usize,
        /// File names of the candidates, sorted
        candidates: Vec<String>,
    },

    /// The artifact name prefix cannot produce a valid file name
    #[error("Invalid artifact name prefix '{prefix}': {reason}")]
    InvalidArtifactName {
        /// The rejected prefix
        prefix: String,
        /// Why it was rejected
        reason: String,
    },

    /// The installer archive has an extension no extractor handles
    #[error("Unsupported archive format: {path}")]
    UnsupportedArchive {
        /// Path of the archive
        path: String,
    },

    /// Archive decompression failed
    #[error("Failed to extract {archive}: {reason}")]
    ExtractionFailed {
        /// Path of the archive
        archive: String,
        /// Underlying failure
        reason: String,
    },

    /// An external tool could not be launched
    #[error("Tool '{tool}' is not installed or not found in PATH")]
    ToolNotFound {
        /// Name or path of the tool
        tool: String,
    },

    /// An external tool exited unsuccessfully
    ///
    /// `code` is `None` when the process was terminated by a signal.
    #[error("Tool '{tool}' failed with exit code {}", exit_code_label(.code))]
    ToolFailed {
        /// Name or path of the tool
        tool: String,
        /// Exit code, if the process exited normally
        code: Option<i32>,
        /// Captured standard error
        stderr: String,
    },

    /// An external tool exceeded its configured timeout and was killed
    #[error("Tool '{tool}' timed out after {timeout:?}")]
    ToolTimedOut {
        /// Name or path of the tool
        tool: String,
        /// The timeout that elapsed
        timeout: Duration,
    },

    /// The certificate database path does not exist
    #[error("Certificate database not found: {path}")]
    CertificateNotFound {
        /// Path of the certificate database directory
        path: String,
    },

    /// The signing tool ran but the signed container could not be produced
    #[error("Failed to sign {artifact}: {reason}")]
    SigningFailed {
        /// Container that was being signed
        artifact: String,
        /// Underlying failure
        reason: String,
    },

    /// An artifact expected from an earlier stage is absent
    #[error("Artifact not found: {path}")]
    ArtifactMissing {
        /// The missing path
        path: String,
    },

    /// Configuration file or value error
    #[error("Configuration error: {message}")]
    ConfigError {
        /// Description of the configuration error
        message: String,
    },

    /// Other error
    #[error("{message}")]
    Other {
        /// Generic error message
        message: String,
    },
}

fn exit_code_label(code: &Option<i32>) -> String {
    code.map_or_else(|| "none".to_string(), |c| c.to_string())
}

/// Context attached to an error by the orchestrator.
///
/// Identifies the stage that failed and the last stage that completed, so a
/// failed release build can be diagnosed without rerunning it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageFailure {
    /// The stage whose step returned an error
    pub stage: Stage,
    /// The last stage that finished successfully, if any
    pub last_completed: Option<Stage>,
}

impl fmt::Display for StageFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.last_completed {
            Some(last) => {
                write!(f, "Stage '{}' failed (last completed stage: '{last}')", self.stage)
            }
            None => write!(f, "Stage '{}' failed (no stage completed)", self.stage),
        }
    }
}

/// Error context wrapper that provides user-friendly error information
///
/// When displayed, errors show the error in red, optional details in yellow,
/// and an optional suggestion in green.
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying error
    pub error: UpdateError,
    /// Optional suggestion for resolving the error
    pub suggestion: Option<String>,
    /// Optional additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    /// Create a new error context with no suggestion or details.
    #[must_use]
    pub const fn new(error: UpdateError) -> Self {
        Self {
            error,
            suggestion: None,
            details: None,
        }
    }

    /// Add a suggestion for resolving the error
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Add additional details explaining the error
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Display the error context to stderr with terminal colors
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.error);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Convert any error to a user-friendly [`ErrorContext`] with actionable suggestions
///
/// Errors wrapped in `anyhow` context or a [`StageFailure`] are still recognized,
/// since both the context layers and the cause chain are searched. The failed stage, when
/// present, is reported in the details.
#[must_use]
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    let stage = error.downcast_ref::<StageFailure>().copied();

    let update_error = error
        .downcast_ref::<UpdateError>()
        .or_else(|| error.chain().find_map(|cause| cause.downcast_ref::<UpdateError>()));

    let mut ctx = if let Some(update_error) = update_error {
        create_error_context(update_error)
    } else if let Some(io_error) = error.chain().find_map(|cause| cause.downcast_ref::<std::io::Error>())
    {
        io_error_context(io_error, &error)
    } else {
        ErrorContext::new(UpdateError::Other {
            message: chain_message(&error),
        })
    };

    if let Some(stage) = stage {
        ctx.details = Some(match ctx.details.take() {
            Some(details) => format!("{stage}. {details}"),
            None => stage.to_string(),
        });
    }

    ctx
}

fn io_error_context(io_error: &std::io::Error, error: &anyhow::Error) -> ErrorContext {
    let base = ErrorContext::new(UpdateError::Other {
        message: chain_message(error),
    });
    match io_error.kind() {
        std::io::ErrorKind::PermissionDenied => base
            .with_suggestion("Check ownership and permissions of the workdir and its subdirectories")
            .with_details("The builder could not read or write a file it needs"),
        std::io::ErrorKind::NotFound => base
            .with_suggestion("Check that the file or directory exists and the path is correct"),
        std::io::ErrorKind::StorageFull => base
            .with_suggestion("Free disk space on the build volume and rerun the build")
            .with_details("The build volume ran out of space while writing artifacts"),
        _ => base,
    }
}

/// Render the error and its causes as one message.
fn chain_message(error: &anyhow::Error) -> String {
    let mut message = error.to_string();
    let chain: Vec<String> = error.chain().skip(1).map(std::string::ToString::to_string).collect();

    if !chain.is_empty() {
        message.push_str("\n\nCaused by:");
        for (i, cause) in chain.iter().enumerate() {
            message.push_str(&format!("\n  {}: {}", i + 1, cause));
        }
    }
    message
}

/// Map each [`UpdateError`] variant to an [`ErrorContext`] with tailored suggestions.
fn create_error_context(error: &UpdateError) -> ErrorContext {
    let ctx = ErrorContext::new(error.clone());
    match error {
        UpdateError::InvalidWorkdir { reason, .. } => ctx
            .with_suggestion("Pass a workdir that is a directory (or does not exist yet) and is writable")
            .with_details(reason.clone()),

        UpdateError::InstallerNotFound { dir } => ctx
            .with_suggestion(format!(
                "Check that the product name is correct and that the install archive was built into {dir}"
            ))
            .with_details("The installer is looked up at <workdir>/installation/<product>/archive/install/en-US/"),

        UpdateError::MultipleInstallers { candidates, .. } => ctx
            .with_suggestion("Remove stale archives from the directory, or set installer_selection = \"lexicographic-first\" in the config")
            .with_details(format!("Candidates: {}", candidates.join(", "))),

        UpdateError::UnsupportedArchive { .. } => ctx
            .with_suggestion("Provide the installer as a .tar.gz, .tgz or .zip archive"),

        UpdateError::ToolNotFound { tool } => ctx
            .with_suggestion(format!(
                "Install '{tool}' or point the builder at it (MAR / FULLUPDATE_CONTAINER_TOOL environment variables or the config file)"
            ))
            .with_details("Container creation and signing are delegated to external tools"),

        UpdateError::ToolFailed { stderr, .. } => {
            let ctx = ctx.with_suggestion("Run the tool manually with the same arguments to inspect its output");
            if stderr.trim().is_empty() {
                ctx
            } else {
                ctx.with_details(stderr.trim().to_string())
            }
        }

        UpdateError::ToolTimedOut { .. } => ctx
            .with_suggestion("Increase the timeout with --build-timeout / --sign-timeout or in the config file, or pass 0 to disable it")
            .with_details("The tool and the processes it started were killed when the timeout elapsed"),

        UpdateError::CertificateNotFound { .. } => ctx
            .with_suggestion("Pass the directory that contains the NSS certificate database used for signing"),

        UpdateError::SigningFailed { .. } => ctx
            .with_suggestion("Verify the certificate name exists in the certificate database and the mar tool supports signing"),

        UpdateError::ArtifactMissing { .. } => ctx
            .with_details("An earlier stage reported success but did not leave its artifact on disk"),

        UpdateError::ConfigError { .. } => ctx
            .with_suggestion("Check the TOML syntax and keys of the configuration file"),

        _ => ctx,
    }
}
