//! Core types for fullupdate
//!
//! This module holds the error types shared by every pipeline stage:
//! - [`UpdateError`] - Enumerated failure modes of the build-and-sign pass
//! - [`ErrorContext`] - User-facing wrapper with details and suggestions
//! - [`StageFailure`] - Context naming the stage that aborted a run
//! - [`user_friendly_error`] - Convert any error into an [`ErrorContext`]
//!
//! # Error Handling Pattern
//!
//! ```rust,no_run
//! use fullupdate_cli::core::{UpdateError, user_friendly_error};
//! use anyhow::Result;
//!
//! fn locate() -> Result<()> {
//!     Err(UpdateError::InstallerNotFound { dir: "/w/installation".to_string() }.into())
//! }
//!
//! if let Err(e) = locate() {
//!     user_friendly_error(e).display();
//! }
//! ```

pub mod error;

pub use error::{ErrorContext, StageFailure, UpdateError, user_friendly_error};
