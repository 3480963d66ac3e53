//! File system utilities for the build pipeline.
//!
//! - [`dirs`] - directory creation and listing, stale file removal
//! - [`atomic`] - write-then-rename file writes
//!
//! All helpers return `anyhow::Result` with the offending path in the context, so
//! an I/O failure deep in a stage still names the file in the final error.

pub mod atomic;
pub mod dirs;

pub use atomic::{atomic_write, write_json_file};
pub use dirs::{ensure_dir, list_regular_files, remove_file_if_exists};
