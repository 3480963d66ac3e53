//! Utility modules shared by the pipeline stages.
//!
//! - [`fs`] - directory creation, sorted listings, atomic JSON writes
//! - [`platform`] - tool lookup and path expansion
//! - [`progress`] - per-stage spinners

pub mod fs;
pub mod platform;
pub mod progress;

pub use fs::{atomic_write, ensure_dir, list_regular_files, remove_file_if_exists, write_json_file};
pub use platform::{find_tool, resolve_path};
pub use progress::StageSpinner;
