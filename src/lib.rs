//! fullupdate - complete update artifact builder
//!
//! Turns a freshly built product installer into a signed "complete" update
//! container (MAR) plus the JSON descriptor an update-discovery service serves
//! to clients.
//!
//! # Pipeline
//!
//! ```text
//! installer archive ──extract──▶ staging tree ──build──▶ <prefix>-complete.mar
//!                                                             │
//!                                  complete_info.json ◀─hash──┴──sign (in place)
//! ```
//!
//! Container building and signing are delegated to external tools
//! (`make_full_update.sh` and `mar`). Every run is a single, strictly
//! sequential pass; the first failure aborts it and nothing is cleaned up.
//!
//! # Modules
//!
//! ## Pipeline
//! - [`pipeline`] - Stage sequencing, [`pipeline::BuildRequest`] and [`pipeline::BuildReport`]
//! - [`layout`] - Workdir paths and installer discovery
//! - [`archive`] - Installer extraction (tar.gz, zip)
//! - [`container`] - Container naming and the build tool
//! - [`signing`] - Signing with `mar`
//! - [`metadata`] - SHA-512 metadata and the update descriptor
//!
//! ## Supporting Modules
//! - [`tool`] - External process runner with timeouts
//! - [`config`] - Tool paths, timeouts and installer policy
//! - [`core`] - Error types and user-facing error rendering
//! - [`cli`] - Command-line interface
//! - [`utils`] - Filesystem, platform and progress helpers
//!
//! # Filesystem Contract
//!
//! ```text
//! <workdir>/installation/<product>/archive/install/en-US/<installer>
//! <workdir>/mar/current-build/
//! <workdir>/update/<prefix>-complete.mar
//! <workdir>/update/complete_info.json
//! ```
//!
//! # Environment Variables
//!
//! - `MAR` - `mar` executable (also exported to the build tool)
//! - `FULLUPDATE_CONTAINER_TOOL` - Container build tool
//! - `FULLUPDATE_CONFIG` - Configuration file
//! - `FULLUPDATE_NO_PROGRESS` - Disable spinners
//! - `RUST_LOG` - Log filter

pub mod archive;
pub mod cli;
pub mod config;
pub mod constants;
pub mod container;
pub mod core;
pub mod layout;
pub mod metadata;
pub mod pipeline;
pub mod signing;
pub mod tool;
pub mod utils;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
