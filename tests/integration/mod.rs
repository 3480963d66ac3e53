//! Integration test suite for fullupdate
//!
//! End-to-end tests that run the `fullupdate` binary and the library pipeline
//! against a temporary workdir, with shell-script stand-ins for
//! `make_full_update.sh` and `mar`.
//!
//! # Running Integration Tests
//!
//! ```bash
//! cargo test --test integration
//! ```
//!
//! # Test Organization
//!
//! - **common**: Fake tool scripts and command setup
//! - **cli**: Binary invocation, exit codes and output files
//! - **pipeline**: Library pipeline with the production collaborators

#![cfg(unix)]

mod cli;
mod common;
mod pipeline;
