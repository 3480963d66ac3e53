//! External tool invocation.
//!
//! The container build script and the `mar` signing tool run as child processes
//! through [`ToolCommand`], which owns spawning, bounded waiting, output capture
//! and error mapping for both.

pub mod command_builder;

pub use command_builder::{ToolCommand, ToolOutput};
