//! Atomic file write operations using temp-and-rename strategy.
//!
//! Readers of the update directory never observe a partially written descriptor:
//! the file either holds the previous content or the new content.

use crate::utils::fs::dirs::ensure_dir;
use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use std::fs;
use std::io::Write;
use std::path::Path;

/// Atomically writes bytes to a file using a write-then-rename strategy.
///
/// 1. Write content to a sibling temporary file (`.tmp` extension)
/// 2. Sync the temporary file to disk
/// 3. Rename the temporary file over the target path
///
/// Parent directories are created if they don't exist.
pub fn atomic_write(path: &Path, content: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }

    let temp_path = path.with_extension("tmp");

    {
        let mut file = fs::File::create(&temp_path).with_context(|| {
            format!(
                "Failed to create temp file: {}\n\nCheck file permissions and that directory exists",
                temp_path.display()
            )
        })?;

        file.write_all(content)
            .with_context(|| format!("Failed to write to temp file: {}", temp_path.display()))?;

        file.sync_all().with_context(|| "Failed to sync file to disk")?;
    }

    fs::rename(&temp_path, path)
        .with_context(|| format!("Failed to rename temp file to: {}", path.display()))?;

    Ok(())
}

/// Writes data as JSON indented with `indent` spaces, atomically.
///
/// No trailing newline is appended.
pub fn write_json_file<T>(path: &Path, data: &T, indent: usize) -> Result<()>
where
    T: Serialize,
{
    let indent = " ".repeat(indent);
    let mut buf = Vec::new();
    let mut serializer =
        serde_json::Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(indent.as_bytes()));
    data.serialize(&mut serializer)
        .with_context(|| format!("Failed to serialize JSON for: {}", path.display()))?;

    atomic_write(path, &buf).with_context(|| format!("Failed to write JSON file: {}", path.display()))
}
