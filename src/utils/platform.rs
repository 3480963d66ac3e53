//! Platform helpers for locating external tools and expanding configured paths.

use anyhow::{Context, Result};
use std::path::PathBuf;

/// Expands `~` and `$VAR` references in a configured path.
///
/// # Examples
///
/// ```rust,no_run
/// use fullupdate_cli::utils::platform::resolve_path;
///
/// # fn example() -> anyhow::Result<()> {
/// let tool = resolve_path("~/tools/make_full_update.sh")?;
/// let mar = resolve_path("$MOZ_TOOLS/mar")?;
/// # Ok(())
/// # }
/// ```
pub fn resolve_path(path: &str) -> Result<PathBuf> {
    let expanded = shellexpand::full(path)
        .with_context(|| format!("Failed to expand path: {path}"))?;
    Ok(PathBuf::from(expanded.as_ref()))
}

/// Resolves a tool name or path to an executable location.
///
/// Names without a path separator are looked up on `PATH`; anything else is
/// checked in place. Returns `None` when nothing executable is found.
#[must_use]
pub fn find_tool(tool: &str) -> Option<PathBuf> {
    which::which(tool).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_path_plain() {
        let path = resolve_path("/opt/tools/mar").unwrap();
        assert_eq!(path, PathBuf::from("/opt/tools/mar"));
    }

    #[test]
    fn test_resolve_path_unknown_var_fails() {
        let result = resolve_path("$FULLUPDATE_SURELY_UNSET_VARIABLE/mar");
        assert!(result.is_err());
    }

    #[test]
    fn test_find_tool_missing() {
        assert!(find_tool("fullupdate-no-such-tool-anywhere").is_none());
    }

    #[cfg(unix)]
    #[test]
    fn test_find_tool_sh() {
        assert!(find_tool("sh").is_some_and(|p| p.is_absolute()));
    }
}
