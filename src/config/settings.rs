use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{MAIN_SEPARATOR, Path, PathBuf};
use std::time::Duration;

use crate::constants::{
    DEFAULT_BUILD_TIMEOUT, DEFAULT_CONTAINER_TOOL, DEFAULT_MAR_TOOL, DEFAULT_SIGN_TIMEOUT,
    ENV_CONTAINER_TOOL, ENV_MAR,
};
use crate::core::UpdateError;
use crate::layout::InstallerSelection;
use crate::utils::{find_tool, resolve_path};

/// One configuration layer. Unset fields defer to lower layers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BuilderConfig {
    /// Container build tool (name on `PATH` or path)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub container_tool: Option<String>,

    /// `mar` tool (name on `PATH` or path)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mar_tool: Option<String>,

    /// Container build timeout in seconds; `0` disables it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build_timeout_secs: Option<u64>,

    /// Signing timeout in seconds; `0` disables it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sign_timeout_secs: Option<u64>,

    /// Installer selection policy
    #[serde(skip_serializing_if = "Option::is_none")]
    pub installer_selection: Option<InstallerSelection>,
}

/// Fully resolved settings handed to the pipeline's collaborators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedConfig {
    pub container_tool: PathBuf,
    pub mar_tool: PathBuf,
    pub build_timeout: Option<Duration>,
    pub sign_timeout: Option<Duration>,
    pub installer_selection: InstallerSelection,
}

impl BuilderConfig {
    /// Loads the file layer from `path`, or an empty layer when `path` is `None`.
    ///
    /// A path that was given explicitly must exist.
    pub async fn load_with_optional(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from(path).await,
            None => Ok(Self::default()),
        }
    }

    /// Loads a TOML configuration file.
    ///
    /// # Errors
    ///
    /// [`UpdateError::ConfigError`] if the file cannot be read or parsed.
    pub async fn load_from(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path).await.map_err(|e| UpdateError::ConfigError {
            message: format!("cannot read {}: {e}", path.display()),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| UpdateError::ConfigError {
            message: format!("cannot parse {}: {e}", path.display()),
        })?;
        tracing::debug!(target: "config", "Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// The environment layer, read through `lookup`.
    ///
    /// Empty values are ignored.
    pub fn from_env_with(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let read = |key: &str| lookup(key).filter(|v| !v.is_empty());
        Self {
            container_tool: read(ENV_CONTAINER_TOOL),
            mar_tool: read(ENV_MAR),
            ..Self::default()
        }
    }

    /// Layers `over` on top of `self`.
    #[must_use]
    pub fn merge(self, over: Self) -> Self {
        Self {
            container_tool: over.container_tool.or(self.container_tool),
            mar_tool: over.mar_tool.or(self.mar_tool),
            build_timeout_secs: over.build_timeout_secs.or(self.build_timeout_secs),
            sign_timeout_secs: over.sign_timeout_secs.or(self.sign_timeout_secs),
            installer_selection: over.installer_selection.or(self.installer_selection),
        }
    }

    /// Fills unset fields with defaults and expands tool paths.
    pub fn resolve(&self) -> Result<ResolvedConfig> {
        let container_tool = resolve_tool(self.container_tool.as_deref().unwrap_or(DEFAULT_CONTAINER_TOOL))?;
        let mar_tool = resolve_tool(self.mar_tool.as_deref().unwrap_or(DEFAULT_MAR_TOOL))?;

        Ok(ResolvedConfig {
            container_tool,
            mar_tool,
            build_timeout: timeout(self.build_timeout_secs, DEFAULT_BUILD_TIMEOUT),
            sign_timeout: timeout(self.sign_timeout_secs, DEFAULT_SIGN_TIMEOUT),
            installer_selection: self.installer_selection.unwrap_or_default(),
        })
    }
}

fn timeout(secs: Option<u64>, default: Duration) -> Option<Duration> {
    match secs {
        None => Some(default),
        Some(0) => None,
        Some(secs) => Some(Duration::from_secs(secs)),
    }
}

/// Expands a configured tool. Bare names are looked up on `PATH` and left
/// unchanged if absent, so a missing tool surfaces when it is spawned.
fn resolve_tool(tool: &str) -> Result<PathBuf> {
    let expanded = resolve_path(tool)
        .map_err(|e| UpdateError::ConfigError {
            message: format!("{e:#}"),
        })
        .with_context(|| format!("Invalid tool path '{tool}'"))?;

    let tool_name = expanded.to_string_lossy().to_string();
    if tool_name.contains(MAIN_SEPARATOR) || tool_name.contains('/') {
        return Ok(expanded);
    }
    match find_tool(&tool_name) {
        Some(found) => {
            tracing::debug!(target: "config", "Resolved '{}' to {}", tool_name, found.display());
            Ok(found)
        }
        None => {
            tracing::debug!(target: "config", "'{}' not found on PATH", tool_name);
            Ok(expanded)
        }
    }
}
