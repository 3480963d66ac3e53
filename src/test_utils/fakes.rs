//! Recording fakes for the container builder and signer.

use anyhow::Result;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use crate::container::ContainerBuilder;
use crate::core::UpdateError;
use crate::signing::{CertificateReference, Signer};

/// Container builder that writes a listing of the source tree as the container.
///
/// Clones share the call log.
#[derive(Debug, Clone, Default)]
pub struct FakeContainerBuilder {
    calls: Arc<Mutex<Vec<(PathBuf, PathBuf)>>>,
    fail: bool,
}

impl FakeContainerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// A builder whose every call fails like a nonzero tool exit.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Recorded (container, source_dir) pairs.
    pub fn calls(&self) -> Vec<(PathBuf, PathBuf)> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl ContainerBuilder for FakeContainerBuilder {
    async fn build(&self, container: &Path, source_dir: &Path) -> Result<()> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((container.to_path_buf(), source_dir.to_path_buf()));

        if self.fail {
            return Err(UpdateError::ToolFailed {
                tool: "fake-builder".to_string(),
                code: Some(1),
                stderr: "build failed".to_string(),
            }
            .into());
        }

        let mut names: Vec<String> = std::fs::read_dir(source_dir)?
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().to_string())
            .collect();
        names.sort();
        std::fs::write(container, format!("MAR:{}", names.join(",")))?;
        Ok(())
    }
}

/// Signer that appends [`FakeSigner::MARKER`] to the container.
///
/// Clones share the call log.
#[derive(Debug, Clone, Default)]
pub struct FakeSigner {
    calls: Arc<Mutex<Vec<PathBuf>>>,
    fail: bool,
}

impl FakeSigner {
    pub const MARKER: &'static str = ":SIGNED";

    pub fn new() -> Self {
        Self::default()
    }

    /// A signer whose every call fails.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Recorded container paths.
    pub fn calls(&self) -> Vec<PathBuf> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl Signer for FakeSigner {
    async fn sign(
        &self,
        _output_dir: &Path,
        _certificate: &CertificateReference,
        container: &Path,
        _prefix: &str,
    ) -> Result<()> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).push(container.to_path_buf());

        if self.fail {
            return Err(UpdateError::SigningFailed {
                artifact: container.display().to_string(),
                reason: "fake signer refused".to_string(),
            }
            .into());
        }

        let mut file = OpenOptions::new().append(true).open(container)?;
        file.write_all(Self::MARKER.as_bytes())?;
        Ok(())
    }
}
