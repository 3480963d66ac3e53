//! Container signing.
//!
//! Signing is delegated to the `mar` tool, which reads the private key from an NSS
//! certificate database. The signed container is written next to the unsigned one
//! and then renamed over it, so after a successful [`Signer::sign`] the container
//! path holds the signed artifact.

use anyhow::{Context, Result};
use std::ffi::OsStr;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::container::ArtifactName;
use crate::core::UpdateError;
use crate::tool::ToolCommand;
use crate::utils::remove_file_if_exists;

/// Identifies the signing key: certificate database directory and certificate name.
///
/// Opaque to the pipeline; forwarded verbatim to the [`Signer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateReference {
    /// Directory holding the certificate database
    pub store: PathBuf,
    /// Nickname of the signing certificate inside the database
    pub name: String,
}

impl CertificateReference {
    /// Creates a reference to certificate `name` in `store`.
    pub fn new(store: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        Self {
            store: store.into(),
            name: name.into(),
        }
    }
}

/// Signs an update container in place.
pub trait Signer {
    /// Signs `container`, which lives in `output_dir` and was named from `prefix`.
    fn sign(
        &self,
        output_dir: &Path,
        certificate: &CertificateReference,
        container: &Path,
        prefix: &str,
    ) -> impl Future<Output = Result<()>> + Send;
}

/// Signs containers with the `mar` tool.
///
/// Runs `mar -C <output_dir> -d <store> -n <name> -s <container> <signed>` where
/// `<signed>` is `<prefix>-signed-complete.mar`, then renames `<signed>` over the
/// container.
#[derive(Debug, Clone)]
pub struct MarSigner {
    mar_tool: PathBuf,
    timeout: Option<Duration>,
}

impl MarSigner {
    /// Creates a signer using the `mar` executable at `mar_tool`.
    pub fn new(mar_tool: impl Into<PathBuf>) -> Self {
        Self {
            mar_tool: mar_tool.into(),
            timeout: None,
        }
    }

    /// Bounds how long `mar` may run. `None` waits indefinitely.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Path of the temporary signed container for `prefix`.
pub fn signed_container_path(output_dir: &Path, prefix: &str) -> Result<PathBuf> {
    Ok(ArtifactName::complete(&format!("{prefix}-signed"))?.path_in(output_dir))
}

impl Signer for MarSigner {
    async fn sign(
        &self,
        output_dir: &Path,
        certificate: &CertificateReference,
        container: &Path,
        prefix: &str,
    ) -> Result<()> {
        if !certificate.store.exists() {
            return Err(UpdateError::CertificateNotFound {
                path: certificate.store.display().to_string(),
            }
            .into());
        }

        let signed = signed_container_path(output_dir, prefix)?;
        remove_file_if_exists(&signed)?;
        tracing::info!(
            target: "signing",
            "Signing {} with certificate '{}'",
            container.display(),
            certificate.name
        );

        ToolCommand::new(&self.mar_tool)
            .args([OsStr::new("-C"), output_dir.as_os_str()])
            .args([OsStr::new("-d"), certificate.store.as_os_str()])
            .args(["-n", certificate.name.as_str()])
            .args([OsStr::new("-s"), container.as_os_str(), signed.as_os_str()])
            .with_timeout(self.timeout)
            .with_context("sign container")
            .execute_success()
            .await
            .with_context(|| format!("Failed to sign {}", container.display()))?;

        if !signed.is_file() {
            return Err(UpdateError::SigningFailed {
                artifact: container.display().to_string(),
                reason: format!("mar exited successfully but {} was not created", signed.display()),
            }
            .into());
        }

        std::fs::rename(&signed, container).map_err(|e| UpdateError::SigningFailed {
            artifact: container.display().to_string(),
            reason: format!("cannot move {} into place: {e}", signed.display()),
        })?;

        tracing::debug!(target: "signing", "Signed container in place: {}", container.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signed_container_path() {
        let path = signed_container_path(Path::new("/w/update"), "app").unwrap();
        assert_eq!(path, PathBuf::from("/w/update/app-signed-complete.mar"));
    }

    #[tokio::test]
    async fn test_missing_certificate_store() {
        let temp = tempfile::tempdir().unwrap();
        let cert = CertificateReference::new(temp.path().join("nss"), "release");

        let err = MarSigner::new("mar")
            .sign(temp.path(), &cert, &temp.path().join("app-complete.mar"), "app")
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<UpdateError>(),
            Some(UpdateError::CertificateNotFound { .. })
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_mar_signer_replaces_container() {
        use std::os::unix::fs::PermissionsExt;

        let temp = tempfile::tempdir().unwrap();
        let nss = temp.path().join("nss");
        std::fs::create_dir(&nss).unwrap();

        // Fake mar: copy the input (arg 8) to the output (arg 9) with a marker appended.
        let mar = temp.path().join("mar");
        std::fs::write(&mar, "#!/bin/sh\n{ cat \"$8\"; printf 'SIGNED:%s' \"$6\"; } > \"$9\"\n").unwrap();
        std::fs::set_permissions(&mar, std::fs::Permissions::from_mode(0o755)).unwrap();

        let container = temp.path().join("app-complete.mar");
        std::fs::write(&container, "payload").unwrap();

        MarSigner::new(&mar)
            .sign(temp.path(), &CertificateReference::new(&nss, "release"), &container, "app")
            .await
            .unwrap();

        assert_eq!(std::fs::read_to_string(&container).unwrap(), "payloadSIGNED:release");
        assert!(!temp.path().join("app-signed-complete.mar").exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_stale_signed_container_is_not_reused() {
        let temp = tempfile::tempdir().unwrap();
        let nss = temp.path().join("nss");
        std::fs::create_dir(&nss).unwrap();

        let container = temp.path().join("app-complete.mar");
        std::fs::write(&container, "payload").unwrap();
        let stale = temp.path().join("app-signed-complete.mar");
        std::fs::write(&stale, "payloadSIGNED:previous").unwrap();

        // `true` exits 0 without writing anything.
        let err = MarSigner::new("true")
            .sign(temp.path(), &CertificateReference::new(&nss, "release"), &container, "app")
            .await
            .unwrap_err();

        assert!(matches!(err.downcast_ref::<UpdateError>(), Some(UpdateError::SigningFailed { .. })));
        assert_eq!(std::fs::read_to_string(&container).unwrap(), "payload");
        assert!(!stale.exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_sign_timeout() {
        use std::os::unix::fs::PermissionsExt;

        let temp = tempfile::tempdir().unwrap();
        let nss = temp.path().join("nss");
        std::fs::create_dir(&nss).unwrap();

        let mar = temp.path().join("mar");
        std::fs::write(&mar, "#!/bin/sh
sleep 30
").unwrap();
        std::fs::set_permissions(&mar, std::fs::Permissions::from_mode(0o755)).unwrap();

        let container = temp.path().join("app-complete.mar");
        std::fs::write(&container, "payload").unwrap();

        let err = MarSigner::new(&mar)
            .with_timeout(Some(Duration::from_millis(300)))
            .sign(temp.path(), &CertificateReference::new(&nss, "release"), &container, "app")
            .await
            .unwrap_err();

        match err.downcast_ref::<UpdateError>() {
            Some(UpdateError::ToolTimedOut {
                timeout,
                ..
            }) => assert_eq!(*timeout, Duration::from_millis(300)),
            other => panic!("Expected ToolTimedOut, got {other:?}"),
        }
        assert_eq!(std::fs::read_to_string(&container).unwrap(), "payload");
    }
}
