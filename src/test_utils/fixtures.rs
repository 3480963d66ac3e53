//! Workdir and installer fixtures.

use anyhow::{Context, Result};
use flate2::Compression;
use flate2::write::GzEncoder;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use crate::layout::WorkdirLayout;
use crate::pipeline::BuildRequest;
use crate::signing::CertificateReference;

/// A temporary workdir with an (initially empty) installer directory for one product.
///
/// The certificate directory lives next to the workdir, not inside it.
pub struct WorkdirFixture {
    temp: TempDir,
    product: String,
    layout: WorkdirLayout,
}

impl WorkdirFixture {
    /// Creates `<tmp>/work/installation/<product>/archive/install/en-US/` and `<tmp>/nss/`.
    pub fn new(product: &str) -> Result<Self> {
        let temp = TempDir::new().context("Failed to create temp dir")?;
        let layout = WorkdirLayout::new(temp.path().join("work"));
        fs::create_dir_all(layout.installer_dir(product))?;
        fs::create_dir_all(temp.path().join("nss"))?;
        Ok(Self {
            temp,
            product: product.to_string(),
            layout,
        })
    }

    pub fn root(&self) -> &Path {
        self.layout.root()
    }

    pub fn installer_dir(&self) -> PathBuf {
        self.layout.installer_dir(&self.product)
    }

    pub fn staging_dir(&self) -> &Path {
        self.layout.staging_dir()
    }

    pub fn update_dir(&self) -> &Path {
        self.layout.update_dir()
    }

    pub fn certificate_dir(&self) -> PathBuf {
        self.temp.path().join("nss")
    }

    /// Writes an installer archive into the installer directory.
    ///
    /// `.zip` names produce a zip archive, anything else a gzipped tarball.
    pub fn add_installer(&self, name: &str, entries: &[(&str, &str)]) -> Result<PathBuf> {
        let path = self.installer_dir().join(name);
        if name.ends_with(".zip") {
            write_zip(&path, entries)?;
        } else {
            write_tar_gz(&path, entries)?;
        }
        Ok(path)
    }

    /// A request for this fixture's product, signed with certificate `release`.
    pub fn request(&self, prefix: &str, base_url: &str) -> BuildRequest {
        BuildRequest {
            product: self.product.clone(),
            workdir: self.root().to_path_buf(),
            prefix: prefix.to_string(),
            certificate: CertificateReference::new(self.certificate_dir(), "release"),
            base_url: base_url.to_string(),
        }
    }
}

/// Writes a gzipped tarball holding `entries` as (path, content) pairs.
pub fn write_tar_gz(path: &Path, entries: &[(&str, &str)]) -> Result<()> {
    let file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::default()));
    for (name, content) in entries {
        let mut header = tar::Header::new_gnu();
        header.set_size(content.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append_data(&mut header, name, content.as_bytes())?;
    }
    builder.into_inner()?.finish()?;
    Ok(())
}

/// Writes a zip archive holding `entries` as (path, content) pairs.
pub fn write_zip(path: &Path, entries: &[(&str, &str)]) -> Result<()> {
    let file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    let mut zip = zip::ZipWriter::new(file);
    for (name, content) in entries {
        zip.start_file(*name, zip::write::SimpleFileOptions::default())?;
        zip.write_all(content.as_bytes())?;
    }
    zip.finish()?;
    Ok(())
}
