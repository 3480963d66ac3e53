//! Command-line interface for fullupdate
//!
//! ```text
//! fullupdate <product_name> <workdir> <filename_prefix> <certificate_path> <certificate_name> <base_url>
//! ```
//!
//! All six positionals are required. The optional flags only tune the ambient
//! behavior (logging, progress, tool paths and timeouts):
//!
//! - `--verbose` / `--quiet` - Log level (mutually exclusive)
//! - `--config <FILE>` - TOML configuration file, also read from `FULLUPDATE_CONFIG`
//! - `--build-timeout <SECS>` / `--sign-timeout <SECS>` - Subprocess bounds, `0` disables
//! - `--no-progress` - Hide stage spinners
//!
//! # Examples
//!
//! ```bash
//! fullupdate LibreOfficeDev /build/workdir update /build/nss release-cert \
//!     https://update.example.org/builds/
//!
//! # Bounded build, verbose logging
//! fullupdate -v --build-timeout 900 LibreOfficeDev /build/workdir update \
//!     /build/nss release-cert https://update.example.org/builds/
//! ```
//!
//! On success the signed container and `complete_info.json` are in
//! `<workdir>/update/`. Any failure exits with status 1.

use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use crate::archive::NativeExtractor;
use crate::config::{BuilderConfig, ResolvedConfig};
use crate::constants::ENV_CONFIG;
use crate::container::ScriptContainerBuilder;
use crate::pipeline::{BuildReport, BuildRequest, FullUpdatePipeline};
use crate::signing::{CertificateReference, MarSigner};
use crate::utils::progress::is_progress_disabled;


/// Settings derived from the flags, separate from the build request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CliConfig {
    /// Log filter used when `RUST_LOG` is unset. `None` disables logging.
    pub log_level: Option<String>,

    /// Whether stage spinners are drawn.
    pub progress: bool,
}

/// Builds a signed complete update container and its metadata descriptor.
#[derive(Parser, Debug)]
#[command(
    name = "fullupdate",
    about = "Build, sign and describe a complete update container",
    version,
    long_about = "Extracts the product installer from <workdir>/installation, packs it into \
                  <workdir>/update/<prefix>-complete.mar, signs it with mar and writes \
                  <workdir>/update/complete_info.json."
)]
pub struct Cli {
    /// Product name, selects <workdir>/installation/<product_name>/
    product_name: String,

    /// Working directory of the release build
    workdir: PathBuf,

    /// File name prefix of the container (<prefix>-complete.mar)
    filename_prefix: String,

    /// Certificate database directory passed to mar
    certificate_path: PathBuf,

    /// Name of the signing certificate in the database
    certificate_name: String,

    /// URL the container will be published under
    base_url: String,

    /// Enable debug logging
    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,

    /// Only report errors
    #[arg(short, long)]
    quiet: bool,

    /// Configuration file
    #[arg(long, env = ENV_CONFIG, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Container build timeout in seconds (0 waits indefinitely)
    #[arg(long, value_name = "SECS")]
    build_timeout: Option<u64>,

    /// Signing timeout in seconds (0 waits indefinitely)
    #[arg(long, value_name = "SECS")]
    sign_timeout: Option<u64>,

    /// Disable progress spinners
    #[arg(long)]
    no_progress: bool,
}

impl Cli {
    /// Runs the pipeline with the production collaborators.
    pub async fn execute(self) -> Result<BuildReport> {
        let config = self.build_config();
        let settings = self.resolve_settings_with(|key| std::env::var(key).ok()).await?;
        tracing::debug!(target: "cli", "Resolved settings: {settings:?}");

        let builder = ScriptContainerBuilder::new(&settings.container_tool, &settings.mar_tool)
            .with_timeout(settings.build_timeout);
        let signer = MarSigner::new(&settings.mar_tool).with_timeout(settings.sign_timeout);
        let pipeline = FullUpdatePipeline::new(NativeExtractor, builder, signer)
            .with_selection(settings.installer_selection)
            .with_progress(config.progress);

        let report = pipeline.run(&self.request()).await?;

        if !self.quiet {
            println!("{} {}", "✓ Signed".green().bold(), report.container.display());
            println!("{} {}", "✓ Metadata".green().bold(), report.descriptor.display());
        }
        Ok(report)
    }

    /// Translates the flags into a [`CliConfig`].
    #[must_use]
    pub fn build_config(&self) -> CliConfig {
        let log_level = if self.verbose {
            Some("debug".to_string())
        } else if self.quiet {
            None
        } else {
            Some("info".to_string())
        };

        CliConfig {
            log_level,
            progress: !(self.quiet || self.no_progress || is_progress_disabled()),
        }
    }

    /// The build request formed by the positional arguments.
    #[must_use]
    pub fn request(&self) -> BuildRequest {
        BuildRequest {
            product: self.product_name.clone(),
            workdir: self.workdir.clone(),
            prefix: self.filename_prefix.clone(),
            certificate: CertificateReference::new(&self.certificate_path, &self.certificate_name),
            base_url: self.base_url.clone(),
        }
    }

    /// Layers the config file, the environment (read through `lookup`) and the
    /// timeout flags, in that order.
    pub async fn resolve_settings_with(
        &self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<ResolvedConfig> {
        let file = BuilderConfig::load_with_optional(self.config.as_deref()).await?;
        let flags = BuilderConfig {
            build_timeout_secs: self.build_timeout,
            sign_timeout_secs: self.sign_timeout,
            ..BuilderConfig::default()
        };

        BuilderConfig::default()
            .merge(file)
            .merge(BuilderConfig::from_env_with(lookup))
            .merge(flags)
            .resolve()
    }
}

/// Installs the global stderr subscriber.
///
/// `RUST_LOG` takes precedence over `level`; with neither, logging is off.
pub fn init_logging(level: Option<&str>) {
    let filter = match (std::env::var("RUST_LOG"), level) {
        (Ok(_), _) => EnvFilter::from_default_env(),
        (Err(_), Some(level)) => EnvFilter::new(level),
        (Err(_), None) => EnvFilter::new("off"),
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .try_init();
}
