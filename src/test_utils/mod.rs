//! Test utilities for fullupdate
//!
//! Fixtures that lay out a workdir the way the release pipeline does, archive
//! writers for building installer inputs, and fake collaborators that record
//! their calls so tests can assert which stages ran.
//!
//! # Example
//!
//! ```rust,no_run
//! use fullupdate_cli::archive::NativeExtractor;
//! use fullupdate_cli::pipeline::FullUpdatePipeline;
//! use fullupdate_cli::test_utils::{FakeContainerBuilder, FakeSigner, WorkdirFixture};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let fixture = WorkdirFixture::new("app")?;
//! fixture.add_installer("app.tar.gz", &[("app/readme.txt", "hello")])?;
//!
//! let pipeline = FullUpdatePipeline::new(NativeExtractor, FakeContainerBuilder::new(), FakeSigner::new());
//! let report = pipeline.run(&fixture.request("update", "https://example.org")).await?;
//! assert!(report.container.exists());
//! # Ok(())
//! # }
//! ```

pub mod fakes;
pub mod fixtures;

pub use fakes::{FakeContainerBuilder, FakeSigner};
pub use fixtures::{WorkdirFixture, write_tar_gz, write_zip};

use std::sync::Once;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Global flag to ensure logging is only initialized once in tests
static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests.
///
/// Only the first call has an effect. Uses `level` when given, otherwise
/// `RUST_LOG`; with neither, logging stays off.
///
/// ```bash
/// RUST_LOG=pipeline=debug cargo test
/// ```
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .with_thread_ids(false)
            .with_ansi(true)
            .try_init();
    });
}
