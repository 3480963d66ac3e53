//! fullupdate - build, sign and describe a complete update container.
//!
//! Thin entry point: parses arguments, installs logging, runs the pipeline and
//! maps any error to a readable message and exit status 1.

use anyhow::Result;
use clap::Parser;
use fullupdate_cli::cli::{self, Cli};
use fullupdate_cli::core::user_friendly_error;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    cli::init_logging(cli.build_config().log_level.as_deref());

    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    match cli.execute().await {
        Ok(_) => Ok(()),
        Err(e) => {
            let error_ctx = user_friendly_error(e);
            error_ctx.display();
            std::process::exit(1);
        }
    }
}
