//! Configuration for fullupdate
//!
//! Only the ambient knobs are configurable: which external tools to run, how
//! long they may take and how the installer is picked. The six positional CLI
//! arguments are never read from configuration.
//!
//! # Layering
//!
//! Later layers win:
//!
//! 1. Built-in defaults
//! 2. TOML file (`--config <FILE>` or `FULLUPDATE_CONFIG`)
//! 3. Environment (`MAR`, `FULLUPDATE_CONTAINER_TOOL`)
//! 4. CLI flags (`--build-timeout`, `--sign-timeout`)
//!
//! # File Format
//!
//! ```toml
//! container_tool = "~/src/tools/update-packaging/make_full_update.sh"
//! mar_tool = "$OBJDIR/dist/bin/mar"
//! build_timeout_secs = 1800
//! sign_timeout_secs = 0          # wait indefinitely
//! installer_selection = "lexicographic-first"
//! ```
//!
//! Tool paths are expanded with `~` and `$VAR` substitution.

mod settings;

pub use settings::{BuilderConfig, ResolvedConfig};
