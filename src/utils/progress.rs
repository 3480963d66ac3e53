//! Progress indicators for pipeline stages.
//!
//! Each stage gets a spinner while it runs. Spinners are hidden when
//! `FULLUPDATE_NO_PROGRESS` is set, when `--quiet`/`--no-progress` is passed, or
//! when stderr is not a terminal (indicatif hides draw targets that are not TTYs).

use indicatif::{ProgressBar as IndicatifBar, ProgressStyle as IndicatifStyle};
use std::time::Duration;

use crate::constants::ENV_NO_PROGRESS;

/// Returns true if progress output was disabled through the environment.
#[must_use]
pub fn is_progress_disabled() -> bool {
    std::env::var_os(ENV_NO_PROGRESS).is_some()
}

/// Spinner shown while a single pipeline stage runs.
#[derive(Clone)]
pub struct StageSpinner {
    inner: IndicatifBar,
}

impl StageSpinner {
    /// Starts a spinner with `message`, or a hidden one when `enabled` is false.
    pub fn start(enabled: bool, message: impl Into<String>) -> Self {
        let bar = if enabled {
            let bar = IndicatifBar::new_spinner();
            bar.set_style(spinner_style());
            bar.enable_steady_tick(Duration::from_millis(100));
            bar
        } else {
            IndicatifBar::hidden()
        };
        bar.set_message(message.into());
        Self { inner: bar }
    }

    /// Finishes the spinner leaving `msg` on screen.
    pub fn finish_with_message(&self, msg: impl Into<String>) {
        self.inner.finish_with_message(msg.into());
    }

    /// Finishes the spinner and removes it from the terminal.
    pub fn finish_and_clear(&self) {
        self.inner.finish_and_clear();
    }

    /// Whether the spinner draws nothing.
    #[must_use]
    pub fn is_hidden(&self) -> bool {
        self.inner.is_hidden()
    }
}

fn spinner_style() -> IndicatifStyle {
    IndicatifStyle::default_spinner()
        .template("{spinner:.cyan} {msg}")
        .unwrap_or_else(|_| IndicatifStyle::default_spinner())
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"])
}
