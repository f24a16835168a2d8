//! Download progress indicator.
//!
//! Wraps an `indicatif` bar that is hidden when progress output is disabled
//! (`--no-progress`) or stderr is not a terminal, so cron logs and service
//! journals only contain `tracing` output.

use indicatif::{ProgressBar as IndicatifBar, ProgressStyle as IndicatifStyle};
use std::io::IsTerminal;

/// Byte-counting progress bar for asset downloads.
#[derive(Clone)]
pub struct DownloadProgress {
    inner: IndicatifBar,
}

impl DownloadProgress {
    /// Creates a bar for a download of `total` bytes (spinner-like when unknown).
    ///
    /// The bar is hidden if `enabled` is false or stderr is not a terminal.
    pub fn new(total: Option<u64>, enabled: bool) -> Self {
        let inner = if !enabled || !std::io::stderr().is_terminal() {
            IndicatifBar::hidden()
        } else {
            let bar = IndicatifBar::new(total.unwrap_or(0));
            bar.set_style(download_style());
            bar.set_prefix("Downloading");
            bar
        };
        Self {
            inner,
        }
    }

    /// Advances the bar by `delta` bytes.
    pub fn inc(&self, delta: u64) {
        self.inner.inc(delta);
    }

    /// Removes the bar from the terminal.
    pub fn finish_and_clear(&self) {
        self.inner.finish_and_clear();
    }

    /// Whether the bar renders anything.
    pub fn is_hidden(&self) -> bool {
        self.inner.is_hidden()
    }
}

fn download_style() -> IndicatifStyle {
    IndicatifStyle::default_bar()
        .template("{prefix:.bold.cyan} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})")
        .unwrap_or_else(|_| IndicatifStyle::default_bar())
        .progress_chars("━╸━")
}
