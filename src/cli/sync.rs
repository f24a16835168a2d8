//! `relsync sync`: apply new releases, once or on an interval.

use anyhow::{Context, Result};
use clap::Args;
use tracing::{debug, info};

use super::{TargetArgs, build_pipeline};
use crate::config::SyncConfig;
use crate::pipeline::Scheduler;
use crate::pipeline::scheduler::ctrl_c;
use crate::utils::ensure_dir;

/// Download and apply new releases.
///
/// Every cycle fetches the latest release, compares it with the applied
/// state, and downloads, verifies, extracts, and records it when it differs.
/// A failed cycle is logged and retried after the interval; it does not
/// change the exit code.
#[derive(Args, Debug)]
pub struct SyncCommand {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Seconds to wait after a cycle before the next one [default: 7200]
    #[arg(long, value_name = "SECONDS")]
    pub interval_seconds: Option<u64>,

    /// Run a single cycle and exit (for cron)
    #[arg(long)]
    pub once: bool,
}

impl SyncCommand {
    /// Runs cycles until `--once` is satisfied or Ctrl-C is pressed.
    pub async fn execute(self, file: &SyncConfig, show_progress: bool) -> Result<()> {
        let mut overrides = self.target.overrides();
        overrides.interval_seconds = self.interval_seconds;
        let settings = file.resolve(&overrides)?;

        ensure_dir(&settings.destination).with_context(|| {
            format!("Failed to prepare destination {}", settings.destination.display())
        })?;

        let token = self.target.token();
        let pipeline = build_pipeline(&settings, token.as_deref(), show_progress)?;
        let scheduler = Scheduler::new(settings.interval, self.once);

        info!(
            "Syncing {} into {} ({})",
            settings.repo,
            settings.destination.display(),
            if scheduler.is_once() {
                "single run".to_string()
            } else {
                format!("every {}s", scheduler.interval().as_secs())
            }
        );

        let summary = scheduler.run(&pipeline, ctrl_c()).await;
        debug!(
            "Finished after {} cycle(s): {} applied, {} failed",
            summary.cycles, summary.applied, summary.failed
        );
        Ok(())
    }
}
