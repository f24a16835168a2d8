//! Repeats sync cycles at a fixed interval until shut down.

use std::future::Future;
use std::time::Duration;
use tracing::{error, info, warn};

use super::{CycleOutcome, UpdatePipeline};
use crate::constants::MIN_INTERVAL;

/// Counters for a scheduler run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Cycles started.
    pub cycles: u64,
    /// Cycles that applied a new release.
    pub applied: u64,
    /// Cycles that ended in failure.
    pub failed: u64,
}

/// Drives an [`UpdatePipeline`] once or forever.
///
/// A failed cycle never stops the loop; it is logged and the next cycle
/// starts after the usual delay.
#[derive(Debug, Clone, Copy)]
pub struct Scheduler {
    interval: Duration,
    once: bool,
}

impl Scheduler {
    /// Creates a scheduler. Intervals below one second are raised to one second.
    pub fn new(interval: Duration, once: bool) -> Self {
        Self {
            interval: interval.max(MIN_INTERVAL),
            once,
        }
    }

    /// Delay between the end of one cycle and the start of the next.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Whether only a single cycle is run.
    pub fn is_once(&self) -> bool {
        self.once
    }

    /// Runs cycles until `once` is satisfied or `shutdown` resolves.
    ///
    /// `shutdown` is only polled while waiting for the next cycle. A cycle
    /// that has started always runs to its end, so a download or extraction
    /// is never abandoned halfway.
    pub async fn run<F>(&self, pipeline: &UpdatePipeline, shutdown: F) -> RunSummary
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut summary = RunSummary::default();

        loop {
            summary.cycles += 1;
            match pipeline.run_one_cycle().await {
                Ok(CycleOutcome::Applied {
                    ..
                }) => summary.applied += 1,
                Ok(CycleOutcome::UpToDate {
                    ..
                }) => {}
                Err(failure) => {
                    summary.failed += 1;
                    if failure.error.is_transient() {
                        error!("{failure}");
                    } else {
                        error!("{failure} (will recur until a new release is published)");
                    }
                }
            }

            if self.once {
                return summary;
            }

            info!("Next check in {}s", self.interval.as_secs());
            tokio::select! {
                () = &mut shutdown => {
                    info!("Shutdown requested; stopping");
                    return summary;
                }
                () = tokio::time::sleep(self.interval) => {}
            }
        }
    }
}

/// Resolves when the process receives Ctrl-C.
///
/// If the signal handler cannot be installed this never resolves, and the
/// process can still be stopped the usual way.
pub async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Cannot listen for Ctrl-C: {e}");
        std::future::pending::<()>().await;
    }
}
