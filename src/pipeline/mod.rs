//! One check-and-apply cycle, from release lookup to committed state.
//!
//! # Cycle State Machine
//!
//! ```text
//! Idle ─▶ Checking ─┬─▶ UpToDate ─────────────────────────────────────▶ Idle
//!                   └─▶ Downloading ─▶ Verifying ─▶ Extracting ─▶ Committed ─▶ Idle
//!
//! any state ─▶ Failed (reported to the caller as CycleFailure)
//! ```
//!
//! A cycle may be interrupted at any point and simply run again:
//! - an interrupted download leaves a file that the next attempt deletes first
//! - an interrupted extraction leaves a staging directory that is wiped first
//! - the state record is written last, so a crash before it looks like
//!   "update still pending" on restart
//!
//! Looping, intervals, and shutdown belong to [`scheduler`].

pub mod scheduler;

use regex::Regex;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{Instrument, debug, info, info_span};

use crate::archive::{ExtractSummary, Extractor};
use crate::checksum::compute_sha256;
use crate::constants::{DOWNLOAD_FILE_NAME, STAGING_DIR_NAME, STATE_FILE_NAME};
use crate::core::SyncError;
use crate::release::{LatestRelease, ReleaseFetcher};
use crate::state::{AppliedState, StateStore};

pub use scheduler::Scheduler;

/// What a pipeline targets and how it recognizes the right asset.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Repository identifier (`owner/name`).
    pub repo: String,
    /// Pattern selecting the asset; first match wins.
    pub asset_pattern: Regex,
    /// Directory that receives the release contents.
    pub destination: PathBuf,
    /// File that must exist at the top of the archive.
    pub marker_file: PathBuf,
    /// Whether to draw a download progress bar.
    pub show_progress: bool,
}

/// The step a cycle was in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CyclePhase {
    /// Fetching the latest release and comparing with the applied state.
    Checking,
    /// Streaming the asset to the download path.
    Downloading,
    /// Hashing and size-checking the download.
    Verifying,
    /// Staging the archive and overlaying it onto the destination.
    Extracting,
    /// Persisting the new applied state.
    Committing,
}

impl fmt::Display for CyclePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Checking => "checking",
            Self::Downloading => "downloading",
            Self::Verifying => "verifying",
            Self::Extracting => "extracting",
            Self::Committing => "committing",
        };
        f.write_str(name)
    }
}

/// A cycle that ended in the `Failed` state.
#[derive(Debug, Clone, Error)]
#[error("sync cycle failed while {phase}: {error}")]
pub struct CycleFailure {
    /// Step that failed.
    pub phase: CyclePhase,
    /// Why it failed.
    #[source]
    pub error: SyncError,
}

impl CycleFailure {
    fn at(phase: CyclePhase) -> impl FnOnce(SyncError) -> Self {
        move |error| Self {
            phase,
            error,
        }
    }
}

/// Result of comparing the latest release with the applied state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckOutcome {
    /// The latest release is the one on disk.
    UpToDate {
        /// The latest release.
        release: LatestRelease,
    },
    /// The latest release differs from what is on disk.
    UpdateAvailable {
        /// The latest release.
        release: LatestRelease,
        /// What is currently applied, if anything.
        previous: Option<AppliedState>,
    },
}

/// Result of a cycle that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Nothing to do; no download happened.
    UpToDate {
        /// The latest release, already applied.
        release: LatestRelease,
    },
    /// A new release was downloaded, extracted, and recorded.
    Applied {
        /// The record now stored.
        state: AppliedState,
        /// Files copied into the destination.
        files_copied: usize,
    },
}

/// Orchestrates fetch, compare, download, hash, extract, and commit for one destination.
///
/// # Examples
///
/// ```rust,no_run
/// use regex::Regex;
/// use relsync_cli::pipeline::{CycleOutcome, PipelineConfig, UpdatePipeline};
/// use relsync_cli::release::ReleaseFetcher;
/// use std::time::Duration;
///
/// # async fn example() -> anyhow::Result<()> {
/// let fetcher = ReleaseFetcher::new("https://api.github.com", Duration::from_secs(60), None)?;
/// let pipeline = UpdatePipeline::new(
///     PipelineConfig {
///         repo: "owner/site".to_string(),
///         asset_pattern: Regex::new(r"^web-.*\.zip$")?,
///         destination: "/srv/www".into(),
///         marker_file: "index.html".into(),
///         show_progress: false,
///     },
///     fetcher,
/// );
///
/// match pipeline.run_one_cycle().await? {
///     CycleOutcome::UpToDate { release } => println!("up to date: {}", release.tag),
///     CycleOutcome::Applied { state, .. } => println!("applied {}", state.tag),
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct UpdatePipeline {
    config: PipelineConfig,
    fetcher: ReleaseFetcher,
    store: StateStore,
    extractor: Extractor,
}

impl UpdatePipeline {
    /// Creates a pipeline whose working files live inside `config.destination`.
    pub fn new(config: PipelineConfig, fetcher: ReleaseFetcher) -> Self {
        let store = StateStore::new(config.destination.join(STATE_FILE_NAME));
        let extractor = Extractor::new(config.marker_file.clone());
        Self {
            config,
            fetcher,
            store,
            extractor,
        }
    }

    /// The store holding the applied state.
    pub fn state_store(&self) -> &StateStore {
        &self.store
    }

    /// Directory used to materialize archives before they are applied.
    pub fn staging_dir(&self) -> PathBuf {
        self.config.destination.join(STAGING_DIR_NAME)
    }

    /// Path the asset is downloaded to.
    pub fn download_path(&self) -> PathBuf {
        self.config.destination.join(DOWNLOAD_FILE_NAME)
    }

    /// Runs the `Checking` step alone: fetch the latest release and compare.
    ///
    /// Performs one metadata request and no writes.
    pub async fn check(&self) -> Result<CheckOutcome, SyncError> {
        let previous = self.store.load();
        let release = self.fetcher.fetch_latest(&self.config.repo, &self.config.asset_pattern).await?;

        if previous.as_ref().is_some_and(|state| state.matches(&release)) {
            Ok(CheckOutcome::UpToDate {
                release,
            })
        } else {
            Ok(CheckOutcome::UpdateAvailable {
                release,
                previous,
            })
        }
    }

    /// Runs one full cycle.
    ///
    /// The applied state is written only after the extraction succeeded, so
    /// it never describes a partially applied tree.
    pub async fn run_one_cycle(&self) -> Result<CycleOutcome, CycleFailure> {
        let span = info_span!("sync_cycle", repo = %self.config.repo);
        self.cycle().instrument(span).await
    }

    async fn cycle(&self) -> Result<CycleOutcome, CycleFailure> {
        debug!("Phase: {}", CyclePhase::Checking);
        let (release, previous) = match self.check().await.map_err(CycleFailure::at(CyclePhase::Checking))? {
            CheckOutcome::UpToDate {
                release,
            } => {
                info!("Already up to date: {} / {}", release.tag, release.asset.name);
                return Ok(CycleOutcome::UpToDate {
                    release,
                });
            }
            CheckOutcome::UpdateAvailable {
                release,
                previous,
            } => (release, previous),
        };

        match &previous {
            Some(prev) => info!(
                "Update found: {} / {} (applied: {} / {})",
                release.tag, release.asset.name, prev.tag, prev.asset_name
            ),
            None => info!("Update found: {} / {} (nothing applied yet)", release.tag, release.asset.name),
        }

        debug!("Phase: {}", CyclePhase::Downloading);
        let download_path = self.download_path();
        let written = self
            .fetcher
            .download(&release.asset, &download_path, self.config.show_progress)
            .await
            .map_err(CycleFailure::at(CyclePhase::Downloading))?;

        debug!("Phase: {}", CyclePhase::Verifying);
        let digest = verify_download(&download_path, written, release.asset.size)
            .await
            .map_err(CycleFailure::at(CyclePhase::Verifying))?;
        info!("Downloaded {} ({} bytes, sha256={})", release.asset.name, written, digest);

        debug!("Phase: {}", CyclePhase::Extracting);
        let summary = self.extract(download_path).await.map_err(CycleFailure::at(CyclePhase::Extracting))?;

        debug!("Phase: {}", CyclePhase::Committing);
        let state = AppliedState::from_release(&self.config.repo, &release, digest);
        self.store.save(&state).map_err(CycleFailure::at(CyclePhase::Committing))?;
        info!("Update complete: {} / {}", state.tag, state.asset_name);

        Ok(CycleOutcome::Applied {
            state,
            files_copied: summary.copied_files,
        })
    }

    async fn extract(&self, archive: PathBuf) -> Result<ExtractSummary, SyncError> {
        let extractor = self.extractor.clone();
        let destination = self.config.destination.clone();
        let staging = self.staging_dir();

        tokio::task::spawn_blocking(move || {
            extractor.stage_and_apply(&archive, &destination, &staging)
        })
        .await
        .map_err(|e| SyncError::FileSystem {
            operation: "extract".to_string(),
            path: self.config.destination.display().to_string(),
            reason: format!("extraction task aborted: {e}"),
        })?
    }
}

/// Hashes the download and checks it against the advertised size.
async fn verify_download(
    path: &Path,
    written: u64,
    expected_size: Option<u64>,
) -> Result<String, SyncError> {
    if let Some(expected) = expected_size
        && expected != written
    {
        return Err(SyncError::Protocol {
            reason: format!("download size mismatch: expected {expected} bytes, received {written}"),
        });
    }
    compute_sha256(path).await
}
