//! relsync - keep a directory in sync with a repository's latest release
//!
//! relsync polls a release index (the GitHub releases API by default) for the
//! latest release of one repository, and when it changes:
//!
//! 1. downloads the asset whose name matches a pattern
//! 2. hashes it with SHA-256
//! 3. extracts it into a staging directory, rejecting any entry that would
//!    escape it
//! 4. checks that a marker file (`index.html` by default) is present
//! 5. copies the staged tree over the destination directory
//! 6. records what was applied in `{destination}/.state.json`
//!
//! The record is written last, so an interrupted cycle is simply redone on
//! the next run, and a destination is never marked as holding a release that
//! was only partially applied.
//!
//! # Modules
//!
//! - [`release`] - Release index client, asset selection, streaming download
//! - [`checksum`] - SHA-256 of downloaded archives
//! - [`archive`] - Zip-slip validation, staging, and overlay copy
//! - [`state`] - Persisted record of the applied release
//! - [`pipeline`] - One check-and-apply cycle, and the interval scheduler
//! - [`config`] - Config file and flag precedence
//! - [`cli`] - Command-line interface
//! - [`core`] - Error types and user-facing error reports
//! - [`utils`] - Atomic writes, directory helpers, progress bar
//!
//! # Example
//!
//! ```rust,no_run
//! use relsync_cli::config::{Overrides, SyncConfig};
//! use relsync_cli::pipeline::{PipelineConfig, UpdatePipeline};
//! use relsync_cli::release::ReleaseFetcher;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let settings = SyncConfig::default().resolve(&Overrides {
//!     repo: Some("owner/site".to_string()),
//!     destination: Some("/srv/www".into()),
//!     ..Overrides::default()
//! })?;
//!
//! let fetcher = ReleaseFetcher::new(settings.api_base.clone(), settings.timeout, None)?;
//! let pipeline = UpdatePipeline::new(
//!     PipelineConfig {
//!         repo: settings.repo,
//!         asset_pattern: settings.asset_pattern,
//!         destination: settings.destination,
//!         marker_file: settings.marker_file,
//!         show_progress: false,
//!     },
//!     fetcher,
//! );
//! let outcome = pipeline.run_one_cycle().await?;
//! println!("{outcome:?}");
//! # Ok(())
//! # }
//! ```

pub mod archive;
pub mod checksum;
pub mod cli;
pub mod config;
pub mod constants;
pub mod core;
pub mod pipeline;
pub mod release;
pub mod state;
pub mod utils;
