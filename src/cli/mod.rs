//! Command-line interface for relsync.
//!
//! # Commands
//!
//! - `sync` - Keep a directory in step with a repository's latest release
//! - `check` - Report whether a newer release is available, without downloading
//! - `status` - Show what is currently applied in a directory
//!
//! # Global Options
//!
//! - `--verbose` - Enable debug output
//! - `--quiet` - Only log errors
//! - `--no-progress` - Disable the download progress bar
//! - `--config <PATH>` - Use an alternate config file (also `RELSYNC_CONFIG`)
//!
//! # Examples
//!
//! ```bash
//! # Poll every two hours, forever
//! relsync sync --repo owner/site --dest /srv/www
//!
//! # One cycle, suitable for cron
//! relsync sync --repo owner/site --dest /srv/www --once
//!
//! # What would happen?
//! relsync check --repo owner/site --dest /srv/www
//!
//! # What is deployed?
//! relsync status --dest /srv/www --format json
//! ```
//!
//! Logs go to stderr; command output (check results, status) goes to stdout.

mod check;
mod status;
mod sync;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use crate::config::{Overrides, Settings, SyncConfig};
use crate::constants::TOKEN_ENV_VARS;
use crate::pipeline::{PipelineConfig, UpdatePipeline};
use crate::release::ReleaseFetcher;

pub use check::CheckCommand;
pub use status::{OutputFormat, StatusCommand};
pub use sync::SyncCommand;

/// Main CLI structure for relsync.
#[derive(Parser, Debug)]
#[command(
    name = "relsync",
    about = "Keep a directory in sync with the latest release of a repository",
    version,
    long_about = "relsync polls a repository's latest release, downloads the asset matching a \
                  pattern, verifies and safely extracts it, and overlays it onto a destination \
                  directory."
)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug output.
    ///
    /// Equivalent to `RUST_LOG=debug`; an explicit `RUST_LOG` still wins.
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log errors.
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Path to the config file.
    ///
    /// Defaults to `~/.relsync/config.toml` (`%LOCALAPPDATA%\relsync\config.toml`
    /// on Windows).
    #[arg(short, long, global = true, env = "RELSYNC_CONFIG")]
    config: Option<PathBuf>,

    /// Disable the download progress bar.
    ///
    /// The bar is also hidden automatically when stderr is not a terminal.
    #[arg(long, global = true)]
    no_progress: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Download and apply new releases, once or on an interval
    Sync(SyncCommand),

    /// Check whether a newer release is available without downloading it
    Check(CheckCommand),

    /// Show the release currently applied to a directory
    Status(StatusCommand),
}

/// Runtime options derived from the global flags.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CliConfig {
    /// Default log filter when `RUST_LOG` is unset.
    pub log_level: String,
    /// Whether to hide the download progress bar.
    pub no_progress: bool,
    /// Explicit config file path.
    pub config_path: Option<PathBuf>,
}

impl Cli {
    /// Executes the parsed command.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the command fails.
    /// Failed sync cycles are logged and do not count as command failure.
    pub async fn execute(self) -> Result<()> {
        let config = self.build_config();
        init_logging(&config);
        self.execute_with_config(config).await
    }

    /// Translates the global flags into a [`CliConfig`].
    #[must_use]
    pub fn build_config(&self) -> CliConfig {
        let log_level = if self.verbose {
            "debug"
        } else if self.quiet {
            "error"
        } else {
            "info"
        };

        CliConfig {
            log_level: log_level.to_string(),
            no_progress: self.no_progress,
            config_path: self.config.clone(),
        }
    }

    /// Executes the command with an explicit configuration.
    ///
    /// Does not install a log subscriber.
    pub async fn execute_with_config(self, config: CliConfig) -> Result<()> {
        let file = SyncConfig::load_with_optional(config.config_path.clone()).await?;
        let show_progress = !config.no_progress;

        match self.command {
            Commands::Sync(cmd) => cmd.execute(&file, show_progress).await,
            Commands::Check(cmd) => cmd.execute(&file).await,
            Commands::Status(cmd) => cmd.execute(&file).await,
        }
    }
}

/// Installs the global `tracing` subscriber, writing to stderr.
///
/// `RUST_LOG` takes precedence over `config.log_level`. Timestamps are
/// RFC 3339 in UTC. Calling this more than once is harmless.
pub fn init_logging(config: &CliConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.as_str()));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Options naming the repository and destination, shared by `sync` and `check`.
#[derive(Args, Debug, Clone, Default)]
pub struct TargetArgs {
    /// Repository to follow, as `owner/name`
    #[arg(long)]
    pub repo: Option<String>,

    /// Regular expression selecting the release asset [default: ^web-.*\.zip$]
    #[arg(long, visible_alias = "asset-regex", value_name = "REGEX")]
    pub asset_pattern: Option<String>,

    /// Directory the release is applied to [default: current directory]
    #[arg(long, value_name = "DIR")]
    pub dest: Option<PathBuf>,

    /// Network timeout for connecting and for each read, in seconds [default: 60]
    #[arg(long, value_name = "SECONDS")]
    pub timeout_seconds: Option<u64>,

    /// Base URL of the release API [default: https://api.github.com]
    #[arg(long, value_name = "URL")]
    pub api_base: Option<String>,

    /// Access token; falls back to GITHUB_TOKEN, then GH_TOKEN
    #[arg(long)]
    pub token: Option<String>,
}

impl TargetArgs {
    fn overrides(&self) -> Overrides {
        Overrides {
            repo: self.repo.clone(),
            asset_pattern: self.asset_pattern.clone(),
            destination: self.dest.clone(),
            interval_seconds: None,
            timeout_seconds: self.timeout_seconds,
            api_base: self.api_base.clone(),
        }
    }

    fn token(&self) -> Option<String> {
        resolve_token(self.token.as_deref(), |name| std::env::var(name).ok())
    }
}

/// Picks the first non-empty token from the flag, then each variable in
/// [`TOKEN_ENV_VARS`].
fn resolve_token(flag: Option<&str>, lookup: impl Fn(&str) -> Option<String>) -> Option<String> {
    flag.map(str::to_string)
        .into_iter()
        .chain(TOKEN_ENV_VARS.iter().filter_map(|name| lookup(*name)))
        .find(|token| !token.trim().is_empty())
}

fn build_pipeline(
    settings: &Settings,
    token: Option<&str>,
    show_progress: bool,
) -> Result<UpdatePipeline> {
    let fetcher = ReleaseFetcher::new(settings.api_base.clone(), settings.timeout, token)
        .context("Failed to set up the HTTP client")?;

    Ok(UpdatePipeline::new(
        PipelineConfig {
            repo: settings.repo.clone(),
            asset_pattern: settings.asset_pattern.clone(),
            destination: settings.destination.clone(),
            marker_file: settings.marker_file.clone(),
            show_progress,
        },
        fetcher,
    ))
}
