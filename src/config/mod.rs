//! Configuration for relsync.
//!
//! Settings come from three layers, highest precedence first:
//!
//! 1. Command-line flags ([`Overrides`])
//! 2. The optional config file ([`SyncConfig`])
//! 3. Built-in defaults from [`crate::constants`]
//!
//! # File Location
//!
//! - **Unix/macOS**: `~/.relsync/config.toml`
//! - **Windows**: `%LOCALAPPDATA%\relsync\config.toml`
//!
//! Overridable with `--config <PATH>` or the `RELSYNC_CONFIG` environment
//! variable. A missing file is the same as an empty one.
//!
//! # File Format
//!
//! ```toml
//! repo = "owner/site"
//! asset_pattern = '^web-.*\.zip$'
//! destination = "~/www"
//! interval_seconds = 3600
//! timeout_seconds = 30
//! api_base = "https://api.github.com"
//! marker_file = "index.html"
//! ```
//!
//! The access token is never read from this file; it comes from the
//! command line or the environment only.

use anyhow::{Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::constants::{
    DEFAULT_API_BASE, DEFAULT_ASSET_PATTERN, DEFAULT_INTERVAL_SECONDS, DEFAULT_MARKER_FILE,
    DEFAULT_TIMEOUT_SECONDS,
};
use crate::core::SyncError;
use crate::release::validate_repo;

/// Contents of the optional config file. Every key may be omitted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SyncConfig {
    /// Repository identifier (`owner/name`).
    pub repo: Option<String>,
    /// Regular expression selecting the release asset.
    pub asset_pattern: Option<String>,
    /// Destination directory; `~` and `$VAR` are expanded.
    pub destination: Option<String>,
    /// Seconds between the end of one cycle and the start of the next.
    pub interval_seconds: Option<u64>,
    /// Network timeout for connecting and for each read, in seconds.
    pub timeout_seconds: Option<u64>,
    /// Base URL of the release index API.
    pub api_base: Option<String>,
    /// File that must exist at the top of every archive.
    pub marker_file: Option<String>,
}

/// Values given on the command line; `None` defers to the file or default.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overrides {
    pub repo: Option<String>,
    pub asset_pattern: Option<String>,
    pub destination: Option<PathBuf>,
    pub interval_seconds: Option<u64>,
    pub timeout_seconds: Option<u64>,
    pub api_base: Option<String>,
}

/// Fully resolved settings for one destination.
#[derive(Debug, Clone)]
pub struct Settings {
    pub repo: String,
    pub asset_pattern: Regex,
    pub destination: PathBuf,
    pub interval: Duration,
    pub timeout: Duration,
    pub api_base: String,
    pub marker_file: PathBuf,
}

impl SyncConfig {
    /// Loads the config file at `path`, or at [`default_path`](Self::default_path)
    /// when `path` is `None`. A missing file yields the empty config.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub async fn load_with_optional(path: Option<PathBuf>) -> Result<Self> {
        let path = match path {
            Some(path) => path,
            None => match Self::default_path() {
                Ok(path) => path,
                Err(_) => return Ok(Self::default()),
            },
        };

        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            Self::load_from(&path).await
        } else {
            tracing::debug!("No config file at {}; using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Loads the config file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not valid TOML, or
    /// contains unknown keys.
    pub async fn load_from(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config from {}", path.display()))
    }

    /// Platform default location of the config file.
    ///
    /// # Errors
    ///
    /// Returns an error if the home (or local data) directory is unknown.
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = if cfg!(target_os = "windows") {
            dirs::data_local_dir()
                .ok_or_else(|| anyhow::anyhow!("Unable to determine local data directory"))?
                .join("relsync")
        } else {
            dirs::home_dir()
                .ok_or_else(|| anyhow::anyhow!("Unable to determine home directory"))?
                .join(".relsync")
        };

        Ok(config_dir.join("config.toml"))
    }

    /// Destination directory after applying `cli` over this file.
    ///
    /// Falls back to the current directory when neither names one.
    pub fn resolve_destination(&self, cli: Option<&Path>) -> Result<PathBuf, SyncError> {
        match (cli, self.destination.as_deref()) {
            (Some(path), _) => Ok(path.to_path_buf()),
            (None, Some(raw)) => expand_path(raw),
            (None, None) => std::env::current_dir()
                .map_err(|e| SyncError::fs("resolve current directory", Path::new("."), e)),
        }
    }

    /// Merges `overrides` over this file and the built-in defaults.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Config`] when no repository is given anywhere,
    /// the repository is not `owner/name`, the pattern does not compile, or
    /// the marker file is not a plain relative path.
    pub fn resolve(&self, overrides: &Overrides) -> Result<Settings, SyncError> {
        let repo = overrides.repo.clone().or_else(|| self.repo.clone()).ok_or_else(|| {
            SyncError::Config {
                message: "no repository given; pass --repo or set `repo` in the config file"
                    .to_string(),
            }
        })?;
        validate_repo(&repo)?;

        let pattern = overrides
            .asset_pattern
            .as_deref()
            .or(self.asset_pattern.as_deref())
            .unwrap_or(DEFAULT_ASSET_PATTERN);
        let asset_pattern = Regex::new(pattern).map_err(|e| SyncError::Config {
            message: format!("invalid asset pattern '{pattern}': {e}"),
        })?;

        let marker_file =
            PathBuf::from(self.marker_file.as_deref().unwrap_or(DEFAULT_MARKER_FILE));
        if !crate::archive::validator::is_plain_relative(&marker_file) {
            return Err(SyncError::Config {
                message: format!("marker file '{}' must be a relative path", marker_file.display()),
            });
        }

        let interval_seconds = overrides
            .interval_seconds
            .or(self.interval_seconds)
            .unwrap_or(DEFAULT_INTERVAL_SECONDS);
        let timeout_seconds =
            overrides.timeout_seconds.or(self.timeout_seconds).unwrap_or(DEFAULT_TIMEOUT_SECONDS);

        Ok(Settings {
            repo,
            asset_pattern,
            destination: self.resolve_destination(overrides.destination.as_deref())?,
            interval: Duration::from_secs(interval_seconds),
            timeout: Duration::from_secs(timeout_seconds.max(1)),
            api_base: overrides
                .api_base
                .clone()
                .or_else(|| self.api_base.clone())
                .unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            marker_file,
        })
    }
}

/// Expands `~` and `$VAR` references in a configured path.
fn expand_path(raw: &str) -> Result<PathBuf, SyncError> {
    shellexpand::full(raw).map(|s| PathBuf::from(s.into_owned())).map_err(|e| SyncError::Config {
        message: format!("cannot expand destination '{raw}': {e}"),
    })
}
