//! Persisted record of what is currently deployed in a destination.
//!
//! The record lives at `{destination}/.state.json` and is the only baseline
//! the pipeline compares new releases against:
//!
//! ```json
//! {
//!   "repo": "owner/name",
//!   "tag": "v1.2.3",
//!   "asset_name": "web-app.zip",
//!   "asset_updated_at": "2024-05-01T10:00:00Z",
//!   "asset_size": 2048,
//!   "downloaded_at": "2024-05-01T12:00:00Z",
//!   "zip_sha256": "9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08"
//! }
//! ```
//!
//! A missing or unreadable record means "nothing applied yet", never an error.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::core::SyncError;
use crate::release::LatestRelease;
use crate::utils::fs::atomic_write;

/// What is currently on disk in the destination directory.
///
/// Written only after a fully successful extraction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedState {
    /// Repository identifier the release came from (`owner/name`).
    pub repo: String,
    /// Version tag of the applied release.
    pub tag: String,
    /// Name of the applied asset.
    pub asset_name: String,
    /// The asset's `updated_at` as reported by the index.
    #[serde(default)]
    pub asset_updated_at: Option<String>,
    /// The asset's advertised size in bytes.
    #[serde(default)]
    pub asset_size: Option<u64>,
    /// When the asset was downloaded and applied.
    pub downloaded_at: DateTime<Utc>,
    /// SHA-256 of the downloaded archive, lowercase hex.
    pub zip_sha256: String,
}

impl AppliedState {
    /// Builds the record for `release` applied now from an archive hashing to `digest`.
    pub fn from_release(repo: &str, release: &LatestRelease, digest: String) -> Self {
        Self {
            repo: repo.to_string(),
            tag: release.tag.clone(),
            asset_name: release.asset.name.clone(),
            asset_updated_at: release.asset.updated_at.clone(),
            asset_size: release.asset.size,
            downloaded_at: Utc::now(),
            zip_sha256: digest,
        }
    }

    /// Whether `release` is the one already applied.
    ///
    /// Compares the version tag, asset name, and asset `updated_at`; a
    /// re-uploaded asset under the same tag counts as a new release.
    pub fn matches(&self, release: &LatestRelease) -> bool {
        self.tag == release.tag
            && self.asset_name == release.asset.name
            && self.asset_updated_at == release.asset.updated_at
    }
}

/// Single-record store for [`AppliedState`].
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    /// Creates a store backed by the file at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
        }
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the stored record.
    ///
    /// Returns `None` when the file is missing, unreadable, or does not
    /// parse; the latter two are logged as warnings.
    pub fn load(&self) -> Option<AppliedState> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No applied state at {}", self.path.display());
                return None;
            }
            Err(e) => {
                warn!("Cannot read state file {}: {}; treating as empty", self.path.display(), e);
                return None;
            }
        };

        match serde_json::from_str(&content) {
            Ok(state) => Some(state),
            Err(e) => {
                warn!("Ignoring corrupt state file {}: {}", self.path.display(), e);
                None
            }
        }
    }

    /// Replaces the stored record with `state`.
    ///
    /// Written to a temporary file and renamed into place, so a crash leaves
    /// either the previous record or the new one.
    pub fn save(&self, state: &AppliedState) -> Result<(), SyncError> {
        let mut content = serde_json::to_string_pretty(state).map_err(|e| SyncError::FileSystem {
            operation: "serialize state".to_string(),
            path: self.path.display().to_string(),
            reason: e.to_string(),
        })?;
        content.push('\n');

        atomic_write(&self.path, content.as_bytes())?;
        debug!("Saved applied state to {}", self.path.display());
        Ok(())
    }
}
