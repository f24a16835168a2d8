//! Staged extraction and overlay of a release archive onto a destination.
//!
//! The archive is fully materialized in a staging directory first. Only when
//! every entry validated, every byte decompressed, and the marker file is
//! present does anything get copied into the live destination.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;
use zip::ZipArchive;

use super::validator::{is_plain_relative, validate_archive};
use crate::core::SyncError;
use crate::utils::fs::{copy_preserving_mtime, ensure_dir, remove_dir_if_exists};

/// Result of a successful [`Extractor::stage_and_apply`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractSummary {
    /// Number of files written to the staging directory.
    pub staged_files: usize,
    /// Number of files copied into the destination.
    pub copied_files: usize,
}

/// Unpacks a release archive through a staging directory.
///
/// # Examples
///
/// ```rust,no_run
/// use relsync_cli::archive::Extractor;
/// use std::path::Path;
///
/// # fn example() -> Result<(), relsync_cli::core::SyncError> {
/// let extractor = Extractor::new("index.html");
/// let summary = extractor.stage_and_apply(
///     Path::new("/srv/www/.relsync_download.zip"),
///     Path::new("/srv/www"),
///     Path::new("/srv/www/.relsync_staging"),
/// )?;
/// println!("copied {} files", summary.copied_files);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Extractor {
    marker_file: PathBuf,
}

impl Extractor {
    /// Creates an extractor that requires `marker_file` at the top of the archive.
    pub fn new(marker_file: impl Into<PathBuf>) -> Self {
        Self {
            marker_file: marker_file.into(),
        }
    }

    /// Extracts `archive_path` into `staging_root`, checks the marker file,
    /// then copies the staged tree over `destination_root`.
    ///
    /// # Process
    ///
    /// 1. Remove `staging_root` if a previous run left it behind, recreate it empty
    /// 2. Validate every archive entry (nothing is written if one is unsafe)
    /// 3. Decompress each file entry under `staging_root`
    /// 4. Require the marker file directly under `staging_root`
    /// 5. Copy every staged file to the same relative path under `destination_root`
    ///
    /// Files already in the destination but absent from the archive are left
    /// in place. Each copy is independent, so re-running after a failure
    /// converges on the same tree.
    ///
    /// # Errors
    ///
    /// - [`SyncError::PathTraversal`] if any entry escapes the root; the
    ///   destination is not touched and staging stays empty
    /// - [`SyncError::MalformedArchive`] if the file is not a readable zip or
    ///   the marker is missing; the destination is not touched
    /// - [`SyncError::FileSystem`] for local I/O failures
    pub fn stage_and_apply(
        &self,
        archive_path: &Path,
        destination_root: &Path,
        staging_root: &Path,
    ) -> Result<ExtractSummary, SyncError> {
        if !is_plain_relative(&self.marker_file) {
            return Err(SyncError::Config {
                message: format!(
                    "marker file must be a relative path without '..': {}",
                    self.marker_file.display()
                ),
            });
        }

        debug!("Resetting staging directory {}", staging_root.display());
        remove_dir_if_exists(staging_root)?;
        ensure_dir(staging_root)?;

        let staged_files = self.stage(archive_path, staging_root)?;

        let marker = staging_root.join(&self.marker_file);
        if !marker.is_file() {
            return Err(SyncError::MalformedArchive {
                reason: format!(
                    "required file '{}' not found at the top level of the archive",
                    self.marker_file.display()
                ),
            });
        }

        let copied_files = overlay(staging_root, destination_root)?;
        info!(
            "Applied {} file(s) from {} to {}",
            copied_files,
            archive_path.display(),
            destination_root.display()
        );

        Ok(ExtractSummary {
            staged_files,
            copied_files,
        })
    }

    fn stage(&self, archive_path: &Path, staging_root: &Path) -> Result<usize, SyncError> {
        let file = File::open(archive_path).map_err(|e| SyncError::fs("open", archive_path, e))?;
        let mut archive =
            ZipArchive::new(BufReader::new(file)).map_err(|e| SyncError::MalformedArchive {
                reason: format!("{}: {e}", archive_path.display()),
            })?;

        let entries = validate_archive(&mut archive)?;
        debug!("Archive validated: {} file entries", entries.len());

        for entry in &entries {
            let target = staging_root.join(&entry.relative_path);
            if let Some(parent) = target.parent() {
                ensure_dir(parent)?;
            }

            let mut source =
                archive.by_index(entry.index).map_err(|e| SyncError::MalformedArchive {
                    reason: format!("cannot read {}: {e}", entry.relative_path.display()),
                })?;
            let mut output = File::create(&target).map_err(|e| SyncError::fs("create", &target, e))?;
            std::io::copy(&mut source, &mut output).map_err(|e| {
                // Decompression failures surface as io errors from the entry reader.
                if e.kind() == std::io::ErrorKind::InvalidData {
                    SyncError::MalformedArchive {
                        reason: format!("corrupt entry {}: {e}", entry.relative_path.display()),
                    }
                } else {
                    SyncError::fs("write", &target, e)
                }
            })?;
        }

        Ok(entries.len())
    }
}

/// Copies every file under `staging_root` to the same relative path under
/// `destination_root`. Returns the number of files copied.
fn overlay(staging_root: &Path, destination_root: &Path) -> Result<usize, SyncError> {
    ensure_dir(destination_root)?;

    let mut copied = 0;
    for entry in WalkDir::new(staging_root).min_depth(1) {
        let entry = entry.map_err(|e| SyncError::FileSystem {
            operation: "walk staging directory".to_string(),
            path: staging_root.display().to_string(),
            reason: e.to_string(),
        })?;
        if !entry.file_type().is_file() {
            continue;
        }

        let relative = entry.path().strip_prefix(staging_root).map_err(|e| {
            SyncError::FileSystem {
                operation: "resolve staged path".to_string(),
                path: entry.path().display().to_string(),
                reason: e.to_string(),
            }
        })?;
        copy_preserving_mtime(entry.path(), &destination_root.join(relative))?;
        copied += 1;
    }

    Ok(copied)
}

/// Lists every regular file under `root` relative to it, sorted. Used by
/// `relsync status` and by tests comparing destination trees.
pub fn list_files(root: &Path) -> Result<Vec<PathBuf>, SyncError> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root).min_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|e| SyncError::FileSystem {
            operation: "walk directory".to_string(),
            path: root.display().to_string(),
            reason: e.to_string(),
        })?;
        if entry.file_type().is_file()
            && let Ok(relative) = entry.path().strip_prefix(root)
        {
            files.push(relative.to_path_buf());
        }
    }
    Ok(files)
}

/// Reads every file under `root` into memory keyed by relative path.
#[cfg(test)]
pub(crate) fn snapshot(root: &Path) -> std::collections::BTreeMap<PathBuf, Vec<u8>> {
    list_files(root)
        .unwrap()
        .into_iter()
        .map(|rel| {
            let content = std::fs::read(root.join(&rel)).unwrap();
            (rel, content)
        })
        .collect()
}
