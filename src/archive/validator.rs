//! Zip-slip protection for release archives.
//!
//! Archives come from a third-party host and are treated as untrusted. Every
//! entry name is normalized and checked before anything is written; a single
//! unsafe entry aborts the whole extraction.

use std::io::{Read, Seek};
use std::path::{Component, Path, PathBuf};
use zip::ZipArchive;

use crate::core::SyncError;

/// An archive entry whose path stays inside the extraction root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SafeEntry {
    /// Position of the entry in the archive's central directory.
    pub index: usize,
    /// Entry path relative to the extraction root, built from normal components only.
    pub relative_path: PathBuf,
}

/// Normalizes an archive entry name into a relative path.
///
/// Backslashes are treated as separators. Returns `Ok(None)` for entries that
/// carry no content (empty names and directories), since directories are
/// created implicitly for the files inside them.
///
/// # Errors
///
/// Returns [`SyncError::PathTraversal`] if the name is absolute, carries a
/// drive prefix, or contains a `..` segment anywhere.
///
/// # Examples
///
/// ```rust
/// use relsync_cli::archive::validator::normalize_entry_path;
/// use std::path::PathBuf;
///
/// let path = normalize_entry_path("assets\\app.js").unwrap();
/// assert_eq!(path, Some(PathBuf::from("assets").join("app.js")));
///
/// assert!(normalize_entry_path("../outside.txt").is_err());
/// assert_eq!(normalize_entry_path("assets/").unwrap(), None);
/// ```
pub fn normalize_entry_path(name: &str) -> Result<Option<PathBuf>, SyncError> {
    let normalized = name.replace('\\', "/");
    if normalized.is_empty() || normalized.ends_with('/') {
        return Ok(None);
    }

    let reject = || SyncError::PathTraversal {
        entry: name.to_string(),
    };

    if normalized.starts_with('/') {
        return Err(reject());
    }

    let mut relative = PathBuf::new();
    for (position, segment) in normalized.split('/').enumerate() {
        match segment {
            "" | "." => {}
            ".." => return Err(reject()),
            // "C:" as a first segment would make the joined path absolute on Windows.
            s if position == 0 && has_drive_prefix(s) => return Err(reject()),
            s => relative.push(s),
        }
    }

    // Belt over the string checks: whatever the platform parses must be plain names.
    if !relative.components().all(|c| matches!(c, Component::Normal(_))) {
        return Err(reject());
    }

    if relative.as_os_str().is_empty() { Ok(None) } else { Ok(Some(relative)) }
}

fn has_drive_prefix(segment: &str) -> bool {
    let bytes = segment.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

/// Lazy sequence of the safe file entries of a zip archive.
///
/// Yields entries in central-directory order, skipping directories. The
/// first unsafe or unreadable entry is yielded as an error; callers are
/// expected to stop there (collecting into `Result<Vec<_>, _>` does).
pub struct SafeEntries<'a, R> {
    archive: &'a mut ZipArchive<R>,
    next: usize,
}

impl<'a, R: Read + Seek> SafeEntries<'a, R> {
    /// Starts validating `archive` from its first entry.
    pub fn new(archive: &'a mut ZipArchive<R>) -> Self {
        Self {
            archive,
            next: 0,
        }
    }
}

impl<R: Read + Seek> Iterator for SafeEntries<'_, R> {
    type Item = Result<SafeEntry, SyncError>;

    fn next(&mut self) -> Option<Self::Item> {
        while self.next < self.archive.len() {
            let index = self.next;
            self.next += 1;

            let name = match self.archive.by_index_raw(index) {
                Ok(entry) => entry.name().to_string(),
                Err(e) => {
                    return Some(Err(SyncError::MalformedArchive {
                        reason: format!("cannot read entry #{index}: {e}"),
                    }));
                }
            };

            match normalize_entry_path(&name) {
                Ok(Some(relative_path)) => {
                    return Some(Ok(SafeEntry {
                        index,
                        relative_path,
                    }));
                }
                Ok(None) => continue,
                Err(e) => return Some(Err(e)),
            }
        }
        None
    }
}

/// Validates every entry of `archive` and returns the file entries.
///
/// Nothing is written to disk; the extractor calls this before creating the
/// first staged file.
pub fn validate_archive<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
) -> Result<Vec<SafeEntry>, SyncError> {
    SafeEntries::new(archive).collect()
}

/// Whether `path` is a plain relative path (used for the marker file name).
pub fn is_plain_relative(path: &Path) -> bool {
    !path.as_os_str().is_empty() && path.components().all(|c| matches!(c, Component::Normal(_)))
}
