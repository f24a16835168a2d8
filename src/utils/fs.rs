//! File system helpers shared by the state store and the extractor.
//!
//! All helpers are synchronous; async callers run them on a blocking worker.

use std::fs;
use std::io::Write;
use std::path::Path;

use crate::core::SyncError;

/// Creates a directory and all of its parents if they do not exist yet.
pub fn ensure_dir(path: &Path) -> Result<(), SyncError> {
    fs::create_dir_all(path).map_err(|e| SyncError::fs("create directory", path, e))
}

/// Removes a directory tree if it exists. A missing directory is not an error.
pub fn remove_dir_if_exists(path: &Path) -> Result<(), SyncError> {
    match fs::remove_dir_all(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(SyncError::fs("remove directory", path, e)),
    }
}

/// Atomically writes bytes to a file using a write-then-rename strategy.
///
/// 1. Write content to a sibling temporary file (`.tmp` extension)
/// 2. Sync the temporary file to disk
/// 3. Rename it over the target path
///
/// Readers see either the previous content or the new content, never a
/// partial write. Parent directories are created as needed.
///
/// # Examples
///
/// ```rust,no_run
/// use relsync_cli::utils::fs::atomic_write;
/// use std::path::Path;
///
/// # fn example() -> Result<(), relsync_cli::core::SyncError> {
/// atomic_write(Path::new("/srv/www/.state.json"), b"{}")?;
/// # Ok(())
/// # }
/// ```
pub fn atomic_write(path: &Path, content: &[u8]) -> Result<(), SyncError> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }

    let temp_path = path.with_extension("tmp");

    {
        let mut file =
            fs::File::create(&temp_path).map_err(|e| SyncError::fs("create", &temp_path, e))?;
        file.write_all(content).map_err(|e| SyncError::fs("write", &temp_path, e))?;
        file.sync_all().map_err(|e| SyncError::fs("sync", &temp_path, e))?;
    }

    fs::rename(&temp_path, path).map_err(|e| SyncError::fs("rename", path, e))
}

/// Copies a file, keeping the source's permissions and modification time.
///
/// Parent directories of `dest` are created as needed and an existing file
/// at `dest` is overwritten.
pub fn copy_preserving_mtime(src: &Path, dest: &Path) -> Result<(), SyncError> {
    if let Some(parent) = dest.parent() {
        ensure_dir(parent)?;
    }

    fs::copy(src, dest).map_err(|e| SyncError::fs("copy", dest, e))?;

    let modified = fs::metadata(src)
        .and_then(|m| m.modified())
        .map_err(|e| SyncError::fs("read metadata", src, e))?;
    fs::File::options()
        .write(true)
        .open(dest)
        .and_then(|f| f.set_modified(modified))
        .map_err(|e| SyncError::fs("set modification time", dest, e))
}
