//! SHA-256 content digests for downloaded archives.
//!
//! The digest is recorded in the applied-state file so operators can audit
//! exactly which bytes were deployed. Files are streamed in fixed-size
//! chunks, so memory use stays flat regardless of archive size.

use sha2::{Digest, Sha256};
use std::path::Path;
use tokio::fs::File;
use tokio::io::AsyncReadExt;
use tracing::debug;

use crate::constants::HASH_CHUNK_SIZE;
use crate::core::SyncError;

/// Compute the SHA-256 digest of a file.
///
/// # Returns
///
/// The digest as 64 lowercase hexadecimal characters, without prefix.
///
/// # Errors
///
/// Returns [`SyncError::FileSystem`] if the file cannot be opened or read.
///
/// # Examples
///
/// ```rust,no_run
/// use relsync_cli::checksum::compute_sha256;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), relsync_cli::core::SyncError> {
/// let digest = compute_sha256(Path::new("release.zip")).await?;
/// assert_eq!(digest.len(), 64);
/// # Ok(())
/// # }
/// ```
pub async fn compute_sha256(path: &Path) -> Result<String, SyncError> {
    debug!("Computing SHA256 checksum for: {}", path.display());

    let mut file = File::open(path).await.map_err(|e| SyncError::fs("open", path, e))?;
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; HASH_CHUNK_SIZE];

    loop {
        let read = file.read(&mut buffer).await.map_err(|e| SyncError::fs("read", path, e))?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }

    Ok(hex::encode(hasher.finalize()))
}
