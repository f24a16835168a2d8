//! Global constants used throughout the relsync codebase.
//!
//! Timeouts, intervals, and the names of the working files relsync keeps
//! inside a destination directory. Defining them centrally keeps the CLI,
//! config layer, and pipeline in agreement.

use std::time::Duration;

/// Default delay between the end of one sync cycle and the start of the next (2 hours).
pub const DEFAULT_INTERVAL_SECONDS: u64 = 2 * 60 * 60;

/// Default network timeout applied to every HTTP request (60 seconds).
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 60;

/// Lower bound for the poll interval so a zero interval cannot spin.
pub const MIN_INTERVAL: Duration = Duration::from_secs(1);

/// Base URL of the release index API.
pub const DEFAULT_API_BASE: &str = "https://api.github.com";

/// Asset name pattern used when neither the CLI nor the config file sets one.
pub const DEFAULT_ASSET_PATTERN: &str = r"^web-.*\.zip$";

/// Media type requested from the release index.
pub const GITHUB_ACCEPT: &str = "application/vnd.github+json";

/// Environment variables consulted, in order, for a bearer token.
pub const TOKEN_ENV_VARS: &[&str] = &["GITHUB_TOKEN", "GH_TOKEN"];

/// File that must exist at the top level of an extracted archive.
pub const DEFAULT_MARKER_FILE: &str = "index.html";

/// Applied-state record, relative to the destination directory.
pub const STATE_FILE_NAME: &str = ".state.json";

/// Staging directory, relative to the destination directory.
pub const STAGING_DIR_NAME: &str = ".relsync_staging";

/// Downloaded archive, relative to the destination directory.
pub const DOWNLOAD_FILE_NAME: &str = ".relsync_download.zip";

/// Read size used when hashing files (1 MiB).
pub const HASH_CHUNK_SIZE: usize = 1024 * 1024;

/// User agent sent with every request.
pub fn user_agent() -> String {
    format!("relsync/{}", env!("CARGO_PKG_VERSION"))
}
