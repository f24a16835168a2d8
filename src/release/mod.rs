//! Release index queries and asset downloads.
//!
//! [`ReleaseFetcher`] talks to a GitHub-compatible release API:
//!
//! ```text
//! GET {api_base}/repos/{owner}/{repo}/releases/latest
//! Accept: application/vnd.github+json
//! Authorization: Bearer <token>        (optional)
//! ```
//!
//! The response's `tag_name` and the first asset whose `name` matches the
//! configured pattern identify the release. Matching is first-match in the
//! order the API lists assets, not best-match.

use regex::Regex;
use reqwest::StatusCode;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue};
use serde_json::Value;
use std::path::Path;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::constants::{GITHUB_ACCEPT, user_agent};
use crate::core::SyncError;
use crate::utils::DownloadProgress;

/// One downloadable file attached to a release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseAsset {
    /// File name as published (e.g. `web-app.zip`).
    pub name: String,
    /// Direct download URL.
    pub download_url: String,
    /// Last modification timestamp reported by the index, if any.
    pub updated_at: Option<String>,
    /// Advertised size in bytes, if any.
    pub size: Option<u64>,
}

/// The latest release's version tag together with the selected asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LatestRelease {
    /// Version tag, e.g. `v1.2.3`.
    pub tag: String,
    /// First asset whose name matched the pattern.
    pub asset: ReleaseAsset,
}

/// Checks that `repo` has the `owner/name` shape the index expects.
pub fn validate_repo(repo: &str) -> Result<(), SyncError> {
    let mut parts = repo.split('/');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(owner), Some(name), None) if !owner.trim().is_empty() && !name.trim().is_empty() => {
            Ok(())
        }
        _ => Err(SyncError::Config {
            message: format!("repository must look like 'owner/name', got '{repo}'"),
        }),
    }
}

/// Picks the version tag and the first matching asset out of a release document.
///
/// Assets without a string `name` or `browser_download_url` are skipped.
/// A non-string `updated_at` or non-integer `size` is treated as absent.
///
/// # Errors
///
/// - [`SyncError::Protocol`] if the document is not a JSON object
/// - [`SyncError::NotFound`] if `tag_name` is missing or empty, or no asset matches
///
/// # Examples
///
/// ```rust
/// use regex::Regex;
/// use relsync_cli::release::select_release;
/// use serde_json::json;
///
/// let body = json!({
///     "tag_name": "v1.2.3",
///     "assets": [
///         {"name": "web-app.tar.gz", "browser_download_url": "https://example.com/a.tgz"},
///         {"name": "web-app.zip", "browser_download_url": "https://example.com/a.zip"}
///     ]
/// });
/// let release = select_release(&body, &Regex::new(r"^web-.*\.zip$").unwrap()).unwrap();
/// assert_eq!(release.tag, "v1.2.3");
/// assert_eq!(release.asset.name, "web-app.zip");
/// ```
pub fn select_release(body: &Value, pattern: &Regex) -> Result<LatestRelease, SyncError> {
    let object = body.as_object().ok_or_else(|| SyncError::Protocol {
        reason: "release document is not a JSON object".to_string(),
    })?;

    let tag = match object.get("tag_name").and_then(Value::as_str) {
        Some(tag) if !tag.is_empty() => tag.to_string(),
        _ => {
            return Err(SyncError::NotFound {
                what: "release tag (tag_name) in the latest release".to_string(),
            });
        }
    };

    let assets = object.get("assets").and_then(Value::as_array).map(Vec::as_slice).unwrap_or(&[]);

    let asset = assets
        .iter()
        .filter_map(parse_asset)
        .find(|asset| pattern.is_match(&asset.name))
        .ok_or_else(|| SyncError::NotFound {
            what: format!("asset matching '{}' in release {tag}", pattern.as_str()),
        })?;

    Ok(LatestRelease {
        tag,
        asset,
    })
}

fn parse_asset(value: &Value) -> Option<ReleaseAsset> {
    let name = value.get("name")?.as_str()?;
    let download_url = value.get("browser_download_url")?.as_str()?;
    Some(ReleaseAsset {
        name: name.to_string(),
        download_url: download_url.to_string(),
        updated_at: value.get("updated_at").and_then(Value::as_str).map(str::to_string),
        size: value.get("size").and_then(Value::as_u64),
    })
}

/// Maps a non-success HTTP status to an error kind.
fn status_error(operation: &str, status: StatusCode, body: &str) -> SyncError {
    let snippet: String = body.chars().take(160).collect();
    let reason = if snippet.is_empty() {
        format!("HTTP {status}")
    } else {
        format!("HTTP {status}: {snippet}")
    };

    match status {
        StatusCode::NOT_FOUND => SyncError::NotFound {
            what: format!("{operation} ({reason})"),
        },
        // GitHub answers 403 when the unauthenticated rate limit is exhausted.
        StatusCode::FORBIDDEN | StatusCode::REQUEST_TIMEOUT | StatusCode::TOO_MANY_REQUESTS => {
            SyncError::TransientNetwork {
                operation: operation.to_string(),
                reason,
            }
        }
        s if s.is_server_error() => SyncError::TransientNetwork {
            operation: operation.to_string(),
            reason,
        },
        _ => SyncError::Protocol {
            reason: format!("{operation}: {reason}"),
        },
    }
}

/// HTTP client for the release index and asset downloads.
#[derive(Debug, Clone)]
pub struct ReleaseFetcher {
    client: reqwest::Client,
    api_base: String,
}

impl ReleaseFetcher {
    /// Builds a fetcher for `api_base` (e.g. `https://api.github.com`).
    ///
    /// `timeout` bounds connecting and each individual read, not the whole
    /// transfer: a large download keeps going as long as bytes keep arriving.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Config`] if the token contains characters that
    /// cannot appear in an HTTP header, or the client cannot be built.
    pub fn new(
        api_base: impl Into<String>,
        timeout: Duration,
        token: Option<&str>,
    ) -> Result<Self, SyncError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(GITHUB_ACCEPT));
        if let Some(token) = token.filter(|t| !t.is_empty()) {
            let mut value =
                HeaderValue::from_str(&format!("Bearer {token}")).map_err(|_| SyncError::Config {
                    message: "token contains characters not allowed in an HTTP header".to_string(),
                })?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let client = reqwest::Client::builder()
            .user_agent(user_agent())
            .default_headers(headers)
            .connect_timeout(timeout)
            .read_timeout(timeout)
            .build()
            .map_err(|e| SyncError::Config {
                message: format!("cannot build HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
        })
    }

    /// URL of the latest-release document for `repo`.
    pub fn latest_release_url(&self, repo: &str) -> String {
        format!("{}/repos/{}/releases/latest", self.api_base, repo)
    }

    /// Fetches the latest release of `repo` and selects the asset matching `pattern`.
    ///
    /// Issues exactly one GET request.
    pub async fn fetch_latest(
        &self,
        repo: &str,
        pattern: &Regex,
    ) -> Result<LatestRelease, SyncError> {
        let url = self.latest_release_url(repo);
        debug!("Fetching latest release from {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| SyncError::from_reqwest("release lookup", &e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error("release lookup", status, &body));
        }

        let bytes =
            response.bytes().await.map_err(|e| SyncError::from_reqwest("release lookup", &e))?;
        let body: Value = serde_json::from_slice(&bytes).map_err(|e| SyncError::Protocol {
            reason: format!("release document is not valid JSON: {e}"),
        })?;

        let release = select_release(&body, pattern)?;
        debug!("Latest release {} provides asset {}", release.tag, release.asset.name);
        Ok(release)
    }

    /// Streams `asset` to `dest`, replacing any file left by an earlier attempt.
    ///
    /// Returns the number of bytes written. The file is synced to disk before
    /// returning.
    pub async fn download(
        &self,
        asset: &ReleaseAsset,
        dest: &Path,
        show_progress: bool,
    ) -> Result<u64, SyncError> {
        match tokio::fs::remove_file(dest).await {
            Ok(()) => debug!("Discarded previous download at {}", dest.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(SyncError::fs("remove file", dest, e)),
        }
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| SyncError::fs("create directory", parent, e))?;
        }

        info!("Downloading {} from {}", asset.name, asset.download_url);
        let mut response = self
            .client
            .get(&asset.download_url)
            .send()
            .await
            .map_err(|e| SyncError::from_reqwest("asset download", &e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error("asset download", status, &body));
        }

        let progress = DownloadProgress::new(response.content_length().or(asset.size), show_progress);
        let mut file =
            tokio::fs::File::create(dest).await.map_err(|e| SyncError::fs("create", dest, e))?;
        let mut written: u64 = 0;

        // A failing body stream is a dropped or stalled connection, never bad data.
        while let Some(chunk) = response.chunk().await.map_err(|e| SyncError::TransientNetwork {
            operation: "asset download".to_string(),
            reason: e.to_string(),
        })? {
            file.write_all(&chunk).await.map_err(|e| SyncError::fs("write", dest, e))?;
            written += chunk.len() as u64;
            progress.inc(chunk.len() as u64);
        }

        file.flush().await.map_err(|e| SyncError::fs("write", dest, e))?;
        file.sync_all().await.map_err(|e| SyncError::fs("sync", dest, e))?;
        progress.finish_and_clear();

        debug!("Downloaded {} bytes to {}", written, dest.display());
        Ok(written)
    }
}
