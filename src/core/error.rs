//! Error handling for relsync
//!
//! This module provides the error type shared by every stage of the update
//! pipeline, plus user-friendly error reporting for the CLI. The design
//! follows two principles:
//! 1. **Strongly-typed errors** so the pipeline and scheduler can match on the
//!    kind of failure instead of on message text
//! 2. **User-friendly messages** with actionable suggestions for operators
//!
//! # Error Kinds
//!
//! | Variant | Raised when | Cycle handling |
//! |---------|-------------|----------------|
//! | [`SyncError::TransientNetwork`] | DNS, connect, timeout, 5xx, rate limit | logged, retried next interval |
//! | [`SyncError::Protocol`] | malformed or unexpected API response | logged, retried next interval |
//! | [`SyncError::NotFound`] | no release tag or no matching asset | logged, retried next interval |
//! | [`SyncError::PathTraversal`] | archive entry escapes the extraction root | nothing written to destination |
//! | [`SyncError::MalformedArchive`] | not a zip, or marker file missing | destination untouched |
//! | [`SyncError::FileSystem`] | local I/O failure | logged, retried next interval |
//! | [`SyncError::Config`] | invalid pattern or missing repository | reported before any cycle runs |
//!
//! An unreadable state file is not an error: it is logged and treated as
//! "nothing applied yet".
//!
//! # Examples
//!
//! ```rust,no_run
//! use relsync_cli::core::{SyncError, user_friendly_error};
//!
//! let error = SyncError::NotFound {
//!     what: "asset matching '^web-.*\\.zip$'".to_string(),
//! };
//! assert!(error.is_transient());
//!
//! let ctx = user_friendly_error(anyhow::Error::from(error));
//! ctx.display();
//! ```

use colored::Colorize;
use std::fmt;
use std::path::Path;
use thiserror::Error;

/// The main error type for relsync operations.
///
/// Every variant carries owned strings only, so errors can be cloned into
/// reports and logged after the underlying I/O or HTTP error is gone.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    /// Network-level failure talking to the release index or download host.
    ///
    /// Covers DNS and connection failures, timeouts, server errors (5xx),
    /// and rate limiting. Safe to retry after the poll interval.
    #[error("Network error during {operation}: {reason}")]
    TransientNetwork {
        /// What was being done, e.g. "release lookup" or "asset download"
        operation: String,
        /// The underlying failure
        reason: String,
    },

    /// The release index answered, but not with something relsync understands.
    #[error("Unexpected response from release index: {reason}")]
    Protocol {
        /// What was wrong with the response
        reason: String,
    },

    /// The release has no version tag, or no asset matched the pattern.
    #[error("Not found: {what}")]
    NotFound {
        /// Description of the missing item
        what: String,
    },

    /// An archive entry would be written outside the extraction root.
    ///
    /// Extraction is aborted as a whole; no entry of the archive reaches the
    /// destination.
    #[error("Unsafe archive entry rejected: {entry}")]
    PathTraversal {
        /// The entry name exactly as stored in the archive
        entry: String,
    },

    /// The archive could not be read, or lacks the required marker file.
    #[error("Malformed archive: {reason}")]
    MalformedArchive {
        /// What made the archive unusable
        reason: String,
    },

    /// A local file system operation failed.
    #[error("File system error during {operation} on {path}: {reason}")]
    FileSystem {
        /// The operation that failed (e.g. "create", "copy", "remove")
        operation: String,
        /// The path involved
        path: String,
        /// The underlying I/O error text
        reason: String,
    },

    /// The run configuration is unusable.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration problem
        message: String,
    },
}

impl SyncError {
    /// Builds a [`SyncError::FileSystem`] from an I/O error and the path it concerns.
    pub fn fs(operation: &str, path: &Path, error: std::io::Error) -> Self {
        Self::FileSystem {
            operation: operation.to_string(),
            path: path.display().to_string(),
            reason: error.to_string(),
        }
    }

    /// Classifies a `reqwest` error raised while performing `operation`.
    ///
    /// Timeouts, connect failures and interrupted bodies are
    /// [`SyncError::TransientNetwork`] even when reqwest also flags them as
    /// decode errors. Only a body that arrived but could not be decoded is
    /// [`SyncError::Protocol`].
    pub fn from_reqwest(operation: &str, error: &reqwest::Error) -> Self {
        let network =
            error.is_timeout() || error.is_connect() || error.is_body() || error.is_request();
        if error.is_decode() && !network {
            Self::Protocol {
                reason: format!("{operation}: {error}"),
            }
        } else {
            Self::TransientNetwork {
                operation: operation.to_string(),
                reason: error.to_string(),
            }
        }
    }

    /// Whether the next scheduled cycle may succeed without operator action.
    ///
    /// Archive problems are excluded: the same release will produce the same
    /// archive until upstream publishes a new one.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::TransientNetwork { .. }
                | Self::Protocol { .. }
                | Self::NotFound { .. }
                | Self::FileSystem { .. }
        )
    }
}

/// Error wrapper that adds an optional suggestion and details for display.
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying error
    pub error: SyncError,
    /// A hint for resolving the error
    pub suggestion: Option<String>,
    /// Extra detail about why the error happened
    pub details: Option<String>,
}

impl ErrorContext {
    /// Wraps `error` without suggestion or details.
    #[must_use]
    pub const fn new(error: SyncError) -> Self {
        Self {
            error,
            suggestion: None,
            details: None,
        }
    }

    /// Attaches a suggestion.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Attaches details.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Prints the error to stderr with colors.
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.error);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Converts any error into an [`ErrorContext`] suitable for the terminal.
///
/// Known [`SyncError`]s anywhere in the chain get a tailored suggestion.
/// Anything else is reported as a configuration error carrying the full
/// cause chain, since that is where unclassified CLI errors come from.
#[must_use]
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    if let Some(sync_error) = error.chain().find_map(|e| e.downcast_ref::<SyncError>()) {
        return create_error_context(sync_error.clone());
    }

    if let Some(toml_error) = error.downcast_ref::<toml::de::Error>() {
        return ErrorContext::new(SyncError::Config {
            message: toml_error.to_string(),
        })
        .with_suggestion("Check the TOML syntax in your relsync config file");
    }

    let mut message = error.to_string();
    let chain: Vec<String> =
        error.chain().skip(1).map(std::string::ToString::to_string).collect();

    if !chain.is_empty() {
        message.push_str("\n\nCaused by:");
        for (i, cause) in chain.iter().enumerate() {
            message.push_str(&format!("\n  {}: {}", i + 1, cause));
        }
    }

    ErrorContext::new(SyncError::Config {
        message,
    })
}

fn create_error_context(error: SyncError) -> ErrorContext {
    match &error {
        SyncError::TransientNetwork {
            ..
        } => ErrorContext::new(error)
            .with_suggestion("Check your network connection; the next cycle will retry")
            .with_details(
                "Set GITHUB_TOKEN to raise the API rate limit if requests are being throttled",
            ),
        SyncError::Protocol {
            ..
        } => ErrorContext::new(error)
            .with_suggestion("Verify --api-base points at a GitHub-compatible release API"),
        SyncError::NotFound {
            ..
        } => ErrorContext::new(error).with_suggestion(
            "Check --repo and --asset-pattern against the assets of the latest release",
        ),
        SyncError::PathTraversal {
            ..
        } => ErrorContext::new(error)
            .with_details("The archive tried to write outside the destination directory")
            .with_suggestion("Do not deploy this release; report it to the publisher"),
        SyncError::MalformedArchive {
            ..
        } => ErrorContext::new(error)
            .with_details("The destination directory was left untouched")
            .with_suggestion("Make sure --asset-pattern selects the web bundle archive"),
        SyncError::FileSystem {
            ..
        } => ErrorContext::new(error)
            .with_suggestion("Check permissions and free space in the destination directory"),
        SyncError::Config {
            ..
        } => ErrorContext::new(error)
            .with_suggestion("Pass the value on the command line or set it in the config file"),
    }
}
