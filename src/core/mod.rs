//! Core types for relsync
//!
//! Holds the error type every pipeline stage returns and the helpers the
//! binary uses to render errors for operators.
//!
//! ```rust
//! use relsync_cli::core::SyncError;
//!
//! fn lookup() -> Result<String, SyncError> {
//!     Err(SyncError::NotFound {
//!         what: "release tag".to_string(),
//!     })
//! }
//!
//! assert!(lookup().is_err());
//! ```

pub mod error;

pub use error::{ErrorContext, SyncError, user_friendly_error};
