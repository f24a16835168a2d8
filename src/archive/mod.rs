//! Release archive handling.
//!
//! - [`validator`]: normalizes entry names and rejects any that would escape
//!   the extraction root (zip-slip)
//! - [`extractor`]: stages a validated archive, checks the marker file, and
//!   overlays the staged tree onto the destination
//!
//! ```text
//! download.zip ──validate──▶ staging/ ──marker?──▶ overlay copy ──▶ destination/
//!                  │                      │
//!                  └─ PathTraversal       └─ MalformedArchive
//! ```

pub mod extractor;
pub mod validator;

pub use extractor::{ExtractSummary, Extractor, list_files};
pub use validator::{SafeEntries, SafeEntry, normalize_entry_path, validate_archive};
