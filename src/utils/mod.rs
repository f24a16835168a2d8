//! Cross-cutting utilities: atomic writes, file copies, progress output.

pub mod fs;
pub mod progress;

pub use fs::{atomic_write, copy_preserving_mtime, ensure_dir};
pub use progress::DownloadProgress;
