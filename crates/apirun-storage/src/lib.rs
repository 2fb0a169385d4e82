//! Rolling run history for apirun
//!
//! This crate provides:
//! - The persisted history window (one directory per retained run)
//! - Merging the window into a fresh results directory
//! - Snapshotting a generated report's history back into the window

pub mod error;
pub mod history;

pub use error::{Result, StorageError};
pub use history::{HISTORY_DIR, HistoryEntry, HistoryStore};
