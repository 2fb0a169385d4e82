//! Error types for apirun-storage

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, StorageError>;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(transparent)]
    Walk(#[from] walkdir::Error),

    #[error("Failed to format entry timestamp: {0}")]
    Timestamp(#[from] time::error::Format),

    #[error("Failed to write trend file: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Attach the path to an IO error
pub(crate) fn io_at(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> StorageError {
    let path = path.into();
    move |source| StorageError::Io { path, source }
}
