use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, RedactionError>;

#[derive(Error, Debug)]
pub enum RedactionError {
    #[error("invalid redaction pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        source: regex::Error,
    },

    #[error("redaction pattern {0:?} matches the redaction marker itself")]
    MatchesMarker(String),

    #[error("invalid artifact glob {pattern:?}: {source}")]
    InvalidGlob {
        pattern: String,
        source: glob::PatternError,
    },

    #[error("artifact directory does not exist: {0}")]
    MissingDirectory(PathBuf),

    #[error("artifact is not valid UTF-8, refusing to publish it unscanned: {0}")]
    NonUtf8(PathBuf),

    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(transparent)]
    Walk(#[from] walkdir::Error),
}
