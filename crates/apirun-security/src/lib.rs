//! Secret redaction for run artifacts
//!
//! Result files are scrubbed in place before they are merged into history,
//! rendered, or published. Content rules live behind [`ContentRedactor`] so a
//! format-aware implementation can replace the regex one without touching
//! the directory pass.

pub mod artifacts;
pub mod error;
pub mod filter;
pub mod redactor;

pub use artifacts::{RedactionReport, redact_artifacts};
pub use error::{RedactionError, Result};
pub use filter::ArtifactFilter;
pub use redactor::{REDACTION_MARKER, RedactionInfo, Redactor};

/// Rewrites content with sensitive values replaced by [`REDACTION_MARKER`].
pub trait ContentRedactor: Send + Sync {
    fn redact(&self, artifact_id: &str, content: &str) -> (String, Vec<RedactionInfo>);
}
