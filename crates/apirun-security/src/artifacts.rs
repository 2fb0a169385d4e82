//! In-place redaction of a results directory

use std::path::Path;

use serde::Serialize;
use walkdir::WalkDir;

use crate::{ArtifactFilter, ContentRedactor, RedactionError, RedactionInfo, Result};

#[derive(Debug, Default, Clone, Serialize)]
pub struct RedactionReport {
    pub files_scanned: usize,
    pub files_changed: usize,
    pub redactions: Vec<RedactionInfo>,
}

impl RedactionReport {
    /// Number of values replaced across all files
    pub fn total(&self) -> usize {
        self.redactions.iter().map(|r| r.count).sum()
    }
}

/// Rewrites every file under `dir` whose name matches `filter`.
///
/// Files are only written back when their content changed. A file that is
/// not valid UTF-8 fails the pass instead of being left unscanned.
pub fn redact_artifacts(
    dir: &Path,
    filter: &ArtifactFilter,
    redactor: &dyn ContentRedactor,
) -> Result<RedactionReport> {
    if !dir.is_dir() {
        return Err(RedactionError::MissingDirectory(dir.to_path_buf()));
    }

    let mut report = RedactionReport::default();

    for entry in WalkDir::new(dir).follow_links(false).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let Some(file_name) = entry.file_name().to_str() else {
            continue;
        };
        if !filter.matches(file_name) {
            continue;
        }

        let path = entry.path();
        let bytes = std::fs::read(path).map_err(|source| RedactionError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let content =
            String::from_utf8(bytes).map_err(|_| RedactionError::NonUtf8(path.to_path_buf()))?;

        let artifact_id = path
            .strip_prefix(dir)
            .unwrap_or(path)
            .to_string_lossy()
            .replace('\\', "/");

        report.files_scanned += 1;
        let (redacted, infos) = redactor.redact(&artifact_id, &content);

        if redacted != content {
            std::fs::write(path, redacted).map_err(|source| RedactionError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            report.files_changed += 1;

            let count: usize = infos.iter().map(|i| i.count).sum();
            tracing::debug!("Redacted {} value(s) in {}", count, artifact_id);
        }

        report.redactions.extend(infos);
    }

    tracing::info!(
        "Redaction scanned {} file(s), changed {}, replaced {} value(s)",
        report.files_scanned,
        report.files_changed,
        report.total()
    );

    Ok(report)
}
