use glob::Pattern;

use crate::{RedactionError, Result};

const DEFAULT_PATTERNS: &[&str] = &[
    "*-result.json",
    "*-container.json",
    "*-attachment.txt",
    "*-attachment.json",
    "*-attachment.html",
];

/// Selects which result files get scanned, by file name glob
pub struct ArtifactFilter {
    patterns: Vec<Pattern>,
}

impl ArtifactFilter {
    /// An unparseable glob is an error: dropping it would leave files unscanned.
    pub fn new(patterns: &[String]) -> Result<Self> {
        let compiled = patterns
            .iter()
            .map(|p| {
                Pattern::new(p).map_err(|source| RedactionError::InvalidGlob {
                    pattern: p.clone(),
                    source,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { patterns: compiled })
    }

    /// Built-in globs when `patterns` is empty.
    pub fn from_config(patterns: &[String]) -> Result<Self> {
        if patterns.is_empty() {
            Ok(Self::default())
        } else {
            Self::new(patterns)
        }
    }

    pub fn matches(&self, file_name: &str) -> bool {
        self.patterns.iter().any(|pattern| pattern.matches(file_name))
    }
}

impl Default for ArtifactFilter {
    fn default() -> Self {
        Self {
            patterns: DEFAULT_PATTERNS
                .iter()
                .filter_map(|p| Pattern::new(p).ok())
                .collect(),
        }
    }
}
