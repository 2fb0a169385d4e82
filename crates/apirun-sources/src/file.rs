use std::path::PathBuf;

use apirun_core::{Collection, Error, Result};
use async_trait::async_trait;

use crate::source::CollectionSource;

/// Reads a collection export from disk
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl CollectionSource for FileSource {
    async fn fetch(&self) -> Result<Collection> {
        let content = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            Error::Fetch(format!(
                "Failed to read collection file {}: {}",
                self.path.display(),
                e
            ))
        })?;

        let document: serde_json::Value = serde_json::from_str(&content).map_err(|e| {
            Error::Fetch(format!(
                "Collection file {} is not valid JSON: {}",
                self.path.display(),
                e
            ))
        })?;

        Collection::from_document(document)
    }

    fn describe(&self) -> String {
        format!("collection file {}", self.path.display())
    }
}
