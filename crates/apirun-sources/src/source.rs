//! Collection source trait

use apirun_core::{Collection, Result};
use async_trait::async_trait;

/// Where the pipeline gets the collection it runs
#[async_trait]
pub trait CollectionSource: Send + Sync {
    /// Fetch and validate the collection. Every failure is `Error::Fetch`.
    async fn fetch(&self) -> Result<Collection>;

    /// Human-readable origin for logs
    fn describe(&self) -> String;
}
