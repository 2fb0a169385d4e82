use std::time::Duration;

use apirun_core::{Collection, Error, Result};
use async_trait::async_trait;

use crate::source::CollectionSource;

/// Fetches a collection from the Postman API (`GET {base}/collections/{id}`)
pub struct PostmanApiSource {
    api_base: String,
    collection_id: String,
    api_key: String,
    timeout: Duration,
}

impl PostmanApiSource {
    pub fn new(
        api_base: impl Into<String>,
        collection_id: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            api_base: api_base.into().trim_end_matches('/').to_string(),
            collection_id: collection_id.into(),
            api_key: api_key.into(),
            timeout,
        }
    }

    pub fn url(&self) -> String {
        format!("{}/collections/{}", self.api_base, self.collection_id)
    }
}

#[async_trait]
impl CollectionSource for PostmanApiSource {
    async fn fetch(&self) -> Result<Collection> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("apirun/", env!("CARGO_PKG_VERSION")))
            .timeout(self.timeout)
            .build()
            .map_err(|e| Error::Fetch(format!("Failed to create HTTP client: {}", e)))?;

        let url = self.url();
        tracing::debug!("Fetching collection from {}", url);

        let response = client
            .get(&url)
            .header("X-Api-Key", &self.api_key)
            .send()
            .await
            .map_err(|e| Error::Fetch(format!("Failed to reach Postman API: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            // The API key is never echoed, only the status and collection id
            return Err(Error::Fetch(format!(
                "Postman API returned HTTP {} for collection {}",
                status.as_u16(),
                self.collection_id
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| Error::Fetch(format!("Failed to read response: {}", e)))?;

        let document: serde_json::Value = serde_json::from_str(&body)
            .map_err(|e| Error::Fetch(format!("Postman API response is not JSON: {}", e)))?;

        Collection::from_document(document)
    }

    fn describe(&self) -> String {
        format!("postman collection {}", self.collection_id)
    }
}
