//! Catalog service client: existence checks, bulk import, batch backfill.

use std::collections::HashSet;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use crate::api::{ApiError, BatchOutcome, CatalogApi, ImportSummary};
use crate::models::BookRecord;
use crate::utils::HttpClient;

/// The bulk endpoints accept at most this many records per request.
const BULK_CHUNK: usize = 100;

/// Client for the local catalog service.
#[derive(Debug, Clone)]
pub struct CatalogClient {
    http: HttpClient,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct ExistingEnvelope {
    #[serde(rename = "existingIsbns", default)]
    existing_isbns: Vec<String>,
}

impl CatalogClient {
    /// Create a client against the catalog service root URL
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: HttpClient::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn post_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<T, ApiError> {
        let response = self
            .http
            .client()
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .map_err(|e| ApiError::Network(format!("catalog request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ApiError::Api {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json()
            .await
            .map_err(|e| ApiError::Parse(format!("catalog response: {}", e)))
    }
}

#[async_trait]
impl CatalogApi for CatalogClient {
    async fn existing_isbns(&self, isbns: &[String]) -> Result<HashSet<String>, ApiError> {
        if isbns.is_empty() {
            return Ok(HashSet::new());
        }
        let envelope: ExistingEnvelope = self
            .post_json("/books/check-existing", &json!({ "isbns": isbns }))
            .await?;
        Ok(envelope.existing_isbns.into_iter().collect())
    }

    async fn import_books(&self, records: &[BookRecord]) -> Result<ImportSummary, ApiError> {
        let mut summary = ImportSummary::default();

        for chunk in records.chunks(BULK_CHUNK) {
            let part: ImportSummary = self
                .post_json("/books/import", &json!({ "books": chunk }))
                .await?;
            summary.total += part.total;
            summary.stored += part.stored;
            summary.duplicates += part.duplicates;
            summary.errors.extend(part.errors);
        }

        Ok(summary)
    }

    async fn process_author_batch(&self, batch_size: u32) -> Result<BatchOutcome, ApiError> {
        self.post_json(
            "/books/process-without-authors",
            &json!({ "batchSize": batch_size }),
        )
        .await
    }
}
