//! External service clients behind trait seams.
//!
//! Two collaborators are reached over HTTP and abstracted behind traits so
//! the harvest controller can be driven against test doubles:
//!
//! - [`SearchApi`]: the paginated bibliographic search service
//! - [`CatalogApi`]: the local catalog (existence checks, bulk import, and
//!   the server-side author-backfill batch action)

mod catalog;
mod isbndb;
pub mod mock;

pub use catalog::CatalogClient;
pub use isbndb::IsbndbClient;
pub use mock::{MockCatalog, MockSearchApi};

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::models::{BookRecord, HarvestQuery};

/// One page of search results
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Page {
    /// Total matches reported by the server across all pages
    pub total: u64,

    /// Records on this page
    pub books: Vec<BookRecord>,
}

/// Summary returned by the bulk-import endpoint
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImportSummary {
    /// Records accepted by the endpoint
    pub total: u64,

    /// Records actually stored
    #[serde(default)]
    pub stored: u64,

    /// Records the catalog already had
    #[serde(default)]
    pub duplicates: u64,

    /// Per-record error messages
    #[serde(default)]
    pub errors: Vec<String>,
}

/// Result of one server-side batch-processing call
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchOutcome {
    /// Whether the batch call succeeded as a whole
    pub success: bool,

    /// Items processed by this call
    #[serde(default)]
    pub processed: u64,

    /// Per-item error messages from a successful call
    #[serde(default)]
    pub errors: Vec<String>,

    /// Terminal error message from a failed call
    #[serde(default)]
    pub error: Option<String>,
}

/// Errors that can occur when talking to an external service
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Invalid request parameters (precondition violation, never retried)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Rate limit exceeded (HTTP 429); retryable after the given delay
    #[error("Rate limit exceeded")]
    RateLimited {
        /// Delay from the Retry-After header, when present
        retry_after: Option<Duration>,
    },

    /// Daily API quota exhausted (HTTP 403); fatal for the run
    #[error("Daily API quota exceeded")]
    QuotaExceeded,

    /// Network or transport error
    #[error("Network error: {0}")]
    Network(String),

    /// Non-success response from the service
    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    /// Response body could not be parsed
    #[error("Parse error: {0}")]
    Parse(String),
}

impl ApiError {
    /// Whether this error is transient: retryable a bounded number of times
    /// before the page is skipped. Rate limits and quota exhaustion have
    /// their own handling and are not transient in this sense.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ApiError::Network(_) | ApiError::Api { .. } | ApiError::Parse(_)
        )
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        ApiError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Parse(format!("JSON: {}", err))
    }
}

/// The paginated bibliographic search service.
#[async_trait]
pub trait SearchApi: Send + Sync + std::fmt::Debug {
    /// Fetch one page of results for a query.
    ///
    /// Issues exactly one outbound request per invocation, no caching.
    /// `page` is 1-based. Callers must validate the query before the first
    /// call; an empty subject is a precondition violation, not a retryable
    /// outcome.
    async fn fetch_page(&self, query: &HarvestQuery, page: u32) -> Result<Page, ApiError>;
}

/// The local catalog service.
#[async_trait]
pub trait CatalogApi: Send + Sync + std::fmt::Debug {
    /// Which of the given normalized ISBNs the catalog already holds.
    /// One batched request regardless of input size.
    async fn existing_isbns(&self, isbns: &[String]) -> Result<HashSet<String>, ApiError>;

    /// Push complete records to the catalog's bulk-import endpoint.
    async fn import_books(&self, records: &[BookRecord]) -> Result<ImportSummary, ApiError>;

    /// Run one server-side author-backfill batch of at most `batch_size`
    /// items.
    async fn process_author_batch(&self, batch_size: u32) -> Result<BatchOutcome, ApiError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(ApiError::Network("refused".into()).is_transient());
        assert!(ApiError::Api {
            status: 500,
            message: "oops".into()
        }
        .is_transient());
        assert!(ApiError::Parse("bad json".into()).is_transient());

        assert!(!ApiError::QuotaExceeded.is_transient());
        assert!(!ApiError::RateLimited { retry_after: None }.is_transient());
        assert!(!ApiError::InvalidRequest("empty subject".into()).is_transient());
    }
}
