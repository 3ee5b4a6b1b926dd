//! ISBNdb-style search client.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use crate::api::{ApiError, Page, SearchApi};
use crate::models::{BookRecord, HarvestQuery};
use crate::utils::HttpClient;

const DEFAULT_BASE_URL: &str = "https://api2.isbndb.com";

/// Fallback when a 429 carries no usable Retry-After header.
const RATE_LIMIT_FALLBACK: Duration = Duration::from_secs(60);

/// Client for the paginated book search endpoint.
///
/// Results are always filtered to English, matching the import flows this
/// client feeds.
#[derive(Debug, Clone)]
pub struct IsbndbClient {
    http: HttpClient,
    base_url: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct SearchEnvelope {
    #[serde(default)]
    total: u64,
    #[serde(default)]
    books: Vec<BookRecord>,
}

impl IsbndbClient {
    /// Create a client against the default service URL
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    /// Create a client against a custom service URL (tests, proxies)
    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            http: HttpClient::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    fn search_url(&self, query: &HarvestQuery, page: u32) -> String {
        let mut url = format!(
            "{}/books/{}?page={}&pageSize={}&column=subjects&language=en",
            self.base_url,
            urlencoding::encode(query.subject.trim()),
            page,
            query.page_size.as_u32()
        );
        if let Some(year) = &query.year {
            url.push_str(&format!("&year={}", urlencoding::encode(year)));
        }
        url
    }
}

fn retry_after(response: &reqwest::Response) -> Option<Duration> {
    response
        .headers()
        .get(http::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

#[async_trait]
impl SearchApi for IsbndbClient {
    async fn fetch_page(&self, query: &HarvestQuery, page: u32) -> Result<Page, ApiError> {
        if page == 0 {
            return Err(ApiError::InvalidRequest("page must be >= 1".to_string()));
        }

        let url = self.search_url(query, page);
        tracing::debug!(page, %url, "fetching search page");

        let response = self
            .http
            .client()
            .get(&url)
            .header(http::header::AUTHORIZATION, &self.api_key)
            .send()
            .await
            .map_err(|e| ApiError::Network(format!("search request failed: {}", e)))?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = retry_after(&response).or(Some(RATE_LIMIT_FALLBACK));
            return Err(ApiError::RateLimited { retry_after });
        }
        if status == reqwest::StatusCode::FORBIDDEN {
            return Err(ApiError::QuotaExceeded);
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ApiError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let envelope: SearchEnvelope = response
            .json()
            .await
            .map_err(|e| ApiError::Parse(format!("search response: {}", e)))?;

        Ok(Page {
            total: envelope.total,
            books: envelope.books,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PageSize;

    fn query() -> HarvestQuery {
        HarvestQuery::new("science fiction")
            .year("2021")
            .page_size(PageSize::Twenty)
            .max_pages(3)
    }

    #[test]
    fn test_search_url_shape() {
        let client = IsbndbClient::with_base_url("key", "http://localhost:9999/");
        let url = client.search_url(&query(), 2);
        assert_eq!(
            url,
            "http://localhost:9999/books/science%20fiction?page=2&pageSize=20&column=subjects&language=en&year=2021"
        );
    }

    #[tokio::test]
    async fn test_ok_page_parses_total_and_books() {
        let mut server = mockito::Server::new_async().await;
        let body = r#"{"total": 812, "books": [
            {"title": "Dune", "isbn": "0441172717", "isbn13": "9780441172719", "authors": ["Frank Herbert"]}
        ]}"#;
        let mock = server
            .mock(
                "GET",
                mockito::Matcher::Regex(r"^/books/science%20fiction.*$".to_string()),
            )
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body)
            .create_async()
            .await;

        let client = IsbndbClient::with_base_url("key", server.url());
        let page = client.fetch_page(&query(), 1).await.unwrap();

        mock.assert_async().await;
        assert_eq!(page.total, 812);
        assert_eq!(page.books.len(), 1);
        assert_eq!(page.books[0].isbn13, "9780441172719");
    }

    #[tokio::test]
    async fn test_429_maps_to_rate_limited_with_header() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", mockito::Matcher::Any)
            .with_status(429)
            .with_header("retry-after", "7")
            .create_async()
            .await;

        let client = IsbndbClient::with_base_url("key", server.url());
        let err = client.fetch_page(&query(), 1).await.unwrap_err();
        match err {
            ApiError::RateLimited { retry_after } => {
                assert_eq!(retry_after, Some(Duration::from_secs(7)));
            }
            other => panic!("expected RateLimited, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_429_without_header_uses_fallback() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", mockito::Matcher::Any)
            .with_status(429)
            .create_async()
            .await;

        let client = IsbndbClient::with_base_url("key", server.url());
        match client.fetch_page(&query(), 1).await.unwrap_err() {
            ApiError::RateLimited { retry_after } => {
                assert_eq!(retry_after, Some(RATE_LIMIT_FALLBACK));
            }
            other => panic!("expected RateLimited, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_403_maps_to_quota_exceeded() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", mockito::Matcher::Any)
            .with_status(403)
            .create_async()
            .await;

        let client = IsbndbClient::with_base_url("key", server.url());
        assert!(matches!(
            client.fetch_page(&query(), 1).await.unwrap_err(),
            ApiError::QuotaExceeded
        ));
    }

    #[tokio::test]
    async fn test_500_is_transient_api_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", mockito::Matcher::Any)
            .with_status(500)
            .with_body("internal")
            .create_async()
            .await;

        let client = IsbndbClient::with_base_url("key", server.url());
        let err = client.fetch_page(&query(), 1).await.unwrap_err();
        assert!(err.is_transient());
        match err {
            ApiError::Api { status, message } => {
                assert_eq!(status, 500);
                assert_eq!(message, "internal");
            }
            other => panic!("expected Api, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_page_zero_rejected_before_any_request() {
        let client = IsbndbClient::with_base_url("key", "http://127.0.0.1:1");
        assert!(matches!(
            client.fetch_page(&query(), 0).await.unwrap_err(),
            ApiError::InvalidRequest(_)
        ));
    }
}
