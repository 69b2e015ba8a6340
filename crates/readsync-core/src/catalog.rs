//! ISBN to Douban URL lookup through the NeoDB catalog.
//!
//! The lookup is best-effort: failures are retried with a fixed delay and
//! then dropped with a warning, so a book is still written without a Douban
//! link.

use reqwest::Method;
use serde::Deserialize;
use std::time::Duration;

use crate::config::CatalogConfig;
use crate::error::{Result, SyncError};
use crate::http::BlockingClient;

const DOUBAN_PREFIX: &str = "https://book.douban.com";

/// Resolves an ISBN to the book's Douban page.
pub trait IsbnLookup {
    /// `None` when nothing matches or every attempt failed.
    fn douban_url(&self, isbn: &str) -> Option<String>;
}

/// Fixed-delay retry settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_millis(5000),
        }
    }
}

impl From<&CatalogConfig> for RetryPolicy {
    fn from(config: &CatalogConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            delay: Duration::from_millis(config.retry_delay_ms),
        }
    }
}

impl RetryPolicy {
    /// Run `op` until it succeeds or attempts run out, sleeping between tries.
    pub fn run<T, F>(&self, mut op: F) -> Result<T>
    where
        F: FnMut(u32) -> Result<T>,
    {
        let attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match op(attempt) {
                Ok(value) => return Ok(value),
                Err(e) if attempt < attempts => {
                    tracing::debug!(attempt, error = %e, "retrying");
                    std::thread::sleep(self.delay);
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SearchResponse {
    data: Vec<CatalogItem>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CatalogItem {
    isbn: Option<String>,
    external_resources: Vec<ExternalResource>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ExternalResource {
    url: String,
}

/// First Douban resource of the first entry whose ISBN equals `isbn`.
fn pick_douban_url(response: &SearchResponse, isbn: &str) -> Option<String> {
    response
        .data
        .iter()
        .find(|item| item.isbn.as_deref() == Some(isbn))?
        .external_resources
        .iter()
        .find(|r| r.url.starts_with(DOUBAN_PREFIX))
        .map(|r| r.url.clone())
}

/// NeoDB catalog search client.
pub struct NeoDbCatalog {
    http: BlockingClient,
    base_url: String,
    policy: RetryPolicy,
}

impl NeoDbCatalog {
    pub fn new(config: &CatalogConfig) -> Result<Self> {
        Ok(Self {
            http: BlockingClient::new()?,
            base_url: config.base_url.clone(),
            policy: RetryPolicy::from(config),
        })
    }

    fn search(&self, isbn: &str) -> Result<SearchResponse> {
        let url = url::Url::parse(&self.base_url)?;
        let request = self
            .http
            .request(Method::GET, url)
            .query(&[("query", isbn), ("page", "1"), ("category", "book")]);
        let resp = self.http.send(request)?;
        if !resp.is_success() {
            return Err(SyncError::Catalog(format!(
                "search for {isbn} failed (HTTP {})",
                resp.status
            )));
        }
        Ok(serde_json::from_str(&resp.body)?)
    }
}

impl IsbnLookup for NeoDbCatalog {
    fn douban_url(&self, isbn: &str) -> Option<String> {
        let isbn = isbn.trim();
        if isbn.is_empty() {
            return None;
        }
        match self.policy.run(|_| self.search(isbn)) {
            Ok(response) => pick_douban_url(&response, isbn),
            Err(e) => {
                tracing::warn!(%isbn, error = %e, "ISBN lookup gave up");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;

    fn catalog_for(server: &mockito::ServerGuard, max_attempts: u32) -> NeoDbCatalog {
        let config = CatalogConfig {
            base_url: format!("{}/api/catalog/search", server.url()),
            max_attempts,
            retry_delay_ms: 0,
        };
        NeoDbCatalog::new(&config).unwrap()
    }

    fn search_body() -> String {
        json!({
            "data": [
                {"isbn": "9780000000000", "external_resources": [
                    {"url": "https://book.douban.com/subject/1/"}
                ]},
                {"isbn": "9787536692930", "external_resources": [
                    {"url": "https://www.goodreads.com/book/show/2"},
                    {"url": "https://book.douban.com/subject/2567698/"}
                ]}
            ]
        })
        .to_string()
    }

    #[test]
    fn picks_douban_resource_of_matching_isbn() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("GET", "/api/catalog/search")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("query".into(), "9787536692930".into()),
                Matcher::UrlEncoded("page".into(), "1".into()),
                Matcher::UrlEncoded("category".into(), "book".into()),
            ]))
            .with_status(200)
            .with_body(search_body())
            .create();

        let url = catalog_for(&server, 3).douban_url("9787536692930");
        mock.assert();
        assert_eq!(url.as_deref(), Some("https://book.douban.com/subject/2567698/"));
    }

    #[test]
    fn no_matching_isbn_is_none() {
        let mut server = mockito::Server::new();
        server
            .mock("GET", "/api/catalog/search")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(search_body())
            .create();

        assert_eq!(catalog_for(&server, 3).douban_url("9781111111111"), None);
    }

    #[test]
    fn only_first_isbn_match_is_considered() {
        let response: SearchResponse = serde_json::from_value(json!({
            "data": [
                {"isbn": "9787536692930", "external_resources": [
                    {"url": "https://www.goodreads.com/book/show/2"}
                ]},
                {"isbn": "9787536692930", "external_resources": [
                    {"url": "https://book.douban.com/subject/2567698/"}
                ]}
            ]
        }))
        .unwrap();

        assert_eq!(pick_douban_url(&response, "9787536692930"), None);
    }

    #[test]
    fn gives_up_after_max_attempts() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("GET", "/api/catalog/search")
            .match_query(Matcher::Any)
            .with_status(502)
            .expect(3)
            .create();

        assert_eq!(catalog_for(&server, 3).douban_url("9787536692930"), None);
        mock.assert();
    }

    #[test]
    fn blank_isbn_skips_the_request() {
        let mut server = mockito::Server::new();
        let mock = server.mock("GET", Matcher::Any).expect(0).create();
        assert_eq!(catalog_for(&server, 3).douban_url("  "), None);
        mock.assert();
    }

    #[test]
    fn retry_policy_stops_on_first_success() {
        let policy = RetryPolicy {
            max_attempts: 3,
            delay: Duration::ZERO,
        };
        let mut calls = 0;
        let result = policy.run(|attempt| {
            calls += 1;
            if attempt < 2 {
                Err(SyncError::Catalog("flaky".into()))
            } else {
                Ok(attempt)
            }
        });
        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls, 2);
    }
}
