//! Blocking facade over `reqwest`.
//!
//! The sync is strictly sequential, so each remote client owns a
//! current-thread tokio runtime and drives one request at a time on it.

use reqwest::{Method, RequestBuilder, StatusCode};
use url::Url;

use crate::error::{Result, SyncError};

const USER_AGENT: &str = concat!("readsync/", env!("CARGO_PKG_VERSION"));

/// Raw response: status plus body text.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: StatusCode,
    pub body: String,
}

impl RawResponse {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Body parsed as JSON; an empty body parses as `null`.
    pub fn json(&self) -> Result<serde_json::Value> {
        if self.body.trim().is_empty() {
            return Ok(serde_json::Value::Null);
        }
        Ok(serde_json::from_str(&self.body)?)
    }
}

/// HTTP client with its own runtime.
pub struct BlockingClient {
    client: reqwest::Client,
    runtime: tokio::runtime::Runtime,
}

impl BlockingClient {
    pub fn new() -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        let client = reqwest::Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self { client, runtime })
    }

    pub fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.client.request(method, url)
    }

    /// Send a request and read the whole body. Non-2xx statuses are returned,
    /// not turned into errors; callers map them to their own error variant.
    pub fn send(&self, request: RequestBuilder) -> Result<RawResponse> {
        self.runtime.block_on(async {
            let resp = request.send().await?;
            let status = resp.status();
            let body = resp.text().await?;
            Ok::<_, SyncError>(RawResponse { status, body })
        })
    }
}

/// Join a path onto a base URL, tolerating a missing trailing slash on the base.
pub fn join_url(base: &str, path: &str) -> Result<Url> {
    let mut base = Url::parse(base)?;
    if !base.path().ends_with('/') {
        let with_slash = format!("{}/", base.path());
        base.set_path(&with_slash);
    }
    Ok(base.join(path.trim_start_matches('/'))?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_url_handles_slashes() {
        assert_eq!(
            join_url("https://api.notion.com/v1/", "pages").unwrap().as_str(),
            "https://api.notion.com/v1/pages"
        );
        assert_eq!(
            join_url("https://api.notion.com/v1", "/pages").unwrap().as_str(),
            "https://api.notion.com/v1/pages"
        );
        assert!(join_url("not a url", "pages").is_err());
    }

    #[test]
    fn empty_body_is_null_json() {
        let resp = RawResponse {
            status: StatusCode::OK,
            body: "  ".into(),
        };
        assert!(resp.json().unwrap().is_null());
        assert!(resp.is_success());
    }
}
