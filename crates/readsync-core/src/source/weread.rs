//! WeRead web API client.
//!
//! Authenticates with the browser cookie string (`WEREAD_COOKIE`). WeRead
//! reports most failures as HTTP 200 with an `errCode`/`errcode` field, so
//! both the status and the body are checked.

use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use url::Url;

use super::types::{Bookshelf, Notebook, ReadInfo, ReadTimes};
use super::ReadingSource;
use crate::config::WeReadConfig;
use crate::error::{Result, SyncError};
use crate::http::{join_url, BlockingClient};
use crate::model::BookSnapshot;

pub struct WeReadClient {
    http: BlockingClient,
    base_url: String,
    api_base_url: String,
    cookie: String,
}

/// Error code embedded in a WeRead payload, if any.
fn embedded_error(body: &serde_json::Value) -> Option<(i64, String)> {
    let code = body
        .get("errCode")
        .or_else(|| body.get("errcode"))
        .and_then(|c| c.as_i64())?;
    if code == 0 {
        return None;
    }
    let message = body
        .get("errMsg")
        .or_else(|| body.get("errmsg"))
        .and_then(|m| m.as_str())
        .unwrap_or("unknown error")
        .to_string();
    Some((code, message))
}

impl WeReadClient {
    pub fn new(config: &WeReadConfig) -> Result<Self> {
        Ok(Self {
            http: BlockingClient::new()?,
            base_url: config.base_url.clone(),
            api_base_url: config.api_base_url.clone(),
            cookie: config.cookie.clone(),
        })
    }

    fn get_value(&self, url: Url, query: &[(&str, &str)]) -> Result<Option<serde_json::Value>> {
        tracing::debug!(url = url.as_str(), "GET weread");
        let request = self
            .http
            .request(Method::GET, url.clone())
            .header("Cookie", &self.cookie)
            .header("Accept", "application/json")
            .query(query);
        let resp = self.http.send(request)?;

        if resp.status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !resp.is_success() {
            return Err(SyncError::Source(format!(
                "GET {} failed (HTTP {}): {}",
                url.path(),
                resp.status,
                resp.body
            )));
        }

        let body = resp.json()?;
        if let Some((code, message)) = embedded_error(&body) {
            return Err(SyncError::Source(format!(
                "GET {} returned errCode {code}: {message}",
                url.path()
            )));
        }
        Ok(Some(body))
    }

    fn get<T: DeserializeOwned>(&self, url: Url, query: &[(&str, &str)]) -> Result<T> {
        let body = self
            .get_value(url.clone(), query)?
            .ok_or_else(|| SyncError::Source(format!("GET {} not found", url.path())))?;
        Ok(serde_json::from_value(body)?)
    }

    fn web_url(&self, path: &str) -> Result<Url> {
        join_url(&self.base_url, path)
    }

    fn api_url(&self, path: &str) -> Result<Url> {
        join_url(&self.api_base_url, path)
    }
}

impl ReadingSource for WeReadClient {
    fn bookshelf(&self) -> Result<Bookshelf> {
        self.get(self.web_url("web/shelf/sync")?, &[])
    }

    fn book_info(&self, book_id: &str) -> Result<Option<BookSnapshot>> {
        let body = self.get_value(self.web_url("web/book/info")?, &[("bookId", book_id)])?;
        body.map(serde_json::from_value)
            .transpose()
            .map_err(SyncError::from)
    }

    fn read_info(&self, book_id: &str) -> Result<ReadInfo> {
        self.get(
            self.web_url("web/book/readinfo")?,
            &[
                ("bookId", book_id),
                ("readingDetail", "1"),
                ("readingBookIndex", "1"),
                ("finishedDate", "1"),
            ],
        )
    }

    fn notebooks(&self) -> Result<Vec<Notebook>> {
        let body: serde_json::Value = self.get(self.web_url("api/user/notebook")?, &[])?;
        match body.get("books") {
            Some(books) => Ok(serde_json::from_value(books.clone())?),
            None => Ok(Vec::new()),
        }
    }

    fn read_times(&self) -> Result<ReadTimes> {
        let body: serde_json::Value =
            self.get(self.api_url("readdata/summary")?, &[("synckey", "0")])?;
        ReadTimes::from_value(body.get("readTimes"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;

    fn client_for(server: &mockito::ServerGuard) -> WeReadClient {
        let config = WeReadConfig {
            cookie: "wr_vid=42; wr_skey=abc".to_string(),
            base_url: server.url(),
            api_base_url: server.url(),
        };
        WeReadClient::new(&config).unwrap()
    }

    #[test]
    fn bookshelf_sends_cookie_and_parses_archives() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("GET", "/web/shelf/sync")
            .match_header("cookie", "wr_vid=42; wr_skey=abc")
            .with_status(200)
            .with_body(
                json!({
                    "archive": [{"name": "ll的书架", "bookIds": ["b1"]}],
                    "bookProgress": [{"bookId": "b1", "readingTime": 600}]
                })
                .to_string(),
            )
            .create();

        let shelf = client_for(&server).bookshelf().unwrap();
        mock.assert();
        let scope = shelf.scope("ll的书架").unwrap();
        assert_eq!(scope.progress["b1"].reading_time, Some(600));
    }

    #[test]
    fn embedded_error_code_is_an_error() {
        let mut server = mockito::Server::new();
        server
            .mock("GET", "/web/shelf/sync")
            .with_status(200)
            .with_body(r#"{"errCode": -2012, "errMsg": "登录超时"}"#)
            .create();

        let err = client_for(&server).bookshelf().unwrap_err();
        assert!(err.to_string().contains("-2012"));
        assert!(err.to_string().contains("登录超时"));
    }

    #[test]
    fn read_info_requests_detail() {
        let mut server = mockito::Server::new();
        server
            .mock("GET", "/web/book/readinfo")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("bookId".into(), "b1".into()),
                Matcher::UrlEncoded("readingDetail".into(), "1".into()),
            ]))
            .with_status(200)
            .with_body(
                json!({
                    "markedStatus": 4,
                    "readDetail": {"data": [{"readDate": 100, "readTime": 30}]}
                })
                .to_string(),
            )
            .create();

        let snapshot = client_for(&server).read_info("b1").unwrap().into_snapshot();
        assert_eq!(snapshot.marked_status, Some(4));
        assert_eq!(snapshot.daily_durations().get(&100), Some(&30));
    }

    #[test]
    fn unknown_book_info_is_none() {
        let mut server = mockito::Server::new();
        server
            .mock("GET", "/web/book/info")
            .match_query(Matcher::UrlEncoded("bookId".into(), "missing".into()))
            .with_status(404)
            .create();

        assert!(client_for(&server).book_info("missing").unwrap().is_none());
    }

    #[test]
    fn server_error_propagates() {
        let mut server = mockito::Server::new();
        server
            .mock("GET", "/web/book/info")
            .match_query(Matcher::Any)
            .with_status(500)
            .with_body("boom")
            .create();

        assert!(matches!(
            client_for(&server).book_info("b1"),
            Err(SyncError::Source(_))
        ));
    }

    #[test]
    fn read_times_from_summary() {
        let mut server = mockito::Server::new();
        server
            .mock("GET", "/readdata/summary")
            .match_query(Matcher::UrlEncoded("synckey".into(), "0".into()))
            .with_status(200)
            .with_body(r#"{"readTimes": {"1710432000": 1200}}"#)
            .create();

        let times = client_for(&server).read_times().unwrap();
        assert_eq!(
            times,
            ReadTimes::Flat(std::collections::BTreeMap::from([(1_710_432_000, 1200)]))
        );
    }

    #[test]
    fn notebooks_reads_books_array() {
        let mut server = mockito::Server::new();
        server
            .mock("GET", "/api/user/notebook")
            .with_status(200)
            .with_body(r#"{"books": [{"bookId": "b1", "noteCount": 3}]}"#)
            .create();

        let notebooks = client_for(&server).notebooks().unwrap();
        assert_eq!(notebooks.len(), 1);
        assert_eq!(notebooks[0].note_count, 3);
    }
}
