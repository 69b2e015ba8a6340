//! Notion API implementation of [`BookStore`].

use reqwest::Method;
use serde_json::{json, Map, Value};
use std::collections::HashMap;

use super::properties::{self as props, book, day, period, RELATION_TITLE};
use super::{BookStore, DayScope, RelationTable};
use crate::config::NotionConfig;
use crate::error::{Result, SyncError};
use crate::http::{join_url, BlockingClient};
use crate::model::{BookRecord, ReadingDayRecord, ReadingStatus, StoredBook};
use crate::timeutil::ShelfClock;

const NOTION_VERSION: &str = "2022-06-28";
const PAGE_SIZE: u32 = 100;

const AUTHOR_ICON: &str = "https://www.notion.so/icons/user-circle-filled_gray.svg";
const TAG_ICON: &str = "https://www.notion.so/icons/tag_gray.svg";
const PERIOD_ICON: &str = "https://www.notion.so/icons/calendar_gray.svg";
const DAY_ICON: &str = "https://www.notion.so/icons/target_red.svg";

pub struct NotionStore {
    http: BlockingClient,
    config: NotionConfig,
    clock: ShelfClock,
    relation_cache: HashMap<(RelationTable, String), String>,
}

impl NotionStore {
    pub fn new(config: &NotionConfig, clock: ShelfClock) -> Result<Self> {
        Ok(Self {
            http: BlockingClient::new()?,
            config: config.clone(),
            clock,
            relation_cache: HashMap::new(),
        })
    }

    fn call(&self, method: Method, path: &str, body: Option<&Value>) -> Result<Value> {
        let url = join_url(&self.config.base_url, path)?;
        tracing::debug!(method = method.as_str(), url = url.as_str(), "notion request");
        let mut request = self
            .http
            .request(method, url)
            .bearer_auth(&self.config.token)
            .header("Notion-Version", NOTION_VERSION);
        if let Some(body) = body {
            request = request.json(body);
        }

        let resp = self.http.send(request)?;
        if !resp.is_success() {
            let message = resp
                .json()
                .ok()
                .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
                .unwrap_or_else(|| resp.body.clone());
            return Err(SyncError::Store {
                status: resp.status.as_u16(),
                message,
            });
        }
        resp.json()
    }

    /// Every page of a database matching `filter`, following pagination.
    pub fn query_all(&self, database_id: &str, filter: Option<Value>) -> Result<Vec<Value>> {
        let path = format!("databases/{database_id}/query");
        let mut results = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let mut body = json!({ "page_size": PAGE_SIZE });
            if let Some(f) = &filter {
                body["filter"] = f.clone();
            }
            if let Some(c) = &cursor {
                body["start_cursor"] = json!(c);
            }

            let resp = self.call(Method::POST, &path, Some(&body))?;
            if let Some(items) = resp.get("results").and_then(Value::as_array) {
                results.extend(items.iter().cloned());
            }

            let has_more = resp.get("has_more").and_then(Value::as_bool).unwrap_or(false);
            cursor = resp
                .get("next_cursor")
                .and_then(Value::as_str)
                .map(str::to_string);
            if !has_more || cursor.is_none() {
                break;
            }
        }

        Ok(results)
    }

    fn create_page(&self, database_id: &str, properties: Map<String, Value>, icon: &str) -> Result<Value> {
        let body = new_page_body(database_id, properties, icon);
        self.call(Method::POST, "pages", Some(&body))
    }

    fn update_page(&self, page_id: &str, body: Value) -> Result<Value> {
        self.call(Method::PATCH, &format!("pages/{page_id}"), Some(&body))
    }

    fn table_database(&self, table: RelationTable) -> Option<&str> {
        let id = match table {
            RelationTable::Author => Some(&self.config.author_database_id),
            RelationTable::Category => Some(&self.config.category_database_id),
            RelationTable::Year => self.config.year_database_id.as_ref(),
            RelationTable::Month => self.config.month_database_id.as_ref(),
            RelationTable::Week => self.config.week_database_id.as_ref(),
            RelationTable::Date => self.config.date_database_id.as_ref(),
        };
        id.map(String::as_str).filter(|s| !s.trim().is_empty())
    }

    fn day_database(&self, scope: &DayScope) -> &str {
        match scope {
            DayScope::Book(_) => &self.config.read_database_id,
            DayScope::Daily => &self.config.daily_database_id,
        }
    }

    fn day_properties(
        &mut self,
        scope: &DayScope,
        timestamp: i64,
        duration: i64,
    ) -> Result<Map<String, Value>> {
        let mut properties = Map::new();
        let title = match scope {
            DayScope::Book(_) => self.clock.date_string(timestamp),
            DayScope::Daily => self.clock.chinese_date_string(timestamp),
        };
        properties.insert(day::TITLE.into(), props::title(&title));
        if let Some(dt) = self.clock.local(timestamp) {
            properties.insert(day::DATE.into(), props::date(&dt.to_rfc3339()));
        }
        properties.insert(day::DURATION.into(), props::number_i64(duration));
        properties.insert(day::TIMESTAMP.into(), props::number_i64(timestamp));

        match scope {
            DayScope::Book(book_page) => {
                properties.insert(
                    day::BOOK.into(),
                    props::relation(std::slice::from_ref(book_page)),
                );
            }
            DayScope::Daily => {
                if let Some(titles) = self.clock.period_titles(timestamp) {
                    for (key, table, name) in [
                        (period::YEAR, RelationTable::Year, titles.year),
                        (period::MONTH, RelationTable::Month, titles.month),
                        (period::WEEK, RelationTable::Week, titles.week),
                    ] {
                        if let Some(id) = self.relation_id(table, &name)? {
                            properties.insert(key.into(), props::relation(&[id]));
                        }
                    }
                }
            }
        }
        Ok(properties)
    }
}

/// Book id and sync-relevant state of a book page; `None` without a BookId.
pub fn parse_stored_book(page: &Value) -> Option<(String, StoredBook)> {
    let page_id = page.get("id")?.as_str()?.to_string();
    let properties = page.get("properties")?;
    let book_id = props::read_text(properties.get(book::BOOK_ID))?;

    let stored = StoredBook {
        page_id,
        reading_time: props::read_integer(properties.get(book::READING_TIME)),
        category: props::read_select(properties.get(book::SHELF_CATEGORY)),
        cover: props::read_cover(page),
        status: props::read_status(properties.get(book::STATUS))
            .and_then(|s| ReadingStatus::from_label(&s)),
        my_rating: props::read_select(properties.get(book::MY_RATING)),
    };
    Some((book_id, stored))
}

/// A reading-day row; `None` when the timestamp column is empty.
pub fn parse_day_row(page: &Value) -> Option<ReadingDayRecord> {
    let page_id = page.get("id")?.as_str()?.to_string();
    let properties = page.get("properties")?;
    let timestamp = props::read_integer(properties.get(day::TIMESTAMP))?;
    let duration = props::read_integer(properties.get(day::DURATION)).unwrap_or(0);
    Some(ReadingDayRecord {
        page_id,
        timestamp,
        duration,
    })
}

fn new_page_body(database_id: &str, properties: Map<String, Value>, icon: &str) -> Value {
    json!({
        "parent": { "database_id": database_id, "type": "database_id" },
        "properties": properties,
        "icon": props::external(icon),
    })
}

fn page_id_of(resp: &Value) -> Result<String> {
    resp.get("id")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| SyncError::Store {
            status: 200,
            message: "response carries no page id".to_string(),
        })
}

impl BookStore for NotionStore {
    fn books(&self) -> Result<HashMap<String, StoredBook>> {
        let pages = self.query_all(&self.config.book_database_id, None)?;
        let mut books = HashMap::with_capacity(pages.len());
        for page in &pages {
            if let Some((book_id, stored)) = parse_stored_book(page) {
                if books.contains_key(&book_id) {
                    tracing::warn!(%book_id, page_id = %stored.page_id, "duplicate book page ignored");
                    continue;
                }
                books.insert(book_id, stored);
            }
        }
        tracing::debug!(count = books.len(), "loaded book pages");
        Ok(books)
    }

    fn save_book(&mut self, record: &BookRecord) -> Result<String> {
        let properties = props::book_properties(record, &self.clock);
        let resp = match &record.page_id {
            Some(page_id) => self.update_page(
                page_id,
                json!({
                    "properties": properties,
                    "cover": props::external(&record.cover),
                }),
            )?,
            None => {
                let mut body =
                    new_page_body(&self.config.book_database_id, properties, &record.cover);
                body["cover"] = props::external(&record.cover);
                self.call(Method::POST, "pages", Some(&body))?
            }
        };
        page_id_of(&resp)
    }

    fn reading_days(&self, scope: &DayScope) -> Result<Vec<ReadingDayRecord>> {
        let filter = match scope {
            DayScope::Book(page_id) => Some(json!({
                "property": day::BOOK,
                "relation": { "contains": page_id },
            })),
            DayScope::Daily => None,
        };
        let pages = self.query_all(self.day_database(scope), filter)?;
        Ok(pages.iter().filter_map(parse_day_row).collect())
    }

    fn save_reading_day(
        &mut self,
        scope: &DayScope,
        page_id: Option<&str>,
        timestamp: i64,
        duration: i64,
    ) -> Result<()> {
        let properties = self.day_properties(scope, timestamp, duration)?;
        match page_id {
            Some(id) => {
                self.update_page(id, json!({ "properties": properties }))?;
            }
            None => {
                let database_id = self.day_database(scope).to_string();
                self.create_page(&database_id, properties, DAY_ICON)?;
            }
        }
        Ok(())
    }

    fn relation_id(&mut self, table: RelationTable, title: &str) -> Result<Option<String>> {
        let Some(database_id) = self.table_database(table).map(str::to_string) else {
            return Ok(None);
        };
        let key = (table, title.to_string());
        if let Some(id) = self.relation_cache.get(&key) {
            return Ok(Some(id.clone()));
        }

        let filter = json!({ "property": RELATION_TITLE, "title": { "equals": title } });
        let existing = self.query_all(&database_id, Some(filter))?;
        let id = match existing.first() {
            Some(page) => page_id_of(page)?,
            None => {
                let icon = match table {
                    RelationTable::Author => AUTHOR_ICON,
                    RelationTable::Category => TAG_ICON,
                    _ => PERIOD_ICON,
                };
                let mut properties = Map::new();
                properties.insert(RELATION_TITLE.into(), props::title(title));
                let created = self.create_page(&database_id, properties, icon)?;
                tracing::debug!(?table, %title, "created relation row");
                page_id_of(&created)?
            }
        };

        self.relation_cache.insert(key, id.clone());
        Ok(Some(id))
    }

    fn update_embed(&mut self, block_id: &str, url: &str) -> Result<()> {
        let body = json!({ "embed": { "url": url } });
        self.call(Method::PATCH, &format!("blocks/{block_id}"), Some(&body))?;
        Ok(())
    }
}
