//! Notion typed-property wire format.
//!
//! Records stay typed everywhere else; this module is the only place that
//! knows the JSON shape of a Notion property value and the column names of
//! the target databases.

use serde_json::{json, Map, Value};

use crate::model::BookRecord;
use crate::timeutil::ShelfClock;

/// Notion rejects rich-text items longer than this.
pub const MAX_TEXT_LEN: usize = 2000;

/// Column names of the book database.
pub mod book {
    pub const TITLE: &str = "书名";
    pub const BOOK_ID: &str = "BookId";
    pub const ISBN: &str = "ISBN";
    pub const LINK: &str = "链接";
    pub const AUTHORS: &str = "作者";
    pub const CATEGORIES: &str = "分类";
    pub const SHELF_CATEGORY: &str = "书架分类";
    pub const PROGRESS: &str = "阅读进度";
    pub const STATUS: &str = "阅读状态";
    pub const READING_TIME: &str = "阅读时长";
    pub const READ_DAYS: &str = "阅读天数";
    pub const RATING: &str = "评分";
    pub const MY_RATING: &str = "我的评分";
    pub const DOUBAN_URL: &str = "豆瓣链接";
    pub const DATE: &str = "时间";
    pub const BEGIN_READING: &str = "开始阅读时间";
    pub const LAST_READING: &str = "最后阅读时间";
    pub const INTRO: &str = "简介";
}

/// Column names of the reading-day databases.
pub mod day {
    pub const TITLE: &str = "标题";
    pub const DATE: &str = "日期";
    pub const DURATION: &str = "时长";
    pub const TIMESTAMP: &str = "时间戳";
    /// Relation to the owning book (per-book database only).
    pub const BOOK: &str = "书架";
}

/// Period relation columns, shared by book pages and daily rows.
pub mod period {
    pub const YEAR: &str = "年";
    pub const MONTH: &str = "月";
    pub const WEEK: &str = "周";
    pub const DATE: &str = "日";
}

/// Title column of the author / category / period databases.
pub const RELATION_TITLE: &str = "标题";

fn truncate(text: &str) -> String {
    text.chars().take(MAX_TEXT_LEN).collect()
}

pub fn title(text: &str) -> Value {
    json!({ "title": [{ "type": "text", "text": { "content": truncate(text) } }] })
}

pub fn rich_text(text: &str) -> Value {
    json!({ "rich_text": [{ "type": "text", "text": { "content": truncate(text) } }] })
}

pub fn number_i64(value: i64) -> Value {
    json!({ "number": value })
}

pub fn number_f64(value: f64) -> Value {
    json!({ "number": value })
}

pub fn url(value: &str) -> Value {
    json!({ "url": value })
}

pub fn select(name: &str) -> Value {
    json!({ "select": { "name": name } })
}

pub fn status(name: &str) -> Value {
    json!({ "status": { "name": name } })
}

pub fn date(start: &str) -> Value {
    json!({ "date": { "start": start } })
}

pub fn relation(ids: &[String]) -> Value {
    let items: Vec<Value> = ids.iter().map(|id| json!({ "id": id })).collect();
    json!({ "relation": items })
}

/// External file object, used for page icons and covers.
pub fn external(url: &str) -> Value {
    json!({ "type": "external", "external": { "url": url } })
}

/// Properties written for a book. Fields the record leaves unset are omitted
/// so an update never clears a column.
pub fn book_properties(record: &BookRecord, clock: &ShelfClock) -> Map<String, Value> {
    let mut props = Map::new();
    let mut put = |key: &str, value: Value| {
        props.insert(key.to_string(), value);
    };

    put(book::BOOK_ID, rich_text(&record.book_id));
    if let Some(t) = &record.title {
        put(book::TITLE, title(t));
    }
    if let Some(isbn) = record.isbn.as_deref().filter(|s| !s.trim().is_empty()) {
        put(book::ISBN, rich_text(isbn));
    }
    if let Some(link) = &record.link {
        put(book::LINK, url(link));
    }
    if let Some(intro) = record.intro.as_deref().filter(|s| !s.trim().is_empty()) {
        put(book::INTRO, rich_text(intro));
    }
    if let Some(douban) = &record.douban_url {
        put(book::DOUBAN_URL, url(douban));
    }
    if let Some(ids) = &record.authors {
        put(book::AUTHORS, relation(ids));
    }
    if let Some(ids) = &record.categories {
        put(book::CATEGORIES, relation(ids));
    }
    if let Some(category) = &record.shelf_category {
        put(book::SHELF_CATEGORY, select(category));
    }

    put(book::PROGRESS, number_f64(record.progress));
    if let Some(s) = record.status {
        put(book::STATUS, status(s.label()));
    }
    if let Some(t) = record.reading_time {
        put(book::READING_TIME, number_i64(t));
    }
    if let Some(d) = record.read_days {
        put(book::READ_DAYS, number_i64(d));
    }
    if let Some(r) = record.rating {
        put(book::RATING, number_i64(r));
    }
    if let Some(label) = &record.my_rating {
        put(book::MY_RATING, select(label));
    }

    for (key, ts) in [
        (book::DATE, record.date),
        (book::BEGIN_READING, record.begin_reading),
        (book::LAST_READING, record.last_reading),
    ] {
        if let Some(dt) = ts.filter(|t| *t != 0).and_then(|t| clock.local(t)) {
            put(key, date(&dt.to_rfc3339()));
        }
    }

    for (key, id) in [
        (period::YEAR, &record.periods.year),
        (period::MONTH, &record.periods.month),
        (period::WEEK, &record.periods.week),
        (period::DATE, &record.periods.date),
    ] {
        if let Some(id) = id {
            put(key, relation(std::slice::from_ref(id)));
        }
    }

    props
}

/// Number value of a property, if set.
pub fn read_number(prop: Option<&Value>) -> Option<f64> {
    prop?.get("number")?.as_f64()
}

/// Number value as a whole number of seconds / a timestamp.
pub fn read_integer(prop: Option<&Value>) -> Option<i64> {
    read_number(prop).map(|n| n.round() as i64)
}

/// Concatenated plain text of a title or rich-text property.
pub fn read_text(prop: Option<&Value>) -> Option<String> {
    let prop = prop?;
    let items = prop
        .get("title")
        .or_else(|| prop.get("rich_text"))?
        .as_array()?;
    let text: String = items
        .iter()
        .filter_map(|item| {
            item.get("plain_text")
                .or_else(|| item.pointer("/text/content"))
                .and_then(Value::as_str)
        })
        .collect();
    (!text.is_empty()).then_some(text)
}

/// Option name of a select property.
pub fn read_select(prop: Option<&Value>) -> Option<String> {
    prop?
        .pointer("/select/name")
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// Option name of a status property (falls back to select).
pub fn read_status(prop: Option<&Value>) -> Option<String> {
    let prop = prop?;
    prop.pointer("/status/name")
        .or_else(|| prop.pointer("/select/name"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// URL of a page's cover (external or Notion-hosted).
pub fn read_cover(page: &Value) -> Option<String> {
    let cover = page.get("cover")?;
    cover
        .pointer("/external/url")
        .or_else(|| cover.pointer("/file/url"))
        .and_then(Value::as_str)
        .map(str::to_string)
}
