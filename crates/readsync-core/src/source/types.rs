//! WeRead payload types.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::error::{Result, SyncError};
use crate::model::{BookSnapshot, ShelfProgress, ShelfScope};

/// Book ids arrive as strings or bare numbers depending on the endpoint.
fn deserialize_ids<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Vec::<serde_json::Value>::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .filter_map(|v| match v {
            serde_json::Value::String(s) => Some(s),
            serde_json::Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
        .collect())
}

/// A named shelf archive.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ShelfArchive {
    pub name: String,
    #[serde(deserialize_with = "deserialize_ids")]
    pub book_ids: Vec<String>,
    /// Some accounts report progress per archive.
    pub book_progress: Option<Vec<ShelfProgress>>,
}

/// Response of `web/shelf/sync`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Bookshelf {
    pub archive: Vec<ShelfArchive>,
    pub book_progress: Vec<ShelfProgress>,
}

impl Bookshelf {
    /// Scope of the archive called `name`, or `None` if no such archive exists.
    ///
    /// Progress comes from the archive when it carries its own, otherwise from
    /// the shelf-wide list restricted to the archive's books.
    pub fn scope(&self, name: &str) -> Option<ShelfScope> {
        let archive = self.archive.iter().find(|a| a.name == name)?;
        let progress_source = archive
            .book_progress
            .as_deref()
            .unwrap_or(&self.book_progress);

        let progress: HashMap<String, ShelfProgress> = progress_source
            .iter()
            .filter(|p| archive.book_ids.contains(&p.book_id))
            .map(|p| (p.book_id.clone(), p.clone()))
            .collect();

        let mut book_ids = Vec::with_capacity(archive.book_ids.len());
        for id in &archive.book_ids {
            if !book_ids.contains(id) {
                book_ids.push(id.clone());
            }
        }

        Some(ShelfScope {
            name: archive.name.clone(),
            book_ids,
            progress,
        })
    }
}

/// Response of `web/book/readinfo`.
///
/// Field precedence when flattened: top level < `readDetail` < `bookInfo`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadInfo {
    #[serde(flatten)]
    pub summary: BookSnapshot,
    #[serde(default)]
    pub read_detail: Option<BookSnapshot>,
    #[serde(default)]
    pub book_info: Option<BookSnapshot>,
}

impl ReadInfo {
    pub fn into_snapshot(self) -> BookSnapshot {
        let mut snapshot = self.summary;
        if let Some(detail) = self.read_detail {
            snapshot.overlay(detail);
        }
        if let Some(info) = self.book_info {
            snapshot.overlay(info);
        }
        snapshot
    }
}

/// Entry of `api/user/notebook`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Notebook {
    pub book_id: String,
    pub note_count: i64,
    pub review_count: i64,
}

/// `readTimes` of the reading summary: either one `day -> seconds` map, or
/// one such map per book id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadTimes {
    Flat(BTreeMap<i64, i64>),
    ByBook(BTreeMap<String, BTreeMap<i64, i64>>),
}

impl Default for ReadTimes {
    fn default() -> Self {
        ReadTimes::Flat(BTreeMap::new())
    }
}

fn parse_day_map(value: &serde_json::Value) -> Result<BTreeMap<i64, i64>> {
    value
        .as_object()
        .ok_or_else(|| SyncError::Source(format!("readTimes entry is not an object: {value}")))?
        .iter()
        .map(|(key, seconds)| -> Result<(i64, i64)> {
            let day = key
                .trim()
                .parse::<i64>()
                .map_err(|_| SyncError::Source(format!("readTimes key is not a timestamp: {key}")))?;
            let seconds = seconds
                .as_i64()
                .or_else(|| seconds.as_f64().map(|f| f as i64))
                .ok_or_else(|| {
                    SyncError::Source(format!("readTimes value for {key} is not a number"))
                })?;
            Ok((day, seconds))
        })
        .collect()
}

impl ReadTimes {
    /// Parse the `readTimes` value of the summary payload. A missing or null
    /// value is an empty flat map.
    pub fn from_value(value: Option<&serde_json::Value>) -> Result<Self> {
        let value = match value {
            None | Some(serde_json::Value::Null) => return Ok(ReadTimes::default()),
            Some(v) => v,
        };
        let obj = value
            .as_object()
            .ok_or_else(|| SyncError::Source(format!("readTimes is not an object: {value}")))?;

        let nested = obj.values().next().is_some_and(|v| v.is_object());
        if !nested {
            return Ok(ReadTimes::Flat(parse_day_map(value)?));
        }

        let by_book = obj
            .iter()
            .map(|(book_id, days)| -> Result<(String, BTreeMap<i64, i64>)> {
                Ok((book_id.clone(), parse_day_map(days)?))
            })
            .collect::<Result<BTreeMap<_, _>>>()?;
        Ok(ReadTimes::ByBook(by_book))
    }
}
