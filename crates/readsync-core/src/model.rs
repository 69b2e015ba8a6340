//! Typed records on both sides of the sync.
//!
//! - [`BookSnapshot`]: what WeRead says about a book. Every field is optional
//!   because the payloads from the shelf, `book/info` and `book/readinfo`
//!   endpoints each carry a different subset; snapshots are combined with
//!   [`BookSnapshot::overlay`].
//! - [`StoredBook`]: what Notion already holds for a book.
//! - [`BookRecord`]: the typed properties written for a book.
//! - [`ReadingDayRecord`]: one duration row in a reading-day database.
//!
//! The derivation rules (status, progress, rating label, primary date, cover)
//! live here as free functions so both reconciliation passes and the tests
//! share one definition.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// `markedStatus` value WeRead uses for a finished book.
pub const FINISHED_MARKED_STATUS: i64 = 4;

/// Reading time (seconds) from which a book counts as "在读".
pub const READING_THRESHOLD_SECS: i64 = 60;

/// Icon used when a book has no usable cover.
pub const DEFAULT_BOOK_ICON: &str = "https://www.notion.so/icons/book_gray.svg";

/// Personal-rating label for a finished book without a rating.
pub const UNRATED_LABEL: &str = "未评分";

/// Book category as WeRead reports it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Category {
    pub title: Option<String>,
}

/// The reader's own rating of a book.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RatingDetail {
    /// `"poor"`, `"fair"` or `"good"`.
    pub my_rating: Option<String>,
}

/// Seconds read on one day.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DailyRead {
    /// Local midnight of the day, unix seconds.
    pub read_date: i64,
    pub read_time: i64,
}

/// Remote-side view of a book.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BookSnapshot {
    pub book_id: Option<String>,
    pub title: Option<String>,
    pub author: Option<String>,
    pub intro: Option<String>,
    pub cover: Option<String>,
    pub isbn: Option<String>,
    pub categories: Option<Vec<Category>>,
    pub new_rating: Option<i64>,
    pub new_rating_detail: Option<RatingDetail>,
    pub marked_status: Option<i64>,
    pub reading_progress: Option<i64>,
    pub reading_time: Option<i64>,
    pub total_read_day: Option<i64>,
    pub finished_date: Option<i64>,
    pub last_reading_date: Option<i64>,
    pub reading_book_date: Option<i64>,
    pub begin_reading_date: Option<i64>,
    /// Per-day history, present in the `readDetail` part of `book/readinfo`.
    pub data: Option<Vec<DailyRead>>,
}

fn overlay_field<T>(slot: &mut Option<T>, value: Option<T>) {
    if value.is_some() {
        *slot = value;
    }
}

impl BookSnapshot {
    /// Assign every field `other` carries; fields it lacks keep their value.
    pub fn overlay(&mut self, other: BookSnapshot) {
        overlay_field(&mut self.book_id, other.book_id);
        overlay_field(&mut self.title, other.title);
        overlay_field(&mut self.author, other.author);
        overlay_field(&mut self.intro, other.intro);
        overlay_field(&mut self.cover, other.cover);
        overlay_field(&mut self.isbn, other.isbn);
        overlay_field(&mut self.categories, other.categories);
        overlay_field(&mut self.new_rating, other.new_rating);
        overlay_field(&mut self.new_rating_detail, other.new_rating_detail);
        overlay_field(&mut self.marked_status, other.marked_status);
        overlay_field(&mut self.reading_progress, other.reading_progress);
        overlay_field(&mut self.reading_time, other.reading_time);
        overlay_field(&mut self.total_read_day, other.total_read_day);
        overlay_field(&mut self.finished_date, other.finished_date);
        overlay_field(&mut self.last_reading_date, other.last_reading_date);
        overlay_field(&mut self.reading_book_date, other.reading_book_date);
        overlay_field(&mut self.begin_reading_date, other.begin_reading_date);
        overlay_field(&mut self.data, other.data);
    }

    /// Per-day history as a `timestamp -> seconds` map. Later entries for the
    /// same day win.
    pub fn daily_durations(&self) -> BTreeMap<i64, i64> {
        self.data
            .iter()
            .flatten()
            .map(|d| (d.read_date, d.read_time))
            .collect()
    }

    /// Author names, split on spaces the way WeRead joins co-authors.
    pub fn author_names(&self) -> Vec<String> {
        self.author
            .as_deref()
            .unwrap_or_default()
            .split(' ')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }

    pub fn category_titles(&self) -> Vec<String> {
        self.categories
            .iter()
            .flatten()
            .filter_map(|c| c.title.clone())
            .filter(|t| !t.trim().is_empty())
            .collect()
    }
}

/// Reading status shown in the book database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReadingStatus {
    /// 想读
    WantToRead,
    /// 在读
    Reading,
    /// 已读
    Finished,
}

impl ReadingStatus {
    pub fn label(&self) -> &'static str {
        match self {
            ReadingStatus::WantToRead => "想读",
            ReadingStatus::Reading => "在读",
            ReadingStatus::Finished => "已读",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "想读" => Some(ReadingStatus::WantToRead),
            "在读" => Some(ReadingStatus::Reading),
            "已读" => Some(ReadingStatus::Finished),
            _ => None,
        }
    }
}

/// finished ⇒ 已读; else ≥ 60s read ⇒ 在读; else 想读.
pub fn derive_status(marked_status: Option<i64>, reading_time: Option<i64>) -> ReadingStatus {
    if marked_status == Some(FINISHED_MARKED_STATUS) {
        ReadingStatus::Finished
    } else if reading_time.unwrap_or(0) >= READING_THRESHOLD_SECS {
        ReadingStatus::Reading
    } else {
        ReadingStatus::WantToRead
    }
}

/// Progress as a fraction in `0.0..=1.0`; a finished book is always `1.0`.
pub fn derive_progress(marked_status: Option<i64>, reading_progress: Option<i64>) -> f64 {
    let percent = if marked_status == Some(FINISHED_MARKED_STATUS) {
        100
    } else {
        reading_progress.unwrap_or(0)
    };
    percent.clamp(0, 100) as f64 / 100.0
}

/// Star label for the reader's own rating, or 未评分 for an unrated finished book.
pub fn rating_label(my_rating: Option<&str>, status: ReadingStatus) -> Option<String> {
    let stars = match my_rating {
        Some("poor") => Some("⭐️"),
        Some("fair") => Some("⭐️⭐️⭐️"),
        Some("good") => Some("⭐️⭐️⭐️⭐️⭐️"),
        _ => None,
    };
    match stars {
        Some(s) => Some(s.to_string()),
        None if status == ReadingStatus::Finished => Some(UNRATED_LABEL.to_string()),
        None => None,
    }
}

/// finishedDate, else lastReadingDate, else readingBookDate. Zero means unset.
pub fn primary_date(snapshot: &BookSnapshot) -> Option<i64> {
    [
        snapshot.finished_date,
        snapshot.last_reading_date,
        snapshot.reading_book_date,
    ]
    .into_iter()
    .flatten()
    .find(|ts| *ts != 0)
}

/// Swap the small-thumbnail marker for the large one; fall back to the
/// default icon when the result is not an http(s) URL.
pub fn normalize_cover(cover: Option<&str>) -> String {
    let cover = cover.unwrap_or_default().replace("/s_", "/t7_");
    let trimmed = cover.trim();
    if trimmed.is_empty() || !trimmed.starts_with("http") {
        DEFAULT_BOOK_ICON.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Existing Notion state of a book, as needed to decide whether to sync it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoredBook {
    pub page_id: String,
    pub reading_time: Option<i64>,
    /// Shelf-archive category ("书架分类").
    pub category: Option<String>,
    /// Page cover URL, `None` when the page has no cover.
    pub cover: Option<String>,
    pub status: Option<ReadingStatus>,
    pub my_rating: Option<String>,
}

/// Relation ids for the period rows a book's primary date falls in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PeriodRelations {
    pub year: Option<String>,
    pub month: Option<String>,
    pub week: Option<String>,
    pub date: Option<String>,
}

/// Properties written to the book database.
///
/// Identity fields (`title`, `isbn`, `link`, `intro`, `douban_url`, `authors`,
/// `categories`) are only filled when the page is first created.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BookRecord {
    /// Known page id; `None` means the page must be created.
    pub page_id: Option<String>,
    pub book_id: String,
    pub title: Option<String>,
    pub isbn: Option<String>,
    pub link: Option<String>,
    pub intro: Option<String>,
    pub douban_url: Option<String>,
    /// Relation ids in the author database.
    pub authors: Option<Vec<String>>,
    /// Relation ids in the category database.
    pub categories: Option<Vec<String>>,
    pub shelf_category: Option<String>,
    pub progress: f64,
    pub status: Option<ReadingStatus>,
    pub reading_time: Option<i64>,
    pub read_days: Option<i64>,
    pub rating: Option<i64>,
    pub my_rating: Option<String>,
    pub date: Option<i64>,
    pub begin_reading: Option<i64>,
    pub last_reading: Option<i64>,
    pub cover: String,
    pub periods: PeriodRelations,
}

/// One row of a reading-day database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadingDayRecord {
    pub page_id: String,
    pub timestamp: i64,
    pub duration: i64,
}

/// Per-book progress entry on the shelf.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ShelfProgress {
    pub book_id: String,
    pub reading_time: Option<i64>,
    pub progress: Option<i64>,
}

/// The tracked shelf: which books are in scope and their shelf progress.
///
/// A missing shelf is represented by [`ShelfScope::empty`], which makes both
/// passes no-ops.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShelfScope {
    pub name: String,
    /// Shelf order.
    pub book_ids: Vec<String>,
    pub progress: HashMap<String, ShelfProgress>,
}

impl ShelfScope {
    pub fn empty(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    pub fn contains(&self, book_id: &str) -> bool {
        self.book_ids.iter().any(|id| id == book_id)
    }

    /// Category a book on this shelf is filed under.
    pub fn category_of(&self, book_id: &str) -> Option<&str> {
        self.contains(book_id).then_some(self.name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_follows_marked_status_then_reading_time() {
        assert_eq!(derive_status(Some(4), Some(0)), ReadingStatus::Finished);
        assert_eq!(derive_status(Some(4), None), ReadingStatus::Finished);
        assert_eq!(derive_status(Some(2), Some(60)), ReadingStatus::Reading);
        assert_eq!(derive_status(None, Some(3600)), ReadingStatus::Reading);
        assert_eq!(derive_status(Some(2), Some(59)), ReadingStatus::WantToRead);
        assert_eq!(derive_status(None, None), ReadingStatus::WantToRead);
    }

    #[test]
    fn status_labels_round_trip() {
        for status in [
            ReadingStatus::WantToRead,
            ReadingStatus::Reading,
            ReadingStatus::Finished,
        ] {
            assert_eq!(ReadingStatus::from_label(status.label()), Some(status));
        }
        assert_eq!(ReadingStatus::from_label("读过"), None);
    }

    #[test]
    fn progress_is_capped_fraction() {
        assert_eq!(derive_progress(Some(4), Some(37)), 1.0);
        assert_eq!(derive_progress(Some(2), Some(37)), 0.37);
        assert_eq!(derive_progress(None, None), 0.0);
        assert_eq!(derive_progress(None, Some(140)), 1.0);
    }

    #[test]
    fn rating_label_tiers() {
        assert_eq!(
            rating_label(Some("poor"), ReadingStatus::Reading).as_deref(),
            Some("⭐️")
        );
        assert_eq!(
            rating_label(Some("fair"), ReadingStatus::Finished).as_deref(),
            Some("⭐️⭐️⭐️")
        );
        assert_eq!(
            rating_label(Some("good"), ReadingStatus::Finished).as_deref(),
            Some("⭐️⭐️⭐️⭐️⭐️")
        );
        assert_eq!(
            rating_label(None, ReadingStatus::Finished).as_deref(),
            Some("未评分")
        );
        assert_eq!(rating_label(None, ReadingStatus::Reading), None);
    }

    #[test]
    fn primary_date_precedence() {
        let mut snapshot = BookSnapshot {
            reading_book_date: Some(30),
            ..Default::default()
        };
        assert_eq!(primary_date(&snapshot), Some(30));

        snapshot.last_reading_date = Some(20);
        assert_eq!(primary_date(&snapshot), Some(20));

        snapshot.finished_date = Some(10);
        assert_eq!(primary_date(&snapshot), Some(10));

        snapshot.finished_date = Some(0);
        assert_eq!(primary_date(&snapshot), Some(20));

        assert_eq!(primary_date(&BookSnapshot::default()), None);
    }

    #[test]
    fn cover_switches_to_large_thumbnail() {
        assert_eq!(
            normalize_cover(Some("https://x/s_abc.jpg")),
            "https://x/t7_abc.jpg"
        );
    }

    #[test]
    fn cover_falls_back_to_default_icon() {
        assert_eq!(normalize_cover(None), DEFAULT_BOOK_ICON);
        assert_eq!(normalize_cover(Some("   ")), DEFAULT_BOOK_ICON);
        assert_eq!(normalize_cover(Some("/local/s_a.jpg")), DEFAULT_BOOK_ICON);
    }

    #[test]
    fn overlay_keeps_fields_the_newer_snapshot_lacks() {
        let mut base = BookSnapshot {
            title: Some("Old".into()),
            cover: Some("https://c/s_1.jpg".into()),
            reading_time: Some(10),
            ..Default::default()
        };
        base.overlay(BookSnapshot {
            title: Some("New".into()),
            reading_time: Some(120),
            ..Default::default()
        });
        assert_eq!(base.title.as_deref(), Some("New"));
        assert_eq!(base.cover.as_deref(), Some("https://c/s_1.jpg"));
        assert_eq!(base.reading_time, Some(120));
    }

    #[test]
    fn snapshot_parses_camel_case_payload() {
        let snapshot: BookSnapshot = serde_json::from_value(serde_json::json!({
            "bookId": "123",
            "title": "三体",
            "author": "刘慈欣 宝树",
            "categories": [{"title": "科幻"}, {"title": ""}],
            "newRatingDetail": {"myRating": "good"},
            "markedStatus": 4,
            "data": [{"readDate": 100, "readTime": 30}, {"readDate": 200, "readTime": 0}],
            "unknownField": true
        }))
        .unwrap();

        assert_eq!(snapshot.book_id.as_deref(), Some("123"));
        assert_eq!(snapshot.marked_status, Some(FINISHED_MARKED_STATUS));
        assert_eq!(snapshot.author_names(), vec!["刘慈欣", "宝树"]);
        assert_eq!(snapshot.category_titles(), vec!["科幻"]);
        assert_eq!(
            snapshot.daily_durations(),
            BTreeMap::from([(100, 30), (200, 0)])
        );
    }

    #[test]
    fn shelf_scope_category() {
        let scope = ShelfScope {
            name: "ll的书架".into(),
            book_ids: vec!["a".into(), "b".into()],
            progress: HashMap::new(),
        };
        assert_eq!(scope.category_of("a"), Some("ll的书架"));
        assert_eq!(scope.category_of("z"), None);
        assert!(!ShelfScope::empty("x").contains("a"));
    }
}
