//! Book reconciliation.
//!
//! For every book on the tracked shelf that is not safe to skip, the book
//! page is rebuilt from the existing Notion state and fresh WeRead data,
//! written, and its per-day history reconciled into the per-book day rows.

use std::collections::HashMap;

use md5::{Digest, Md5};

use super::reading_days::reconcile_reading_days;
use super::{BookSyncSummary, DaySyncSummary};
use crate::catalog::IsbnLookup;
use crate::error::Result;
use crate::model::{
    derive_progress, derive_status, normalize_cover, primary_date, rating_label, BookRecord,
    BookSnapshot, PeriodRelations, ReadingStatus, ShelfScope, StoredBook,
};
use crate::source::ReadingSource;
use crate::store::{BookStore, DayScope, RelationTable};
use crate::timeutil::ShelfClock;

const WEREAD_READER_URL: &str = "https://weread.qq.com/web/reader/";

/// Whether an existing page is already up to date with the shelf.
///
/// Requires all of: reading time unchanged (or no shelf progress for the
/// book), shelf category unchanged, a cover, and a personal rating if the
/// book is finished.
pub fn is_skippable(book_id: &str, stored: &StoredBook, scope: &ShelfScope) -> bool {
    let time_unchanged = match scope.progress.get(book_id) {
        None => true,
        Some(progress) => progress.reading_time == stored.reading_time,
    };
    let category_unchanged = scope.category_of(book_id) == stored.category.as_deref();
    let rated_if_finished =
        stored.status != Some(ReadingStatus::Finished) || stored.my_rating.is_some();

    time_unchanged && category_unchanged && stored.cover.is_some() && rated_if_finished
}

/// Shelf books that need a write, in shelf order.
pub fn compute_sync_set(scope: &ShelfScope, existing: &HashMap<String, StoredBook>) -> Vec<String> {
    scope
        .book_ids
        .iter()
        .filter(|id| {
            !existing
                .get(id.as_str())
                .is_some_and(|stored| is_skippable(id, stored, scope))
        })
        .cloned()
        .collect()
}

/// Existing state, then book info, then read info (itself top level <
/// `readDetail` < `bookInfo`).
pub fn merge_snapshot(
    existing: Option<&StoredBook>,
    info: Option<BookSnapshot>,
    read_info: BookSnapshot,
) -> BookSnapshot {
    let mut snapshot = BookSnapshot::default();
    if let Some(stored) = existing {
        snapshot.reading_time = stored.reading_time;
        snapshot.cover = stored.cover.clone();
    }
    if let Some(info) = info {
        snapshot.overlay(info);
    }
    snapshot.overlay(read_info);
    snapshot
}

/// Derived properties of a book. Identity fields are left for the caller.
pub fn derive_record(
    book_id: &str,
    snapshot: &BookSnapshot,
    shelf_category: Option<&str>,
    page_id: Option<String>,
) -> BookRecord {
    let status = derive_status(snapshot.marked_status, snapshot.reading_time);
    let my_rating = snapshot
        .new_rating_detail
        .as_ref()
        .and_then(|d| d.my_rating.as_deref());

    BookRecord {
        page_id,
        book_id: book_id.to_string(),
        shelf_category: shelf_category.map(str::to_string),
        progress: derive_progress(snapshot.marked_status, snapshot.reading_progress),
        status: Some(status),
        reading_time: snapshot.reading_time,
        read_days: snapshot.total_read_day,
        rating: snapshot.new_rating,
        my_rating: rating_label(my_rating, status),
        date: primary_date(snapshot),
        begin_reading: snapshot.begin_reading_date,
        last_reading: snapshot.last_reading_date,
        cover: normalize_cover(snapshot.cover.as_deref()),
        ..BookRecord::default()
    }
}

fn md5_hex(input: &str) -> String {
    format!("{:x}", Md5::digest(input.as_bytes()))
}

/// Hex chunks of a book id: 9-digit groups for all-digit ids (code `3`),
/// otherwise the hex of every character (code `4`).
fn encode_book_id(book_id: &str) -> (char, Vec<String>) {
    if book_id.bytes().all(|b| b.is_ascii_digit()) {
        let chunks = book_id
            .as_bytes()
            .chunks(9)
            .map(|chunk| {
                let value = chunk
                    .iter()
                    .fold(0u64, |acc, digit| acc * 10 + u64::from(digit - b'0'));
                format!("{value:x}")
            })
            .collect();
        return ('3', chunks);
    }
    let hex = book_id.chars().map(|c| format!("{:x}", u32::from(c))).collect();
    ('4', vec![hex])
}

/// Reader id WeRead uses in `web/reader/<id>` links.
pub fn reader_id(book_id: &str) -> String {
    let digest = md5_hex(book_id);
    let (code, chunks) = encode_book_id(book_id);

    let mut id = format!("{}{code}2{}", &digest[..3], &digest[digest.len() - 2..]);
    let parts: Vec<String> = chunks
        .iter()
        .map(|chunk| format!("{:02x}{chunk}", chunk.len()))
        .collect();
    id.push_str(&parts.join("g"));

    if id.len() < 20 {
        id.push_str(&digest[..20 - id.len()]);
    }
    let check = md5_hex(&id);
    id.push_str(&check[..3]);
    id
}

/// Reader link written for a new book page.
pub fn weread_url(book_id: &str) -> String {
    format!("{WEREAD_READER_URL}{}", reader_id(book_id))
}

/// Runs book reconciliation against a source and a store.
pub struct BookReconciler<'a> {
    source: &'a dyn ReadingSource,
    store: &'a mut dyn BookStore,
    catalog: &'a dyn IsbnLookup,
    clock: ShelfClock,
}

impl<'a> BookReconciler<'a> {
    pub fn new(
        source: &'a dyn ReadingSource,
        store: &'a mut dyn BookStore,
        catalog: &'a dyn IsbnLookup,
        clock: ShelfClock,
    ) -> Self {
        Self {
            source,
            store,
            catalog,
            clock,
        }
    }

    /// Sync every book on the shelf called `shelf_name`.
    ///
    /// A missing shelf is not an error: nothing is synced.
    pub fn run(&mut self, shelf_name: &str) -> Result<BookSyncSummary> {
        let shelf = self.source.bookshelf()?;
        let scope = shelf.scope(shelf_name).unwrap_or_else(|| {
            tracing::warn!(shelf = %shelf_name, "shelf not found, nothing to sync");
            ShelfScope::empty(shelf_name)
        });
        tracing::debug!(shelf = %shelf_name, books = scope.book_ids.len(), "loaded shelf");

        let existing = self.store.books()?;
        let notebooks = self.source.notebooks()?;
        tracing::debug!(count = notebooks.len(), "books with notes");

        let sync_set = compute_sync_set(&scope, &existing);
        let mut summary = BookSyncSummary {
            skipped: scope.book_ids.len() - sync_set.len(),
            ..BookSyncSummary::default()
        };
        tracing::info!(
            total = scope.book_ids.len(),
            to_sync = sync_set.len(),
            skipped = summary.skipped,
            "book sync planned"
        );

        let total = sync_set.len();
        for (index, book_id) in sync_set.iter().enumerate() {
            let stored = existing.get(book_id);
            let days = self.sync_book(&scope, book_id, stored, index, total)?;
            if stored.is_some() {
                summary.updated += 1;
            } else {
                summary.created += 1;
            }
            summary.days += days;
        }

        tracing::info!(%summary, "book sync finished");
        Ok(summary)
    }

    fn sync_book(
        &mut self,
        scope: &ShelfScope,
        book_id: &str,
        stored: Option<&StoredBook>,
        index: usize,
        total: usize,
    ) -> Result<DaySyncSummary> {
        let info = self.source.book_info(book_id)?;
        let read_info = self.source.read_info(book_id)?.into_snapshot();
        let snapshot = merge_snapshot(stored, info, read_info);

        let mut record = derive_record(
            book_id,
            &snapshot,
            scope.category_of(book_id),
            stored.map(|s| s.page_id.clone()),
        );
        if stored.is_none() {
            self.fill_identity(&mut record, &snapshot)?;
        }
        if let Some(date) = record.date {
            record.periods = self.period_relations(date)?;
        }

        let title = snapshot.title.as_deref().unwrap_or(book_id);
        tracing::info!("syncing 《{title}》 ({}/{total})", index + 1);
        let page_id = self.store.save_book(&record)?;

        let history = snapshot.daily_durations();
        if history.is_empty() {
            return Ok(DaySyncSummary::default());
        }
        reconcile_reading_days(&mut *self.store, &DayScope::Book(page_id), &history)
    }

    /// Identity fields and relations, written only when a page is created.
    fn fill_identity(&mut self, record: &mut BookRecord, snapshot: &BookSnapshot) -> Result<()> {
        if let Some(isbn) = snapshot.isbn.as_deref().filter(|s| !s.trim().is_empty()) {
            record.douban_url = self.catalog.douban_url(isbn);
        }
        record.title = snapshot.title.clone();
        record.isbn = snapshot.isbn.clone();
        record.link = Some(weread_url(&record.book_id));
        record.intro = snapshot.intro.clone();

        let mut authors = Vec::new();
        for name in snapshot.author_names() {
            authors.extend(self.store.relation_id(RelationTable::Author, &name)?);
        }
        record.authors = Some(authors);

        let titles = snapshot.category_titles();
        if !titles.is_empty() {
            let mut categories = Vec::new();
            for title in titles {
                categories.extend(self.store.relation_id(RelationTable::Category, &title)?);
            }
            record.categories = Some(categories);
        }
        Ok(())
    }

    fn period_relations(&mut self, timestamp: i64) -> Result<PeriodRelations> {
        let Some(titles) = self.clock.period_titles(timestamp) else {
            return Ok(PeriodRelations::default());
        };
        Ok(PeriodRelations {
            year: self.store.relation_id(RelationTable::Year, &titles.year)?,
            month: self.store.relation_id(RelationTable::Month, &titles.month)?,
            week: self.store.relation_id(RelationTable::Week, &titles.week)?,
            date: self.store.relation_id(RelationTable::Date, &titles.date)?,
        })
    }
}
