//! Aggregate per-day reading time.
//!
//! Reconciles the reading summary into the daily database. Every row of that
//! database takes part in matching; day rows carry no owner.

use std::collections::BTreeMap;

use super::reading_days::reconcile_reading_days;
use super::DaySyncSummary;
use crate::error::Result;
use crate::model::ShelfScope;
use crate::source::{ReadTimes, ReadingSource};
use crate::store::{BookStore, DayScope};

/// `timestamp -> seconds` for the daily database.
///
/// A flat summary is taken as is. A per-book summary is restricted to books
/// on the shelf and summed per day. `today` is added with zero seconds when
/// the summary has no entry for it.
pub fn daily_incoming(read_times: &ReadTimes, scope: &ShelfScope, today: i64) -> BTreeMap<i64, i64> {
    let mut incoming = match read_times {
        ReadTimes::Flat(days) => days.clone(),
        ReadTimes::ByBook(books) => {
            let mut sums = BTreeMap::new();
            for (book_id, days) in books {
                if !scope.contains(book_id) {
                    continue;
                }
                for (day, seconds) in days {
                    *sums.entry(*day).or_insert(0) += seconds;
                }
            }
            sums
        }
    };
    incoming.entry(today).or_insert(0);
    incoming
}

/// Run the aggregate pass for the shelf called `shelf_name`.
pub fn sync_daily(
    source: &dyn ReadingSource,
    store: &mut dyn BookStore,
    shelf_name: &str,
    today: i64,
) -> Result<DaySyncSummary> {
    let shelf = source.bookshelf()?;
    let scope = shelf.scope(shelf_name).unwrap_or_else(|| {
        tracing::warn!(shelf = %shelf_name, "shelf not found");
        ShelfScope::empty(shelf_name)
    });

    let read_times = source.read_times()?;
    let incoming = daily_incoming(&read_times, &scope, today);
    tracing::debug!(days = incoming.len(), "daily reading times");

    let summary = reconcile_reading_days(store, &DayScope::Daily, &incoming)?;
    tracing::info!(%summary, "daily sync finished");
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TODAY: i64 = 1_710_432_000;

    fn scope(ids: &[&str]) -> ShelfScope {
        ShelfScope {
            name: "ll的书架".into(),
            book_ids: ids.iter().map(|s| s.to_string()).collect(),
            ..ShelfScope::default()
        }
    }

    #[test]
    fn flat_summary_gets_today_placeholder() {
        let times = ReadTimes::Flat(BTreeMap::from([(100, 30)]));
        assert_eq!(
            daily_incoming(&times, &scope(&[]), TODAY),
            BTreeMap::from([(100, 30), (TODAY, 0)])
        );
    }

    #[test]
    fn existing_today_entry_is_kept() {
        let times = ReadTimes::Flat(BTreeMap::from([(TODAY, 300)]));
        assert_eq!(
            daily_incoming(&times, &scope(&[]), TODAY),
            BTreeMap::from([(TODAY, 300)])
        );
    }

    #[test]
    fn per_book_summary_is_restricted_and_summed() {
        let times = ReadTimes::ByBook(BTreeMap::from([
            ("a".to_string(), BTreeMap::from([(100, 30), (200, 10)])),
            ("b".to_string(), BTreeMap::from([(100, 15)])),
            ("other".to_string(), BTreeMap::from([(100, 999)])),
        ]));
        assert_eq!(
            daily_incoming(&times, &scope(&["a", "b"]), TODAY),
            BTreeMap::from([(100, 45), (200, 10), (TODAY, 0)])
        );
    }
}
