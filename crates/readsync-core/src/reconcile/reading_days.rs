//! Reading-duration reconciliation.
//!
//! Incoming durations are keyed by day timestamp. An existing row whose
//! timestamp appears in the incoming map consumes that entry and is updated
//! only if its duration differs. Entries nobody consumed become new rows, in
//! ascending timestamp order. Rows are never deleted.

use std::collections::BTreeMap;

use super::DaySyncSummary;
use crate::error::Result;
use crate::model::ReadingDayRecord;
use crate::store::{BookStore, DayScope};

/// A single write against a reading-day database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DayWrite {
    Update {
        page_id: String,
        timestamp: i64,
        from: i64,
        to: i64,
    },
    Create {
        timestamp: i64,
        duration: i64,
    },
}

/// Writes that bring `existing` in line with `incoming`.
///
/// When two existing rows share a timestamp only the first one is matched;
/// the other is left alone.
pub fn plan_day_writes(
    existing: &[ReadingDayRecord],
    incoming: &BTreeMap<i64, i64>,
) -> Vec<DayWrite> {
    let mut pending = incoming.clone();
    let mut writes = Vec::new();

    for row in existing {
        let Some(duration) = pending.remove(&row.timestamp) else {
            continue;
        };
        if duration != row.duration {
            writes.push(DayWrite::Update {
                page_id: row.page_id.clone(),
                timestamp: row.timestamp,
                from: row.duration,
                to: duration,
            });
        }
    }

    writes.extend(
        pending
            .into_iter()
            .map(|(timestamp, duration)| DayWrite::Create { timestamp, duration }),
    );
    writes
}

/// Read the rows in `scope`, plan, and apply the writes.
pub fn reconcile_reading_days(
    store: &mut dyn BookStore,
    scope: &DayScope,
    incoming: &BTreeMap<i64, i64>,
) -> Result<DaySyncSummary> {
    let existing = store.reading_days(scope)?;
    let writes = plan_day_writes(&existing, incoming);
    let mut summary = DaySyncSummary::default();

    for write in writes {
        match write {
            DayWrite::Update {
                page_id,
                timestamp,
                from,
                to,
            } => {
                tracing::debug!(?scope, timestamp, from, to, "updating day row");
                store.save_reading_day(scope, Some(&page_id), timestamp, to)?;
                summary.updated += 1;
            }
            DayWrite::Create {
                timestamp,
                duration,
            } => {
                tracing::debug!(?scope, timestamp, duration, "creating day row");
                store.save_reading_day(scope, None, timestamp, duration)?;
                summary.created += 1;
            }
        }
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, StoreWrite};
    use proptest::prelude::*;
    use std::collections::HashSet;

    fn row(page_id: &str, timestamp: i64, duration: i64) -> ReadingDayRecord {
        ReadingDayRecord {
            page_id: page_id.into(),
            timestamp,
            duration,
        }
    }

    #[test]
    fn new_day_is_created_and_unchanged_day_is_left_alone() {
        let existing = [row("d1", 100, 30)];
        let incoming = BTreeMap::from([(100, 30), (200, 0)]);
        assert_eq!(
            plan_day_writes(&existing, &incoming),
            vec![DayWrite::Create {
                timestamp: 200,
                duration: 0
            }]
        );
    }

    #[test]
    fn changed_duration_is_updated_in_place() {
        let existing = [row("d1", 100, 30)];
        let incoming = BTreeMap::from([(100, 45)]);
        assert_eq!(
            plan_day_writes(&existing, &incoming),
            vec![DayWrite::Update {
                page_id: "d1".into(),
                timestamp: 100,
                from: 30,
                to: 45
            }]
        );
    }

    #[test]
    fn rows_missing_from_incoming_are_kept() {
        let existing = [row("d1", 100, 30), row("d2", 50, 10)];
        let incoming = BTreeMap::from([(100, 30)]);
        assert!(plan_day_writes(&existing, &incoming).is_empty());
    }

    #[test]
    fn only_first_duplicate_row_is_matched() {
        let existing = [row("d1", 100, 30), row("d2", 100, 99)];
        let incoming = BTreeMap::from([(100, 45)]);
        assert_eq!(
            plan_day_writes(&existing, &incoming),
            vec![DayWrite::Update {
                page_id: "d1".into(),
                timestamp: 100,
                from: 30,
                to: 45
            }]
        );
    }

    #[test]
    fn creates_are_in_ascending_order() {
        let incoming = BTreeMap::from([(300, 1), (100, 2), (200, 3)]);
        let created: Vec<i64> = plan_day_writes(&[], &incoming)
            .into_iter()
            .map(|w| match w {
                DayWrite::Create { timestamp, .. } => timestamp,
                other => panic!("unexpected {other:?}"),
            })
            .collect();
        assert_eq!(created, vec![100, 200, 300]);
    }

    #[test]
    fn second_run_writes_nothing() {
        let scope = DayScope::Book("book-page".into());
        let mut store = MemoryStore::new().with_day(scope.clone(), "d1", 100, 30);
        let incoming = BTreeMap::from([(100, 45), (200, 0)]);

        let first = reconcile_reading_days(&mut store, &scope, &incoming).unwrap();
        assert_eq!(
            first,
            DaySyncSummary {
                created: 1,
                updated: 1
            }
        );
        assert_eq!(
            store.writes()[0],
            StoreWrite::UpdateDay {
                scope: scope.clone(),
                page_id: "d1".into(),
                timestamp: 100,
                duration: 45
            }
        );

        store.clear_writes();
        let second = reconcile_reading_days(&mut store, &scope, &incoming).unwrap();
        assert_eq!(second.writes(), 0);
        assert!(store.writes().is_empty());
    }

    #[test]
    fn scopes_do_not_see_each_other() {
        let a = DayScope::Book("a".into());
        let b = DayScope::Book("b".into());
        let mut store = MemoryStore::new().with_day(a.clone(), "d1", 100, 30);

        let summary = reconcile_reading_days(&mut store, &b, &BTreeMap::from([(100, 30)])).unwrap();
        assert_eq!(summary.created, 1);
        assert_eq!(store.day_rows(&a).len(), 1);
        assert_eq!(store.day_rows(&b).len(), 1);
    }

    fn arb_rows() -> impl Strategy<Value = Vec<(i64, i64)>> {
        prop::collection::vec((0i64..20, 0i64..5), 0..12)
    }

    fn arb_incoming() -> impl Strategy<Value = BTreeMap<i64, i64>> {
        prop::collection::btree_map(0i64..20, 0i64..5, 0..12)
    }

    proptest! {
        #[test]
        fn reconcile_is_idempotent(rows in arb_rows(), incoming in arb_incoming()) {
            // Start from unique timestamps, as a reconciled database would be.
            let mut seen = HashSet::new();
            let scope = DayScope::Daily;
            let mut store = MemoryStore::new();
            for (i, (ts, duration)) in rows.into_iter().enumerate() {
                if seen.insert(ts) {
                    store = store.with_day(scope.clone(), &format!("seed-{i}"), ts, duration);
                }
            }

            reconcile_reading_days(&mut store, &scope, &incoming).unwrap();
            store.clear_writes();
            let again = reconcile_reading_days(&mut store, &scope, &incoming).unwrap();
            prop_assert_eq!(again.writes(), 0);

            let timestamps: Vec<i64> = store.day_rows(&scope).iter().map(|r| r.timestamp).collect();
            let unique: HashSet<i64> = timestamps.iter().copied().collect();
            prop_assert_eq!(unique.len(), timestamps.len());

            for (ts, duration) in &incoming {
                let stored = store.day_rows(&scope).iter().find(|r| r.timestamp == *ts);
                prop_assert_eq!(stored.map(|r| r.duration), Some(*duration));
            }
        }
    }
}
