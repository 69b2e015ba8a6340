//! Reconciliation passes.
//!
//! - [`books`]: one book page per book on the tracked shelf, cascading into
//!   the per-book reading days.
//! - [`reading_days`]: diff of `timestamp -> seconds` against existing rows.
//! - [`daily`]: the aggregate per-day pass.
//! - [`heatmap`]: points the heatmap embed block at the latest image.

pub mod books;
pub mod daily;
pub mod heatmap;
pub mod reading_days;

pub use books::{compute_sync_set, is_skippable, BookReconciler};
pub use daily::{daily_incoming, sync_daily};
pub use heatmap::{update_heatmap, HeatmapOutcome};
pub use reading_days::{plan_day_writes, reconcile_reading_days, DayWrite};

use serde::Serialize;
use std::fmt;
use std::ops::AddAssign;

/// Writes issued by a reading-day reconciliation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DaySyncSummary {
    pub created: usize,
    pub updated: usize,
}

impl DaySyncSummary {
    pub fn writes(&self) -> usize {
        self.created + self.updated
    }
}

impl AddAssign for DaySyncSummary {
    fn add_assign(&mut self, other: Self) {
        self.created += other.created;
        self.updated += other.updated;
    }
}

impl fmt::Display for DaySyncSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} day rows created, {} updated", self.created, self.updated)
    }
}

/// Outcome of a book reconciliation run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BookSyncSummary {
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
    pub days: DaySyncSummary,
}

impl fmt::Display for BookSyncSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} books created, {} updated, {} skipped; {}",
            self.created, self.updated, self.skipped, self.days
        )
    }
}
