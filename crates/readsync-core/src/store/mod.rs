//! Destination store (Notion).
//!
//! [`BookStore`] is the seam the reconciliation passes write through.
//! [`NotionStore`] talks to the Notion API; [`MemoryStore`] keeps rows in
//! memory and records every write, which is what the reconciliation tests
//! assert against.

pub mod memory;
pub mod notion;
pub mod properties;

pub use memory::{MemoryStore, StoreWrite};
pub use notion::NotionStore;

use std::collections::HashMap;

use crate::error::Result;
use crate::model::{BookRecord, ReadingDayRecord, StoredBook};

/// Which reading-day rows an operation applies to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DayScope {
    /// Rows of the per-book database related to this book page.
    Book(String),
    /// All rows of the aggregate daily database.
    Daily,
}

/// Auxiliary databases whose rows are referenced by relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelationTable {
    Author,
    Category,
    Year,
    Month,
    Week,
    Date,
}

/// Everything the sync reads from and writes to the destination.
pub trait BookStore {
    /// Existing book pages keyed by WeRead book id.
    fn books(&self) -> Result<HashMap<String, StoredBook>>;

    /// Update the page when `record.page_id` is set, else create one.
    /// Returns the page id.
    fn save_book(&mut self, record: &BookRecord) -> Result<String>;

    /// Existing reading-day rows in `scope`.
    fn reading_days(&self, scope: &DayScope) -> Result<Vec<ReadingDayRecord>>;

    /// Update the row `page_id`, or create a row when `None`.
    fn save_reading_day(
        &mut self,
        scope: &DayScope,
        page_id: Option<&str>,
        timestamp: i64,
        duration: i64,
    ) -> Result<()>;

    /// Page id of the row titled `title` in `table`, creating it if absent.
    /// `None` when that table is not configured.
    fn relation_id(&mut self, table: RelationTable, title: &str) -> Result<Option<String>>;

    /// Point an embed block at `url`.
    fn update_embed(&mut self, block_id: &str, url: &str) -> Result<()>;
}
