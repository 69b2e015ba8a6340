//! Remote reading source (WeRead).
//!
//! [`ReadingSource`] is the seam the reconciliation passes depend on;
//! [`WeReadClient`] is the HTTP implementation and [`MemorySource`] an
//! in-memory one for tests and offline runs.

pub mod memory;
pub mod types;
pub mod weread;

pub use memory::MemorySource;
pub use types::{Bookshelf, Notebook, ReadInfo, ReadTimes, ShelfArchive};
pub use weread::WeReadClient;

use crate::error::Result;
use crate::model::BookSnapshot;

/// Everything the sync reads from the reading service.
pub trait ReadingSource {
    /// Shelf archives and per-book shelf progress.
    fn bookshelf(&self) -> Result<Bookshelf>;

    /// Book metadata; `None` when the service does not know the book.
    fn book_info(&self, book_id: &str) -> Result<Option<BookSnapshot>>;

    /// Reading state, per-day history and embedded book info.
    fn read_info(&self, book_id: &str) -> Result<ReadInfo>;

    /// Books that carry notes or highlights.
    fn notebooks(&self) -> Result<Vec<Notebook>>;

    /// Aggregate reading time by day.
    fn read_times(&self) -> Result<ReadTimes>;
}
