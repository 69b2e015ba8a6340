//! In-memory reading source.

use std::cell::RefCell;
use std::collections::HashMap;

use super::types::{Bookshelf, Notebook, ReadInfo, ReadTimes};
use super::ReadingSource;
use crate::error::{Result, SyncError};
use crate::model::BookSnapshot;

/// A [`ReadingSource`] backed by fixed payloads. Records which books had
/// their read info fetched.
#[derive(Debug, Default)]
pub struct MemorySource {
    pub shelf: Bookshelf,
    pub infos: HashMap<String, BookSnapshot>,
    pub read_infos: HashMap<String, ReadInfo>,
    pub notebooks: Vec<Notebook>,
    pub read_times: ReadTimes,
    fetched: RefCell<Vec<String>>,
}

impl MemorySource {
    pub fn new(shelf: Bookshelf) -> Self {
        Self {
            shelf,
            ..Self::default()
        }
    }

    pub fn with_book(mut self, book_id: &str, info: BookSnapshot, read_info: ReadInfo) -> Self {
        self.infos.insert(book_id.to_string(), info);
        self.read_infos.insert(book_id.to_string(), read_info);
        self
    }

    /// Book ids passed to `read_info`, in call order.
    pub fn fetched(&self) -> Vec<String> {
        self.fetched.borrow().clone()
    }
}

impl ReadingSource for MemorySource {
    fn bookshelf(&self) -> Result<Bookshelf> {
        Ok(self.shelf.clone())
    }

    fn book_info(&self, book_id: &str) -> Result<Option<BookSnapshot>> {
        Ok(self.infos.get(book_id).cloned())
    }

    fn read_info(&self, book_id: &str) -> Result<ReadInfo> {
        self.fetched.borrow_mut().push(book_id.to_string());
        self.read_infos
            .get(book_id)
            .cloned()
            .ok_or_else(|| SyncError::Source(format!("no read info for {book_id}")))
    }

    fn notebooks(&self) -> Result<Vec<Notebook>> {
        Ok(self.notebooks.clone())
    }

    fn read_times(&self) -> Result<ReadTimes> {
        Ok(self.read_times.clone())
    }
}
