//! In-memory [`BookStore`] that records every write.

use std::collections::{HashMap, HashSet};

use super::{BookStore, DayScope, RelationTable};
use crate::error::{Result, SyncError};
use crate::model::{BookRecord, ReadingDayRecord, StoredBook};

/// One write issued against a [`MemoryStore`].
#[derive(Debug, Clone, PartialEq)]
pub enum StoreWrite {
    CreateBook { book_id: String, page_id: String },
    UpdateBook { book_id: String, page_id: String },
    CreateDay { scope: DayScope, timestamp: i64, duration: i64 },
    UpdateDay { scope: DayScope, page_id: String, timestamp: i64, duration: i64 },
    CreateRelation { table: RelationTable, title: String },
    UpdateEmbed { block_id: String, url: String },
}

#[derive(Debug)]
pub struct MemoryStore {
    pub books: HashMap<String, StoredBook>,
    /// Last record written per page id.
    pub records: HashMap<String, BookRecord>,
    pub days: HashMap<DayScope, Vec<ReadingDayRecord>>,
    pub relations: HashMap<(RelationTable, String), String>,
    tables: HashSet<RelationTable>,
    writes: Vec<StoreWrite>,
    next_id: u64,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Store with the author and category tables configured.
    pub fn new() -> Self {
        Self {
            books: HashMap::new(),
            records: HashMap::new(),
            days: HashMap::new(),
            relations: HashMap::new(),
            tables: HashSet::from([RelationTable::Author, RelationTable::Category]),
            writes: Vec::new(),
            next_id: 0,
        }
    }

    /// Also configure the year / month / week / date tables.
    pub fn with_period_tables(mut self) -> Self {
        self.tables.extend([
            RelationTable::Year,
            RelationTable::Month,
            RelationTable::Week,
            RelationTable::Date,
        ]);
        self
    }

    pub fn with_book(mut self, book_id: &str, stored: StoredBook) -> Self {
        self.books.insert(book_id.to_string(), stored);
        self
    }

    pub fn with_day(mut self, scope: DayScope, page_id: &str, timestamp: i64, duration: i64) -> Self {
        self.days.entry(scope).or_default().push(ReadingDayRecord {
            page_id: page_id.to_string(),
            timestamp,
            duration,
        });
        self
    }

    pub fn writes(&self) -> &[StoreWrite] {
        &self.writes
    }

    pub fn clear_writes(&mut self) {
        self.writes.clear();
    }

    pub fn day_rows(&self, scope: &DayScope) -> &[ReadingDayRecord] {
        self.days.get(scope).map(Vec::as_slice).unwrap_or_default()
    }

    fn next_page_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}-{}", self.next_id)
    }
}

fn overwrite<T: Clone>(slot: &mut Option<T>, value: &Option<T>) {
    if value.is_some() {
        slot.clone_from(value);
    }
}

impl BookStore for MemoryStore {
    fn books(&self) -> Result<HashMap<String, StoredBook>> {
        Ok(self.books.clone())
    }

    fn save_book(&mut self, record: &BookRecord) -> Result<String> {
        let page_id = match &record.page_id {
            Some(id) => {
                self.writes.push(StoreWrite::UpdateBook {
                    book_id: record.book_id.clone(),
                    page_id: id.clone(),
                });
                id.clone()
            }
            None => {
                let id = self.next_page_id("book");
                self.writes.push(StoreWrite::CreateBook {
                    book_id: record.book_id.clone(),
                    page_id: id.clone(),
                });
                id
            }
        };

        let stored = self
            .books
            .entry(record.book_id.clone())
            .or_insert_with(|| StoredBook {
                page_id: page_id.clone(),
                ..StoredBook::default()
            });
        overwrite(&mut stored.reading_time, &record.reading_time);
        overwrite(&mut stored.category, &record.shelf_category);
        overwrite(&mut stored.status, &record.status);
        overwrite(&mut stored.my_rating, &record.my_rating);
        stored.cover = Some(record.cover.clone());

        self.records.insert(page_id.clone(), record.clone());
        Ok(page_id)
    }

    fn reading_days(&self, scope: &DayScope) -> Result<Vec<ReadingDayRecord>> {
        Ok(self.day_rows(scope).to_vec())
    }

    fn save_reading_day(
        &mut self,
        scope: &DayScope,
        page_id: Option<&str>,
        timestamp: i64,
        duration: i64,
    ) -> Result<()> {
        match page_id {
            Some(id) => {
                let row = self
                    .days
                    .get_mut(scope)
                    .and_then(|rows| rows.iter_mut().find(|r| r.page_id == id))
                    .ok_or_else(|| SyncError::Store {
                        status: 404,
                        message: format!("no day row {id}"),
                    })?;
                row.timestamp = timestamp;
                row.duration = duration;
                self.writes.push(StoreWrite::UpdateDay {
                    scope: scope.clone(),
                    page_id: id.to_string(),
                    timestamp,
                    duration,
                });
            }
            None => {
                let id = self.next_page_id("day");
                self.days.entry(scope.clone()).or_default().push(ReadingDayRecord {
                    page_id: id,
                    timestamp,
                    duration,
                });
                self.writes.push(StoreWrite::CreateDay {
                    scope: scope.clone(),
                    timestamp,
                    duration,
                });
            }
        }
        Ok(())
    }

    fn relation_id(&mut self, table: RelationTable, title: &str) -> Result<Option<String>> {
        if !self.tables.contains(&table) {
            return Ok(None);
        }
        let key = (table, title.to_string());
        if let Some(id) = self.relations.get(&key) {
            return Ok(Some(id.clone()));
        }
        let id = self.next_page_id("rel");
        self.relations.insert(key, id.clone());
        self.writes.push(StoreWrite::CreateRelation {
            table,
            title: title.to_string(),
        });
        Ok(Some(id))
    }

    fn update_embed(&mut self, block_id: &str, url: &str) -> Result<()> {
        self.writes.push(StoreWrite::UpdateEmbed {
            block_id: block_id.to_string(),
            url: url.to_string(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn created_book_reads_back_as_stored() {
        let mut store = MemoryStore::new();
        let record = BookRecord {
            book_id: "b1".into(),
            reading_time: Some(90),
            cover: "https://x/t7_a.jpg".into(),
            ..Default::default()
        };
        let page_id = store.save_book(&record).unwrap();

        let books = store.books().unwrap();
        assert_eq!(books["b1"].page_id, page_id);
        assert_eq!(books["b1"].reading_time, Some(90));
        assert_eq!(books["b1"].cover.as_deref(), Some("https://x/t7_a.jpg"));
    }

    #[test]
    fn relations_are_created_once_and_period_tables_are_optional() {
        let mut store = MemoryStore::new();
        let a = store.relation_id(RelationTable::Author, "刘慈欣").unwrap();
        let b = store.relation_id(RelationTable::Author, "刘慈欣").unwrap();
        assert_eq!(a, b);
        assert_eq!(store.writes().len(), 1);
        assert_eq!(store.relation_id(RelationTable::Week, "2024年第11周").unwrap(), None);
    }

    #[test]
    fn updating_unknown_day_row_fails() {
        let mut store = MemoryStore::new();
        let result = store.save_reading_day(&DayScope::Daily, Some("nope"), 1, 1);
        assert!(matches!(result, Err(SyncError::Store { status: 404, .. })));
    }
}
