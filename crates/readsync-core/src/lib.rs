//! # readsync core library
//!
//! Keeps a Notion reading database in step with a WeRead bookshelf. The CLI
//! binary is a thin layer over this crate.
//!
//! ## Architecture
//!
//! - **Source**: [`ReadingSource`] reads the shelf, per-book state and the
//!   reading summary from WeRead
//! - **Store**: [`BookStore`] reads and writes Notion pages, relations and
//!   the heatmap embed block
//! - **Catalog**: [`IsbnLookup`] resolves an ISBN to a Douban page
//! - **Reconcile**: the book pass, the per-book and aggregate reading-day
//!   passes and the heatmap update
//!
//! ## Key Components
//!
//! - [`BookReconciler`]: book pages plus their reading days
//! - [`reconcile_reading_days`]: idempotent day-row diff
//! - [`sync_daily`]: aggregate daily pass
//! - [`Config`]: TOML configuration with environment overrides

pub mod catalog;
pub mod config;
pub mod error;
pub mod http;
pub mod model;
pub mod reconcile;
pub mod source;
pub mod store;
pub mod timeutil;

pub use catalog::{IsbnLookup, NeoDbCatalog, RetryPolicy};
pub use config::{Config, RunKind};
pub use error::{ConfigError, Result, SyncError};
pub use model::{BookRecord, BookSnapshot, ReadingDayRecord, ReadingStatus, ShelfScope, StoredBook};
pub use reconcile::{
    reconcile_reading_days, sync_daily, update_heatmap, BookReconciler, BookSyncSummary,
    DaySyncSummary, HeatmapOutcome,
};
pub use source::{MemorySource, ReadingSource, WeReadClient};
pub use store::{BookStore, DayScope, MemoryStore, NotionStore, RelationTable};
pub use timeutil::ShelfClock;
