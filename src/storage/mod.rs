//! Storage module for persisting the per-site index
//!
//! This module handles all database operations, including:
//! - SQLite database initialization and schema management
//! - Site status persistence and startup reconciliation
//! - Page rows and their raw content
//! - Lemma document frequencies and per-page index rows (the index store)

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{Storage, StorageError, StorageResult};

use crate::state::SiteStatus;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Storage handle shared by crawl branches, the search engine and the API
pub type SharedStorage = Arc<Mutex<SqliteStorage>>;

/// Wraps a storage backend for sharing
pub fn shared(storage: SqliteStorage) -> SharedStorage {
    Arc::new(Mutex::new(storage))
}

/// Locks shared storage
///
/// Every write runs inside a SQLite transaction, so a panicked holder cannot
/// leave a half-applied merge behind and the poisoned guard is still usable.
pub fn lock(storage: &SharedStorage) -> MutexGuard<'_, SqliteStorage> {
    storage.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Sites with fewer pages than this never treat a lemma as overcommon
pub const OVERCOMMON_MIN_PAGES: u64 = 10;

/// Share of a site's pages above which a lemma stops discriminating results
pub const OVERCOMMON_RATIO: f64 = 0.25;

/// Represents a site in the database
#[derive(Debug, Clone, PartialEq)]
pub struct SiteRecord {
    pub id: i64,
    pub url: String,
    pub name: String,
    pub status: SiteStatus,
    pub status_time: String,
    pub last_error: Option<String>,
}

/// Represents a fetched page
#[derive(Debug, Clone, PartialEq)]
pub struct PageRecord {
    pub id: i64,
    pub site_id: i64,
    pub path: String,
    pub code: u16,
    pub content: String,
}

/// Represents a lemma and its document frequency on one site
#[derive(Debug, Clone, PartialEq)]
pub struct LemmaRecord {
    pub id: i64,
    pub site_id: i64,
    pub lemma: String,
    pub frequency: u32,
}

/// Represents the rank of one lemma within one page
#[derive(Debug, Clone, PartialEq)]
pub struct IndexRecord {
    pub id: i64,
    pub page_id: i64,
    pub lemma_id: i64,
    pub rank: f64,
}

/// Decides whether a lemma is selective enough to plan a query with
///
/// Small sites (fewer than [`OVERCOMMON_MIN_PAGES`] pages) keep every lemma.
/// Otherwise a lemma present on [`OVERCOMMON_RATIO`] of the pages or more is
/// excluded.
///
/// # Examples
///
/// ```
/// use lemma_search::storage::{filter_overcommon_lemma, LemmaRecord};
///
/// let lemma = LemmaRecord { id: 1, site_id: 1, lemma: "кот".into(), frequency: 5 };
/// assert!(filter_overcommon_lemma(&lemma, 9));
/// assert!(!filter_overcommon_lemma(&lemma, 20));
/// assert!(filter_overcommon_lemma(&lemma, 21));
/// ```
pub fn filter_overcommon_lemma(lemma: &LemmaRecord, total_pages: u64) -> bool {
    if total_pages < OVERCOMMON_MIN_PAGES {
        return true;
    }
    (lemma.frequency as f64 / total_pages as f64) < OVERCOMMON_RATIO
}
