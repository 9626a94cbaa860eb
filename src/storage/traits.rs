//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::lemma::LemmaFrequencies;
use crate::state::SiteStatus;
use crate::storage::{IndexRecord, LemmaRecord, PageRecord, SiteRecord};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Page not found: {0}")]
    PageNotFound(i64),

    #[error("Site not found: {0}")]
    SiteNotFound(String),

    #[error("Failed to write page: {0}")]
    Write(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
///
/// Besides plain CRUD, this is the index store: [`Storage::merge_page`] and
/// [`Storage::remove_page`] keep lemma document frequencies consistent with
/// the index rows, each as one atomic unit.
pub trait Storage {
    // ===== Sites =====

    /// Inserts a site with the given status, or returns the existing row unchanged
    fn insert_or_get_site(
        &mut self,
        url: &str,
        name: &str,
        status: SiteStatus,
    ) -> StorageResult<SiteRecord>;

    /// Gets a site by ID
    fn get_site(&self, site_id: i64) -> StorageResult<SiteRecord>;

    /// Gets a site by its canonical URL
    fn get_site_by_url(&self, url: &str) -> StorageResult<Option<SiteRecord>>;

    /// Lists all sites ordered by ID
    fn list_sites(&self) -> StorageResult<Vec<SiteRecord>>;

    /// Sets the status, status time and last error of a site
    fn update_site_status(
        &mut self,
        site_id: i64,
        status: SiteStatus,
        last_error: Option<&str>,
    ) -> StorageResult<()>;

    /// Moves every site left in INDEXING to FAILED with the given error
    ///
    /// # Returns
    ///
    /// The number of sites that were reconciled
    fn fail_interrupted_sites(&mut self, error: &str) -> StorageResult<usize>;

    /// Deletes every page, lemma and index row of a site
    fn clear_site(&mut self, site_id: i64) -> StorageResult<()>;

    // ===== Pages =====

    /// Inserts a page row
    ///
    /// # Returns
    ///
    /// The ID of the new page
    fn insert_page(
        &mut self,
        site_id: i64,
        path: &str,
        code: u16,
        content: &str,
    ) -> StorageResult<i64>;

    /// Gets a page by ID
    fn get_page(&self, page_id: i64) -> StorageResult<PageRecord>;

    /// Gets a page by site and site-relative path
    fn get_page_by_path(&self, site_id: i64, path: &str) -> StorageResult<Option<PageRecord>>;

    /// Lists the paths of all pages recorded for a site
    fn list_page_paths(&self, site_id: i64) -> StorageResult<Vec<String>>;

    // ===== Index =====

    /// Merges a page's lemma frequencies into the site index
    ///
    /// Each lemma's document frequency is incremented once (inserted at 1 if
    /// new); each (page, lemma) index row gets the occurrence count added to
    /// its rank (inserted if new). The whole merge is one transaction.
    fn merge_page(&mut self, page_id: i64, lemmas: &LemmaFrequencies) -> StorageResult<()>;

    /// Removes a page together with its index rows
    ///
    /// Every lemma the page contributed to is decremented, and deleted when
    /// its frequency reaches zero. The whole removal is one transaction.
    fn remove_page(&mut self, page_id: i64) -> StorageResult<()>;

    /// Looks up a lemma on a site
    fn get_lemma(&self, site_id: i64, lemma: &str) -> StorageResult<Option<LemmaRecord>>;

    /// Lists the IDs of pages indexed under a lemma, ordered by page ID
    fn pages_with_lemma(&self, lemma_id: i64) -> StorageResult<Vec<i64>>;

    /// Gets the index rows of a page restricted to the given lemmas
    fn index_entries(&self, page_id: i64, lemma_ids: &[i64]) -> StorageResult<Vec<IndexRecord>>;

    // ===== Statistics =====

    /// Counts pages of a site
    fn count_pages(&self, site_id: i64) -> StorageResult<u64>;

    /// Counts lemmas of a site
    fn count_lemmas(&self, site_id: i64) -> StorageResult<u64>;

    /// Counts index rows belonging to a site's pages
    fn count_index_entries(&self, site_id: i64) -> StorageResult<u64>;
}
