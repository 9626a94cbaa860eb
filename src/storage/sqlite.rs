//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::lemma::LemmaFrequencies;
use crate::state::SiteStatus;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::{IndexRecord, LemmaRecord, PageRecord, SiteRecord};
use crate::EngineError;
use chrono::Utc;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::path::Path;

/// SQLite storage backend
#[derive(Debug)]
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Opens or creates a database file and initializes the schema
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(EngineError)` - Failed to open database
    pub fn new(path: &Path) -> Result<Self, EngineError> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> Result<Self, EngineError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }
}

const SITE_COLUMNS: &str = "id, url, name, status, status_time, last_error";

fn site_from_row(row: &Row<'_>) -> rusqlite::Result<SiteRecord> {
    Ok(SiteRecord {
        id: row.get(0)?,
        url: row.get(1)?,
        name: row.get(2)?,
        status: SiteStatus::from_db_string(&row.get::<_, String>(3)?)
            .unwrap_or(SiteStatus::Failed),
        status_time: row.get(4)?,
        last_error: row.get(5)?,
    })
}

fn page_from_row(row: &Row<'_>) -> rusqlite::Result<PageRecord> {
    Ok(PageRecord {
        id: row.get(0)?,
        site_id: row.get(1)?,
        path: row.get(2)?,
        code: row.get(3)?,
        content: row.get(4)?,
    })
}

impl Storage for SqliteStorage {
    // ===== Sites =====

    fn insert_or_get_site(
        &mut self,
        url: &str,
        name: &str,
        status: SiteStatus,
    ) -> StorageResult<SiteRecord> {
        if let Some(site) = self.get_site_by_url(url)? {
            return Ok(site);
        }

        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO sites (url, name, status, status_time) VALUES (?1, ?2, ?3, ?4)",
            params![url, name, status.to_db_string(), now],
        )?;

        self.get_site(self.conn.last_insert_rowid())
    }

    fn get_site(&self, site_id: i64) -> StorageResult<SiteRecord> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM sites WHERE id = ?1", SITE_COLUMNS),
                params![site_id],
                site_from_row,
            )
            .optional()?
            .ok_or_else(|| StorageError::SiteNotFound(format!("Site ID {}", site_id)))
    }

    fn get_site_by_url(&self, url: &str) -> StorageResult<Option<SiteRecord>> {
        let site = self
            .conn
            .query_row(
                &format!("SELECT {} FROM sites WHERE url = ?1", SITE_COLUMNS),
                params![url],
                site_from_row,
            )
            .optional()?;
        Ok(site)
    }

    fn list_sites(&self) -> StorageResult<Vec<SiteRecord>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {} FROM sites ORDER BY id", SITE_COLUMNS))?;

        let sites = stmt
            .query_map([], site_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(sites)
    }

    fn update_site_status(
        &mut self,
        site_id: i64,
        status: SiteStatus,
        last_error: Option<&str>,
    ) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "UPDATE sites SET status = ?1, status_time = ?2, last_error = ?3 WHERE id = ?4",
            params![status.to_db_string(), now, last_error, site_id],
        )?;
        Ok(())
    }

    fn fail_interrupted_sites(&mut self, error: &str) -> StorageResult<usize> {
        let now = Utc::now().to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE sites SET status = ?1, status_time = ?2, last_error = ?3 WHERE status = ?4",
            params![
                SiteStatus::Failed.to_db_string(),
                now,
                error,
                SiteStatus::Indexing.to_db_string()
            ],
        )?;
        Ok(updated)
    }

    fn clear_site(&mut self, site_id: i64) -> StorageResult<()> {
        let tx = self.conn.transaction()?;
        tx.execute(
            "DELETE FROM indexes WHERE page_id IN (SELECT id FROM pages WHERE site_id = ?1)",
            params![site_id],
        )?;
        tx.execute("DELETE FROM lemmas WHERE site_id = ?1", params![site_id])?;
        tx.execute("DELETE FROM pages WHERE site_id = ?1", params![site_id])?;
        tx.commit()?;
        Ok(())
    }

    // ===== Pages =====

    fn insert_page(
        &mut self,
        site_id: i64,
        path: &str,
        code: u16,
        content: &str,
    ) -> StorageResult<i64> {
        self.conn.execute(
            "INSERT INTO pages (site_id, path, code, content) VALUES (?1, ?2, ?3, ?4)",
            params![site_id, path, code, content],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_page(&self, page_id: i64) -> StorageResult<PageRecord> {
        self.conn
            .query_row(
                "SELECT id, site_id, path, code, content FROM pages WHERE id = ?1",
                params![page_id],
                page_from_row,
            )
            .optional()?
            .ok_or(StorageError::PageNotFound(page_id))
    }

    fn get_page_by_path(&self, site_id: i64, path: &str) -> StorageResult<Option<PageRecord>> {
        let page = self
            .conn
            .query_row(
                "SELECT id, site_id, path, code, content FROM pages WHERE site_id = ?1 AND path = ?2",
                params![site_id, path],
                page_from_row,
            )
            .optional()?;
        Ok(page)
    }

    fn list_page_paths(&self, site_id: i64) -> StorageResult<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT path FROM pages WHERE site_id = ?1 ORDER BY id")?;

        let paths = stmt
            .query_map(params![site_id], |row| row.get(0))?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(paths)
    }

    // ===== Index =====

    fn merge_page(&mut self, page_id: i64, lemmas: &LemmaFrequencies) -> StorageResult<()> {
        let tx = self.conn.transaction()?;

        let site_id: i64 = tx
            .query_row(
                "SELECT site_id FROM pages WHERE id = ?1",
                params![page_id],
                |row| row.get(0),
            )
            .optional()?
            .ok_or(StorageError::PageNotFound(page_id))?;

        {
            let mut upsert_lemma = tx.prepare_cached(
                "INSERT INTO lemmas (site_id, lemma, frequency) VALUES (?1, ?2, 1)
                 ON CONFLICT(site_id, lemma) DO UPDATE SET frequency = frequency + 1",
            )?;
            let mut lemma_id = tx.prepare_cached(
                "SELECT id FROM lemmas WHERE site_id = ?1 AND lemma = ?2",
            )?;
            let mut upsert_index = tx.prepare_cached(
                "INSERT INTO indexes (page_id, lemma_id, rank) VALUES (?1, ?2, ?3)
                 ON CONFLICT(page_id, lemma_id) DO UPDATE SET rank = rank + excluded.rank",
            )?;

            for (lemma, count) in lemmas {
                upsert_lemma.execute(params![site_id, lemma])?;
                let id: i64 = lemma_id.query_row(params![site_id, lemma], |row| row.get(0))?;
                upsert_index.execute(params![page_id, id, *count as f64])?;
            }
        }

        tx.commit()?;
        Ok(())
    }

    fn remove_page(&mut self, page_id: i64) -> StorageResult<()> {
        let tx = self.conn.transaction()?;

        let lemma_ids: Vec<i64> = {
            let mut stmt = tx.prepare("SELECT lemma_id FROM indexes WHERE page_id = ?1")?;
            let ids = stmt
                .query_map(params![page_id], |row| row.get(0))?
                .collect::<Result<Vec<_>, _>>()?;
            ids
        };

        // Index rows go first so that emptied lemmas can be deleted
        tx.execute("DELETE FROM indexes WHERE page_id = ?1", params![page_id])?;

        {
            let mut decrement =
                tx.prepare_cached("UPDATE lemmas SET frequency = frequency - 1 WHERE id = ?1")?;
            let mut delete_empty =
                tx.prepare_cached("DELETE FROM lemmas WHERE id = ?1 AND frequency <= 0")?;

            for lemma_id in &lemma_ids {
                decrement.execute(params![lemma_id])?;
                delete_empty.execute(params![lemma_id])?;
            }
        }

        tx.execute("DELETE FROM pages WHERE id = ?1", params![page_id])?;
        tx.commit()?;
        Ok(())
    }

    fn get_lemma(&self, site_id: i64, lemma: &str) -> StorageResult<Option<LemmaRecord>> {
        let record = self
            .conn
            .query_row(
                "SELECT id, site_id, lemma, frequency FROM lemmas WHERE site_id = ?1 AND lemma = ?2",
                params![site_id, lemma],
                |row| {
                    Ok(LemmaRecord {
                        id: row.get(0)?,
                        site_id: row.get(1)?,
                        lemma: row.get(2)?,
                        frequency: row.get(3)?,
                    })
                },
            )
            .optional()?;
        Ok(record)
    }

    fn pages_with_lemma(&self, lemma_id: i64) -> StorageResult<Vec<i64>> {
        let mut stmt = self
            .conn
            .prepare("SELECT page_id FROM indexes WHERE lemma_id = ?1 ORDER BY page_id")?;

        let pages = stmt
            .query_map(params![lemma_id], |row| row.get(0))?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(pages)
    }

    fn index_entries(&self, page_id: i64, lemma_ids: &[i64]) -> StorageResult<Vec<IndexRecord>> {
        if lemma_ids.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = vec!["?"; lemma_ids.len()].join(", ");
        let query = format!(
            "SELECT id, page_id, lemma_id, rank FROM indexes
             WHERE page_id = ? AND lemma_id IN ({}) ORDER BY lemma_id",
            placeholders
        );

        let mut stmt = self.conn.prepare(&query)?;
        let values = std::iter::once(page_id).chain(lemma_ids.iter().copied());
        let entries = stmt
            .query_map(params_from_iter(values), |row| {
                Ok(IndexRecord {
                    id: row.get(0)?,
                    page_id: row.get(1)?,
                    lemma_id: row.get(2)?,
                    rank: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(entries)
    }

    // ===== Statistics =====

    fn count_pages(&self, site_id: i64) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM pages WHERE site_id = ?1",
            params![site_id],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn count_lemmas(&self, site_id: i64) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM lemmas WHERE site_id = ?1",
            params![site_id],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn count_index_entries(&self, site_id: i64) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM indexes WHERE page_id IN (SELECT id FROM pages WHERE site_id = ?1)",
            params![site_id],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }
}
