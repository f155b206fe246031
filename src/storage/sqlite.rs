//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the DocumentStore trait.

use crate::storage::schema::initialize_schema;
use crate::storage::traits::{DocumentStore, StorageError, StorageResult};
use crate::storage::{content_hash, SaveOutcome, StoredDocument};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

const DOCUMENT_COLUMNS: &str = "url, raw_html, source, html_hash, crawl_time, last_checked";

/// SQLite storage backend
///
/// The connection lives behind a mutex so the store can be shared across
/// worker tasks through an `Arc`.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Creates a new SqliteStore instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStore)` - Successfully opened/created database
    /// * `Err(StorageError)` - Failed to open database
    pub fn new(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
            PRAGMA busy_timeout = 5000;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StorageError::LockPoisoned)
    }

    /// `save` with an explicit clock, in unix seconds
    pub fn save_at(
        &self,
        url: &str,
        markup: &str,
        source: &str,
        now: i64,
    ) -> StorageResult<SaveOutcome> {
        let hash = content_hash(markup);
        let conn = self.conn()?;

        let existing: Option<String> = conn
            .query_row(
                "SELECT html_hash FROM documents WHERE url = ?1",
                params![url],
                |row| row.get(0),
            )
            .optional()?;

        match existing {
            None => {
                conn.execute(
                    "INSERT INTO documents (url, raw_html, source, html_hash, crawl_time, last_checked)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
                    params![url, markup, source, hash, now],
                )?;
                Ok(SaveOutcome::Inserted)
            }
            Some(stored) if stored == hash => {
                conn.execute(
                    "UPDATE documents SET last_checked = ?2 WHERE url = ?1",
                    params![url, now],
                )?;
                Ok(SaveOutcome::Unchanged)
            }
            Some(_) => {
                conn.execute(
                    "UPDATE documents
                     SET raw_html = ?2, source = ?3, html_hash = ?4, crawl_time = ?5, last_checked = ?5
                     WHERE url = ?1",
                    params![url, markup, source, hash, now],
                )?;
                Ok(SaveOutcome::Updated)
            }
        }
    }

    /// `touch` with an explicit clock, in unix seconds
    pub fn touch_at(&self, url: &str, now: i64) -> StorageResult<()> {
        let updated = self.conn()?.execute(
            "UPDATE documents SET last_checked = ?2 WHERE url = ?1",
            params![url, now],
        )?;
        if updated == 0 {
            return Err(StorageError::DocumentNotFound(url.to_string()));
        }
        Ok(())
    }

    /// `stale_documents` with an explicit clock, in unix seconds
    pub fn stale_documents_at(
        &self,
        max_age: Duration,
        now: i64,
    ) -> StorageResult<Vec<StoredDocument>> {
        let max_age = i64::try_from(max_age.as_secs()).unwrap_or(i64::MAX);
        let cutoff = now.saturating_sub(max_age);

        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM documents WHERE last_checked < ?1 ORDER BY last_checked, id",
            DOCUMENT_COLUMNS
        ))?;
        let documents = stmt
            .query_map(params![cutoff], document_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(documents)
    }
}

fn document_from_row(row: &Row<'_>) -> rusqlite::Result<StoredDocument> {
    Ok(StoredDocument {
        url: row.get(0)?,
        raw_html: row.get(1)?,
        source: row.get(2)?,
        html_hash: row.get(3)?,
        crawl_time: row.get(4)?,
        last_checked: row.get(5)?,
    })
}

fn now() -> i64 {
    Utc::now().timestamp()
}

impl DocumentStore for SqliteStore {
    fn exists(&self, url: &str) -> StorageResult<bool> {
        let found: Option<i64> = self
            .conn()?
            .query_row(
                "SELECT 1 FROM documents WHERE url = ?1",
                params![url],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn save(&self, url: &str, markup: &str, source: &str) -> StorageResult<SaveOutcome> {
        self.save_at(url, markup, source, now())
    }

    fn has_changed(&self, url: &str, markup: &str) -> StorageResult<bool> {
        if markup.is_empty() {
            return Ok(true);
        }

        let stored: Option<String> = self
            .conn()?
            .query_row(
                "SELECT html_hash FROM documents WHERE url = ?1",
                params![url],
                |row| row.get(0),
            )
            .optional()?;

        Ok(match stored {
            Some(hash) => hash != content_hash(markup),
            None => true,
        })
    }

    fn touch(&self, url: &str) -> StorageResult<()> {
        self.touch_at(url, now())
    }

    fn stale_documents(&self, max_age: Duration) -> StorageResult<Vec<StoredDocument>> {
        self.stale_documents_at(max_age, now())
    }

    fn last_processed_url(&self) -> StorageResult<Option<String>> {
        let url = self
            .conn()?
            .query_row(
                "SELECT url FROM documents ORDER BY crawl_time DESC, id DESC LIMIT 1",
                [],
                |row| row.get(0),
            )
            .optional()?;
        Ok(url)
    }

    fn get(&self, url: &str) -> StorageResult<Option<StoredDocument>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM documents WHERE url = ?1",
            DOCUMENT_COLUMNS
        ))?;
        let document = stmt.query_row(params![url], document_from_row).optional()?;
        Ok(document)
    }

    fn documents_by_source(&self, source: &str) -> StorageResult<Vec<StoredDocument>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM documents WHERE source = ?1 ORDER BY id",
            DOCUMENT_COLUMNS
        ))?;
        let documents = stmt
            .query_map(params![source], document_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(documents)
    }

    fn count_by_source(&self) -> StorageResult<HashMap<String, u64>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT source, COUNT(*) FROM documents GROUP BY source")?;
        let counts = stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as u64))
            })?
            .collect::<Result<HashMap<_, _>, _>>()?;
        Ok(counts)
    }

    fn total_bytes(&self) -> StorageResult<u64> {
        let total: i64 = self.conn()?.query_row(
            "SELECT COALESCE(SUM(LENGTH(CAST(raw_html AS BLOB))), 0) FROM documents",
            [],
            |row| row.get(0),
        )?;
        Ok(total as u64)
    }
}
