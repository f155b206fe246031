//! Storage module for persisting crawled documents
//!
//! This module handles:
//! - SQLite document store with content-hash change detection
//! - The raw-file cache of fetched markup
//! - Staleness queries for re-crawls and the resume cursor

pub mod raw_cache;
mod schema;
mod sqlite;
mod traits;

pub use raw_cache::{sanitize_file_name, RawCache};
pub use sqlite::SqliteStore;
pub use traits::{DocumentStore, StorageError, StorageResult};

use sha2::{Digest, Sha256};
use std::path::Path;

/// Opens (or creates) the document database
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file
///
/// # Returns
///
/// * `Ok(SqliteStore)` - Successfully initialized storage
/// * `Err(StorageError)` - Failed to open or initialize the database
pub fn open_store(path: &Path) -> StorageResult<SqliteStore> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    SqliteStore::new(path)
}

/// Change digest of a page's markup (SHA-256, lowercase hex)
pub fn content_hash(markup: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(markup.as_bytes());
    hex::encode(hasher.finalize())
}

/// A stored page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredDocument {
    pub url: String,
    pub raw_html: String,
    pub source: String,
    pub html_hash: String,
    /// Unix seconds of the last content change
    pub crawl_time: i64,
    /// Unix seconds of the last fetch, changed or not
    pub last_checked: i64,
}

/// What `save` did with a document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Inserted,
    Updated,
    Unchanged,
}
