//! Storage traits and error types

use crate::storage::{SaveOutcome, StoredDocument};
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Document not found: {0}")]
    DocumentNotFound(String),

    #[error("Storage lock poisoned")]
    LockPoisoned,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Change-aware document persistence
///
/// All methods take `&self`; implementations synchronize internally so one
/// store can be shared by every worker.
pub trait DocumentStore: Send + Sync {
    /// Returns true if a document with this URL is stored
    fn exists(&self, url: &str) -> StorageResult<bool>;

    /// Inserts or updates a document
    ///
    /// A new URL gets both timestamps set to now. A stored URL whose hash
    /// differs has markup, source, hash and both timestamps replaced. A stored
    /// URL with an identical hash only has `last_checked` moved.
    fn save(&self, url: &str, markup: &str, source: &str) -> StorageResult<SaveOutcome>;

    /// Returns true if the URL is absent, the markup is empty, or its hash differs
    fn has_changed(&self, url: &str, markup: &str) -> StorageResult<bool>;

    /// Moves `last_checked` to now without touching the content
    fn touch(&self, url: &str) -> StorageResult<()>;

    /// Documents whose `last_checked` is older than `max_age`
    fn stale_documents(&self, max_age: Duration) -> StorageResult<Vec<StoredDocument>>;

    /// URL of the most recently crawled document
    fn last_processed_url(&self) -> StorageResult<Option<String>>;

    /// Gets a document by URL
    fn get(&self, url: &str) -> StorageResult<Option<StoredDocument>>;

    /// All documents from one source, in insertion order
    fn documents_by_source(&self, source: &str) -> StorageResult<Vec<StoredDocument>>;

    /// Document count per source
    fn count_by_source(&self) -> StorageResult<HashMap<String, u64>>;

    /// Sum of stored markup sizes in bytes
    fn total_bytes(&self) -> StorageResult<u64>;
}
