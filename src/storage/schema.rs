//! Database schema definitions

/// SQL schema for the document store
pub const SCHEMA_SQL: &str = r#"
-- One row per article URL
CREATE TABLE IF NOT EXISTS documents (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    url TEXT NOT NULL UNIQUE,
    raw_html TEXT NOT NULL,
    source TEXT NOT NULL,
    html_hash TEXT NOT NULL,
    crawl_time INTEGER NOT NULL,
    last_checked INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_documents_source ON documents(source);
CREATE INDEX IF NOT EXISTS idx_documents_last_checked ON documents(last_checked);
CREATE INDEX IF NOT EXISTS idx_documents_crawl_time ON documents(crawl_time);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
