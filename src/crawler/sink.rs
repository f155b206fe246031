//! Where workers put what they fetched
//!
//! [`FileSink`] keeps only the raw-file cache. [`DatabaseSink`] keeps the same
//! file cache and additionally upserts every page into a [`DocumentStore`],
//! touching unchanged documents instead of rewriting them.

use crate::crawler::CrawlTarget;
use crate::storage::{DocumentStore, RawCache, SaveOutcome};
use std::sync::Arc;

/// Where the markup handed to a sink came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkupOrigin {
    /// Read back from the raw-file cache
    Cache,
    /// Fetched during this pass
    Fetched,
}

/// What a sink did with a page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOutcome {
    /// Written to the raw-file cache only
    Written,
    /// Already cached (and, for the database sink, already stored); nothing to do
    AlreadyCached,
    /// Saved to the document store
    Saved(SaveOutcome),
}

/// Persistence target of a crawl pass
pub trait Sink: Send + Sync {
    /// Previously stored markup for `target`, if any
    fn cached(&self, target: &CrawlTarget) -> crate::Result<Option<String>>;

    /// Stores markup for `target`, keyed by its normalized `url`
    fn store(
        &self,
        target: &CrawlTarget,
        url: &str,
        markup: &str,
        origin: MarkupOrigin,
    ) -> crate::Result<StoreOutcome>;

    /// Keeps a blocked page for later inspection
    fn store_blocked(&self, target: &CrawlTarget, markup: &str) -> crate::Result<()>;
}

/// Raw-file cache only
#[derive(Debug, Clone)]
pub struct FileSink {
    cache: RawCache,
}

impl FileSink {
    pub fn new(cache: RawCache) -> Self {
        Self { cache }
    }
}

impl Sink for FileSink {
    fn cached(&self, target: &CrawlTarget) -> crate::Result<Option<String>> {
        Ok(self.cache.read(target)?)
    }

    fn store(
        &self,
        target: &CrawlTarget,
        _url: &str,
        markup: &str,
        origin: MarkupOrigin,
    ) -> crate::Result<StoreOutcome> {
        match origin {
            MarkupOrigin::Cache => Ok(StoreOutcome::AlreadyCached),
            MarkupOrigin::Fetched => {
                self.cache.write(target, markup)?;
                Ok(StoreOutcome::Written)
            }
        }
    }

    fn store_blocked(&self, target: &CrawlTarget, markup: &str) -> crate::Result<()> {
        self.cache.write_blocked(target, markup)?;
        Ok(())
    }
}

/// Raw-file cache plus a change-aware document store
pub struct DatabaseSink {
    cache: RawCache,
    store: Arc<dyn DocumentStore>,
}

impl DatabaseSink {
    pub fn new(cache: RawCache, store: Arc<dyn DocumentStore>) -> Self {
        Self { cache, store }
    }
}

impl Sink for DatabaseSink {
    fn cached(&self, target: &CrawlTarget) -> crate::Result<Option<String>> {
        Ok(self.cache.read(target)?)
    }

    fn store(
        &self,
        target: &CrawlTarget,
        url: &str,
        markup: &str,
        origin: MarkupOrigin,
    ) -> crate::Result<StoreOutcome> {
        match origin {
            // A local file says nothing about the live page; only insert
            // rows that are missing so `last_checked` keeps its age.
            MarkupOrigin::Cache => {
                if self.store.exists(url)? {
                    return Ok(StoreOutcome::AlreadyCached);
                }
            }
            MarkupOrigin::Fetched => {
                // A failed file write does not stop the database save.
                if let Err(e) = self.cache.write(target, markup) {
                    tracing::warn!(
                        "[{}] Failed to save raw html {}: {}",
                        target.site(),
                        target.identity_key(),
                        e
                    );
                }
            }
        }

        let outcome = self.store.save(url, markup, target.site().as_str())?;
        match outcome {
            SaveOutcome::Inserted => tracing::debug!(
                "[{}] Saved to DB: {}",
                target.site(),
                target.identity_key()
            ),
            SaveOutcome::Updated => tracing::debug!(
                "[{}] Updated in DB (changed): {}",
                target.site(),
                target.identity_key()
            ),
            SaveOutcome::Unchanged => tracing::debug!(
                "[{}] Document unchanged, updated timestamp: {}",
                target.site(),
                target.identity_key()
            ),
        }
        Ok(StoreOutcome::Saved(outcome))
    }

    fn store_blocked(&self, target: &CrawlTarget, markup: &str) -> crate::Result<()> {
        self.cache.write_blocked(target, markup)?;
        Ok(())
    }
}
