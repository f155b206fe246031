//! Crawl passes over a fixed target list
//!
//! This module contains the core crawling logic, including:
//! - Target identity and URL construction
//! - The worker pool that fetches, validates and stores each target once
//! - Sinks for the raw-file cache and the document store
//! - Import of an existing raw cache and the reprocess pass

mod coordinator;
mod import;
mod reprocess;
mod sink;
mod target;

pub use coordinator::{Coordinator, PassSummary, ResumeGate};
pub use import::{import_raw_cache, ImportReport};
pub use reprocess::{parsed_text, reprocess_site, ReprocessReport};
pub use sink::{DatabaseSink, FileSink, MarkupOrigin, Sink, StoreOutcome};
pub use target::{CrawlTarget, Site, SiteEndpoints};

use crate::storage::DocumentStore;
use std::time::Duration;

/// Targets whose stored copy is older than `max_age`
///
/// Stored URLs that map to no target are dropped.
pub fn stale_targets(store: &dyn DocumentStore, max_age: Duration) -> crate::Result<Vec<CrawlTarget>> {
    let stale = store.stale_documents(max_age)?;
    let total = stale.len();
    let targets: Vec<CrawlTarget> = stale
        .iter()
        .filter_map(|document| CrawlTarget::from_url(&document.url))
        .collect();

    if targets.len() < total {
        tracing::debug!(
            "{} stale documents have no matching target",
            total - targets.len()
        );
    }
    Ok(targets)
}
