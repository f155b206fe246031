//! Import of an existing raw-file cache into the document store

use crate::crawler::CrawlTarget;
use crate::normalize_url;
use crate::storage::{DocumentStore, RawCache};

/// Result of an import walk
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportReport {
    /// Newly saved from a raw file
    pub added: usize,
    /// Already in the store
    pub skipped: usize,
    /// No raw file on disk
    pub missing: usize,
    /// Could not be read or saved
    pub failed: usize,
}

/// Saves every target whose raw file exists but whose URL is not yet stored
pub fn import_raw_cache(
    store: &dyn DocumentStore,
    cache: &RawCache,
    targets: &[CrawlTarget],
) -> ImportReport {
    let mut report = ImportReport::default();

    for target in targets {
        let url = match normalize_url(&target.url()) {
            Ok(url) => url.to_string(),
            Err(e) => {
                tracing::warn!("Skipping {}: {}", target, e);
                report.failed += 1;
                continue;
            }
        };

        match store.exists(&url) {
            Ok(true) => {
                report.skipped += 1;
                continue;
            }
            Ok(false) => {}
            Err(e) => {
                tracing::warn!("Lookup failed for {}: {}", url, e);
                report.failed += 1;
                continue;
            }
        }

        let markup = match cache.read(target) {
            Ok(Some(markup)) => markup,
            Ok(None) => {
                report.missing += 1;
                continue;
            }
            Err(e) => {
                tracing::warn!("Failed to read raw file for {}: {}", target, e);
                report.failed += 1;
                continue;
            }
        };

        match store.save(&url, &markup, target.site().as_str()) {
            Ok(_) => report.added += 1,
            Err(e) => {
                tracing::warn!("Failed to import {}: {}", url, e);
                report.failed += 1;
            }
        }
    }

    tracing::info!(
        "Import finished: {} added, {} already stored, {} without raw file, {} failed",
        report.added,
        report.skipped,
        report.missing,
        report.failed
    );
    report
}
