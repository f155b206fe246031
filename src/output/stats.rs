//! Crawl statistics
//!
//! Two views of the corpus:
//! - [`CrawlStatistics`]: live counters updated by workers during a run and
//!   written to `statistics.json` at the end
//! - [`StoreSummary`]: per-source totals read back from the document store

use crate::crawler::Site;
use crate::storage::DocumentStore;
use crate::CorpusError;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// File name of the statistics report inside the corpus directory
pub const STATISTICS_FILE: &str = "statistics.json";

#[derive(Debug, Default, Clone, Copy)]
struct Counters {
    total_articles: u64,
    total_size_bytes: u64,
    hltv_articles: u64,
    cybersport_articles: u64,
}

/// Run-wide counters shared by every worker
///
/// A single mutex guards all counters so a snapshot is always consistent.
#[derive(Debug)]
pub struct CrawlStatistics {
    counters: Mutex<Counters>,
    started: Instant,
    started_at: DateTime<Utc>,
}

impl CrawlStatistics {
    pub fn new() -> Self {
        Self {
            counters: Mutex::new(Counters::default()),
            started: Instant::now(),
            started_at: Utc::now(),
        }
    }

    /// Records one stored article
    pub fn record(&self, site: Site, bytes: usize) {
        let mut counters = match self.counters.lock() {
            Ok(counters) => counters,
            Err(poisoned) => poisoned.into_inner(),
        };
        counters.total_articles += 1;
        counters.total_size_bytes += bytes as u64;
        match site {
            Site::Hltv => counters.hltv_articles += 1,
            Site::Cybersport => counters.cybersport_articles += 1,
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Consistent copy of the counters
    pub fn snapshot(&self, corpus_path: &Path, browser_mode: bool) -> StatisticsSnapshot {
        let counters = match self.counters.lock() {
            Ok(counters) => *counters,
            Err(poisoned) => *poisoned.into_inner(),
        };
        StatisticsSnapshot {
            total_articles: counters.total_articles,
            total_size_bytes: counters.total_size_bytes,
            hltv_articles: counters.hltv_articles,
            cybersport_articles: counters.cybersport_articles,
            started_at: self.started_at,
            download_time: format!("{:.1}s", self.elapsed().as_secs_f64()),
            download_time_secs: self.elapsed().as_secs_f64(),
            corpus_path: corpus_path.display().to_string(),
            browser_mode,
        }
    }
}

impl Default for CrawlStatistics {
    fn default() -> Self {
        Self::new()
    }
}

/// Serializable statistics report
#[derive(Debug, Clone, Serialize)]
pub struct StatisticsSnapshot {
    pub total_articles: u64,
    pub total_size_bytes: u64,
    pub hltv_articles: u64,
    pub cybersport_articles: u64,
    pub started_at: DateTime<Utc>,
    pub download_time: String,
    pub download_time_secs: f64,
    pub corpus_path: String,
    pub browser_mode: bool,
}

/// Writes `statistics.json` into the corpus directory
///
/// # Returns
///
/// The path of the written file
pub fn write_statistics_file(
    snapshot: &StatisticsSnapshot,
    corpus_dir: &Path,
) -> Result<PathBuf, CorpusError> {
    std::fs::create_dir_all(corpus_dir)?;
    let path = corpus_dir.join(STATISTICS_FILE);
    let json = serde_json::to_string_pretty(snapshot)?;
    std::fs::write(&path, json)?;
    Ok(path)
}

/// Per-source totals read from the document store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreSummary {
    pub total_documents: u64,
    pub total_bytes: u64,
    pub by_source: HashMap<String, u64>,
}

/// Loads totals from the store
///
/// # Arguments
///
/// * `store` - The document store to query
pub fn load_store_summary(store: &dyn DocumentStore) -> Result<StoreSummary, CorpusError> {
    let by_source = store.count_by_source()?;
    let total_documents = by_source.values().sum();
    let total_bytes = store.total_bytes()?;

    Ok(StoreSummary {
        total_documents,
        total_bytes,
        by_source,
    })
}

/// Prints store totals to stdout
pub fn print_store_summary(summary: &StoreSummary) {
    println!("=== Corpus Statistics ===\n");
    println!("  Total documents: {}", summary.total_documents);
    println!(
        "  Total size: {} bytes ({:.2} MB)",
        summary.total_bytes,
        summary.total_bytes as f64 / (1024.0 * 1024.0)
    );
    println!();

    println!("Documents by Source:");
    let mut sources: Vec<_> = summary.by_source.iter().collect();
    sources.sort_by(|a, b| b.1.cmp(a.1));
    for (source, count) in sources {
        let percentage = if summary.total_documents > 0 {
            (*count as f64 / summary.total_documents as f64) * 100.0
        } else {
            0.0
        };
        println!("  {}: {} ({:.1}%)", source, count, percentage);
    }
}
