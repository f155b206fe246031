//! Output module for crawl statistics and progress
//!
//! This module handles:
//! - Live counters shared by workers and the `statistics.json` report
//! - Store summaries printed by `--stats`
//! - Progress reporters (log lines or a terminal bar)

pub mod progress;
pub mod stats;

pub use progress::{BarProgress, LogProgress, NoProgress, ProgressReporter};
pub use stats::{
    load_store_summary, print_store_summary, write_statistics_file, CrawlStatistics,
    StatisticsSnapshot, StoreSummary, STATISTICS_FILE,
};
