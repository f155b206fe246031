//! Progress reporting for worker pools
//!
//! Reporters are observational only; nothing in the crawl depends on them.

use crate::crawler::CrawlTarget;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::atomic::{AtomicU64, Ordering};

/// Receives one tick per dequeued target
pub trait ProgressReporter: Send + Sync {
    fn tick(&self, target: &CrawlTarget);
    fn finish(&self);
}

/// Logs a progress line every `every` targets
#[derive(Debug)]
pub struct LogProgress {
    label: String,
    total: u64,
    every: u64,
    done: AtomicU64,
}

impl LogProgress {
    pub fn new(label: impl Into<String>, total: u64) -> Self {
        Self {
            label: label.into(),
            total,
            every: 10,
            done: AtomicU64::new(0),
        }
    }

    pub fn with_interval(mut self, every: u64) -> Self {
        self.every = every.max(1);
        self
    }

    pub fn done(&self) -> u64 {
        self.done.load(Ordering::Relaxed)
    }
}

impl ProgressReporter for LogProgress {
    fn tick(&self, target: &CrawlTarget) {
        let done = self.done.fetch_add(1, Ordering::Relaxed) + 1;
        if done % self.every == 0 || done == self.total {
            tracing::info!(
                "[{}] Progress: {}/{} (last: {})",
                self.label,
                done,
                self.total,
                target.identity_key()
            );
        }
    }

    fn finish(&self) {
        tracing::info!("[{}] Done: {}/{}", self.label, self.done(), self.total);
    }
}

/// Terminal progress bar
pub struct BarProgress {
    bar: ProgressBar,
}

impl BarProgress {
    pub fn new(label: &str, total: u64) -> Self {
        let bar = ProgressBar::new(total);
        let style = ProgressStyle::default_bar()
            .template("{prefix} [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}")
            .map(|style| style.progress_chars("=>-"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        bar.set_style(style);
        bar.set_prefix(label.to_string());
        Self { bar }
    }
}

impl ProgressReporter for BarProgress {
    fn tick(&self, target: &CrawlTarget) {
        self.bar.set_message(target.identity_key());
        self.bar.inc(1);
    }

    fn finish(&self) {
        self.bar.finish_with_message("done");
    }
}

/// Discards all progress
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn tick(&self, _target: &CrawlTarget) {}
    fn finish(&self) {}
}
