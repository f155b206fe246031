//! Crawler coordinator - worker pool over a fixed target list
//!
//! A pass enqueues every target into a bounded channel sized to the list,
//! closes it, and lets `worker_count` tasks drain it. Each worker iteration:
//!
//! 1. Resume gate: skip targets before the resume position
//! 2. Build and normalize the article URL
//! 3. Reuse a cached copy unless the pass re-fetches
//! 4. Fetch, then validate the markup
//! 5. Hand the page to the sink and record statistics
//! 6. Tick progress and sleep the politeness delay
//!
//! No per-target error escapes its iteration.

use crate::crawler::sink::{MarkupOrigin, Sink};
use crate::crawler::target::{CrawlTarget, SiteEndpoints};
use crate::fetch::{validate_markup, Fetcher};
use crate::output::{CrawlStatistics, NoProgress, ProgressReporter};
use crate::url::normalize_url;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};

/// Counts for one coordinator pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassSummary {
    /// Targets that went through a full iteration (not resume-skipped)
    pub processed: usize,
    /// Targets stored by the sink
    pub succeeded: usize,
    /// Targets skipped by the resume gate
    pub skipped: usize,
    /// Fetch, normalization, empty-page and sink failures
    pub failed: usize,
    /// Pages rejected by the anti-bot check
    pub blocked: usize,
    /// Targets dequeued by each worker
    pub per_worker: Vec<usize>,
}

impl PassSummary {
    /// Every target dequeued by any worker
    pub fn dequeued(&self) -> usize {
        self.per_worker.iter().sum()
    }

    fn absorb(&mut self, tally: WorkerTally) {
        self.processed += tally.processed;
        self.succeeded += tally.succeeded;
        self.skipped += tally.skipped;
        self.failed += tally.failed;
        self.blocked += tally.blocked;
        self.per_worker.push(tally.dequeued);
    }
}

#[derive(Debug, Default)]
struct WorkerTally {
    dequeued: usize,
    processed: usize,
    succeeded: usize,
    skipped: usize,
    failed: usize,
    blocked: usize,
}

impl WorkerTally {
    fn record(&mut self, outcome: TargetOutcome) {
        self.processed += 1;
        match outcome {
            TargetOutcome::Stored => self.succeeded += 1,
            TargetOutcome::Blocked => self.blocked += 1,
            TargetOutcome::Failed => self.failed += 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TargetOutcome {
    Stored,
    Blocked,
    Failed,
}

/// Position in the target list before which every job is skipped
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResumeGate {
    position: usize,
}

impl ResumeGate {
    /// A gate that lets everything through
    pub fn open() -> Self {
        Self::default()
    }

    /// Computes the gate for `resume_from` over `targets`
    ///
    /// The position is the index of the first target whose normalized URL
    /// equals the normalized resume URL. An unknown URL opens the gate.
    pub fn locate(
        targets: &[CrawlTarget],
        resume_from: Option<&str>,
        endpoints: &SiteEndpoints,
    ) -> Self {
        let Some(resume_from) = resume_from else {
            return Self::open();
        };

        let resume_url = match normalize_url(resume_from) {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!("Ignoring resume URL {}: {}", resume_from, e);
                return Self::open();
            }
        };

        let position = targets.iter().position(|target| {
            normalize_url(&target.url_on(endpoints))
                .map(|url| url == resume_url)
                .unwrap_or(false)
        });

        match position {
            Some(position) => {
                tracing::info!(
                    "Resuming from {} (skipping {} targets)",
                    resume_url,
                    position
                );
                Self { position }
            }
            None => {
                tracing::warn!(
                    "Resume URL {} not found in target list; processing everything",
                    resume_url
                );
                Self::open()
            }
        }
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn should_skip(&self, index: usize) -> bool {
        index < self.position
    }
}

/// Runs crawl passes over target lists
#[derive(Clone)]
pub struct Coordinator {
    fetcher: Arc<dyn Fetcher>,
    sink: Arc<dyn Sink>,
    stats: Arc<CrawlStatistics>,
    progress: Arc<dyn ProgressReporter>,
    endpoints: SiteEndpoints,
    delay: Duration,
    refetch: bool,
}

impl Coordinator {
    /// Creates a coordinator with no politeness delay and silent progress
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        sink: Arc<dyn Sink>,
        stats: Arc<CrawlStatistics>,
    ) -> Self {
        Self {
            fetcher,
            sink,
            stats,
            progress: Arc::new(NoProgress),
            endpoints: SiteEndpoints::default(),
            delay: Duration::ZERO,
            refetch: false,
        }
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressReporter>) -> Self {
        self.progress = progress;
        self
    }

    pub fn with_endpoints(mut self, endpoints: SiteEndpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    /// Delay applied after every processed target
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Ignore cached copies and fetch every target
    pub fn with_refetch(mut self, refetch: bool) -> Self {
        self.refetch = refetch;
        self
    }

    /// Processes every target once across `worker_count` workers
    ///
    /// # Arguments
    ///
    /// * `targets` - The deduplicated target list
    /// * `worker_count` - Number of concurrent workers (at least 1)
    /// * `resume_from` - URL of the last stored document, if resuming
    ///
    /// # Returns
    ///
    /// Counts for the pass; returns after every worker has finished.
    pub async fn run(
        &self,
        targets: Vec<CrawlTarget>,
        worker_count: usize,
        resume_from: Option<&str>,
    ) -> PassSummary {
        let worker_count = worker_count.max(1);
        let gate = ResumeGate::locate(&targets, resume_from, &self.endpoints);
        let total = targets.len();

        let (sender, receiver) = mpsc::channel::<(usize, CrawlTarget)>(total.max(1));
        for job in targets.into_iter().enumerate() {
            if sender.send(job).await.is_err() {
                break;
            }
        }
        drop(sender);

        let receiver = Arc::new(Mutex::new(receiver));
        let handles: Vec<_> = (0..worker_count)
            .map(|worker_id| {
                let coordinator = self.clone();
                let receiver = Arc::clone(&receiver);
                tokio::spawn(async move { coordinator.work(worker_id, receiver, gate).await })
            })
            .collect();

        let mut summary = PassSummary::default();
        for (worker_id, handle) in handles.into_iter().enumerate() {
            match handle.await {
                Ok(tally) => summary.absorb(tally),
                Err(e) => {
                    tracing::error!("Worker {} terminated abnormally: {}", worker_id, e);
                    summary.per_worker.push(0);
                }
            }
        }

        self.progress.finish();
        tracing::info!(
            "Pass complete: {} targets, {} stored, {} failed, {} blocked, {} skipped",
            total,
            summary.succeeded,
            summary.failed,
            summary.blocked,
            summary.skipped
        );
        summary
    }

    async fn work(
        &self,
        worker_id: usize,
        receiver: Arc<Mutex<mpsc::Receiver<(usize, CrawlTarget)>>>,
        gate: ResumeGate,
    ) -> WorkerTally {
        let mut tally = WorkerTally::default();

        loop {
            let job = { receiver.lock().await.recv().await };
            let Some((index, target)) = job else {
                break;
            };
            tally.dequeued += 1;

            if gate.should_skip(index) {
                tally.skipped += 1;
                self.progress.tick(&target);
                continue;
            }

            let outcome = self.process(&target).await;
            tally.record(outcome);
            self.progress.tick(&target);

            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
        }

        tracing::debug!("Worker {} finished after {} targets", worker_id, tally.dequeued);
        tally
    }

    async fn process(&self, target: &CrawlTarget) -> TargetOutcome {
        let site = target.site();
        let key = target.identity_key();
        let raw_url = target.url_on(&self.endpoints);

        let url = match normalize_url(&raw_url) {
            Ok(url) => url.to_string(),
            Err(e) => {
                tracing::warn!("[{}] Failed to normalize URL {}: {}", site, raw_url, e);
                return TargetOutcome::Failed;
            }
        };

        let cached = if self.refetch {
            None
        } else {
            match self.sink.cached(target) {
                Ok(cached) => cached.filter(|markup| !markup.trim().is_empty()),
                Err(e) => {
                    tracing::warn!("[{}] Could not read cached copy of {}: {}", site, key, e);
                    None
                }
            }
        };

        let (markup, origin) = match cached {
            Some(markup) => {
                tracing::debug!("[{}] Using existing file: {}", site, key);
                (markup, MarkupOrigin::Cache)
            }
            None => match self.fetcher.fetch(&raw_url).await {
                Ok(markup) => (markup, MarkupOrigin::Fetched),
                Err(e) => {
                    tracing::warn!("[{}] Failed to download {} ({}): {}", site, key, e.kind(), e);
                    return TargetOutcome::Failed;
                }
            },
        };

        if origin == MarkupOrigin::Fetched {
            if let Err(e) = validate_markup(&markup) {
                if e.is_blocked() {
                    tracing::warn!("[{}] Blocked (anti-bot) {}: {}", site, key, e);
                    if let Err(e) = self.sink.store_blocked(target, &markup) {
                        tracing::debug!("[{}] Could not keep blocked page {}: {}", site, key, e);
                    }
                    return TargetOutcome::Blocked;
                }
                tracing::warn!("[{}] Skipping {} ({}): {}", site, key, e.kind(), e);
                return TargetOutcome::Failed;
            }
        }

        match self.sink.store(target, &url, &markup, origin) {
            Ok(_) => {
                self.stats.record(site, markup.len());
                tracing::info!("[{}] Stored {}", site, key);
                TargetOutcome::Stored
            }
            Err(e) => {
                tracing::warn!("[{}] Failed to store {}: {}", site, key, e);
                TargetOutcome::Failed
            }
        }
    }
}
