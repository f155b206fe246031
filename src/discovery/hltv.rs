//! HLTV news archive discovery
//!
//! Walks `/news/archive/{year}/{month}` pages from the first configured year
//! up to the current month and collects every `/news/{id}/{slug}` link.
//! Three consecutive page failures trigger a cool-down before the walk
//! continues.

use crate::config::DiscoveryConfig;
use crate::crawler::{CrawlTarget, SiteEndpoints};
use crate::discovery::SeenSet;
use crate::extract::{extract_links, path_segments};
use crate::fetch::{Fetcher, Sleeper};
use chrono::{Datelike, Utc};
use futures::StreamExt;
use std::time::Duration;
use url::Url;

/// Month names as they appear in archive URLs
pub const MONTHS: [&str; 12] = [
    "january",
    "february",
    "march",
    "april",
    "may",
    "june",
    "july",
    "august",
    "september",
    "october",
    "november",
    "december",
];

/// Consecutive failed pages that trigger the cool-down
const ERROR_THRESHOLD: u32 = 3;

/// Archive walk settings
#[derive(Debug, Clone)]
pub struct HltvDiscoveryOptions {
    pub base_url: String,
    pub first_year: i32,
    pub last_year: i32,
    /// Last month (1-12) walked in `last_year`
    pub last_month: u32,
    pub page_delay: Duration,
    pub error_cooldown: Duration,
    pub concurrency: usize,
}

impl HltvDiscoveryOptions {
    /// Walks up to the current month
    pub fn from_config(config: &DiscoveryConfig, endpoints: &SiteEndpoints) -> Self {
        let now = Utc::now();
        Self {
            base_url: endpoints.hltv.clone(),
            first_year: config.hltv_first_year,
            last_year: now.year(),
            last_month: now.month(),
            page_delay: Duration::from_millis(config.archive_delay_ms),
            error_cooldown: Duration::from_secs(config.error_cooldown_secs),
            concurrency: config.workers.max(1),
        }
    }

    /// (year, month) pairs in walk order
    pub fn archive_pages(&self) -> Vec<(i32, &'static str)> {
        let mut pages = Vec::new();
        for year in self.first_year..=self.last_year {
            for (index, month) in MONTHS.iter().enumerate() {
                if year == self.last_year && index as u32 >= self.last_month {
                    break;
                }
                pages.push((year, *month));
            }
        }
        pages
    }
}

/// URL of one monthly archive page
pub fn archive_url(base_url: &str, year: i32, month: &str) -> String {
    format!(
        "{}/news/archive/{}/{}",
        base_url.trim_end_matches('/'),
        year,
        month
    )
}

/// Every HLTV article target linked from `html`, in document order
pub fn hltv_targets_in(html: &str, page_url: &Url) -> Vec<CrawlTarget> {
    extract_links(html, page_url)
        .iter()
        .filter_map(|link| match path_segments(link).as_slice() {
            ["news", id, slug, ..] => id
                .parse::<u64>()
                .ok()
                .map(|id| CrawlTarget::hltv(id, *slug)),
            _ => None,
        })
        .collect()
}

/// Collects HLTV targets from the news archive
///
/// Pages are fetched `concurrency` at a time but consumed in walk order, so
/// the resulting list is stable across runs.
pub async fn discover_hltv(
    fetcher: &dyn Fetcher,
    sleeper: &dyn Sleeper,
    options: &HltvDiscoveryOptions,
    seen: &SeenSet,
) -> Vec<CrawlTarget> {
    let pages = options.archive_pages();
    tracing::info!(
        "Collecting HLTV targets from {} archive pages ({}..={})",
        pages.len(),
        options.first_year,
        options.last_year
    );

    let mut results = futures::stream::iter(pages)
        .map(|(year, month)| async move {
            let url = archive_url(&options.base_url, year, month);
            let result = fetcher.fetch(&url).await;
            sleeper.sleep(options.page_delay).await;
            (year, month, url, result)
        })
        .buffered(options.concurrency.max(1));

    let mut targets = Vec::new();
    let mut consecutive_errors = 0;

    while let Some((year, month, url, result)) = results.next().await {
        let html = match result {
            Ok(html) => html,
            Err(e) => {
                tracing::warn!("{} {}: load error - {}", month, year, e);
                consecutive_errors += 1;
                if consecutive_errors >= ERROR_THRESHOLD {
                    tracing::warn!(
                        "{} consecutive archive failures; cooling down for {:?}",
                        consecutive_errors,
                        options.error_cooldown
                    );
                    consecutive_errors = 0;
                    sleeper.sleep(options.error_cooldown).await;
                }
                continue;
            }
        };
        consecutive_errors = 0;

        let Ok(page_url) = Url::parse(&url) else {
            continue;
        };

        let mut found = 0;
        for target in hltv_targets_in(&html, &page_url) {
            if seen.insert_target(&target) {
                targets.push(target);
                found += 1;
            }
        }
        if found > 0 {
            tracing::info!("{} {}: found {} articles", month, year, found);
        }
    }

    tracing::info!("Collected {} HLTV targets", targets.len());
    targets
}
