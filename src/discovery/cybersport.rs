//! Cybersport tag listing discovery
//!
//! The listing grows through a "load more" button and infinite scroll, so it
//! is driven in the browser: remove overlays, press the button once, then
//! keep scrolling until several rounds in a row add nothing.

use crate::config::DiscoveryConfig;
use crate::crawler::{CrawlTarget, SiteEndpoints};
use crate::discovery::{IdleStop, SeenSet};
use crate::extract::{extract_links, path_segments};
use crate::fetch::{BrowserSession, PageGuard};
use std::time::Duration;
use url::Url;

/// Removes cookie banners and sticky headers that intercept clicks
const REMOVE_OVERLAYS_JS: &str = r#"
document.querySelectorAll('.accept-cookies-text, [class*="Header_sticky"], [class*="Cookie"]').forEach(el => el.remove());
document.body.style.pointerEvents = 'auto';
document.body.style.overflow = 'auto';
document.documentElement.style.overflow = 'auto';
"#;

const LOAD_MORE_SELECTOR: &str = r#"button[class*="button_+fnen"]"#;

const SCROLL_JS: &str = "window.scrollBy(0, 3000)";

const SCROLL_WAIT: Duration = Duration::from_millis(1500);
const CLICK_SETTLE: Duration = Duration::from_millis(500);
const CLICK_WAIT: Duration = Duration::from_secs(2);

/// Listing walk settings
#[derive(Debug, Clone)]
pub struct CybersportDiscoveryOptions {
    pub base_url: String,
    pub tags: Vec<String>,
    pub max_idle_rounds: u32,
    pub max_targets_per_tag: usize,
}

impl CybersportDiscoveryOptions {
    pub fn from_config(config: &DiscoveryConfig, endpoints: &SiteEndpoints) -> Self {
        Self {
            base_url: endpoints.cybersport.clone(),
            tags: config.cybersport_tags.clone(),
            max_idle_rounds: config.max_idle_rounds,
            max_targets_per_tag: config.max_targets_per_tag,
        }
    }

    fn listing_url(&self, tag: &str) -> String {
        format!("{}/tags/{}", self.base_url.trim_end_matches('/'), tag)
    }
}

/// Every article under `/tags/{tag}/` linked from `html`, in document order
///
/// Pagination links and links back to the tag page itself are excluded.
pub fn cybersport_targets_in(html: &str, page_url: &Url, tag: &str) -> Vec<CrawlTarget> {
    extract_links(html, page_url)
        .iter()
        .filter_map(|link| {
            let segments = path_segments(link);
            match segments.as_slice() {
                ["tags", link_tag, rest @ ..] if *link_tag == tag && !rest.is_empty() => {
                    let slug = rest.join("/");
                    let slug = slug.trim_matches('/');
                    if slug.is_empty() || slug == tag || slug.contains("page") {
                        None
                    } else {
                        Some(CrawlTarget::cybersport(tag, slug))
                    }
                }
                _ => None,
            }
        })
        .collect()
}

/// Collects Cybersport targets for every configured tag
///
/// Needs the browser; without one, nothing is discovered.
pub async fn discover_cybersport(
    browser: Option<&BrowserSession>,
    options: &CybersportDiscoveryOptions,
    seen: &SeenSet,
) -> Vec<CrawlTarget> {
    let Some(browser) = browser else {
        tracing::error!("Cybersport discovery needs the browser strategy; skipping");
        return Vec::new();
    };

    let mut targets = Vec::new();
    for tag in &options.tags {
        let found = walk_tag(browser, options, tag, seen).await;
        tracing::info!("Tag {}: collected {} targets", tag, found.len());
        targets.extend(found);
    }
    targets
}

async fn walk_tag(
    browser: &BrowserSession,
    options: &CybersportDiscoveryOptions,
    tag: &str,
    seen: &SeenSet,
) -> Vec<CrawlTarget> {
    let listing = options.listing_url(tag);
    let Ok(page_url) = Url::parse(&listing) else {
        tracing::warn!("Invalid listing URL {}", listing);
        return Vec::new();
    };

    let page = match browser.open(&listing).await {
        Ok(page) => page,
        Err(e) => {
            tracing::warn!("Failed to open {}: {}", listing, e);
            return Vec::new();
        }
    };
    tokio::time::sleep(browser.timings().settle).await;

    let mut targets = Vec::new();
    let mut stop = IdleStop::new(options.max_idle_rounds, options.max_targets_per_tag);
    let mut clicked = false;
    let mut round = 0u32;

    loop {
        round += 1;
        if let Err(e) = page.evaluate(REMOVE_OVERLAYS_JS).await {
            tracing::debug!("Overlay removal failed on {}: {}", listing, e);
        }

        if !clicked && click_load_more(&page).await {
            clicked = true;
        } else {
            if let Err(e) = page.evaluate(SCROLL_JS).await {
                tracing::debug!("Scroll failed on {}: {}", listing, e);
            }
            tokio::time::sleep(SCROLL_WAIT).await;
        }

        let html = match page.content().await {
            Ok(html) => html,
            Err(e) => {
                tracing::warn!("Lost listing {}: {}", listing, e);
                break;
            }
        };

        let mut new_targets = 0;
        for target in cybersport_targets_in(&html, &page_url, tag) {
            if seen.insert_target(&target) {
                targets.push(target);
                new_targets += 1;
            }
        }
        tracing::debug!(
            "Tag {} round {}: {} new, {} total",
            tag,
            round,
            new_targets,
            targets.len()
        );

        if stop.observe(new_targets, targets.len()) {
            break;
        }
    }

    page.close().await;
    targets
}

/// Presses the "load more" button if it is on the page
///
/// Returns false when the button is missing.
async fn click_load_more(page: &PageGuard) -> bool {
    let Ok(button) = page.find_element(LOAD_MORE_SELECTOR).await else {
        return false;
    };

    if let Err(e) = button.scroll_into_view().await {
        tracing::debug!("Could not scroll to load-more button: {}", e);
    }
    tokio::time::sleep(CLICK_SETTLE).await;

    if let Err(e) = button.click().await {
        tracing::debug!("Native click failed ({}), clicking from script", e);
        let script = format!(
            "document.querySelector('{}')?.click()",
            LOAD_MORE_SELECTOR.replace('\'', "\\'")
        );
        if let Err(e) = page.evaluate(script).await {
            tracing::debug!("Script click on load-more button failed: {}", e);
        }
    }
    tokio::time::sleep(CLICK_WAIT).await;
    true
}
