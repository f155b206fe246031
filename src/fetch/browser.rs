//! Headless browser fetch strategy
//!
//! One browser is launched per run and shared by every worker; each fetch
//! gets its own tab. Pages are closed through [`PageGuard`] on every path.

use crate::config::FetchConfig;
use crate::fetch::cookies::{DomainCookieCache, BYPASS_COOKIE};
use crate::fetch::validate::has_challenge_marker;
use crate::fetch::{FetchError, Fetcher};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::Page;
use futures::StreamExt;
use std::ops::Deref;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use url::Url;

/// Fixed waits applied around every navigation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BrowserTimings {
    /// Upper bound for a single navigation
    pub navigation_timeout: Duration,

    /// Wait after navigation before the first look at the page
    pub settle: Duration,

    /// Extra wait when a challenge page was detected
    pub challenge_wait: Duration,

    /// Final wait before the markup is captured
    pub idle: Duration,
}

impl Default for BrowserTimings {
    fn default() -> Self {
        Self {
            navigation_timeout: Duration::from_secs(60),
            settle: Duration::from_secs(2),
            challenge_wait: Duration::from_secs(3),
            idle: Duration::from_secs(1),
        }
    }
}

/// Launch options for the shared browser
#[derive(Debug, Clone, Default)]
pub struct BrowserOptions {
    /// Show the browser window instead of running headless
    pub show: bool,

    /// Open devtools for every tab
    pub debug: bool,

    /// Persistent profile directory
    pub user_data_dir: Option<PathBuf>,

    pub executable: Option<PathBuf>,

    pub timings: BrowserTimings,
}

impl BrowserOptions {
    pub fn from_config(config: &FetchConfig) -> Self {
        Self {
            show: config.show_browser,
            debug: config.browser_debug,
            user_data_dir: config.browser_data_dir.as_ref().map(PathBuf::from),
            executable: config.chrome_path.as_ref().map(PathBuf::from),
            timings: BrowserTimings {
                navigation_timeout: Duration::from_secs(config.navigation_timeout_secs.max(1)),
                ..BrowserTimings::default()
            },
        }
    }
}

/// Closes a tab when dropped
///
/// `close` is the normal path; dropping the guard spawns the close on the
/// runtime so error paths do not leak tabs.
pub struct PageGuard {
    page: Page,
    url: String,
    closed: bool,
    runtime: tokio::runtime::Handle,
}

impl PageGuard {
    pub fn new(page: Page, url: impl Into<String>) -> Self {
        Self {
            page,
            url: url.into(),
            closed: false,
            runtime: tokio::runtime::Handle::current(),
        }
    }

    pub fn page(&self) -> &Page {
        &self.page
    }

    /// Closes the tab, logging failures
    pub async fn close(mut self) {
        self.closed = true;
        if let Err(e) = self.page.clone().close().await {
            tracing::warn!("Failed to close page for {}: {}", self.url, e);
        }
    }
}

impl Deref for PageGuard {
    type Target = Page;

    fn deref(&self) -> &Page {
        &self.page
    }
}

impl Drop for PageGuard {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        let page = self.page.clone();
        let url = std::mem::take(&mut self.url);
        self.runtime.spawn(async move {
            if let Err(e) = page.close().await {
                tracing::warn!("Page cleanup failed for {}: {}", url, e);
            }
        });
    }
}

/// The shared browser and its CDP event loop
pub struct BrowserSession {
    browser: Browser,
    handler: JoinHandle<()>,
    cookies: Arc<DomainCookieCache>,
    timings: BrowserTimings,
}

impl BrowserSession {
    /// Launches the browser
    ///
    /// # Errors
    ///
    /// Returns `CorpusError::Browser` if no usable Chrome is found or the
    /// process fails to start.
    pub async fn launch(
        options: &BrowserOptions,
        cookies: Arc<DomainCookieCache>,
    ) -> crate::Result<Self> {
        let mut builder = BrowserConfig::builder()
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--disable-dev-shm-usage")
            .arg("--no-first-run");

        if options.show {
            builder = builder.with_head();
        }
        if options.debug {
            builder = builder.arg("--auto-open-devtools-for-tabs");
        }
        if let Some(dir) = &options.user_data_dir {
            builder = builder.user_data_dir(dir);
        }
        if let Some(path) = &options.executable {
            builder = builder.chrome_executable(path);
        }

        let config = builder.build().map_err(crate::CorpusError::Browser)?;
        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| crate::CorpusError::Browser(format!("failed to launch browser: {}", e)))?;

        let handler = tokio::spawn(async move { while handler.next().await.is_some() {} });

        Ok(Self {
            browser,
            handler,
            cookies,
            timings: options.timings,
        })
    }

    pub fn timings(&self) -> BrowserTimings {
        self.timings
    }

    /// Opens a new tab navigated to `url`
    pub async fn open(&self, url: &str) -> Result<PageGuard, FetchError> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| navigation_error(url, e))?;
        let guard = PageGuard::new(page, url);

        match tokio::time::timeout(self.timings.navigation_timeout, guard.goto(url)).await {
            Ok(Ok(_)) => Ok(guard),
            Ok(Err(e)) => Err(navigation_error(url, e)),
            Err(_) => Err(FetchError::Navigation {
                url: url.to_string(),
                detail: format!("timed out after {:?}", self.timings.navigation_timeout),
            }),
        }
    }

    /// Waits out a challenge, if one is showing, then captures the markup
    async fn render(&self, page: &Page, url: &Url) -> Result<String, FetchError> {
        tokio::time::sleep(self.timings.settle).await;

        let html = page
            .content()
            .await
            .map_err(|e| navigation_error(url.as_str(), e))?;

        if has_challenge_marker(&html) {
            tracing::debug!("Challenge detected at {}, waiting", url);
            tokio::time::sleep(self.timings.challenge_wait).await;
            if tokio::time::timeout(self.timings.navigation_timeout, page.wait_for_navigation())
                .await
                .is_err()
            {
                tracing::debug!("Challenge at {} did not navigate away in time", url);
            }
        }

        tokio::time::sleep(self.timings.idle).await;
        self.capture_cookie(page, url).await;

        page.content()
            .await
            .map_err(|e| navigation_error(url.as_str(), e))
    }

    /// Copies the bypass cookie from the tab into the shared cache
    async fn capture_cookie(&self, page: &Page, url: &Url) {
        match page.get_cookies().await {
            Ok(cookies) => {
                if let Some(cookie) = cookies.iter().find(|c| c.name == BYPASS_COOKIE) {
                    self.cookies.store_for_url(url, &cookie.value);
                }
            }
            Err(e) => tracing::debug!("Could not read cookies for {}: {}", url, e),
        }
    }

    /// Closes the browser and stops its event loop
    pub async fn shutdown(mut self) {
        if let Err(e) = self.browser.close().await {
            tracing::warn!("Failed to close browser: {}", e);
        }
        self.handler.abort();
    }
}

#[async_trait]
impl Fetcher for BrowserSession {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let parsed = Url::parse(url).map_err(|e| FetchError::InvalidUrl {
            url: url.to_string(),
            detail: e.to_string(),
        })?;

        let guard = self.open(url).await?;
        let result = self.render(guard.page(), &parsed).await;
        guard.close().await;
        result
    }
}

fn navigation_error(url: &str, error: impl std::fmt::Display) -> FetchError {
    FetchError::Navigation {
        url: url.to_string(),
        detail: error.to_string(),
    }
}
