//! Fetch layer
//!
//! Turns a URL into page markup through one of two strategies:
//! - [`HttpFetcher`]: direct requests with browser-like headers, retry with
//!   backoff, and replay of cached bypass cookies
//! - [`BrowserSession`]: a shared headless browser that lets challenges run
//!
//! The strategy is picked once per run. Workers see only the [`Fetcher`] trait.

pub mod backoff;
pub mod browser;
pub mod cookies;
pub mod http;
pub mod retry;
pub mod validate;

pub use backoff::BackoffPolicy;
pub use browser::{BrowserOptions, BrowserSession, BrowserTimings, PageGuard};
pub use cookies::{DomainCookieCache, BYPASS_COOKIE};
pub use http::{build_http_client, HttpFetcher};
pub use retry::{
    AttemptOutcome, RecordingSleeper, RetryPolicy, RetryReason, RetryState, Sleeper, Step,
    TokioSleeper, DEFAULT_MAX_ATTEMPTS,
};
pub use validate::{validate_article, validate_markup, ValidationError};

use crate::config::{FetchConfig, StrategyKind};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Errors surfaced by a fetch after the strategy has given up
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid URL {url}: {detail}")]
    InvalidUrl { url: String, detail: String },

    #[error("failed to fetch {url} after {attempts} attempts: {last_error}")]
    Exhausted {
        url: String,
        attempts: u32,
        last_error: String,
    },

    #[error("navigation to {url} failed: {detail}")]
    Navigation { url: String, detail: String },
}

/// How a failed fetch should be treated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchFailureKind {
    /// Worth retrying on the normal curve
    Transient,
    /// Worth retrying on the long curve
    RateLimited,
    /// Anti-bot page; never retried
    Blocked,
    /// Given up on for this pass
    Fatal,
}

impl FetchFailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Transient => "transient",
            Self::RateLimited => "rate-limited",
            Self::Blocked => "blocked",
            Self::Fatal => "fatal",
        }
    }
}

impl std::fmt::Display for FetchFailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FetchError {
    /// Classifies the failure
    ///
    /// Exhaustion is fatal for the target unless the site was still
    /// rate limiting on the last attempt.
    pub fn kind(&self) -> FetchFailureKind {
        match self {
            Self::Exhausted { last_error, .. }
                if *last_error == RetryReason::RateLimited.to_string() =>
            {
                FetchFailureKind::RateLimited
            }
            Self::Exhausted { .. } | Self::InvalidUrl { .. } | Self::Navigation { .. } => {
                FetchFailureKind::Fatal
            }
        }
    }
}

/// Strategy actually in use for a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStrategy {
    Http,
    Browser,
}

impl FetchStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Browser => "browser",
        }
    }
}

/// Anything that can turn a URL into markup
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetches `url` and returns its markup
    ///
    /// Retries are the implementation's business; an `Err` means the URL is
    /// given up on for this pass.
    async fn fetch(&self, url: &str) -> Result<String, FetchError>;
}

/// Run-wide fetch client with the strategy chosen at startup
///
/// Browser launch failures degrade to HTTP with a warning, so a run never
/// aborts because Chrome is missing.
pub struct FetchClient {
    http: HttpFetcher,
    browser: Option<Arc<BrowserSession>>,
    cookies: Arc<DomainCookieCache>,
}

impl FetchClient {
    /// Creates a client that only uses direct HTTP
    pub fn http_only(config: &FetchConfig) -> crate::Result<Self> {
        let cookies = Arc::new(DomainCookieCache::new());
        let client = build_http_client(config)?;
        let http = HttpFetcher::new(
            client,
            Arc::clone(&cookies),
            RetryPolicy::with_max_attempts(config.max_attempts),
        );

        Ok(Self {
            http,
            browser: None,
            cookies,
        })
    }

    /// Creates a client for the strategy requested in `config`
    pub async fn from_config(config: &FetchConfig) -> crate::Result<Self> {
        let mut client = Self::http_only(config)?;

        if config.strategy == StrategyKind::Browser {
            let options = BrowserOptions::from_config(config);
            match BrowserSession::launch(&options, Arc::clone(&client.cookies)).await {
                Ok(session) => {
                    tracing::info!(
                        "Browser initialized (visible: {}, debug: {})",
                        options.show,
                        options.debug
                    );
                    client.browser = Some(Arc::new(session));
                }
                Err(e) => {
                    tracing::warn!("Failed to initialize browser: {}. Falling back to HTTP", e);
                }
            }
        }

        Ok(client)
    }

    pub fn strategy(&self) -> FetchStrategy {
        if self.browser.is_some() {
            FetchStrategy::Browser
        } else {
            FetchStrategy::Http
        }
    }

    pub fn cookies(&self) -> &Arc<DomainCookieCache> {
        &self.cookies
    }

    /// The shared browser, when the browser strategy is active
    pub fn browser(&self) -> Option<&Arc<BrowserSession>> {
        self.browser.as_ref()
    }

    /// Closes the browser, if any
    pub async fn shutdown(self) {
        if let Some(browser) = self.browser {
            match Arc::try_unwrap(browser) {
                Ok(session) => session.shutdown().await,
                Err(_) => tracing::warn!("Browser still in use at shutdown; leaving it to exit"),
            }
        }
    }
}

#[async_trait]
impl Fetcher for FetchClient {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        match &self.browser {
            Some(browser) => browser.fetch(url).await,
            None => self.http.fetch(url).await,
        }
    }
}

#[async_trait]
impl<F: Fetcher + ?Sized> Fetcher for Arc<F> {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        (**self).fetch(url).await
    }
}
