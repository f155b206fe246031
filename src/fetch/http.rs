//! Direct HTTP fetch strategy
//!
//! Requests carry browser-like headers and, when one has been earned, the
//! domain's bypass cookie. Failures are retried through [`RetryState`]:
//!
//! | Condition | Action |
//! |-----------|--------|
//! | 2xx | Return body; refresh bypass cookie if the page is not a challenge |
//! | 429 | Retry on the rate-limit curve, logged |
//! | Other status | Retry on the transient curve |
//! | Network error | Retry on the transient curve |
//! | Attempts used up | `FetchError::Exhausted` |

use crate::config::FetchConfig;
use crate::fetch::cookies::{DomainCookieCache, BYPASS_COOKIE};
use crate::fetch::retry::{
    AttemptOutcome, RetryPolicy, RetryReason, RetryState, Sleeper, Step, TokioSleeper,
};
use crate::fetch::validate::has_challenge_marker;
use crate::fetch::{FetchError, Fetcher};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CACHE_CONTROL, COOKIE};
use reqwest::{Client, StatusCode};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Builds the HTTP client used by the direct strategy
///
/// # Arguments
///
/// * `config` - The fetch configuration (user agent and timeouts)
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(config: &FetchConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.clone())
        .default_headers(browser_headers())
        .timeout(Duration::from_secs(config.request_timeout_secs.max(1)))
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Headers a desktop browser sends with a top-level navigation
fn browser_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static(
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8",
        ),
    );
    headers.insert(
        ACCEPT_LANGUAGE,
        HeaderValue::from_static("en-US,en;q=0.9,ru;q=0.8"),
    );
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("max-age=0"));
    headers.insert("Upgrade-Insecure-Requests", HeaderValue::from_static("1"));
    headers.insert("Sec-Fetch-Dest", HeaderValue::from_static("document"));
    headers.insert("Sec-Fetch-Mode", HeaderValue::from_static("navigate"));
    headers.insert("Sec-Fetch-Site", HeaderValue::from_static("none"));
    headers.insert("Sec-Fetch-User", HeaderValue::from_static("?1"));
    headers
}

/// Fetches pages over plain HTTP with retry and cookie replay
pub struct HttpFetcher {
    client: Client,
    cookies: Arc<DomainCookieCache>,
    policy: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
}

impl HttpFetcher {
    pub fn new(client: Client, cookies: Arc<DomainCookieCache>, policy: RetryPolicy) -> Self {
        Self {
            client,
            cookies,
            policy,
            sleeper: Arc::new(TokioSleeper),
        }
    }

    /// Replaces the sleeper used between attempts
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn cookies(&self) -> &Arc<DomainCookieCache> {
        &self.cookies
    }

    /// Makes a single request and classifies the result
    async fn attempt(&self, url: &Url) -> AttemptOutcome<String> {
        let mut request = self.client.get(url.clone());
        if let Some(cookie) = self.cookies.header_for(url) {
            request = request.header(COOKIE, cookie);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) if e.is_timeout() => return AttemptOutcome::Transient("request timeout".into()),
            Err(e) if e.is_connect() => {
                return AttemptOutcome::Transient(format!("connection failed: {}", e))
            }
            Err(e) => return AttemptOutcome::Transient(e.to_string()),
        };

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return AttemptOutcome::RateLimited;
        }
        if !status.is_success() {
            return AttemptOutcome::Transient(format!("HTTP {}", status.as_u16()));
        }

        let final_url = response.url().clone();
        let bypass = response
            .cookies()
            .find(|cookie| cookie.name() == BYPASS_COOKIE)
            .map(|cookie| cookie.value().to_string());

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => return AttemptOutcome::Transient(format!("failed to read body: {}", e)),
        };

        if let Some(value) = bypass {
            if !has_challenge_marker(&body) {
                self.cookies.store_for_url(&final_url, &value);
            }
        }

        AttemptOutcome::Success(body)
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let parsed = Url::parse(url).map_err(|e| FetchError::InvalidUrl {
            url: url.to_string(),
            detail: e.to_string(),
        })?;

        let mut state = RetryState::new(self.policy);
        loop {
            let outcome = self.attempt(&parsed).await;
            let step = state.advance(outcome, &mut rand::rng());

            match step {
                Step::Done(body) => return Ok(body),
                Step::Failed(error) => return Err(error),
                Step::Exhausted { attempts, last } => {
                    return Err(FetchError::Exhausted {
                        url: url.to_string(),
                        attempts,
                        last_error: last.to_string(),
                    })
                }
                Step::Retry {
                    delay,
                    next_attempt,
                    reason,
                } => {
                    match &reason {
                        RetryReason::RateLimited => tracing::warn!(
                            "got 429 from {}; sleeping {:?} (attempt {})",
                            url,
                            delay,
                            next_attempt
                        ),
                        RetryReason::Transient(detail) => tracing::debug!(
                            "{} failed ({}); retrying in {:?} (attempt {})",
                            url,
                            detail,
                            delay,
                            next_attempt
                        ),
                    }
                    self.sleeper.sleep(delay).await;
                }
            }
        }
    }
}
