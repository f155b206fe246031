//! Per-domain cache of anti-bot bypass cookies
//!
//! Any worker that completes a non-challenged fetch may refresh the cookie for
//! its domain; every fetch reads the cache before issuing a request. Reads far
//! outnumber writes, hence the read-write lock. Entries live as long as the
//! process; a stale cookie shows up as failing fetches, not as an expiry.

use crate::url::{cookie_domain, domain_matches};
use std::collections::HashMap;
use std::sync::RwLock;
use url::Url;

/// Name of the cookie that proves a passed challenge
pub const BYPASS_COOKIE: &str = "cf_clearance";

/// Shared domain -> bypass cookie value mapping
#[derive(Debug, Default)]
pub struct DomainCookieCache {
    cookies: RwLock<HashMap<String, String>>,
}

impl DomainCookieCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores the cookie for `domain`, replacing any previous value
    pub fn store(&self, domain: &str, value: &str) {
        let domain = domain.trim_start_matches("www.").to_lowercase();
        match self.cookies.write() {
            Ok(mut cookies) => {
                cookies.insert(domain, value.to_string());
            }
            Err(poisoned) => {
                poisoned.into_inner().insert(domain, value.to_string());
            }
        }
    }

    /// Stores the cookie under the domain of `url`
    pub fn store_for_url(&self, url: &Url, value: &str) {
        if let Some(domain) = cookie_domain(url) {
            tracing::debug!("Caching bypass cookie for {}", domain);
            self.store(&domain, value);
        }
    }

    /// Returns the cookie value exactly filed under `domain`
    pub fn get(&self, domain: &str) -> Option<String> {
        let cookies = match self.cookies.read() {
            Ok(cookies) => cookies,
            Err(poisoned) => poisoned.into_inner(),
        };
        cookies.get(domain).cloned()
    }

    /// Returns the cookie that applies to `url`, if any
    ///
    /// A cookie filed under `hltv.org` applies to `hltv.org` and all of its
    /// subdomains.
    pub fn lookup(&self, url: &Url) -> Option<String> {
        let host = url.host_str()?;
        let cookies = match self.cookies.read() {
            Ok(cookies) => cookies,
            Err(poisoned) => poisoned.into_inner(),
        };
        cookies
            .iter()
            .find(|(domain, _)| domain_matches(host, domain))
            .map(|(_, value)| value.clone())
    }

    /// Formats the `Cookie` header value for `url`, if a cookie applies
    pub fn header_for(&self, url: &Url) -> Option<String> {
        self.lookup(url)
            .map(|value| format!("{}={}", BYPASS_COOKIE, value))
    }

    pub fn len(&self) -> usize {
        match self.cookies.read() {
            Ok(cookies) => cookies.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
