use crate::{UrlError, UrlResult};
use url::Url;

/// Normalizes a URL into the identity key used by storage and resume logic
///
/// # Normalization Steps
///
/// 1. Parse the URL; reject if malformed (scheme and host case are folded by the parser)
/// 2. Reject anything other than http:// and https://
/// 3. Enforce HTTPS: convert http:// to https://
/// 4. Remove fragment (everything after #)
/// 5. Remove one trailing slash, except for the root path
///
/// The query string is kept as-is: the crawled sites never put tracking
/// parameters in article links, and two different queries are two documents.
///
/// # Examples
///
/// ```
/// use esports_corpus::url::normalize_url;
///
/// let url = normalize_url("http://www.hltv.org/news/123/some-slug/#comments").unwrap();
/// assert_eq!(url.as_str(), "https://www.hltv.org/news/123/some-slug");
/// ```
pub fn normalize_url(url_str: &str) -> UrlResult<Url> {
    // Step 1: Parse the URL
    let mut url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;

    // Step 2: Validate scheme
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    if url.host_str().is_none() {
        return Err(UrlError::MissingDomain);
    }

    // Step 3: Force the secure scheme
    if url.scheme() != "https" {
        url.set_scheme("https")
            .map_err(|_| UrlError::InvalidScheme("http".to_string()))?;
    }

    // Step 4: Remove fragment
    url.set_fragment(None);

    // Step 5: Drop a single trailing slash beyond the root
    let path = url.path();
    if path.len() > 1 && path.ends_with('/') {
        let trimmed = path[..path.len() - 1].to_string();
        url.set_path(&trimmed);
    }

    Ok(url)
}
