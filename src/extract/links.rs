//! Link extraction from listing pages
//!
//! # Link Extraction Rules
//!
//! **Include:**
//! - `<a href="...">` tags anywhere in the document
//!
//! **Exclude:**
//! - `<a href="..." download>`
//! - `javascript:`, `mailto:`, `tel:` links
//! - Data URIs and fragment-only links
//! - Anything that does not resolve to http(s)

use scraper::{Html, Selector};
use url::Url;

/// Extracts every followable link, resolved against `base_url`
///
/// # Arguments
///
/// * `html` - The HTML content
/// * `base_url` - The base URL for resolving relative links
///
/// # Returns
///
/// Absolute URLs in document order; duplicates are kept
pub fn extract_links(html: &str, base_url: &Url) -> Vec<Url> {
    let document = Html::parse_document(html);
    let mut links = Vec::new();

    if let Ok(a_selector) = Selector::parse("a[href]") {
        for element in document.select(&a_selector) {
            if element.value().attr("download").is_some() {
                continue;
            }

            if let Some(href) = element.value().attr("href") {
                if let Some(absolute_url) = resolve_link(href, base_url) {
                    links.push(absolute_url);
                }
            }
        }
    }

    links
}

/// Resolves a link href to an absolute URL, or None if it should be skipped
fn resolve_link(href: &str, base_url: &Url) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    if href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("data:")
    {
        return None;
    }

    let absolute_url = base_url.join(href).ok()?;
    match absolute_url.scheme() {
        "http" | "https" => Some(absolute_url),
        _ => None,
    }
}

/// Non-empty path segments of a URL
pub fn path_segments(url: &Url) -> Vec<&str> {
    url.path_segments()
        .map(|segments| segments.filter(|s| !s.is_empty()).collect())
        .unwrap_or_default()
}
