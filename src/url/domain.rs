use url::Url;

/// Extracts the domain from a URL
///
/// This function retrieves the host portion of a URL and converts it to lowercase.
/// If the URL has no host (which shouldn't happen for valid HTTP(S) URLs), it returns None.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use esports_corpus::url::extract_domain;
///
/// let url = Url::parse("https://www.HLTV.org/news/1/a").unwrap();
/// assert_eq!(extract_domain(&url), Some("www.hltv.org".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Returns the domain a bypass cookie is filed under
///
/// The `www.` prefix is dropped so that a cookie earned on `www.hltv.org` is
/// replayed for every URL on `hltv.org`, whichever strategy earned it.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use esports_corpus::url::cookie_domain;
///
/// let url = Url::parse("https://www.hltv.org/news/1/a").unwrap();
/// assert_eq!(cookie_domain(&url), Some("hltv.org".to_string()));
/// ```
pub fn cookie_domain(url: &Url) -> Option<String> {
    extract_domain(url).map(|host| match host.strip_prefix("www.") {
        Some(rest) => rest.to_string(),
        None => host,
    })
}

/// Checks whether `host` belongs to `domain` (equal, or a subdomain of it)
pub fn domain_matches(host: &str, domain: &str) -> bool {
    let host = host.to_lowercase();
    host == domain
        || host
            .strip_suffix(domain)
            .is_some_and(|prefix| prefix.ends_with('.'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_simple_domain() {
        let url = Url::parse("https://hltv.org/").unwrap();
        assert_eq!(extract_domain(&url), Some("hltv.org".to_string()));
    }

    #[test]
    fn test_extract_uppercase_converted_to_lowercase() {
        let url = Url::parse("https://CYBERSPORT.RU/").unwrap();
        assert_eq!(extract_domain(&url), Some("cybersport.ru".to_string()));
    }

    #[test]
    fn test_extract_with_port() {
        let url = Url::parse("https://hltv.org:8080/").unwrap();
        assert_eq!(extract_domain(&url), Some("hltv.org".to_string()));
    }

    #[test]
    fn test_cookie_domain_strips_www() {
        let url = Url::parse("https://www.cybersport.ru/tags/cs2/x").unwrap();
        assert_eq!(cookie_domain(&url), Some("cybersport.ru".to_string()));
    }

    #[test]
    fn test_cookie_domain_keeps_other_subdomains() {
        let url = Url::parse("https://static.hltv.org/img.png").unwrap();
        assert_eq!(cookie_domain(&url), Some("static.hltv.org".to_string()));
    }

    #[test]
    fn test_domain_matches() {
        assert!(domain_matches("hltv.org", "hltv.org"));
        assert!(domain_matches("www.hltv.org", "hltv.org"));
        assert!(domain_matches("WWW.HLTV.ORG", "hltv.org"));
        assert!(!domain_matches("nothltv.org", "hltv.org"));
        assert!(!domain_matches("hltv.org.evil.com", "hltv.org"));
    }
}
