//! Crawl targets and the sites they live on

use serde::Serialize;
use std::fmt;
use url::Url;

/// One of the two crawled news sites
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Site {
    Hltv,
    Cybersport,
}

impl Site {
    pub const ALL: [Site; 2] = [Site::Hltv, Site::Cybersport];

    /// Source label used in storage and statistics
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hltv => "hltv",
            Self::Cybersport => "cybersport",
        }
    }

    pub fn from_source(source: &str) -> Option<Self> {
        match source {
            "hltv" => Some(Self::Hltv),
            "cybersport" => Some(Self::Cybersport),
            _ => None,
        }
    }
}

impl fmt::Display for Site {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Base URLs the targets are resolved against
///
/// Production runs use the real sites; tests point both at a mock server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteEndpoints {
    pub hltv: String,
    pub cybersport: String,
}

impl SiteEndpoints {
    /// Both sites served from one base, e.g. a local mock server
    pub fn single(base: &str) -> Self {
        let base = base.trim_end_matches('/').to_string();
        Self {
            hltv: base.clone(),
            cybersport: base,
        }
    }

    pub fn base(&self, site: Site) -> &str {
        match site {
            Site::Hltv => &self.hltv,
            Site::Cybersport => &self.cybersport,
        }
    }
}

impl Default for SiteEndpoints {
    fn default() -> Self {
        Self {
            hltv: "https://www.hltv.org".to_string(),
            cybersport: "https://www.cybersport.ru".to_string(),
        }
    }
}

/// A single article to fetch
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CrawlTarget {
    /// `/news/{id}/{slug}`
    Hltv { id: u64, slug: String },

    /// `/tags/{tag}/{slug}`
    Cybersport { tag: String, slug: String },
}

impl CrawlTarget {
    pub fn hltv(id: u64, slug: impl Into<String>) -> Self {
        Self::Hltv {
            id,
            slug: slug.into(),
        }
    }

    pub fn cybersport(tag: impl Into<String>, slug: impl Into<String>) -> Self {
        Self::Cybersport {
            tag: tag.into(),
            slug: slug.into(),
        }
    }

    pub fn site(&self) -> Site {
        match self {
            Self::Hltv { .. } => Site::Hltv,
            Self::Cybersport { .. } => Site::Cybersport,
        }
    }

    /// Article URL on the real site
    pub fn url(&self) -> String {
        self.url_on(&SiteEndpoints::default())
    }

    /// Article URL relative to `endpoints`
    pub fn url_on(&self, endpoints: &SiteEndpoints) -> String {
        let base = endpoints.base(self.site()).trim_end_matches('/');
        match self {
            Self::Hltv { id, slug } => format!("{}/news/{}/{}", base, id, slug),
            Self::Cybersport { tag, slug } => format!("{}/tags/{}/{}", base, tag, slug),
        }
    }

    /// Identity used for deduplication and log lines
    pub fn identity_key(&self) -> String {
        match self {
            Self::Hltv { id, slug } => format!("{}/{}", id, slug),
            Self::Cybersport { tag, slug } => format!("{}/{}", tag, slug),
        }
    }

    /// File name stem in the raw cache (before sanitization)
    pub fn cache_key(&self) -> String {
        match self {
            Self::Hltv { id, .. } => id.to_string(),
            Self::Cybersport { tag, slug } => format!("{}__{}", tag, slug),
        }
    }

    /// Recovers a target from an article URL
    ///
    /// Only the path is inspected, so URLs served from a non-default base map
    /// back to the same target.
    pub fn from_url(url: &str) -> Option<Self> {
        let parsed = Url::parse(url).ok()?;
        let segments: Vec<&str> = parsed
            .path_segments()?
            .filter(|segment| !segment.is_empty())
            .collect();

        match segments.as_slice() {
            ["news", id, slug] => {
                let id = id.parse().ok()?;
                Some(Self::hltv(id, *slug))
            }
            ["tags", tag, rest @ ..] if !rest.is_empty() => {
                Some(Self::cybersport(*tag, rest.join("/")))
            }
            _ => None,
        }
    }
}

impl fmt::Display for CrawlTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.site(), self.identity_key())
    }
}
