use crate::crawler::Site;
use serde::Deserialize;

/// Default browser-like user agent for the HTTP strategy
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Main configuration structure
///
/// Every section is optional; missing keys take the defaults below.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub discovery: DiscoveryConfig,
}

/// Worker pool behavior
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Number of workers per site
    pub workers: usize,

    /// Politeness delay after every processed target (milliseconds)
    #[serde(rename = "delay-ms")]
    pub delay_ms: u64,

    /// Age in seconds after which a stored document is re-fetched; 0 disables
    #[serde(rename = "recrawl-interval")]
    pub recrawl_interval: u64,

    /// Resume from the most recently stored document
    pub resume: bool,

    /// Which sites to crawl
    pub site: SiteSelection,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            delay_ms: 500,
            recrawl_interval: 0,
            resume: false,
            site: SiteSelection::Both,
        }
    }
}

/// Which sites a run covers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SiteSelection {
    Hltv,
    Cybersport,
    #[default]
    Both,
}

impl SiteSelection {
    /// Returns true if `site` is part of this selection
    pub fn includes(&self, site: Site) -> bool {
        match self {
            Self::Both => true,
            Self::Hltv => site == Site::Hltv,
            Self::Cybersport => site == Site::Cybersport,
        }
    }

    /// Sites covered, in processing order
    pub fn sites(&self) -> Vec<Site> {
        Site::ALL
            .into_iter()
            .filter(|site| self.includes(*site))
            .collect()
    }

    /// Parses a CLI value; unknown values fall back to `Both`
    pub fn parse_lenient(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "hltv" => Self::Hltv,
            "cybersport" => Self::Cybersport,
            "both" => Self::Both,
            other => {
                tracing::warn!("Invalid site '{}', defaulting to 'both'", other);
                Self::Both
            }
        }
    }
}

/// Fetch strategy requested by configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    #[default]
    Http,
    Browser,
}

/// Fetch layer configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Direct HTTP or headless browser
    pub strategy: StrategyKind,

    /// Show the browser window (browser strategy only)
    #[serde(rename = "show-browser")]
    pub show_browser: bool,

    /// Open devtools in the browser (browser strategy only)
    #[serde(rename = "browser-debug")]
    pub browser_debug: bool,

    /// Profile directory kept between runs so earned cookies survive restarts
    #[serde(rename = "browser-data-dir")]
    pub browser_data_dir: Option<String>,

    /// Chrome executable; auto-detected when absent
    #[serde(rename = "chrome-path")]
    pub chrome_path: Option<String>,

    /// Maximum attempts per URL for the HTTP strategy
    #[serde(rename = "max-attempts")]
    pub max_attempts: u32,

    /// Per-request timeout (seconds)
    #[serde(rename = "request-timeout-secs")]
    pub request_timeout_secs: u64,

    /// Per-navigation timeout for the browser strategy (seconds)
    #[serde(rename = "navigation-timeout-secs")]
    pub navigation_timeout_secs: u64,

    /// User agent sent by the HTTP strategy
    #[serde(rename = "user-agent")]
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            strategy: StrategyKind::Http,
            show_browser: false,
            browser_debug: false,
            browser_data_dir: Some("browser_data".to_string()),
            chrome_path: None,
            max_attempts: 6,
            request_timeout_secs: 30,
            navigation_timeout_secs: 60,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

/// Output locations
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Root of the raw/parsed file tree, target lists and statistics
    #[serde(rename = "corpus-dir")]
    pub corpus_dir: String,

    /// SQLite database; when absent the crawl only writes the file cache
    #[serde(rename = "database-path")]
    pub database_path: Option<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            corpus_dir: "corpus".to_string(),
            database_path: None,
        }
    }
}

/// Target discovery configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// First year of the HLTV news archive to walk
    #[serde(rename = "hltv-first-year")]
    pub hltv_first_year: i32,

    /// Cybersport tags whose listings are paged through
    #[serde(rename = "cybersport-tags")]
    pub cybersport_tags: Vec<String>,

    /// Consecutive rounds without new targets before a listing is abandoned
    #[serde(rename = "max-idle-rounds")]
    pub max_idle_rounds: u32,

    /// Hard cap on targets collected per tag
    #[serde(rename = "max-targets-per-tag")]
    pub max_targets_per_tag: usize,

    /// Delay after each archive page (milliseconds)
    #[serde(rename = "archive-delay-ms")]
    pub archive_delay_ms: u64,

    /// Cool-down after three consecutive archive failures (seconds)
    #[serde(rename = "error-cooldown-secs")]
    pub error_cooldown_secs: u64,

    /// Archive pages fetched concurrently
    pub workers: usize,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            hltv_first_year: 2006,
            cybersport_tags: vec!["cs2".to_string()],
            max_idle_rounds: 6,
            max_targets_per_tag: 20_000,
            archive_delay_ms: 1500,
            error_cooldown_secs: 300,
            workers: 1,
        }
    }
}
