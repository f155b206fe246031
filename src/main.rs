//! esports-corpus main entry point
//!
//! Command-line interface for collecting the HLTV and Cybersport news corpus.

use anyhow::{bail, Context};
use clap::Parser;
use esports_corpus::config::{
    compute_config_hash, load_config_or_default, validate, Config, SiteSelection, StrategyKind,
};
use esports_corpus::crawler::{
    import_raw_cache, reprocess_site, stale_targets, Coordinator, CrawlTarget, DatabaseSink,
    FileSink, PassSummary, Sink, Site, SiteEndpoints,
};
use esports_corpus::discovery::{
    discover_cybersport, discover_hltv, read_target_list, target_list_path, write_target_list,
    CybersportDiscoveryOptions, HltvDiscoveryOptions, SeenSet,
};
use esports_corpus::fetch::{FetchClient, FetchStrategy, Fetcher, TokioSleeper};
use esports_corpus::output::{
    load_store_summary, print_store_summary, write_statistics_file, BarProgress, CrawlStatistics,
    LogProgress, ProgressReporter,
};
use esports_corpus::storage::{open_store, DocumentStore, RawCache};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Collects news articles from HLTV and Cybersport
///
/// Discovers article targets, downloads them with a worker pool, and keeps
/// raw markup on disk and optionally in SQLite with change detection.
#[derive(Parser, Debug)]
#[command(name = "esports-corpus")]
#[command(version = "1.0.0")]
#[command(about = "Esports news corpus crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file (defaults apply when it is missing)
    #[arg(short, long, value_name = "CONFIG", default_value = "config.toml")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Fetch through a headless browser
    #[arg(long)]
    browser: bool,

    /// Show the browser window
    #[arg(long)]
    show: bool,

    /// Open devtools in the browser
    #[arg(long)]
    debug: bool,

    /// Workers per site
    #[arg(long)]
    workers: Option<usize>,

    /// hltv, cybersport or both
    #[arg(long)]
    site: Option<String>,

    /// Continue after the most recently stored document
    #[arg(long)]
    resume: bool,

    /// Only discover targets and write the target lists
    #[arg(long, conflicts_with = "download_only")]
    collect_only: bool,

    /// Skip discovery and download the saved target lists
    #[arg(long)]
    download_only: bool,

    /// Show statistics from the database and exit
    #[arg(long, conflicts_with_all = ["import", "reprocess"])]
    stats: bool,

    /// Add raw files already on disk to the database and exit
    #[arg(long, conflicts_with_all = ["stats", "reprocess"])]
    import: bool,

    /// Extract article text from stored documents and exit
    #[arg(long, conflicts_with_all = ["stats", "import"])]
    reprocess: bool,

    /// Show progress bars instead of progress log lines
    #[arg(long)]
    bar: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let mut config = load_config_or_default(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;
    if cli.config.exists() {
        let hash = compute_config_hash(&cli.config)?;
        tracing::info!(
            "Configuration loaded from {} (hash: {})",
            cli.config.display(),
            hash
        );
    }
    apply_overrides(&mut config, &cli);
    validate(&config).context("Invalid configuration after command-line overrides")?;

    let corpus_dir = PathBuf::from(&config.storage.corpus_dir);
    let cache = RawCache::new(&corpus_dir);
    cache
        .ensure_dirs()
        .with_context(|| format!("Failed to create corpus tree at {}", corpus_dir.display()))?;

    let store: Option<Arc<dyn DocumentStore>> = match &config.storage.database_path {
        Some(path) => {
            let store = open_store(Path::new(path))
                .with_context(|| format!("Failed to open database {}", path))?;
            tracing::info!("Database storage enabled: {}", path);
            Some(Arc::new(store) as Arc<dyn DocumentStore>)
        }
        None => None,
    };

    if cli.stats {
        let store = require_store(&store, "--stats")?;
        print_store_summary(&load_store_summary(store.as_ref())?);
        return Ok(());
    }

    if cli.import {
        let store = require_store(&store, "--import")?;
        handle_import(&config, &corpus_dir, &cache, store.as_ref());
        return Ok(());
    }

    if cli.reprocess {
        let store = require_store(&store, "--reprocess")?;
        for site in config.crawler.site.sites() {
            reprocess_site(store.as_ref(), &cache, site)?;
        }
        return Ok(());
    }

    handle_crawl(&config, &cli, &corpus_dir, cache, store).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("esports_corpus=info,warn"),
            1 => EnvFilter::new("esports_corpus=debug,info"),
            2 => EnvFilter::new("esports_corpus=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Command-line flags win over the config file
fn apply_overrides(config: &mut Config, cli: &Cli) {
    if cli.browser {
        config.fetch.strategy = StrategyKind::Browser;
    }
    if cli.show {
        config.fetch.show_browser = true;
    }
    if cli.debug {
        config.fetch.browser_debug = true;
    }
    if let Some(workers) = cli.workers {
        config.crawler.workers = workers;
    }
    if let Some(site) = &cli.site {
        config.crawler.site = SiteSelection::parse_lenient(site);
    }
    if cli.resume {
        config.crawler.resume = true;
    }
}

fn require_store<'a>(
    store: &'a Option<Arc<dyn DocumentStore>>,
    flag: &str,
) -> anyhow::Result<&'a Arc<dyn DocumentStore>> {
    match store {
        Some(store) => Ok(store),
        None => bail!("{} needs storage.database-path in the configuration", flag),
    }
}

/// Handles the --import mode: loads raw files listed in the target lists
fn handle_import(config: &Config, corpus_dir: &Path, cache: &RawCache, store: &dyn DocumentStore) {
    for site in config.crawler.site.sites() {
        let path = target_list_path(corpus_dir, site);
        match read_target_list(&path, site) {
            Ok(targets) => {
                let report = import_raw_cache(store, cache, &targets);
                println!(
                    "{}: {} added, {} already stored, {} without raw file",
                    site, report.added, report.skipped, report.missing
                );
            }
            Err(e) => tracing::warn!("No target list for {} at {}: {}", site, path.display(), e),
        }
    }
}

/// Handles the main crawl: discovery, download passes, re-crawl, statistics
async fn handle_crawl(
    config: &Config,
    cli: &Cli,
    corpus_dir: &Path,
    cache: RawCache,
    store: Option<Arc<dyn DocumentStore>>,
) -> anyhow::Result<()> {
    let endpoints = SiteEndpoints::default();
    let sites = config.crawler.site.sites();

    // Read before the browser starts; a missing list aborts the run
    let listed = if cli.download_only {
        Some(load_target_lists(corpus_dir, &sites)?)
    } else {
        None
    };

    let client = Arc::new(FetchClient::from_config(&config.fetch).await?);

    let targets = if let Some(listed) = listed {
        listed
    } else {
        let discovered = discover(config, &client, &endpoints, &sites).await;
        for (site, targets) in &discovered {
            write_target_list(&target_list_path(corpus_dir, *site), *site, targets)?;
        }
        discovered
    };

    if cli.collect_only {
        tracing::info!("Target lists written; skipping download");
        shutdown(client).await;
        return Ok(());
    }

    let resume_from = if config.crawler.resume {
        match &store {
            Some(store) => {
                let last = store.last_processed_url()?;
                match &last {
                    Some(url) => tracing::info!("Resuming after {}", url),
                    None => tracing::info!("Nothing stored yet; starting from the beginning"),
                }
                last
            }
            None => {
                tracing::warn!("Resume needs a database; starting from the beginning");
                None
            }
        }
    } else {
        None
    };

    let sink: Arc<dyn Sink> = match &store {
        Some(store) => Arc::new(DatabaseSink::new(cache.clone(), Arc::clone(store))),
        None => Arc::new(FileSink::new(cache.clone())),
    };
    let stats = Arc::new(CrawlStatistics::new());
    let fetcher: Arc<dyn Fetcher> = client.clone();
    let coordinator = Coordinator::new(fetcher, sink, Arc::clone(&stats))
        .with_endpoints(endpoints)
        .with_delay(Duration::from_millis(config.crawler.delay_ms));
    let workers = config.crawler.workers;

    let passes = targets.into_iter().map(|(site, targets)| {
        let coordinator = coordinator
            .clone()
            .with_progress(progress_for(site, targets.len(), cli.bar));
        let resume_from = resume_from.clone();
        async move {
            tracing::info!("Starting {} workers for {} ({} targets)", workers, site, targets.len());
            let summary = coordinator.run(targets, workers, resume_from.as_deref()).await;
            (site, summary)
        }
    });
    for (site, summary) in futures::future::join_all(passes).await {
        log_pass(site, &summary);
    }

    if config.crawler.recrawl_interval > 0 {
        if let Some(store) = &store {
            let max_age = Duration::from_secs(config.crawler.recrawl_interval);
            let stale: Vec<CrawlTarget> = stale_targets(store.as_ref(), max_age)?
                .into_iter()
                .filter(|target| config.crawler.site.includes(target.site()))
                .collect();
            if !stale.is_empty() {
                tracing::info!("Re-crawling {} stale documents", stale.len());
                let summary = coordinator
                    .clone()
                    .with_refetch(true)
                    .with_progress(Arc::new(LogProgress::new("recrawl", stale.len() as u64)))
                    .run(stale, workers, None)
                    .await;
                tracing::info!(
                    "Re-crawl: {} refreshed, {} failed, {} blocked",
                    summary.succeeded,
                    summary.failed,
                    summary.blocked
                );
            }
        }
    }

    let browser_mode = client.strategy() == FetchStrategy::Browser;
    let snapshot = stats.snapshot(corpus_dir, browser_mode);
    let path = write_statistics_file(&snapshot, corpus_dir)?;
    tracing::info!(
        "Download complete: {} articles ({} HLTV, {} Cybersport), {} bytes in {}. Statistics: {}",
        snapshot.total_articles,
        snapshot.hltv_articles,
        snapshot.cybersport_articles,
        snapshot.total_size_bytes,
        snapshot.download_time,
        path.display()
    );

    drop(coordinator);
    shutdown(client).await;
    Ok(())
}

/// Runs discovery for every selected site concurrently over one seen-set
async fn discover(
    config: &Config,
    client: &Arc<FetchClient>,
    endpoints: &SiteEndpoints,
    sites: &[Site],
) -> Vec<(Site, Vec<CrawlTarget>)> {
    let seen = SeenSet::new();
    let sleeper = TokioSleeper;
    let hltv_options = HltvDiscoveryOptions::from_config(&config.discovery, endpoints);
    let cybersport_options = CybersportDiscoveryOptions::from_config(&config.discovery, endpoints);

    let hltv = async {
        if sites.contains(&Site::Hltv) {
            discover_hltv(client.as_ref(), &sleeper, &hltv_options, &seen).await
        } else {
            Vec::new()
        }
    };
    let cybersport = async {
        if sites.contains(&Site::Cybersport) {
            let browser = client.browser().map(|browser| browser.as_ref());
            discover_cybersport(browser, &cybersport_options, &seen).await
        } else {
            Vec::new()
        }
    };
    let (mut hltv, mut cybersport) = tokio::join!(hltv, cybersport);

    sites
        .iter()
        .map(|site| match site {
            Site::Hltv => (*site, std::mem::take(&mut hltv)),
            Site::Cybersport => (*site, std::mem::take(&mut cybersport)),
        })
        .collect()
}

fn load_target_lists(
    corpus_dir: &Path,
    sites: &[Site],
) -> anyhow::Result<Vec<(Site, Vec<CrawlTarget>)>> {
    sites
        .iter()
        .map(|site| {
            let path = target_list_path(corpus_dir, *site);
            let targets = read_target_list(&path, *site)
                .with_context(|| format!("Failed to read target list {}", path.display()))?;
            tracing::info!("Loaded {} {} targets from {}", targets.len(), site, path.display());
            Ok((*site, targets))
        })
        .collect()
}

fn progress_for(site: Site, total: usize, bar: bool) -> Arc<dyn ProgressReporter> {
    if bar {
        Arc::new(BarProgress::new(site.as_str(), total as u64))
    } else {
        Arc::new(LogProgress::new(site.as_str(), total as u64).with_interval(100))
    }
}

fn log_pass(site: Site, summary: &PassSummary) {
    tracing::info!(
        "{}: {} stored, {} failed, {} blocked, {} skipped by resume",
        site,
        summary.succeeded,
        summary.failed,
        summary.blocked,
        summary.skipped
    );
}

async fn shutdown(client: Arc<FetchClient>) {
    match Arc::try_unwrap(client) {
        Ok(client) => client.shutdown().await,
        Err(_) => tracing::warn!("Fetch client still shared at shutdown"),
    }
}
