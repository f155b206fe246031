//! Integration tests for the crawler
//!
//! These tests use wiremock to stand in for the news sites and run full
//! coordinator passes end-to-end against the file cache and SQLite store.

use esports_corpus::config::FetchConfig;
use esports_corpus::crawler::{
    Coordinator, CrawlTarget, DatabaseSink, FileSink, Sink, SiteEndpoints,
};
use esports_corpus::discovery::{dedup_targets, SeenSet};
use esports_corpus::fetch::{
    build_http_client, DomainCookieCache, Fetcher, HttpFetcher, RecordingSleeper, RetryPolicy,
};
use esports_corpus::output::CrawlStatistics;
use esports_corpus::storage::{DocumentStore, RawCache, SqliteStore};
use esports_corpus::normalize_url;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn article(title: &str) -> String {
    format!(
        "<html><head><title>{}</title></head><body><h1>{}</h1>\
         <div class=\"news-content\"><p>Article body for {} with enough text.</p></div>\
         </body></html>",
        title, title, title
    )
}

fn create_fetcher() -> Arc<dyn Fetcher> {
    let config = FetchConfig {
        request_timeout_secs: 5,
        ..FetchConfig::default()
    };
    let client = build_http_client(&config).expect("Failed to build client");
    let fetcher = HttpFetcher::new(
        client,
        Arc::new(DomainCookieCache::new()),
        RetryPolicy::with_max_attempts(2),
    )
    .with_sleeper(Arc::new(RecordingSleeper::new()));
    Arc::new(fetcher)
}

fn create_coordinator(
    server: &MockServer,
    sink: Arc<dyn Sink>,
    stats: Arc<CrawlStatistics>,
) -> Coordinator {
    Coordinator::new(create_fetcher(), sink, stats)
        .with_endpoints(SiteEndpoints::single(&server.uri()))
}

async fn mount_article(server: &MockServer, target: &CrawlTarget, body: String, times: u64) {
    let url = target.url_on(&SiteEndpoints::single(&server.uri()));
    let route = url::Url::parse(&url)
        .expect("Failed to parse target URL")
        .path()
        .to_string();

    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .expect(times)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_every_target_fetched_exactly_once() {
    let mock_server = MockServer::start().await;
    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let cache = RawCache::new(temp_dir.path());
    cache.ensure_dirs().expect("Failed to create corpus tree");

    let mut targets: Vec<CrawlTarget> = (1..=6)
        .map(|id| CrawlTarget::hltv(id, format!("article-{}", id)))
        .collect();
    targets.push(CrawlTarget::cybersport("cs2", "navi-major"));
    targets.push(CrawlTarget::cybersport("cs2", "spirit-sign"));

    for target in &targets {
        mount_article(&mock_server, target, article(&target.identity_key()), 1).await;
    }

    let stats = Arc::new(CrawlStatistics::new());
    let coordinator = create_coordinator(
        &mock_server,
        Arc::new(FileSink::new(cache.clone())),
        Arc::clone(&stats),
    );

    let summary = coordinator.run(targets.clone(), 3, None).await;

    assert_eq!(summary.succeeded, 8);
    assert_eq!(summary.failed, 0);
    assert_eq!(summary.dequeued(), 8);
    assert_eq!(summary.per_worker.len(), 3);

    for target in &targets {
        let stored = cache
            .read(target)
            .expect("Failed to read cache")
            .expect("Target should be cached");
        assert!(stored.contains(&target.identity_key()));
    }

    let snapshot = stats.snapshot(temp_dir.path(), false);
    assert_eq!(snapshot.total_articles, 8);
    assert_eq!(snapshot.hltv_articles, 6);
    assert_eq!(snapshot.cybersport_articles, 2);
}

#[tokio::test]
async fn test_cached_targets_are_not_refetched() {
    let mock_server = MockServer::start().await;
    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let cache = RawCache::new(temp_dir.path());
    cache.ensure_dirs().expect("Failed to create corpus tree");

    let cached = CrawlTarget::hltv(10, "cached");
    let fresh = CrawlTarget::hltv(11, "fresh");
    cache
        .write(&cached, &article("cached"))
        .expect("Failed to seed cache");

    mount_article(&mock_server, &cached, article("cached"), 0).await;
    mount_article(&mock_server, &fresh, article("fresh"), 1).await;

    let coordinator = create_coordinator(
        &mock_server,
        Arc::new(FileSink::new(cache.clone())),
        Arc::new(CrawlStatistics::new()),
    );
    let summary = coordinator.run(vec![cached, fresh], 2, None).await;

    assert_eq!(summary.succeeded, 2);
}

#[tokio::test]
async fn test_blocked_page_is_not_stored() {
    let mock_server = MockServer::start().await;
    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let cache = RawCache::new(temp_dir.path());
    cache.ensure_dirs().expect("Failed to create corpus tree");
    let store = Arc::new(SqliteStore::new_in_memory().expect("Failed to open store"));

    let blocked = CrawlTarget::hltv(20, "blocked");
    let fine = CrawlTarget::hltv(21, "fine");
    mount_article(
        &mock_server,
        &blocked,
        "<html><body><h1>Verify you are human</h1></body></html>".to_string(),
        1,
    )
    .await;
    mount_article(&mock_server, &fine, article("fine"), 1).await;

    let sink = DatabaseSink::new(cache.clone(), store.clone());
    let coordinator = create_coordinator(
        &mock_server,
        Arc::new(sink),
        Arc::new(CrawlStatistics::new()),
    );
    let summary = coordinator
        .run(vec![blocked.clone(), fine.clone()], 2, None)
        .await;

    assert_eq!(summary.blocked, 1);
    assert_eq!(summary.succeeded, 1);

    assert!(cache.read(&blocked).expect("Failed to read cache").is_none());
    assert!(cache.blocked_path(&blocked).exists());

    let endpoints = SiteEndpoints::single(&mock_server.uri());
    let blocked_key = normalize_url(&blocked.url_on(&endpoints)).unwrap().to_string();
    let fine_key = normalize_url(&fine.url_on(&endpoints)).unwrap().to_string();
    assert!(!store.exists(&blocked_key).unwrap());
    assert!(store.exists(&fine_key).unwrap());
}

#[tokio::test]
async fn test_resume_skips_targets_before_last_stored() {
    let mock_server = MockServer::start().await;
    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let cache = RawCache::new(temp_dir.path());
    cache.ensure_dirs().expect("Failed to create corpus tree");
    let store = Arc::new(SqliteStore::new_in_memory().expect("Failed to open store"));
    let endpoints = SiteEndpoints::single(&mock_server.uri());

    let targets: Vec<CrawlTarget> = (30..35)
        .map(|id| CrawlTarget::hltv(id, format!("story-{}", id)))
        .collect();

    // A previous run stopped after storing target 32
    let last = normalize_url(&targets[2].url_on(&endpoints))
        .unwrap()
        .to_string();
    store
        .save(&last, &article("old"), "hltv")
        .expect("Failed to seed store");
    let resume_from = store.last_processed_url().unwrap();
    assert_eq!(resume_from.as_deref(), Some(last.as_str()));

    for (index, target) in targets.iter().enumerate() {
        let expected = if index < 2 { 0 } else { 1 };
        mount_article(&mock_server, target, article(&target.identity_key()), expected).await;
    }

    let coordinator = create_coordinator(
        &mock_server,
        Arc::new(DatabaseSink::new(cache, store.clone())),
        Arc::new(CrawlStatistics::new()),
    );
    let summary = coordinator
        .run(targets, 2, resume_from.as_deref())
        .await;

    assert_eq!(summary.skipped, 2);
    assert_eq!(summary.succeeded, 3);
    assert_eq!(store.count_by_source().unwrap().get("hltv"), Some(&3));
}

#[tokio::test]
async fn test_duplicate_discoveries_fetched_once() {
    let mock_server = MockServer::start().await;
    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let cache = RawCache::new(temp_dir.path());
    cache.ensure_dirs().expect("Failed to create corpus tree");

    let a = CrawlTarget::hltv(1, "a");
    let b = CrawlTarget::hltv(2, "b");
    mount_article(&mock_server, &a, article("a"), 1).await;
    mount_article(&mock_server, &b, article("b"), 1).await;

    let seen = SeenSet::new();
    let targets = dedup_targets(vec![a.clone(), a, b], &seen);
    assert_eq!(targets.len(), 2);

    let coordinator = create_coordinator(
        &mock_server,
        Arc::new(FileSink::new(cache)),
        Arc::new(CrawlStatistics::new()),
    );
    let summary = coordinator.run(targets, 4, None).await;

    assert_eq!(summary.succeeded, 2);
    assert_eq!(summary.dequeued(), 2);
}

#[tokio::test]
async fn test_unchanged_page_is_touched_on_refetch() {
    let mock_server = MockServer::start().await;
    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let cache = RawCache::new(temp_dir.path());
    cache.ensure_dirs().expect("Failed to create corpus tree");
    let store = Arc::new(SqliteStore::new_in_memory().expect("Failed to open store"));
    let endpoints = SiteEndpoints::single(&mock_server.uri());

    let target = CrawlTarget::hltv(40, "same");
    let key = normalize_url(&target.url_on(&endpoints)).unwrap().to_string();
    store
        .save_at(&key, &article("same"), "hltv", 1_000)
        .expect("Failed to seed store");

    mount_article(&mock_server, &target, article("same"), 1).await;

    let coordinator = create_coordinator(
        &mock_server,
        Arc::new(DatabaseSink::new(cache, store.clone())),
        Arc::new(CrawlStatistics::new()),
    )
    .with_refetch(true);
    let summary = coordinator.run(vec![target], 1, None).await;
    assert_eq!(summary.succeeded, 1);

    let document = store.get(&key).unwrap().expect("Document should exist");
    assert_eq!(document.crawl_time, 1_000);
    assert!(document.last_checked > 1_000);
}

#[tokio::test]
async fn test_cache_hit_keeps_document_due_for_recrawl() {
    let mock_server = MockServer::start().await;
    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let cache = RawCache::new(temp_dir.path());
    cache.ensure_dirs().expect("Failed to create corpus tree");
    let store = Arc::new(SqliteStore::new_in_memory().expect("Failed to open store"));
    let endpoints = SiteEndpoints::single(&mock_server.uri());

    let target = CrawlTarget::hltv(45, "aging");
    let key = normalize_url(&target.url_on(&endpoints)).unwrap().to_string();
    cache
        .write(&target, "<p>old</p>")
        .expect("Failed to seed cache");
    store
        .save_at(&key, "<p>old</p>", "hltv", 1_000)
        .expect("Failed to seed store");

    mount_article(&mock_server, &target, article("aging"), 0).await;

    let max_age = Duration::from_secs(3600);
    assert_eq!(store.stale_documents(max_age).unwrap().len(), 1);

    let coordinator = create_coordinator(
        &mock_server,
        Arc::new(DatabaseSink::new(cache, store.clone())),
        Arc::new(CrawlStatistics::new()),
    );
    let summary = coordinator.run(vec![target], 1, None).await;
    assert_eq!(summary.succeeded, 1);

    let document = store.get(&key).unwrap().expect("Document should exist");
    assert_eq!(document.last_checked, 1_000);
    let stale = store.stale_documents(max_age).unwrap();
    assert_eq!(stale.len(), 1);
    assert_eq!(stale[0].url, key);
}

#[tokio::test]
async fn test_unreachable_target_counts_as_failed() {
    let mock_server = MockServer::start().await;
    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let cache = RawCache::new(temp_dir.path());
    cache.ensure_dirs().expect("Failed to create corpus tree");

    let missing = CrawlTarget::hltv(50, "gone");
    Mock::given(method("GET"))
        .and(path("/news/50/gone"))
        .respond_with(ResponseTemplate::new(404))
        .expect(2)
        .mount(&mock_server)
        .await;

    let coordinator = create_coordinator(
        &mock_server,
        Arc::new(FileSink::new(cache.clone())),
        Arc::new(CrawlStatistics::new()),
    );
    let summary = coordinator.run(vec![missing.clone()], 1, None).await;

    assert_eq!(summary.failed, 1);
    assert!(cache.read(&missing).unwrap().is_none());
}
