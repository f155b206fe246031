//! Integration tests for the HTTP fetch strategy
//!
//! A wiremock server stands in for the news sites; a recording sleeper
//! replaces real backoff waits.

use esports_corpus::config::FetchConfig;
use esports_corpus::fetch::{
    build_http_client, BackoffPolicy, DomainCookieCache, FetchError, Fetcher, HttpFetcher,
    RecordingSleeper, RetryPolicy,
};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ARTICLE: &str = "<html><body><h1>Title</h1><p>Body text long enough.</p></body></html>";

fn create_fetcher(sleeper: Arc<RecordingSleeper>) -> HttpFetcher {
    let config = FetchConfig {
        request_timeout_secs: 5,
        ..FetchConfig::default()
    };
    let client = build_http_client(&config).expect("Failed to build client");
    HttpFetcher::new(
        client,
        Arc::new(DomainCookieCache::new()),
        RetryPolicy::default(),
    )
    .with_sleeper(sleeper)
}

#[tokio::test]
async fn test_rate_limit_then_success() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/news/1/a"))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(1)
        .with_priority(1)
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/news/1/a"))
        .respond_with(ResponseTemplate::new(200).set_body_string(ARTICLE))
        .expect(1)
        .mount(&mock_server)
        .await;

    let sleeper = Arc::new(RecordingSleeper::new());
    let fetcher = create_fetcher(Arc::clone(&sleeper));

    let body = fetcher
        .fetch(&format!("{}/news/1/a", mock_server.uri()))
        .await
        .expect("Fetch should succeed after one 429");
    assert_eq!(body, ARTICLE);

    let slept = sleeper.recorded();
    assert_eq!(slept.len(), 1);
    let curve = BackoffPolicy::rate_limited();
    assert!(slept[0] >= curve.ceiling(0));
    assert!(slept[0] <= curve.ceiling(0) + curve.max_jitter);
}

#[tokio::test]
async fn test_exhausts_after_max_attempts() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/news/2/down"))
        .respond_with(ResponseTemplate::new(503))
        .expect(6)
        .mount(&mock_server)
        .await;

    let sleeper = Arc::new(RecordingSleeper::new());
    let fetcher = create_fetcher(Arc::clone(&sleeper));

    let result = fetcher
        .fetch(&format!("{}/news/2/down", mock_server.uri()))
        .await;

    match result {
        Err(FetchError::Exhausted {
            attempts,
            last_error,
            ..
        }) => {
            assert_eq!(attempts, 6);
            assert_eq!(last_error, "HTTP 503");
        }
        other => panic!("expected exhaustion, got {:?}", other),
    }

    // One wait between each pair of attempts
    let slept = sleeper.recorded();
    assert_eq!(slept.len(), 5);
    assert!(slept.iter().all(|d| *d <= BackoffPolicy::transient().max_delay()));
}

#[tokio::test]
async fn test_bypass_cookie_is_replayed() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/news/3/first"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("set-cookie", "cf_clearance=abc123; Path=/")
                .set_body_string(ARTICLE),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/news/4/second"))
        .and(header("cookie", "cf_clearance=abc123"))
        .respond_with(ResponseTemplate::new(200).set_body_string(ARTICLE))
        .expect(1)
        .mount(&mock_server)
        .await;

    let sleeper = Arc::new(RecordingSleeper::new());
    let fetcher = create_fetcher(Arc::clone(&sleeper));

    fetcher
        .fetch(&format!("{}/news/3/first", mock_server.uri()))
        .await
        .expect("First fetch should succeed");
    assert_eq!(fetcher.cookies().len(), 1);

    fetcher
        .fetch(&format!("{}/news/4/second", mock_server.uri()))
        .await
        .expect("Second fetch should carry the cookie");
    assert!(sleeper.recorded().is_empty());
}

#[tokio::test]
async fn test_challenge_page_cookie_is_not_kept() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/news/5/challenge"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("set-cookie", "cf_clearance=pending; Path=/")
                .set_body_string(
                    "<html><body><form id=\"challenge-form\"></form></body></html>",
                ),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let fetcher = create_fetcher(Arc::new(RecordingSleeper::new()));

    // The challenge page itself is returned; judging it is the caller's job
    let body = fetcher
        .fetch(&format!("{}/news/5/challenge", mock_server.uri()))
        .await
        .expect("Fetch should return the served page");
    assert!(body.contains("challenge-form"));
    assert!(fetcher.cookies().is_empty());
}

#[tokio::test]
async fn test_invalid_url_is_rejected_without_request() {
    let fetcher = create_fetcher(Arc::new(RecordingSleeper::new()));
    let result = fetcher.fetch("not a url").await;
    assert!(matches!(result, Err(FetchError::InvalidUrl { .. })));
}

#[test]
fn test_backoff_curves() {
    assert_eq!(BackoffPolicy::rate_limited().ceiling(0), Duration::from_secs(2));
    assert_eq!(BackoffPolicy::transient().ceiling(10), Duration::from_secs(30));
}
