//! Fetcher behaviour against a live mock server: cache policies and decoding

use crate::common::test_fetcher;
use petrescue_scraper::crawler::{CachePolicy, ContentFormat, ParsedValue};
use petrescue_scraper::ScrapeError;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_use_cache_serves_second_fetch_from_disk() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/listings/1"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<h1>Rex</h1>"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let fetcher = test_fetcher(dir.path());
    let url = format!("{}/listings/1", mock_server.uri());

    let first = fetcher.fetch_bytes(&url, CachePolicy::UseCache).await.unwrap();
    let second = fetcher.fetch_bytes(&url, CachePolicy::UseCache).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(fetcher.cache().get(&url).unwrap(), Some(b"<h1>Rex</h1>".to_vec()));
}

#[tokio::test]
async fn test_bypass_always_fetches_and_never_writes() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/listings/2"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<h1>Molly</h1>"))
        .expect(2)
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let fetcher = test_fetcher(dir.path());
    let url = format!("{}/listings/2", mock_server.uri());

    fetcher.fetch_bytes(&url, CachePolicy::Bypass).await.unwrap();
    fetcher.fetch_bytes(&url, CachePolicy::Bypass).await.unwrap();

    assert_eq!(fetcher.cache().get(&url).unwrap(), None);
}

#[tokio::test]
async fn test_refresh_overwrites_cached_body() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/listings/3"))
        .respond_with(ResponseTemplate::new(200).set_body_string("fresh"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let fetcher = test_fetcher(dir.path());
    let url = format!("{}/listings/3", mock_server.uri());
    fetcher.cache().put(&url, b"stale").unwrap();

    let body = fetcher.fetch_bytes(&url, CachePolicy::Refresh).await.unwrap();
    assert_eq!(body, b"fresh");
    assert_eq!(fetcher.cache().get(&url).unwrap(), Some(b"fresh".to_vec()));

    // Served from the refreshed entry, no second request
    let cached = fetcher.fetch_bytes(&url, CachePolicy::UseCache).await.unwrap();
    assert_eq!(cached, b"fresh");
}

#[tokio::test]
async fn test_json_decode_failure_is_a_parse_error() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/listings/search"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>not json</html>"))
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let fetcher = test_fetcher(dir.path());
    let url = format!("{}/api/listings/search", mock_server.uri());

    let err = fetcher
        .fetch(&url, CachePolicy::Bypass, ContentFormat::Json)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ScrapeError::Parse {
            format: ContentFormat::Json,
            ..
        }
    ));
}

#[tokio::test]
async fn test_markup_fetch_decodes_document() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/page"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<title>Hi</title>"))
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let fetcher = test_fetcher(dir.path());
    let url = format!("{}/page", mock_server.uri());

    let parsed = fetcher
        .fetch(&url, CachePolicy::Bypass, ContentFormat::Markup)
        .await
        .unwrap();
    assert!(matches!(parsed, ParsedValue::Markup(_)));
}

#[tokio::test]
async fn test_error_status_is_not_cached() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/listings/404"))
        .respond_with(ResponseTemplate::new(404))
        .expect(2)
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let fetcher = test_fetcher(dir.path());
    let url = format!("{}/listings/404", mock_server.uri());

    for _ in 0..2 {
        let err = fetcher.fetch_bytes(&url, CachePolicy::UseCache).await.unwrap_err();
        assert!(matches!(err, ScrapeError::HttpStatus { status: 404, .. }));
    }
    assert_eq!(fetcher.cache().get(&url).unwrap(), None);
}

#[tokio::test]
async fn test_undecodable_body_is_not_cached() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/listings/search"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .up_to_n_times(1)
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/listings/search"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"Count": 0}"#))
        .expect(1)
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let fetcher = test_fetcher(dir.path());
    let url = format!("{}/api/listings/search", mock_server.uri());

    let err = fetcher
        .fetch(&url, CachePolicy::UseCache, ContentFormat::Json)
        .await
        .unwrap_err();
    assert!(matches!(err, ScrapeError::Parse { .. }));
    assert_eq!(fetcher.cache().get(&url).unwrap(), None);

    // The server has recovered; the next fetch goes live and is cached
    let value = fetcher
        .fetch(&url, CachePolicy::UseCache, ContentFormat::Json)
        .await
        .unwrap()
        .into_json()
        .unwrap();
    assert_eq!(value["Count"], 0);
    assert_eq!(
        fetcher.cache().get(&url).unwrap(),
        Some(br#"{"Count": 0}"#.to_vec())
    );
}

#[tokio::test]
async fn test_refresh_keeps_old_entry_when_new_body_does_not_decode() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/listings/8"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0xff, 0xfe, 0x00]))
        .expect(1)
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let fetcher = test_fetcher(dir.path());
    let url = format!("{}/listings/8", mock_server.uri());
    fetcher.cache().put(&url, b"<h1>Old</h1>").unwrap();

    let err = fetcher.fetch_markup(&url, CachePolicy::Refresh).await.unwrap_err();
    assert!(matches!(
        err,
        ScrapeError::Parse {
            format: ContentFormat::Markup,
            ..
        }
    ));
    assert_eq!(fetcher.cache().get(&url).unwrap(), Some(b"<h1>Old</h1>".to_vec()));
}
