//! Shared fixtures for the integration tests

use petrescue_scraper::config::{Config, UserAgentConfig};
use petrescue_scraper::crawler::{build_http_client, CachePolicy};
use petrescue_scraper::{Cache, Fetcher};
use serde_json::json;
use std::path::Path;
use std::time::Duration;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Builds a fetcher whose cache lives under `dir`
pub fn test_fetcher(dir: &Path) -> Fetcher {
    let user_agent = UserAgentConfig {
        crawler_name: "TestBot".to_string(),
        crawler_version: "1.0.0".to_string(),
        contact_url: Some("https://example.com/contact".to_string()),
    };
    let client = build_http_client(&user_agent, Duration::from_secs(5))
        .expect("Failed to build HTTP client");
    Fetcher::new(client, Cache::new(dir.join("cache")))
}

/// Creates a test configuration pointing at the mock server
pub fn test_config(base_url: &str, dir: &Path) -> Config {
    let mut config = Config::default();
    config.site.base_url = base_url.to_string();
    config.site.per_page = 2;
    config.site.categories = vec!["dogs".to_string()];
    config.cache.directory = dir.join("cache").to_string_lossy().into_owned();
    config.cache.index_policy = CachePolicy::Bypass;
    config.cache.detail_policy = CachePolicy::Bypass;
    config.harvest.batch_size = 2;
    config.output.database_path = dir.join("data.sqlite").to_string_lossy().into_owned();
    config
}

/// Mounts one page of search results for `skip`
pub async fn mount_search_page(server: &MockServer, skip: u64, total: u64, ids: &[u64]) {
    let results: Vec<_> = ids.iter().map(|id| json!({ "Id": id })).collect();
    Mock::given(method("GET"))
        .and(path("/api/listings/search"))
        .and(query_param("skip", skip.to_string().as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Count": total,
            "SearchResults": results,
        })))
        .expect(1)
        .mount(server)
        .await;
}

/// An available listing with one gallery image and a rescue group link
pub fn listing_page(id: u64, name: &str) -> String {
    format!(
        r#"<html><body>
        <h1 class="pet-listing__content__name">{name}</h1>
        <h3 class="pet-listing__content__breed">Kelpie</h3>
        <dl class="pet-listing__content__features">
          <dt>Age</dt><dd>2 years</dd>
          <dt>Desexed</dt><dd>Yes</dd>
          <dt>Rescue group</dt><dd><a href="/groups/7">Paws Rescue</a></dd>
          <dt>Location</dt><dd>NSW</dd>
        </dl>
        <div class="pet-listing__gallery__thumbnails">
          <img src="/images/w_100/{id}-a.jpg">
        </div>
        </body></html>"#
    )
}

/// Mounts a listing detail page, expected to be fetched exactly once
pub async fn mount_listing(server: &MockServer, id: u64, name: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/listings/{}", id)))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing_page(id, name)))
        .expect(1)
        .mount(server)
        .await;
}
