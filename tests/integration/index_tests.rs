//! Index pagination against a mock search endpoint and group directory

use crate::common::{mount_search_page, test_fetcher};
use petrescue_scraper::crawler::{CachePolicy, Index};
use tempfile::TempDir;
use url::Url;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_partial_last_page_is_fetched() {
    let mock_server = MockServer::start().await;
    mount_search_page(&mock_server, 0, 125, &[1, 2]).await;
    mount_search_page(&mock_server, 60, 125, &[3]).await;
    mount_search_page(&mock_server, 120, 125, &[4]).await;

    let dir = TempDir::new().unwrap();
    let fetcher = test_fetcher(dir.path());
    let base = Url::parse(&mock_server.uri()).unwrap();
    let index = Index::new(&fetcher, base, 60, CachePolicy::Bypass);

    let ids = index.discover_animals(&["dogs".to_string()]).await.unwrap();

    let urls: Vec<String> = ids.iter().map(|found| found.identifier.to_string()).collect();
    assert_eq!(
        urls,
        [1, 2, 3, 4]
            .iter()
            .map(|id| format!("{}/listings/{}", mock_server.uri(), id))
            .collect::<Vec<_>>()
    );
}

#[tokio::test]
async fn test_exact_multiple_has_no_trailing_page() {
    let mock_server = MockServer::start().await;
    mount_search_page(&mock_server, 0, 120, &[1]).await;
    mount_search_page(&mock_server, 60, 120, &[2]).await;

    // Any request past the last page would fail the test on drop
    Mock::given(method("GET"))
        .and(path("/api/listings/search"))
        .and(query_param("skip", "120"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let fetcher = test_fetcher(dir.path());
    let base = Url::parse(&mock_server.uri()).unwrap();
    let index = Index::new(&fetcher, base, 60, CachePolicy::Bypass);

    let ids = index.discover_animals(&["dogs".to_string()]).await.unwrap();
    assert_eq!(ids.len(), 2);
}

#[tokio::test]
async fn test_search_query_carries_species_and_page_size() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/listings/search"))
        .and(query_param("q", "cat"))
        .and(query_param("per_page", "60"))
        .and(query_param("skip", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "Count": 1,
            "SearchResults": [{"Id": "77"}],
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let fetcher = test_fetcher(dir.path());
    let base = Url::parse(&mock_server.uri()).unwrap();
    let index = Index::new(&fetcher, base, 60, CachePolicy::Bypass);

    let ids = index.discover_animals(&["cats".to_string()]).await.unwrap();
    assert_eq!(ids.len(), 1);
    assert_eq!(ids[0].identifier.site_id(), Some(77));
    assert_eq!(ids[0].species, "cat");
}

#[tokio::test]
async fn test_listing_in_two_categories_keeps_first() {
    let mock_server = MockServer::start().await;
    for (species, ids) in [("dog", vec![1, 2]), ("cat", vec![2, 3])] {
        let results: Vec<_> = ids.iter().map(|id| serde_json::json!({ "Id": id })).collect();
        Mock::given(method("GET"))
            .and(path("/api/listings/search"))
            .and(query_param("q", species))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "Count": 2,
                "SearchResults": results,
            })))
            .expect(1)
            .mount(&mock_server)
            .await;
    }

    let dir = TempDir::new().unwrap();
    let fetcher = test_fetcher(dir.path());
    let base = Url::parse(&mock_server.uri()).unwrap();
    let index = Index::new(&fetcher, base, 60, CachePolicy::Bypass);

    let found = index
        .discover_animals(&["dogs".to_string(), "cats".to_string()])
        .await
        .unwrap();
    let tagged: Vec<(Option<u64>, &str)> = found
        .iter()
        .map(|f| (f.identifier.site_id(), f.species.as_str()))
        .collect();
    assert_eq!(tagged, vec![(Some(1), "dog"), (Some(2), "dog"), (Some(3), "cat")]);
}

fn directory_page(groups: &[u32], last_page: Option<u32>) -> String {
    let cards: String = groups
        .iter()
        .map(|id| {
            format!(
                r#"<article class="cards-groups-preview">
                     <a class="cards-groups-preview__content" href="/groups/{id}">Group {id}</a>
                   </article>"#
            )
        })
        .collect();
    let pagination = last_page
        .map(|n| format!(r#"<nav class="pagination"><a class="last" href="/groups?page={n}">Last</a></nav>"#))
        .unwrap_or_default();
    format!("<html><body>{cards}{pagination}</body></html>")
}

#[tokio::test]
async fn test_group_directory_walks_to_last_page_without_repeats() {
    let mock_server = MockServer::start().await;
    for (page, groups) in [(1, vec![1, 2]), (2, vec![2, 3]), (3, vec![4])] {
        Mock::given(method("GET"))
            .and(path("/groups"))
            .and(query_param("page", page.to_string().as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_string(directory_page(&groups, Some(3))))
            .expect(1)
            .mount(&mock_server)
            .await;
    }

    let dir = TempDir::new().unwrap();
    let fetcher = test_fetcher(dir.path());
    let base = Url::parse(&mock_server.uri()).unwrap();
    let index = Index::new(&fetcher, base, 60, CachePolicy::Bypass);

    let ids = index.discover_groups().await.unwrap();
    let site_ids: Vec<Option<u64>> = ids.iter().map(|id| id.site_id()).collect();
    assert_eq!(site_ids, vec![Some(1), Some(2), Some(3), Some(4)]);
}

#[tokio::test]
async fn test_group_directory_without_pagination_is_one_page() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/groups"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(directory_page(&[9], None)))
        .expect(1)
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let fetcher = test_fetcher(dir.path());
    let base = Url::parse(&mock_server.uri()).unwrap();
    let index = Index::new(&fetcher, base, 60, CachePolicy::Bypass);

    let ids = index.discover_groups().await.unwrap();
    assert_eq!(ids.len(), 1);
}
