//! End-to-end harvest runs: persistence, idempotence and batch abort

use crate::common::{listing_page, mount_listing, mount_search_page, test_config};
use petrescue_scraper::crawler::{Coordinator, HarvestScope};
use petrescue_scraper::storage::{Storage, Table};
use petrescue_scraper::ScrapeError;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mount_group_directory(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/groups"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<html><body>
                 <article class="cards-groups-preview">
                   <a class="cards-groups-preview__content" href="/groups/7">Paws Rescue</a>
                 </article>
               </body></html>"#,
        ))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/groups/7"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<html><body>
                 <h1 class="group-header__name">Paws Rescue</h1>
                 <p class="group-header__states">Active in: NSW, ACT</p>
               </body></html>"#,
        ))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_full_harvest_then_rerun_adds_nothing() {
    let mock_server = MockServer::start().await;
    mount_search_page(&mock_server, 0, 3, &[1, 2]).await;
    mount_search_page(&mock_server, 2, 3, &[3]).await;
    mount_listing(&mock_server, 1, "Rex").await;
    mount_listing(&mock_server, 2, "Molly").await;
    mount_listing(&mock_server, 3, "Bella").await;
    mount_group_directory(&mock_server).await;

    let dir = TempDir::new().unwrap();
    let config = test_config(&mock_server.uri(), dir.path());

    let mut coordinator = Coordinator::new(config.clone()).expect("Failed to create coordinator");
    let report = coordinator.run(HarvestScope::All).await.expect("First run failed");

    let animals = report.table(Table::Animals).unwrap();
    assert_eq!((animals.existing, animals.new, animals.persisted), (0, 3, 3));
    assert_eq!(report.table(Table::Images).unwrap().persisted, 3);
    assert_eq!(report.table(Table::Groups).unwrap().persisted, 1);

    let storage = coordinator.storage();
    assert_eq!(storage.count_rows(Table::Animals).unwrap(), 3);
    assert_eq!(storage.count_rows(Table::Images).unwrap(), 3);
    assert_eq!(storage.count_rows(Table::Groups).unwrap(), 1);

    let (status, age, desexed, group_url): (String, String, String, String) = storage
        .connection()
        .query_row(
            "SELECT status, age, desexed, group_url FROM animals WHERE site_id = 1",
            [],
            |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?)),
        )
        .unwrap();
    assert_eq!(status, "available");
    assert_eq!(age, "2 years");
    assert_eq!(desexed, "true");
    assert_eq!(group_url, format!("{}/groups/7", mock_server.uri()));

    // The listing has no Species row, so the search category fills it in
    let species: String = storage
        .connection()
        .query_row("SELECT species FROM animals WHERE site_id = 2", [], |r| r.get(0))
        .unwrap();
    assert_eq!(species, "dog");

    let image: String = storage
        .connection()
        .query_row(
            "SELECT url FROM images WHERE animal_url LIKE '%/listings/1'",
            [],
            |r| r.get(0),
        )
        .unwrap();
    assert!(image.contains("/w_638/"));
    drop(coordinator);
    mock_server.verify().await;

    // Second run: index pages only, so any detail fetch would hit a 404
    mock_server.reset().await;
    mount_search_page(&mock_server, 0, 3, &[1, 2]).await;
    mount_search_page(&mock_server, 2, 3, &[3]).await;
    mount_group_directory_index_only(&mock_server).await;

    let mut coordinator = Coordinator::new(config).expect("Failed to reopen coordinator");
    let report = coordinator.run(HarvestScope::All).await.expect("Second run failed");

    let animals = report.table(Table::Animals).unwrap();
    assert_eq!((animals.existing, animals.new, animals.persisted), (3, 0, 0));
    assert_eq!(report.table(Table::Groups).unwrap().new, 0);
    assert_eq!(coordinator.storage().count_rows(Table::Animals).unwrap(), 3);
}

async fn mount_group_directory_index_only(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/groups"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<article class="cards-groups-preview">
                 <a class="cards-groups-preview__content" href="/groups/7">Paws Rescue</a>
               </article>"#,
        ))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_failed_batch_is_not_persisted_and_run_resumes() {
    let mock_server = MockServer::start().await;
    mount_search_page(&mock_server, 0, 3, &[1, 2]).await;
    mount_search_page(&mock_server, 2, 3, &[3]).await;
    mount_listing(&mock_server, 1, "Rex").await;
    mount_listing(&mock_server, 2, "Molly").await;
    Mock::given(method("GET"))
        .and(path("/listings/3"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = test_config(&mock_server.uri(), dir.path());

    let mut coordinator = Coordinator::new(config.clone()).expect("Failed to create coordinator");
    let err = coordinator.run(HarvestScope::AnimalsOnly).await.unwrap_err();
    assert!(matches!(err, ScrapeError::HttpStatus { status: 500, .. }));

    // The first batch (listings 1 and 2) survived; the second left nothing behind
    assert_eq!(coordinator.storage().count_rows(Table::Animals).unwrap(), 2);
    assert_eq!(coordinator.storage().count_rows(Table::Images).unwrap(), 2);
    drop(coordinator);
    mock_server.verify().await;

    mock_server.reset().await;
    mount_search_page(&mock_server, 0, 3, &[1, 2]).await;
    mount_search_page(&mock_server, 2, 3, &[3]).await;
    Mock::given(method("GET"))
        .and(path("/listings/3"))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing_page(3, "Bella")))
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut coordinator = Coordinator::new(config).expect("Failed to reopen coordinator");
    let report = coordinator.run(HarvestScope::AnimalsOnly).await.expect("Resumed run failed");

    let animals = report.table(Table::Animals).unwrap();
    assert_eq!((animals.existing, animals.new, animals.persisted), (2, 1, 1));
    assert!(report.table(Table::Groups).is_none());
    assert_eq!(coordinator.storage().count_rows(Table::Animals).unwrap(), 3);
}

#[tokio::test]
async fn test_adopted_listing_skips_available_fields() {
    let mock_server = MockServer::start().await;
    mount_search_page(&mock_server, 0, 1, &[5]).await;
    Mock::given(method("GET"))
        .and(path("/listings/5"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<html><body>
                 <div class="pet-listing__status">Adopted!</div>
                 <h1 class="pet-listing__content__name">Max</h1>
                 <dl class="pet-listing__content__features">
                   <dt>Age</dt><dd>4 years</dd>
                   <dt>Location</dt><dd>VIC</dd>
                 </dl>
               </body></html>"#,
        ))
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = test_config(&mock_server.uri(), dir.path());

    let mut coordinator = Coordinator::new(config).expect("Failed to create coordinator");
    coordinator.run(HarvestScope::AnimalsOnly).await.unwrap();

    let (status, age, state): (String, Option<String>, Option<String>) = coordinator
        .storage()
        .connection()
        .query_row("SELECT status, age, state FROM animals", [], |r| {
            Ok((r.get(0)?, r.get(1)?, r.get(2)?))
        })
        .unwrap();
    assert_eq!(status, "adopted");
    assert_eq!(age, None);
    assert_eq!(state.as_deref(), Some("VIC"));
    assert_eq!(coordinator.storage().count_rows(Table::Images).unwrap(), 0);
}
