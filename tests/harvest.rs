//! End-to-end harvest scenarios against a mock catalog service.

use catalog_dl::{CatalogHarvester, Config, Error, Event, ItemId};
use std::collections::HashSet;
use std::time::Duration;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Config pointed at the mock server: `items` index/detail endpoints,
/// fast retries so tests stay quick.
fn test_config(server: &MockServer, max_attempts: u32) -> Config {
    let mut config = Config::for_base_url(server.uri());
    config.api.list_path = "items".to_string();
    config.api.detail_path = "items".to_string();
    config.retry.max_attempts = max_attempts;
    config.retry.initial_delay = Duration::from_millis(5);
    config.retry.max_delay = Duration::from_millis(20);
    config.retry.jitter = false;
    config
}

fn detail_body(id: u64) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "name": format!("item-{id}"),
        "height": id % 30 + 1,
        "weight": id * 10,
        "sprites": { "front_default": format!("https://img.test/{id}.png") },
        "types": [{ "slot": 1, "type": { "name": "normal" } }]
    })
}

fn index_body(server: &MockServer, count: u64, ids: std::ops::RangeInclusive<u64>) -> serde_json::Value {
    let results: Vec<serde_json::Value> = ids
        .map(|id| {
            serde_json::json!({
                "name": format!("item-{id}"),
                "url": format!("{}/items/{id}/", server.uri())
            })
        })
        .collect();
    serde_json::json!({ "count": count, "results": results })
}

async fn mount_index_page(
    server: &MockServer,
    offset: u64,
    count: u64,
    ids: std::ops::RangeInclusive<u64>,
) {
    Mock::given(method("GET"))
        .and(path("/items"))
        .and(query_param("offset", offset.to_string()))
        .respond_with(ResponseTemplate::new(200).set_body_json(index_body(server, count, ids)))
        .mount(server)
        .await;
}

async fn mount_detail(server: &MockServer, id: u64) {
    Mock::given(method("GET"))
        .and(path(format!("/items/{id}/")))
        .respond_with(ResponseTemplate::new(200).set_body_json(detail_body(id)))
        .mount(server)
        .await;
}

/// One 503 before the success mock takes over.
async fn mount_first_attempt_failure(server: &MockServer, id: u64) {
    Mock::given(method("GET"))
        .and(path(format!("/items/{id}/")))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn harvests_250_items_across_three_batches_recovering_flaky_items() {
    let server = MockServer::start().await;
    mount_index_page(&server, 0, 250, 1..=100).await;
    mount_index_page(&server, 100, 250, 101..=200).await;
    mount_index_page(&server, 200, 250, 201..=250).await;
    for id in 1..=250 {
        mount_detail(&server, id).await;
    }
    // Ids 7 and 150 fail on their first attempt only
    mount_first_attempt_failure(&server, 7).await;
    mount_first_attempt_failure(&server, 150).await;

    let harvester = CatalogHarvester::new(test_config(&server, 3)).unwrap();
    let results = harvester.results();
    assert!(results.is_loading());

    let summary = harvester.run().await.unwrap();

    assert_eq!(summary.total_items, 250);
    assert_eq!(summary.batches, 3);
    assert!(summary.dropped.is_empty());
    assert!(!results.is_loading());

    let snapshot = results.snapshot();
    assert_eq!(snapshot.len(), 250);
    let ids: HashSet<u64> = snapshot.iter().map(|r| r.id).collect();
    assert_eq!(ids.len(), 250, "every identifier appears exactly once");
    assert!(ids.contains(&7), "flaky item 7 must be recovered");
    assert!(ids.contains(&150), "flaky item 150 must be recovered");

    // Batch order is preserved: the first 100 records are batch 0's items
    let first_batch: HashSet<u64> = snapshot[..100].iter().map(|r| r.id).collect();
    assert_eq!(first_batch, (1..=100).collect::<HashSet<u64>>());
}

#[tokio::test]
async fn failed_index_page_aborts_after_completed_batches() {
    let server = MockServer::start().await;
    mount_index_page(&server, 0, 250, 1..=100).await;
    for id in 1..=100 {
        mount_detail(&server, id).await;
    }
    // Batch 1's index page fails on every attempt
    Mock::given(method("GET"))
        .and(path("/items"))
        .and(query_param("offset", "100"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let harvester = CatalogHarvester::new(test_config(&server, 2)).unwrap();
    let results = harvester.results();

    let err = harvester.run().await.unwrap_err();
    assert!(
        matches!(err, Error::TraversalAborted { batch: 1, .. }),
        "expected abort at batch 1, got: {err}"
    );
    assert_eq!(results.len(), 100, "batch 0's records survive the abort");
    assert!(!results.is_loading(), "abort must clear the loading flag");

    let requests = server.received_requests().await.unwrap();
    let offsets_requested: Vec<&wiremock::Request> = requests
        .iter()
        .filter(|r| r.url.path() == "/items")
        .collect();
    assert!(
        !offsets_requested
            .iter()
            .any(|r| r.url.query().is_some_and(|q| q.contains("offset=200"))),
        "no batch after the failed one may start"
    );
    let failed_page_attempts = offsets_requested
        .iter()
        .filter(|r| r.url.query().is_some_and(|q| q.contains("offset=100")))
        .count();
    assert_eq!(
        failed_page_attempts, 2,
        "index page gets exactly the configured attempt budget"
    );
}

#[tokio::test]
async fn item_recovered_by_the_second_resolution_pass() {
    let server = MockServer::start().await;
    mount_index_page(&server, 0, 6, 1..=6).await;
    for id in 1..=6 {
        mount_detail(&server, id).await;
    }
    // With a budget of 1 attempt, the single 503 consumes all of the first
    // pass; only the walker's retry pass can recover item 5.
    mount_first_attempt_failure(&server, 5).await;

    let harvester = CatalogHarvester::new(test_config(&server, 1)).unwrap();
    let summary = harvester.run().await.unwrap();

    assert_eq!(summary.resolved, 5);
    assert_eq!(summary.recovered, 1, "item 5 recovered on the second pass");
    assert!(summary.dropped.is_empty());
    assert!(harvester.results().contains(&ItemId::from(5)));
}

#[tokio::test]
async fn item_failing_both_passes_is_dropped_and_reported() {
    let server = MockServer::start().await;
    mount_index_page(&server, 0, 4, 1..=4).await;
    for id in 1..=3 {
        mount_detail(&server, id).await;
    }
    // Item 4 never succeeds
    Mock::given(method("GET"))
        .and(path("/items/4/"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let harvester = CatalogHarvester::new(test_config(&server, 2)).unwrap();
    let mut events = harvester.subscribe();
    let results = harvester.results();

    let summary = harvester.run().await.unwrap();

    assert_eq!(summary.dropped, vec![ItemId::from(4)]);
    assert_eq!(results.len(), 3);
    assert!(!results.contains(&ItemId::from(4)));
    assert!(!results.is_loading(), "a dropped item is not fatal");

    let mut saw_drop = false;
    let mut saw_completed = false;
    while let Ok(event) = events.try_recv() {
        match event {
            Event::ItemDropped { id, .. } => {
                assert_eq!(id, ItemId::from(4));
                saw_drop = true;
            }
            Event::Completed { total_resolved } => {
                assert_eq!(total_resolved, 3);
                saw_completed = true;
            }
            _ => {}
        }
    }
    assert!(saw_drop, "drop must be surfaced as an event");
    assert!(saw_completed);
}

#[tokio::test]
async fn empty_collection_finishes_without_resolving_anything() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/items"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "count": 0, "results": [] })),
        )
        .mount(&server)
        .await;

    let harvester = CatalogHarvester::new(test_config(&server, 3)).unwrap();
    let summary = harvester.run().await.unwrap();

    assert_eq!(summary.total_items, 0);
    assert_eq!(summary.batches, 0);
    assert!(harvester.results().is_empty());
    assert!(!harvester.results().is_loading());
}

#[tokio::test]
async fn max_items_caps_the_traversal() {
    let server = MockServer::start().await;
    // Service reports 250 items but the harvest is capped at 150
    mount_index_page(&server, 0, 250, 1..=100).await;
    mount_index_page(&server, 100, 250, 101..=200).await;
    for id in 1..=200 {
        mount_detail(&server, id).await;
    }

    let mut config = test_config(&server, 3);
    config.api.max_items = Some(150);
    let harvester = CatalogHarvester::new(config).unwrap();
    let summary = harvester.run().await.unwrap();

    assert_eq!(summary.total_items, 150);
    assert_eq!(summary.batches, 2);
    assert_eq!(harvester.results().len(), 150, "second page truncated to the cap");

    let requests = server.received_requests().await.unwrap();
    assert!(
        !requests
            .iter()
            .any(|r| r.url.query().is_some_and(|q| q.contains("offset=200"))),
        "no page past the cap is requested"
    );
}

#[tokio::test]
async fn events_narrate_a_successful_harvest() {
    let server = MockServer::start().await;
    mount_index_page(&server, 0, 3, 1..=3).await;
    for id in 1..=3 {
        mount_detail(&server, id).await;
    }

    let harvester = CatalogHarvester::new(test_config(&server, 3)).unwrap();
    let mut events = harvester.subscribe();
    harvester.run().await.unwrap();

    let mut kinds = Vec::new();
    while let Ok(event) = events.try_recv() {
        kinds.push(match event {
            Event::BatchStarted { .. } => "batch_started",
            Event::BatchCompleted { .. } => "batch_completed",
            Event::ItemDropped { .. } => "item_dropped",
            Event::Completed { .. } => "completed",
            Event::Aborted { .. } => "aborted",
        });
    }
    assert_eq!(kinds, vec!["batch_started", "batch_completed", "completed"]);
}
