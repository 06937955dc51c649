use std::sync::Arc;

use ctrld_sync::{ActionMode, ActionStatus, DefinitionCache, DefinitionSource, FetchError};
use ctrld_sync_api::{HttpDefinitionSource, http_client};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const DOCUMENT: &str = r#"{
  "group": {"group": "Native Tracker - Apple", "action": {"do": 0, "status": 1}},
  "rules": [{"PK": "metrics.apple.com"}, {"PK": "xp.apple.com"}]
}"#;

fn source() -> HttpDefinitionSource {
    HttpDefinitionSource::new(http_client().unwrap())
}

#[tokio::test]
async fn fetch_parses_published_document() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/lists/apple.json"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(DOCUMENT, "application/json"))
        .mount(&server)
        .await;

    let def = source()
        .fetch(&format!("{}/lists/apple.json", server.uri()))
        .await
        .unwrap();

    assert_eq!(def.name, "Native Tracker - Apple");
    assert_eq!(def.action_mode, ActionMode::Block);
    assert_eq!(def.action_status, ActionStatus::Enabled);
    assert_eq!(def.hostnames, vec!["metrics.apple.com", "xp.apple.com"]);
}

#[tokio::test]
async fn fetch_does_not_retry_failures() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/lists/missing.json"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let result = source()
        .fetch(&format!("{}/lists/missing.json", server.uri()))
        .await;

    assert!(matches!(result, Err(FetchError::Status(500))));
}

#[tokio::test]
async fn fetch_rejects_non_200_success() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/lists/accepted.json"))
        .respond_with(ResponseTemplate::new(202).set_body_raw(DOCUMENT, "application/json"))
        .mount(&server)
        .await;

    let result = source()
        .fetch(&format!("{}/lists/accepted.json", server.uri()))
        .await;

    assert!(matches!(result, Err(FetchError::Status(202))));
}

#[tokio::test]
async fn fetch_reports_empty_body() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/lists/empty.json"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let result = source()
        .fetch(&format!("{}/lists/empty.json", server.uri()))
        .await;

    assert!(matches!(result, Err(FetchError::Empty)));
}

#[tokio::test]
async fn cached_source_fetches_each_url_once() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/lists/apple.json"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(DOCUMENT, "application/json"))
        .expect(1)
        .mount(&server)
        .await;

    let cache = DefinitionCache::new(Arc::new(source()));
    let url = format!("{}/lists/apple.json", server.uri());

    let first = cache.get(&url).await.unwrap();
    let second = cache.get(&url).await.unwrap();

    assert_eq!(first, second);
}
