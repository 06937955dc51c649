use std::sync::Arc;
use std::time::Duration;

use ctrld_sync::{
    ActionMode, ActionStatus, DefinitionCache, EngineConfig, PolicyApi, RetryPolicy, RuleBatch,
    Stage, SyncEngine,
};
use ctrld_sync_api::{ControlDClient, HttpDefinitionSource, RequestExecutor, http_client};
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TOKEN: &str = "test-token";

fn client_for(server: &MockServer) -> ControlDClient {
    let executor = RequestExecutor::new(http_client().unwrap(), RetryPolicy::immediate());
    ControlDClient::new(executor, TOKEN, Some(format!("{}/profiles", server.uri())))
}

fn json(body: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(body)
}

#[tokio::test]
async fn list_folders_reads_string_and_numeric_ids() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/profiles/p1/groups"))
        .and(header("Authorization", "Bearer test-token"))
        .respond_with(json(serde_json::json!({
            "body": {"groups": [
                {"group": "Ads", "PK": 101},
                {"group": "Trackers", "PK": "xyz"},
                {"group": "Orphan", "PK": null}
            ]}
        })))
        .mount(&server)
        .await;

    let folders = client_for(&server).list_folders("p1").await.unwrap();

    assert_eq!(folders.len(), 3);
    assert_eq!(folders[0].name, "Ads");
    assert_eq!(folders[0].id, "101");
    assert_eq!(folders[1].id, "xyz");
    assert_eq!(folders[2].id, "");
}

#[tokio::test]
async fn list_rules_hits_root_and_folder_paths() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/profiles/p1/rules"))
        .respond_with(json(serde_json::json!({
            "body": {"rules": [{"PK": "root.com"}]}
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/profiles/p1/rules/101"))
        .respond_with(json(serde_json::json!({
            "body": {"rules": [{"PK": "a.com"}, {"PK": ""}, {"PK": "b.com"}]}
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);

    assert_eq!(client.list_rules("p1", None).await.unwrap(), vec!["root.com"]);
    assert_eq!(
        client.list_rules("p1", Some("101")).await.unwrap(),
        vec!["a.com", "b.com"]
    );
}

#[tokio::test]
async fn delete_targets_folder_id() {
    let server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/profiles/p1/groups/101"))
        .and(header("Authorization", "Bearer test-token"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    client_for(&server).delete_folder("p1", "101").await.unwrap();
}

#[tokio::test]
async fn create_posts_form_fields() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/profiles/p1/groups"))
        .and(header("Content-Type", "application/x-www-form-urlencoded"))
        .and(body_string_contains("name=Native+Tracker"))
        .and(body_string_contains("do=1"))
        .and(body_string_contains("status=0"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    client_for(&server)
        .create_folder("p1", "Native Tracker", ActionMode::Allow, ActionStatus::Disabled)
        .await
        .unwrap();
}

#[tokio::test]
async fn push_posts_enumerated_hostnames() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/profiles/p1/rules"))
        .and(body_string_contains("group=101"))
        .and(body_string_contains("hostnames%5B0%5D=a.com"))
        .and(body_string_contains("hostnames%5B1%5D=b.com"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let batch = RuleBatch {
        folder_id: "101".into(),
        action_mode: ActionMode::Block,
        action_status: ActionStatus::Enabled,
        hostnames: vec!["a.com".into(), "b.com".into()],
    };

    client_for(&server).push_rules("p1", &batch).await.unwrap();
}

#[tokio::test]
async fn push_failure_surfaces_after_retries() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/profiles/p1/rules"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .expect(3)
        .mount(&server)
        .await;

    let batch = RuleBatch {
        folder_id: "101".into(),
        action_mode: ActionMode::Block,
        action_status: ActionStatus::Enabled,
        hostnames: vec!["a.com".into()],
    };

    let err = client_for(&server).push_rules("p1", &batch).await.unwrap_err();
    assert!(err.to_string().contains("boom"));
}

#[tokio::test]
async fn engine_syncs_a_profile_over_http() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/lists/ads.json"))
        .respond_with(json(serde_json::json!({
            "group": {"group": "Ads", "action": {"do": 0, "status": 1}},
            "rules": [{"PK": "a.com"}, {"PK": "root.com"}]
        })))
        .mount(&server)
        .await;

    // Before creation the profile holds an old "Ads" folder; afterwards the
    // listing shows the new one.
    Mock::given(method("GET"))
        .and(path("/profiles/p1/groups"))
        .respond_with(json(serde_json::json!({
            "body": {"groups": [{"group": "Ads", "PK": 1}]}
        })))
        .up_to_n_times(2)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/profiles/p1/groups"))
        .respond_with(json(serde_json::json!({
            "body": {"groups": [{"group": "Ads", "PK": 2}]}
        })))
        .mount(&server)
        .await;

    Mock::given(method("DELETE"))
        .and(path("/profiles/p1/groups/1"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/profiles/p1/rules"))
        .respond_with(json(serde_json::json!({"body": {"rules": [{"PK": "root.com"}]}})))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/profiles/p1/rules/1"))
        .respond_with(json(serde_json::json!({"body": {"rules": []}})))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/profiles/p1/groups"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/profiles/p1/rules"))
        .and(body_string_contains("group=2"))
        .and(body_string_contains("hostnames%5B0%5D=a.com"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let engine = SyncEngine::new(
        Arc::new(client_for(&server)),
        Arc::new(DefinitionCache::new(Arc::new(HttpDefinitionSource::new(
            http_client().unwrap(),
        )))),
        vec![format!("{}/lists/ads.json", server.uri())],
        EngineConfig {
            max_concurrent_profiles: 3,
            settle_delay: Duration::ZERO,
        },
    );

    let outcome = engine.sync_profile("p1").await;

    assert!(outcome.success);
    assert_eq!(outcome.stage, Stage::Done);
    assert_eq!(outcome.folders[0].rules_pushed, 1);
    assert_eq!(outcome.folders[0].duplicates_skipped, 1);
}
