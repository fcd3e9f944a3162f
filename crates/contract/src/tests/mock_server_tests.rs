use serde_json::json;

use super::*;
use crate::scenarios::{get_users_interaction, GET_USERS_DESCRIPTION, JSON_CONTENT_TYPE};

fn ephemeral(dir: &std::path::Path) -> ProviderConfig {
    ProviderConfig::default().with_port(0).with_pact_dir(dir)
}

fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .no_proxy()
        .build()
        .expect("http client")
}

fn get_users_body() -> Value {
    json!({
        "operationName": "GetUsers",
        "query": "query GetUsers { GetUser(filter: {firstName: \"Aleena\"}) { id firstName lastName email } }",
        "variables": {}
    })
}

#[test]
fn config_defaults_and_env_overrides() {
    let config = ProviderConfig::default();
    assert_eq!(config.port, 20002);
    assert_eq!(config.pact_dir, PathBuf::from("pacts"));
    assert_eq!(config.consumer, "GraphQLConsumer");
    assert_eq!(config.provider, "GraphQLProvider");
    assert_eq!(config.write_mode, WriteMode::Overwrite);

    let config = ProviderConfig::from_lookup(|key| match key {
        "PACT_MOCK_PORT" => Some("31000".into()),
        "PACT_DIR" => Some("target/pacts".into()),
        "PACT_WRITE_MODE" => Some("merge".into()),
        _ => None,
    });
    assert_eq!(config.port, 31000);
    assert_eq!(config.pact_dir, PathBuf::from("target/pacts"));
    assert_eq!(config.write_mode, WriteMode::Merge);

    let ignored = ProviderConfig::from_lookup(|key| {
        (key == "PACT_MOCK_PORT").then(|| "not-a-port".to_string())
    });
    assert_eq!(ignored.port, DEFAULT_PORT);
}

#[tokio::test]
async fn matching_request_gets_example_response() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut provider = MockProvider::start(ephemeral(dir.path()))
        .await
        .expect("start");
    provider.add_interaction(get_users_interaction().expect("interaction"));

    let url = provider.base_url().expect("url").join("graphql").expect("join");
    let response = client()
        .post(url)
        .json(&get_users_body())
        .send()
        .await
        .expect("request");

    assert_eq!(response.status(), 200);
    assert_eq!(
        response.headers()["content-type"].to_str().expect("header"),
        JSON_CONTENT_TYPE
    );
    let body: Value = response.json().await.expect("json");
    assert_eq!(body["data"]["items"][0]["user"]["id"], 123);

    provider.verify().expect("verified");
    assert_eq!(provider.verified().len(), 1);
    assert_eq!(provider.verified()[0].description, GET_USERS_DESCRIPTION);
    provider.shutdown().await;
}

#[tokio::test]
async fn mismatched_request_gets_500_and_fails_verification() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut provider = MockProvider::start(ephemeral(dir.path()))
        .await
        .expect("start");
    provider.add_interaction(get_users_interaction().expect("interaction"));

    let mut body = get_users_body();
    body["variables"] = json!({"first": 10});
    let url = provider.base_url().expect("url").join("graphql").expect("join");
    let response = client().post(url).json(&body).send().await.expect("request");

    assert_eq!(response.status(), 500);
    let report: Value = response.json().await.expect("json");
    assert_eq!(report["mismatches"][0]["interaction"], GET_USERS_DESCRIPTION);

    match provider.verify() {
        Err(ContractError::Unsatisfied {
            missing,
            unexpected,
        }) => {
            assert_eq!(missing, [GET_USERS_DESCRIPTION]);
            assert_eq!(unexpected, ["POST /graphql"]);
        }
        other => panic!("expected unsatisfied verification, got {other:?}"),
    }
    assert!(provider.verified().is_empty());
    provider.shutdown().await;
}

#[tokio::test]
async fn verify_clears_registered_interactions() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut provider = MockProvider::start(ephemeral(dir.path()))
        .await
        .expect("start");
    provider.add_interaction(get_users_interaction().expect("interaction"));

    assert!(provider.verify().is_err());
    // Nothing left to satisfy after a verification round.
    provider.verify().expect("empty round");
    provider.shutdown().await;
}

#[tokio::test]
async fn bind_failure_is_reported() {
    let dir = tempfile::tempdir().expect("tempdir");
    let occupied = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let port = occupied.local_addr().expect("addr").port();

    let err = MockProvider::start(ephemeral(dir.path()).with_port(port))
        .await
        .err()
        .expect("port in use");
    assert!(matches!(err, ContractError::Bind { port: p, .. } if p == port));
}
