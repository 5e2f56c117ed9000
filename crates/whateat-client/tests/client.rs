mod common;

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use whateat_client::auth::StoredCredentialProvider;
use whateat_client::{AppleCredential, AuthState, ClientConfig, WhatEatClient};
use whateat_store::{MemorySecretStore, SecretSlot, SecretStoreExt};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config(server: &MockServer) -> ClientConfig {
    ClientConfig {
        api_base_url: format!("{}/api/v1", server.uri()),
        request_timeout: Duration::from_secs(5),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_sign_out_resets_user_stores() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/auth/signin"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "accessToken": "a1",
            "refreshToken": "r1",
            "expiresIn": 3600
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/recipe-saves"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "recipe_saves": [common::saved_json("s1", "r1", None)]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/daily/suggestions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "suggestions": {"dinner": [{"id": "d1", "recipe_data": {"id": "r2", "title": "Stew"}}]}
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/auth/signout"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
        .mount(&server)
        .await;

    let secrets = Arc::new(MemorySecretStore::new());
    let client = WhatEatClient::with_parts(
        config(&server),
        secrets.clone(),
        Arc::new(StoredCredentialProvider),
    )
    .unwrap();

    client
        .auth
        .sign_in(AppleCredential {
            user_identifier: "apple-user".into(),
            identity_token: Some("jwt".into()),
            ..Default::default()
        })
        .await
        .unwrap();
    client.saved.load_saved_recipes_if_needed().await.unwrap();
    client.home.load_daily_suggestions_if_needed().await.unwrap();
    assert!(client.saved.is_saved("r1"));
    assert!(client.home.snapshot().has_loaded);

    let mut saved_changes = client.saved.subscribe();
    client.auth.sign_out().await.unwrap();
    assert_eq!(client.auth.state(), AuthState::SignedOut);
    assert_eq!(secrets.get_string(SecretSlot::AccessToken).unwrap(), None);

    tokio::time::timeout(
        Duration::from_secs(2),
        saved_changes.wait_for(|s| s.saved_recipes.is_empty()),
    )
    .await
    .expect("saved store was not reset")
    .unwrap();
    assert!(!client.saved.snapshot().has_loaded);

    let mut home_changes = client.home.subscribe();
    tokio::time::timeout(Duration::from_secs(2), home_changes.wait_for(|h| !h.has_loaded))
        .await
        .expect("home store was not reset")
        .unwrap();
    assert!(client.home.snapshot().suggestions_by_meal.is_empty());
}

#[tokio::test]
async fn test_open_uses_durable_store_in_data_dir() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let mut config = config(&server);
    config.data_dir = Some(dir.path().join("whateat"));

    let client = WhatEatClient::open(config.clone()).unwrap();
    assert_eq!(client.auth.check_existing_credentials().await, AuthState::SignedOut);
    drop(client);

    assert!(dir.path().join("whateat").join("whateat.db").exists());
    let reopened = WhatEatClient::open(config).unwrap();
    assert_eq!(reopened.auth.state(), AuthState::Checking);
}
