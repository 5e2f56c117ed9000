mod common;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use futures::future::join_all;
use serde_json::json;
use whateat_client::auth::CredentialState;
use whateat_client::auth::IdentityProvider;
use whateat_client::{AppleCredential, AuthError, AuthManager, AuthState};
use whateat_store::{MemorySecretStore, SecretSlot, SecretStoreExt};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct FixedIdentity(CredentialState);

#[async_trait]
impl IdentityProvider for FixedIdentity {
    async fn credential_state(&self, _user_identifier: &str) -> anyhow::Result<CredentialState> {
        Ok(self.0)
    }
}

struct BrokenIdentity;

#[async_trait]
impl IdentityProvider for BrokenIdentity {
    async fn credential_state(&self, _user_identifier: &str) -> anyhow::Result<CredentialState> {
        anyhow::bail!("credential service unavailable")
    }
}

fn manager(
    server: &MockServer,
    secrets: Arc<MemorySecretStore>,
    identity: Arc<dyn IdentityProvider>,
) -> AuthManager {
    AuthManager::new(common::api(server), secrets, identity, 300)
}

fn stored_session(expires_at: i64) -> Arc<MemorySecretStore> {
    let secrets = Arc::new(MemorySecretStore::new());
    secrets
        .put_string(SecretSlot::AppleUserIdentifier, "apple-user")
        .unwrap();
    secrets.put_string(SecretSlot::AccessToken, "old-token").unwrap();
    secrets.put_string(SecretSlot::RefreshToken, "refresh-1").unwrap();
    secrets
        .put_string(SecretSlot::ExpiresAt, &expires_at.to_string())
        .unwrap();
    secrets
}

fn assert_all_slots_empty(secrets: &MemorySecretStore) {
    for slot in SecretSlot::ALL {
        assert_eq!(secrets.get_string(slot).unwrap(), None, "{:?}", slot);
    }
}

#[tokio::test]
async fn test_refresh_rejected_ends_session() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/auth/refresh"))
        .and(body_json(json!({"refreshToken": "refresh-1"})))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"error": "expired"})))
        .expect(1)
        .mount(&server)
        .await;

    let secrets = stored_session(Utc::now().timestamp() - 1);
    let auth = manager(&server, secrets.clone(), Arc::new(FixedIdentity(CredentialState::Authorized)));

    let err = auth.get_valid_access_token().await.unwrap_err();

    assert_eq!(err, AuthError::SessionExpired);
    assert_eq!(auth.state(), AuthState::SignedOut);
    assert_all_slots_empty(&secrets);
}

#[tokio::test]
async fn test_concurrent_callers_share_one_refresh() {
    let server = MockServer::start().await;
    let expires_at = Utc::now().timestamp() + 3600;
    Mock::given(method("POST"))
        .and(path("/api/v1/auth/refresh"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({
                    "accessToken": "new-token",
                    "refreshToken": "refresh-2",
                    "expiresIn": 3600,
                    "expiresAt": expires_at
                }))
                .set_delay(Duration::from_millis(200)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let secrets = stored_session(Utc::now().timestamp() + 60);
    let auth = manager(&server, secrets.clone(), Arc::new(FixedIdentity(CredentialState::Authorized)));

    let results = join_all((0..8).map(|_| {
        let auth = auth.clone();
        async move { auth.get_valid_access_token().await }
    }))
    .await;

    for result in results {
        assert_eq!(result.unwrap(), "new-token");
    }
    assert_eq!(
        secrets.get_string(SecretSlot::RefreshToken).unwrap().as_deref(),
        Some("refresh-2")
    );
    assert_eq!(
        secrets.get_string(SecretSlot::ExpiresAt).unwrap(),
        Some(expires_at.to_string())
    );

    // Fresh now: no further refresh.
    assert_eq!(auth.get_valid_access_token().await.unwrap(), "new-token");
}

#[tokio::test]
async fn test_concurrent_callers_share_refresh_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/auth/refresh"))
        .respond_with(
            ResponseTemplate::new(503)
                .set_body_json(json!({"error": "maintenance"}))
                .set_delay(Duration::from_millis(100)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let secrets = stored_session(Utc::now().timestamp() - 10);
    let auth = manager(&server, secrets.clone(), Arc::new(FixedIdentity(CredentialState::Authorized)));

    let results = join_all((0..4).map(|_| {
        let auth = auth.clone();
        async move { auth.get_valid_access_token().await }
    }))
    .await;

    for result in results {
        assert_eq!(
            result.unwrap_err().to_string(),
            "maintenance",
        );
    }
    // A transient failure keeps the session.
    assert!(secrets.get_string(SecretSlot::RefreshToken).unwrap().is_some());
}

#[tokio::test]
async fn test_sign_in_stores_tokens_and_profile() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/auth/signin"))
        .and(body_json(json!({
            "provider": "apple",
            "idToken": "apple-jwt",
            "fullName": {"givenName": "Ada", "familyName": "Lovelace"}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "accessToken": "a1",
            "refreshToken": "r1",
            "expiresIn": 3600,
            "user": {"id": "u1", "email": "ada@example.com", "createdAt": "2026-01-01"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let secrets = Arc::new(MemorySecretStore::new());
    let auth = manager(&server, secrets.clone(), Arc::new(FixedIdentity(CredentialState::Authorized)));

    auth.sign_in(AppleCredential {
        user_identifier: "apple-user".into(),
        identity_token: Some("apple-jwt".into()),
        given_name: Some("Ada".into()),
        family_name: Some("Lovelace".into()),
        email: None,
    })
    .await
    .unwrap();

    let snapshot = auth.snapshot();
    assert_eq!(snapshot.state, AuthState::Authenticated);
    assert!(!snapshot.is_loading);
    assert_eq!(snapshot.user_display_name.as_deref(), Some("Ada Lovelace"));
    assert_eq!(snapshot.user_email.as_deref(), Some("ada@example.com"));
    assert_eq!(
        secrets.get_string(SecretSlot::AccessToken).unwrap().as_deref(),
        Some("a1")
    );
    assert_eq!(
        secrets.get_string(SecretSlot::AppleUserFullName).unwrap().as_deref(),
        Some("Ada Lovelace")
    );
    let expires_at: i64 = secrets
        .get_string(SecretSlot::ExpiresAt)
        .unwrap()
        .unwrap()
        .parse()
        .unwrap();
    assert!(expires_at > Utc::now().timestamp() + 3000);
    assert_eq!(auth.get_valid_access_token().await.unwrap(), "a1");
}

#[tokio::test]
async fn test_backend_sign_in_failure_clears_secrets() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/auth/signin"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"error": "Invalid identity token"})))
        .mount(&server)
        .await;

    let secrets = Arc::new(MemorySecretStore::new());
    let auth = manager(&server, secrets.clone(), Arc::new(FixedIdentity(CredentialState::Authorized)));

    let err = auth
        .sign_in(AppleCredential {
            user_identifier: "apple-user".into(),
            identity_token: Some("bad".into()),
            email: Some("ada@example.com".into()),
            ..Default::default()
        })
        .await
        .unwrap_err();

    assert_eq!(err, AuthError::BackendAuthFailed("Invalid identity token".into()));
    let snapshot = auth.snapshot();
    assert_eq!(snapshot.state, AuthState::SignedOut);
    assert_eq!(snapshot.error_message.as_deref(), Some("Invalid identity token"));
    assert_all_slots_empty(&secrets);
}

#[tokio::test]
async fn test_sign_out_clears_locally_then_notifies_backend() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/auth/signout"))
        .and(header("authorization", "Bearer old-token"))
        .and(body_json(json!({})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
        .expect(1)
        .mount(&server)
        .await;

    let secrets = stored_session(Utc::now().timestamp() + 3600);
    let auth = manager(&server, secrets.clone(), Arc::new(FixedIdentity(CredentialState::Authorized)));

    let pending = auth.sign_out();
    assert_eq!(auth.state(), AuthState::SignedOut);
    assert_all_slots_empty(&secrets);

    pending.await.unwrap();
    assert_eq!(
        auth.get_valid_access_token().await.unwrap_err(),
        AuthError::NotLoggedIn
    );
}

#[tokio::test]
async fn test_sign_out_ignores_backend_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/auth/signout"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let secrets = stored_session(Utc::now().timestamp() + 3600);
    let auth = manager(&server, secrets.clone(), Arc::new(FixedIdentity(CredentialState::Authorized)));

    auth.sign_out().await.unwrap();
    assert_eq!(auth.state(), AuthState::SignedOut);
    assert_all_slots_empty(&secrets);
}

#[tokio::test]
async fn test_launch_restores_valid_session() {
    let server = MockServer::start().await;
    let secrets = stored_session(Utc::now().timestamp() + 3600);
    secrets
        .put_string(SecretSlot::AppleUserFullName, "Ada Lovelace")
        .unwrap();
    let auth = manager(&server, secrets, Arc::new(FixedIdentity(CredentialState::Authorized)));

    assert_eq!(auth.check_existing_credentials().await, AuthState::Authenticated);
    assert_eq!(
        auth.snapshot().user_display_name.as_deref(),
        Some("Ada Lovelace")
    );
}

#[tokio::test]
async fn test_launch_with_revoked_credential_clears_secrets() {
    let server = MockServer::start().await;
    let secrets = stored_session(Utc::now().timestamp() + 3600);
    let auth = manager(&server, secrets.clone(), Arc::new(FixedIdentity(CredentialState::Revoked)));

    assert_eq!(auth.check_existing_credentials().await, AuthState::SignedOut);
    assert_all_slots_empty(&secrets);
}

#[tokio::test]
async fn test_launch_check_error_keeps_secrets() {
    let server = MockServer::start().await;
    let secrets = stored_session(Utc::now().timestamp() + 3600);
    let auth = manager(&server, secrets.clone(), Arc::new(BrokenIdentity));

    assert_eq!(auth.check_existing_credentials().await, AuthState::SignedOut);
    assert_eq!(
        secrets.get_string(SecretSlot::RefreshToken).unwrap().as_deref(),
        Some("refresh-1")
    );
}

#[tokio::test]
async fn test_refresh_finishing_after_sign_out_is_discarded() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/auth/refresh"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({
                    "accessToken": "late-token",
                    "refreshToken": "refresh-2",
                    "expiresIn": 3600
                }))
                .set_delay(Duration::from_millis(300)),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/auth/signout"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
        .mount(&server)
        .await;

    let secrets = stored_session(Utc::now().timestamp() - 1);
    let auth = manager(&server, secrets.clone(), Arc::new(FixedIdentity(CredentialState::Authorized)));

    let refreshing = {
        let auth = auth.clone();
        tokio::spawn(async move { auth.get_valid_access_token().await })
    };
    tokio::time::sleep(Duration::from_millis(100)).await;
    auth.sign_out().await.unwrap();

    let result = refreshing.await.unwrap();
    assert_eq!(result.unwrap_err(), AuthError::NotLoggedIn);
    assert_eq!(auth.state(), AuthState::SignedOut);
    assert_all_slots_empty(&secrets);
    assert_eq!(
        auth.get_valid_access_token().await.unwrap_err(),
        AuthError::NotLoggedIn
    );
}

#[tokio::test]
async fn test_sign_out_without_token_skips_backend() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/auth/signout"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let secrets = Arc::new(MemorySecretStore::new());
    secrets
        .put_string(SecretSlot::AppleUserIdentifier, "apple-user")
        .unwrap();
    let auth = manager(&server, secrets.clone(), Arc::new(FixedIdentity(CredentialState::Authorized)));

    auth.sign_out().await.unwrap();
    assert_eq!(auth.state(), AuthState::SignedOut);
    assert_all_slots_empty(&secrets);
}
