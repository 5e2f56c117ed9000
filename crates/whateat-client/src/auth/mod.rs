//! Authentication lifecycle: sign-in, launch-time credential check, token
//! refresh and sign-out.
//!
//! State is published through a [`watch`] channel so the UI layer can
//! observe [`AuthSnapshot`] changes. Concurrent callers of
//! [`AuthManager::get_valid_access_token`] that find a stale token share a
//! single `/auth/refresh` request.

pub mod identity;
pub mod models;

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use futures::future::{BoxFuture, FutureExt, Shared};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use whateat_net::{ApiClient, ApiError};
use whateat_shared::constants::AUTH_PROVIDER_APPLE;
use whateat_store::{SecretSlot, SecretStore, SecretStoreExt};

use crate::error::AuthError;

pub use identity::{AppleCredential, CredentialState, IdentityProvider, StoredCredentialProvider};
pub use models::{AuthResponse, AuthUser, FullNamePayload, RefreshRequest, SignInRequest};

/// Where the session stands.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AuthState {
    /// Launch check has not finished yet.
    #[default]
    Checking,
    SignedOut,
    Authenticated,
}

/// Observable auth state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthSnapshot {
    pub state: AuthState,
    pub is_loading: bool,
    pub error_message: Option<String>,
    pub user_display_name: Option<String>,
    pub user_email: Option<String>,
}

/// Source of bearer tokens for the domain stores.
#[async_trait]
pub trait AccessTokenProvider: Send + Sync {
    async fn access_token(&self) -> Result<String, AuthError>;
}

type RefreshFuture = Shared<BoxFuture<'static, Result<String, AuthError>>>;

/// In-flight refresh tagged with the session generation that started it.
struct InFlightRefresh {
    generation: u64,
    future: RefreshFuture,
}

struct AuthInner {
    api: ApiClient,
    secrets: Arc<dyn SecretStore>,
    identity: Arc<dyn IdentityProvider>,
    refresh_window_secs: i64,
    state: watch::Sender<AuthSnapshot>,
    refresh_in_flight: Mutex<Option<InFlightRefresh>>,
    /// Bumped every time the session ends. Token writes hold this lock so a
    /// refresh started in an earlier session can never store its tokens.
    session_generation: Mutex<u64>,
}

/// Handle to the auth state machine. Clones share state.
#[derive(Clone)]
pub struct AuthManager {
    inner: Arc<AuthInner>,
}

impl AuthManager {
    pub fn new(
        api: ApiClient,
        secrets: Arc<dyn SecretStore>,
        identity: Arc<dyn IdentityProvider>,
        refresh_window_secs: i64,
    ) -> Self {
        let (state, _) = watch::channel(AuthSnapshot::default());
        Self {
            inner: Arc::new(AuthInner {
                api,
                secrets,
                identity,
                refresh_window_secs,
                state,
                refresh_in_flight: Mutex::new(None),
                session_generation: Mutex::new(0),
            }),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<AuthSnapshot> {
        self.inner.state.subscribe()
    }

    pub fn snapshot(&self) -> AuthSnapshot {
        self.inner.state.borrow().clone()
    }

    pub fn state(&self) -> AuthState {
        self.inner.state.borrow().state
    }

    // ==================== Launch ====================

    /// Decide the initial state from stored credentials. A stored user is
    /// authenticated only if the identity provider still authorizes them
    /// and a valid access token can be obtained.
    pub async fn check_existing_credentials(&self) -> AuthState {
        let inner = &self.inner;
        let user_id = match inner.secrets.get_string(SecretSlot::AppleUserIdentifier) {
            Ok(Some(id)) if !id.is_empty() => id,
            Ok(_) => {
                debug!("No stored user identifier");
                inner.set_state(AuthState::SignedOut);
                return AuthState::SignedOut;
            }
            Err(e) => {
                warn!(error = %e, "Failed to read stored user identifier");
                inner.set_state(AuthState::SignedOut);
                return AuthState::SignedOut;
            }
        };

        match inner.identity.credential_state(&user_id).await {
            Ok(CredentialState::Authorized) => {}
            Ok(other) => {
                info!(state = ?other, "Stored credential no longer authorized");
                inner.end_session();
                return AuthState::SignedOut;
            }
            Err(e) => {
                // Undecidable: secrets are kept for the next launch.
                warn!(error = %e, "Credential state check failed");
                inner.set_state(AuthState::SignedOut);
                return AuthState::SignedOut;
            }
        }

        match inner.secrets.get_string(SecretSlot::RefreshToken) {
            Ok(Some(_)) => {}
            _ => {
                info!("Stored user has no refresh token");
                inner.end_session();
                return AuthState::SignedOut;
            }
        }

        match self.get_valid_access_token().await {
            Ok(_) => {
                let display_name = inner.read_optional(SecretSlot::AppleUserFullName);
                let email = inner.read_optional(SecretSlot::AppleUserEmail);
                inner.state.send_modify(|s| {
                    s.state = AuthState::Authenticated;
                    s.user_display_name = display_name;
                    s.user_email = email;
                });
                info!("Restored session");
                AuthState::Authenticated
            }
            Err(e) => {
                warn!(error = %e, "Could not restore session");
                inner.end_session();
                AuthState::SignedOut
            }
        }
    }

    // ==================== Sign-in ====================

    /// Exchange an Apple credential for backend tokens. On backend failure
    /// every secret is cleared and the state is `SignedOut`.
    pub async fn sign_in(&self, credential: AppleCredential) -> Result<(), AuthError> {
        let inner = &self.inner;
        inner.state.send_modify(|s| {
            s.is_loading = true;
            s.error_message = None;
        });

        let Some(id_token) = credential
            .identity_token
            .clone()
            .filter(|token| !token.is_empty())
        else {
            let err = AuthError::MissingIdentityToken;
            inner.fail_sign_in(&err);
            return Err(err);
        };

        let full_name = credential.full_name();
        if let Err(e) = inner.remember_user(&credential, full_name.as_deref()) {
            inner.fail_sign_in(&e);
            return Err(e);
        }

        let has_name = credential.given_name.is_some() || credential.family_name.is_some();
        let request = SignInRequest {
            provider: AUTH_PROVIDER_APPLE.to_string(),
            id_token,
            full_name: has_name.then(|| FullNamePayload {
                given_name: credential.given_name.clone(),
                family_name: credential.family_name.clone(),
            }),
        };

        let response = match inner
            .api
            .post::<AuthResponse, _>("/auth/signin", &request, None)
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "Backend sign-in failed");
                inner.clear_secrets();
                let err = AuthError::BackendAuthFailed(e.to_string());
                inner.state.send_modify(|s| {
                    s.state = AuthState::SignedOut;
                    s.is_loading = false;
                    s.error_message = Some(err.to_string());
                    s.user_display_name = None;
                    s.user_email = None;
                });
                return Err(err);
            }
        };

        if let Err(e) = inner.store_tokens(&response) {
            inner.clear_secrets();
            inner.fail_sign_in(&e);
            return Err(e);
        }

        let display_name = full_name.or_else(|| inner.read_optional(SecretSlot::AppleUserFullName));
        let email = credential
            .email
            .clone()
            .or_else(|| response.user.as_ref().and_then(|u| u.email.clone()))
            .or_else(|| inner.read_optional(SecretSlot::AppleUserEmail));
        inner.state.send_modify(|s| {
            s.state = AuthState::Authenticated;
            s.is_loading = false;
            s.error_message = None;
            s.user_display_name = display_name;
            s.user_email = email;
        });
        info!("Signed in");
        Ok(())
    }

    // ==================== Sign-out ====================

    /// Clear local credentials and switch to `SignedOut` immediately, then
    /// notify the backend in the background if a token was stored. The
    /// returned handle resolves once that best-effort request has finished;
    /// its outcome is only logged.
    pub fn sign_out(&self) -> JoinHandle<()> {
        let inner = &self.inner;
        let token = inner.read_optional(SecretSlot::AccessToken);
        inner.end_session();
        info!("Signed out locally");

        let api = inner.api.clone();
        tokio::spawn(async move {
            let Some(token) = token else {
                debug!("No access token, skipping backend sign-out");
                return;
            };
            match api
                .post_empty::<serde_json::Value>("/auth/signout", Some(&token))
                .await
            {
                Ok(_) => debug!("Backend sign-out acknowledged"),
                Err(e) => debug!(error = %e, "Backend sign-out failed (ignored)"),
            }
        })
    }

    // ==================== Tokens ====================

    /// Return an access token valid for at least the refresh window,
    /// refreshing it first if necessary.
    pub async fn get_valid_access_token(&self) -> Result<String, AuthError> {
        if let Some(token) = self.inner.fresh_access_token()? {
            return Ok(token);
        }

        let refresh = {
            let mut slot = self.inner.lock_refresh_slot();
            match slot.as_ref() {
                Some(in_flight) => {
                    debug!("Joining in-flight token refresh");
                    in_flight.future.clone()
                }
                None => {
                    // Another caller may have refreshed between our first
                    // check and taking the lock.
                    if let Some(token) = self.inner.fresh_access_token()? {
                        return Ok(token);
                    }
                    let refresh_token = self
                        .inner
                        .secrets
                        .get_string(SecretSlot::RefreshToken)?
                        .filter(|t| !t.is_empty())
                        .ok_or(AuthError::NotLoggedIn)?;

                    let generation = self.inner.current_generation();
                    let inner = Arc::clone(&self.inner);
                    let future = async move { inner.refresh_tokens(refresh_token, generation).await }
                        .boxed()
                        .shared();
                    *slot = Some(InFlightRefresh {
                        generation,
                        future: future.clone(),
                    });
                    future
                }
            }
        };

        refresh.await
    }
}

#[async_trait]
impl AccessTokenProvider for AuthManager {
    async fn access_token(&self) -> Result<String, AuthError> {
        self.get_valid_access_token().await
    }
}

impl AuthInner {
    fn lock_refresh_slot(&self) -> MutexGuard<'_, Option<InFlightRefresh>> {
        self.refresh_in_flight
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lock_generation(&self) -> MutexGuard<'_, u64> {
        self.session_generation
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn current_generation(&self) -> u64 {
        *self.lock_generation()
    }

    /// Drop the in-flight refresh if it still belongs to `generation`.
    fn release_refresh_slot(&self, generation: u64) {
        let mut slot = self.lock_refresh_slot();
        if slot.as_ref().is_some_and(|r| r.generation == generation) {
            slot.take();
        }
    }

    fn set_state(&self, state: AuthState) {
        self.state.send_if_modified(|s| {
            let changed = s.state != state || s.is_loading;
            s.state = state;
            s.is_loading = false;
            changed
        });
    }

    fn read_optional(&self, slot: SecretSlot) -> Option<String> {
        match self.secrets.get_string(slot) {
            Ok(value) => value.filter(|v| !v.is_empty()),
            Err(e) => {
                warn!(slot = slot.key(), error = %e, "Failed to read secret");
                None
            }
        }
    }

    /// Stored access token if it outlives the refresh window.
    fn fresh_access_token(&self) -> Result<Option<String>, AuthError> {
        let Some(token) = self.secrets.get_string(SecretSlot::AccessToken)? else {
            return Ok(None);
        };
        let expires_at = self
            .secrets
            .get_string(SecretSlot::ExpiresAt)?
            .and_then(|v| v.trim().parse::<i64>().ok());
        let now = Utc::now().timestamp();
        match expires_at {
            Some(expiry) if expiry > now + self.refresh_window_secs && !token.is_empty() => {
                Ok(Some(token))
            }
            _ => Ok(None),
        }
    }

    fn remember_user(
        &self,
        credential: &AppleCredential,
        full_name: Option<&str>,
    ) -> Result<(), AuthError> {
        self.secrets
            .put_string(SecretSlot::AppleUserIdentifier, &credential.user_identifier)?;
        if let Some(name) = full_name {
            self.secrets.put_string(SecretSlot::AppleUserFullName, name)?;
        }
        if let Some(email) = credential.email.as_deref().filter(|e| !e.is_empty()) {
            self.secrets.put_string(SecretSlot::AppleUserEmail, email)?;
        }
        Ok(())
    }

    fn store_tokens(&self, response: &AuthResponse) -> Result<(), AuthError> {
        let expiry = response.expiry(Utc::now().timestamp());
        self.secrets
            .put_string(SecretSlot::AccessToken, &response.access_token)?;
        self.secrets
            .put_string(SecretSlot::RefreshToken, &response.refresh_token)?;
        self.secrets
            .put_string(SecretSlot::ExpiresAt, &expiry.to_string())?;
        Ok(())
    }

    async fn refresh_tokens(
        self: Arc<Self>,
        refresh_token: String,
        generation: u64,
    ) -> Result<String, AuthError> {
        info!("Refreshing access token");
        let request = RefreshRequest { refresh_token };
        let outcome = match self
            .api
            .post::<AuthResponse, _>("/auth/refresh", &request, None)
            .await
        {
            Ok(response) => {
                let current = self.lock_generation();
                if *current != generation {
                    debug!("Session ended during refresh, discarding tokens");
                    Err(AuthError::NotLoggedIn)
                } else {
                    self.store_tokens(&response)
                        .map(|_| response.access_token)
                }
            }
            Err(ApiError::Unauthorized(message)) => {
                if self.current_generation() == generation {
                    warn!(%message, "Refresh token rejected, ending session");
                    self.end_session();
                    Err(AuthError::SessionExpired)
                } else {
                    Err(AuthError::NotLoggedIn)
                }
            }
            Err(e) => {
                warn!(error = %e, "Token refresh failed");
                Err(AuthError::Api(e))
            }
        };

        self.release_refresh_slot(generation);
        outcome
    }

    fn clear_secrets(&self) {
        if let Err(e) = self.secrets.clear_all() {
            warn!(error = %e, "Failed to clear secret store");
        }
    }

    /// Clear every secret, abandon any in-flight refresh and publish
    /// `SignedOut`.
    fn end_session(&self) {
        let ended = {
            let mut generation = self.lock_generation();
            *generation += 1;
            self.clear_secrets();
            *generation - 1
        };
        self.release_refresh_slot(ended);
        self.state.send_modify(|s| {
            s.state = AuthState::SignedOut;
            s.is_loading = false;
            s.user_display_name = None;
            s.user_email = None;
        });
    }

    fn fail_sign_in(&self, err: &AuthError) {
        self.state.send_modify(|s| {
            s.is_loading = false;
            s.error_message = Some(err.to_string());
        });
    }
}
