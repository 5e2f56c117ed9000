use serde::{Deserialize, Serialize};

/// Body of `POST /auth/signin`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignInRequest {
    pub provider: String,
    pub id_token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<FullNamePayload>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FullNamePayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub given_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub family_name: Option<String>,
}

/// Body of `POST /auth/refresh`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Token pair returned by sign-in and refresh.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    #[serde(alias = "access_token")]
    pub access_token: String,
    #[serde(alias = "refresh_token")]
    pub refresh_token: String,
    #[serde(default, alias = "expires_in")]
    pub expires_in: Option<i64>,
    /// Absolute expiry, epoch seconds.
    #[serde(default, alias = "expires_at")]
    pub expires_at: Option<i64>,
    #[serde(default)]
    pub user: Option<AuthUser>,
}

impl AuthResponse {
    /// Expiry in epoch seconds, derived from `expires_in` when the server
    /// omits the absolute value.
    pub fn expiry(&self, now: i64) -> i64 {
        self.expires_at
            .or_else(|| self.expires_in.map(|secs| now + secs))
            .unwrap_or(now)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default, alias = "created_at")]
    pub created_at: Option<String>,
}
