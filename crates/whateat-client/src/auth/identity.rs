use async_trait::async_trait;

/// Credential as delivered by the Sign in with Apple flow.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppleCredential {
    pub user_identifier: String,
    /// JWT to exchange with the backend. Missing tokens fail sign-in.
    pub identity_token: Option<String>,
    pub given_name: Option<String>,
    pub family_name: Option<String>,
    pub email: Option<String>,
}

impl AppleCredential {
    /// Given and family name joined with a space, if either is present.
    pub fn full_name(&self) -> Option<String> {
        let joined = [self.given_name.as_deref(), self.family_name.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        (!joined.is_empty()).then_some(joined)
    }
}

/// What the identity provider says about a stored user identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialState {
    Authorized,
    Revoked,
    NotFound,
    Transferred,
}

/// Platform credential check performed at launch.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn credential_state(&self, user_identifier: &str) -> anyhow::Result<CredentialState>;
}

/// Trusts any stored identifier. Hosts without an OS credential service
/// rely on the backend refresh to detect revoked sessions.
#[derive(Debug, Clone, Copy, Default)]
pub struct StoredCredentialProvider;

#[async_trait]
impl IdentityProvider for StoredCredentialProvider {
    async fn credential_state(&self, _user_identifier: &str) -> anyhow::Result<CredentialState> {
        Ok(CredentialState::Authorized)
    }
}
