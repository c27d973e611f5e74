//! Provider OAuth client.
//!
//! [`OAuthProviderClient`] is the seam the login and refresh flows call
//! through. [`ProviderClient`] (feature `oauth`) implements it over HTTP
//! for the Provider's auth endpoints: authorization-code exchange,
//! refresh-token grant and user-info lookup. Every call is bounded by the
//! configured timeout and never retried here.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sso_identity::{Organization, UserIdentity};

use crate::error::AuthResult;
use crate::session::OAuthCredential;
use crate::state::StateToken;

/// Token endpoint response.
#[derive(Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    /// Bearer access token
    pub access_token: String,

    /// Refresh token, if issued or rotated
    #[serde(default)]
    pub refresh_token: Option<String>,

    /// Access-token lifetime in seconds
    #[serde(default)]
    pub expires_in: Option<i64>,

    /// Tenant REST root
    #[serde(default)]
    pub rest_instance_url: Option<String>,

    /// Token type (usually "Bearer")
    #[serde(default)]
    pub token_type: Option<String>,

    /// Granted scopes
    #[serde(default)]
    pub scope: Option<String>,
}

impl std::fmt::Debug for TokenResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenResponse")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "[REDACTED]"))
            .field("expires_in", &self.expires_in)
            .field("rest_instance_url", &self.rest_instance_url)
            .field("token_type", &self.token_type)
            .field("scope", &self.scope)
            .finish()
    }
}

impl TokenResponse {
    /// Credential with an absolute expiry measured from now.
    pub fn into_credential(self) -> OAuthCredential {
        OAuthCredential::new(
            self.access_token,
            self.refresh_token,
            self.expires_in,
            self.rest_instance_url,
        )
    }
}

/// User-info endpoint response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserInfoResponse {
    /// Signed-in user
    pub user: UserIdentity,

    /// Tenant
    pub organization: Organization,
}

/// Operations the login and refresh flows need from the Provider.
#[async_trait]
pub trait OAuthProviderClient: Send + Sync {
    /// Authorize URL for a login attempt.
    fn authorization_url(&self, state: &StateToken) -> AuthResult<String>;

    /// Exchange an authorization code for tokens.
    async fn exchange_code(&self, code: &str) -> AuthResult<TokenResponse>;

    /// Fetch the user and organization for an access token.
    async fn get_user_info(&self, access_token: &str) -> AuthResult<UserInfoResponse>;

    /// Obtain a new access token from a refresh token.
    async fn refresh_token(&self, refresh_token: &str) -> AuthResult<TokenResponse>;
}
