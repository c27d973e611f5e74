//! HTTP implementation of [`OAuthProviderClient`].
//!
//! Talks to `{authBaseUri}/v2/token`, `/v2/userinfo` and builds the
//! `/v2/authorize` URL. Failed responses are logged with their body and
//! mapped to the error of the step that failed.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, instrument, warn};
use url::Url;

use crate::config::OAuthSettings;
use crate::error::{AuthError, AuthResult};
use crate::provider::{OAuthProviderClient, TokenResponse, UserInfoResponse};
use crate::state::StateToken;

/// reqwest-backed Provider client.
#[derive(Clone)]
pub struct ProviderClient {
    /// HTTP client instance.
    client: Client,

    /// Endpoints and client credentials.
    settings: OAuthSettings,
}

impl std::fmt::Debug for ProviderClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderClient")
            .field("settings", &self.settings)
            .finish()
    }
}

impl ProviderClient {
    /// Create a new Provider client.
    pub fn new(settings: OAuthSettings) -> AuthResult<Self> {
        let client = Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|e| AuthError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, settings })
    }

    /// Client settings.
    pub fn settings(&self) -> &OAuthSettings {
        &self.settings
    }

    async fn post_token_form(
        &self,
        form: &[(&str, &str)],
        fail: fn(Option<u16>, String) -> AuthError,
    ) -> AuthResult<TokenResponse> {
        let response = self
            .client
            .post(self.settings.token_url())
            .form(form)
            .send()
            .await
            .map_err(|e| {
                warn!("Provider token request failed: {}", e);
                fail(None, e.to_string())
            })?;

        handle_response(response, fail).await
    }
}

async fn handle_response<T>(
    response: reqwest::Response,
    fail: fn(Option<u16>, String) -> AuthError,
) -> AuthResult<T>
where
    T: for<'de> Deserialize<'de>,
{
    let status = response.status();

    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        warn!("Provider API error ({}): {}", status.as_u16(), body);
        return Err(fail(Some(status.as_u16()), body));
    }

    response.json().await.map_err(|e| {
        warn!("Invalid Provider response: {}", e);
        fail(Some(status.as_u16()), format!("Invalid response: {}", e))
    })
}

fn exchange_failed(status: Option<u16>, detail: String) -> AuthError {
    AuthError::TokenExchangeFailed { status, detail }
}

fn userinfo_failed(status: Option<u16>, detail: String) -> AuthError {
    AuthError::UserInfoFetchFailed { status, detail }
}

fn refresh_failed(status: Option<u16>, detail: String) -> AuthError {
    match status {
        Some(status) => AuthError::RefreshFailed(format!("HTTP {}: {}", status, detail)),
        None => AuthError::RefreshFailed(detail),
    }
}

#[async_trait]
impl OAuthProviderClient for ProviderClient {
    fn authorization_url(&self, state: &StateToken) -> AuthResult<String> {
        let mut url = Url::parse(&self.settings.authorize_url())
            .map_err(|e| AuthError::ConfigMissing(format!("MC_AUTH_BASE_URI is invalid: {}", e)))?;
        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", &self.settings.client_id)
            .append_pair("redirect_uri", &self.settings.redirect_uri)
            .append_pair("state", state.as_str());
        Ok(url.to_string())
    }

    #[instrument(skip(self, code))]
    async fn exchange_code(&self, code: &str) -> AuthResult<TokenResponse> {
        debug!("Exchanging authorization code");

        let tokens = self
            .post_token_form(
                &[
                    ("grant_type", "authorization_code"),
                    ("code", code),
                    ("client_id", &self.settings.client_id),
                    ("client_secret", &self.settings.client_secret),
                    ("redirect_uri", &self.settings.redirect_uri),
                ],
                exchange_failed,
            )
            .await?;

        debug!(expires_in = ?tokens.expires_in, "Authorization code exchanged");
        Ok(tokens)
    }

    #[instrument(skip(self, access_token))]
    async fn get_user_info(&self, access_token: &str) -> AuthResult<UserInfoResponse> {
        debug!("Fetching user info");

        let response = self
            .client
            .get(self.settings.userinfo_url())
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| {
                warn!("Provider userinfo request failed: {}", e);
                userinfo_failed(None, e.to_string())
            })?;

        handle_response(response, userinfo_failed).await
    }

    #[instrument(skip(self, refresh_token))]
    async fn refresh_token(&self, refresh_token: &str) -> AuthResult<TokenResponse> {
        debug!("Refreshing access token");

        self.post_token_form(
            &[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
                ("client_id", &self.settings.client_id),
                ("client_secret", &self.settings.client_secret),
            ],
            refresh_failed,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::StateTokenGuard;

    fn client() -> ProviderClient {
        ProviderClient::new(OAuthSettings::new(
            "https://mc.auth.example.com/",
            "client id",
            "secret",
            "http://localhost:3000/api/auth/callback",
        ))
        .unwrap()
    }

    #[test]
    fn test_authorization_url() {
        let state = StateTokenGuard::new().issue();
        let url = Url::parse(&client().authorization_url(&state).unwrap()).unwrap();

        assert_eq!(url.path(), "/v2/authorize");
        let pairs: std::collections::HashMap<_, _> = url.query_pairs().into_owned().collect();
        assert_eq!(pairs["response_type"], "code");
        assert_eq!(pairs["client_id"], "client id");
        assert_eq!(pairs["redirect_uri"], "http://localhost:3000/api/auth/callback");
        assert_eq!(pairs["state"], state.as_str());
        assert!(!pairs.contains_key("client_secret"));
    }

    #[test]
    fn test_refresh_failure_carries_status() {
        let err = refresh_failed(Some(400), "invalid_grant".to_string());
        assert_eq!(err.error_code(), "REFRESH_FAILED");
        assert!(err.to_string().contains("400"));
    }
}
