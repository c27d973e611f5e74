//! Access-token refresh
//!
//! [`TokenRefresher::ensure_valid_access_token`] is the one call every
//! handler makes before using the Provider access token. A token that
//! expires within the buffer (default 60 s) is refreshed with the stored
//! refresh token and the whole session record is written back.
//!
//! There is no cross-request lock: two requests may refresh the same
//! session concurrently. Each refresh response overwrites the token fields
//! wholesale, so the last write wins and the next refresh resynchronizes.

use chrono::Duration;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::AuthError;
use crate::provider::OAuthProviderClient;
use crate::session::{expires_at_from_now, now_millis, Session};
use crate::store::{RequestContext, ResponseContext, SessionRepository};

/// Default refresh window before expiry.
pub const DEFAULT_EXPIRY_BUFFER_SECS: i64 = 60;

/// Result of resolving a session's access token.
#[derive(Debug)]
pub enum AccessTokenOutcome {
    /// No signed-in user, or no bearer token in the session
    Unauthenticated,

    /// Stored token is usable as-is
    Valid(String),

    /// Token was refreshed; the session has been updated
    Refreshed(String),

    /// Refresh was needed and failed; the session is unchanged
    RefreshFailed(AuthError),
}

impl AccessTokenOutcome {
    /// Usable token, if any.
    pub fn into_token(self) -> Option<String> {
        match self {
            AccessTokenOutcome::Valid(token) | AccessTokenOutcome::Refreshed(token) => Some(token),
            AccessTokenOutcome::Unauthenticated | AccessTokenOutcome::RefreshFailed(_) => None,
        }
    }

    /// Check if the session was modified.
    pub fn is_refreshed(&self) -> bool {
        matches!(self, AccessTokenOutcome::Refreshed(_))
    }
}

/// A loaded session and its resolved access token.
#[derive(Debug)]
pub struct SessionAccess {
    /// Session after any refresh
    pub session: Session,

    /// Token resolution
    pub outcome: AccessTokenOutcome,
}

/// Keeps the session's access token fresh.
pub struct TokenRefresher {
    store: Arc<dyn SessionRepository>,
    provider: Option<Arc<dyn OAuthProviderClient>>,
    expiry_buffer: Duration,
}

impl TokenRefresher {
    /// Create a refresher with no Provider client.
    ///
    /// Tokens that need a refresh resolve to `RefreshFailed` until a client
    /// is supplied with [`TokenRefresher::with_provider`].
    pub fn new(store: Arc<dyn SessionRepository>) -> Self {
        Self {
            store,
            provider: None,
            expiry_buffer: Duration::seconds(DEFAULT_EXPIRY_BUFFER_SECS),
        }
    }

    /// Set the Provider client used for the refresh grant.
    pub fn with_provider(mut self, provider: Arc<dyn OAuthProviderClient>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Set how long before expiry a token is refreshed.
    pub fn with_expiry_buffer(mut self, buffer: Duration) -> Self {
        self.expiry_buffer = buffer;
        self
    }

    /// Resolve the access token of `session`, refreshing it in place if
    /// needed.
    ///
    /// On failure `session` is left untouched.
    pub async fn resolve(&self, session: &mut Session) -> AccessTokenOutcome {
        if !session.is_authenticated() {
            return AccessTokenOutcome::Unauthenticated;
        }
        let Some(credential) = session.oauth_credential() else {
            return AccessTokenOutcome::Unauthenticated;
        };
        if credential.access_token.is_empty() {
            return AccessTokenOutcome::Unauthenticated;
        }

        let remaining = match credential.millis_until_expiry(now_millis()) {
            None => return AccessTokenOutcome::Valid(credential.access_token.clone()),
            Some(remaining) => remaining,
        };
        if remaining > self.expiry_buffer.num_milliseconds() {
            return AccessTokenOutcome::Valid(credential.access_token.clone());
        }

        debug!(remaining_ms = remaining, "Access token expiring, refreshing");

        let Some(refresh_token) = credential.refresh_token.clone().filter(|t| !t.is_empty()) else {
            warn!("Access token expired and no refresh token is stored");
            return AccessTokenOutcome::RefreshFailed(AuthError::RefreshFailed(
                "no refresh token".to_string(),
            ));
        };
        let Some(provider) = self.provider.as_ref() else {
            warn!("Access token expired and no OAuth client is configured");
            return AccessTokenOutcome::RefreshFailed(AuthError::ConfigMissing(
                "MC_AUTH_BASE_URI, MC_CLIENT_ID, MC_CLIENT_SECRET".to_string(),
            ));
        };

        let tokens = match provider.refresh_token(&refresh_token).await {
            Ok(tokens) => tokens,
            Err(e) => {
                warn!("Token refresh failed: {}", e);
                return AccessTokenOutcome::RefreshFailed(e);
            }
        };

        let Some(credential) = session.oauth_credential_mut() else {
            return AccessTokenOutcome::Unauthenticated;
        };
        credential.access_token = tokens.access_token.clone();
        credential.token_expires_at = tokens.expires_in.map(expires_at_from_now);
        if let Some(refresh_token) = tokens.refresh_token {
            credential.refresh_token = Some(refresh_token);
        }
        if let Some(api_base_url) = tokens.rest_instance_url {
            credential.api_base_url = Some(api_base_url);
        }

        info!(expires_at = ?credential.token_expires_at, "Access token refreshed");
        AccessTokenOutcome::Refreshed(tokens.access_token)
    }

    /// Load the session, resolve its token and persist a refreshed record.
    ///
    /// A refreshed token is returned even if the write-back fails; the next
    /// request then refreshes again.
    pub async fn ensure_access(&self, ctx: &RequestContext, out: &mut ResponseContext) -> SessionAccess {
        let mut session = self.store.load(ctx).await;
        let outcome = self.resolve(&mut session).await;

        if outcome.is_refreshed() {
            if let Err(e) = self.store.save(ctx, &session, out).await {
                warn!("Failed to persist refreshed session: {}", e);
            }
        }

        SessionAccess { session, outcome }
    }

    /// A usable access token, or `None` when re-authentication is required.
    pub async fn ensure_valid_access_token(
        &self,
        ctx: &RequestContext,
        out: &mut ResponseContext,
    ) -> Option<String> {
        self.ensure_access(ctx, out).await.outcome.into_token()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SessionConfig;
    use crate::error::AuthResult;
    use crate::provider::{TokenResponse, UserInfoResponse};
    use crate::session::{LegacyCredential, OAuthCredential};
    use crate::state::StateToken;
    use crate::store::EncryptedCookieStore;
    use async_trait::async_trait;
    use sso_identity::{Organization, UserIdentity};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StaticProvider {
        response: Option<TokenResponse>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl OAuthProviderClient for StaticProvider {
        fn authorization_url(&self, _state: &StateToken) -> AuthResult<String> {
            unreachable!()
        }

        async fn exchange_code(&self, _code: &str) -> AuthResult<TokenResponse> {
            unreachable!()
        }

        async fn get_user_info(&self, _access_token: &str) -> AuthResult<UserInfoResponse> {
            unreachable!()
        }

        async fn refresh_token(&self, _refresh_token: &str) -> AuthResult<TokenResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.response
                .clone()
                .ok_or_else(|| AuthError::RefreshFailed("HTTP 400".to_string()))
        }
    }

    fn refresher(response: Option<TokenResponse>) -> (TokenRefresher, Arc<StaticProvider>) {
        let provider = Arc::new(StaticProvider {
            response,
            calls: AtomicUsize::new(0),
        });
        let store = Arc::new(EncryptedCookieStore::new(&SessionConfig::default()).unwrap());
        (TokenRefresher::new(store).with_provider(provider.clone()), provider)
    }

    fn session(expires_in: Option<i64>) -> Session {
        Session::oauth(
            UserIdentity::new(1, "a@example.com"),
            Organization::new(2),
            OAuthCredential::new(
                "old-access",
                Some("old-refresh".to_string()),
                expires_in,
                Some("https://old.rest.example.com/".to_string()),
            ),
        )
    }

    fn new_tokens() -> TokenResponse {
        serde_json::from_value(serde_json::json!({
            "access_token": "new-access",
            "refresh_token": "new-refresh",
            "expires_in": 1080,
            "rest_instance_url": "https://new.rest.example.com/"
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_fresh_token_is_returned_unchanged() {
        let (refresher, provider) = refresher(Some(new_tokens()));
        let mut session = session(Some(3600));

        let outcome = refresher.resolve(&mut session).await;
        assert_eq!(outcome.into_token().as_deref(), Some("old-access"));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_token_without_expiry_is_returned() {
        let (refresher, provider) = refresher(None);
        let mut session = session(None);

        assert!(matches!(
            refresher.resolve(&mut session).await,
            AccessTokenOutcome::Valid(_)
        ));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_expiring_token_is_refreshed() {
        let (refresher, provider) = refresher(Some(new_tokens()));
        let mut session = session(Some(30));

        let outcome = refresher.resolve(&mut session).await;
        assert!(outcome.is_refreshed());
        assert_eq!(outcome.into_token().as_deref(), Some("new-access"));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);

        let credential = session.oauth_credential().unwrap();
        assert_eq!(credential.refresh_token.as_deref(), Some("new-refresh"));
        assert_eq!(credential.api_base_url.as_deref(), Some("https://new.rest.example.com/"));
        assert!(credential.millis_until_expiry(now_millis()).unwrap() > 1_000_000);
    }

    #[tokio::test]
    async fn test_refresh_keeps_unrotated_fields() {
        let tokens: TokenResponse = serde_json::from_value(serde_json::json!({
            "access_token": "new-access",
            "expires_in": 1080
        }))
        .unwrap();
        let (refresher, _) = refresher(Some(tokens));
        let mut session = session(Some(-10));

        refresher.resolve(&mut session).await;
        let credential = session.oauth_credential().unwrap();
        assert_eq!(credential.refresh_token.as_deref(), Some("old-refresh"));
        assert_eq!(credential.api_base_url.as_deref(), Some("https://old.rest.example.com/"));
    }

    #[tokio::test]
    async fn test_failed_refresh_leaves_session_untouched() {
        let (refresher, _) = refresher(None);
        let mut session = session(Some(30));
        let before = session.clone();

        let outcome = refresher.resolve(&mut session).await;
        assert!(matches!(outcome, AccessTokenOutcome::RefreshFailed(_)));
        assert_eq!(session, before);
    }

    #[tokio::test]
    async fn test_buffer_is_configurable() {
        let (refresher, provider) = refresher(Some(new_tokens()));
        let refresher = refresher.with_expiry_buffer(Duration::seconds(10));
        let mut session = session(Some(30));

        assert!(matches!(
            refresher.resolve(&mut session).await,
            AccessTokenOutcome::Valid(_)
        ));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_missing_provider_fails_refresh() {
        let store = Arc::new(EncryptedCookieStore::new(&SessionConfig::default()).unwrap());
        let refresher = TokenRefresher::new(store);
        let mut session = session(Some(0));

        match refresher.resolve(&mut session).await {
            AccessTokenOutcome::RefreshFailed(e) => assert!(e.is_server_error()),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_legacy_and_empty_sessions_are_unauthenticated() {
        let (refresher, _) = refresher(None);

        let mut empty = Session::empty();
        assert!(matches!(
            refresher.resolve(&mut empty).await,
            AccessTokenOutcome::Unauthenticated
        ));

        let mut legacy = Session::legacy(
            UserIdentity::new(1, "a@example.com"),
            Organization::new(2),
            LegacyCredential {
                auth_endpoint: "https://auth.example.com/".to_string(),
                api_endpoint: "https://rest.example.com/".to_string(),
                refresh_token: "legacy".to_string(),
            },
        );
        assert!(matches!(
            refresher.resolve(&mut legacy).await,
            AccessTokenOutcome::Unauthenticated
        ));
    }
}
