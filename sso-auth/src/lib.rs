//! # SSO Authentication
//!
//! Session and token lifecycle for apps embedded in the Provider's tenant
//! UI: both login handshakes, the encrypted session, access-token refresh
//! and the per-request authentication gate.
//!
//! ## Overview
//!
//! - **CredentialStore**: [`SessionRepository`] with an encrypted-cookie and
//!   an in-memory backend
//! - **CSRF**: [`StateTokenGuard`] issues and checks the OAuth `state`
//! - **OAuth 2.0**: [`AuthorizationCodeExchanger`] runs the code flow against
//!   an [`OAuthProviderClient`]
//! - **Legacy login**: [`LegacyTokenVerifier`] accepts the Provider's HS256
//!   signed token
//! - **Refresh**: [`TokenRefresher`] keeps the access token valid
//! - **Gate**: [`SessionGuard`] redirects anonymous requests on protected paths
//!
//! ## Features
//!
//! - `jwt` (default): legacy signed-token support using jsonwebtoken
//! - `oauth` (default): reqwest-backed [`ProviderClient`]
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use sso_auth::{
//!     AuthConfig, AuthorizationCodeExchanger, CallbackParams, ProviderClient,
//!     RequestContext, ResponseContext, TokenRefresher, repository_from_config,
//! };
//!
//! # async fn run() -> sso_auth::AuthResult<()> {
//! let config = AuthConfig::from_env();
//! config.validate()?;
//!
//! let store = repository_from_config(&config.session)?;
//! let provider = Arc::new(ProviderClient::new(config.provider.oauth_settings()?)?);
//! let exchanger = AuthorizationCodeExchanger::new(provider.clone(), store.clone());
//! let refresher = TokenRefresher::new(store).with_provider(provider);
//!
//! // Callback: complete the login and send `out` back as Set-Cookie headers
//! let ctx = RequestContext::from_cookie_headers(["oauth_state=abc"]);
//! let mut out = ResponseContext::new();
//! let params = CallbackParams { code: Some("code".into()), ..Default::default() };
//! exchanger.complete(&params, &ctx, &mut out).await?;
//!
//! // Later requests: get a usable bearer token
//! let token = refresher.ensure_valid_access_token(&ctx, &mut out).await;
//! # Ok(())
//! # }
//! ```

pub mod claims;
#[cfg(feature = "oauth")]
pub mod client;
pub mod config;
pub mod error;
pub mod exchanger;
pub mod guard;
#[cfg(feature = "jwt")]
pub mod jwt;
pub mod provider;
pub mod refresher;
pub mod session;
pub mod state;
pub mod store;

// Re-export main types
pub use claims::{LegacySignedToken, LegacyTokenClaims, RestDescriptor};
pub use config::{AuthConfig, OAuthSettings, ProviderConfig, SessionBackend, SessionConfig};
pub use error::{AuthError, AuthResult};
pub use exchanger::{AuthorizationCodeExchanger, AuthorizationRequest, CallbackParams, ExchangeStage};
pub use guard::{GuardDecision, SessionGuard};
pub use provider::{OAuthProviderClient, TokenResponse, UserInfoResponse};
pub use refresher::{AccessTokenOutcome, SessionAccess, TokenRefresher};
pub use session::{Credential, LegacyCredential, OAuthCredential, Session, SessionStatus};
pub use state::{StateToken, StateTokenGuard};
pub use store::{
    repository_from_config, EncryptedCookieStore, MemorySessionStore, RequestContext,
    ResponseContext, SessionRepository,
};

#[cfg(feature = "oauth")]
pub use client::ProviderClient;

#[cfg(feature = "jwt")]
pub use jwt::{verify_legacy_token, LegacyTokenIssuer, LegacyTokenVerifier, TestTokenOptions};
