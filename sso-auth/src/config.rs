//! SSO configuration.
//!
//! Provides one explicit configuration value for every component: Provider
//! endpoints and client credentials, the legacy signing secret, and session
//! cookie settings. Configuration is loaded from environment variables once
//! at startup with sensible defaults for local development; components only
//! ever receive it through their constructors.
//!
//! Values required by only one flow (e.g. the OAuth client secret) are
//! optional here and checked by the operation that needs them, so a missing
//! value surfaces as [`AuthError::ConfigMissing`] at that point.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{AuthError, AuthResult};

/// Default cookie name for the encrypted session.
pub const DEFAULT_SESSION_COOKIE: &str = "mc_app_session";

/// Longest accepted session lifetime, in days.
pub const MAX_SESSION_TTL_DAYS: i64 = 3650;

/// Minimum length of the session password, in bytes.
pub const MIN_SESSION_PASSWORD_LEN: usize = 32;

const DEV_SESSION_PASSWORD: &str = "complex_password_at_least_32_characters_long_for_dev";

/// Top-level configuration for the SSO components.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Provider endpoints and client credentials.
    pub provider: ProviderConfig,

    /// Session cookie settings.
    pub session: SessionConfig,

    /// Production mode: secure cookies, no dev-only endpoints.
    pub production: bool,
}

impl Default for AuthConfig {
    /// Returns default configuration suitable for local development.
    fn default() -> Self {
        Self {
            provider: ProviderConfig::default(),
            session: SessionConfig::default(),
            production: false,
        }
    }
}

impl AuthConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `MC_AUTH_BASE_URI`: Provider auth base URI (token, userinfo, authorize)
    /// - `MC_CLIENT_ID`: OAuth client id
    /// - `MC_CLIENT_SECRET`: OAuth client secret
    /// - `MC_REDIRECT_URI`: OAuth callback URI (default: `{APP_URL}/api/auth/callback`)
    /// - `APP_URL`: Public origin of the app (default: http://localhost:3000)
    /// - `MC_JWT_SIGNING_SECRET`: Legacy signed-token HMAC secret
    /// - `PROVIDER_TIMEOUT_SECS`: Provider request timeout (default: 30)
    /// - `SESSION_PASSWORD`: Session encryption password, at least 32 bytes
    /// - `SESSION_COOKIE_NAME`: Session cookie name (default: mc_app_session)
    /// - `SESSION_TTL_DAYS`: Session cookie lifetime (default: 14)
    /// - `SESSION_BACKEND`: `cookie` (default) or `memory`
    /// - `APP_ENV`: `production` enables secure cookies
    pub fn from_env() -> Self {
        let default = Self::default();
        let production = std::env::var("APP_ENV")
            .map(|s| s.eq_ignore_ascii_case("production"))
            .unwrap_or(default.production);

        Self {
            provider: ProviderConfig {
                auth_base_uri: non_empty_var("MC_AUTH_BASE_URI"),
                client_id: non_empty_var("MC_CLIENT_ID"),
                client_secret: non_empty_var("MC_CLIENT_SECRET"),
                redirect_uri: non_empty_var("MC_REDIRECT_URI"),
                app_url: non_empty_var("APP_URL").unwrap_or(default.provider.app_url),
                jwt_signing_secret: non_empty_var("MC_JWT_SIGNING_SECRET"),
                timeout_secs: std::env::var("PROVIDER_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(default.provider.timeout_secs),
            },
            session: SessionConfig {
                password: non_empty_var("SESSION_PASSWORD").unwrap_or(default.session.password),
                cookie_name: non_empty_var("SESSION_COOKIE_NAME")
                    .unwrap_or(default.session.cookie_name),
                ttl_days: std::env::var("SESSION_TTL_DAYS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(default.session.ttl_days),
                backend: std::env::var("SESSION_BACKEND")
                    .ok()
                    .and_then(|s| SessionBackend::parse(&s))
                    .unwrap_or(default.session.backend),
                secure: production,
            },
            production,
        }
    }

    /// Validate settings that must hold before serving any request.
    pub fn validate(&self) -> AuthResult<()> {
        if self.session.password.len() < MIN_SESSION_PASSWORD_LEN {
            return Err(AuthError::ConfigMissing(format!(
                "SESSION_PASSWORD must be at least {} bytes",
                MIN_SESSION_PASSWORD_LEN
            )));
        }
        self.session.ttl()?;
        if self.production && self.session.password == DEV_SESSION_PASSWORD {
            return Err(AuthError::ConfigMissing(
                "SESSION_PASSWORD must be set in production".to_string(),
            ));
        }
        Ok(())
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Provider endpoint and client configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Auth base URI (e.g. "https://mcxxxx.auth.marketingcloudapis.com").
    pub auth_base_uri: Option<String>,

    /// OAuth client id.
    pub client_id: Option<String>,

    /// OAuth client secret.
    pub client_secret: Option<String>,

    /// Explicit OAuth redirect URI.
    pub redirect_uri: Option<String>,

    /// Public origin of this app.
    pub app_url: String,

    /// Legacy signed-token shared secret.
    pub jwt_signing_secret: Option<String>,

    /// Provider request timeout in seconds.
    pub timeout_secs: u64,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("auth_base_uri", &self.auth_base_uri)
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "[REDACTED]"))
            .field("redirect_uri", &self.redirect_uri)
            .field("app_url", &self.app_url)
            .field(
                "jwt_signing_secret",
                &self.jwt_signing_secret.as_ref().map(|_| "[REDACTED]"),
            )
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            auth_base_uri: None,
            client_id: None,
            client_secret: None,
            redirect_uri: None,
            app_url: "http://localhost:3000".to_string(),
            jwt_signing_secret: None,
            timeout_secs: 30,
        }
    }
}

impl ProviderConfig {
    /// Resolve the settings needed by the OAuth flow and token refresh.
    ///
    /// Fails with [`AuthError::ConfigMissing`] naming every absent variable.
    pub fn oauth_settings(&self) -> AuthResult<OAuthSettings> {
        let mut missing = Vec::new();
        if self.auth_base_uri.is_none() {
            missing.push("MC_AUTH_BASE_URI");
        }
        if self.client_id.is_none() {
            missing.push("MC_CLIENT_ID");
        }
        if self.client_secret.is_none() {
            missing.push("MC_CLIENT_SECRET");
        }
        if !missing.is_empty() {
            return Err(AuthError::ConfigMissing(missing.join(", ")));
        }

        Ok(OAuthSettings {
            auth_base_uri: self.auth_base_uri.clone().unwrap_or_default(),
            client_id: self.client_id.clone().unwrap_or_default(),
            client_secret: self.client_secret.clone().unwrap_or_default(),
            redirect_uri: self.redirect_uri(),
            timeout: self.timeout(),
        })
    }

    /// The legacy signing secret.
    pub fn jwt_secret(&self) -> AuthResult<&str> {
        self.jwt_signing_secret
            .as_deref()
            .ok_or_else(|| AuthError::ConfigMissing("MC_JWT_SIGNING_SECRET".to_string()))
    }

    /// Redirect URI, explicit or derived from the app origin.
    pub fn redirect_uri(&self) -> String {
        self.redirect_uri
            .clone()
            .unwrap_or_else(|| join_url(&self.app_url, "/api/auth/callback"))
    }

    /// Get the Provider request timeout as a Duration.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Resolved OAuth client settings.
///
/// Holding one proves every required value was configured.
#[derive(Clone, Serialize, Deserialize)]
pub struct OAuthSettings {
    /// Auth base URI.
    pub auth_base_uri: String,

    /// OAuth client id.
    pub client_id: String,

    /// OAuth client secret.
    pub client_secret: String,

    /// Redirect URI sent on authorize and on code exchange.
    pub redirect_uri: String,

    /// Provider request timeout.
    pub timeout: Duration,
}

impl std::fmt::Debug for OAuthSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthSettings")
            .field("auth_base_uri", &self.auth_base_uri)
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("redirect_uri", &self.redirect_uri)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl OAuthSettings {
    /// Create settings directly (tests, embedding apps).
    pub fn new(
        auth_base_uri: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        redirect_uri: impl Into<String>,
    ) -> Self {
        Self {
            auth_base_uri: auth_base_uri.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            redirect_uri: redirect_uri.into(),
            timeout: Duration::from_secs(30),
        }
    }

    /// Build a full Provider URL by appending a path to the auth base URI.
    pub fn url(&self, path: &str) -> String {
        join_url(&self.auth_base_uri, path)
    }

    /// Token endpoint: `{authBaseUri}/v2/token`.
    pub fn token_url(&self) -> String {
        self.url("/v2/token")
    }

    /// User-info endpoint: `{authBaseUri}/v2/userinfo`.
    pub fn userinfo_url(&self) -> String {
        self.url("/v2/userinfo")
    }

    /// Authorize endpoint: `{authBaseUri}/v2/authorize`.
    pub fn authorize_url(&self) -> String {
        self.url("/v2/authorize")
    }
}

fn join_url(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    format!("{}/{}", base, path)
}

/// Where session records live.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SessionBackend {
    /// Whole record in an encrypted cookie
    Cookie,
    /// Server-side map keyed by a signed id cookie
    Memory,
}

impl SessionBackend {
    /// Parse from string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "cookie" => Some(SessionBackend::Cookie),
            "memory" => Some(SessionBackend::Memory),
            _ => None,
        }
    }
}

/// Session cookie settings.
#[derive(Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Password the cookie encryption key is derived from.
    pub password: String,

    /// Session cookie name.
    pub cookie_name: String,

    /// Session cookie lifetime in days.
    pub ttl_days: i64,

    /// Storage backend.
    pub backend: SessionBackend,

    /// Mark cookies `Secure`.
    pub secure: bool,
}

impl std::fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionConfig")
            .field("password", &"[REDACTED]")
            .field("cookie_name", &self.cookie_name)
            .field("ttl_days", &self.ttl_days)
            .field("backend", &self.backend)
            .field("secure", &self.secure)
            .finish()
    }
}

impl SessionConfig {
    /// Session lifetime, or `ConfigMissing` when `ttl_days` is outside
    /// `1..=MAX_SESSION_TTL_DAYS`.
    pub fn ttl(&self) -> AuthResult<Duration> {
        if !(1..=MAX_SESSION_TTL_DAYS).contains(&self.ttl_days) {
            return Err(AuthError::ConfigMissing(format!(
                "SESSION_TTL_DAYS must be between 1 and {}",
                MAX_SESSION_TTL_DAYS
            )));
        }
        Ok(Duration::from_secs(self.ttl_days as u64 * 86_400))
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            password: DEV_SESSION_PASSWORD.to_string(),
            cookie_name: DEFAULT_SESSION_COOKIE.to_string(),
            ttl_days: 14,
            backend: SessionBackend::Cookie,
            secure: false,
        }
    }
}
