//! Session record
//!
//! The durable authenticated record every other component reads. It is
//! always persisted as a whole: stores encode and decode the full record,
//! never individual fields.
//!
//! Lifecycle:
//!
//! ```text
//! empty ──(code exchange | legacy token)──→ authenticated
//!   ↑                                          │  refresh: access token,
//!   └──────────────── logout ──────────────────┘  expiry, refresh token,
//!                                                  API root only
//! ```

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sso_identity::{Organization, UserIdentity};

/// The authenticated session.
///
/// `is_authenticated()` only reports `true` when the flag is set *and* the
/// identity and organization are present, so a record that somehow lost
/// either is treated as logged out.
///
/// # Example
///
/// ```rust
/// use sso_auth::session::{OAuthCredential, Session};
/// use sso_identity::{Organization, UserIdentity};
///
/// let session = Session::oauth(
///     UserIdentity::new(12345, "user@example.com"),
///     Organization::new(100000001),
///     OAuthCredential::new("access", Some("refresh".to_string()), Some(3600), None),
/// );
/// assert!(session.is_authenticated());
/// assert_eq!(session.access_token(), Some("access"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    #[serde(default)]
    is_authenticated: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    identity: Option<UserIdentity>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    organization: Option<Organization>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    credential: Option<Credential>,
}

impl Session {
    /// An empty, unauthenticated session.
    pub fn empty() -> Self {
        Self::default()
    }

    /// An authenticated session produced by the authorization-code flow.
    pub fn oauth(
        identity: UserIdentity,
        organization: Organization,
        credential: OAuthCredential,
    ) -> Self {
        Self {
            is_authenticated: true,
            identity: Some(identity),
            organization: Some(organization),
            credential: Some(Credential::OAuth(credential)),
        }
    }

    /// An authenticated session produced by the legacy signed-token flow.
    pub fn legacy(
        identity: UserIdentity,
        organization: Organization,
        credential: LegacyCredential,
    ) -> Self {
        Self {
            is_authenticated: true,
            identity: Some(identity),
            organization: Some(organization),
            credential: Some(Credential::Legacy(credential)),
        }
    }

    /// Whether the session belongs to a signed-in user.
    pub fn is_authenticated(&self) -> bool {
        self.is_authenticated && self.identity.is_some() && self.organization.is_some()
    }

    /// Signed-in user.
    pub fn identity(&self) -> Option<&UserIdentity> {
        self.identity.as_ref()
    }

    /// Tenant of the signed-in user.
    pub fn organization(&self) -> Option<&Organization> {
        self.organization.as_ref()
    }

    /// Stored credential material.
    pub fn credential(&self) -> Option<&Credential> {
        self.credential.as_ref()
    }

    /// OAuth credential, if this session came from the code flow.
    pub fn oauth_credential(&self) -> Option<&OAuthCredential> {
        match &self.credential {
            Some(Credential::OAuth(c)) => Some(c),
            _ => None,
        }
    }

    pub(crate) fn oauth_credential_mut(&mut self) -> Option<&mut OAuthCredential> {
        match &mut self.credential {
            Some(Credential::OAuth(c)) => Some(c),
            _ => None,
        }
    }

    /// Bearer access token, if any.
    pub fn access_token(&self) -> Option<&str> {
        self.oauth_credential()
            .map(|c| c.access_token.as_str())
            .filter(|t| !t.is_empty())
    }

    /// Access-token expiry in epoch milliseconds, if tracked.
    pub fn token_expires_at(&self) -> Option<i64> {
        self.oauth_credential().and_then(|c| c.token_expires_at)
    }

    /// Whether the session holds credentials usable for Provider API calls.
    pub fn has_api_access(&self) -> bool {
        match &self.credential {
            Some(Credential::OAuth(c)) => !c.access_token.is_empty(),
            Some(Credential::Legacy(c)) => !c.refresh_token.is_empty(),
            None => false,
        }
    }

    /// Clear every field (logout).
    pub fn destroy(&mut self) {
        *self = Self::empty();
    }
}

/// Credential material, one variant per login flow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Credential {
    /// Authorization-code flow tokens
    #[serde(rename = "oauth")]
    OAuth(OAuthCredential),

    /// Legacy signed-token API descriptors
    #[serde(rename = "legacy")]
    Legacy(LegacyCredential),
}

/// Tokens from the authorization-code flow.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OAuthCredential {
    /// Bearer token for Provider REST calls
    pub access_token: String,

    /// Token used to obtain a new access token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    /// Absolute access-token expiry, epoch milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_expires_at: Option<i64>,

    /// Tenant-specific REST root returned with the token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_base_url: Option<String>,
}

impl OAuthCredential {
    /// Create a credential from a token response.
    ///
    /// `expires_in` is in seconds and converted to an absolute
    /// epoch-milliseconds expiry measured from now.
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: Option<String>,
        expires_in: Option<i64>,
        api_base_url: Option<String>,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token,
            token_expires_at: expires_in.map(expires_at_from_now),
            api_base_url,
        }
    }

    /// Milliseconds until expiry (negative once expired).
    pub fn millis_until_expiry(&self, now_millis: i64) -> Option<i64> {
        self.token_expires_at.map(|exp| exp - now_millis)
    }
}

impl std::fmt::Debug for OAuthCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthCredential")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "[REDACTED]"))
            .field("token_expires_at", &self.token_expires_at)
            .field("api_base_url", &self.api_base_url)
            .finish()
    }
}

/// Static API descriptors from the legacy signed token.
///
/// No expiry is tracked; they stay valid until logout.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyCredential {
    /// Tenant auth endpoint
    pub auth_endpoint: String,

    /// Tenant REST endpoint base
    pub api_endpoint: String,

    /// Refresh token for the tenant auth endpoint
    pub refresh_token: String,
}

impl std::fmt::Debug for LegacyCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LegacyCredential")
            .field("auth_endpoint", &self.auth_endpoint)
            .field("api_endpoint", &self.api_endpoint)
            .field("refresh_token", &"[REDACTED]")
            .finish()
    }
}

/// Current time in epoch milliseconds.
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// `now + expires_in * 1000`.
pub fn expires_at_from_now(expires_in_secs: i64) -> i64 {
    now_millis() + expires_in_secs.saturating_mul(1000)
}

/// Public view of a session for the status endpoint.
///
/// Never carries tokens. A logged-out session serializes to exactly
/// `{"isLoggedIn": false}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatus {
    /// Whether a user is signed in
    pub is_logged_in: bool,

    /// Signed-in user
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<UserIdentity>,

    /// Tenant
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization: Option<Organization>,

    /// Whether Provider API credentials are present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_api_access: Option<bool>,

    /// Access-token expiry, epoch milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_expires_at: Option<i64>,
}

impl SessionStatus {
    /// Status of a logged-out visitor.
    pub fn anonymous() -> Self {
        Self {
            is_logged_in: false,
            user: None,
            organization: None,
            has_api_access: None,
            token_expires_at: None,
        }
    }
}

impl From<&Session> for SessionStatus {
    fn from(session: &Session) -> Self {
        if !session.is_authenticated() {
            return Self::anonymous();
        }

        Self {
            is_logged_in: true,
            user: session.identity().cloned(),
            organization: session.organization().cloned(),
            has_api_access: Some(session.has_api_access()),
            token_expires_at: session.token_expires_at(),
        }
    }
}
