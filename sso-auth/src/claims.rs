//! Legacy signed-token claims
//!
//! The Provider's legacy handshake posts an HS256 token whose `request`
//! object carries the user, the organization and the tenant REST
//! descriptors. The decoded shape keeps every sub-object optional so that
//! a token missing one is reported as a malformed payload rather than a
//! generic decode failure.

use serde::{Deserialize, Serialize};
use sso_identity::{Organization, UserIdentity};

use crate::error::{AuthError, AuthResult};
use crate::session::{LegacyCredential, Session};

/// Raw claims as found in the token.
///
/// # Example
///
/// ```rust
/// use sso_auth::claims::LegacyTokenClaims;
///
/// let claims: LegacyTokenClaims = serde_json::from_value(serde_json::json!({
///     "exp": 1700000000,
///     "request": { "user": { "id": 1, "email": "a@example.com" } }
/// })).unwrap();
///
/// assert!(claims.into_token().is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LegacyTokenClaims {
    /// Expiration time (Unix timestamp, seconds)
    pub exp: i64,

    /// Token id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,

    /// Embedded login payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request: Option<LegacyRequest>,
}

/// The `request` object of a legacy token.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyRequest {
    /// Payload schema version
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claims_version: Option<u32>,

    /// Tenant REST descriptors
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rest: Option<RestDescriptor>,

    /// Signed-in user
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<UserIdentity>,

    /// Tenant
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization: Option<Organization>,

    /// Installed application
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application: Option<ApplicationInfo>,
}

/// Tenant REST descriptors.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestDescriptor {
    /// Tenant auth endpoint
    pub auth_endpoint: String,

    /// Tenant REST endpoint base
    pub api_endpoint_base: String,

    /// Refresh token for the tenant auth endpoint
    pub refresh_token: String,
}

impl std::fmt::Debug for RestDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestDescriptor")
            .field("auth_endpoint", &self.auth_endpoint)
            .field("api_endpoint_base", &self.api_endpoint_base)
            .field("refresh_token", &"[REDACTED]")
            .finish()
    }
}

/// Installed application descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationInfo {
    /// Application id
    pub id: String,

    /// Installed package
    pub package: String,

    /// Redirect URL registered for the app
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect_url: Option<String>,

    /// Feature flags
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub features: Option<serde_json::Map<String, serde_json::Value>>,

    /// Permissions granted to the user
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub user_permissions: Vec<String>,
}

/// A verified legacy token with every mandatory part present.
#[derive(Debug, Clone)]
pub struct LegacySignedToken {
    /// Expiration time (Unix timestamp, seconds)
    pub exp: i64,

    /// Token id
    pub jti: Option<String>,

    /// Payload schema version
    pub claims_version: Option<u32>,

    /// Signed-in user
    pub user: UserIdentity,

    /// Tenant
    pub organization: Organization,

    /// Tenant REST descriptors
    pub rest: RestDescriptor,

    /// Installed application
    pub application: Option<ApplicationInfo>,
}

impl LegacyTokenClaims {
    /// Require the `request`, `user`, `organization` and `rest` parts.
    pub fn into_token(self) -> AuthResult<LegacySignedToken> {
        let request = self
            .request
            .ok_or_else(|| AuthError::MalformedPayload("missing request payload".to_string()))?;
        let user = request
            .user
            .ok_or_else(|| AuthError::MalformedPayload("missing user information".to_string()))?;
        let organization = request.organization.ok_or_else(|| {
            AuthError::MalformedPayload("missing organization information".to_string())
        })?;
        let rest = request
            .rest
            .ok_or_else(|| AuthError::MalformedPayload("missing REST API information".to_string()))?;

        Ok(LegacySignedToken {
            exp: self.exp,
            jti: self.jti,
            claims_version: request.claims_version,
            user,
            organization,
            rest,
            application: request.application,
        })
    }
}

impl LegacySignedToken {
    /// Authenticated session for this token.
    ///
    /// The REST descriptors become long-lived credentials; the token's own
    /// expiry is not carried over.
    pub fn into_session(self) -> Session {
        Session::legacy(
            self.user,
            self.organization,
            LegacyCredential {
                auth_endpoint: self.rest.auth_endpoint,
                api_endpoint: self.rest.api_endpoint_base,
                refresh_token: self.rest.refresh_token,
            },
        )
    }
}
