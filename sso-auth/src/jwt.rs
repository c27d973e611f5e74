//! Legacy signed-token verification and issuance
//!
//! Tokens are HS256 with a shared secret taken from the installed-package
//! configuration. Verification checks the signature and `exp` with no
//! leeway, then requires the `user`, `organization` and `rest` parts of
//! the payload.

use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use tracing::{debug, warn};

use crate::claims::{
    ApplicationInfo, LegacyRequest, LegacySignedToken, LegacyTokenClaims, RestDescriptor,
};
use crate::config::ProviderConfig;
use crate::error::{AuthError, AuthResult};
use sso_identity::{Organization, Timezone, UserIdentity};

/// Verifies legacy signed tokens.
pub struct LegacyTokenVerifier {
    decoding_key: DecodingKey,
}

impl std::fmt::Debug for LegacyTokenVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LegacyTokenVerifier")
            .field("decoding_key", &"[REDACTED]")
            .finish()
    }
}

impl LegacyTokenVerifier {
    /// Create a verifier for the shared secret.
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self {
            decoding_key: DecodingKey::from_secret(secret.as_ref()),
        }
    }

    /// Create a verifier from configuration.
    ///
    /// Fails with `ConfigMissing` when no signing secret is configured.
    pub fn from_config(config: &ProviderConfig) -> AuthResult<Self> {
        Ok(Self::new(config.jwt_secret()?))
    }

    /// Verify a raw token and decode its payload.
    ///
    /// # Errors
    ///
    /// - `SignatureInvalid` for a bad signature, a non-HS256 header or a
    ///   token that is not a JWT at all
    /// - `TokenExpired` once `exp` has passed
    /// - `MalformedPayload` when `exp`, `request`, `user`, `organization`
    ///   or `rest` is missing or has the wrong shape
    pub fn verify(&self, raw: &str) -> AuthResult<LegacySignedToken> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_aud = false;

        let claims = decode::<LegacyTokenClaims>(raw.trim(), &self.decoding_key, &validation)
            .map_err(|e| {
                let err = map_decode_error(e);
                warn!("Legacy token rejected: {}", err);
                err
            })?
            .claims;

        let token = claims.into_token().map_err(|e| {
            warn!("Legacy token rejected: {}", e);
            e
        })?;

        debug!(jti = ?token.jti, "Legacy token verified");
        Ok(token)
    }
}

/// Verify `raw` with `secret` in one call.
pub fn verify_legacy_token(raw: &str, secret: &str) -> AuthResult<LegacySignedToken> {
    LegacyTokenVerifier::new(secret).verify(raw)
}

fn map_decode_error(e: jsonwebtoken::errors::Error) -> AuthError {
    use jsonwebtoken::errors::ErrorKind;

    match e.kind() {
        ErrorKind::ExpiredSignature => AuthError::TokenExpired,
        ErrorKind::InvalidSignature => AuthError::SignatureInvalid("Invalid signature".to_string()),
        ErrorKind::InvalidAlgorithm => {
            AuthError::SignatureInvalid("Unexpected algorithm".to_string())
        }
        ErrorKind::InvalidToken | ErrorKind::Base64(_) | ErrorKind::Utf8(_) => {
            AuthError::SignatureInvalid("Malformed token".to_string())
        }
        ErrorKind::Json(_) => AuthError::MalformedPayload(e.to_string()),
        ErrorKind::MissingRequiredClaim(claim) => {
            AuthError::MalformedPayload(format!("missing {} claim", claim))
        }
        _ => AuthError::SignatureInvalid(e.to_string()),
    }
}

/// Inputs for a development test token.
#[derive(Debug, Clone)]
pub struct TestTokenOptions {
    /// User id
    pub user_id: i64,

    /// User email
    pub email: String,

    /// Business unit id
    pub mid: i64,

    /// Enterprise id
    pub eid: i64,

    /// Lifetime in seconds (negative for an already expired token)
    pub ttl_secs: i64,

    /// Tenant auth endpoint
    pub auth_endpoint: String,

    /// Tenant REST endpoint base
    pub api_endpoint_base: String,
}

impl Default for TestTokenOptions {
    fn default() -> Self {
        Self {
            user_id: 12345,
            email: "test@example.com".to_string(),
            mid: 100000001,
            eid: 100000000,
            ttl_secs: 3600,
            auth_endpoint: "https://YOUR_SUBDOMAIN.auth.marketingcloudapis.com/".to_string(),
            api_endpoint_base: "https://YOUR_SUBDOMAIN.rest.marketingcloudapis.com/".to_string(),
        }
    }
}

/// Signs legacy tokens for local development and tests.
pub struct LegacyTokenIssuer {
    encoding_key: EncodingKey,
}

impl std::fmt::Debug for LegacyTokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LegacyTokenIssuer")
            .field("encoding_key", &"[REDACTED]")
            .finish()
    }
}

impl LegacyTokenIssuer {
    /// Create an issuer for the shared secret.
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_ref()),
        }
    }

    /// Sign a complete test token.
    pub fn issue(&self, options: &TestTokenOptions) -> AuthResult<String> {
        self.sign(&Self::test_claims(options))
    }

    /// Sign arbitrary claims.
    pub fn sign(&self, claims: &LegacyTokenClaims) -> AuthResult<String> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|e| AuthError::Internal(format!("Token encoding failed: {}", e)))
    }

    /// Claims of a complete test token.
    pub fn test_claims(options: &TestTokenOptions) -> LegacyTokenClaims {
        let now = Utc::now();
        let user = UserIdentity::new(options.user_id, options.email.clone())
            .with_culture("en-US")
            .with_timezone(Timezone {
                short_name: "EST".to_string(),
                long_name: "Eastern Standard Time".to_string(),
                offset: -5.0,
                dst: true,
            });

        let mut organization = Organization::new(options.mid)
            .with_enterprise_id(options.eid)
            .with_stack_key("S1")
            .with_region("NA1");
        organization.data_context = Some("core".to_string());

        LegacyTokenClaims {
            exp: now.timestamp() + options.ttl_secs,
            jti: Some(format!("test-{}", now.timestamp_millis())),
            request: Some(LegacyRequest {
                claims_version: Some(2),
                rest: Some(RestDescriptor {
                    auth_endpoint: options.auth_endpoint.clone(),
                    api_endpoint_base: options.api_endpoint_base.clone(),
                    refresh_token: "test-refresh-token-for-development".to_string(),
                }),
                user: Some(user),
                organization: Some(organization),
                application: Some(ApplicationInfo {
                    id: "test-app-id".to_string(),
                    package: "test-package".to_string(),
                    redirect_url: None,
                    features: None,
                    user_permissions: Vec::new(),
                }),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "legacy-signing-secret";

    #[test]
    fn test_issue_and_verify() {
        let token = LegacyTokenIssuer::new(SECRET)
            .issue(&TestTokenOptions::default())
            .unwrap();
        let verified = LegacyTokenVerifier::new(SECRET).verify(&token).unwrap();

        assert_eq!(verified.user.email, "test@example.com");
        assert_eq!(verified.organization.id.as_i64(), Some(100000001));
        assert_eq!(verified.claims_version, Some(2));
        assert!(verified.jti.unwrap().starts_with("test-"));
    }

    #[test]
    fn test_wrong_secret_is_signature_invalid() {
        let token = LegacyTokenIssuer::new("other-secret")
            .issue(&TestTokenOptions::default())
            .unwrap();
        let err = LegacyTokenVerifier::new(SECRET).verify(&token).unwrap_err();
        assert_eq!(err.error_code(), "SIGNATURE_INVALID");
    }

    #[test]
    fn test_garbage_is_signature_invalid() {
        let err = verify_legacy_token("not-a-jwt", SECRET).unwrap_err();
        assert!(matches!(err, AuthError::SignatureInvalid(_)));
    }

    #[test]
    fn test_other_algorithm_rejected() {
        let claims = LegacyTokenIssuer::test_claims(&TestTokenOptions::default());
        let token = encode(
            &Header::new(Algorithm::HS512),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();

        let err = verify_legacy_token(&token, SECRET).unwrap_err();
        assert!(matches!(err, AuthError::SignatureInvalid(_)));
    }

    #[test]
    fn test_expired_token() {
        let options = TestTokenOptions {
            ttl_secs: -120,
            ..Default::default()
        };
        let token = LegacyTokenIssuer::new(SECRET).issue(&options).unwrap();
        let err = verify_legacy_token(&token, SECRET).unwrap_err();
        assert!(matches!(err, AuthError::TokenExpired));
    }

    #[test]
    fn test_missing_organization_is_malformed() {
        let mut claims = LegacyTokenIssuer::test_claims(&TestTokenOptions::default());
        if let Some(request) = claims.request.as_mut() {
            request.organization = None;
        }
        let token = LegacyTokenIssuer::new(SECRET).sign(&claims).unwrap();

        let err = verify_legacy_token(&token, SECRET).unwrap_err();
        assert_eq!(err.error_code(), "MALFORMED_PAYLOAD");
    }

    #[test]
    fn test_wrong_shape_is_malformed() {
        let claims = serde_json::json!({
            "exp": Utc::now().timestamp() + 60,
            "request": { "user": { "id": 1 } }
        });
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();

        let err = verify_legacy_token(&token, SECRET).unwrap_err();
        assert!(matches!(err, AuthError::MalformedPayload(_)));
    }

    #[test]
    fn test_from_config_requires_secret() {
        let err = LegacyTokenVerifier::from_config(&ProviderConfig::default()).unwrap_err();
        assert!(err.is_server_error());
    }
}
