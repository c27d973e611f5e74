//! Error types for SSO operations
//!
//! This module defines every failure the login flows, the session store and
//! the token refresher can report. `Display` output may carry diagnostic
//! detail (HTTP status, Provider response body) and is meant for server
//! logs; [`AuthError::user_message`] is the only text safe for a browser.

use thiserror::Error;

/// SSO error types.
///
/// These errors cover both login handshakes, Provider HTTP failures,
/// session persistence and configuration issues.
#[derive(Debug, Error)]
pub enum AuthError {
    /// OAuth callback arrived without an authorization code
    #[error("Missing authorization code")]
    MissingCode,

    /// The Provider reported an error on the callback
    #[error("Provider error: {error}{}", description_suffix(.description))]
    ProviderError {
        /// `error` query parameter
        error: String,
        /// `error_description` query parameter
        description: Option<String>,
    },

    /// Callback `state` does not match the stored CSRF state
    #[error("State parameter mismatch")]
    InvalidState,

    /// Token endpoint rejected the authorization code
    #[error("Token exchange failed ({}): {detail}", status_label(.status))]
    TokenExchangeFailed {
        /// HTTP status, if a response was received
        status: Option<u16>,
        /// Response body or transport error, for logs only
        detail: String,
    },

    /// User-info endpoint rejected the access token
    #[error("User info fetch failed ({}): {detail}", status_label(.status))]
    UserInfoFetchFailed {
        /// HTTP status, if a response was received
        status: Option<u16>,
        /// Response body or transport error, for logs only
        detail: String,
    },

    /// Legacy token signature did not verify
    #[error("Invalid token signature: {0}")]
    SignatureInvalid(String),

    /// Legacy token `exp` is in the past
    #[error("Token has expired")]
    TokenExpired,

    /// Legacy token verified but its payload is incomplete
    #[error("Malformed token payload: {0}")]
    MalformedPayload(String),

    /// Required secret or URI is not configured
    #[error("Configuration missing: {0}")]
    ConfigMissing(String),

    /// Refresh-token grant failed
    #[error("Token refresh failed: {0}")]
    RefreshFailed(String),

    /// Session record could not be written
    #[error("Session store error: {0}")]
    SessionStore(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

fn status_label(status: &Option<u16>) -> String {
    status.map_or_else(|| "no response".to_string(), |s| s.to_string())
}

fn description_suffix(description: &Option<String>) -> String {
    description
        .as_deref()
        .map(|d| format!(" - {}", d))
        .unwrap_or_default()
}

/// Result type for SSO operations.
pub type AuthResult<T> = Result<T, AuthError>;

impl AuthError {
    /// Check if this error is a server-side fault.
    ///
    /// Server faults answer with a 5xx instead of a login redirect, so a
    /// misconfiguration is never reported as a failed login.
    pub fn is_server_error(&self) -> bool {
        matches!(
            self,
            AuthError::ConfigMissing(_) | AuthError::SessionStore(_) | AuthError::Internal(_)
        )
    }

    /// Get HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            AuthError::MissingCode | AuthError::ProviderError { .. } | AuthError::InvalidState => {
                400
            }

            AuthError::SignatureInvalid(_)
            | AuthError::TokenExpired
            | AuthError::MalformedPayload(_)
            | AuthError::RefreshFailed(_) => 401,

            AuthError::TokenExchangeFailed { .. } | AuthError::UserInfoFetchFailed { .. } => 502,

            AuthError::ConfigMissing(_) | AuthError::SessionStore(_) | AuthError::Internal(_) => {
                500
            }
        }
    }

    /// Get error code for API responses.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::MissingCode => "MISSING_CODE",
            AuthError::ProviderError { .. } => "PROVIDER_ERROR",
            AuthError::InvalidState => "INVALID_STATE",
            AuthError::TokenExchangeFailed { .. } => "TOKEN_EXCHANGE_FAILED",
            AuthError::UserInfoFetchFailed { .. } => "USERINFO_FETCH_FAILED",
            AuthError::SignatureInvalid(_) => "SIGNATURE_INVALID",
            AuthError::TokenExpired => "TOKEN_EXPIRED",
            AuthError::MalformedPayload(_) => "MALFORMED_PAYLOAD",
            AuthError::ConfigMissing(_) => "CONFIG_MISSING",
            AuthError::RefreshFailed(_) => "REFRESH_FAILED",
            AuthError::SessionStore(_) => "SESSION_STORE_ERROR",
            AuthError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Human-readable reason safe to show to the end user.
    ///
    /// Never contains Provider response bodies, secrets or tokens. The
    /// Provider's own `error_description` is passed through because the
    /// Provider already sent it to the browser.
    pub fn user_message(&self) -> String {
        match self {
            AuthError::MissingCode => "Missing authorization code".to_string(),
            AuthError::ProviderError { error, description } => {
                description.clone().unwrap_or_else(|| error.clone())
            }
            AuthError::InvalidState => "Invalid state parameter".to_string(),
            AuthError::TokenExchangeFailed { .. } => "Token exchange failed".to_string(),
            AuthError::UserInfoFetchFailed { .. } => "Failed to fetch user info".to_string(),
            AuthError::SignatureInvalid(_) => "Invalid SSO token".to_string(),
            AuthError::TokenExpired => "SSO token has expired".to_string(),
            AuthError::MalformedPayload(_) => "Invalid SSO token payload".to_string(),
            AuthError::ConfigMissing(_) => "Server configuration error".to_string(),
            AuthError::RefreshFailed(_) => "Authentication required".to_string(),
            AuthError::SessionStore(_) | AuthError::Internal(_) => {
                "Authentication failed".to_string()
            }
        }
    }
}
