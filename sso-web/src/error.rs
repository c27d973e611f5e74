//! Error-to-response policy.
//!
//! - Login-flow failures redirect to the entry point with a safe reason in
//!   `?error=`; Provider bodies stay in the server log.
//! - Configuration and store faults are a 500 JSON body, never a login
//!   redirect.
//! - API callers without a usable token get a 401 JSON body.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use axum::Json;
use serde_json::json;
use sso_auth::AuthError;
use thiserror::Error;
use tracing::{error, warn};
use url::form_urlencoded;

/// Public entry point that login failures redirect to.
pub const LOGIN_ERROR_PATH: &str = "/";

/// Errors returned by handlers.
#[derive(Debug, Error)]
pub enum WebError {
    /// Login or configuration failure
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// No usable Provider access token
    #[error("Authentication required ({code})")]
    Unauthorized {
        /// `UNAUTHORIZED` or `REFRESH_FAILED`
        code: &'static str,
    },

    /// Endpoint disabled in this environment
    #[error("Forbidden: {0}")]
    Forbidden(String),
}

/// Result type for handlers.
pub type WebResult<T> = Result<T, WebError>;

/// `/?error=<reason>`.
pub fn login_error_location(reason: &str) -> String {
    let query: String = form_urlencoded::Serializer::new(String::new())
        .append_pair("error", reason)
        .finish();
    format!("{}?{}", LOGIN_ERROR_PATH, query)
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        match self {
            WebError::Auth(e) if e.is_server_error() => {
                error!(code = e.error_code(), error = %e, "Server-side auth failure");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": e.user_message(), "code": e.error_code() })),
                )
                    .into_response()
            }
            WebError::Auth(e) => {
                warn!(code = e.error_code(), error = %e, "Login failed");
                Redirect::to(&login_error_location(&e.user_message())).into_response()
            }
            WebError::Unauthorized { code } => (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "error": "Authentication required", "code": code })),
            )
                .into_response(),
            WebError::Forbidden(message) => {
                (StatusCode::FORBIDDEN, Json(json!({ "error": message }))).into_response()
            }
        }
    }
}
