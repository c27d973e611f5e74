//! Bearer-token access for handlers that call Provider REST APIs.
//!
//! ```rust,ignore
//! async fn list_assets(State(state): State<AppState>, headers: HeaderMap) -> WebResult<Response> {
//!     let access = require_api_access(&state, &headers).await?;
//!     let body = fetch(&access.access_token, access.api_base_url.as_deref()).await;
//!     Ok(access.apply(Json(body)))
//! }
//! ```

use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use sso_auth::{AccessTokenOutcome, ResponseContext};
use tracing::debug;

use crate::cookies::{request_context, with_cookies};
use crate::error::WebError;
use crate::state::AppState;

/// A usable Provider access token for the current request.
#[derive(Debug)]
pub struct ApiAccess {
    /// Bearer token
    pub access_token: String,

    /// Tenant REST base URL, when the Provider sent one
    pub api_base_url: Option<String>,

    /// Cookies to send back (a refreshed session record)
    pub set_cookies: ResponseContext,
}

impl ApiAccess {
    /// Render `response` with any refreshed session cookie.
    pub fn apply(&self, response: impl IntoResponse) -> Response {
        with_cookies(&self.set_cookies, response)
    }
}

/// Resolve a valid access token, refreshing it when close to expiry.
///
/// Fails with 401 `UNAUTHORIZED` for a missing session and 401
/// `REFRESH_FAILED` when the refresh grant was rejected. Server faults
/// such as a missing OAuth client answer 500.
pub async fn require_api_access(state: &AppState, headers: &HeaderMap) -> Result<ApiAccess, WebError> {
    let ctx = request_context(headers);
    let mut out = ResponseContext::new();
    let access = state.refresher.ensure_access(&ctx, &mut out).await;

    let access_token = match access.outcome {
        AccessTokenOutcome::Valid(token) | AccessTokenOutcome::Refreshed(token) => token,
        AccessTokenOutcome::Unauthenticated => {
            return Err(WebError::Unauthorized { code: "UNAUTHORIZED" })
        }
        AccessTokenOutcome::RefreshFailed(e) if e.is_server_error() => {
            return Err(WebError::Auth(e));
        }
        AccessTokenOutcome::RefreshFailed(e) => {
            debug!(code = e.error_code(), "Refresh failed, re-authentication required");
            return Err(WebError::Unauthorized { code: "REFRESH_FAILED" });
        }
    };

    let api_base_url = access
        .session
        .oauth_credential()
        .and_then(|c| c.api_base_url.clone());

    Ok(ApiAccess {
        access_token,
        api_base_url,
        set_cookies: out,
    })
}
