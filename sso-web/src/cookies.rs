//! Bridges between axum headers and the framework-free cookie contexts.

use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, HeaderValue};
use axum::response::{IntoResponse, Response};
use sso_auth::{RequestContext, ResponseContext};
use tracing::warn;

/// Cookies sent with the request.
pub fn request_context(headers: &HeaderMap) -> RequestContext {
    RequestContext::from_cookie_headers(
        headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok()),
    )
}

/// Render `response` with the queued cookies as `Set-Cookie` headers.
pub fn with_cookies(out: &ResponseContext, response: impl IntoResponse) -> Response {
    let mut response = response.into_response();
    for value in out.set_cookie_headers() {
        match HeaderValue::from_str(&value) {
            Ok(value) => {
                response.headers_mut().append(SET_COOKIE, value);
            }
            Err(e) => warn!("Dropping unencodable cookie: {}", e),
        }
    }
    response
}
