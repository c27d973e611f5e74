//! Auth routes under `/api/auth`.
//!
//! | Route | Handler |
//! |-------|---------|
//! | `GET\|POST /api/auth/login` | [`login`] |
//! | `GET /api/auth/callback` | [`callback`] |
//! | `POST /api/auth/jwt` | [`legacy_login`] |
//! | `GET\|POST /api/auth/logout` | [`logout`] |
//! | `GET /api/auth/session` | [`session_status`] |
//! | `POST /api/auth/test-jwt` | [`test_jwt`] |

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use sso_auth::{AuthError, CallbackParams, LegacyTokenIssuer, ResponseContext, SessionStatus, TestTokenOptions};
use tracing::{info, instrument, warn};

use crate::cookies::{request_context, with_cookies};
use crate::error::{WebError, WebResult};
use crate::state::AppState;

/// Landing page after a successful login.
pub const DASHBOARD_PATH: &str = "/dashboard";

/// Router for all auth endpoints.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/api/auth/login", get(login).post(login))
        .route("/api/auth/callback", get(callback))
        .route("/api/auth/jwt", post(legacy_login))
        .route("/api/auth/logout", get(logout).post(logout))
        .route("/api/auth/session", get(session_status))
        .route("/api/auth/test-jwt", post(test_jwt))
}

/// Start the OAuth code flow.
///
/// A session that already holds a bearer token goes straight to the
/// dashboard; a legacy-only session may still upgrade through OAuth.
#[instrument(skip_all)]
pub async fn login(State(state): State<AppState>, headers: HeaderMap) -> WebResult<Response> {
    let ctx = request_context(&headers);
    let session = state.store.load(&ctx).await;
    if session.is_authenticated() && session.access_token().is_some() {
        return Ok(Redirect::to(DASHBOARD_PATH).into_response());
    }

    let exchanger = state.exchanger()?;
    let mut out = ResponseContext::new();
    let request = exchanger.begin(&mut out)?;

    Ok(with_cookies(&out, Redirect::to(&request.url)))
}

/// Provider redirect target of the code flow.
#[instrument(skip_all)]
pub async fn callback(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<CallbackParams>,
) -> Response {
    let exchanger = match state.exchanger() {
        Ok(exchanger) => exchanger,
        Err(e) => return WebError::from(e).into_response(),
    };

    let ctx = request_context(&headers);
    let mut out = ResponseContext::new();
    match exchanger.complete(&params, &ctx, &mut out).await {
        Ok(_) => with_cookies(&out, Redirect::to(DASHBOARD_PATH)),
        Err(e) => with_cookies(&out, WebError::from(e)),
    }
}

/// Form body of the legacy login POST.
#[derive(Debug, Deserialize)]
pub struct LegacyLoginForm {
    /// Signed token posted by the Provider
    pub jwt: Option<String>,
}

/// Legacy signed-token login.
#[instrument(skip_all)]
pub async fn legacy_login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<LegacyLoginForm>,
) -> WebResult<Response> {
    let verifier = state.legacy_verifier()?;
    let raw = form
        .jwt
        .filter(|jwt| !jwt.is_empty())
        .ok_or_else(|| AuthError::MalformedPayload("missing jwt form field".to_string()))?;

    let session = verifier.verify(&raw)?.into_session();

    let ctx = request_context(&headers);
    let mut out = ResponseContext::new();
    state.store.save(&ctx, &session, &mut out).await?;

    info!(user_id = ?session.identity().map(|u| &u.id), "Legacy login complete");
    Ok(with_cookies(&out, Redirect::to(DASHBOARD_PATH)))
}

/// Destroy the session.
#[instrument(skip_all)]
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let ctx = request_context(&headers);
    let mut out = ResponseContext::new();
    if let Err(e) = state.store.clear(&ctx, &mut out).await {
        warn!("Failed to clear session: {}", e);
    }
    with_cookies(&out, Redirect::to("/"))
}

/// Public session status.
pub async fn session_status(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Json<SessionStatus> {
    let session = state.store.load(&request_context(&headers)).await;
    Json(SessionStatus::from(&session))
}

/// Mint a legacy token for local testing.
#[instrument(skip_all)]
pub async fn test_jwt(State(state): State<AppState>, body: Bytes) -> WebResult<Response> {
    if state.config.production {
        return Err(WebError::Forbidden("Not available in production".to_string()));
    }
    let secret = state.config.provider.jwt_secret()?;

    let body: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
    let options = test_token_options(&body);
    let token = LegacyTokenIssuer::new(secret).issue(&options)?;

    info!(user_id = options.user_id, mid = options.mid, "Issued test token");
    Ok((StatusCode::OK, Json(json!({ "token": token }))).into_response())
}

fn test_token_options(body: &Value) -> TestTokenOptions {
    let defaults = TestTokenOptions::default();
    TestTokenOptions {
        user_id: int_field(body, "userId").unwrap_or(defaults.user_id),
        email: body
            .get("email")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .unwrap_or(defaults.email),
        mid: int_field(body, "mid").unwrap_or(defaults.mid),
        eid: int_field(body, "eid").unwrap_or(defaults.eid),
        ..defaults
    }
}

/// Integer given as a JSON number or a numeric string; zero counts as absent.
fn int_field(body: &Value, key: &str) -> Option<i64> {
    let value = match body.get(key)? {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    value.filter(|v| *v != 0)
}
