//! Protected-route middleware.

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use sso_auth::{GuardDecision, Session};

use crate::cookies::request_context;
use crate::state::AppState;

/// Run [`sso_auth::SessionGuard`] ahead of every route.
///
/// The session is only loaded for protected paths.
pub async fn session_guard(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let path = request.uri().path().to_string();

    let session = if state.guard.is_protected(&path) {
        state.store.load(&request_context(request.headers())).await
    } else {
        Session::empty()
    };

    match state.guard.evaluate(&path, &session) {
        GuardDecision::Proceed => next.run(request).await,
        GuardDecision::Redirect(location) => Redirect::to(&location).into_response(),
    }
}
