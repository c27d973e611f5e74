//! Minimal pages for the entry point, the protected dashboard and the dev
//! login form.

use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::response::Html;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use sso_auth::SessionStatus;

use crate::cookies::request_context;
use crate::state::AppState;

/// Page routes.
pub fn page_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(home))
        .route("/dashboard", get(dashboard))
        .route("/test-sso", get(test_sso))
}

/// Query of the entry page.
#[derive(Debug, Default, Deserialize)]
pub struct HomeQuery {
    /// Login failure reason
    pub error: Option<String>,
}

async fn home(Query(query): Query<HomeQuery>) -> Html<String> {
    let error = query
        .error
        .map(|e| format!("<p class=\"error\">{}</p>", escape_html(&e)))
        .unwrap_or_default();

    Html(format!(
        "<!doctype html>\n<html><body>\n<h1>Sign in</h1>\n{}\
         <form method=\"post\" action=\"/api/auth/login\" target=\"_top\">\
         <button type=\"submit\">Sign in with Provider</button></form>\n</body></html>",
        error
    ))
}

async fn dashboard(State(state): State<AppState>, headers: HeaderMap) -> Json<SessionStatus> {
    let session = state.store.load(&request_context(&headers)).await;
    Json(SessionStatus::from(&session))
}

async fn test_sso() -> Html<&'static str> {
    Html(
        "<!doctype html>\n<html><body>\n<h1>Legacy SSO test</h1>\n\
         <form method=\"post\" action=\"/api/auth/jwt\">\
         <textarea name=\"jwt\" rows=\"8\" cols=\"80\"></textarea>\
         <button type=\"submit\">Sign in</button></form>\n</body></html>",
    )
}

fn escape_html(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '&' => escaped.push_str("&amp;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            c => escaped.push(c),
        }
    }
    escaped
}
