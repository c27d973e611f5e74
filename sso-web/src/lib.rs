//! # SSO Web
//!
//! HTTP surface for an app embedded in the Provider's tenant UI.
//!
//! ## Overview
//!
//! - **Routes**: login, callback, legacy login, logout, session status and
//!   the development token endpoint under `/api/auth`
//! - **Middleware**: [`sso_auth::SessionGuard`] in front of every route
//! - **Errors**: login failures redirect to `/?error=`, configuration faults
//!   answer 500 JSON
//! - **API access**: [`require_api_access`] for handlers that call Provider
//!   REST APIs
//!
//! ## Usage
//!
//! ```rust,no_run
//! use sso_auth::AuthConfig;
//! use sso_web::{app, AppState};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let state = AppState::new(AuthConfig::from_env())?;
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
//! axum::serve(listener, app(state)).await?;
//! # Ok(())
//! # }
//! ```

pub mod access;
pub mod cookies;
pub mod error;
pub mod middleware;
pub mod pages;
pub mod routes;
pub mod state;

pub use access::{require_api_access, ApiAccess};
pub use error::{WebError, WebResult};
pub use state::AppState;

use axum::Router;

/// Full application router: pages, auth routes and the session guard.
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(pages::page_routes())
        .merge(routes::auth_routes())
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::session_guard,
        ))
        .with_state(state)
}
