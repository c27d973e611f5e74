//! SSO web server.
//!
//! Environment variables are documented on [`sso_auth::AuthConfig::from_env`];
//! `BIND_ADDR` sets the listen address (default `0.0.0.0:3000`) and
//! `RUST_LOG` the log filter (default `info`).

use sso_auth::AuthConfig;
use sso_web::{app, AppState};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = AuthConfig::from_env();
    let production = config.production;
    let state = AppState::new(config)?;

    let addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
    let listener = TcpListener::bind(&addr).await?;
    info!(%addr, production, "SSO web server listening");

    axum::serve(listener, app(state)).await?;
    Ok(())
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
