//! Per-request authentication gate.
//!
//! [`SessionGuard`] only looks at the authenticated flag. Token expiry is
//! the refresher's concern, checked by the handler that uses the token.

use tracing::debug;
use url::form_urlencoded;

use crate::session::Session;

/// What to do with a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    /// Let the request through unchanged
    Proceed,
    /// Redirect to the given location
    Redirect(String),
}

/// Protects path prefixes and hides dev-only pages in production.
#[derive(Debug, Clone)]
pub struct SessionGuard {
    protected: Vec<String>,
    dev_only: Vec<String>,
    login_path: String,
    production: bool,
}

impl Default for SessionGuard {
    fn default() -> Self {
        Self {
            protected: vec!["/dashboard".to_string()],
            dev_only: vec!["/test-sso".to_string()],
            login_path: "/".to_string(),
            production: false,
        }
    }
}

impl SessionGuard {
    /// Guard with the default paths.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the protected prefixes.
    pub fn with_protected<I, S>(mut self, prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.protected = prefixes.into_iter().map(Into::into).collect();
        self
    }

    /// Replace the development-only paths.
    pub fn with_dev_only<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dev_only = paths.into_iter().map(Into::into).collect();
        self
    }

    /// Set the unauthenticated entry point.
    pub fn with_login_path(mut self, path: impl Into<String>) -> Self {
        self.login_path = path.into();
        self
    }

    /// Enable production mode.
    pub fn with_production(mut self, production: bool) -> Self {
        self.production = production;
        self
    }

    /// Check if `path` falls under a protected prefix.
    pub fn is_protected(&self, path: &str) -> bool {
        self.protected.iter().any(|p| matches_prefix(path, p))
    }

    /// Decide what to do with a request for `path`.
    pub fn evaluate(&self, path: &str, session: &Session) -> GuardDecision {
        if self.is_protected(path) && !session.is_authenticated() {
            debug!(path, "Unauthenticated request to protected path");
            return GuardDecision::Redirect(self.login_redirect(path));
        }

        if self.production && self.dev_only.iter().any(|p| matches_prefix(path, p)) {
            return GuardDecision::Redirect(self.login_path.clone());
        }

        GuardDecision::Proceed
    }

    /// Login location carrying `path` as the `redirect` hint.
    pub fn login_redirect(&self, path: &str) -> String {
        let query: String = form_urlencoded::Serializer::new(String::new())
            .append_pair("redirect", path)
            .finish();
        format!("{}?{}", self.login_path, query)
    }
}

fn matches_prefix(path: &str, prefix: &str) -> bool {
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/') || prefix.ends_with('/'),
        None => false,
    }
}
