//! CSRF state tokens for the OAuth login flow.
//!
//! A state token is minted when the login flow begins, sent to the Provider
//! in the authorize URL and to the browser in a short-lived cookie, then
//! compared against the `state` echoed back on the callback.
//!
//! Validation is skipped when either side is missing. Third-party cookie
//! blocking inside an iframe routinely drops the cookie, and the embedded
//! login must still work there.

use cookie::{Cookie, SameSite};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::store::{RequestContext, ResponseContext};

/// Name of the CSRF state cookie.
pub const STATE_COOKIE: &str = "oauth_state";

/// Lifetime of the CSRF state cookie, in seconds.
pub const STATE_TTL_SECS: i64 = 600;

const STATE_LEN: usize = 32;

/// Random, unguessable CSRF correlator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StateToken(String);

impl StateToken {
    /// Token value.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for StateToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Issues, stores and validates [`StateToken`]s.
#[derive(Debug, Clone, Default)]
pub struct StateTokenGuard;

impl StateTokenGuard {
    /// Create a guard.
    pub fn new() -> Self {
        Self
    }

    /// Mint a fresh token.
    pub fn issue(&self) -> StateToken {
        let value: String = rand::thread_rng()
            .sample_iter(&rand::distributions::Alphanumeric)
            .take(STATE_LEN)
            .map(char::from)
            .collect();
        StateToken(value)
    }

    /// Compare the callback `state` with the stored one.
    ///
    /// Returns `false` only when both are present and differ. An empty
    /// value counts as absent.
    pub fn validate(&self, received: Option<&str>, stored: Option<&str>) -> bool {
        let received = received.filter(|v| !v.is_empty());
        let stored = stored.filter(|v| !v.is_empty());
        match (received, stored) {
            (Some(received), Some(stored)) => {
                let matches = received.as_bytes() == stored.as_bytes();
                if !matches {
                    warn!("OAuth state mismatch");
                }
                matches
            }
            _ => true,
        }
    }

    /// Stored state from the request cookies.
    pub fn read<'a>(&self, ctx: &'a RequestContext) -> Option<&'a str> {
        ctx.cookie(STATE_COOKIE).filter(|v| !v.is_empty())
    }

    /// Queue the state cookie.
    ///
    /// `SameSite=None` requires `Secure`, so the cookie is always secure.
    pub fn attach(&self, token: &StateToken, out: &mut ResponseContext) {
        out.add_cookie(state_cookie(token.as_str().to_string(), STATE_TTL_SECS));
    }

    /// Queue removal of the state cookie.
    pub fn discard(&self, out: &mut ResponseContext) {
        out.add_cookie(state_cookie(String::new(), 0));
    }
}

fn state_cookie(value: String, max_age_secs: i64) -> Cookie<'static> {
    Cookie::build((STATE_COOKIE, value))
        .http_only(true)
        .secure(true)
        .same_site(SameSite::None)
        .path("/")
        .max_age(time::Duration::seconds(max_age_secs))
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_is_random() {
        let guard = StateTokenGuard::new();
        let a = guard.issue();
        let b = guard.issue();

        assert_eq!(a.as_str().len(), 32);
        assert!(a.as_str().chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(a, b);
    }

    #[test]
    fn test_validate() {
        let guard = StateTokenGuard::new();
        assert!(guard.validate(Some("abc"), Some("abc")));
        assert!(!guard.validate(Some("abc"), Some("abd")));
        assert!(!guard.validate(Some("abc"), Some("ABC")));
    }

    #[test]
    fn test_validate_skips_when_missing() {
        let guard = StateTokenGuard::new();
        assert!(guard.validate(None, Some("abc")));
        assert!(guard.validate(Some("abc"), None));
        assert!(guard.validate(None, None));
    }

    #[test]
    fn test_validate_treats_empty_as_missing() {
        let guard = StateTokenGuard::new();
        assert!(guard.validate(Some(""), Some("stored")));
        assert!(guard.validate(Some("received"), Some("")));
    }

    #[test]
    fn test_attach_and_read() {
        let guard = StateTokenGuard::new();
        let token = guard.issue();
        let mut out = ResponseContext::new();
        guard.attach(&token, &mut out);

        let cookie = out.cookie(STATE_COOKIE).unwrap();
        assert_eq!(cookie.max_age(), Some(time::Duration::seconds(600)));
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::None));

        let ctx = out.into_request();
        assert_eq!(guard.read(&ctx), Some(token.as_str()));
    }

    #[test]
    fn test_discard_removes_cookie() {
        let guard = StateTokenGuard::new();
        let mut out = ResponseContext::new();
        guard.discard(&mut out);

        let header = out.set_cookie_headers().join("\n");
        assert!(header.contains("oauth_state="));
        assert!(header.contains("Max-Age=0"));
        assert!(guard.read(&out.into_request()).is_none());
    }
}
