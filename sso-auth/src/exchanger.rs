//! OAuth authorization-code login flow
//!
//! ```text
//! AwaitingCode ──gate──→ ExchangingToken ──→ FetchingIdentity ──→ SessionWritten
//!      │                       │                    │
//!      └───────────────────────┴────────────────────┴──────────→ Aborted
//! ```
//!
//! The gate makes no network call. The session is written once, after both
//! Provider calls succeeded; an aborted attempt leaves the stored session
//! untouched. The CSRF state cookie is discarded on every outcome.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::error::{AuthError, AuthResult};
use crate::provider::OAuthProviderClient;
use crate::session::Session;
use crate::state::{StateToken, StateTokenGuard};
use crate::store::{RequestContext, ResponseContext, SessionRepository};

/// Step of a login attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExchangeStage {
    /// Validating the callback parameters
    AwaitingCode,
    /// Trading the code for tokens
    ExchangingToken,
    /// Looking up the user and organization
    FetchingIdentity,
    /// Session committed
    SessionWritten,
    /// Attempt abandoned
    Aborted,
}

/// Query parameters of the Provider callback.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CallbackParams {
    /// Authorization code
    pub code: Option<String>,

    /// Echoed CSRF state
    pub state: Option<String>,

    /// Provider error code
    pub error: Option<String>,

    /// Provider error description
    pub error_description: Option<String>,
}

/// Where to send the browser to start a login.
#[derive(Debug, Clone)]
pub struct AuthorizationRequest {
    /// Provider authorize URL
    pub url: String,

    /// State embedded in the URL and the cookie
    pub state: StateToken,
}

/// Drives the authorization-code flow.
pub struct AuthorizationCodeExchanger {
    provider: Arc<dyn OAuthProviderClient>,
    store: Arc<dyn SessionRepository>,
    state_guard: StateTokenGuard,
}

impl AuthorizationCodeExchanger {
    /// Create an exchanger.
    pub fn new(provider: Arc<dyn OAuthProviderClient>, store: Arc<dyn SessionRepository>) -> Self {
        Self {
            provider,
            store,
            state_guard: StateTokenGuard::new(),
        }
    }

    /// Start a login: mint a state, build the authorize URL and queue the
    /// state cookie.
    pub fn begin(&self, out: &mut ResponseContext) -> AuthResult<AuthorizationRequest> {
        let state = self.state_guard.issue();
        let url = self.provider.authorization_url(&state)?;
        self.state_guard.attach(&state, out);

        debug!("Login started");
        Ok(AuthorizationRequest { url, state })
    }

    /// Check the callback without touching the network.
    ///
    /// Order: Provider error, then missing code, then state mismatch.
    pub fn gate<'a>(&self, params: &'a CallbackParams, stored_state: Option<&str>) -> AuthResult<&'a str> {
        if let Some(error) = params.error.as_deref().filter(|e| !e.is_empty()) {
            return Err(AuthError::ProviderError {
                error: error.to_string(),
                description: params.error_description.clone().filter(|d| !d.is_empty()),
            });
        }

        let code = params
            .code
            .as_deref()
            .filter(|c| !c.is_empty())
            .ok_or(AuthError::MissingCode)?;

        if !self.state_guard.validate(params.state.as_deref(), stored_state) {
            return Err(AuthError::InvalidState);
        }

        Ok(code)
    }

    /// Complete a login from the callback parameters.
    ///
    /// On success the new session has been saved and is returned.
    #[instrument(skip_all)]
    pub async fn complete(
        &self,
        params: &CallbackParams,
        ctx: &RequestContext,
        out: &mut ResponseContext,
    ) -> AuthResult<Session> {
        self.state_guard.discard(out);

        let mut stage = ExchangeStage::AwaitingCode;
        let result = self.run(params, ctx, out, &mut stage).await;

        match &result {
            Ok(session) => {
                if let (Some(user), Some(org)) = (session.identity(), session.organization()) {
                    info!(email = %user.email, mid = %org.id, "SSO login successful");
                }
            }
            Err(e) => {
                warn!(?stage, error = %e, "Login aborted");
            }
        }
        result
    }

    async fn run(
        &self,
        params: &CallbackParams,
        ctx: &RequestContext,
        out: &mut ResponseContext,
        stage: &mut ExchangeStage,
    ) -> AuthResult<Session> {
        let code = self.gate(params, self.state_guard.read(ctx))?;

        *stage = ExchangeStage::ExchangingToken;
        let tokens = self.provider.exchange_code(code).await?;

        *stage = ExchangeStage::FetchingIdentity;
        let info = self.provider.get_user_info(&tokens.access_token).await?;

        let session = Session::oauth(info.user, info.organization, tokens.into_credential());
        self.store.save(ctx, &session, out).await?;

        *stage = ExchangeStage::SessionWritten;
        Ok(session)
    }
}
