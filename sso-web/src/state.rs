//! Shared application state.
//!
//! Built once at startup from [`AuthConfig`] and cloned into every handler.
//! OAuth and legacy-token settings are optional here; a handler that needs
//! a missing value reports `ConfigMissing` when it runs.

use std::sync::Arc;

use sso_auth::{
    repository_from_config, AuthConfig, AuthError, AuthResult, AuthorizationCodeExchanger,
    LegacyTokenVerifier, OAuthProviderClient, ProviderClient, SessionGuard, SessionRepository,
    TokenRefresher,
};
use tracing::{info, warn};

/// State injected into all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Loaded configuration.
    pub config: Arc<AuthConfig>,

    /// Session persistence.
    pub store: Arc<dyn SessionRepository>,

    /// Access-token refresher.
    pub refresher: Arc<TokenRefresher>,

    /// Protected-route gate.
    pub guard: Arc<SessionGuard>,

    exchanger: Option<Arc<AuthorizationCodeExchanger>>,
}

impl AppState {
    /// Build the state from configuration.
    ///
    /// Fails only when the session store cannot be created.
    pub fn new(config: AuthConfig) -> AuthResult<Self> {
        config.validate()?;

        let provider: Option<Arc<dyn OAuthProviderClient>> =
            match config.provider.oauth_settings() {
                Ok(settings) => Some(Arc::new(ProviderClient::new(settings)?)),
                Err(e) => {
                    warn!("OAuth login disabled: {}", e);
                    None
                }
            };

        let store = repository_from_config(&config.session)?;
        info!(backend = ?config.session.backend, "Session store ready");

        Ok(Self::with_parts(config, store, provider))
    }

    /// Assemble the state from explicit parts.
    pub fn with_parts(
        config: AuthConfig,
        store: Arc<dyn SessionRepository>,
        provider: Option<Arc<dyn OAuthProviderClient>>,
    ) -> Self {
        let mut refresher = TokenRefresher::new(store.clone());
        let mut exchanger = None;
        if let Some(provider) = provider {
            refresher = refresher.with_provider(provider.clone());
            exchanger = Some(Arc::new(AuthorizationCodeExchanger::new(provider, store.clone())));
        }

        let guard = SessionGuard::new().with_production(config.production);

        Self {
            config: Arc::new(config),
            store,
            refresher: Arc::new(refresher),
            guard: Arc::new(guard),
            exchanger,
        }
    }

    /// Code-flow driver, or `ConfigMissing` naming the absent variables.
    pub fn exchanger(&self) -> AuthResult<&AuthorizationCodeExchanger> {
        match &self.exchanger {
            Some(exchanger) => Ok(exchanger),
            None => Err(self
                .config
                .provider
                .oauth_settings()
                .err()
                .unwrap_or_else(|| AuthError::ConfigMissing("OAuth client".to_string()))),
        }
    }

    /// Legacy token verifier, or `ConfigMissing`.
    pub fn legacy_verifier(&self) -> AuthResult<LegacyTokenVerifier> {
        LegacyTokenVerifier::from_config(&self.config.provider)
    }
}
