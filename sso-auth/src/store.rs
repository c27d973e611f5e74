//! Session persistence
//!
//! [`SessionRepository`] is the only way the rest of the crate reads or
//! writes a [`Session`]. Implementations receive the inbound cookies through
//! a [`RequestContext`] and emit `Set-Cookie` values into a
//! [`ResponseContext`], so nothing here depends on an HTTP framework.
//!
//! Two implementations ship with the crate:
//! - [`EncryptedCookieStore`]: the whole record in an AES-GCM encrypted
//!   cookie; the client can neither read nor forge it
//! - [`MemorySessionStore`]: records kept server-side, keyed by a signed
//!   session-id cookie
//!
//! Every write replaces the whole record. There is no cross-request lock;
//! see the refresher for the one race this allows.

use async_trait::async_trait;
use cookie::{Cookie, CookieJar, Key, SameSite};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::config::{SessionBackend, SessionConfig, MIN_SESSION_PASSWORD_LEN};
use crate::error::{AuthError, AuthResult};
use crate::session::Session;

/// Largest encoded cookie browsers reliably accept.
pub const MAX_COOKIE_BYTES: usize = 4096;

/// Inbound cookies of one request.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    jar: CookieJar,
}

impl RequestContext {
    /// Context with no cookies.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse one or more `Cookie` header values.
    ///
    /// Unparseable pairs are skipped.
    pub fn from_cookie_headers<'a, I>(headers: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut jar = CookieJar::new();
        for header in headers {
            for cookie in Cookie::split_parse(header).flatten() {
                jar.add_original(cookie.into_owned());
            }
        }
        Self { jar }
    }

    /// Add a cookie as if the client had sent it.
    pub fn with_cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.jar
            .add_original(Cookie::new(name.into(), value.into()));
        self
    }

    /// Raw cookie value.
    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.jar.get(name).map(|c| c.value())
    }

    pub(crate) fn jar(&self) -> &CookieJar {
        &self.jar
    }
}

/// Cookies to send back with the response.
#[derive(Debug, Clone, Default)]
pub struct ResponseContext {
    jar: CookieJar,
}

impl ResponseContext {
    /// Context with nothing to send.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a cookie.
    pub fn add_cookie(&mut self, cookie: Cookie<'static>) {
        self.jar.add(cookie);
    }

    /// Queued cookies.
    pub fn cookies(&self) -> impl Iterator<Item = &Cookie<'static>> {
        self.jar.delta()
    }

    /// Queued cookie by name.
    pub fn cookie(&self, name: &str) -> Option<&Cookie<'static>> {
        self.jar.delta().find(|c| c.name() == name)
    }

    /// `Set-Cookie` header values.
    pub fn set_cookie_headers(&self) -> Vec<String> {
        self.jar.delta().map(|c| c.to_string()).collect()
    }

    /// Feed the queued cookies back as the next request's cookies.
    ///
    /// Removal cookies are dropped, like a browser would.
    pub fn into_request(self) -> RequestContext {
        let mut jar = CookieJar::new();
        for cookie in self.jar.delta() {
            if !is_removal(cookie) {
                jar.add_original(cookie.clone());
            }
        }
        RequestContext { jar }
    }
}

fn is_removal(cookie: &Cookie<'_>) -> bool {
    cookie.max_age() == Some(time::Duration::ZERO)
}

/// Repository interface for session records.
///
/// `load` never fails: a missing, tampered or undecodable record is the
/// empty session. The request context is passed to `save` and `clear` so
/// keyed stores can find the existing record.
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Read the session for this request.
    async fn load(&self, ctx: &RequestContext) -> Session;

    /// Persist the whole session record.
    async fn save(
        &self,
        ctx: &RequestContext,
        session: &Session,
        out: &mut ResponseContext,
    ) -> AuthResult<()>;

    /// Destroy the session.
    async fn clear(&self, ctx: &RequestContext, out: &mut ResponseContext) -> AuthResult<()>;
}

/// Build the configured repository.
pub fn repository_from_config(config: &SessionConfig) -> AuthResult<Arc<dyn SessionRepository>> {
    Ok(match config.backend {
        SessionBackend::Cookie => Arc::new(EncryptedCookieStore::new(config)?),
        SessionBackend::Memory => Arc::new(MemorySessionStore::new(config)?),
    })
}

fn derive_key(password: &str) -> AuthResult<Key> {
    if password.len() < MIN_SESSION_PASSWORD_LEN {
        return Err(AuthError::ConfigMissing(format!(
            "SESSION_PASSWORD must be at least {} bytes",
            MIN_SESSION_PASSWORD_LEN
        )));
    }
    Ok(Key::derive_from(password.as_bytes()))
}

/// Session cookie: HttpOnly, `SameSite=None` for iframe embedding.
fn session_cookie(name: &str, value: String, ttl_days: i64, secure: bool) -> Cookie<'static> {
    Cookie::build((name.to_string(), value))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::None)
        .path("/")
        .max_age(time::Duration::days(ttl_days))
        .build()
}

fn removal_cookie(name: &str, secure: bool) -> Cookie<'static> {
    Cookie::build((name.to_string(), ""))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::None)
        .path("/")
        .max_age(time::Duration::ZERO)
        .build()
}

/// Session record stored in an encrypted, authenticated cookie.
pub struct EncryptedCookieStore {
    key: Key,
    cookie_name: String,
    ttl_days: i64,
    secure: bool,
}

impl std::fmt::Debug for EncryptedCookieStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptedCookieStore")
            .field("key", &"[REDACTED]")
            .field("cookie_name", &self.cookie_name)
            .field("ttl_days", &self.ttl_days)
            .field("secure", &self.secure)
            .finish()
    }
}

impl EncryptedCookieStore {
    /// Create a store; the key is derived from the session password.
    pub fn new(config: &SessionConfig) -> AuthResult<Self> {
        config.ttl()?;
        Ok(Self {
            key: derive_key(&config.password)?,
            cookie_name: config.cookie_name.clone(),
            ttl_days: config.ttl_days,
            secure: config.secure,
        })
    }

    /// Cookie name.
    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }
}

#[async_trait]
impl SessionRepository for EncryptedCookieStore {
    async fn load(&self, ctx: &RequestContext) -> Session {
        let cookie = match ctx.jar().private(&self.key).get(&self.cookie_name) {
            Some(cookie) => cookie,
            None => {
                if ctx.cookie(&self.cookie_name).is_some() {
                    debug!("Session cookie present but failed authentication");
                }
                return Session::empty();
            }
        };

        serde_json::from_str(cookie.value()).unwrap_or_else(|e| {
            warn!("Discarding undecodable session record: {}", e);
            Session::empty()
        })
    }

    async fn save(
        &self,
        _ctx: &RequestContext,
        session: &Session,
        out: &mut ResponseContext,
    ) -> AuthResult<()> {
        let record = serde_json::to_string(session)
            .map_err(|e| AuthError::SessionStore(format!("Session encoding failed: {}", e)))?;

        let mut sealed = CookieJar::new();
        sealed.private_mut(&self.key).add(session_cookie(
            &self.cookie_name,
            record,
            self.ttl_days,
            self.secure,
        ));
        let cookie = sealed
            .get(&self.cookie_name)
            .cloned()
            .ok_or_else(|| AuthError::Internal("Encrypted cookie missing".to_string()))?;

        let size = cookie.to_string().len();
        if size > MAX_COOKIE_BYTES {
            return Err(AuthError::SessionStore(format!(
                "Session cookie is {} bytes, limit is {}",
                size, MAX_COOKIE_BYTES
            )));
        }

        out.add_cookie(cookie);
        Ok(())
    }

    async fn clear(&self, _ctx: &RequestContext, out: &mut ResponseContext) -> AuthResult<()> {
        out.add_cookie(removal_cookie(&self.cookie_name, self.secure));
        Ok(())
    }
}

/// Server-side session records keyed by a signed id cookie.
///
/// Records expire with the cookie lifetime; expired records are dropped on
/// `load` and swept on `save`. A login (a save whose identity differs from
/// the stored record) always gets a fresh id, so an id planted before login
/// never reaches the new session.
pub struct MemorySessionStore {
    key: Key,
    cookie_name: String,
    ttl_days: i64,
    ttl: Duration,
    secure: bool,
    records: RwLock<HashMap<String, StoredSession>>,
}

struct StoredSession {
    session: Session,
    expires_at: Instant,
}

impl StoredSession {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

impl MemorySessionStore {
    /// Create an empty store.
    pub fn new(config: &SessionConfig) -> AuthResult<Self> {
        Ok(Self {
            key: derive_key(&config.password)?,
            cookie_name: config.cookie_name.clone(),
            ttl_days: config.ttl_days,
            ttl: config.ttl()?,
            secure: config.secure,
            records: RwLock::new(HashMap::new()),
        })
    }

    /// Number of stored records, expired ones included until swept.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    /// Whether no records are stored.
    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    fn session_id(&self, ctx: &RequestContext) -> Option<String> {
        ctx.jar()
            .signed(&self.key)
            .get(&self.cookie_name)
            .map(|c| c.value().to_string())
    }
}

/// Same signed-in principal, so the write is an update rather than a login.
fn same_principal(stored: &Session, session: &Session) -> bool {
    stored.is_authenticated()
        && session.is_authenticated()
        && stored.identity() == session.identity()
        && stored.organization() == session.organization()
}

#[async_trait]
impl SessionRepository for MemorySessionStore {
    async fn load(&self, ctx: &RequestContext) -> Session {
        let Some(id) = self.session_id(ctx) else {
            return Session::empty();
        };

        let now = Instant::now();
        {
            let records = self.records.read().await;
            match records.get(&id) {
                None => return Session::empty(),
                Some(record) if !record.is_expired(now) => return record.session.clone(),
                Some(_) => {}
            }
        }

        debug!("Dropping expired session record");
        let mut records = self.records.write().await;
        if records.get(&id).is_some_and(|r| r.is_expired(now)) {
            records.remove(&id);
        }
        Session::empty()
    }

    async fn save(
        &self,
        ctx: &RequestContext,
        session: &Session,
        out: &mut ResponseContext,
    ) -> AuthResult<()> {
        let now = Instant::now();
        let mut records = self.records.write().await;
        records.retain(|_, record| !record.is_expired(now));

        let existing = self.session_id(ctx);
        let reusable = existing.as_ref().filter(|id| {
            records
                .get(id.as_str())
                .is_some_and(|record| same_principal(&record.session, session))
        });
        let id = match reusable {
            Some(id) => id.clone(),
            None => {
                if let Some(old) = existing.as_ref() {
                    records.remove(old);
                }
                uuid::Uuid::new_v4().to_string()
            }
        };

        records.insert(
            id.clone(),
            StoredSession {
                session: session.clone(),
                expires_at: now + self.ttl,
            },
        );
        drop(records);

        let mut signed = CookieJar::new();
        signed.signed_mut(&self.key).add(session_cookie(
            &self.cookie_name,
            id,
            self.ttl_days,
            self.secure,
        ));
        if let Some(cookie) = signed.get(&self.cookie_name) {
            out.add_cookie(cookie.clone());
        }
        Ok(())
    }

    async fn clear(&self, ctx: &RequestContext, out: &mut ResponseContext) -> AuthResult<()> {
        if let Some(id) = self.session_id(ctx) {
            self.records.write().await.remove(&id);
        }
        out.add_cookie(removal_cookie(&self.cookie_name, self.secure));
        Ok(())
    }
}
