//! User identity
//!
//! The signed-in user as reported by the Provider. Immutable once written to
//! a session; a new login replaces it wholesale.

use serde::{Deserialize, Serialize};

use crate::id::ProviderId;

/// The user delegated by the Provider.
///
/// Reads both wire shapes: the legacy token (`id`, `culture`) and the
/// OAuth user-info document (`sub`, `locale`).
///
/// # Examples
///
/// ```
/// use sso_identity::UserIdentity;
///
/// let from_userinfo: UserIdentity = serde_json::from_value(serde_json::json!({
///     "sub": "0053t000007aBcD",
///     "email": "ada@example.com",
///     "name": "Ada",
///     "locale": "en-GB"
/// })).unwrap();
///
/// assert_eq!(from_userinfo.locale(), Some("en-GB"));
/// assert_eq!(from_userinfo.display_name(), "Ada");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserIdentity {
    /// Provider user id
    #[serde(alias = "sub")]
    pub id: ProviderId,

    /// Email address
    pub email: String,

    /// Display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Locale (e.g. "en-US")
    #[serde(default, alias = "locale", skip_serializing_if = "Option::is_none")]
    pub culture: Option<String>,

    /// User timezone, legacy token only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<Timezone>,
}

impl UserIdentity {
    /// Create a user identity with the required fields.
    pub fn new(id: impl Into<ProviderId>, email: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: email.into(),
            name: None,
            culture: None,
            timezone: None,
        }
    }

    /// Set the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the locale.
    pub fn with_culture(mut self, culture: impl Into<String>) -> Self {
        self.culture = Some(culture.into());
        self
    }

    /// Set the timezone.
    pub fn with_timezone(mut self, timezone: Timezone) -> Self {
        self.timezone = Some(timezone);
        self
    }

    /// Locale, if the Provider sent one.
    pub fn locale(&self) -> Option<&str> {
        self.culture.as_deref()
    }

    /// Name to show in the UI, falling back to the email address.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.email)
    }
}

/// Timezone descriptor, in either wire shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Timezone {
    /// Short name (e.g. "EST")
    #[serde(alias = "short_name")]
    pub short_name: String,

    /// Long name (e.g. "Eastern Standard Time")
    #[serde(alias = "long_name")]
    pub long_name: String,

    /// UTC offset in hours
    pub offset: f64,

    /// Whether daylight saving applies
    pub dst: bool,
}
