//! Provider identifiers
//!
//! The Provider reports user, business unit and enterprise ids as JSON
//! numbers in the legacy token and as strings in some user-info documents.
//! `ProviderId` accepts both and writes back the form it was read in.

use serde::{Deserialize, Serialize};
use std::fmt;

/// An opaque Provider identifier.
///
/// # Examples
///
/// ```
/// use sso_identity::ProviderId;
///
/// let numeric: ProviderId = serde_json::from_str("100000001").unwrap();
/// let text: ProviderId = serde_json::from_str("\"0053t000007aBcD\"").unwrap();
///
/// assert_eq!(numeric.as_i64(), Some(100000001));
/// assert_eq!(text.to_string(), "0053t000007aBcD");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProviderId {
    /// Numeric id (user id, MID, EID)
    Number(i64),
    /// String id (OAuth `sub`, user-info ids)
    Text(String),
}

impl ProviderId {
    /// Numeric value, if the id is numeric or a string of digits.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ProviderId::Number(n) => Some(*n),
            ProviderId::Text(s) => s.parse().ok(),
        }
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderId::Number(n) => write!(f, "{}", n),
            ProviderId::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for ProviderId {
    fn from(n: i64) -> Self {
        ProviderId::Number(n)
    }
}

impl From<i32> for ProviderId {
    fn from(n: i32) -> Self {
        ProviderId::Number(n.into())
    }
}

impl From<u32> for ProviderId {
    fn from(n: u32) -> Self {
        ProviderId::Number(n.into())
    }
}

impl From<&str> for ProviderId {
    fn from(s: &str) -> Self {
        ProviderId::Text(s.to_string())
    }
}

impl From<String> for ProviderId {
    fn from(s: String) -> Self {
        ProviderId::Text(s)
    }
}
