//! Organization (tenant) model
//!
//! The Provider tenant a user signed in through: a business unit (MID)
//! inside an enterprise (EID), plus the stack and region hints the Provider
//! uses to route API traffic.

use serde::{Deserialize, Serialize};

use crate::id::ProviderId;

/// The tenant context of a signed-in user.
///
/// Used for display and routing only. Authorization decisions never read
/// these fields.
///
/// # Examples
///
/// ```
/// use sso_identity::{Organization, ProviderId};
///
/// let org: Organization = serde_json::from_value(serde_json::json!({
///     "member_id": 100000001,
///     "enterprise_id": 100000000,
///     "stack_key": "S7",
///     "region": "NA1"
/// })).unwrap();
///
/// assert_eq!(org.id, ProviderId::Number(100000001));
/// assert_eq!(org.stack_key.as_deref(), Some("S7"));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Organization {
    /// Business unit id (MID)
    #[serde(alias = "member_id")]
    pub id: ProviderId,

    /// Parent enterprise id (EID)
    #[serde(default, alias = "enterprise_id", skip_serializing_if = "Option::is_none")]
    pub enterprise_id: Option<ProviderId>,

    /// Data context, legacy token only
    #[serde(default, alias = "data_context", skip_serializing_if = "Option::is_none")]
    pub data_context: Option<String>,

    /// Provider stack the tenant lives on
    #[serde(default, alias = "stack_key", skip_serializing_if = "Option::is_none")]
    pub stack_key: Option<String>,

    /// Provider region
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
}

impl Organization {
    /// Create an organization with only the business unit id.
    pub fn new(id: impl Into<ProviderId>) -> Self {
        Self {
            id: id.into(),
            enterprise_id: None,
            data_context: None,
            stack_key: None,
            region: None,
        }
    }

    /// Set the parent enterprise id.
    pub fn with_enterprise_id(mut self, enterprise_id: impl Into<ProviderId>) -> Self {
        self.enterprise_id = Some(enterprise_id.into());
        self
    }

    /// Set the stack key.
    pub fn with_stack_key(mut self, stack_key: impl Into<String>) -> Self {
        self.stack_key = Some(stack_key.into());
        self
    }

    /// Set the region.
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    /// Whether this business unit sits under a different enterprise id.
    ///
    /// The enterprise's own top-level unit has MID == EID.
    pub fn is_child_business_unit(&self) -> bool {
        match &self.enterprise_id {
            Some(eid) => eid != &self.id,
            None => false,
        }
    }
}
