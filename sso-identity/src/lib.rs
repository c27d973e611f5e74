//! # SSO Identity
//!
//! This crate holds the identity model delegated by the Provider when a user
//! signs in to an embedded app, shared by both SSO handshakes.
//!
//! ## Overview
//!
//! The sso-identity crate handles:
//! - **Ids**: Provider identifiers that arrive as numbers or strings
//! - **Users**: The signed-in user (id, email, display name, locale)
//! - **Organizations**: The tenant (business unit) and its parent enterprise
//!
//! ## Architecture
//!
//! ```text
//! Session (sso-auth)
//!   ├─ UserIdentity ─→ Timezone
//!   └─ Organization ─→ enterprise / stack / region hints
//! ```
//!
//! Both the OAuth user-info document and the legacy signed-token payload
//! deserialize into the same types; field aliases absorb the difference
//! between the two wire shapes.
//!
//! ## Usage
//!
//! ```rust
//! use sso_identity::{Organization, ProviderId, UserIdentity};
//!
//! let user = UserIdentity::new(ProviderId::Number(12345), "user@example.com")
//!     .with_culture("en-US");
//! let org = Organization::new(ProviderId::Number(100000001))
//!     .with_enterprise_id(ProviderId::Number(100000000));
//!
//! assert_eq!(user.locale(), Some("en-US"));
//! assert!(org.is_child_business_unit());
//! ```
//!
//! Organization data is display and routing context only; it is never an
//! authorization input.

pub mod id;
pub mod organization;
pub mod user;

// Re-export main types for convenience
pub use id::ProviderId;
pub use organization::Organization;
pub use user::{Timezone, UserIdentity};
