//! Strongly typed identifiers for tenants and users.
//!
//! # Purpose
//! Wraps the backend's integer ids so organization and user ids cannot be
//! swapped by accident when building requests.
//!
//! # Examples
//! ```rust
//! use portal_authz::{OrganizationId, UserId};
//!
//! let org = OrganizationId::new(12);
//! let user = UserId::new(7);
//! assert_eq!(format!("{org}/{user}"), "12/7");
//! ```
use serde::{Deserialize, Serialize};

/// Tenant (organization) identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrganizationId(i64);

impl OrganizationId {
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    pub fn get(self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for OrganizationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of the acting individual.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(i64);

impl UserId {
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    pub fn get(self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
