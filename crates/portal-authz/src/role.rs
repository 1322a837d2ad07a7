use crate::{AuthzError, AuthzResult};
use serde::{Deserialize, Serialize};

/// Permission tier of a portal user.
///
/// Variants are declared in ascending privilege so the derived `Ord` can be
/// used to compare tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Member,
    Admin,
    Owner,
    Superadmin,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::Member, Role::Admin, Role::Owner, Role::Superadmin];

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Member => "member",
            Role::Admin => "admin",
            Role::Owner => "owner",
            Role::Superadmin => "superadmin",
        }
    }

    pub fn is_superadmin(self) -> bool {
        matches!(self, Role::Superadmin)
    }

    /// Parse a backend-declared role string.
    ///
    /// Surrounding whitespace is trimmed and the value is lower-cased before
    /// matching, so `"Owner"` and `" owner "` both parse.
    ///
    /// # Errors
    /// - [`AuthzError::UnknownRole`] for empty or unrecognised values.
    pub fn parse(value: &str) -> AuthzResult<Self> {
        value.parse()
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = AuthzError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "member" => Ok(Role::Member),
            "admin" => Ok(Role::Admin),
            "owner" => Ok(Role::Owner),
            "superadmin" => Ok(Role::Superadmin),
            _ => Err(AuthzError::UnknownRole(value.to_string())),
        }
    }
}

/// Where a session's base role came from, most authoritative first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleSource {
    Backend,
    TokenClaims,
    Cached,
}

impl RoleSource {
    pub fn as_str(self) -> &'static str {
        match self {
            RoleSource::Backend => "backend",
            RoleSource::TokenClaims => "token_claims",
            RoleSource::Cached => "cached",
        }
    }
}

impl std::fmt::Display for RoleSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The role used for gating decisions at a given moment.
///
/// `Resolving` is reported while no base role is known; it must be treated as
/// "not authorized for any gated view".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "state", content = "role", rename_all = "snake_case")]
pub enum EffectiveRole {
    Resolving,
    Resolved(Role),
}

impl EffectiveRole {
    pub fn role(self) -> Option<Role> {
        match self {
            EffectiveRole::Resolving => None,
            EffectiveRole::Resolved(role) => Some(role),
        }
    }

    pub fn is_resolving(self) -> bool {
        matches!(self, EffectiveRole::Resolving)
    }
}

impl From<Option<Role>> for EffectiveRole {
    fn from(value: Option<Role>) -> Self {
        value.map_or(EffectiveRole::Resolving, EffectiveRole::Resolved)
    }
}

impl std::fmt::Display for EffectiveRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EffectiveRole::Resolving => f.write_str("resolving"),
            EffectiveRole::Resolved(role) => f.write_str(role.as_str()),
        }
    }
}
