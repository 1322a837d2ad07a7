//! Portal role model, token-claim derivation, and view gating.
//!
//! # Purpose
//! Centralizes the closed role enumeration, the rules that derive a role from
//! unverified session-token claims, and the mapping from an effective role to
//! the navigation sections a user may see.
//!
//! # How it fits
//! `portal-client` resolves a session's base role against the backend identity
//! endpoint and falls back to [`derive_token_identity`] when that fails. Front
//! ends then call [`visible_sections`] with the session's [`EffectiveRole`].
//!
//! # Key invariants
//! - Roles are ordered `member < admin < owner < superadmin`.
//! - Claim matching is case-insensitive and ignores non-alphanumeric characters.
//! - An unparsable token never maps to a default role; it is an error.
//! - [`EffectiveRole::Resolving`] opens no privileged section.
//!
//! # Examples
//! ```rust
//! use portal_authz::{EffectiveRole, NavigationSection, Role, visible_sections};
//!
//! let sections = visible_sections(EffectiveRole::Resolved(Role::Member));
//! assert!(sections.contains(&NavigationSection::MyRequests));
//! assert!(!sections.contains(&NavigationSection::AdminDashboard));
//! ```
//!
//! # Common pitfalls
//! - Treating decoded claims as trusted; signatures are checked by the backend only.
//! - Gating on the base role instead of the effective role hides overrides.

mod claims;
mod errors;
mod role;
mod sections;
mod types;

pub use claims::{
    ClaimRules, TokenIdentity, decode_unverified_claims, derive_token_identity,
    extract_id_claim, extract_roles_claim, normalize_claim,
};
pub use errors::{AuthzError, AuthzResult};
pub use role::{EffectiveRole, Role, RoleSource};
pub use sections::{NavigationSection, can_view, visible_sections};
pub use types::{OrganizationId, UserId};
