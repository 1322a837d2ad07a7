//! Credentials attached to every backend request.
//!
//! Token deployments send `Authorization: Bearer <token>`; header deployments
//! send the three identity headers instead. Only a bearer token enables the
//! token-claim fallback during role resolution.
use portal_authz::{OrganizationId, Role, UserId};

pub const HEADER_ORG_ID: &str = "X-Org-Id";
pub const HEADER_USER_ID: &str = "X-User-Id";
pub const HEADER_ROLE: &str = "X-Role";

#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    Bearer(String),
    Headers {
        org_id: OrganizationId,
        user_id: UserId,
        role: Role,
    },
}

impl Credentials {
    pub fn bearer(token: impl Into<String>) -> Self {
        Credentials::Bearer(token.into())
    }

    pub fn headers(org_id: OrganizationId, user_id: UserId, role: Role) -> Self {
        Credentials::Headers {
            org_id,
            user_id,
            role,
        }
    }

    pub fn bearer_token(&self) -> Option<&str> {
        match self {
            Credentials::Bearer(token) => Some(token.as_str()),
            Credentials::Headers { .. } => None,
        }
    }

    pub fn organization_id(&self) -> Option<OrganizationId> {
        match self {
            Credentials::Bearer(_) => None,
            Credentials::Headers { org_id, .. } => Some(*org_id),
        }
    }

    pub fn user_id(&self) -> Option<UserId> {
        match self {
            Credentials::Bearer(_) => None,
            Credentials::Headers { user_id, .. } => Some(*user_id),
        }
    }

    pub fn apply(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self {
            Credentials::Bearer(token) => request.bearer_auth(token),
            Credentials::Headers {
                org_id,
                user_id,
                role,
            } => request
                .header(HEADER_ORG_ID, org_id.to_string())
                .header(HEADER_USER_ID, user_id.to_string())
                .header(HEADER_ROLE, role.as_str()),
        }
    }
}

// Never print the bearer token.
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Credentials::Bearer(_) => f.debug_tuple("Bearer").field(&"<redacted>").finish(),
            Credentials::Headers {
                org_id,
                user_id,
                role,
            } => f
                .debug_struct("Headers")
                .field("org_id", org_id)
                .field("user_id", user_id)
                .field("role", role)
                .finish(),
        }
    }
}
