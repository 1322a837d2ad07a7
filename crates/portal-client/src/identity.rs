//! Backend identity endpoint.
//!
//! # Purpose
//! Fetches the authoritative role and ids for the current credentials from
//! `GET /api/v1/tenants/auth/me`.
//!
//! # How it fits
//! [`IdentitySource`] is the seam the role resolver calls through; tests swap
//! in scripted sources while production uses [`HttpIdentitySource`].
//!
//! # Key invariants
//! - A non-2xx status is an error, never an empty identity.
//! - Role strings are only validated by the resolver; this layer passes the
//!   backend's value through untouched.
//! - Ids are read best-effort: a missing, duplicated or non-numeric id becomes
//!   `None` and never makes the body (and so the role) unreadable.
use crate::{ClientConfig, ClientResult, Credentials, PortalHttp};
use async_trait::async_trait;
use portal_authz::{OrganizationId, UserId, extract_id_claim};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

pub const IDENTITY_PATH: &str = "/api/v1/tenants/auth/me";

/// Success body of the identity endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IdentityResponse {
    pub role: Option<String>,
    pub user_id: Option<UserId>,
    pub org_id: Option<OrganizationId>,
}

impl<'de> Deserialize<'de> for IdentityResponse {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Self::from_value(&Value::deserialize(deserializer)?))
    }
}

impl IdentityResponse {
    /// Read the fields the resolver needs from an arbitrary JSON body.
    pub fn from_value(body: &Value) -> Self {
        Self {
            role: body.get("role").and_then(Value::as_str).map(str::to_string),
            user_id: extract_id_claim(body, "user_id").map(UserId::new),
            org_id: extract_id_claim(body, "org_id")
                .or_else(|| extract_id_claim(body, "organization_id"))
                .map(OrganizationId::new),
        }
    }

    /// The declared role, trimmed, or `None` when absent or blank.
    pub fn declared_role(&self) -> Option<&str> {
        self.role
            .as_deref()
            .map(str::trim)
            .filter(|role| !role.is_empty())
    }
}

#[async_trait]
pub trait IdentitySource: Send + Sync {
    async fn fetch_identity(
        &self,
        credentials: Option<&Credentials>,
    ) -> ClientResult<IdentityResponse>;
}

#[derive(Debug, Clone)]
pub struct HttpIdentitySource {
    http: PortalHttp,
}

impl HttpIdentitySource {
    pub fn new(config: &ClientConfig) -> ClientResult<Self> {
        Ok(Self {
            http: PortalHttp::new(config)?,
        })
    }

    pub fn with_http(http: PortalHttp) -> Self {
        Self { http }
    }
}

#[async_trait]
impl IdentitySource for HttpIdentitySource {
    async fn fetch_identity(
        &self,
        credentials: Option<&Credentials>,
    ) -> ClientResult<IdentityResponse> {
        self.http.get_json(IDENTITY_PATH, &[], credentials).await
    }
}
