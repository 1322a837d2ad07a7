//! Role derivation from unverified session-token claims.
//!
//! # Purpose
//! Decodes the payload segment of a compact three-segment token and maps its
//! `roles` claim onto the closed [`Role`] enumeration.
//!
//! # How it fits
//! Only used as the fallback path of role resolution, after the backend
//! identity endpoint has failed or returned no role.
//!
//! # Key invariants
//! - Claims are decoded without signature verification; verification is the
//!   backend's job and these claims only ever gate client-side views.
//! - Precedence: superadmin (or a configured alias) > owner > admin or the
//!   approve-requests capability > member.
//! - A token that cannot be decoded yields an error, never a default role.
//!
//! # Common pitfalls
//! - Comparing raw claim strings; always go through [`normalize_claim`].
use crate::{AuthzError, AuthzResult, OrganizationId, Role, UserId};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde_json::Value;

const ROLES_CLAIM: &str = "roles";
const ORG_ID_CLAIM: &str = "org_id";
const USER_ID_CLAIM: &str = "user_id";

const SUPERADMIN: &str = "superadmin";
const OWNER: &str = "owner";
const ADMIN: &str = "admin";
const APPROVE_REQUESTS: &str = "approverequests";

/// Claim-matching rules for the token fallback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimRules {
    superadmin_aliases: Vec<String>,
}

impl Default for ClaimRules {
    fn default() -> Self {
        Self::new(["all"])
    }
}

impl ClaimRules {
    /// Build rules with extra role-list values that count as superadmin.
    ///
    /// Aliases are normalized with [`normalize_claim`]; empty results are dropped.
    pub fn new<I, S>(superadmin_aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let superadmin_aliases = superadmin_aliases
            .into_iter()
            .map(|alias| normalize_claim(alias.as_ref()))
            .filter(|alias| !alias.is_empty())
            .collect();
        Self { superadmin_aliases }
    }

    /// Rules with no aliases: only a literal superadmin claim grants superadmin.
    pub fn strict() -> Self {
        Self {
            superadmin_aliases: Vec::new(),
        }
    }

    pub fn superadmin_aliases(&self) -> &[String] {
        &self.superadmin_aliases
    }

    /// Derive a role from a list of raw claim values.
    ///
    /// An empty list yields [`Role::Member`].
    pub fn derive_role(&self, roles: &[String]) -> Role {
        let normalized: Vec<String> = roles.iter().map(|role| normalize_claim(role)).collect();
        let has = |needle: &str| normalized.iter().any(|role| role == needle);

        if has(SUPERADMIN) || self.superadmin_aliases.iter().any(|alias| has(alias.as_str())) {
            Role::Superadmin
        } else if has(OWNER) {
            Role::Owner
        } else if has(ADMIN) || has(APPROVE_REQUESTS) {
            Role::Admin
        } else {
            Role::Member
        }
    }
}

/// Identity fields recovered from token claims.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenIdentity {
    pub role: Role,
    pub organization_id: Option<OrganizationId>,
    pub user_id: Option<UserId>,
}

/// Lower-case a claim value and drop every non-alphanumeric character.
///
/// `Super-Admin`, `super_admin` and `superadmin` all normalize to `superadmin`.
pub fn normalize_claim(value: &str) -> String {
    value
        .chars()
        .filter(|ch| ch.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Decode the payload segment of a compact token without verifying it.
///
/// # Errors
/// - [`AuthzError::MalformedToken`] unless the token has exactly three
///   segments and a non-empty base64url payload.
/// - [`AuthzError::InvalidPayload`] if the payload is not a JSON object.
pub fn decode_unverified_claims(token: &str) -> AuthzResult<Value> {
    let segments: Vec<&str> = token.trim().split('.').collect();
    if segments.len() != 3 {
        return Err(AuthzError::MalformedToken(format!(
            "expected 3 segments, got {}",
            segments.len()
        )));
    }
    let payload = segments[1];
    if payload.is_empty() {
        return Err(AuthzError::MalformedToken("empty payload".to_string()));
    }
    // Some issuers pad the segment; the no-pad engine rejects trailing '='.
    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|err| AuthzError::MalformedToken(format!("payload encoding: {err}")))?;
    let claims: Value = serde_json::from_slice(&bytes)
        .map_err(|err| AuthzError::InvalidPayload(err.to_string()))?;
    if !claims.is_object() {
        return Err(AuthzError::InvalidPayload("payload is not an object".to_string()));
    }
    Ok(claims)
}

/// Read the `roles` claim, which may be a single string or a list of strings.
///
/// Non-string list entries are skipped; any other shape yields an empty list.
pub fn extract_roles_claim(claims: &Value) -> Vec<String> {
    match claims.get(ROLES_CLAIM) {
        Some(Value::String(role)) => vec![role.clone()],
        Some(Value::Array(values)) => values
            .iter()
            .filter_map(|item| item.as_str().map(|val| val.to_string()))
            .collect(),
        _ => Vec::new(),
    }
}

/// Decode a token and derive the identity it claims.
///
/// # Errors
/// - Propagates [`decode_unverified_claims`] failures.
pub fn derive_token_identity(token: &str, rules: &ClaimRules) -> AuthzResult<TokenIdentity> {
    let claims = decode_unverified_claims(token)?;
    let roles = extract_roles_claim(&claims);
    Ok(TokenIdentity {
        role: rules.derive_role(&roles),
        organization_id: extract_id_claim(&claims, ORG_ID_CLAIM).map(OrganizationId::new),
        user_id: extract_id_claim(&claims, USER_ID_CLAIM).map(UserId::new),
    })
}

/// Read an integer id field that may be a JSON number or a numeric string.
///
/// Any other shape, including non-numeric strings, yields `None`.
pub fn extract_id_claim(claims: &Value, name: &str) -> Option<i64> {
    match claims.get(name)? {
        Value::Number(value) => value.as_i64(),
        Value::String(value) => value.trim().parse().ok(),
        _ => None,
    }
}
