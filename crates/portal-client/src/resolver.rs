//! Effective-role resolution.
//!
//! # Purpose
//! Seeds a session's base principal from, in order: the backend identity
//! endpoint, the bearer token's unverified claims, and a restored snapshot.
//!
//! # Key invariants
//! - An already-resolved session returns immediately; nothing is re-fetched.
//! - The backend call and the token fallback run sequentially, never raced.
//! - Concurrent callers on one session epoch share a single pending task, so
//!   there is exactly one backend call and one write.
//! - A resolution that finishes after sign-out writes into the dead epoch;
//!   callers then observe the new epoch's state.
//! - Failures never escape: callers only see a [`RoleResolution`].
use crate::session::{PendingResolution, SessionEpoch};
use crate::{ClientError, Credentials, IdentityResponse, IdentitySource, Principal, Session};
use futures::FutureExt;
use portal_authz::{ClaimRules, EffectiveRole, Role, RoleSource, derive_token_identity};
use std::sync::Arc;

/// Outcome of a resolution call, as observed by the caller's session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoleResolution {
    pub effective: EffectiveRole,
    pub principal: Option<Principal>,
}

impl RoleResolution {
    fn observe(session: &Session) -> Self {
        Self {
            effective: session.effective_role(),
            principal: session.principal(),
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.principal.is_some()
    }
}

#[derive(Clone)]
pub struct RoleResolver {
    source: Arc<dyn IdentitySource>,
    rules: Arc<ClaimRules>,
}

impl RoleResolver {
    pub fn new(source: Arc<dyn IdentitySource>, rules: ClaimRules) -> Self {
        Self {
            source,
            rules: Arc::new(rules),
        }
    }

    /// Resolve the session's effective role, seeding the base role if needed.
    pub async fn resolve(
        &self,
        session: &Session,
        credentials: Option<&Credentials>,
    ) -> RoleResolution {
        let epoch = session.current_epoch();
        if epoch.principal().is_some() {
            return RoleResolution::observe(session);
        }

        let pending = self.pending_for(&epoch, credentials);
        pending.clone().await;

        // Drop the marker once settled so an unresolved outcome can be retried.
        {
            let mut slot = epoch.pending().lock();
            if slot.as_ref().is_some_and(|current| current.ptr_eq(&pending)) {
                *slot = None;
            }
        }
        RoleResolution::observe(session)
    }

    fn pending_for(
        &self,
        epoch: &Arc<SessionEpoch>,
        credentials: Option<&Credentials>,
    ) -> PendingResolution {
        let mut slot = epoch.pending().lock();
        if let Some(pending) = slot.as_ref() {
            tracing::debug!(epoch = epoch.id(), "joining in-flight role resolution");
            return pending.clone();
        }
        let pending = run_resolution(
            epoch.clone(),
            self.source.clone(),
            self.rules.clone(),
            credentials.cloned(),
        )
        .boxed()
        .shared();
        *slot = Some(pending.clone());
        pending
    }
}

async fn run_resolution(
    epoch: Arc<SessionEpoch>,
    source: Arc<dyn IdentitySource>,
    rules: Arc<ClaimRules>,
    credentials: Option<Credentials>,
) -> Option<Principal> {
    // Another writer may have won between the caller's check and this task.
    if let Some(principal) = epoch.principal() {
        return Some(principal);
    }

    let candidate = authoritative_principal(source.as_ref(), credentials.as_ref())
        .await
        .or_else(|| token_principal(credentials.as_ref(), &rules))
        .or_else(|| {
            let cached = epoch.cached_principal();
            if let Some(principal) = cached {
                tracing::info!(
                    epoch = epoch.id(),
                    role = %principal.role,
                    "using cached role from restored session"
                );
            }
            cached
        });

    let Some(candidate) = candidate else {
        metrics::counter!("portal_role_resolutions_total", "source" => "unresolved")
            .increment(1);
        tracing::warn!(epoch = epoch.id(), "role unresolved; privileged views stay closed");
        return None;
    };

    metrics::counter!(
        "portal_role_resolutions_total",
        "source" => candidate.source.as_str()
    )
    .increment(1);
    let winner = epoch.seed(candidate);
    tracing::info!(
        epoch = epoch.id(),
        role = %winner.role,
        source = %winner.source,
        "base role resolved"
    );
    Some(winner)
}

async fn authoritative_principal(
    source: &dyn IdentitySource,
    credentials: Option<&Credentials>,
) -> Option<Principal> {
    let identity = match source.fetch_identity(credentials).await {
        Ok(identity) => identity,
        Err(err) => {
            tracing::warn!(
                error = %err,
                transient = err.is_transient(),
                "identity lookup failed; falling back to token claims"
            );
            return None;
        }
    };
    match backend_principal(&identity, credentials) {
        Ok(principal) => Some(principal),
        Err(err) => {
            tracing::warn!(
                error = %err,
                "identity response unusable; falling back to token claims"
            );
            None
        }
    }
}

fn backend_principal(
    identity: &IdentityResponse,
    credentials: Option<&Credentials>,
) -> Result<Principal, ClientError> {
    let declared = identity.declared_role().ok_or(ClientError::MissingRole)?;
    let role = Role::parse(declared).map_err(|err| {
        tracing::debug!(error = %err, "backend declared an unknown role");
        ClientError::MissingRole
    })?;
    Ok(Principal {
        role,
        source: RoleSource::Backend,
        organization_id: identity
            .org_id
            .or_else(|| credentials.and_then(Credentials::organization_id)),
        user_id: identity
            .user_id
            .or_else(|| credentials.and_then(Credentials::user_id)),
    })
}

fn token_principal(credentials: Option<&Credentials>, rules: &ClaimRules) -> Option<Principal> {
    let token = credentials.and_then(Credentials::bearer_token)?;
    match derive_token_identity(token, rules) {
        Ok(identity) => Some(Principal {
            role: identity.role,
            source: RoleSource::TokenClaims,
            organization_id: identity.organization_id,
            user_id: identity.user_id,
        }),
        Err(err) => {
            tracing::warn!(error = %err, "token claims unusable; role left unresolved");
            None
        }
    }
}
