//! Shared session state for one signed-in tab.
//!
//! # Purpose
//! Holds the base principal (role plus organization and user ids), the
//! superadmin-only override, and the in-flight resolution marker.
//!
//! # How it fits
//! [`Session`] is a cheap cloneable handle passed explicitly to every reader.
//! Writes go through two paths only: the role resolver seeds the principal and
//! the [`crate::overrides`] functions set or clear the override.
//!
//! # Key invariants
//! - State lives in an epoch; signing out swaps in a fresh epoch, so anything
//!   still holding the old one (an in-flight resolution) writes into a dead epoch.
//! - The principal of an epoch is written at most once (`OnceLock`).
//! - The override is only stored and only reported while the base role is
//!   superadmin, and it is never part of a [`SessionSnapshot`].
use futures::future::{BoxFuture, Shared};
use parking_lot::{Mutex, RwLock};
use portal_authz::{EffectiveRole, NavigationSection, OrganizationId, Role, RoleSource, UserId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

pub(crate) type PendingResolution = Shared<BoxFuture<'static, Option<Principal>>>;

/// Resolved identity of the session: base role plus the ids it applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub role: Role,
    pub source: RoleSource,
    pub organization_id: Option<OrganizationId>,
    pub user_id: Option<UserId>,
}

/// The subset of session state persisted across reloads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    #[serde(default)]
    pub organization_id: Option<OrganizationId>,
    #[serde(default)]
    pub user_id: Option<UserId>,
    #[serde(default)]
    pub role: Option<Role>,
}

pub(crate) struct SessionEpoch {
    id: u64,
    principal: OnceLock<Principal>,
    override_role: Mutex<Option<Role>>,
    pending: Mutex<Option<PendingResolution>>,
    cached: Option<SessionSnapshot>,
}

impl SessionEpoch {
    fn new(id: u64, cached: Option<SessionSnapshot>) -> Self {
        Self {
            id,
            principal: OnceLock::new(),
            override_role: Mutex::new(None),
            pending: Mutex::new(None),
            cached,
        }
    }

    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    pub(crate) fn principal(&self) -> Option<Principal> {
        self.principal.get().copied()
    }

    /// Principal recovered from a restored snapshot, if it carried a role.
    pub(crate) fn cached_principal(&self) -> Option<Principal> {
        let cached = self.cached?;
        Some(Principal {
            role: cached.role?,
            source: RoleSource::Cached,
            organization_id: cached.organization_id,
            user_id: cached.user_id,
        })
    }

    /// Write the principal unless one is already set; returns whichever won.
    pub(crate) fn seed(&self, candidate: Principal) -> Principal {
        let winner = *self.principal.get_or_init(|| candidate);
        if winner != candidate {
            tracing::debug!(
                epoch = self.id,
                kept = %winner.role,
                discarded = %candidate.role,
                "base role already set; later resolution ignored"
            );
        }
        winner
    }

    pub(crate) fn pending(&self) -> &Mutex<Option<PendingResolution>> {
        &self.pending
    }

    pub(crate) fn override_role(&self) -> Option<Role> {
        match self.principal() {
            Some(principal) if principal.role.is_superadmin() => *self.override_role.lock(),
            _ => None,
        }
    }

    /// Store or clear the override. Returns false (and changes nothing) unless
    /// the base role is superadmin.
    pub(crate) fn apply_override(&self, candidate: Option<Role>) -> bool {
        let allowed = self
            .principal()
            .is_some_and(|principal| principal.role.is_superadmin());
        if allowed {
            *self.override_role.lock() = candidate;
        }
        allowed
    }

    pub(crate) fn effective_role(&self) -> EffectiveRole {
        match self.principal() {
            None => EffectiveRole::Resolving,
            Some(principal) => {
                EffectiveRole::Resolved(self.override_role().unwrap_or(principal.role))
            }
        }
    }
}

/// Cloneable handle to the session state of one signed-in tab.
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    epoch: RwLock<Arc<SessionEpoch>>,
    next_epoch: AtomicU64,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self::with_cached(None)
    }

    /// Recreate a session from persisted state.
    ///
    /// The snapshot's role is only a last-resort fallback: resolution still
    /// asks the backend and the token first.
    pub fn restore(snapshot: SessionSnapshot) -> Self {
        Self::with_cached(Some(snapshot))
    }

    fn with_cached(cached: Option<SessionSnapshot>) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                epoch: RwLock::new(Arc::new(SessionEpoch::new(0, cached))),
                next_epoch: AtomicU64::new(1),
            }),
        }
    }

    pub(crate) fn current_epoch(&self) -> Arc<SessionEpoch> {
        self.inner.epoch.read().clone()
    }

    pub fn effective_role(&self) -> EffectiveRole {
        self.current_epoch().effective_role()
    }

    pub fn base_role(&self) -> Option<Role> {
        self.principal().map(|principal| principal.role)
    }

    pub fn principal(&self) -> Option<Principal> {
        self.current_epoch().principal()
    }

    pub fn override_role(&self) -> Option<Role> {
        self.current_epoch().override_role()
    }

    pub fn organization_id(&self) -> Option<OrganizationId> {
        self.principal().and_then(|principal| principal.organization_id)
    }

    pub fn user_id(&self) -> Option<UserId> {
        self.principal().and_then(|principal| principal.user_id)
    }

    pub fn visible_sections(&self) -> BTreeSet<NavigationSection> {
        portal_authz::visible_sections(self.effective_role())
    }

    /// Persistable view of the session; the override is never included.
    pub fn snapshot(&self) -> SessionSnapshot {
        let epoch = self.current_epoch();
        match epoch.principal() {
            Some(principal) => SessionSnapshot {
                organization_id: principal.organization_id,
                user_id: principal.user_id,
                role: Some(principal.role),
            },
            None => epoch.cached.unwrap_or_default(),
        }
    }

    /// Tear the session down: principal, override and any cached snapshot are
    /// dropped, and in-flight resolutions can no longer affect this handle.
    pub fn sign_out(&self) {
        let id = self.inner.next_epoch.fetch_add(1, Ordering::Relaxed);
        let previous = {
            let mut epoch = self.inner.epoch.write();
            std::mem::replace(&mut *epoch, Arc::new(SessionEpoch::new(id, None)))
        };
        let had_pending = previous.pending().lock().take().is_some();
        tracing::info!(
            epoch = previous.id(),
            next_epoch = id,
            had_pending,
            "session signed out"
        );
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let epoch = self.current_epoch();
        f.debug_struct("Session")
            .field("epoch", &epoch.id())
            .field("principal", &epoch.principal())
            .field("override_role", &epoch.override_role())
            .finish()
    }
}
