//! Superadmin role override ("view as").
//!
//! Only a session whose resolved base role is superadmin may override; every
//! other request is rejected silently and the effective role is returned
//! unchanged. The base role itself is never modified.
use crate::Session;
use portal_authz::{EffectiveRole, Role};

/// Make `role` the effective role of a superadmin session.
pub fn set_override(session: &Session, role: Role) -> EffectiveRole {
    apply(session, Some(role))
}

/// Return a superadmin session to its base role.
pub fn clear_override(session: &Session) -> EffectiveRole {
    apply(session, None)
}

fn apply(session: &Session, candidate: Option<Role>) -> EffectiveRole {
    let epoch = session.current_epoch();
    if epoch.apply_override(candidate) {
        metrics::counter!(
            "portal_role_overrides_total",
            "action" => if candidate.is_some() { "set" } else { "clear" }
        )
        .increment(1);
        tracing::info!(
            epoch = epoch.id(),
            override_role = candidate.map(Role::as_str).unwrap_or("none"),
            "role override updated"
        );
    } else {
        tracing::debug!(
            epoch = epoch.id(),
            base_role = ?epoch.principal().map(|principal| principal.role),
            "role override rejected; base role is not superadmin"
        );
    }
    epoch.effective_role()
}
