//! View gating: which navigation sections a role may see.
//!
//! # Purpose
//! Pure mapping from an [`EffectiveRole`] to the fixed set of portal sections.
//!
//! # Key invariants
//! - No network or state side effects; callers re-evaluate whenever the
//!   effective role changes.
//! - `member` is the only tier with "my requests".
//! - Only `superadmin` sees system settings and the role-override control.
//! - `Resolving` yields the minimal set (main view only).
use crate::{EffectiveRole, Role};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NavigationSection {
    Main,
    DncChecker,
    MyRequests,
    AdminDashboard,
    SystemSettings,
    RoleOverride,
}

impl NavigationSection {
    pub const ALL: [NavigationSection; 6] = [
        NavigationSection::Main,
        NavigationSection::DncChecker,
        NavigationSection::MyRequests,
        NavigationSection::AdminDashboard,
        NavigationSection::SystemSettings,
        NavigationSection::RoleOverride,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            NavigationSection::Main => "main",
            NavigationSection::DncChecker => "dnc_checker",
            NavigationSection::MyRequests => "my_requests",
            NavigationSection::AdminDashboard => "admin_dashboard",
            NavigationSection::SystemSettings => "system_settings",
            NavigationSection::RoleOverride => "role_override",
        }
    }
}

impl std::fmt::Display for NavigationSection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sections visible to the given effective role.
pub fn visible_sections(role: EffectiveRole) -> BTreeSet<NavigationSection> {
    use NavigationSection::*;

    let sections: &[NavigationSection] = match role {
        EffectiveRole::Resolving => &[Main],
        EffectiveRole::Resolved(Role::Member) => &[Main, DncChecker, MyRequests],
        EffectiveRole::Resolved(Role::Admin | Role::Owner) => &[Main, DncChecker, AdminDashboard],
        EffectiveRole::Resolved(Role::Superadmin) => &NavigationSection::ALL,
    };
    sections.iter().copied().collect()
}

pub fn can_view(role: EffectiveRole, section: NavigationSection) -> bool {
    visible_sections(role).contains(&section)
}
