//! Capability checks against the user's profile.
//!
//! Levels are ordered: a grant of `Update` satisfies a `View` requirement.
//! System administrators pass every check; anyone else needs an entry for
//! the tenant in their profile.

use openautomate_types::{PermissionLevel, Resource, SystemRole, UserProfile};

/// Effective level for `resource` in `tenant`.
///
/// Duplicate grants for one resource resolve to the highest.
pub fn permission_level(profile: &UserProfile, tenant: &str, resource: Resource) -> PermissionLevel {
    if profile.system_role == SystemRole::Admin {
        return PermissionLevel::Delete;
    }
    profile
        .tenant(tenant)
        .map(|ou| {
            ou.permissions
                .iter()
                .filter(|p| p.resource() == Some(resource))
                .map(|p| p.permission)
                .max()
                .unwrap_or(PermissionLevel::NoAccess)
        })
        .unwrap_or(PermissionLevel::NoAccess)
}

pub fn has_permission(
    profile: &UserProfile,
    tenant: &str,
    resource: Resource,
    level: PermissionLevel,
) -> bool {
    permission_level(profile, tenant, resource) >= level
}

/// Profile + tenant pair, for checking many requirements at once.
#[derive(Debug, Clone, Copy)]
pub struct PermissionChecker<'a> {
    profile: &'a UserProfile,
    tenant: &'a str,
}

impl<'a> PermissionChecker<'a> {
    pub fn new(profile: &'a UserProfile, tenant: &'a str) -> Self {
        Self { profile, tenant }
    }

    pub fn tenant(&self) -> &str {
        self.tenant
    }

    pub fn can(&self, resource: Resource, level: PermissionLevel) -> bool {
        has_permission(self.profile, self.tenant, resource, level)
    }

    pub fn can_view(&self, resource: Resource) -> bool {
        self.can(resource, PermissionLevel::View)
    }

    /// Resources the user can at least view, in `Resource::ALL` order.
    pub fn visible_resources(&self) -> Vec<Resource> {
        Resource::ALL
            .iter()
            .copied()
            .filter(|r| self.can_view(*r))
            .collect()
    }
}
