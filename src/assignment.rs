//! Ternary `(user, role, tenant)` assignments and the tenant-scoped role predicate.

use crate::role::{RoleRef, RoleSelector};
use crate::tenant::TenantRef;
use crate::types::{RoleId, RoleName, TenantId, TenantName, UserId};
use std::collections::BTreeSet;

/// One tenant-scoped role grant, keyed by all three ids.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Assignment {
    /// Principal holding the role.
    pub user: UserId,
    /// Role held.
    pub role: RoleId,
    /// Tenant the role is held in.
    pub tenant: TenantId,
}

impl Assignment {
    /// Creates an assignment key.
    pub fn new(user: UserId, role: RoleId, tenant: TenantId) -> Self {
        Self { user, role, tenant }
    }
}

/// Assignment joined with the role and tenant names.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AssignmentRow {
    /// Principal holding the role.
    pub user: UserId,
    /// Key of the role held.
    pub role_id: RoleId,
    /// Name of the role at the time of the read.
    pub role_name: RoleName,
    /// Key of the tenant the role is held in.
    pub tenant_id: TenantId,
    /// Name of the tenant at the time of the read.
    pub tenant_name: TenantName,
}

impl AssignmentRow {
    /// Returns the composite key of the row.
    pub fn key(&self) -> Assignment {
        Assignment::new(self.user, self.role_id, self.tenant_id)
    }
}

/// Row predicate built from a role and a tenant reference.
#[derive(Debug)]
pub(crate) enum AssignmentFilter {
    RoleNameTenantName(RoleName, TenantName),
    RoleNameTenantId(RoleName, TenantId),
    RoleIdsTenantName(BTreeSet<RoleId>, TenantName),
    RoleIdsTenantId(BTreeSet<RoleId>, TenantId),
}

impl AssignmentFilter {
    /// Returns `None` when the role reference normalizes to an empty id set.
    pub(crate) fn new(role: &RoleRef, tenant: &TenantRef) -> Option<Self> {
        let role = role.selector();
        if let RoleSelector::Ids(ids) = &role
            && ids.is_empty()
        {
            return None;
        }
        let filter = match (role, tenant) {
            (RoleSelector::Name(role), TenantRef::Name(tenant)) => {
                Self::RoleNameTenantName(role, tenant.clone())
            }
            (RoleSelector::Name(role), TenantRef::Id(id)) => Self::RoleNameTenantId(role, *id),
            (RoleSelector::Name(role), TenantRef::Entity(entity)) => {
                Self::RoleNameTenantId(role, entity.id)
            }
            (RoleSelector::Ids(ids), TenantRef::Name(tenant)) => {
                Self::RoleIdsTenantName(ids, tenant.clone())
            }
            (RoleSelector::Ids(ids), TenantRef::Id(id)) => Self::RoleIdsTenantId(ids, *id),
            (RoleSelector::Ids(ids), TenantRef::Entity(entity)) => {
                Self::RoleIdsTenantId(ids, entity.id)
            }
        };
        Some(filter)
    }

    pub(crate) fn matches(&self, row: &AssignmentRow) -> bool {
        match self {
            Self::RoleNameTenantName(role, tenant) => {
                &row.role_name == role && &row.tenant_name == tenant
            }
            Self::RoleNameTenantId(role, tenant) => {
                &row.role_name == role && row.tenant_id == *tenant
            }
            Self::RoleIdsTenantName(ids, tenant) => {
                ids.contains(&row.role_id) && &row.tenant_name == tenant
            }
            Self::RoleIdsTenantId(ids, tenant) => {
                ids.contains(&row.role_id) && row.tenant_id == *tenant
            }
        }
    }
}
