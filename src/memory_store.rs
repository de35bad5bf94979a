use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, RwLock};
use async_trait::async_trait;
use crate::assignment::{Assignment, AssignmentRow};
use crate::permission::Permission;
use crate::role::Role;
use crate::store::{AssignmentStore, PermissionStore, TenantStore};
use crate::tenant::Tenant;
use crate::types::{
    GuardName, PermissionId, PermissionName, RoleId, RoleName, TenantId, TenantName, UserId,
};

/// In-memory store implementation for tests and demos.
///
/// Assignments are a set, so attaching an existing triple is a no-op.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    tenants: RwLock<BTreeMap<TenantId, Tenant>>,
    roles: RwLock<BTreeMap<RoleId, Role>>,
    permissions: RwLock<HashMap<(PermissionName, GuardName), Permission>>,
    permission_roles: RwLock<HashMap<PermissionId, BTreeSet<RoleId>>>,
    assignments: RwLock<BTreeSet<Assignment>>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a tenant.
    pub fn add_tenant(&self, tenant: Tenant) {
        let mut guard = self.inner.tenants.write().expect("poisoned lock");
        guard.insert(tenant.id, tenant);
    }

    /// Adds or replaces a role.
    pub fn add_role(&self, role: Role) {
        let mut guard = self.inner.roles.write().expect("poisoned lock");
        guard.insert(role.id, role);
    }

    /// Adds or replaces a permission.
    pub fn add_permission(&self, permission: Permission) {
        let mut guard = self.inner.permissions.write().expect("poisoned lock");
        guard.insert(
            (permission.name.clone(), permission.guard.clone()),
            permission,
        );
    }

    /// Attaches a permission to a role.
    pub fn give_permission_to_role(&self, permission: PermissionId, role: RoleId) {
        let mut guard = self.inner.permission_roles.write().expect("poisoned lock");
        guard.entry(permission).or_default().insert(role);
    }

    /// Inserts an assignment row directly, bypassing tenant resolution.
    pub fn add_assignment(&self, user: UserId, role: RoleId, tenant: TenantId) {
        let mut guard = self.inner.assignments.write().expect("poisoned lock");
        guard.insert(Assignment::new(user, role, tenant));
    }

    /// Returns the number of stored assignment rows.
    pub fn assignment_count(&self) -> usize {
        self.inner.assignments.read().expect("poisoned lock").len()
    }

    fn joined_rows<F>(&self, keep: F) -> Vec<AssignmentRow>
    where
        F: Fn(&Assignment) -> bool,
    {
        let assignments = self.inner.assignments.read().expect("poisoned lock");
        let roles = self.inner.roles.read().expect("poisoned lock");
        let tenants = self.inner.tenants.read().expect("poisoned lock");
        // Inner join: rows whose role or tenant is gone are not visible.
        assignments
            .iter()
            .filter(|assignment| keep(*assignment))
            .filter_map(|assignment| {
                let role = roles.get(&assignment.role)?;
                let tenant = tenants.get(&assignment.tenant)?;
                Some(AssignmentRow {
                    user: assignment.user,
                    role_id: role.id,
                    role_name: role.name.clone(),
                    tenant_id: tenant.id,
                    tenant_name: tenant.name.clone(),
                })
            })
            .collect()
    }
}

#[async_trait]
impl TenantStore for MemoryStore {
    async fn tenant_by_name(
        &self,
        name: TenantName,
    ) -> std::result::Result<Option<Tenant>, crate::StoreError> {
        let guard = self.inner.tenants.read().expect("poisoned lock");
        Ok(guard.values().find(|tenant| tenant.name == name).cloned())
    }

    async fn tenant_by_id(
        &self,
        id: TenantId,
    ) -> std::result::Result<Option<Tenant>, crate::StoreError> {
        let guard = self.inner.tenants.read().expect("poisoned lock");
        Ok(guard.get(&id).cloned())
    }
}

#[async_trait]
impl PermissionStore for MemoryStore {
    async fn permission_by_name(
        &self,
        name: PermissionName,
        guard_name: GuardName,
    ) -> std::result::Result<Option<Permission>, crate::StoreError> {
        let guard = self.inner.permissions.read().expect("poisoned lock");
        Ok(guard.get(&(name, guard_name)).cloned())
    }

    async fn role_by_name(
        &self,
        name: RoleName,
        guard_name: GuardName,
    ) -> std::result::Result<Option<Role>, crate::StoreError> {
        let guard = self.inner.roles.read().expect("poisoned lock");
        Ok(guard
            .values()
            .find(|role| role.name == name && role.guard == guard_name)
            .cloned())
    }

    async fn permission_roles(
        &self,
        permission: PermissionId,
    ) -> std::result::Result<Vec<Role>, crate::StoreError> {
        let links = self.inner.permission_roles.read().expect("poisoned lock");
        let roles = self.inner.roles.read().expect("poisoned lock");
        Ok(links
            .get(&permission)
            .map(|ids| ids.iter().filter_map(|id| roles.get(id).cloned()).collect())
            .unwrap_or_default())
    }
}

#[async_trait]
impl AssignmentStore for MemoryStore {
    async fn insert_assignment(
        &self,
        assignment: Assignment,
    ) -> std::result::Result<bool, crate::StoreError> {
        let mut guard = self.inner.assignments.write().expect("poisoned lock");
        Ok(guard.insert(assignment))
    }

    async fn delete_assignments(
        &self,
        assignments: Vec<Assignment>,
    ) -> std::result::Result<Vec<Assignment>, crate::StoreError> {
        let mut guard = self.inner.assignments.write().expect("poisoned lock");
        Ok(assignments
            .into_iter()
            .filter(|assignment| guard.remove(assignment))
            .collect())
    }

    async fn user_assignments(
        &self,
        user: UserId,
    ) -> std::result::Result<Vec<AssignmentRow>, crate::StoreError> {
        Ok(self.joined_rows(|assignment| assignment.user == user))
    }

    async fn role_assignments(
        &self,
        user: UserId,
        roles: Vec<RoleId>,
    ) -> std::result::Result<Vec<AssignmentRow>, crate::StoreError> {
        Ok(self.joined_rows(|assignment| {
            assignment.user == user && roles.contains(&assignment.role)
        }))
    }

    async fn tenant_users(
        &self,
        tenant: TenantId,
    ) -> std::result::Result<Vec<UserId>, crate::StoreError> {
        let guard = self.inner.assignments.read().expect("poisoned lock");
        let users: BTreeSet<UserId> = guard
            .iter()
            .filter(|assignment| assignment.tenant == tenant)
            .map(|assignment| assignment.user)
            .collect();
        Ok(users.into_iter().collect())
    }

    async fn tenant_roles(
        &self,
        tenant: TenantId,
    ) -> std::result::Result<Vec<Role>, crate::StoreError> {
        let assignments = self.inner.assignments.read().expect("poisoned lock");
        let roles = self.inner.roles.read().expect("poisoned lock");
        let ids: BTreeSet<RoleId> = assignments
            .iter()
            .filter(|assignment| assignment.tenant == tenant)
            .map(|assignment| assignment.role)
            .collect();
        Ok(ids
            .iter()
            .filter_map(|id| roles.get(id).cloned())
            .collect())
    }
}
