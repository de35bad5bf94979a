use crate::assignment::{Assignment, AssignmentRow};
use crate::error::StoreError;
use crate::permission::Permission;
use crate::role::Role;
use crate::tenant::Tenant;
use crate::types::{
    GuardName, PermissionId, PermissionName, RoleId, RoleName, TenantId, TenantName, UserId,
};
use async_trait::async_trait;

/// Store interface for tenant lookups.
#[async_trait]
pub trait TenantStore {
    /// Returns the tenant with exactly this name.
    async fn tenant_by_name(
        &self,
        name: TenantName,
    ) -> std::result::Result<Option<Tenant>, StoreError>;

    /// Returns the tenant with this key.
    async fn tenant_by_id(&self, id: TenantId) -> std::result::Result<Option<Tenant>, StoreError>;
}

/// Store interface for the base role and permission catalogue.
#[async_trait]
pub trait PermissionStore {
    /// Returns the permission named `name` within `guard`.
    async fn permission_by_name(
        &self,
        name: PermissionName,
        guard: GuardName,
    ) -> std::result::Result<Option<Permission>, StoreError>;

    /// Returns the role named `name` within `guard`.
    async fn role_by_name(
        &self,
        name: RoleName,
        guard: GuardName,
    ) -> std::result::Result<Option<Role>, StoreError>;

    /// Returns every role the permission is attached to, regardless of tenant.
    async fn permission_roles(
        &self,
        permission: PermissionId,
    ) -> std::result::Result<Vec<Role>, StoreError>;
}

/// Store interface for ternary assignments.
///
/// Mutations must be atomic against the backing store.
#[async_trait]
pub trait AssignmentStore {
    /// Inserts the triple unless it already exists. Returns whether a row was added.
    async fn insert_assignment(
        &self,
        assignment: Assignment,
    ) -> std::result::Result<bool, StoreError>;

    /// Deletes the given triples and returns the ones that were present.
    ///
    /// Absent triples are skipped, so concurrent removers of the same row
    /// see it in exactly one result.
    async fn delete_assignments(
        &self,
        assignments: Vec<Assignment>,
    ) -> std::result::Result<Vec<Assignment>, StoreError>;

    /// Returns the user's assignments joined with role and tenant names.
    async fn user_assignments(
        &self,
        user: UserId,
    ) -> std::result::Result<Vec<AssignmentRow>, StoreError>;

    /// Returns the user's assignments whose role is in `roles`.
    async fn role_assignments(
        &self,
        user: UserId,
        roles: Vec<RoleId>,
    ) -> std::result::Result<Vec<AssignmentRow>, StoreError>;

    /// Returns users holding any role within the tenant.
    async fn tenant_users(&self, tenant: TenantId) -> std::result::Result<Vec<UserId>, StoreError>;

    /// Returns roles held by anyone within the tenant.
    async fn tenant_roles(&self, tenant: TenantId) -> std::result::Result<Vec<Role>, StoreError>;
}

/// Composite store trait.
pub trait Store: TenantStore + PermissionStore + AssignmentStore + Send + Sync {}

impl<T> Store for T where T: TenantStore + PermissionStore + AssignmentStore + Send + Sync {}
