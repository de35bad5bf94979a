use crate::assignment::{Assignment, AssignmentFilter, AssignmentRow};
use crate::cache::{Cache, NoCache};
use crate::error::{Error, Result};
use crate::invalidation::{AssignmentEvent, InvalidationHook};
use crate::permission::{Permission, PermissionRef};
use crate::principal::Principal;
use crate::role::{RoleRef, RoleSelector};
use crate::store::Store;
use crate::tenant::{TenantDirectory, TenantRef};
use crate::types::{GuardName, RoleId, UserId};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

/// Tenant-scoped RBAC engine with pluggable store and optional cache.
pub struct Engine<S, C = NoCache> {
    store: S,
    cache: C,
    hooks: Vec<Arc<dyn InvalidationHook>>,
    default_guard: GuardName,
}

/// Builder for [`Engine`].
pub struct EngineBuilder<S, C = NoCache> {
    store: S,
    cache: C,
    hooks: Vec<Arc<dyn InvalidationHook>>,
    default_guard: GuardName,
}

impl<S> EngineBuilder<S, NoCache> {
    /// Creates a new builder with default configuration.
    pub fn new(store: S) -> Self {
        Self {
            store,
            cache: NoCache,
            hooks: Vec::new(),
            default_guard: GuardName::web(),
        }
    }
}

impl<S, C> EngineBuilder<S, C> {
    /// Sets the guard used for principals that do not name their own.
    pub fn default_guard(mut self, guard: GuardName) -> Self {
        self.default_guard = guard;
        self
    }

    /// Registers a hook raised after every assignment change.
    pub fn invalidation_hook(mut self, hook: impl InvalidationHook + 'static) -> Self {
        self.hooks.push(Arc::new(hook));
        self
    }

    /// Sets the cache implementation.
    pub fn cache<C2: Cache>(self, cache: C2) -> EngineBuilder<S, C2> {
        EngineBuilder {
            store: self.store,
            cache,
            hooks: self.hooks,
            default_guard: self.default_guard,
        }
    }

    /// Builds the engine.
    pub fn build(self) -> Engine<S, C> {
        Engine {
            store: self.store,
            cache: self.cache,
            hooks: self.hooks,
            default_guard: self.default_guard,
        }
    }
}

impl<S, C> fmt::Debug for Engine<S, C>
where
    S: fmt::Debug,
    C: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("store", &self.store)
            .field("cache", &self.cache)
            .field("hooks", &self.hooks.len())
            .field("default_guard", &self.default_guard)
            .finish()
    }
}

impl<S, C> Engine<S, C>
where
    S: Store,
    C: Cache,
{
    /// Returns the tenant directory backed by this engine's store.
    pub fn tenants(&self) -> TenantDirectory<'_, S> {
        TenantDirectory::new(&self.store)
    }

    /// Decides whether the principal holds the permission within the tenant.
    ///
    /// A permission given by name is looked up in the principal's guard and
    /// fails with [`Error::PermissionNotFound`] when unknown. Denial is `Ok(false)`.
    pub async fn has_permission_to_tenant<P>(
        &self,
        user: &P,
        permission: impl Into<PermissionRef>,
        tenant: impl Into<TenantRef>,
    ) -> Result<bool>
    where
        P: Principal + ?Sized,
    {
        let permission = self.resolve_permission(user, permission.into()).await?;
        let tenant = tenant.into();

        let allowed = self
            .has_direct_permission_with_tenant(user, &permission, &tenant)
            || self
                .has_permission_via_role_with_tenant(user, &permission, &tenant)
                .await?;

        tracing::debug!(
            user = %user.principal_id(),
            permission = %permission.name,
            tenant = ?tenant,
            allowed,
            "tenant permission check"
        );
        Ok(allowed)
    }

    /// Direct grants are not supported; always `false`.
    pub fn has_direct_permission_with_tenant<P>(
        &self,
        _user: &P,
        _permission: &Permission,
        _tenant: &TenantRef,
    ) -> bool
    where
        P: Principal + ?Sized,
    {
        false
    }

    /// Decides whether the principal holds the role (or any of the roles) within the tenant.
    ///
    /// An empty role set is treated as not held rather than as an error.
    pub async fn has_role_with_tenant<P>(
        &self,
        user: &P,
        role: impl Into<RoleRef>,
        tenant: impl Into<TenantRef>,
    ) -> Result<bool>
    where
        P: Principal + ?Sized,
    {
        let role = role.into();
        let tenant = tenant.into();
        let Some(filter) = AssignmentFilter::new(&role, &tenant) else {
            tracing::debug!(
                user = %user.principal_id(),
                ?role,
                "role reference selects no roles; treating as not held"
            );
            return Ok(false);
        };

        let rows = self.assignment_view(user.principal_id()).await?;
        Ok(rows.iter().any(|row| filter.matches(row)))
    }

    /// Returns every `(role, tenant)` pair the principal currently holds.
    pub async fn tenant_assignments<P>(&self, user: &P) -> Result<Vec<AssignmentRow>>
    where
        P: Principal + ?Sized,
    {
        self.assignment_view(user.principal_id()).await
    }

    /// Returns the principal's assignments whose role is in `roles`.
    pub async fn query_by_role<P>(
        &self,
        user: &P,
        roles: impl IntoIterator<Item = RoleId>,
    ) -> Result<Vec<AssignmentRow>>
    where
        P: Principal + ?Sized,
    {
        let roles: BTreeSet<RoleId> = roles.into_iter().collect();
        if roles.is_empty() {
            return Ok(Vec::new());
        }
        self.store
            .role_assignments(user.principal_id(), roles.into_iter().collect())
            .await
            .map_err(Error::from)
    }

    /// Returns the tenants in which the principal holds `role`.
    pub async fn check_via_role_id<P>(&self, user: &P, role: RoleId) -> Result<Vec<AssignmentRow>>
    where
        P: Principal + ?Sized,
    {
        self.query_by_role(user, [role]).await
    }

    /// Grants a single role within a tenant. Returns whether a row was added.
    pub async fn attach<P>(
        &self,
        user: &P,
        role: RoleId,
        tenant: impl Into<TenantRef>,
    ) -> Result<bool>
    where
        P: Principal + ?Sized,
    {
        let inserted = self.assign_role_to_tenant(user, role, tenant).await?;
        Ok(inserted > 0)
    }

    /// Grants one or more roles within a tenant.
    ///
    /// The tenant must resolve to a stored tenant; roles given by name are
    /// looked up in the principal's guard. Already-held roles are skipped.
    /// Returns the number of rows added.
    pub async fn assign_role_to_tenant<P>(
        &self,
        user: &P,
        roles: impl Into<RoleRef>,
        tenant: impl Into<TenantRef>,
    ) -> Result<usize>
    where
        P: Principal + ?Sized,
    {
        let user_id = user.principal_id();
        let tenant = self.tenants().resolve(&tenant.into()).await?;
        let role_ids = self.resolve_role_ids(user, roles.into()).await?;

        let mut added = Vec::new();
        for role in role_ids {
            let assignment = Assignment::new(user_id, role, tenant.id);
            if self
                .store
                .insert_assignment(assignment)
                .await
                .map_err(Error::from)?
            {
                added.push(assignment);
            }
        }

        tracing::debug!(
            user = %user_id,
            tenant = %tenant.name,
            inserted = added.len(),
            "assigned tenant roles"
        );
        let inserted = added.len();
        self.notify(AssignmentEvent::Assigned {
            user: user_id,
            assignments: added,
        })
        .await;
        Ok(inserted)
    }

    /// Revokes matching role grants within a tenant.
    ///
    /// Rows are matched with the same predicate as [`Engine::has_role_with_tenant`];
    /// nothing matching is a no-op. Returns the number of rows deleted.
    pub async fn remove_role_from_tenant<P>(
        &self,
        user: &P,
        role: impl Into<RoleRef>,
        tenant: impl Into<TenantRef>,
    ) -> Result<usize>
    where
        P: Principal + ?Sized,
    {
        self.detach_matching(user, role, tenant).await
    }

    /// Deletes the principal's assignment rows matching the role and tenant.
    pub async fn detach_matching<P>(
        &self,
        user: &P,
        role: impl Into<RoleRef>,
        tenant: impl Into<TenantRef>,
    ) -> Result<usize>
    where
        P: Principal + ?Sized,
    {
        let user_id = user.principal_id();
        let role = role.into();
        let tenant = tenant.into();
        let Some(filter) = AssignmentFilter::new(&role, &tenant) else {
            tracing::debug!(
                user = %user_id,
                ?role,
                "role reference selects no roles; nothing to remove"
            );
            return Ok(0);
        };

        let matches: Vec<Assignment> = self
            .store
            .user_assignments(user_id)
            .await
            .map_err(Error::from)?
            .iter()
            .filter(|row| filter.matches(row))
            .map(AssignmentRow::key)
            .collect();
        if matches.is_empty() {
            return Ok(0);
        }

        // A concurrent remover may have deleted some matches since the read.
        let removed = self
            .store
            .delete_assignments(matches)
            .await
            .map_err(Error::from)?;

        tracing::debug!(
            user = %user_id,
            ?tenant,
            removed = removed.len(),
            "removed tenant roles"
        );
        let count = removed.len();
        self.notify(AssignmentEvent::Removed {
            user: user_id,
            assignments: removed,
        })
        .await;
        Ok(count)
    }

    async fn resolve_permission<P>(&self, user: &P, permission: PermissionRef) -> Result<Permission>
    where
        P: Principal + ?Sized,
    {
        match permission {
            PermissionRef::Entity(permission) => Ok(permission),
            PermissionRef::Name(name) => {
                let guard = self.guard_for(user);
                self.store
                    .permission_by_name(name.clone(), guard.clone())
                    .await
                    .map_err(Error::from)?
                    .ok_or(Error::PermissionNotFound { name, guard })
            }
        }
    }

    async fn resolve_role_ids<P>(&self, user: &P, roles: RoleRef) -> Result<BTreeSet<RoleId>>
    where
        P: Principal + ?Sized,
    {
        match roles.selector() {
            RoleSelector::Ids(ids) => Ok(ids),
            RoleSelector::Name(name) => {
                let guard = self.guard_for(user);
                let role = self
                    .store
                    .role_by_name(name.clone(), guard.clone())
                    .await
                    .map_err(Error::from)?
                    .ok_or(Error::RoleNotFound { name, guard })?;
                Ok(BTreeSet::from([role.id]))
            }
        }
    }

    async fn has_permission_via_role_with_tenant<P>(
        &self,
        user: &P,
        permission: &Permission,
        tenant: &TenantRef,
    ) -> Result<bool>
    where
        P: Principal + ?Sized,
    {
        let roles = self
            .store
            .permission_roles(permission.id)
            .await
            .map_err(Error::from)?;
        if roles.is_empty() {
            return Ok(false);
        }
        self.has_role_with_tenant(user, roles, tenant.clone()).await
    }

    async fn assignment_view(&self, user: UserId) -> Result<Vec<AssignmentRow>> {
        if let Some(cached) = self.cache.get_assignments(&user).await {
            return Ok(cached);
        }

        // Read before the store so a mutation landing mid-read rejects the fill.
        let generation = self.cache.generation(&user).await;
        let rows = self
            .store
            .user_assignments(user)
            .await
            .map_err(Error::from)?;
        if !self
            .cache
            .set_assignments(&user, generation, rows.clone())
            .await
        {
            tracing::trace!(user = %user, "assignment view not cached");
        }
        Ok(rows)
    }

    // Runs after the store call has returned.
    async fn notify(&self, event: AssignmentEvent) {
        if event.assignments().is_empty() {
            return;
        }
        self.cache.invalidate_user(&event.user()).await;
        for hook in &self.hooks {
            hook.forget_cached_permissions(&event).await;
        }
    }

    fn guard_for<P>(&self, user: &P) -> GuardName
    where
        P: Principal + ?Sized,
    {
        user.guard_name()
            .cloned()
            .unwrap_or_else(|| self.default_guard.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory_cache::MemoryCache;
    use crate::memory_store::MemoryStore;
    use crate::error::StoreError;
    use crate::principal::User;
    use crate::role::Role;
    use crate::store::{AssignmentStore, PermissionStore, TenantStore};
    use crate::tenant::Tenant;
    use crate::types::{PermissionId, PermissionName, RoleName, TenantId, TenantName};
    use async_trait::async_trait;
    use futures::executor::block_on;
    use std::sync::{Barrier, Mutex, mpsc};

    const ACME: u64 = 1;
    const GLOBEX: u64 = 2;
    const EDITOR: u64 = 10;
    const VIEWER: u64 = 11;
    const PUBLISH: u64 = 100;

    fn tenant_name(value: &str) -> TenantName {
        TenantName::try_from(value).unwrap()
    }

    fn role_name(value: &str) -> RoleName {
        RoleName::try_from(value).unwrap()
    }

    fn permission_name(value: &str) -> PermissionName {
        PermissionName::try_from(value).unwrap()
    }

    fn seeded_store() -> MemoryStore {
        let store = MemoryStore::new();
        store.add_tenant(Tenant::new(ACME, tenant_name("acme")));
        store.add_tenant(Tenant::new(GLOBEX, tenant_name("globex")));
        store.add_role(Role::new(EDITOR, role_name("editor"), GuardName::web()));
        store.add_role(Role::new(VIEWER, role_name("viewer"), GuardName::web()));
        store.add_permission(Permission::new(
            PUBLISH,
            permission_name("publish-article"),
            GuardName::web(),
        ));
        store.give_permission_to_role(PUBLISH.into(), EDITOR.into());
        store
    }

    struct PausedRead {
        reached: mpsc::Sender<()>,
        resume: mpsc::Receiver<()>,
    }

    /// Memory store whose next `user_assignments` call blocks after reading
    /// until the test lets it continue.
    struct GatedStore {
        inner: MemoryStore,
        paused: Mutex<Option<PausedRead>>,
    }

    impl GatedStore {
        fn pause_next_read(inner: MemoryStore) -> (Self, mpsc::Receiver<()>, mpsc::Sender<()>) {
            let (reached_tx, reached_rx) = mpsc::channel();
            let (resume_tx, resume_rx) = mpsc::channel();
            let store = Self {
                inner,
                paused: Mutex::new(Some(PausedRead {
                    reached: reached_tx,
                    resume: resume_rx,
                })),
            };
            (store, reached_rx, resume_tx)
        }
    }

    #[async_trait]
    impl TenantStore for GatedStore {
        async fn tenant_by_name(
            &self,
            name: TenantName,
        ) -> std::result::Result<Option<Tenant>, StoreError> {
            self.inner.tenant_by_name(name).await
        }

        async fn tenant_by_id(
            &self,
            id: TenantId,
        ) -> std::result::Result<Option<Tenant>, StoreError> {
            self.inner.tenant_by_id(id).await
        }
    }

    #[async_trait]
    impl PermissionStore for GatedStore {
        async fn permission_by_name(
            &self,
            name: PermissionName,
            guard: GuardName,
        ) -> std::result::Result<Option<Permission>, StoreError> {
            self.inner.permission_by_name(name, guard).await
        }

        async fn role_by_name(
            &self,
            name: RoleName,
            guard: GuardName,
        ) -> std::result::Result<Option<Role>, StoreError> {
            self.inner.role_by_name(name, guard).await
        }

        async fn permission_roles(
            &self,
            permission: PermissionId,
        ) -> std::result::Result<Vec<Role>, StoreError> {
            self.inner.permission_roles(permission).await
        }
    }

    #[async_trait]
    impl AssignmentStore for GatedStore {
        async fn insert_assignment(
            &self,
            assignment: Assignment,
        ) -> std::result::Result<bool, StoreError> {
            self.inner.insert_assignment(assignment).await
        }

        async fn delete_assignments(
            &self,
            assignments: Vec<Assignment>,
        ) -> std::result::Result<Vec<Assignment>, StoreError> {
            self.inner.delete_assignments(assignments).await
        }

        async fn user_assignments(
            &self,
            user: UserId,
        ) -> std::result::Result<Vec<AssignmentRow>, StoreError> {
            let paused = self.paused.lock().unwrap().take();
            let rows = self.inner.user_assignments(user).await?;
            if let Some(paused) = paused {
                paused.reached.send(()).unwrap();
                paused.resume.recv().unwrap();
            }
            Ok(rows)
        }

        async fn role_assignments(
            &self,
            user: UserId,
            roles: Vec<RoleId>,
        ) -> std::result::Result<Vec<AssignmentRow>, StoreError> {
            self.inner.role_assignments(user, roles).await
        }

        async fn tenant_users(&self, tenant: TenantId) -> std::result::Result<Vec<UserId>, StoreError> {
            self.inner.tenant_users(tenant).await
        }

        async fn tenant_roles(&self, tenant: TenantId) -> std::result::Result<Vec<Role>, StoreError> {
            self.inner.tenant_roles(tenant).await
        }
    }

    #[test]
    fn assigned_role_should_be_held_only_in_its_tenant() {
        let engine = EngineBuilder::new(seeded_store()).build();
        let user = User::new(1);

        block_on(engine.assign_role_to_tenant(&user, RoleId::new(EDITOR), tenant_name("acme")))
            .unwrap();

        assert!(
            block_on(engine.has_role_with_tenant(&user, role_name("editor"), tenant_name("acme")))
                .unwrap()
        );
        assert!(
            !block_on(engine.has_role_with_tenant(
                &user,
                role_name("editor"),
                tenant_name("globex")
            ))
            .unwrap()
        );
    }

    #[test]
    fn resolver_should_answer_all_four_shapes() {
        let store = seeded_store();
        store.add_assignment(UserId::new(1), RoleId::new(EDITOR), TenantId::new(ACME));
        let engine = EngineBuilder::new(store).build();
        let user = User::new(1);
        let acme = Tenant::new(ACME, tenant_name("acme"));
        let ids = vec![RoleId::new(VIEWER), RoleId::new(EDITOR)];

        let checks = [
            (RoleRef::from(role_name("editor")), TenantRef::from(tenant_name("acme"))),
            (RoleRef::from(role_name("editor")), TenantRef::from(&acme)),
            (RoleRef::from(ids.clone()), TenantRef::from(tenant_name("acme"))),
            (RoleRef::from(ids), TenantRef::from(TenantId::new(ACME))),
        ];
        for (role, tenant) in checks {
            assert!(block_on(engine.has_role_with_tenant(&user, role, tenant)).unwrap());
        }
    }

    #[test]
    fn empty_role_set_should_resolve_to_false() {
        let store = seeded_store();
        store.add_assignment(UserId::new(1), RoleId::new(EDITOR), TenantId::new(ACME));
        let engine = EngineBuilder::new(store).build();

        let held = block_on(engine.has_role_with_tenant(
            &User::new(1),
            Vec::<RoleId>::new(),
            tenant_name("acme"),
        ))
        .unwrap();

        assert!(!held);
    }

    #[test]
    fn remove_should_restore_not_held() {
        let store = seeded_store();
        let engine = EngineBuilder::new(store.clone()).build();
        let user = User::new(1);
        let acme = Tenant::new(ACME, tenant_name("acme"));

        block_on(engine.assign_role_to_tenant(&user, role_name("editor"), &acme)).unwrap();
        let removed =
            block_on(engine.remove_role_from_tenant(&user, role_name("editor"), &acme)).unwrap();

        assert_eq!(removed, 1);
        assert_eq!(store.assignment_count(), 0);
        assert!(
            !block_on(engine.has_role_with_tenant(&user, role_name("editor"), &acme)).unwrap()
        );
    }

    #[test]
    fn remove_by_tenant_name_should_match_tenant_name() {
        let store = seeded_store();
        store.add_assignment(UserId::new(1), RoleId::new(EDITOR), TenantId::new(ACME));
        store.add_assignment(UserId::new(1), RoleId::new(EDITOR), TenantId::new(GLOBEX));
        let engine = EngineBuilder::new(store.clone()).build();
        let user = User::new(1);

        let removed = block_on(engine.remove_role_from_tenant(
            &user,
            vec![RoleId::new(EDITOR)],
            tenant_name("acme"),
        ))
        .unwrap();

        assert_eq!(removed, 1);
        assert!(
            block_on(engine.has_role_with_tenant(&user, role_name("editor"), tenant_name("globex")))
                .unwrap()
        );
    }

    #[test]
    fn duplicate_assignment_should_be_revoked_by_single_removal() {
        let store = seeded_store();
        let engine = EngineBuilder::new(store.clone()).build();
        let user = User::new(1);

        let first =
            block_on(engine.assign_role_to_tenant(&user, RoleId::new(EDITOR), TenantId::new(ACME)))
                .unwrap();
        let second =
            block_on(engine.attach(&user, RoleId::new(EDITOR), TenantId::new(ACME))).unwrap();

        assert_eq!(first, 1);
        assert!(!second);
        assert_eq!(store.assignment_count(), 1);

        block_on(engine.remove_role_from_tenant(&user, RoleId::new(EDITOR), TenantId::new(ACME)))
            .unwrap();
        assert!(
            !block_on(engine.has_role_with_tenant(&user, RoleId::new(EDITOR), TenantId::new(ACME)))
                .unwrap()
        );
    }

    #[test]
    fn removing_unassigned_role_should_be_noop() {
        let store = seeded_store();
        store.add_assignment(UserId::new(1), RoleId::new(EDITOR), TenantId::new(ACME));
        let engine = EngineBuilder::new(store.clone()).build();

        let removed = block_on(engine.remove_role_from_tenant(
            &User::new(1),
            role_name("viewer"),
            tenant_name("acme"),
        ))
        .unwrap();

        assert_eq!(removed, 0);
        assert_eq!(store.assignment_count(), 1);
    }

    #[test]
    fn assign_should_fail_for_unknown_tenant_name() {
        let engine = EngineBuilder::new(seeded_store()).build();

        let result = block_on(engine.assign_role_to_tenant(
            &User::new(1),
            RoleId::new(EDITOR),
            tenant_name("nonexistent"),
        ));

        assert!(matches!(result, Err(Error::TenantNotFound(name)) if name.as_str() == "nonexistent"));
    }

    #[test]
    fn assign_should_fail_for_unknown_role_name() {
        let engine = EngineBuilder::new(seeded_store()).build();

        let result = block_on(engine.assign_role_to_tenant(
            &User::new(1),
            role_name("owner"),
            TenantId::new(ACME),
        ));

        assert!(matches!(result, Err(Error::RoleNotFound { .. })));
    }

    #[test]
    fn assign_should_accept_role_collection() {
        let store = seeded_store();
        let engine = EngineBuilder::new(store.clone()).build();
        let roles = vec![
            Role::new(EDITOR, role_name("editor"), GuardName::web()),
            Role::new(VIEWER, role_name("viewer"), GuardName::web()),
        ];

        let inserted =
            block_on(engine.assign_role_to_tenant(&User::new(1), roles, TenantId::new(GLOBEX)))
                .unwrap();

        assert_eq!(inserted, 2);
        let rows = block_on(engine.check_via_role_id(&User::new(1), RoleId::new(VIEWER))).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].tenant_name.as_str(), "globex");
    }

    #[test]
    fn permission_should_follow_role_within_tenant() {
        let engine = EngineBuilder::new(seeded_store()).build();
        let user = User::new(1);
        block_on(engine.assign_role_to_tenant(&user, role_name("editor"), tenant_name("acme")))
            .unwrap();

        let in_acme = block_on(engine.has_permission_to_tenant(
            &user,
            permission_name("publish-article"),
            tenant_name("acme"),
        ))
        .unwrap();
        let elsewhere = block_on(engine.has_permission_to_tenant(
            &user,
            permission_name("publish-article"),
            tenant_name("other-tenant"),
        ))
        .unwrap();

        assert!(in_acme);
        assert!(!elsewhere);
    }

    #[test]
    fn permission_should_be_denied_without_any_role() {
        let engine = EngineBuilder::new(seeded_store()).build();

        let allowed = block_on(engine.has_permission_to_tenant(
            &User::new(7),
            permission_name("publish-article"),
            TenantId::new(ACME),
        ))
        .unwrap();

        assert!(!allowed);
    }

    #[test]
    fn permission_should_be_denied_for_role_without_permission() {
        let store = seeded_store();
        store.add_assignment(UserId::new(1), RoleId::new(VIEWER), TenantId::new(ACME));
        let engine = EngineBuilder::new(store).build();

        let allowed = block_on(engine.has_permission_to_tenant(
            &User::new(1),
            permission_name("publish-article"),
            tenant_name("acme"),
        ))
        .unwrap();

        assert!(!allowed);
    }

    #[test]
    fn unknown_permission_should_return_error_for_guard() {
        let engine = EngineBuilder::new(seeded_store()).build();
        let user = User::new(1).with_guard(GuardName::try_from("api").unwrap());

        let result = block_on(engine.has_permission_to_tenant(
            &user,
            permission_name("publish-article"),
            tenant_name("acme"),
        ));

        assert!(matches!(
            result,
            Err(Error::PermissionNotFound { guard, .. }) if guard.as_str() == "api"
        ));
    }

    #[test]
    fn direct_permission_should_always_be_false() {
        let store = seeded_store();
        store.add_assignment(UserId::new(1), RoleId::new(EDITOR), TenantId::new(ACME));
        let engine = EngineBuilder::new(store).build();
        let permission = Permission::new(PUBLISH, permission_name("publish-article"), GuardName::web());

        for tenant in [
            TenantRef::from(tenant_name("acme")),
            TenantRef::from(TenantId::new(ACME)),
            TenantRef::from(Tenant::new(GLOBEX, tenant_name("globex"))),
        ] {
            assert!(!engine.has_direct_permission_with_tenant(&User::new(1), &permission, &tenant));
        }
    }

    #[test]
    fn cached_view_should_be_refreshed_after_mutation() {
        let cache = MemoryCache::new(8);
        let engine = EngineBuilder::new(seeded_store())
            .cache(cache.clone())
            .build();
        let user = User::new(1);

        assert!(
            !block_on(engine.has_role_with_tenant(&user, role_name("editor"), TenantId::new(ACME)))
                .unwrap()
        );
        assert_eq!(cache.len(), 1);

        block_on(engine.assign_role_to_tenant(&user, RoleId::new(EDITOR), TenantId::new(ACME)))
            .unwrap();
        assert!(cache.is_empty());
        assert!(
            block_on(engine.has_role_with_tenant(&user, role_name("editor"), TenantId::new(ACME)))
                .unwrap()
        );

        block_on(engine.remove_role_from_tenant(&user, role_name("editor"), TenantId::new(ACME)))
            .unwrap();
        assert!(
            !block_on(engine.has_role_with_tenant(&user, role_name("editor"), TenantId::new(ACME)))
                .unwrap()
        );
    }

    #[test]
    fn hooks_should_fire_only_after_changes() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        let engine = EngineBuilder::new(seeded_store())
            .invalidation_hook(move |event: &AssignmentEvent| {
                sink.lock().unwrap().push(event.clone());
            })
            .build();
        let user = User::new(1);

        block_on(engine.assign_role_to_tenant(&user, RoleId::new(EDITOR), TenantId::new(ACME)))
            .unwrap();
        block_on(engine.assign_role_to_tenant(&user, RoleId::new(EDITOR), TenantId::new(ACME)))
            .unwrap();
        block_on(engine.remove_role_from_tenant(&user, role_name("viewer"), TenantId::new(ACME)))
            .unwrap();
        block_on(engine.remove_role_from_tenant(&user, role_name("editor"), TenantId::new(ACME)))
            .unwrap();

        let key = Assignment::new(UserId::new(1), RoleId::new(EDITOR), TenantId::new(ACME));
        let events = events.lock().unwrap();
        assert_eq!(
            *events,
            vec![
                AssignmentEvent::Assigned {
                    user: UserId::new(1),
                    assignments: vec![key],
                },
                AssignmentEvent::Removed {
                    user: UserId::new(1),
                    assignments: vec![key],
                },
            ]
        );
    }

    #[test]
    fn concurrent_checks_should_share_engine() {
        let store = seeded_store();
        store.add_assignment(UserId::new(1), RoleId::new(EDITOR), TenantId::new(ACME));
        let engine = Arc::new(EngineBuilder::new(store).cache(MemoryCache::new(4)).build());

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let engine = Arc::clone(&engine);
                std::thread::spawn(move || {
                    (0..50).all(|_| {
                        block_on(engine.has_permission_to_tenant(
                            &UserId::new(1),
                            permission_name("publish-article"),
                            TenantId::new(ACME),
                        ))
                        .unwrap()
                    })
                })
            })
            .collect();

        for handle in handles {
            assert!(handle.join().expect("thread panicked"));
        }
    }

    #[test]
    fn view_read_during_removal_should_not_be_cached() {
        let store = seeded_store();
        store.add_assignment(UserId::new(1), RoleId::new(EDITOR), TenantId::new(ACME));
        let (gated, reached, resume) = GatedStore::pause_next_read(store.clone());
        let engine = Arc::new(EngineBuilder::new(gated).cache(MemoryCache::new(8)).build());

        let reader = {
            let engine = Arc::clone(&engine);
            std::thread::spawn(move || {
                block_on(engine.has_role_with_tenant(
                    &User::new(1),
                    role_name("editor"),
                    TenantId::new(ACME),
                ))
                .unwrap()
            })
        };
        reached.recv().unwrap();

        let removed = block_on(engine.remove_role_from_tenant(
            &User::new(1),
            role_name("editor"),
            TenantId::new(ACME),
        ))
        .unwrap();
        resume.send(()).unwrap();
        assert!(reader.join().expect("thread panicked"));

        assert_eq!(removed, 1);
        assert_eq!(store.assignment_count(), 0);
        assert!(
            !block_on(engine.has_role_with_tenant(
                &User::new(1),
                role_name("editor"),
                TenantId::new(ACME)
            ))
            .unwrap()
        );
    }

    #[test]
    fn racing_removals_should_report_each_row_once() {
        let store = seeded_store();
        store.add_assignment(UserId::new(1), RoleId::new(EDITOR), TenantId::new(ACME));
        let (gated, reached, resume) = GatedStore::pause_next_read(store.clone());
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        let engine = Arc::new(
            EngineBuilder::new(gated)
                .invalidation_hook(move |event: &AssignmentEvent| {
                    sink.lock().unwrap().push(event.clone());
                })
                .build(),
        );

        let slow = {
            let engine = Arc::clone(&engine);
            std::thread::spawn(move || {
                block_on(engine.remove_role_from_tenant(
                    &User::new(1),
                    role_name("editor"),
                    TenantId::new(ACME),
                ))
                .unwrap()
            })
        };
        reached.recv().unwrap();

        let fast = block_on(engine.remove_role_from_tenant(
            &User::new(1),
            role_name("editor"),
            TenantId::new(ACME),
        ))
        .unwrap();
        resume.send(()).unwrap();
        let slow = slow.join().expect("thread panicked");

        assert_eq!(fast, 1);
        assert_eq!(slow, 0);
        let key = Assignment::new(UserId::new(1), RoleId::new(EDITOR), TenantId::new(ACME));
        assert_eq!(
            *events.lock().unwrap(),
            vec![AssignmentEvent::Removed {
                user: UserId::new(1),
                assignments: vec![key],
            }]
        );
    }

    #[test]
    fn concurrent_assigns_of_same_triple_should_insert_once() {
        const THREADS: usize = 8;
        let store = seeded_store();
        let engine = Arc::new(EngineBuilder::new(store.clone()).build());
        let start = Arc::new(Barrier::new(THREADS));

        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let engine = Arc::clone(&engine);
                let start = Arc::clone(&start);
                std::thread::spawn(move || {
                    start.wait();
                    block_on(engine.assign_role_to_tenant(
                        &User::new(1),
                        RoleId::new(EDITOR),
                        TenantId::new(ACME),
                    ))
                    .unwrap()
                })
            })
            .collect();
        let inserted: usize = handles
            .into_iter()
            .map(|handle| handle.join().expect("thread panicked"))
            .sum();

        assert_eq!(inserted, 1);
        assert_eq!(store.assignment_count(), 1);

        let removed = block_on(engine.remove_role_from_tenant(
            &User::new(1),
            RoleId::new(EDITOR),
            TenantId::new(ACME),
        ))
        .unwrap();
        assert_eq!(removed, 1);
        assert_eq!(store.assignment_count(), 0);
        assert!(
            !block_on(engine.has_role_with_tenant(
                &User::new(1),
                RoleId::new(EDITOR),
                TenantId::new(ACME)
            ))
            .unwrap()
        );
    }
}
