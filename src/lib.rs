//! Tenant-scoped role resolution for multi-tenant RBAC.
//!
//! Roles are granted to principals *within* a tenant through ternary
//! `(user, role, tenant)` assignments. [`Engine`] answers whether a principal
//! holds a role or a permission within a tenant, and mutates assignments while
//! keeping any configured [`Cache`] and [`InvalidationHook`]s consistent.
//! Denial is always `Ok(false)`; errors are reserved for unknown named
//! entities and store failures.
//!
//! # Examples
//!
//! Assigning a role and checking a permission with the in-memory store
//! (enable `memory-store`):
//! ```no_run
//! # #[cfg(feature = "memory-store")]
//! # {
//! use futures::executor::block_on;
//! use tenant_rbac::{
//!     EngineBuilder, GuardName, MemoryStore, Permission, PermissionName, Role, RoleName,
//!     Tenant, TenantName, User,
//! };
//! let store = MemoryStore::new();
//! store.add_tenant(Tenant::new(1, TenantName::try_from("acme").unwrap()));
//! store.add_role(Role::new(1, RoleName::try_from("editor").unwrap(), GuardName::web()));
//! let publish = PermissionName::try_from("publish-article").unwrap();
//! store.add_permission(Permission::new(1, publish.clone(), GuardName::web()));
//! store.give_permission_to_role(1.into(), 1.into());
//!
//! let engine = EngineBuilder::new(store).build();
//! let user = User::new(42);
//! let acme = TenantName::try_from("acme").unwrap();
//! block_on(engine.assign_role_to_tenant(&user, RoleName::try_from("editor").unwrap(), &acme))
//!     .unwrap();
//! assert!(block_on(engine.has_permission_to_tenant(&user, publish, acme)).unwrap());
//! # }
//! ```
//!
//! Creating a process-local view cache (enable `memory-cache`):
//! ```no_run
//! # #[cfg(feature = "memory-cache")]
//! # {
//! use tenant_rbac::MemoryCache;
//! use std::time::Duration;
//! let cache = MemoryCache::new(1024).with_ttl(Duration::from_secs(30));
//! # let _ = cache;
//! # }
//! ```
#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod assignment;
mod cache;
mod engine;
mod error;
mod invalidation;
mod permission;
mod principal;
mod role;
mod store;
mod tenant;
mod types;
#[cfg(any(test, feature = "memory-cache"))]
mod memory_cache;

#[cfg(any(test, feature = "memory-store"))]
mod memory_store;

pub use crate::assignment::{Assignment, AssignmentRow};
pub use crate::cache::{Cache, NoCache};
pub use crate::engine::{Engine, EngineBuilder};
pub use crate::error::{Error, Result, StoreError};
pub use crate::invalidation::{AssignmentEvent, InvalidationHook};
pub use crate::permission::{Permission, PermissionRef};
pub use crate::principal::{Principal, User};
pub use crate::role::{Role, RoleRef};
pub use crate::store::{AssignmentStore, PermissionStore, Store, TenantStore};
pub use crate::tenant::{Tenant, TenantDirectory, TenantRef};
pub use crate::types::{
    GuardName, PermissionId, PermissionName, RoleId, RoleName, TenantId, TenantName, UserId,
};

#[cfg(any(test, feature = "memory-store"))]
pub use crate::memory_store::MemoryStore;

#[cfg(any(test, feature = "memory-cache"))]
pub use crate::memory_cache::MemoryCache;
