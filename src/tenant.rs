//! Tenant entity, tenant references and the tenant directory.

use crate::error::{Error, Result};
use crate::role::Role;
use crate::store::Store;
use crate::types::{TenantId, TenantName, UserId};

/// Isolation boundary under which role assignments are scoped.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Tenant {
    /// Unique key.
    pub id: TenantId,
    /// Unique name.
    pub name: TenantName,
}

impl Tenant {
    /// Creates a tenant.
    pub fn new(id: impl Into<TenantId>, name: TenantName) -> Self {
        Self {
            id: id.into(),
            name,
        }
    }
}

/// Caller-supplied tenant reference.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum TenantRef {
    /// Tenant given by name.
    Name(TenantName),
    /// Tenant given by key.
    Id(TenantId),
    /// Tenant given as a loaded entity.
    Entity(Tenant),
}

impl From<TenantName> for TenantRef {
    fn from(name: TenantName) -> Self {
        Self::Name(name)
    }
}

impl From<&TenantName> for TenantRef {
    fn from(name: &TenantName) -> Self {
        Self::Name(name.clone())
    }
}

impl From<TenantId> for TenantRef {
    fn from(id: TenantId) -> Self {
        Self::Id(id)
    }
}

impl From<Tenant> for TenantRef {
    fn from(tenant: Tenant) -> Self {
        Self::Entity(tenant)
    }
}

impl From<&Tenant> for TenantRef {
    fn from(tenant: &Tenant) -> Self {
        Self::Entity(tenant.clone())
    }
}

impl TryFrom<&str> for TenantRef {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self> {
        TenantName::new(value).map(Self::Name)
    }
}

/// Tenant lookups backed by the store.
///
/// Obtained from [`crate::Engine::tenants`].
#[derive(Debug)]
pub struct TenantDirectory<'a, S> {
    store: &'a S,
}

impl<'a, S> TenantDirectory<'a, S>
where
    S: Store,
{
    pub(crate) fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Finds a tenant by exact name.
    pub async fn find_by_name(&self, name: &TenantName) -> Result<Tenant> {
        self.store
            .tenant_by_name(name.clone())
            .await
            .map_err(Error::from)?
            .ok_or_else(|| Error::TenantNotFound(name.clone()))
    }

    /// Finds a tenant by key.
    pub async fn find_by_id(&self, id: TenantId) -> Result<Tenant> {
        self.store
            .tenant_by_id(id)
            .await
            .map_err(Error::from)?
            .ok_or(Error::UnknownTenant(id))
    }

    /// Resolves any tenant reference to exactly one stored tenant.
    pub async fn resolve(&self, tenant: &TenantRef) -> Result<Tenant> {
        match tenant {
            TenantRef::Name(name) => self.find_by_name(name).await,
            TenantRef::Id(id) => self.find_by_id(*id).await,
            TenantRef::Entity(entity) => self.find_by_id(entity.id).await,
        }
    }

    /// Returns the users holding at least one role within the tenant.
    pub async fn users(&self, tenant: impl Into<TenantRef>) -> Result<Vec<UserId>> {
        let tenant = self.resolve(&tenant.into()).await?;
        self.store.tenant_users(tenant.id).await.map_err(Error::from)
    }

    /// Returns the roles granted to anyone within the tenant.
    pub async fn roles(&self, tenant: impl Into<TenantRef>) -> Result<Vec<Role>> {
        let tenant = self.resolve(&tenant.into()).await?;
        self.store.tenant_roles(tenant.id).await.map_err(Error::from)
    }
}
