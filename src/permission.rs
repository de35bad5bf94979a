use crate::error::{Error, Result};
use crate::types::{GuardName, PermissionId, PermissionName};

/// Permission scoped to a guard and attached to roles.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Permission {
    /// Permission key.
    pub id: PermissionId,
    /// Permission name.
    pub name: PermissionName,
    /// Guard the permission belongs to.
    pub guard: GuardName,
}

impl Permission {
    /// Creates a permission.
    pub fn new(id: impl Into<PermissionId>, name: PermissionName, guard: GuardName) -> Self {
        Self {
            id: id.into(),
            name,
            guard,
        }
    }
}

/// Caller-supplied permission reference.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum PermissionRef {
    /// Looked up in the principal's guard.
    Name(PermissionName),
    /// Already loaded.
    Entity(Permission),
}

impl From<PermissionName> for PermissionRef {
    fn from(name: PermissionName) -> Self {
        Self::Name(name)
    }
}

impl From<&PermissionName> for PermissionRef {
    fn from(name: &PermissionName) -> Self {
        Self::Name(name.clone())
    }
}

impl From<Permission> for PermissionRef {
    fn from(permission: Permission) -> Self {
        Self::Entity(permission)
    }
}

impl From<&Permission> for PermissionRef {
    fn from(permission: &Permission) -> Self {
        Self::Entity(permission.clone())
    }
}

impl TryFrom<&str> for PermissionRef {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self> {
        PermissionName::new(value).map(Self::Name)
    }
}
