use crate::types::{GuardName, RoleId, RoleName};
use std::collections::BTreeSet;

/// Role scoped to a guard. Tenancy lives on the assignment, not the role.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Role {
    /// Role key.
    pub id: RoleId,
    /// Role name.
    pub name: RoleName,
    /// Guard the role belongs to.
    pub guard: GuardName,
}

impl Role {
    /// Creates a role.
    pub fn new(id: impl Into<RoleId>, name: RoleName, guard: GuardName) -> Self {
        Self {
            id: id.into(),
            name,
            guard,
        }
    }
}

/// Caller-supplied role reference.
///
/// Collections are always carried as ids.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum RoleRef {
    /// Single role by name.
    Name(RoleName),
    /// Single role by key.
    Id(RoleId),
    /// Single loaded role.
    Entity(Role),
    /// Any of several roles by key.
    Set(Vec<RoleId>),
}

/// Normalized role predicate.
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) enum RoleSelector {
    Name(RoleName),
    Ids(BTreeSet<RoleId>),
}

impl RoleRef {
    /// Normalizes the reference into a name or a (possibly empty) id set.
    pub(crate) fn selector(&self) -> RoleSelector {
        match self {
            Self::Name(name) => RoleSelector::Name(name.clone()),
            Self::Id(id) => RoleSelector::Ids(BTreeSet::from([*id])),
            Self::Entity(role) => RoleSelector::Ids(BTreeSet::from([role.id])),
            Self::Set(ids) => RoleSelector::Ids(ids.iter().copied().collect()),
        }
    }
}

impl From<RoleName> for RoleRef {
    fn from(name: RoleName) -> Self {
        Self::Name(name)
    }
}

impl From<&RoleName> for RoleRef {
    fn from(name: &RoleName) -> Self {
        Self::Name(name.clone())
    }
}

impl From<RoleId> for RoleRef {
    fn from(id: RoleId) -> Self {
        Self::Id(id)
    }
}

impl From<Role> for RoleRef {
    fn from(role: Role) -> Self {
        Self::Entity(role)
    }
}

impl From<&Role> for RoleRef {
    fn from(role: &Role) -> Self {
        Self::Entity(role.clone())
    }
}

impl From<Vec<RoleId>> for RoleRef {
    fn from(ids: Vec<RoleId>) -> Self {
        Self::Set(ids)
    }
}

impl From<&[Role]> for RoleRef {
    fn from(roles: &[Role]) -> Self {
        Self::Set(roles.iter().map(|role| role.id).collect())
    }
}

impl From<Vec<Role>> for RoleRef {
    fn from(roles: Vec<Role>) -> Self {
        Self::from(roles.as_slice())
    }
}
