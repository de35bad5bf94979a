use crate::types::{GuardName, UserId};

/// Entity that can hold tenant-scoped roles.
pub trait Principal: Send + Sync {
    /// Returns the principal key stored in assignments.
    fn principal_id(&self) -> UserId;

    /// Returns the principal's own guard, if it has one.
    ///
    /// When `None`, the engine falls back to its configured default guard.
    fn guard_name(&self) -> Option<&GuardName> {
        None
    }
}

/// Plain principal carrying an id and an optional guard.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct User {
    /// Principal key.
    pub id: UserId,
    /// Guard override.
    pub guard: Option<GuardName>,
}

impl User {
    /// Creates a user using the engine's default guard.
    pub fn new(id: impl Into<UserId>) -> Self {
        Self {
            id: id.into(),
            guard: None,
        }
    }

    /// Sets the user's guard.
    pub fn with_guard(mut self, guard: GuardName) -> Self {
        self.guard = Some(guard);
        self
    }
}

impl Principal for User {
    fn principal_id(&self) -> UserId {
        self.id
    }

    fn guard_name(&self) -> Option<&GuardName> {
        self.guard.as_ref()
    }
}

impl Principal for UserId {
    fn principal_id(&self) -> UserId {
        *self
    }
}
