//! Notifications raised after assignments change.

use crate::assignment::Assignment;
use crate::types::UserId;
use async_trait::async_trait;

/// Assignment change that has already been written to the store.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum AssignmentEvent {
    /// Rows added by an assign call.
    Assigned {
        /// Principal whose roles changed.
        user: UserId,
        /// Rows that were inserted.
        assignments: Vec<Assignment>,
    },
    /// Rows deleted by a remove call.
    Removed {
        /// Principal whose roles changed.
        user: UserId,
        /// Rows that were actually deleted by this call.
        assignments: Vec<Assignment>,
    },
}

impl AssignmentEvent {
    /// Returns the user whose grants changed.
    pub fn user(&self) -> UserId {
        match self {
            Self::Assigned { user, .. } | Self::Removed { user, .. } => *user,
        }
    }

    /// Returns the changed rows.
    pub fn assignments(&self) -> &[Assignment] {
        match self {
            Self::Assigned { assignments, .. } | Self::Removed { assignments, .. } => assignments,
        }
    }
}

/// Subscriber that drops permission state derived from assignments,
/// typically the base RBAC permission cache.
#[async_trait]
pub trait InvalidationHook: Send + Sync {
    /// Forgets cached permissions affected by the event.
    async fn forget_cached_permissions(&self, event: &AssignmentEvent);
}

#[async_trait]
impl<F> InvalidationHook for F
where
    F: Fn(&AssignmentEvent) + Send + Sync,
{
    async fn forget_cached_permissions(&self, event: &AssignmentEvent) {
        self(event)
    }
}
