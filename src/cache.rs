use crate::assignment::AssignmentRow;
use crate::types::UserId;
use async_trait::async_trait;

/// Cache interface for per-user assignment views.
///
/// Every invalidation advances the user's generation. A view read from the
/// store is only stored if the generation observed before that read is still
/// current, so a view loaded before a mutation cannot outlive it.
#[async_trait]
pub trait Cache: Send + Sync {
    /// Gets the cached assignment view for a user.
    async fn get_assignments(&self, user: &UserId) -> Option<Vec<AssignmentRow>>;

    /// Returns the user's current generation.
    async fn generation(&self, user: &UserId) -> u64;

    /// Stores the view unless the user was invalidated after `generation` was read.
    /// Returns whether the view was stored.
    async fn set_assignments(
        &self,
        user: &UserId,
        generation: u64,
        rows: Vec<AssignmentRow>,
    ) -> bool;

    /// Drops the user's view and advances their generation.
    async fn invalidate_user(&self, user: &UserId);
}

/// No-op cache implementation.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoCache;

#[async_trait]
impl Cache for NoCache {
    async fn get_assignments(&self, _user: &UserId) -> Option<Vec<AssignmentRow>> {
        None
    }

    async fn generation(&self, _user: &UserId) -> u64 {
        0
    }

    async fn set_assignments(
        &self,
        _user: &UserId,
        _generation: u64,
        _rows: Vec<AssignmentRow>,
    ) -> bool {
        false
    }

    async fn invalidate_user(&self, _user: &UserId) {}
}
