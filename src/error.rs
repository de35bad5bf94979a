use crate::types::{GuardName, PermissionName, RoleName, TenantId, TenantName};
use thiserror::Error;

/// Store-layer error type.
pub type StoreError = Box<dyn std::error::Error + Send + Sync>;

/// Crate result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by this crate.
///
/// A denied authorization is never an error; checks return `Ok(false)`.
#[derive(Debug, Error)]
pub enum Error {
    /// Store error wrapper.
    #[error("store error: {0}")]
    Store(#[source] StoreError),
    /// Invalid identifier input.
    #[error("invalid id: {0}")]
    InvalidId(String),
    /// No tenant carries the given name.
    #[error("there is no tenant named `{0}`")]
    TenantNotFound(TenantName),
    /// No tenant carries the given id.
    #[error("there is no tenant with id `{0}`")]
    UnknownTenant(TenantId),
    /// Permission name unknown for the guard.
    #[error("there is no permission named `{name}` for guard `{guard}`")]
    PermissionNotFound {
        /// Requested permission name.
        name: PermissionName,
        /// Guard the lookup ran in.
        guard: GuardName,
    },
    /// Role name unknown for the guard.
    #[error("there is no role named `{name}` for guard `{guard}`")]
    RoleNotFound {
        /// Requested role name.
        name: RoleName,
        /// Guard the lookup ran in.
        guard: GuardName,
    },
}

impl From<StoreError> for Error {
    fn from(error: StoreError) -> Self {
        Self::Store(error)
    }
}
