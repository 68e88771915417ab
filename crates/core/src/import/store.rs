//! Storage seam for the import pipeline.
//!
//! The pipeline only needs identity lookups, single-record writes and
//! counts. Postgres implements this in `verdant-db`; [`super::memory`]
//! provides an in-process implementation.

use async_trait::async_trait;

use super::rules::{Identity, ImportRecord};
use super::target::TargetKind;
use crate::types::DbId;

/// A single storage operation failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// A referenced record does not exist.
    #[error("{0}")]
    ForeignKey(String),

    /// A unique constraint rejected the write.
    #[error("{0}")]
    UniqueViolation(String),

    /// The backend rejected the values (check constraint, length, type).
    #[error("{0}")]
    Invalid(String),

    /// The backend itself failed (connection, timeout, unexpected error).
    #[error("Storage error: {0}")]
    Backend(String),
}

/// Which unique user field an import row collides with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserConflict {
    Username,
    Email,
}

impl UserConflict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Username => "username",
            Self::Email => "email",
        }
    }
}

/// Persistence operations used by validation, commit and status.
///
/// Every write is independent: there is no transaction spanning rows.
#[async_trait]
pub trait ImportStore: Send + Sync {
    /// Cheap liveness check for the backing store.
    async fn ping(&self) -> Result<(), StoreError>;

    /// Look up an existing record by normalized identity.
    async fn find_existing(&self, identity: &Identity) -> Result<Option<DbId>, StoreError>;

    /// Insert a new record and return its id.
    async fn create(&self, record: &ImportRecord) -> Result<DbId, StoreError>;

    /// Overwrite the imported fields of an existing record.
    ///
    /// Optional user fields that are `None` (role, credentials) keep their
    /// stored value.
    async fn update(&self, id: DbId, record: &ImportRecord) -> Result<(), StoreError>;

    /// Whether a supplier with this id exists.
    async fn supplier_exists(&self, id: DbId) -> Result<bool, StoreError>;

    /// Number of records of `kind`.
    async fn count(&self, kind: TargetKind) -> Result<i64, StoreError>;

    /// Whether a user account already holds this username or email.
    async fn find_user_conflict(
        &self,
        username: &str,
        email: &str,
    ) -> Result<Option<UserConflict>, StoreError>;
}
