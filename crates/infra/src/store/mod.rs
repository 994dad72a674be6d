//! User storage abstractions.
//!
//! Handlers only see [`UserStore`]; the concrete backend (in-memory or
//! Postgres) is picked at startup from configuration.

pub mod in_memory;
pub mod postgres;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use userdesk_core::{User, UserId, UserPatch};

pub use in_memory::InMemoryUserStore;
pub use postgres::PostgresUserStore;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A uniqueness constraint was hit (duplicate email/username).
    #[error("conflict: {0}")]
    Conflict(String),

    /// The backend failed (connection, query, poisoned lock...).
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Persistence boundary for user records.
///
/// Lookups return `Ok(None)` for unknown ids; deciding whether that is a
/// failure is up to the caller.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn insert(&self, user: User) -> Result<User, StoreError>;

    async fn get(&self, id: &UserId) -> Result<Option<User>, StoreError>;

    /// All users, oldest first.
    async fn list(&self) -> Result<Vec<User>, StoreError>;

    async fn update(
        &self,
        id: &UserId,
        patch: UserPatch,
        now: DateTime<Utc>,
    ) -> Result<Option<User>, StoreError>;

    async fn remove(&self, id: &UserId) -> Result<Option<User>, StoreError>;

    /// Remove every listed user that exists; returns how many were removed.
    async fn remove_many(&self, ids: &[UserId]) -> Result<u64, StoreError>;
}

#[async_trait]
impl<S> UserStore for Arc<S>
where
    S: UserStore + ?Sized,
{
    async fn insert(&self, user: User) -> Result<User, StoreError> {
        (**self).insert(user).await
    }

    async fn get(&self, id: &UserId) -> Result<Option<User>, StoreError> {
        (**self).get(id).await
    }

    async fn list(&self) -> Result<Vec<User>, StoreError> {
        (**self).list().await
    }

    async fn update(
        &self,
        id: &UserId,
        patch: UserPatch,
        now: DateTime<Utc>,
    ) -> Result<Option<User>, StoreError> {
        (**self).update(id, patch, now).await
    }

    async fn remove(&self, id: &UserId) -> Result<Option<User>, StoreError> {
        (**self).remove(id).await
    }

    async fn remove_many(&self, ids: &[UserId]) -> Result<u64, StoreError> {
        (**self).remove_many(ids).await
    }
}
