use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use userdesk_core::{User, UserId, UserPatch};

use super::{StoreError, UserStore};

/// In-memory user store for tests/dev. Keeps insertion order.
#[derive(Debug, Default)]
pub struct InMemoryUserStore {
    inner: RwLock<Vec<User>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<T>(_: T) -> StoreError {
    StoreError::Backend("user store lock poisoned".to_string())
}

/// Reject `email`/`username` values already owned by another record.
fn check_unique(
    users: &[User],
    skip: Option<&UserId>,
    email: Option<&str>,
    username: Option<&str>,
) -> Result<(), StoreError> {
    for other in users.iter().filter(|u| Some(&u.id) != skip) {
        if email.is_some_and(|e| other.email.eq_ignore_ascii_case(e)) {
            return Err(StoreError::Conflict("email already in use".to_string()));
        }
        if username.is_some_and(|n| other.username == n) {
            return Err(StoreError::Conflict("username already in use".to_string()));
        }
    }
    Ok(())
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn insert(&self, user: User) -> Result<User, StoreError> {
        let mut users = self.inner.write().map_err(poisoned)?;
        check_unique(&users, None, Some(&user.email), Some(&user.username))?;
        users.push(user.clone());
        Ok(user)
    }

    async fn get(&self, id: &UserId) -> Result<Option<User>, StoreError> {
        let users = self.inner.read().map_err(poisoned)?;
        Ok(users.iter().find(|u| &u.id == id).cloned())
    }

    async fn list(&self) -> Result<Vec<User>, StoreError> {
        let users = self.inner.read().map_err(poisoned)?;
        Ok(users.clone())
    }

    async fn update(
        &self,
        id: &UserId,
        patch: UserPatch,
        now: DateTime<Utc>,
    ) -> Result<Option<User>, StoreError> {
        let mut users = self.inner.write().map_err(poisoned)?;
        let Some(idx) = users.iter().position(|u| &u.id == id) else {
            return Ok(None);
        };
        check_unique(&users, Some(id), patch.email.as_deref(), patch.username.as_deref())?;
        let user = &mut users[idx];
        user.apply(patch, now);
        Ok(Some(user.clone()))
    }

    async fn remove(&self, id: &UserId) -> Result<Option<User>, StoreError> {
        let mut users = self.inner.write().map_err(poisoned)?;
        Ok(users
            .iter()
            .position(|u| &u.id == id)
            .map(|idx| users.remove(idx)))
    }

    async fn remove_many(&self, ids: &[UserId]) -> Result<u64, StoreError> {
        let mut users = self.inner.write().map_err(poisoned)?;
        let before = users.len();
        users.retain(|u| !ids.contains(&u.id));
        Ok((before - users.len()) as u64)
    }
}
