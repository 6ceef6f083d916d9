//! Persistence for users
//!
//! [`UserStore`] is the seam between the repository and whatever keeps the
//! records. [`PersistenceSession`] wraps one store and is seeded into the
//! container before bootstrap, so everything built on top of it shares the
//! same backend.

use crate::contracts::{UserCreateRequest, UserUpdateRequest};
use crate::entity::User;
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;
use trellis_core::Error;

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_all(&self) -> Result<Vec<User>, Error>;

    async fn find_by_id(&self, id: u64) -> Result<Option<User>, Error>;

    /// Persist a new user and return it with its assigned id
    async fn insert(&self, data: UserCreateRequest) -> Result<User, Error>;

    /// Apply the present fields of `changes`; `None` if no such user
    async fn update(&self, id: u64, changes: UserUpdateRequest) -> Result<Option<User>, Error>;

    /// `true` if a user was removed
    async fn remove(&self, id: u64) -> Result<bool, Error>;
}

/// Process-local store; ids start at 1
#[derive(Debug)]
pub struct InMemoryUserStore {
    users: RwLock<BTreeMap<u64, User>>,
    next_id: AtomicU64,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self {
            users: RwLock::new(BTreeMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn len(&self) -> usize {
        self.users.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.read().is_empty()
    }
}

impl Default for InMemoryUserStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn find_all(&self) -> Result<Vec<User>, Error> {
        Ok(self.users.read().values().cloned().collect())
    }

    async fn find_by_id(&self, id: u64) -> Result<Option<User>, Error> {
        Ok(self.users.read().get(&id).cloned())
    }

    async fn insert(&self, data: UserCreateRequest) -> Result<User, Error> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let now = Utc::now();
        let user = User {
            id,
            name: data.name,
            email: data.email,
            age: data.age,
            created_at: now,
            updated_at: now,
        };
        self.users.write().insert(id, user.clone());
        debug!(user_id = id, "Inserted user");
        Ok(user)
    }

    async fn update(&self, id: u64, changes: UserUpdateRequest) -> Result<Option<User>, Error> {
        let mut users = self.users.write();
        let Some(user) = users.get_mut(&id) else {
            return Ok(None);
        };

        if let Some(name) = changes.name {
            user.name = name;
        }
        if let Some(email) = changes.email {
            user.email = email;
        }
        if let Some(age) = changes.age {
            user.age = age;
        }
        user.updated_at = Utc::now();
        Ok(Some(user.clone()))
    }

    async fn remove(&self, id: u64) -> Result<bool, Error> {
        Ok(self.users.write().remove(&id).is_some())
    }
}

/// Shared handle on the user store
#[derive(Clone)]
pub struct PersistenceSession {
    store: Arc<dyn UserStore>,
}

impl PersistenceSession {
    pub fn new(store: Arc<dyn UserStore>) -> Self {
        Self { store }
    }

    /// Session over a fresh [`InMemoryUserStore`]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryUserStore::new()))
    }

    pub fn store(&self) -> &dyn UserStore {
        self.store.as_ref()
    }
}

impl std::fmt::Debug for PersistenceSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistenceSession").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create(name: &str) -> UserCreateRequest {
        UserCreateRequest {
            name: name.to_string(),
            email: format!("{}@example.com", name.to_lowercase()),
            age: 30,
        }
    }

    #[tokio::test]
    async fn test_insert_assigns_sequential_ids() {
        let store = InMemoryUserStore::new();
        let first = store.insert(create("Ada")).await.unwrap();
        let second = store.insert(create("Grace")).await.unwrap();

        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);
        assert_eq!(store.len(), 2);
        assert_eq!(first.created_at, first.updated_at);
    }

    #[tokio::test]
    async fn test_update_only_touches_present_fields() {
        let store = InMemoryUserStore::new();
        let user = store.insert(create("Ada")).await.unwrap();

        let updated = store
            .update(
                user.id,
                UserUpdateRequest {
                    age: Some(36),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();

        assert_eq!(updated.name, "Ada");
        assert_eq!(updated.age, 36);
        assert!(updated.updated_at >= user.updated_at);
    }

    #[tokio::test]
    async fn test_missing_user() {
        let store = InMemoryUserStore::new();
        assert!(store.find_by_id(9).await.unwrap().is_none());
        assert!(store.update(9, UserUpdateRequest::default()).await.unwrap().is_none());
        assert!(!store.remove(9).await.unwrap());
    }

    #[tokio::test]
    async fn test_remove() {
        let session = PersistenceSession::in_memory();
        let user = session.store().insert(create("Ada")).await.unwrap();

        assert!(session.store().remove(user.id).await.unwrap());
        assert!(session.store().find_all().await.unwrap().is_empty());
    }
}
