// Data access for users over the persistence session

use crate::contracts::{UserCreateRequest, UserUpdateRequest};
use crate::entity::User;
use crate::store::PersistenceSession;
use std::sync::Arc;
use tracing::debug;
use trellis_core::{Container, Error, Injectable, ServiceId};

pub struct UserRepository {
    session: Arc<PersistenceSession>,
}

impl Injectable for UserRepository {
    fn dependencies() -> Vec<ServiceId> {
        vec![ServiceId::of::<PersistenceSession>()]
    }

    fn construct(container: &Container) -> Result<Self, Error> {
        Ok(Self {
            session: container.get::<PersistenceSession>()?,
        })
    }
}

impl UserRepository {
    pub async fn find_all_users(&self) -> Result<Vec<User>, Error> {
        self.session.store().find_all().await
    }

    pub async fn find_user_by_id(&self, id: u64) -> Result<Option<User>, Error> {
        self.session.store().find_by_id(id).await
    }

    pub async fn create_user(&self, data: UserCreateRequest) -> Result<User, Error> {
        let user = self.session.store().insert(data).await?;
        debug!(user_id = user.id, "Created user");
        Ok(user)
    }

    pub async fn update_user(&self, id: u64, changes: UserUpdateRequest) -> Result<Option<User>, Error> {
        self.session.store().update(id, changes).await
    }

    pub async fn delete_user(&self, id: u64) -> Result<bool, Error> {
        let deleted = self.session.store().remove(id).await?;
        debug!(user_id = id, deleted, "Deleted user");
        Ok(deleted)
    }
}
