// Users business layer: maps stored records to API responses

use crate::contracts::{UserCreateRequest, UserResponse, UserUpdateRequest};
use crate::repository::UserRepository;
use std::sync::Arc;
use trellis_core::{Container, Error, Injectable, ServiceId};

pub struct UserService {
    repository: Arc<UserRepository>,
}

impl Injectable for UserService {
    fn dependencies() -> Vec<ServiceId> {
        vec![ServiceId::of::<UserRepository>()]
    }

    fn construct(container: &Container) -> Result<Self, Error> {
        Ok(Self {
            repository: container.get::<UserRepository>()?,
        })
    }
}

impl UserService {
    pub async fn get_all_users(&self) -> Result<Vec<UserResponse>, Error> {
        let users = self.repository.find_all_users().await?;
        Ok(users.iter().map(UserResponse::from).collect())
    }

    pub async fn get_user_by_id(&self, id: u64) -> Result<Option<UserResponse>, Error> {
        let user = self.repository.find_user_by_id(id).await?;
        Ok(user.as_ref().map(UserResponse::from))
    }

    pub async fn create_user(&self, data: UserCreateRequest) -> Result<UserResponse, Error> {
        let user = self.repository.create_user(data).await?;
        Ok(UserResponse::from(&user))
    }

    pub async fn update_user(&self, id: u64, changes: UserUpdateRequest) -> Result<Option<UserResponse>, Error> {
        let user = self.repository.update_user(id, changes).await?;
        Ok(user.as_ref().map(UserResponse::from))
    }

    pub async fn delete_user(&self, id: u64) -> Result<bool, Error> {
        self.repository.delete_user(id).await
    }
}
