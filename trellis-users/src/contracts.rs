// Request and response contracts for the users resource
//
// Request contracts double as validation shapes: the `Default` value of
// each type is the example a bound argument is checked against.

use crate::entity::User;
use serde::{Deserialize, Serialize};

/// Body of `POST /users`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserCreateRequest {
    pub name: String,
    pub email: String,
    pub age: u32,
}

/// Body of `PUT /users/:id`; absent fields are left unchanged
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserUpdateRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub age: Option<u32>,
}

/// Path parameters of `/users/:id`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserIdParams {
    pub id: String,
}

/// A user as returned by the API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: u64,
    pub name: String,
    pub email: String,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
        }
    }
}
