//! Users CRUD service
//!
//! Wires the users resource into a [`RegistryContext`]: the persistence
//! session is provided as a ready instance, the repository and service are
//! built by the container, and two controllers expose them over HTTP.
//!
//! ```
//! use trellis_core::{Application, RegistryContext};
//! use trellis_users::{PersistenceSession, declare};
//!
//! let mut ctx = RegistryContext::new();
//! declare(&mut ctx, PersistenceSession::in_memory());
//!
//! let app = Application::bootstrap(&ctx).unwrap();
//! assert_eq!(app.router().routes.len(), 6);
//! ```

pub mod auth;
pub mod contracts;
pub mod controller;
pub mod entity;
pub mod error;
pub mod repository;
pub mod service;
pub mod store;

pub use auth::{AuthUser, Authenticate, Authorize, OrgId};
pub use contracts::*;
pub use controller::{HealthController, UserController};
pub use entity::User;
pub use error::ServiceError;
pub use repository::UserRepository;
pub use service::UserService;
pub use store::{InMemoryUserStore, PersistenceSession, UserStore};

use trellis_core::{Cors, RegistryContext};
use trellis_openapi::{ApiKeyLocation, OpenApiBuilder};

/// Declare every service and controller of the users resource
pub fn declare(ctx: &mut RegistryContext, session: PersistenceSession) {
    ctx.provide(session)
        .injectable::<UserRepository>()
        .injectable::<UserService>();

    HealthController::declare(ctx);
    UserController::declare(ctx);
}

/// Browsers may call the service from any origin
pub fn cors_policy() -> Cors {
    Cors::new().allow_origin("*")
}

/// OpenAPI skeleton with the service's security schemes
pub fn api_document(version: &str) -> OpenApiBuilder {
    OpenApiBuilder::new("Users Service", version)
        .description("Users CRUD API")
        .server("http://localhost", Some("LocalServer".to_string()))
        .tag("users", Some("User management".to_string()))
        .add_bearer_auth("authorization", Some("User Authorization token".to_string()))
        .add_api_key_auth("clientId", "client-id", ApiKeyLocation::Header, None)
        .add_api_key_auth("clientSecret", "client-secret", ApiKeyLocation::Header, None)
}
