// HTTP controllers: users CRUD and the health check

use crate::auth::{Authenticate, Authorize, OrgId};
use crate::contracts::{UserCreateRequest, UserIdParams, UserResponse, UserUpdateRequest};
use crate::service::UserService;
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::debug;
use trellis_core::{Call, Container, Error, Injectable, RegistryContext, RouteDef, RouteDoc, ServiceId};

pub struct UserController {
    service: Arc<UserService>,
}

impl Injectable for UserController {
    fn dependencies() -> Vec<ServiceId> {
        vec![ServiceId::of::<UserService>()]
    }

    fn construct(container: &Container) -> Result<Self, Error> {
        Ok(Self {
            service: container.get::<UserService>()?,
        })
    }
}

fn parse_id(call: &Call) -> Result<u64, Error> {
    let params: UserIdParams = call.arg(0)?;
    params
        .id
        .parse()
        .map_err(|_| Error::BadRequest(format!("Invalid user ID: {}", params.id)))
}

fn users_doc(summary: &str) -> RouteDoc {
    RouteDoc::new().summary(summary).tag("users")
}

impl UserController {
    pub fn declare(ctx: &mut RegistryContext) {
        ctx.controller::<UserController>("/users")
            .route(
                RouteDef::get("get_users", "/")
                    .middleware(Authenticate)
                    .doc(users_doc("List users")),
                UserController::get_users,
            )
            .route(
                RouteDef::get("get_user", "/:id")
                    .param_contract::<UserIdParams>(0)
                    .doc(users_doc("Get a user by id")),
                UserController::get_user,
            )
            .route(
                RouteDef::post("create_user", "/")
                    .body_contract::<UserCreateRequest>(0)
                    .doc(users_doc("Create a user")),
                UserController::create_user,
            )
            .route(
                RouteDef::put("update_user", "/:id")
                    .param_contract::<UserIdParams>(0)
                    .body(1)
                    .doc(users_doc("Update a user")),
                UserController::update_user,
            )
            .route(
                RouteDef::delete("delete_user", "/:id")
                    .middleware(Authenticate)
                    .middleware(Authorize::new(["admin"]))
                    .param_contract::<UserIdParams>(0)
                    .doc(users_doc("Delete a user")),
                UserController::delete_user,
            );
    }

    async fn get_users(self: Arc<Self>, call: Call) -> Result<Vec<UserResponse>, Error> {
        if let Some(OrgId(org)) = call.request.extensions.get::<OrgId>() {
            debug!(org_id = %org, "Listing users");
        }
        self.service.get_all_users().await
    }

    async fn get_user(self: Arc<Self>, call: Call) -> Result<Option<UserResponse>, Error> {
        let user = self.service.get_user_by_id(parse_id(&call)?).await?;
        if user.is_none() {
            call.reply.status(404);
        }
        Ok(user)
    }

    async fn create_user(self: Arc<Self>, call: Call) -> Result<UserResponse, Error> {
        let data: UserCreateRequest = call.arg(0)?;
        let user = self.service.create_user(data).await?;
        call.reply.status(201);
        Ok(user)
    }

    async fn update_user(self: Arc<Self>, call: Call) -> Result<Option<UserResponse>, Error> {
        let id = parse_id(&call)?;
        let changes: UserUpdateRequest = match call.raw_arg(1) {
            Some(Value::Null) | None => UserUpdateRequest::default(),
            Some(_) => call.arg(1)?,
        };

        let user = self.service.update_user(id, changes).await?;
        if user.is_none() {
            call.reply.status(404);
        }
        Ok(user)
    }

    async fn delete_user(self: Arc<Self>, call: Call) -> Result<(), Error> {
        let deleted = self.service.delete_user(parse_id(&call)?).await?;
        call.reply.status(if deleted { 204 } else { 404 });
        Ok(())
    }
}

/// `GET /`
pub struct HealthController;

impl Injectable for HealthController {
    fn construct(_: &Container) -> Result<Self, Error> {
        Ok(HealthController)
    }
}

impl HealthController {
    pub fn declare(ctx: &mut RegistryContext) {
        ctx.controller::<HealthController>("/").route(
            RouteDef::get("health", "/").doc(RouteDoc::new().summary("Health check").tag("health")),
            HealthController::health,
        );
    }

    async fn health(self: Arc<Self>, _call: Call) -> Result<Value, Error> {
        Ok(json!({ "message": "Health Check API" }))
    }
}
