//! Header-based authentication and role checks
//!
//! [`Authenticate`] reads `x-user-id` and `x-org-id`, and on success attaches
//! an [`AuthUser`] and an [`OrgId`] to the request extensions. [`Authorize`]
//! must run after it. Both reject by sending a JSON error reply, which stops
//! dispatch before the handler.

use async_trait::async_trait;
use serde_json::json;
use tracing::{debug, warn};
use trellis_core::{Error, HttpRequest, Middleware, Reply};

pub const USER_ID_HEADER: &str = "x-user-id";
pub const ORG_ID_HEADER: &str = "x-org-id";

/// The authenticated caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub id: String,
    pub roles: Vec<String>,
}

impl AuthUser {
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

/// Organization the request acts on behalf of
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrgId(pub String);

/// Users this service recognizes
fn known_user(id: &str) -> Option<AuthUser> {
    match id {
        "1" => Some(AuthUser {
            id: id.to_string(),
            roles: vec!["admin".to_string()],
        }),
        _ => None,
    }
}

fn reject(reply: &Reply, status: u16, message: &str) -> Result<(), Error> {
    reply.status(status).send_json(&json!({ "error": message }))
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Authenticate;

#[async_trait]
impl Middleware for Authenticate {
    async fn handle(&self, req: &mut HttpRequest, reply: &Reply) -> Result<(), Error> {
        let user_id = req.header(USER_ID_HEADER).filter(|v| !v.is_empty()).cloned();
        let org_id = req.header(ORG_ID_HEADER).filter(|v| !v.is_empty()).cloned();

        let (Some(user_id), Some(org_id)) = (user_id, org_id) else {
            debug!(path = %req.path, "Request without user or organization headers");
            return reject(reply, 401, "Missing user or organization information");
        };

        let Some(user) = known_user(&user_id) else {
            warn!(user_id = %user_id, "Rejected unknown user");
            return reject(reply, 401, "Unauthorized user");
        };

        debug!(user_id = %user.id, org_id = %org_id, "Authenticated request");
        req.extensions.insert(user);
        req.extensions.insert(OrgId(org_id));
        Ok(())
    }

    fn name(&self) -> &str {
        "authenticate"
    }
}

/// Requires an authenticated user holding at least one of `roles`
#[derive(Debug, Clone)]
pub struct Authorize {
    roles: Vec<String>,
}

impl Authorize {
    pub fn new<I, S>(roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            roles: roles.into_iter().map(Into::into).collect(),
        }
    }
}

#[async_trait]
impl Middleware for Authorize {
    async fn handle(&self, req: &mut HttpRequest, reply: &Reply) -> Result<(), Error> {
        let Some(user) = req.extensions.get::<AuthUser>() else {
            return reject(reply, 401, "User not authenticated");
        };

        if !self.roles.iter().any(|role| user.has_role(role)) {
            warn!(user_id = %user.id, required = ?self.roles, "User lacks required role");
            return reject(reply, 403, "User not authorized");
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "authorize"
    }
}
