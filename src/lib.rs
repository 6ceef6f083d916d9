// Trellis - a declarative route and dependency-injection registry
//
// Controllers, services and middleware are declared on a `RegistryContext`;
// bootstrap builds the object graph and registers every route with the
// transport before the server listens.

// Re-export core functionality
pub use trellis_core::*;

// Re-export optional crates
#[cfg(feature = "config")]
pub use trellis_config;

#[cfg(feature = "openapi")]
pub use trellis_openapi;

/// Prelude for common imports.
///
/// ```
/// use trellis::prelude::*;
///
/// let ctx = RegistryContext::new();
/// assert!(ctx.controllers().is_empty());
/// ```
pub mod prelude {
    pub use trellis_core::{
        Application, ApplicationBuilder, Call, Container, Cors, Error, HttpMethod, HttpRequest, HttpResponse,
        Injectable, Middleware, RegistryContext, Reply, RouteDef, RouteDoc, ServiceId,
    };

    #[cfg(feature = "config")]
    pub use trellis_config::{AppConfig, ConfigLoader};

    #[cfg(feature = "openapi")]
    pub use trellis_openapi::{OpenApiBuilder, OpenApiCollector};

    pub use async_trait::async_trait;
    pub use serde::{Deserialize, Serialize};
    pub use serde_json::json;
}
