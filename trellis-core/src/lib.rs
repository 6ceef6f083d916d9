// Core library for the Trellis framework
// Metadata store, DI container, declaration API, route registrar, dispatch
// pipeline, parameter validation and the HTTP runtime

pub mod application;
pub mod container;
pub mod cors;
pub mod declare;
pub mod dispatch;
pub mod error;
pub mod http;
pub mod logging;
pub mod metadata;
pub mod middleware;
pub mod registrar;
pub mod reporting;
pub mod routing;
pub mod validation;

// Re-export commonly used types
pub use application::*;
pub use container::*;
pub use cors::Cors;
pub use declare::*;
pub use dispatch::{Dispatcher, MAX_BOUND_ARGUMENTS, RouteBindings};
pub use error::*;
pub use self::http::*;
pub use metadata::{Facet, MetadataStore, ServiceId, Subject};
pub use middleware::*;
pub use registrar::*;
pub use reporting::*;
pub use routing::{HandlerFn, Route, Router};
pub use validation::{Primitive, Shape, ValidationIssue, ValidationIssues};

/// Result type used throughout Trellis
pub type Result<T, E = Error> = std::result::Result<T, E>;
