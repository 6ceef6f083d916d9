//! OpenAPI 3.0 document generation for Trellis
//!
//! [`OpenApiCollector`] is a documentation sink: pass it to
//! `ApplicationBuilder::build` and every route declared with a `RouteDoc`
//! lands in the document under its full path.
//!
//! ```
//! use trellis_openapi::{ApiKeyLocation, OpenApiBuilder, OpenApiCollector};
//!
//! let spec = OpenApiBuilder::new("Users Service", "1.0.0")
//!     .description("Users CRUD")
//!     .add_bearer_auth("authorization", None)
//!     .add_api_key_auth("clientId", "client-id", ApiKeyLocation::Header, None)
//!     .build();
//!
//! let collector = OpenApiCollector::new(spec);
//! assert!(collector.spec().paths.is_empty());
//! ```

pub mod builder;
pub mod collector;
pub mod error;
pub mod serve;
pub mod spec;

pub use builder::*;
pub use collector::*;
pub use error::*;
pub use serve::*;
pub use spec::*;
