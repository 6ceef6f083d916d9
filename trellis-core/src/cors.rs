// Cross-Origin Resource Sharing applied around the router

use crate::{HttpRequest, HttpResponse};
use tracing::trace;

const ALLOW_ORIGIN: &str = "Access-Control-Allow-Origin";
const ALLOW_CREDENTIALS: &str = "Access-Control-Allow-Credentials";

/// CORS policy of an application.
///
/// Every `OPTIONS` request is answered as a preflight before routing, and
/// every other response, error responses included, carries
/// `Access-Control-Allow-Origin`.
#[derive(Debug, Clone, PartialEq)]
pub struct Cors {
    pub allow_origin: String,
    pub allow_methods: String,
    /// Fixed allowed headers; `None` echoes `Access-Control-Request-Headers`
    pub allow_headers: Option<String>,
    pub allow_credentials: bool,
    pub max_age: u32,
}

impl Cors {
    pub fn new() -> Self {
        Self {
            allow_origin: "*".to_string(),
            allow_methods: "GET, HEAD, PUT, PATCH, POST, DELETE".to_string(),
            allow_headers: None,
            allow_credentials: false,
            max_age: 86400,
        }
    }

    pub fn allow_origin(mut self, origin: &str) -> Self {
        self.allow_origin = origin.to_string();
        self
    }

    pub fn allow_methods(mut self, methods: &str) -> Self {
        self.allow_methods = methods.to_string();
        self
    }

    pub fn allow_headers(mut self, headers: &str) -> Self {
        self.allow_headers = Some(headers.to_string());
        self
    }

    pub fn allow_credentials(mut self, allow: bool) -> Self {
        self.allow_credentials = allow;
        self
    }

    pub fn max_age(mut self, seconds: u32) -> Self {
        self.max_age = seconds;
        self
    }

    pub fn is_preflight(request: &HttpRequest) -> bool {
        request.method.eq_ignore_ascii_case("OPTIONS")
    }

    /// The 204 answering a preflight request
    pub fn preflight(&self, request: &HttpRequest) -> HttpResponse {
        let mut response = HttpResponse::new(204)
            .with_header(ALLOW_ORIGIN, self.allow_origin.as_str())
            .with_header("Access-Control-Allow-Methods", self.allow_methods.as_str())
            .with_header("Access-Control-Max-Age", self.max_age.to_string());

        let headers = self
            .allow_headers
            .as_ref()
            .or_else(|| request.header("access-control-request-headers"));
        if let Some(headers) = headers {
            response
                .headers
                .insert("Access-Control-Allow-Headers".to_string(), headers.clone());
        }
        if self.allow_credentials {
            response
                .headers
                .insert(ALLOW_CREDENTIALS.to_string(), "true".to_string());
        }

        trace!(path = %request.path, "Answered CORS preflight");
        response
    }

    /// Add the origin headers to a routed response
    pub fn apply(&self, response: &mut HttpResponse) {
        response
            .headers
            .insert(ALLOW_ORIGIN.to_string(), self.allow_origin.clone());
        if self.allow_credentials {
            response
                .headers
                .insert(ALLOW_CREDENTIALS.to_string(), "true".to_string());
        }
    }
}

impl Default for Cors {
    fn default() -> Self {
        Self::new()
    }
}
