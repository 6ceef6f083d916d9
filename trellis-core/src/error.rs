// Error types for the Trellis framework

use crate::validation::ValidationIssues;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    // Request-time errors
    #[error("Validation error: {0}")]
    Validation(ValidationIssues),

    #[error("Bad Request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not Found: {0}")]
    NotFound(String),

    #[error("Route not found: {0}")]
    RouteNotFound(String),

    #[error("Method not allowed: {0}")]
    MethodNotAllowed(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Bootstrap (configuration) errors
    #[error("Service not found: {0}")]
    ServiceNotFound(String),

    #[error("Invalid service: {0}")]
    InvalidService(String),

    #[error("Cyclic dependency detected: {0}")]
    CyclicDependency(String),

    #[error("Duplicate route: {0}")]
    DuplicateRoute(String),

    #[error("Invalid route declaration: {0}")]
    InvalidRoute(String),

    #[error("Logging initialization failed: {0}")]
    Logging(String),
}

impl Error {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            Error::Validation(_) | Error::BadRequest(_) | Error::Deserialization(_) => 400,
            Error::Unauthorized(_) => 401,
            Error::Forbidden(_) => 403,
            Error::NotFound(_) | Error::RouteNotFound(_) => 404,
            Error::MethodNotAllowed(_) => 405,
            _ => 500,
        }
    }

    /// Check if this is a client error (4xx)
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status_code())
    }

    /// Check if this is a server error (5xx)
    pub fn is_server_error(&self) -> bool {
        self.status_code() >= 500
    }

    /// Errors raised while wiring the application together. These abort
    /// bootstrap and must never surface as a request-time response.
    pub fn is_bootstrap_error(&self) -> bool {
        matches!(
            self,
            Error::ServiceNotFound(_)
                | Error::InvalidService(_)
                | Error::CyclicDependency(_)
                | Error::DuplicateRoute(_)
                | Error::InvalidRoute(_)
                | Error::Logging(_)
        )
    }

    /// Validation detail carried by this error, if any
    pub fn validation_issues(&self) -> Option<&ValidationIssues> {
        match self {
            Error::Validation(issues) => Some(issues),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}
