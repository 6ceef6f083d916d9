// Startup errors of the users service

use thiserror::Error;
use trellis_config::ConfigError;
use trellis_openapi::OpenApiError;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Core(#[from] trellis_core::Error),

    #[error("Documentation error: {0}")]
    Docs(#[from] OpenApiError),
}
