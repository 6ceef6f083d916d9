// Error types for OpenAPI generation

use thiserror::Error;

#[derive(Error, Debug)]
pub enum OpenApiError {
    #[error("Failed to serialize document as JSON: {0}")]
    Json(String),

    #[error("Failed to serialize document as YAML: {0}")]
    Yaml(String),
}

impl From<OpenApiError> for trellis_core::Error {
    fn from(err: OpenApiError) -> Self {
        trellis_core::Error::Serialization(err.to_string())
    }
}
