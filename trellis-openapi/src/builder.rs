//! Builder for the document skeleton: info, servers and security schemes

use crate::spec::*;
use std::collections::BTreeMap;

/// Builder for OpenAPI documents
#[derive(Debug, Clone)]
pub struct OpenApiBuilder {
    spec: OpenApiSpec,
}

impl OpenApiBuilder {
    pub fn new(title: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            spec: OpenApiSpec {
                openapi: "3.0.0".to_string(),
                info: Info {
                    title: title.into(),
                    version: version.into(),
                    description: None,
                },
                servers: Vec::new(),
                paths: BTreeMap::new(),
                components: Some(Components::default()),
                security: Vec::new(),
                tags: Vec::new(),
            },
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.spec.info.description = Some(description.into());
        self
    }

    pub fn server(mut self, url: impl Into<String>, description: Option<String>) -> Self {
        self.spec.servers.push(Server {
            url: url.into(),
            description,
        });
        self
    }

    pub fn tag(mut self, name: impl Into<String>, description: Option<String>) -> Self {
        self.spec.tags.push(Tag {
            name: name.into(),
            description,
        });
        self
    }

    pub fn security_scheme(mut self, name: impl Into<String>, scheme: SecurityScheme) -> Self {
        self.spec
            .components
            .get_or_insert_with(Components::default)
            .security_schemes
            .insert(name.into(), scheme);
        self
    }

    /// Add a global security requirement
    pub fn security(mut self, requirement: SecurityRequirement) -> Self {
        self.spec.security.push(requirement);
        self
    }

    /// Bearer token authentication
    pub fn add_bearer_auth(self, name: impl Into<String>, description: Option<String>) -> Self {
        self.security_scheme(
            name,
            SecurityScheme::Http {
                scheme: "bearer".to_string(),
                bearer_format: Some("JWT".to_string()),
                description,
            },
        )
    }

    /// API key authentication
    pub fn add_api_key_auth(
        self,
        name: impl Into<String>,
        key_name: impl Into<String>,
        location: ApiKeyLocation,
        description: Option<String>,
    ) -> Self {
        self.security_scheme(
            name,
            SecurityScheme::ApiKey {
                name: key_name.into(),
                location,
                description,
            },
        )
    }

    pub fn build(self) -> OpenApiSpec {
        self.spec
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_builder_basic() {
        let spec = OpenApiBuilder::new("Test API", "1.0.0").build();

        assert_eq!(spec.info.title, "Test API");
        assert_eq!(spec.info.version, "1.0.0");
        assert_eq!(spec.openapi, "3.0.0");
        assert!(spec.paths.is_empty());
    }

    #[test]
    fn test_openapi_builder_with_description() {
        let spec = OpenApiBuilder::new("Test API", "1.0.0")
            .description("A test API")
            .server("http://localhost", Some("LocalServer".to_string()))
            .build();

        assert_eq!(spec.info.description.as_deref(), Some("A test API"));
        assert_eq!(spec.servers[0].url, "http://localhost");
    }

    #[test]
    fn test_security_schemes_serialize() {
        let spec = OpenApiBuilder::new("Secure API", "1.0.0")
            .add_bearer_auth("authorization", Some("User Authorization token".to_string()))
            .add_api_key_auth("clientId", "client-id", ApiKeyLocation::Header, None)
            .build();

        let json = serde_json::to_value(&spec).unwrap();
        let schemes = &json["components"]["securitySchemes"];
        assert_eq!(schemes["authorization"]["type"], "http");
        assert_eq!(schemes["authorization"]["scheme"], "bearer");
        assert_eq!(schemes["authorization"]["bearerFormat"], "JWT");
        assert_eq!(schemes["clientId"]["type"], "apiKey");
        assert_eq!(schemes["clientId"]["in"], "header");
        assert_eq!(schemes["clientId"]["name"], "client-id");
    }
}
