//! Collects registered route documentation into an OpenAPI document

use crate::error::OpenApiError;
use crate::spec::*;
use std::collections::BTreeMap;
use tracing::debug;
use trellis_core::{DocumentationSink, HttpMethod, RouteDocumentation};

/// A [`DocumentationSink`] that writes each documented route into an
/// [`OpenApiSpec`].
///
/// Route patterns use `:name` segments; they are rewritten to the OpenAPI
/// `{name}` form and declared as required path parameters.
#[derive(Debug, Clone)]
pub struct OpenApiCollector {
    spec: OpenApiSpec,
}

impl OpenApiCollector {
    /// Start from a document skeleton, typically from [`crate::OpenApiBuilder`]
    pub fn new(spec: OpenApiSpec) -> Self {
        Self { spec }
    }

    pub fn spec(&self) -> &OpenApiSpec {
        &self.spec
    }

    pub fn into_spec(self) -> OpenApiSpec {
        self.spec
    }

    pub fn to_json(&self) -> Result<String, OpenApiError> {
        serde_json::to_string_pretty(&self.spec).map_err(|e| OpenApiError::Json(e.to_string()))
    }

    pub fn to_yaml(&self) -> Result<String, OpenApiError> {
        serde_yaml::to_string(&self.spec).map_err(|e| OpenApiError::Yaml(e.to_string()))
    }
}

impl DocumentationSink for OpenApiCollector {
    fn document(&mut self, doc: RouteDocumentation) {
        let (path, params) = openapi_path(&doc.url);
        debug!(method = %doc.method, path = %path, "Documenting route");

        let mut responses = BTreeMap::new();
        responses.insert(
            "200".to_string(),
            Response {
                description: "Successful response".to_string(),
            },
        );

        let operation = Operation {
            summary: doc.summary,
            description: doc.description,
            operation_id: None,
            tags: doc.tags,
            parameters: params
                .into_iter()
                .map(|name| Parameter {
                    name,
                    location: ParameterLocation::Path,
                    required: Some(true),
                    schema: Some(Schema::string()),
                })
                .collect(),
            responses,
        };

        let item = self.spec.paths.entry(path).or_default();
        let slot = match doc.method {
            HttpMethod::GET => &mut item.get,
            HttpMethod::POST => &mut item.post,
            HttpMethod::PUT => &mut item.put,
            HttpMethod::DELETE => &mut item.delete,
            HttpMethod::PATCH => &mut item.patch,
        };
        *slot = Some(operation);
    }
}

/// Rewrite `/users/:id` to `/users/{id}`, returning the parameter names
pub fn openapi_path(route: &str) -> (String, Vec<String>) {
    let mut params = Vec::new();
    let segments: Vec<String> = route
        .split('/')
        .map(|segment| match segment.strip_prefix(':') {
            Some(name) => {
                params.push(name.to_string());
                format!("{{{}}}", name)
            }
            None => segment.to_string(),
        })
        .collect();
    (segments.join("/"), params)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::OpenApiBuilder;

    fn doc(method: HttpMethod, url: &str) -> RouteDocumentation {
        RouteDocumentation {
            method,
            url: url.to_string(),
            summary: Some(format!("{} {}", method, url)),
            description: None,
            tags: vec!["users".to_string()],
        }
    }

    #[test]
    fn test_openapi_path() {
        assert_eq!(openapi_path("/users"), ("/users".to_string(), vec![]));
        assert_eq!(
            openapi_path("/orgs/:org/users/:id"),
            ("/orgs/{org}/users/{id}".to_string(), vec!["org".to_string(), "id".to_string()])
        );
        assert_eq!(openapi_path("/"), ("/".to_string(), vec![]));
    }

    #[test]
    fn test_documented_routes_share_a_path_item() {
        let mut collector = OpenApiCollector::new(OpenApiBuilder::new("Users", "1.0.0").build());
        collector.document(doc(HttpMethod::GET, "/users/:id"));
        collector.document(doc(HttpMethod::DELETE, "/users/:id"));

        let item = &collector.spec().paths["/users/{id}"];
        assert_eq!(item.operation_count(), 2);

        let get = item.get.as_ref().unwrap();
        assert_eq!(get.summary.as_deref(), Some("GET /users/:id"));
        assert_eq!(get.parameters[0].name, "id");
        assert_eq!(get.parameters[0].location, ParameterLocation::Path);
    }

    #[test]
    fn test_yaml_export() {
        let mut collector = OpenApiCollector::new(OpenApiBuilder::new("Users", "1.0.0").build());
        collector.document(doc(HttpMethod::POST, "/users"));

        let yaml = collector.to_yaml().unwrap();
        assert!(yaml.contains("openapi:"));
        assert!(yaml.contains("/users"));
    }
}
