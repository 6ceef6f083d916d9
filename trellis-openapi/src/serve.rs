//! Serving the generated document

use crate::collector::OpenApiCollector;
use crate::error::OpenApiError;
use std::sync::Arc;
use trellis_core::{BoxFuture, Error, HandlerFn, HttpRequest, HttpResponse, join_paths};

/// Where the JSON document is served under a docs prefix
pub fn spec_json_path(docs_path: &str) -> String {
    join_paths(docs_path, "json")
}

/// Handler returning the document as JSON.
///
/// The document is serialized once; every request gets the same bytes.
pub fn spec_handler(collector: &OpenApiCollector) -> Result<HandlerFn, OpenApiError> {
    let body: Arc<Vec<u8>> = Arc::new(collector.to_json()?.into_bytes());

    Ok(Arc::new(move |_req: HttpRequest| -> BoxFuture<Result<HttpResponse, Error>> {
        let body = body.clone();
        Box::pin(async move {
            Ok(HttpResponse::ok()
                .with_header("Content-Type", "application/json")
                .with_body(body.as_ref().clone()))
        })
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::OpenApiBuilder;

    #[test]
    fn test_spec_json_path() {
        assert_eq!(spec_json_path("/public/docs"), "/public/docs/json");
        assert_eq!(spec_json_path("/docs/"), "/docs/json");
    }

    #[tokio::test]
    async fn test_spec_handler_serves_document() {
        let collector = OpenApiCollector::new(OpenApiBuilder::new("Users", "2.1.0").build());
        let handler = spec_handler(&collector).unwrap();

        let response = handler(HttpRequest::new("GET", "/public/docs/json")).await.unwrap();

        assert_eq!(response.status, 200);
        let body: serde_json::Value = serde_json::from_slice(&response.body).unwrap();
        assert_eq!(body["info"]["version"], "2.1.0");
    }
}
