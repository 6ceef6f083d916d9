// Routing: the HTTP transport routes are registered with

use crate::declare::BoxFuture;
use crate::registrar::Transport;
use crate::{Error, HttpMethod, HttpRequest, HttpResponse};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// A route handler function type
pub type HandlerFn = Arc<dyn Fn(HttpRequest) -> BoxFuture<Result<HttpResponse, Error>> + Send + Sync>;

/// Route definition with handler
#[derive(Clone)]
pub struct Route {
    pub method: HttpMethod,
    pub path: String,
    pub handler: HandlerFn,
}

impl std::fmt::Debug for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Route")
            .field("method", &self.method)
            .field("path", &self.path)
            .finish()
    }
}

/// Router for managing routes and dispatching requests
#[derive(Default)]
pub struct Router {
    pub routes: Vec<Route>,
}

impl Router {
    pub fn new() -> Self {
        Self { routes: Vec::new() }
    }

    /// Add a route to the router
    pub fn add_route(&mut self, route: Route) {
        debug!(method = %route.method, path = %route.path, "Route added");
        self.routes.push(route);
    }

    /// Check whether a route exists for exactly this method and pattern
    pub fn has_route(&self, method: HttpMethod, path: &str) -> bool {
        self.routes
            .iter()
            .any(|r| r.method == method && r.path == path)
    }

    /// Pattern of the route that serves `method path`; any query is ignored
    pub fn matched_pattern(&self, method: &str, path: &str) -> Option<&str> {
        let path = path.split_once('?').map_or(path, |(path, _)| path);
        self.routes
            .iter()
            .find(|r| r.method.as_str().eq_ignore_ascii_case(method) && match_path(&r.path, path).is_some())
            .map(|r| r.path.as_str())
    }

    /// Find a route that matches the request
    pub async fn route(&self, mut request: HttpRequest) -> Result<HttpResponse, Error> {
        let full_path = request.path.clone();
        let (path, query_string) = full_path
            .split_once('?')
            .map(|(p, q)| (p, Some(q)))
            .unwrap_or((full_path.as_str(), None));

        if let Some(query) = query_string {
            request.query_params = parse_query_string(query);
        }
        request.path = path.to_string();

        let mut path_matched = false;
        for route in &self.routes {
            let Some(params) = match_path(&route.path, path) else {
                continue;
            };
            if route.method.as_str() != request.method.to_uppercase() {
                path_matched = true;
                continue;
            }
            request.path_params = params;
            return (route.handler)(request).await;
        }

        if path_matched {
            Err(Error::MethodNotAllowed(format!("{} {}", request.method, path)))
        } else {
            Err(Error::RouteNotFound(format!("{} {}", request.method, path)))
        }
    }
}

impl Transport for Router {
    fn register_handler(&mut self, method: HttpMethod, path: &str, handler: HandlerFn) -> Result<(), Error> {
        if self.has_route(method, path) {
            return Err(Error::DuplicateRoute(format!("{} {}", method, path)));
        }
        self.add_route(Route {
            method,
            path: path.to_string(),
            handler,
        });
        Ok(())
    }
}

/// Match a route path pattern against a request path
/// Returns Some(params) if matched, None otherwise
fn match_path(pattern: &str, path: &str) -> Option<HashMap<String, String>> {
    let pattern_parts: Vec<&str> = pattern.split('/').filter(|s| !s.is_empty()).collect();
    let path_parts: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

    if pattern_parts.len() != path_parts.len() {
        return None;
    }

    let mut params = HashMap::new();

    for (pattern_part, path_part) in pattern_parts.iter().zip(path_parts.iter()) {
        if let Some(param_name) = pattern_part.strip_prefix(':') {
            let value = urlencoding::decode(path_part)
                .map(|v| v.into_owned())
                .unwrap_or_else(|_| path_part.to_string());
            params.insert(param_name.to_string(), value);
        } else if pattern_part != path_part {
            return None;
        }
    }

    Some(params)
}

/// Parse a query string into a map of parameters; later duplicates win
fn parse_query_string(query: &str) -> HashMap<String, String> {
    query
        .split('&')
        .filter(|part| !part.is_empty())
        .filter_map(|part| {
            let mut split = part.splitn(2, '=');
            let key = decode_component(split.next()?);
            let value = decode_component(split.next().unwrap_or(""));
            Some((key, value))
        })
        .collect()
}

fn decode_component(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(|v| v.into_owned())
        .unwrap_or(spaced)
}
