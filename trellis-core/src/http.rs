// HTTP request, response and reply types

use crate::Error;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;

/// HTTP methods a route can be declared with
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    GET,
    POST,
    PUT,
    DELETE,
    PATCH,
}

impl HttpMethod {
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "GET" => Some(HttpMethod::GET),
            "POST" => Some(HttpMethod::POST),
            "PUT" => Some(HttpMethod::PUT),
            "DELETE" => Some(HttpMethod::DELETE),
            "PATCH" => Some(HttpMethod::PATCH),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::GET => "GET",
            HttpMethod::POST => "POST",
            HttpMethod::PUT => "PUT",
            HttpMethod::DELETE => "DELETE",
            HttpMethod::PATCH => "PATCH",
        }
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// HTTP request wrapper
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: String,
    pub path: String,
    /// Header names are stored lowercase
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
    pub path_params: HashMap<String, String>,
    pub query_params: HashMap<String, String>,
    /// Typed per-request data attached by middleware
    pub extensions: http::Extensions,
}

impl HttpRequest {
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            headers: HashMap::new(),
            body: Vec::new(),
            path_params: HashMap::new(),
            query_params: HashMap::new(),
            extensions: http::Extensions::new(),
        }
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_lowercase(), value.into());
        self
    }

    pub fn with_body(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        self
    }

    pub fn with_json<T: Serialize>(mut self, value: &T) -> Result<Self, Error> {
        self.body = serde_json::to_vec(value)?;
        self.headers
            .insert("content-type".to_string(), "application/json".to_string());
        Ok(self)
    }

    /// Get a header by case-insensitive name
    pub fn header(&self, name: &str) -> Option<&String> {
        self.headers.get(&name.to_lowercase())
    }

    /// Parse the request body as JSON
    pub fn json<T: for<'de> Deserialize<'de>>(&self) -> Result<T, Error> {
        serde_json::from_slice(&self.body).map_err(|e| Error::Deserialization(e.to_string()))
    }

    /// Get a path parameter by name
    pub fn param(&self, name: &str) -> Option<&String> {
        self.path_params.get(name)
    }

    /// Get a query parameter by name
    pub fn query(&self, name: &str) -> Option<&String> {
        self.query_params.get(name)
    }

    /// The body as a JSON value; an empty body is `null`
    pub fn body_value(&self) -> Result<Value, Error> {
        if self.body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Value::Null);
        }
        self.json()
    }

    /// Path parameters as a JSON object of strings
    pub fn params_value(&self) -> Value {
        string_map_to_value(&self.path_params)
    }

    /// Query parameters as a JSON object of strings
    pub fn query_value(&self) -> Value {
        string_map_to_value(&self.query_params)
    }
}

fn string_map_to_value(map: &HashMap<String, String>) -> Value {
    Value::Object(
        map.iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect::<Map<String, Value>>(),
    )
}

/// HTTP response wrapper
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            body: Vec::new(),
        }
    }

    pub fn ok() -> Self {
        Self::new(200)
    }

    pub fn not_found() -> Self {
        Self::new(404)
    }

    pub fn internal_server_error() -> Self {
        Self::new(500)
    }

    pub fn with_body(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        self
    }

    pub fn with_json<T: Serialize>(mut self, value: &T) -> Result<Self, Error> {
        self.body = serde_json::to_vec(value)?;
        self.headers
            .insert("Content-Type".to_string(), "application/json".to_string());
        Ok(self)
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Parse the response body as JSON
    pub fn json<T: for<'de> Deserialize<'de>>(&self) -> Result<T, Error> {
        serde_json::from_slice(&self.body).map_err(|e| Error::Deserialization(e.to_string()))
    }
}

#[derive(Debug, Default)]
struct ReplyState {
    status: Option<u16>,
    headers: HashMap<String, String>,
    body: Vec<u8>,
    sent: bool,
}

/// Mutable reply handle shared by middleware and the handler of one request.
///
/// Handlers may set a status and headers and let the dispatcher serialize
/// their return value, or send a body themselves. Once sent, the reply is
/// final and the dispatcher stops running further steps.
#[derive(Debug, Clone, Default)]
pub struct Reply {
    state: Arc<Mutex<ReplyState>>,
}

impl Reply {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the status code
    pub fn status(&self, code: u16) -> &Self {
        self.state.lock().status = Some(code);
        self
    }

    /// Status explicitly set so far
    pub fn status_code(&self) -> Option<u16> {
        self.state.lock().status
    }

    pub fn header(&self, key: impl Into<String>, value: impl Into<String>) -> &Self {
        self.state.lock().headers.insert(key.into(), value.into());
        self
    }

    /// Send a raw body and finalize the reply
    pub fn send(&self, body: Vec<u8>) {
        let mut state = self.state.lock();
        state.body = body;
        state.sent = true;
    }

    /// Send a JSON body and finalize the reply
    pub fn send_json<T: Serialize>(&self, value: &T) -> Result<(), Error> {
        let body = serde_json::to_vec(value)?;
        let mut state = self.state.lock();
        state
            .headers
            .insert("Content-Type".to_string(), "application/json".to_string());
        state.body = body;
        state.sent = true;
        Ok(())
    }

    pub fn is_sent(&self) -> bool {
        self.state.lock().sent
    }

    /// Build the final response. A sent reply is used as-is; otherwise
    /// `value` becomes the JSON body (`null` means no body) with the status
    /// set by the handler, or 200.
    pub fn into_response(&self, value: Value) -> Result<HttpResponse, Error> {
        let state = self.state.lock();
        let status = state.status.unwrap_or(200);

        if state.sent {
            return Ok(HttpResponse {
                status,
                headers: state.headers.clone(),
                body: state.body.clone(),
            });
        }

        let mut response = HttpResponse::new(status);
        response.headers = state.headers.clone();
        if value.is_null() {
            Ok(response)
        } else {
            response.with_json(&value)
        }
    }
}

/// JSON response helper
#[derive(Debug)]
pub struct Json<T: Serialize>(pub T);

impl<T: Serialize> Json<T> {
    pub fn into_response(self) -> Result<HttpResponse, Error> {
        HttpResponse::ok().with_json(&self.0)
    }
}
