//! End-to-end tests of the users service through the application pipeline

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Value, json};
use std::sync::Arc;
use trellis_core::*;
use trellis_users::*;

/// Store that records which operations reached it, and with what
struct RecordingStore {
    inner: InMemoryUserStore,
    calls: Mutex<Vec<&'static str>>,
    inserted: Mutex<Vec<UserCreateRequest>>,
}

impl RecordingStore {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: InMemoryUserStore::new(),
            calls: Mutex::new(Vec::new()),
            inserted: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().clone()
    }

    fn inserted(&self) -> Vec<UserCreateRequest> {
        self.inserted.lock().clone()
    }
}

#[async_trait]
impl UserStore for RecordingStore {
    async fn find_all(&self) -> Result<Vec<User>> {
        self.calls.lock().push("find_all");
        self.inner.find_all().await
    }

    async fn find_by_id(&self, id: u64) -> Result<Option<User>> {
        self.calls.lock().push("find_by_id");
        self.inner.find_by_id(id).await
    }

    async fn insert(&self, data: UserCreateRequest) -> Result<User> {
        self.calls.lock().push("insert");
        self.inserted.lock().push(data.clone());
        self.inner.insert(data).await
    }

    async fn update(&self, id: u64, changes: UserUpdateRequest) -> Result<Option<User>> {
        self.calls.lock().push("update");
        self.inner.update(id, changes).await
    }

    async fn remove(&self, id: u64) -> Result<bool> {
        self.calls.lock().push("remove");
        self.inner.remove(id).await
    }
}

fn app_with(store: Arc<RecordingStore>) -> Application {
    let mut ctx = RegistryContext::new();
    declare(&mut ctx, PersistenceSession::new(store));
    Application::bootstrap(&ctx).unwrap()
}

fn authenticated(req: HttpRequest) -> HttpRequest {
    req.with_header("x-user-id", "1").with_header("x-org-id", "acme")
}

fn body_of(response: &HttpResponse) -> Value {
    serde_json::from_slice(&response.body).unwrap()
}

async fn create(app: &Application, name: &str) -> Value {
    let request = HttpRequest::new("POST", "/users")
        .with_json(&json!({"name": name, "email": format!("{}@example.com", name), "age": 30}))
        .unwrap();
    let response = app.handle(request).await;
    assert_eq!(response.status, 201);
    body_of(&response)
}

#[tokio::test]
async fn test_health_check() {
    let app = app_with(RecordingStore::new());
    let response = app.handle(HttpRequest::new("GET", "/")).await;

    assert_eq!(response.status, 200);
    assert_eq!(body_of(&response), json!({"message": "Health Check API"}));
}

#[tokio::test]
async fn test_create_then_get() {
    let app = app_with(RecordingStore::new());

    let created = create(&app, "ada").await;
    assert_eq!(created, json!({"id": 1, "name": "ada", "email": "ada@example.com"}));

    let response = app.handle(HttpRequest::new("GET", "/users/1")).await;
    assert_eq!(response.status, 200);
    assert_eq!(body_of(&response)["name"], "ada");
}

#[tokio::test]
async fn test_create_passes_submitted_fields_to_the_store() {
    let store = RecordingStore::new();
    let app = app_with(store.clone());

    let request = HttpRequest::new("POST", "/users")
        .with_json(&json!({"name": "Ada Lovelace", "email": "ada@example.com", "age": 36}))
        .unwrap();
    let response = app.handle(request).await;
    assert_eq!(response.status, 201);

    assert_eq!(store.calls(), vec!["insert"]);
    assert_eq!(
        store.inserted(),
        vec![UserCreateRequest {
            name: "Ada Lovelace".to_string(),
            email: "ada@example.com".to_string(),
            age: 36,
        }]
    );
    assert_eq!(
        body_of(&response),
        json!({"id": 1, "name": "Ada Lovelace", "email": "ada@example.com"})
    );
}

#[tokio::test]
async fn test_get_missing_user_is_404_without_body() {
    let app = app_with(RecordingStore::new());
    let response = app.handle(HttpRequest::new("GET", "/users/42")).await;

    assert_eq!(response.status, 404);
    assert!(response.body.is_empty());
}

#[tokio::test]
async fn test_invalid_id_is_rejected() {
    let store = RecordingStore::new();
    let app = app_with(store.clone());
    let response = app.handle(HttpRequest::new("GET", "/users/abc")).await;

    assert_eq!(response.status, 400);
    assert!(store.calls().is_empty());
}

#[tokio::test]
async fn test_create_validates_body() {
    let store = RecordingStore::new();
    let app = app_with(store.clone());

    let request = HttpRequest::new("POST", "/users")
        .with_json(&json!({"name": "ada", "age": "thirty"}))
        .unwrap();
    let response = app.handle(request).await;

    assert_eq!(response.status, 400);
    let body = body_of(&response);
    let fields: Vec<&str> = body["issues"]
        .as_array()
        .unwrap()
        .iter()
        .map(|issue| issue["field"].as_str().unwrap())
        .collect();
    assert_eq!(fields, vec!["age", "email"]);
    assert!(store.calls().is_empty());
}

#[tokio::test]
async fn test_update() {
    let app = app_with(RecordingStore::new());
    create(&app, "ada").await;

    let request = HttpRequest::new("PUT", "/users/1")
        .with_json(&json!({"email": "countess@example.com"}))
        .unwrap();
    let response = app.handle(request).await;
    assert_eq!(response.status, 200);
    assert_eq!(body_of(&response)["email"], "countess@example.com");
    assert_eq!(body_of(&response)["name"], "ada");

    let missing = HttpRequest::new("PUT", "/users/9")
        .with_json(&json!({"name": "nobody"}))
        .unwrap();
    assert_eq!(app.handle(missing).await.status, 404);
}

#[tokio::test]
async fn test_list_requires_authentication() {
    let store = RecordingStore::new();
    let app = app_with(store.clone());

    let response = app.handle(HttpRequest::new("GET", "/users")).await;
    assert_eq!(response.status, 401);
    assert_eq!(body_of(&response)["error"], "Missing user or organization information");
    assert!(store.calls().is_empty());

    let response = app
        .handle(HttpRequest::new("GET", "/users").with_header("x-user-id", "7").with_header("x-org-id", "acme"))
        .await;
    assert_eq!(response.status, 401);
    assert!(store.calls().is_empty());
}

#[tokio::test]
async fn test_authenticated_list() {
    let store = RecordingStore::new();
    let app = app_with(store.clone());
    create(&app, "ada").await;
    create(&app, "grace").await;

    let response = app.handle(authenticated(HttpRequest::new("GET", "/users"))).await;
    assert_eq!(response.status, 200);
    assert_eq!(body_of(&response).as_array().map(Vec::len), Some(2));
    assert_eq!(store.calls(), vec!["insert", "insert", "find_all"]);
}

#[tokio::test]
async fn test_delete() {
    let store = RecordingStore::new();
    let app = app_with(store.clone());
    create(&app, "ada").await;

    let anonymous = app.handle(HttpRequest::new("DELETE", "/users/1")).await;
    assert_eq!(anonymous.status, 401);

    let deleted = app.handle(authenticated(HttpRequest::new("DELETE", "/users/1"))).await;
    assert_eq!(deleted.status, 204);
    assert!(deleted.body.is_empty());

    let again = app.handle(authenticated(HttpRequest::new("DELETE", "/users/1"))).await;
    assert_eq!(again.status, 404);

    assert_eq!(store.calls(), vec!["insert", "remove", "remove"]);
}

#[test]
fn test_document_lists_user_routes() {
    let mut ctx = RegistryContext::new();
    declare(&mut ctx, PersistenceSession::in_memory());

    let mut docs = trellis_openapi::OpenApiCollector::new(api_document("1.0.0").build());
    Application::builder(&ctx).build(&mut docs).unwrap();

    let spec = docs.spec();
    assert_eq!(spec.info.title, "Users Service");
    assert_eq!(spec.paths["/users"].operation_count(), 2);
    assert_eq!(spec.paths["/users/{id}"].operation_count(), 3);
    assert!(spec.paths.contains_key("/"));
    assert!(spec.components.as_ref().unwrap().security_schemes.contains_key("clientSecret"));
}

#[tokio::test]
async fn test_cors_preflight_and_headers() {
    let mut ctx = RegistryContext::new();
    declare(&mut ctx, PersistenceSession::in_memory());
    let app = Application::builder(&ctx).cors(cors_policy()).build(&mut ()).unwrap();

    let preflight = HttpRequest::new("OPTIONS", "/users/1")
        .with_header("Origin", "https://console.example.com")
        .with_header("Access-Control-Request-Method", "DELETE")
        .with_header("Access-Control-Request-Headers", "x-user-id, x-org-id");
    let response = app.handle(preflight).await;
    assert_eq!(response.status, 204);
    assert_eq!(
        response.headers.get("Access-Control-Allow-Headers").map(String::as_str),
        Some("x-user-id, x-org-id")
    );

    let denied = app.handle(HttpRequest::new("GET", "/users")).await;
    assert_eq!(denied.status, 401);
    assert_eq!(
        denied.headers.get("Access-Control-Allow-Origin").map(String::as_str),
        Some("*")
    );
}
