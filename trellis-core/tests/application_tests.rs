//! Application-level behavior: CORS, error reporting context and shutdown

use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use trellis_core::*;

#[derive(Default)]
struct Recorder {
    reports: Mutex<Vec<(Severity, String)>>,
}

impl ErrorReporter for Recorder {
    fn report(&self, severity: Severity, _message: &str, context: &ReportContext) {
        self.reports.lock().push((severity, context.path.clone()));
    }
}

#[derive(Serialize, Default)]
struct Lookup {
    term: String,
}

struct Search;

impl Injectable for Search {
    fn construct(_: &Container) -> Result<Self> {
        Ok(Search)
    }
}

impl Search {
    async fn find(self: Arc<Self>, _call: Call) -> Result<Vec<String>> {
        Ok(vec!["hit".to_string()])
    }
}

fn declare() -> RegistryContext {
    let mut ctx = RegistryContext::new();
    ctx.controller::<Search>("/")
        .route(RouteDef::get("find", "/search").query_contract::<Lookup>(0), Search::find)
        .route(
            RouteDef::get("find_internal", "/internal/search").query_contract::<Lookup>(0),
            Search::find,
        )
        .route(
            RouteDef::get("find_item", "/items/:name").query_contract::<Lookup>(0),
            Search::find,
        );
    ctx
}

fn slow_handler() -> HandlerFn {
    Arc::new(|_req: HttpRequest| -> BoxFuture<Result<HttpResponse>> {
        Box::pin(async move {
            tokio::time::sleep(Duration::from_millis(200)).await;
            Ok(HttpResponse::ok().with_body(b"done".to_vec()))
        })
    })
}

#[tokio::test]
async fn test_preflight_is_answered_before_routing() {
    let ctx = declare();
    let app = Application::builder(&ctx).cors(Cors::new()).build(&mut ()).unwrap();

    let request = HttpRequest::new("OPTIONS", "/search")
        .with_header("Origin", "https://app.example.com")
        .with_header("Access-Control-Request-Method", "GET")
        .with_header("Access-Control-Request-Headers", "user-id");
    let response = app.handle(request).await;

    assert_eq!(response.status, 204);
    assert_eq!(
        response.headers.get("Access-Control-Allow-Origin").map(String::as_str),
        Some("*")
    );
    assert_eq!(
        response.headers.get("Access-Control-Allow-Headers").map(String::as_str),
        Some("user-id")
    );
    assert!(response.headers.contains_key("Access-Control-Allow-Methods"));
}

#[tokio::test]
async fn test_every_response_carries_allow_origin() {
    let ctx = declare();
    let app = Application::builder(&ctx).cors(Cors::new()).build(&mut ()).unwrap();

    let ok = app
        .handle(HttpRequest::new("GET", "/search?term=rust").with_header("Origin", "https://a.example"))
        .await;
    assert_eq!(ok.status, 200);
    assert_eq!(ok.headers.get("Access-Control-Allow-Origin").map(String::as_str), Some("*"));

    let invalid = app.handle(HttpRequest::new("GET", "/search")).await;
    assert_eq!(invalid.status, 400);
    assert!(invalid.headers.contains_key("Access-Control-Allow-Origin"));

    let missing = app.handle(HttpRequest::new("GET", "/nowhere")).await;
    assert_eq!(missing.status, 404);
    assert!(missing.headers.contains_key("Access-Control-Allow-Origin"));
}

#[tokio::test]
async fn test_without_cors_options_is_not_allowed() {
    let ctx = declare();
    let app = Application::bootstrap(&ctx).unwrap();

    let response = app.handle(HttpRequest::new("OPTIONS", "/search")).await;
    assert_eq!(response.status, 405);
    assert!(!response.headers.contains_key("Access-Control-Allow-Origin"));
}

#[tokio::test]
async fn test_validation_severity_follows_the_matched_route() {
    let ctx = declare();
    let recorder = Arc::new(Recorder::default());
    let app = Application::builder(&ctx)
        .reporter(recorder.clone())
        .build(&mut ())
        .unwrap();

    assert_eq!(app.handle(HttpRequest::new("GET", "/search?src=internal")).await.status, 400);
    assert_eq!(app.handle(HttpRequest::new("GET", "/items/internal")).await.status, 400);
    assert_eq!(app.handle(HttpRequest::new("GET", "/internal/search")).await.status, 400);

    let reports = recorder.reports.lock().clone();
    assert_eq!(
        reports,
        vec![
            (Severity::Log, "/search".to_string()),
            (Severity::Log, "/items/:name".to_string()),
            (Severity::Error, "/internal/search".to_string()),
        ]
    );
}

#[tokio::test]
async fn test_shutdown_lets_in_flight_requests_finish() {
    let ctx = RegistryContext::new();
    let app = Application::builder(&ctx)
        .route(HttpMethod::GET, "/slow", slow_handler())
        .shutdown_timeout(Duration::from_secs(5))
        .build(&mut ())
        .unwrap();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (stop, stopped) = oneshot::channel::<()>();
    let server = tokio::spawn(app.serve(listener, async move {
        let _ = stopped.await;
    }));

    let mut client = TcpStream::connect(addr).await.unwrap();
    client
        .write_all(b"GET /slow HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(50)).await;
    stop.send(()).unwrap();

    let mut raw = Vec::new();
    client.read_to_end(&mut raw).await.unwrap();
    let text = String::from_utf8_lossy(&raw);
    assert!(text.starts_with("HTTP/1.1 200"));
    assert!(text.ends_with("done"));

    let finished = tokio::time::timeout(Duration::from_secs(2), server).await;
    assert!(matches!(finished, Ok(Ok(Ok(())))));
}

#[tokio::test]
async fn test_shutdown_stops_accepting() {
    let ctx = RegistryContext::new();
    let app = Application::bootstrap(&ctx).unwrap();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    app.serve(listener, async {}).await.unwrap();

    assert!(TcpStream::connect(addr).await.is_err());
}
