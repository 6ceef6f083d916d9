use std::sync::Arc;
use trellis_core::*;

fn text_handler(text: &'static str) -> HandlerFn {
    Arc::new(move |_req: HttpRequest| -> BoxFuture<Result<HttpResponse>> {
        Box::pin(async move { Ok(HttpResponse::ok().with_body(text.as_bytes().to_vec())) })
    })
}

fn echo_param(name: &'static str) -> HandlerFn {
    Arc::new(move |req: HttpRequest| -> BoxFuture<Result<HttpResponse>> {
        Box::pin(async move {
            let value = req.param(name).cloned().unwrap_or_default();
            Ok(HttpResponse::ok().with_body(value.into_bytes()))
        })
    })
}

#[tokio::test]
async fn test_static_route() {
    let mut router = Router::new();
    router
        .register_handler(HttpMethod::GET, "/hello", text_handler("Hello, World!"))
        .unwrap();

    let response = router.route(HttpRequest::new("GET", "/hello")).await.unwrap();

    assert_eq!(response.status, 200);
    assert_eq!(response.body, b"Hello, World!");
}

#[tokio::test]
async fn test_path_parameter() {
    let mut router = Router::new();
    router
        .register_handler(HttpMethod::GET, "/users/:id", echo_param("id"))
        .unwrap();

    let response = router.route(HttpRequest::new("GET", "/users/123")).await.unwrap();
    assert_eq!(response.body, b"123");
}

#[tokio::test]
async fn test_query_string_is_parsed_and_stripped() {
    let mut router = Router::new();
    let handler: HandlerFn = Arc::new(|req: HttpRequest| -> BoxFuture<Result<HttpResponse>> {
        Box::pin(async move {
            assert_eq!(req.path, "/search");
            let q = req.query("q").cloned().unwrap_or_default();
            Ok(HttpResponse::ok().with_body(q.into_bytes()))
        })
    });
    router.register_handler(HttpMethod::GET, "/search", handler).unwrap();

    let response = router
        .route(HttpRequest::new("GET", "/search?q=rust+web&page=2"))
        .await
        .unwrap();
    assert_eq!(response.body, b"rust web");
}

#[tokio::test]
async fn test_method_dispatch() {
    let mut router = Router::new();
    router
        .register_handler(HttpMethod::GET, "/items", text_handler("list"))
        .unwrap();
    router
        .register_handler(HttpMethod::POST, "/items", text_handler("create"))
        .unwrap();

    let listed = router.route(HttpRequest::new("GET", "/items")).await.unwrap();
    let created = router.route(HttpRequest::new("post", "/items")).await.unwrap();

    assert_eq!(listed.body, b"list");
    assert_eq!(created.body, b"create");
}

#[tokio::test]
async fn test_unknown_path_is_route_not_found() {
    let router = Router::new();
    let result = router.route(HttpRequest::new("GET", "/missing")).await;
    assert!(matches!(result, Err(Error::RouteNotFound(_))));
}

#[tokio::test]
async fn test_wrong_method_is_method_not_allowed() {
    let mut router = Router::new();
    router
        .register_handler(HttpMethod::GET, "/items", text_handler("list"))
        .unwrap();

    let result = router.route(HttpRequest::new("DELETE", "/items")).await;
    assert!(matches!(result, Err(Error::MethodNotAllowed(_))));
}

#[tokio::test]
async fn test_first_registered_match_wins() {
    let mut router = Router::new();
    router
        .register_handler(HttpMethod::GET, "/users/me", text_handler("me"))
        .unwrap();
    router
        .register_handler(HttpMethod::GET, "/users/:id", echo_param("id"))
        .unwrap();

    let me = router.route(HttpRequest::new("GET", "/users/me")).await.unwrap();
    let other = router.route(HttpRequest::new("GET", "/users/42")).await.unwrap();

    assert_eq!(me.body, b"me");
    assert_eq!(other.body, b"42");
}
