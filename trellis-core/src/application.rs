// Application bootstrapper and HTTP server

use crate::registrar::{DocumentationSink, register_routes};
use crate::reporting::{ErrorBoundary, ErrorReporter, NullReporter};
use crate::routing::{HandlerFn, Route};
use crate::{Container, Cors, Error, HttpMethod, HttpRequest, HttpResponse, RegistryContext, Router};
use http_body_util::{BodyExt, Full};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, body::Incoming as IncomingBody};
use hyper_util::rt::TokioIo;
use hyper_util::server::graceful::GracefulShutdown;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{Instrument, debug, error, info, info_span, warn};

/// How long in-flight connections may take to finish after a shutdown signal
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

/// A bootstrapped application: every declared route is registered.
///
/// The only way to obtain one is through [`Application::bootstrap`] or
/// [`ApplicationBuilder::build`], so a listening server always has its full
/// route table.
pub struct Application {
    container: Container,
    pipeline: Pipeline,
    shutdown_timeout: Duration,
}

/// Configures how an application is bootstrapped
pub struct ApplicationBuilder<'a> {
    ctx: &'a RegistryContext,
    reporter: Arc<dyn ErrorReporter>,
    cors: Option<Cors>,
    shutdown_timeout: Duration,
    extra_routes: Vec<Route>,
}

impl<'a> ApplicationBuilder<'a> {
    /// Where errors caught by the error boundary are reported
    pub fn reporter(mut self, reporter: Arc<dyn ErrorReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Answer preflight requests and add CORS headers to every response
    pub fn cors(mut self, cors: Cors) -> Self {
        self.cors = Some(cors);
        self
    }

    /// Upper bound on draining connections once shutdown starts
    pub fn shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Register a handler that does not come from a controller
    pub fn route(mut self, method: HttpMethod, path: impl Into<String>, handler: HandlerFn) -> Self {
        self.extra_routes.push(Route {
            method,
            path: path.into(),
            handler,
        });
        self
    }

    /// Run the registrar and return the ready application.
    ///
    /// Any container or registration error aborts bootstrap.
    pub fn build(self, docs: &mut dyn DocumentationSink) -> Result<Application, Error> {
        info!("Bootstrapping Trellis application");

        let mut router = Router::new();
        let count = register_routes(self.ctx, &mut router, docs)?;

        for route in self.extra_routes {
            if router.has_route(route.method, &route.path) {
                return Err(Error::DuplicateRoute(format!("{} {}", route.method, route.path)));
            }
            router.add_route(route);
        }

        info!(
            routes = router.routes.len(),
            controller_routes = count,
            services = self.ctx.container().len(),
            cors = self.cors.is_some(),
            "Application bootstrap complete"
        );

        Ok(Application {
            container: self.ctx.container().clone(),
            pipeline: Pipeline {
                router: Arc::new(router),
                boundary: ErrorBoundary::new(self.reporter),
                cors: self.cors.map(Arc::new),
            },
            shutdown_timeout: self.shutdown_timeout,
        })
    }
}

impl Application {
    pub fn builder(ctx: &RegistryContext) -> ApplicationBuilder<'_> {
        ApplicationBuilder {
            ctx,
            reporter: Arc::new(NullReporter),
            cors: None,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
            extra_routes: Vec::new(),
        }
    }

    /// Bootstrap with no documentation sink and no error reporting
    pub fn bootstrap(ctx: &RegistryContext) -> Result<Self, Error> {
        Self::builder(ctx).build(&mut ())
    }

    pub fn container(&self) -> &Container {
        &self.container
    }

    pub fn router(&self) -> &Router {
        &self.pipeline.router
    }

    /// Add a handler after bootstrap, e.g. one serving documentation that
    /// only exists once the registrar has run.
    pub fn mount(&mut self, method: HttpMethod, path: impl Into<String>, handler: HandlerFn) -> Result<(), Error> {
        let path = path.into();
        let router = Arc::get_mut(&mut self.pipeline.router)
            .ok_or_else(|| Error::Internal("cannot mount a route on a running application".to_string()))?;
        if router.has_route(method, &path) {
            return Err(Error::DuplicateRoute(format!("{} {}", method, path)));
        }
        info!(method = %method, path = %path, "Mounted route");
        router.add_route(Route { method, path, handler });
        Ok(())
    }

    /// Serve one request through CORS, the router and the error boundary
    pub async fn handle(&self, request: HttpRequest) -> HttpResponse {
        self.pipeline.handle(request).await
    }

    /// Start the HTTP server and serve until Ctrl-C or SIGTERM
    pub async fn listen(self, addr: SocketAddr) -> Result<(), Error> {
        let listener = TcpListener::bind(addr).await?;
        self.serve(listener, shutdown_signal()).await
    }

    /// Serve connections from `listener` until `shutdown` resolves.
    ///
    /// Once it does, no new connection is accepted and open connections
    /// finish their in-flight requests, bounded by the shutdown timeout.
    pub async fn serve(self, listener: TcpListener, shutdown: impl Future<Output = ()>) -> Result<(), Error> {
        info!(address = %listener.local_addr()?, "Server listening");

        let graceful = GracefulShutdown::new();
        tokio::pin!(shutdown);

        loop {
            let (stream, peer) = tokio::select! {
                accepted = listener.accept() => accepted?,
                _ = &mut shutdown => {
                    info!("Shutdown signal received, no longer accepting connections");
                    break;
                }
            };
            debug!(peer = %peer, "Accepted connection");

            let pipeline = self.pipeline.clone();
            let service = service_fn(move |req: Request<IncomingBody>| {
                let pipeline = pipeline.clone();
                async move { serve_hyper(req, pipeline).await }
            });
            let connection = graceful.watch(http1::Builder::new().serve_connection(TokioIo::new(stream), service));

            tokio::spawn(async move {
                if let Err(err) = connection.await {
                    warn!(peer = %peer, error = %err, "Error serving connection");
                }
            });
        }

        drop(listener);
        tokio::select! {
            _ = graceful.shutdown() => {
                info!("All connections closed");
            }
            _ = tokio::time::sleep(self.shutdown_timeout) => {
                warn!(timeout = ?self.shutdown_timeout, "Shutdown timeout reached with connections still open");
            }
        }
        Ok(())
    }
}

/// Per-request path shared by [`Application::handle`] and every connection
#[derive(Clone)]
struct Pipeline {
    router: Arc<Router>,
    boundary: ErrorBoundary,
    cors: Option<Arc<Cors>>,
}

impl Pipeline {
    async fn handle(&self, request: HttpRequest) -> HttpResponse {
        let method = request.method.clone();
        let path = request.path.clone();
        let request_id = uuid::Uuid::new_v4();
        let span = info_span!("request", request_id = %request_id, method = %method, path = %path);

        async move {
            let response = match self.cors.as_deref() {
                Some(cors) if Cors::is_preflight(&request) => cors.preflight(&request),
                cors => {
                    let mut response = match self.router.route(request).await {
                        Ok(response) => response,
                        Err(err) => {
                            let route = self
                                .router
                                .matched_pattern(&method, &path)
                                .unwrap_or_else(|| path.split_once('?').map_or(path.as_str(), |(p, _)| p));
                            self.boundary.handle(err, &method, route)
                        }
                    };
                    if let Some(cors) = cors {
                        cors.apply(&mut response);
                    }
                    response
                }
            };
            info!(status = response.status, "Request completed");
            response
        }
        .instrument(span)
        .await
    }
}

/// Convert between hyper and Trellis types around the pipeline
async fn serve_hyper(
    req: Request<IncomingBody>,
    pipeline: Pipeline,
) -> Result<Response<Full<bytes::Bytes>>, hyper::Error> {
    let method = req.method().to_string();
    let path = req
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| req.uri().path().to_string());

    let mut request = HttpRequest::new(method, path);
    for (name, value) in req.headers() {
        if let Ok(value) = value.to_str() {
            request
                .headers
                .insert(name.as_str().to_ascii_lowercase(), value.to_string());
        }
    }
    request.body = req.collect().await?.to_bytes().to_vec();

    let response = pipeline.handle(request).await;

    let mut builder = Response::builder().status(response.status);
    for (key, value) in &response.headers {
        builder = builder.header(key.as_str(), value.as_str());
    }

    match builder.body(Full::new(bytes::Bytes::from(response.body))) {
        Ok(response) => Ok(response),
        Err(err) => {
            error!(error = %err, "Failed to build response");
            let mut fallback = Response::new(Full::new(bytes::Bytes::new()));
            *fallback.status_mut() = hyper::StatusCode::INTERNAL_SERVER_ERROR;
            Ok(fallback)
        }
    }
}

/// Resolves on Ctrl-C, or SIGTERM on Unix
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!(error = %err, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
