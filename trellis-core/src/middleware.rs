// Middleware contract for per-route request processing

use crate::{Error, HttpRequest, Reply};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, trace};

/// A pre-handler step that may inspect, enrich or reject a request.
///
/// Returning `Ok(())` continues with the next step unless the middleware
/// has already sent the reply, in which case dispatch stops silently.
/// Returning `Err` aborts dispatch and hands the error to the error boundary.
#[async_trait]
pub trait Middleware: Send + Sync {
    async fn handle(&self, req: &mut HttpRequest, reply: &Reply) -> Result<(), Error>;

    /// Name used in logs
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// Shared reference to a middleware
pub type MiddlewareRef = Arc<dyn Middleware>;

/// Outcome of running a middleware chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainOutcome {
    /// Every middleware let the request through
    Continue,
    /// A middleware sent the reply; nothing else may run
    Halted { index: usize },
}

/// Ordered middleware executed for one route
#[derive(Clone, Default)]
pub struct MiddlewareChain {
    middlewares: Vec<MiddlewareRef>,
}

impl MiddlewareChain {
    pub fn new(middlewares: Vec<MiddlewareRef>) -> Self {
        Self { middlewares }
    }

    pub fn len(&self) -> usize {
        self.middlewares.len()
    }

    pub fn is_empty(&self) -> bool {
        self.middlewares.is_empty()
    }

    /// Run each middleware in order, awaiting each before the next.
    pub async fn run(&self, req: &mut HttpRequest, reply: &Reply) -> Result<ChainOutcome, Error> {
        debug!(
            middleware_count = self.middlewares.len(),
            path = %req.path,
            method = %req.method,
            "Executing middleware chain"
        );

        for (index, middleware) in self.middlewares.iter().enumerate() {
            trace!(middleware_index = index, middleware = middleware.name(), "Executing middleware");
            middleware.handle(req, reply).await?;

            if reply.is_sent() {
                debug!(
                    middleware = middleware.name(),
                    "Middleware sent the reply, halting dispatch"
                );
                return Ok(ChainOutcome::Halted { index });
            }
        }

        trace!("Middleware chain complete");
        Ok(ChainOutcome::Continue)
    }
}

impl std::fmt::Debug for MiddlewareChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.middlewares.iter().map(|m| m.name()))
            .finish()
    }
}
