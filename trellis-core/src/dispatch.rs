// Per-route dispatch: controller resolution, middleware, argument binding
// and handler invocation

use crate::declare::{BindingKind, BoxFuture, Call, HandlerRef, ParameterBinding};
use crate::metadata::ServiceId;
use crate::middleware::{ChainOutcome, MiddlewareChain};
use crate::routing::HandlerFn;
use crate::validation::{ValidationIssue, ValidationIssues};
use crate::{Container, Error, HttpRequest, HttpResponse, Reply};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, error, trace};

/// Bound argument slots a handler may declare
pub const MAX_BOUND_ARGUMENTS: usize = 32;

/// Parameter bindings of one handler, grouped by kind
#[derive(Debug, Clone, Default)]
pub struct RouteBindings {
    pub body: Vec<ParameterBinding>,
    pub param: Vec<ParameterBinding>,
    pub query: Vec<ParameterBinding>,
}

impl RouteBindings {
    pub fn of_kind(&self, kind: BindingKind) -> &[ParameterBinding] {
        match kind {
            BindingKind::Body => &self.body,
            BindingKind::Param => &self.param,
            BindingKind::Query => &self.query,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.body.is_empty() && self.param.is_empty() && self.query.is_empty()
    }

    /// Largest declared argument index across all kinds
    pub fn highest_index(&self) -> Option<usize> {
        self.body
            .iter()
            .chain(&self.param)
            .chain(&self.query)
            .map(|binding| binding.index)
            .max()
    }
}

/// Everything a registered route needs to serve a request
pub struct Dispatcher {
    controller: ServiceId,
    container: Container,
    handler: HandlerRef,
    middleware: MiddlewareChain,
    bindings: RouteBindings,
}

impl Dispatcher {
    pub fn new(
        controller: ServiceId,
        container: Container,
        handler: HandlerRef,
        middleware: MiddlewareChain,
        bindings: RouteBindings,
    ) -> Self {
        Self {
            controller,
            container,
            handler,
            middleware,
            bindings,
        }
    }

    /// Serve one request
    pub async fn dispatch(&self, mut request: HttpRequest) -> Result<HttpResponse, Error> {
        let instance = self.container.get_by_id(self.controller).map_err(|e| {
            error!(controller = %self.controller, error = %e, "Controller is not registered");
            Error::Internal(format!("controller {} is unavailable", self.controller))
        })?;

        let reply = Reply::new();
        if let ChainOutcome::Halted { .. } = self.middleware.run(&mut request, &reply).await? {
            return reply.into_response(Value::Null);
        }

        let args = match self.build_arguments(&request) {
            Ok(args) => args,
            Err(issues) => {
                debug!(handler = self.handler.name(), issues = issues.len(), "Rejecting invalid request");
                reply.status(400).send_json(&issues.to_response_body())?;
                return reply.into_response(Value::Null);
            }
        };

        trace!(handler = self.handler.name(), args = args.len(), "Invoking handler");
        let call = Call {
            request,
            args,
            reply: reply.clone(),
        };
        let value = self.handler.invoke(instance, call).await?;
        reply.into_response(value)
    }

    /// Bound arguments ordered by declared index. Kinds are applied in the
    /// fixed order Body, Param, Query; unfilled slots are `null`.
    pub fn build_arguments(&self, request: &HttpRequest) -> Result<Vec<Value>, ValidationIssues> {
        let mut slots: Vec<Option<Value>> = Vec::new();

        for kind in BindingKind::ALL {
            let bindings = self.bindings.of_kind(kind);
            if bindings.is_empty() {
                continue;
            }

            let source = match kind {
                BindingKind::Body => request.body_value().map_err(|e| {
                    ValidationIssues::from(vec![
                        ValidationIssue::new("", e.to_string()).with_constraint("json"),
                    ])
                })?,
                BindingKind::Param => request.params_value(),
                BindingKind::Query => request.query_value(),
            };

            for binding in bindings {
                if let Some(shape) = &binding.shape {
                    shape.validate(&source)?;
                }
                if slots.len() <= binding.index {
                    slots.resize(binding.index + 1, None);
                }
                slots[binding.index] = Some(source.clone());
            }
        }

        Ok(slots
            .into_iter()
            .map(|slot| slot.unwrap_or(Value::Null))
            .collect())
    }

    /// Wrap into the transport handler type
    pub fn into_handler(self) -> HandlerFn {
        let dispatcher = Arc::new(self);
        Arc::new(
            move |request: HttpRequest| -> BoxFuture<Result<HttpResponse, Error>> {
                let dispatcher = dispatcher.clone();
                Box::pin(async move { dispatcher.dispatch(request).await })
            },
        )
    }
}
