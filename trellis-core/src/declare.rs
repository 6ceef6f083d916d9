//! Declaration API: services, controllers, routes, middleware and
//! parameter bindings.
//!
//! Every declaration is a pure write into the [`MetadataStore`] held by a
//! [`RegistryContext`]. Nothing is instantiated until the registrar runs.
//!
//! ```
//! use std::sync::Arc;
//! use trellis_core::{Call, Container, Error, Injectable, RegistryContext, RouteDef};
//!
//! struct Greeter;
//!
//! impl Injectable for Greeter {
//!     fn construct(_: &Container) -> Result<Self, Error> {
//!         Ok(Greeter)
//!     }
//! }
//!
//! impl Greeter {
//!     async fn hello(self: Arc<Self>, _call: Call) -> Result<String, Error> {
//!         Ok("hello".to_string())
//!     }
//! }
//!
//! let mut ctx = RegistryContext::new();
//! ctx.controller::<Greeter>("/greet")
//!     .route(RouteDef::get("hello", "/"), Greeter::hello);
//!
//! assert_eq!(ctx.controllers().len(), 1);
//! ```

use crate::container::{Container, Instance, ServiceFactory};
use crate::metadata::{Facet, MetadataStore, ServiceId, Subject, facets};
use crate::middleware::{Middleware, MiddlewareRef};
use crate::validation::Shape;
use crate::{Error, HttpMethod, HttpRequest, Reply};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;
use std::sync::Arc;
use tracing::debug;

/// Boxed, sendable future
pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

/// A service the container can build from an explicit dependency list.
pub trait Injectable: Send + Sync + Sized + 'static {
    /// Services this one needs, in constructor order
    fn dependencies() -> Vec<ServiceId> {
        Vec::new()
    }

    /// Build the service. Every id from `dependencies()` is registered
    /// before this runs, so `container.get` succeeds for them.
    fn construct(container: &Container) -> Result<Self, Error>;
}

/// Where a bound handler argument comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindingKind {
    Body,
    Param,
    Query,
}

impl BindingKind {
    /// Order in which kinds are applied when building arguments
    pub const ALL: [BindingKind; 3] = [BindingKind::Body, BindingKind::Param, BindingKind::Query];

    pub fn as_str(&self) -> &'static str {
        match self {
            BindingKind::Body => "body",
            BindingKind::Param => "params",
            BindingKind::Query => "query",
        }
    }
}

/// A handler parameter bound to part of the request
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterBinding {
    /// Position among the handler's bound arguments
    pub index: usize,
    /// Contract the value must satisfy, if any
    pub shape: Option<Shape>,
}

/// Documentation attached to a route
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RouteDoc {
    pub summary: Option<String>,
    pub description: Option<String>,
    pub tags: Vec<String>,
}

impl RouteDoc {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }
}

/// Arguments passed to a route handler: the request, the bound values in
/// declared-index order, and the reply.
#[derive(Debug)]
pub struct Call {
    pub request: HttpRequest,
    pub args: Vec<Value>,
    pub reply: Reply,
}

impl Call {
    /// Raw bound value at `index`
    pub fn raw_arg(&self, index: usize) -> Option<&Value> {
        self.args.get(index)
    }

    /// Deserialize the bound value at `index`
    pub fn arg<T: DeserializeOwned>(&self, index: usize) -> Result<T, Error> {
        let value = self
            .args
            .get(index)
            .ok_or_else(|| Error::BadRequest(format!("missing argument {}", index)))?;
        T::deserialize(value).map_err(|e| Error::Deserialization(e.to_string()))
    }
}

type ErasedHandler = Arc<dyn Fn(Instance, Call) -> BoxFuture<Result<Value, Error>> + Send + Sync>;

/// Callable handler captured from a controller method
#[derive(Clone)]
pub struct HandlerRef {
    name: String,
    call: ErasedHandler,
}

impl HandlerRef {
    /// Wrap a controller method `Fn(Arc<C>, Call) -> Future<Result<R>>`
    pub fn new<C, F, Fut, R>(name: impl Into<String>, handler: F) -> Self
    where
        C: Send + Sync + 'static,
        F: Fn(Arc<C>, Call) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, Error>> + Send + 'static,
        R: Serialize,
    {
        let name = name.into();
        let handler_name = name.clone();
        let handler = Arc::new(handler);
        let call: ErasedHandler = Arc::new(
            move |instance: Instance, call: Call| -> BoxFuture<Result<Value, Error>> {
                let handler = handler.clone();
                let handler_name = handler_name.clone();
                Box::pin(async move {
                    let controller = instance.downcast::<C>().map_err(|_| {
                        Error::Internal(format!(
                            "handler {} invoked on a controller of the wrong type",
                            handler_name
                        ))
                    })?;
                    let value = handler(controller, call).await?;
                    Ok(serde_json::to_value(value)?)
                })
            },
        );
        Self { name, call }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Invoke the handler on a controller instance
    pub fn invoke(&self, instance: Instance, call: Call) -> BoxFuture<Result<Value, Error>> {
        (self.call)(instance, call)
    }
}

impl std::fmt::Debug for HandlerRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerRef").field("name", &self.name).finish()
    }
}

/// A route as stored on its controller
#[derive(Debug, Clone)]
pub struct RouteDescriptor {
    pub method: HttpMethod,
    pub path: String,
    pub handler: HandlerRef,
    pub doc: Option<RouteDoc>,
}

/// A controller discovered through [`RegistryContext::controller`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerRegistration {
    pub id: ServiceId,
}

/// Explicit registry context: metadata, DI container and the ordered lists
/// of declared services and controllers.
#[derive(Debug, Default)]
pub struct RegistryContext {
    metadata: MetadataStore,
    container: Container,
    injectables: Vec<ServiceId>,
    controllers: Vec<ControllerRegistration>,
}

impl RegistryContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn metadata(&self) -> &MetadataStore {
        &self.metadata
    }

    pub fn container(&self) -> &Container {
        &self.container
    }

    /// Services in declaration order
    pub fn injectables(&self) -> &[ServiceId] {
        &self.injectables
    }

    /// Controllers in declaration order
    pub fn controllers(&self) -> &[ControllerRegistration] {
        &self.controllers
    }

    /// Mark `T` as injectable; it is built during bootstrap.
    pub fn injectable<T: Injectable>(&mut self) -> &mut Self {
        let id = ServiceId::of::<T>();
        let subject = Subject::Type(id);
        if self.metadata.get::<facets::Injectable>(&subject) {
            return self;
        }

        let factory: ServiceFactory =
            Arc::new(|container: &Container| Ok(Arc::new(T::construct(container)?) as Instance));
        self.metadata
            .set::<facets::ConstructorParamTypes>(subject.clone(), T::dependencies());
        self.metadata.set::<facets::Factory>(subject.clone(), Some(factory));
        self.metadata.set::<facets::Injectable>(subject, true);
        self.injectables.push(id);

        debug!(service = %id, dependencies = T::dependencies().len(), "Declared injectable");
        self
    }

    /// Seed the container with an externally constructed singleton
    pub fn provide<T: Send + Sync + 'static>(&mut self, instance: T) -> &mut Self {
        self.container.register_instance(instance);
        self
    }

    /// Seed the container with an `Arc`-wrapped singleton
    pub fn provide_arc<T: Send + Sync + 'static>(&mut self, instance: Arc<T>) -> &mut Self {
        self.container.register_arc(instance);
        self
    }

    /// Declare `C` as a controller under `prefix`
    pub fn controller<C: Injectable>(&mut self, prefix: impl Into<String>) -> ControllerBuilder<'_, C> {
        self.injectable::<C>();
        let id = ServiceId::of::<C>();
        let prefix = prefix.into();
        self.metadata
            .set::<facets::BasePath>(Subject::Type(id), prefix.clone());
        if !self.controllers.iter().any(|c| c.id == id) {
            self.controllers.push(ControllerRegistration { id });
        }
        debug!(controller = %id, base_path = %prefix, "Declared controller");

        ControllerBuilder {
            ctx: self,
            _controller: PhantomData,
        }
    }
}

/// Builder returned by [`RegistryContext::controller`]
pub struct ControllerBuilder<'a, C> {
    ctx: &'a mut RegistryContext,
    _controller: PhantomData<fn() -> C>,
}

impl<'a, C: Injectable> ControllerBuilder<'a, C> {
    /// Middleware applied to every route of this controller
    pub fn middleware<M: Middleware + 'static>(self, middleware: M) -> Self {
        self.middleware_ref(Arc::new(middleware))
    }

    pub fn middleware_ref(self, middleware: MiddlewareRef) -> Self {
        self.ctx
            .metadata
            .append::<facets::Middlewares, _>(Subject::of::<C>(), middleware);
        self
    }

    /// Declare a route handled by `handler`
    pub fn route<F, Fut, R>(self, def: RouteDef, handler: F) -> Self
    where
        F: Fn(Arc<C>, Call) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, Error>> + Send + 'static,
        R: Serialize,
    {
        let RouteDef {
            name,
            method,
            path,
            doc,
            middlewares,
            bindings,
        } = def;
        let metadata = &mut self.ctx.metadata;
        let method_subject = Subject::method::<C>(name.clone());

        for middleware in middlewares {
            metadata.append::<facets::Middlewares, _>(method_subject.clone(), middleware);
        }
        for (kind, binding) in bindings {
            match kind {
                BindingKind::Body => append_binding::<facets::BodyBindings>(metadata, &method_subject, binding),
                BindingKind::Param => append_binding::<facets::ParamBindings>(metadata, &method_subject, binding),
                BindingKind::Query => append_binding::<facets::QueryBindings>(metadata, &method_subject, binding),
            }
        }

        let controller = ServiceId::of::<C>();
        debug!(controller = %controller, method = %method, path = %path, handler = %name, "Declared route");
        metadata.append::<facets::Routes, _>(
            Subject::of::<C>(),
            RouteDescriptor {
                method,
                path,
                handler: HandlerRef::new(name, handler),
                doc,
            },
        );
        self
    }

    /// The registry this builder writes into
    pub fn context(&mut self) -> &mut RegistryContext {
        self.ctx
    }
}

fn append_binding<F>(metadata: &mut MetadataStore, subject: &Subject, binding: ParameterBinding)
where
    F: Facet<Value = Vec<ParameterBinding>>,
{
    metadata.append::<F, _>(subject.clone(), binding);
}

/// Route declaration: verb, sub-path, handler name, docs, method-level
/// middleware and parameter bindings.
pub struct RouteDef {
    name: String,
    method: HttpMethod,
    path: String,
    doc: Option<RouteDoc>,
    middlewares: Vec<MiddlewareRef>,
    bindings: Vec<(BindingKind, ParameterBinding)>,
}

impl RouteDef {
    pub fn new(method: HttpMethod, name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            method,
            path: path.into(),
            doc: None,
            middlewares: Vec::new(),
            bindings: Vec::new(),
        }
    }

    pub fn get(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self::new(HttpMethod::GET, name, path)
    }

    pub fn post(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self::new(HttpMethod::POST, name, path)
    }

    pub fn put(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self::new(HttpMethod::PUT, name, path)
    }

    pub fn delete(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self::new(HttpMethod::DELETE, name, path)
    }

    pub fn patch(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self::new(HttpMethod::PATCH, name, path)
    }

    pub fn doc(mut self, doc: RouteDoc) -> Self {
        self.doc = Some(doc);
        self
    }

    /// Middleware applied to this route only, after controller middleware
    pub fn middleware<M: Middleware + 'static>(mut self, middleware: M) -> Self {
        self.middlewares.push(Arc::new(middleware));
        self
    }

    pub fn middleware_ref(mut self, middleware: MiddlewareRef) -> Self {
        self.middlewares.push(middleware);
        self
    }

    /// Bind the request body to argument `index` without validation
    pub fn body(self, index: usize) -> Self {
        self.bind(BindingKind::Body, index, None)
    }

    /// Bind the request body to argument `index`, validated against `T`
    pub fn body_contract<T: Serialize + Default>(self, index: usize) -> Self {
        self.bind(BindingKind::Body, index, Some(Shape::from_contract::<T>()))
    }

    pub fn param(self, index: usize) -> Self {
        self.bind(BindingKind::Param, index, None)
    }

    pub fn param_contract<T: Serialize + Default>(self, index: usize) -> Self {
        self.bind(BindingKind::Param, index, Some(Shape::from_contract::<T>()))
    }

    pub fn query(self, index: usize) -> Self {
        self.bind(BindingKind::Query, index, None)
    }

    pub fn query_contract<T: Serialize + Default>(self, index: usize) -> Self {
        self.bind(BindingKind::Query, index, Some(Shape::from_contract::<T>()))
    }

    /// Bind argument `index` with an explicit shape.
    ///
    /// Indices must stay below [`crate::MAX_BOUND_ARGUMENTS`]; bootstrap
    /// rejects the route otherwise. Gaps are allowed and bind `null`.
    pub fn bind(mut self, kind: BindingKind, index: usize, shape: Option<Shape>) -> Self {
        self.bindings.push((kind, ParameterBinding { index, shape }));
        self
    }
}
