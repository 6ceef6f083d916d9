// Route registrar: turns declared metadata into transport registrations

use crate::declare::RegistryContext;
use crate::dispatch::{Dispatcher, MAX_BOUND_ARGUMENTS, RouteBindings};
use crate::metadata::{Subject, facets};
use crate::middleware::MiddlewareChain;
use crate::routing::HandlerFn;
use crate::{Error, HttpMethod};
use std::collections::HashSet;
use tracing::{debug, info};

/// Something that can serve registered handlers
pub trait Transport {
    fn register_handler(&mut self, method: HttpMethod, path: &str, handler: HandlerFn) -> Result<(), Error>;
}

/// Documentation of one registered route
#[derive(Debug, Clone, PartialEq)]
pub struct RouteDocumentation {
    pub method: HttpMethod,
    pub url: String,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub tags: Vec<String>,
}

/// Receives documentation for documented routes
pub trait DocumentationSink {
    fn document(&mut self, doc: RouteDocumentation);
}

impl DocumentationSink for () {
    fn document(&mut self, _doc: RouteDocumentation) {}
}

impl DocumentationSink for Vec<RouteDocumentation> {
    fn document(&mut self, doc: RouteDocumentation) {
        self.push(doc);
    }
}

/// Join a controller prefix and a route sub-path with exactly one slash.
///
/// Empty segments are dropped, so there is never a trailing slash except
/// for the root path itself.
///
/// ```
/// use trellis_core::join_paths;
///
/// assert_eq!(join_paths("/users", "/"), "/users");
/// assert_eq!(join_paths("/users/", ":id"), "/users/:id");
/// assert_eq!(join_paths("", "/"), "/");
/// ```
pub fn join_paths(base: &str, sub: &str) -> String {
    let segments: Vec<&str> = base
        .split('/')
        .chain(sub.split('/'))
        .filter(|s| !s.is_empty())
        .collect();
    format!("/{}", segments.join("/"))
}

/// Register every declared controller's routes with `transport`.
///
/// Builds all injectables and controllers first; any container error is
/// returned before a single route is registered. A controller declaring
/// the same handler name twice, or binding an argument at or beyond
/// [`MAX_BOUND_ARGUMENTS`], is rejected the same way. Returns the number
/// of routes registered.
pub fn register_routes(
    ctx: &RegistryContext,
    transport: &mut dyn Transport,
    docs: &mut dyn DocumentationSink,
) -> Result<usize, Error> {
    let metadata = ctx.metadata();
    let container = ctx.container();

    for id in ctx.injectables() {
        container.register(metadata, *id)?;
    }
    for controller in ctx.controllers() {
        container.register(metadata, controller.id)?;
    }

    // Everything is checked before the first registration, so a rejected
    // declaration never leaves a half-filled transport behind.
    let mut planned = Vec::new();
    let mut seen = HashSet::new();

    for controller in ctx.controllers() {
        let subject = Subject::Type(controller.id);
        let base_path = metadata.get::<facets::BasePath>(&subject);
        let class_middlewares = metadata.get::<facets::Middlewares>(&subject);
        let mut handler_names = HashSet::new();

        for route in metadata.get::<facets::Routes>(&subject) {
            let name = route.handler.name().to_string();
            if !handler_names.insert(name.clone()) {
                return Err(Error::InvalidRoute(format!(
                    "{}::{} is declared more than once",
                    controller.id, name
                )));
            }

            let url = join_paths(&base_path, &route.path);
            if !seen.insert((route.method, url.clone())) {
                return Err(Error::DuplicateRoute(format!("{} {}", route.method, url)));
            }

            let method_subject = Subject::Method(controller.id, name.into());
            let mut middlewares = class_middlewares.clone();
            middlewares.extend(metadata.get::<facets::Middlewares>(&method_subject));

            let bindings = RouteBindings {
                body: metadata.get::<facets::BodyBindings>(&method_subject),
                param: metadata.get::<facets::ParamBindings>(&method_subject),
                query: metadata.get::<facets::QueryBindings>(&method_subject),
            };
            if let Some(index) = bindings
                .highest_index()
                .filter(|index| *index >= MAX_BOUND_ARGUMENTS)
            {
                return Err(Error::InvalidRoute(format!(
                    "{}::{} binds argument {} but at most {} are supported",
                    controller.id,
                    route.handler.name(),
                    index,
                    MAX_BOUND_ARGUMENTS
                )));
            }

            planned.push((controller.id, url, middlewares, bindings, route));
        }
    }

    let mut registered = 0;
    for (controller, url, middlewares, bindings, route) in planned {
        debug!(
            controller = %controller,
            method = %route.method,
            url = %url,
            handler = route.handler.name(),
            middleware = middlewares.len(),
            "Registering route"
        );

        let dispatcher = Dispatcher::new(
            controller,
            container.clone(),
            route.handler.clone(),
            MiddlewareChain::new(middlewares),
            bindings,
        );
        transport.register_handler(route.method, &url, dispatcher.into_handler())?;
        registered += 1;

        if let Some(doc) = route.doc {
            docs.document(RouteDocumentation {
                method: route.method,
                url,
                summary: doc.summary,
                description: doc.description,
                tags: doc.tags,
            });
        }
    }

    info!(routes = registered, controllers = ctx.controllers().len(), "Routes registered");
    Ok(registered)
}
