//! The application façade: route groups, per-request dispatch and serving.
//!
//! An [`Engine`] is built in two phases. While it is owned mutably, routes and
//! middleware are registered on it directly or through [`RouterGroup`]s. Once
//! [`run`](Engine::run) or [`serve`](Engine::serve) takes it by value it is
//! frozen behind an `Arc` and only read, so connection tasks share it without
//! locks.
//!
//! # Examples
//!
//! ```rust,no_run
//! use twig::{Context, Engine, StatusCode};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut engine = Engine::with_defaults();
//!     engine.get("/", |c| c.string(StatusCode::Ok, "Hello\n"))?;
//!
//!     let mut v1 = engine.group("/v1");
//!     v1.use_middleware(|c: &mut Context| {
//!         c.set_header("X-Api-Version", "1");
//!         c.next();
//!     });
//!     v1.get("/hello/:name", |c| {
//!         let name = c.param("name").unwrap_or_default().to_owned();
//!         c.string(StatusCode::Ok, format!("hello {name}\n"));
//!     })?;
//!
//!     engine.run("127.0.0.1:9999").await?;
//!     Ok(())
//! }
//! ```

use std::future::Future;
use std::sync::Arc;

use crate::context::Context;
use crate::error::RouteError;
use crate::http::{Method, Request, Response};
use crate::middleware::{Logger, Middleware, Recovery, from_middleware};
use crate::router::{HandlerFunc, Router, parse_pattern};
use crate::server::{Server, ServerError};

// Index of the root group, whose prefix is empty.
const ROOT: usize = 0;

struct Group {
    prefix: String,
    // Decomposed `prefix`, compared segment by segment against request paths.
    segments: Vec<String>,
    middlewares: Vec<HandlerFunc>,
    parent: Option<usize>,
}

impl Group {
    fn new(prefix: String, parent: Option<usize>) -> Self {
        let segments = parse_pattern(&prefix)
            .into_iter()
            .map(str::to_owned)
            .collect();
        Self {
            prefix,
            segments,
            middlewares: Vec::new(),
            parent,
        }
    }

    // `/v1` applies to `/v1` and `/v1/x` but not to `/v10`.
    fn applies_to(&self, path_segments: &[&str]) -> bool {
        self.segments.len() <= path_segments.len()
            && self
                .segments
                .iter()
                .zip(path_segments)
                .all(|(prefix, segment)| prefix == segment)
    }
}

/// Routes, groups and their middleware, plus the entry point for requests.
pub struct Engine {
    router: Router,
    groups: Vec<Group>,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    /// An engine with no middleware.
    pub fn new() -> Self {
        Self {
            router: Router::new(),
            groups: vec![Group::new(String::new(), None)],
        }
    }

    /// An engine with [`Logger`] and [`Recovery`] installed, in that order.
    pub fn with_defaults() -> Self {
        let mut engine = Self::new();
        engine.use_middleware(Logger).use_middleware(Recovery);
        engine
    }

    fn add_group(&mut self, parent: usize, prefix: &str) -> usize {
        let full = format!("{}{}", self.groups[parent].prefix, prefix);
        tracing::debug!(prefix = %full, "route group created");
        self.groups.push(Group::new(full, Some(parent)));
        self.groups.len() - 1
    }

    /// The group with an empty prefix; its middleware applies to every request.
    pub fn root(&mut self) -> RouterGroup<'_> {
        RouterGroup {
            engine: self,
            index: ROOT,
        }
    }

    /// Create a top-level group under `prefix`.
    pub fn group(&mut self, prefix: &str) -> RouterGroup<'_> {
        let index = self.add_group(ROOT, prefix);
        RouterGroup {
            engine: self,
            index,
        }
    }

    /// Append middleware that runs for every request, matched or not.
    pub fn use_middleware<M>(&mut self, middleware: M) -> &mut Self
    where
        M: Middleware + 'static,
    {
        self.root().use_middleware(middleware);
        self
    }

    pub fn add_route(
        &mut self,
        method: Method,
        pattern: &str,
        handler: HandlerFunc,
    ) -> Result<(), RouteError> {
        self.root().add_route(method, pattern, handler)
    }

    pub fn get<F>(&mut self, pattern: &str, handler: F) -> Result<(), RouteError>
    where
        F: Fn(&mut Context) + Send + Sync + 'static,
    {
        self.root().get(pattern, handler)
    }

    pub fn post<F>(&mut self, pattern: &str, handler: F) -> Result<(), RouteError>
    where
        F: Fn(&mut Context) + Send + Sync + 'static,
    {
        self.root().post(pattern, handler)
    }

    pub fn put<F>(&mut self, pattern: &str, handler: F) -> Result<(), RouteError>
    where
        F: Fn(&mut Context) + Send + Sync + 'static,
    {
        self.root().put(pattern, handler)
    }

    pub fn delete<F>(&mut self, pattern: &str, handler: F) -> Result<(), RouteError>
    where
        F: Fn(&mut Context) + Send + Sync + 'static,
    {
        self.root().delete(pattern, handler)
    }

    pub fn patch<F>(&mut self, pattern: &str, handler: F) -> Result<(), RouteError>
    where
        F: Fn(&mut Context) + Send + Sync + 'static,
    {
        self.root().patch(pattern, handler)
    }

    pub fn head<F>(&mut self, pattern: &str, handler: F) -> Result<(), RouteError>
    where
        F: Fn(&mut Context) + Send + Sync + 'static,
    {
        self.root().head(pattern, handler)
    }

    pub fn options<F>(&mut self, pattern: &str, handler: F) -> Result<(), RouteError>
    where
        F: Fn(&mut Context) + Send + Sync + 'static,
    {
        self.root().options(pattern, handler)
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Run one request through the middleware of every group whose prefix
    /// covers its path, then through the matched route (or the 404 handler).
    ///
    /// Groups contribute in the order they were created, so outer groups'
    /// middleware wraps inner groups' middleware.
    pub fn handle(&self, request: Request) -> Response {
        let path_segments = parse_pattern(request.path());
        let middlewares: Vec<HandlerFunc> = self
            .groups
            .iter()
            .filter(|group| group.applies_to(&path_segments))
            .flat_map(|group| group.middlewares.iter().cloned())
            .collect();

        let mut ctx = Context::with_handlers(request, middlewares);
        self.router.handle(&mut ctx);
        ctx.into_response()
    }

    /// Bind `addr` and serve until the process ends.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError`] if binding or the listener fails.
    pub async fn run(self, addr: impl AsRef<str>) -> Result<(), ServerError> {
        let server = Server::bind(addr).await?;
        self.serve(server).await
    }

    /// Serve on an already bound [`Server`] until the process ends.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Io`] if the listener fails.
    pub async fn serve(self, server: Server) -> Result<(), ServerError> {
        self.serve_with_shutdown(server, std::future::pending()).await
    }

    /// Serve on `server` until `shutdown` resolves.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Io`] if the listener fails.
    pub async fn serve_with_shutdown<S>(
        self,
        server: Server,
        shutdown: S,
    ) -> Result<(), ServerError>
    where
        S: Future<Output = ()>,
    {
        let engine = Arc::new(self);
        server
            .run_until(move |request| engine.handle(request), shutdown)
            .await
    }
}

/// A prefix plus middleware, borrowed from its [`Engine`] while routes are
/// being registered.
///
/// A group's full prefix is its parent's prefix followed by its own; routes
/// registered on it are stored in the engine's single [`Router`].
pub struct RouterGroup<'a> {
    engine: &'a mut Engine,
    index: usize,
}

impl RouterGroup<'_> {
    /// Full prefix of this group, e.g. `/v1/admin`.
    pub fn prefix(&self) -> &str {
        &self.engine.groups[self.index].prefix
    }

    /// Full prefix of the enclosing group, `None` for the root group.
    pub fn parent_prefix(&self) -> Option<&str> {
        let parent = self.engine.groups[self.index].parent?;
        Some(&self.engine.groups[parent].prefix)
    }

    /// Create a nested group under `prefix`.
    pub fn group(&mut self, prefix: &str) -> RouterGroup<'_> {
        let index = self.engine.add_group(self.index, prefix);
        RouterGroup {
            engine: &mut *self.engine,
            index,
        }
    }

    /// Append middleware to this group.
    pub fn use_middleware<M>(&mut self, middleware: M) -> &mut Self
    where
        M: Middleware + 'static,
    {
        self.engine.groups[self.index]
            .middlewares
            .push(from_middleware(middleware));
        self
    }

    /// Register `handler` for `method` on `prefix + component`.
    ///
    /// # Errors
    ///
    /// See [`Router::add_route`].
    pub fn add_route(
        &mut self,
        method: Method,
        component: &str,
        handler: HandlerFunc,
    ) -> Result<(), RouteError> {
        let pattern = format!("{}{}", self.prefix(), component);
        tracing::info!("Route {:>7} - {}", method.as_str(), pattern);
        self.engine.router.add_route(method, &pattern, handler)
    }

    pub fn get<F>(&mut self, component: &str, handler: F) -> Result<(), RouteError>
    where
        F: Fn(&mut Context) + Send + Sync + 'static,
    {
        self.add_route(Method::Get, component, Arc::new(handler))
    }

    pub fn post<F>(&mut self, component: &str, handler: F) -> Result<(), RouteError>
    where
        F: Fn(&mut Context) + Send + Sync + 'static,
    {
        self.add_route(Method::Post, component, Arc::new(handler))
    }

    pub fn put<F>(&mut self, component: &str, handler: F) -> Result<(), RouteError>
    where
        F: Fn(&mut Context) + Send + Sync + 'static,
    {
        self.add_route(Method::Put, component, Arc::new(handler))
    }

    pub fn delete<F>(&mut self, component: &str, handler: F) -> Result<(), RouteError>
    where
        F: Fn(&mut Context) + Send + Sync + 'static,
    {
        self.add_route(Method::Delete, component, Arc::new(handler))
    }

    pub fn patch<F>(&mut self, component: &str, handler: F) -> Result<(), RouteError>
    where
        F: Fn(&mut Context) + Send + Sync + 'static,
    {
        self.add_route(Method::Patch, component, Arc::new(handler))
    }

    pub fn head<F>(&mut self, component: &str, handler: F) -> Result<(), RouteError>
    where
        F: Fn(&mut Context) + Send + Sync + 'static,
    {
        self.add_route(Method::Head, component, Arc::new(handler))
    }

    pub fn options<F>(&mut self, component: &str, handler: F) -> Result<(), RouteError>
    where
        F: Fn(&mut Context) + Send + Sync + 'static,
    {
        self.add_route(Method::Options, component, Arc::new(handler))
    }
}
