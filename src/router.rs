//! Exact-match route table and dispatcher.
//!
//! One hash map per method, keyed by path. O(1) lookup, exact string
//! equality, no normalisation: `/users` and `/users/` are different routes,
//! and path parameters or wildcards do not exist.
//!
//! Every dispatch composes `global middlewares ++ route middlewares ++
//! handler` into one [`Chain`]. Because the global list is read at dispatch
//! time, a global middleware applies to every route, whether the route was
//! registered before or after it.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::error::RouteNotFound;
use crate::handler::{Chain, Handler};
use crate::method::Method;
use crate::middleware::{self, BoxedMiddleware, Middleware, Recover};
use crate::render::{self, NOT_FOUND};
use crate::request::Request;
use crate::response::Response;
use crate::status::Status;

struct Route {
    handler: Chain,
    middlewares: Vec<BoxedMiddleware>,
}

/// The application router.
///
/// Build it once at startup; pass it to [`Server::serve`](crate::Server::serve).
/// Each registration returns `self` so calls chain naturally:
///
/// ```rust
/// use strata::{Middleware, Request, Response, Router, middleware::{Accept, Trace}};
///
/// # async fn list_users(_: Request) -> Response { Response::text("") }
/// # async fn create_user(_: Request) -> Response { Response::text("") }
/// let app = Router::new()
///     .use_global(Trace)
///     .get("/users", list_users)
///     .post_with("/users", create_user, [Accept::json_api().boxed()]);
/// ```
pub struct Router {
    routes: HashMap<Method, HashMap<String, Route>>,
    global: Vec<BoxedMiddleware>,
}

impl Router {
    /// A router whose outermost global middleware is [`Recover`].
    pub fn new() -> Self {
        Self::bare().use_global(Recover)
    }

    /// A router with no middleware at all, not even the error boundary.
    pub fn bare() -> Self {
        Self { routes: HashMap::new(), global: Vec::new() }
    }

    /// Register a handler for a method + path pair.
    pub fn on(self, method: Method, path: &str, handler: impl Handler) -> Self {
        self.add(method, path, handler, Vec::new())
    }

    /// Register a handler wrapped in route-private middleware.
    ///
    /// Route middleware runs inside every global middleware, in the order given.
    pub fn on_with<I>(self, method: Method, path: &str, handler: impl Handler, middlewares: I) -> Self
    where
        I: IntoIterator<Item = BoxedMiddleware>,
    {
        self.add(method, path, handler, middlewares.into_iter().collect())
    }

    pub fn get(self, path: &str, handler: impl Handler) -> Self {
        self.on(Method::Get, path, handler)
    }

    pub fn post(self, path: &str, handler: impl Handler) -> Self {
        self.on(Method::Post, path, handler)
    }

    pub fn put(self, path: &str, handler: impl Handler) -> Self {
        self.on(Method::Put, path, handler)
    }

    pub fn delete(self, path: &str, handler: impl Handler) -> Self {
        self.on(Method::Delete, path, handler)
    }

    pub fn get_with<I>(self, path: &str, handler: impl Handler, middlewares: I) -> Self
    where
        I: IntoIterator<Item = BoxedMiddleware>,
    {
        self.on_with(Method::Get, path, handler, middlewares)
    }

    pub fn post_with<I>(self, path: &str, handler: impl Handler, middlewares: I) -> Self
    where
        I: IntoIterator<Item = BoxedMiddleware>,
    {
        self.on_with(Method::Post, path, handler, middlewares)
    }

    pub fn put_with<I>(self, path: &str, handler: impl Handler, middlewares: I) -> Self
    where
        I: IntoIterator<Item = BoxedMiddleware>,
    {
        self.on_with(Method::Put, path, handler, middlewares)
    }

    pub fn delete_with<I>(self, path: &str, handler: impl Handler, middlewares: I) -> Self
    where
        I: IntoIterator<Item = BoxedMiddleware>,
    {
        self.on_with(Method::Delete, path, handler, middlewares)
    }

    /// Appends a middleware that wraps every route, existing and future.
    pub fn use_global(mut self, middleware: impl Middleware) -> Self {
        self.global.push(middleware.boxed());
        self
    }

    fn add(
        mut self,
        method: Method,
        path: &str,
        handler: impl Handler,
        middlewares: Vec<BoxedMiddleware>,
    ) -> Self {
        debug!(%method, path, middlewares = middlewares.len(), "registering route");
        let route = Route { handler: handler.into_chain(), middlewares };
        let previous = self.routes.entry(method).or_default().insert(path.to_owned(), route);
        if previous.is_some() {
            warn!(%method, path, "route registered twice, keeping the latest handler");
        }
        self
    }

    /// Number of registered `(method, path)` routes.
    pub fn len(&self) -> usize {
        self.routes.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Resolves `method` + `path` to the route's fully composed chain.
    pub fn dispatch(&self, method: Method, path: &str) -> Result<Chain, RouteNotFound> {
        let route = self
            .routes
            .get(&method)
            .and_then(|table| table.get(path))
            .ok_or_else(|| RouteNotFound { method, path: path.to_owned() })?;

        let chain = middleware::compose(route.handler.clone(), &route.middlewares);
        Ok(middleware::compose(chain, &self.global))
    }

    /// Runs one request to completion.
    ///
    /// Unmatched requests get a structured `404` without touching any
    /// middleware. The request, and with it its context, is consumed here:
    /// whatever happens inside the chain, nothing of it outlives this call.
    pub async fn handle(&self, req: Request) -> Response {
        match self.dispatch(req.method(), req.path()) {
            Ok(chain) => chain.call(req).await,
            Err(e) => {
                debug!(request_id = %req.context().id(), "{e}");
                render::emit_error(&NOT_FOUND, Status::NotFound)
            }
        }
    }
}

impl Default for Router {
    fn default() -> Self { Self::new() }
}
