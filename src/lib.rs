//! # strata
//!
//! A minimal HTTP dispatch layer: exact-match routes, onion-style middleware
//! and a per-request context that lets middleware hand data to handlers.
//!
//! ## The pieces
//!
//! - **Router**: `(method, exact path)` → handler + route-private middleware,
//!   plus global middleware applied to every route.
//! - **Middleware**: wraps the rest of the chain. The first one registered
//!   is the outermost layer: it runs first on the way in and last on the way
//!   out.
//! - **Context**: key/value scratch space owned by each [`Request`]. It lives
//!   exactly as long as the request being served, so nothing leaks between
//!   requests or outlives one.
//! - **Render**: structured JSON error envelopes and Tera HTML templates.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use strata::{Chain, Middleware, Request, Response, Router, Server, middleware};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), strata::Error> {
//!     let auth = middleware::from_fn(|mut req: Request, next: Chain| async move {
//!         req.context_mut().insert("user", String::from("alice"));
//!         next.call(req).await
//!     });
//!
//!     let app = Router::new()
//!         .use_global(middleware::Trace)
//!         .get("/ping", ping)
//!         .get_with("/me", me, [auth.boxed()]);
//!
//!     Server::bind("0.0.0.0:3000")?.serve(app).await
//! }
//!
//! async fn ping(_req: Request) -> &'static str {
//!     "pong"
//! }
//!
//! async fn me(req: Request) -> Response {
//!     let user = req.context().get::<String>("user").cloned().unwrap_or_default();
//!     Response::text(user)
//! }
//! ```

mod context;
mod error;
mod handler;
mod method;
mod request;
mod response;
mod router;
mod server;
mod status;

pub mod middleware;
pub mod render;

pub use context::{Context, RequestId};
pub use error::{Error, RouteNotFound};
pub use handler::{BoxFuture, Chain, Handler};
pub use method::{Method, UnsupportedMethod};
pub use middleware::{BoxedMiddleware, Middleware};
pub use request::Request;
pub use response::{ContentType, IntoResponse, Response, ResponseBuilder};
pub use router::Router;
pub use server::Server;
pub use status::Status;
