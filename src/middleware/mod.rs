//! Middleware layer.
//!
//! A [`Middleware`] turns the rest of the chain (`next`) into a new handler
//! that can act before and after `next` runs, or answer on its own without
//! calling it. Chains are built like an onion:
//!
//! ```text
//! compose(h, [m0, m1, m2]) == m0.wrap(m1.wrap(m2.wrap(h)))
//!
//!  m0 pre → m1 pre → m2 pre → h → m2 post → m1 post → m0 post
//! ```
//!
//! Registration order is execution order for the code a middleware runs
//! before `next`, and the reverse for the code it runs after.
//!
//! Built-in middleware:
//! - [`Recover`]: the error boundary; turns panics into a structured `500`
//! - [`Trace`]: one log event per request with method, path, status, latency
//! - [`Accept`]: `406` unless the `Accept` header names a given media type
//! - [`JsonBody`]: decodes the JSON body into the request context or `406`
//!
//! # Writing middleware
//!
//! The shortest form is [`from_fn`]:
//!
//! ```rust
//! use strata::{Chain, Request, middleware};
//!
//! let auth = middleware::from_fn(|mut req: Request, next: Chain| async move {
//!     req.context_mut().insert("user", String::from("alice"));
//!     next.call(req).await
//! });
//! ```
//!
//! A plain `fn(Chain) -> Chain` is a middleware too, as is any type that
//! implements the trait.

mod accept;
mod json;
mod recover;
mod trace;

use std::future::Future;
use std::sync::Arc;

use crate::handler::Chain;
use crate::request::Request;
use crate::response::IntoResponse;

pub use accept::Accept;
pub use json::{BODY_KEY, JsonBody};
pub use recover::Recover;
pub use trace::Trace;

/// A wrapping transform from "next handler" to "handler".
pub trait Middleware: Send + Sync + 'static {
    fn wrap(&self, next: Chain) -> Chain;

    /// Type-erases `self` for registration next to other middleware types.
    fn boxed(self) -> BoxedMiddleware
    where
        Self: Sized,
    {
        Arc::new(self)
    }
}

/// A shared, type-erased middleware as stored by the router.
pub type BoxedMiddleware = Arc<dyn Middleware>;

impl<F> Middleware for F
where
    F: Fn(Chain) -> Chain + Send + Sync + 'static,
{
    fn wrap(&self, next: Chain) -> Chain {
        self(next)
    }
}

/// Builds one handler out of `terminal` and every middleware in `middlewares`.
///
/// `middlewares[0]` ends up outermost. Each middleware is applied exactly once.
pub fn compose(terminal: Chain, middlewares: &[BoxedMiddleware]) -> Chain {
    middlewares
        .iter()
        .rev()
        .fold(terminal, |next, middleware| middleware.wrap(next))
}

/// Middleware from an async function taking the request and the rest of the chain.
pub fn from_fn<F, Fut, R>(f: F) -> FromFn<F>
where
    F: Fn(Request, Chain) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    FromFn { f: Arc::new(f) }
}

/// Middleware returned by [`from_fn`].
pub struct FromFn<F> {
    f: Arc<F>,
}

impl<F> Clone for FromFn<F> {
    fn clone(&self) -> Self {
        Self { f: Arc::clone(&self.f) }
    }
}

impl<F, Fut, R> Middleware for FromFn<F>
where
    F: Fn(Request, Chain) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn wrap(&self, next: Chain) -> Chain {
        let f = Arc::clone(&self.f);
        Chain::new(move |req: Request| (*f)(req, next.clone()))
    }
}
