//! Handler trait and type erasure.
//!
//! # How async handlers are stored
//!
//! The router holds handlers of *different* types in a single map, and
//! middleware wraps handlers it knows nothing about. Both work on [`Chain`], a
//! cheap-to-clone, type-erased handler.
//!
//! ```text
//! async fn hello(req: Request) -> Response { … }   ← user writes this
//!        ↓ router.get("/", hello)
//! hello.into_chain()                               ← Handler blanket impl
//!        ↓
//! Chain(Arc::new(FnHandler(hello)))                ← heap-allocated wrapper
//!        ↓  middleware: Middleware::wrap(chain) -> Chain
//! chain.call(req)  at request time                 ← one vtable dispatch per layer
//!        ↓
//! Box::pin(async { hello(req).await.into_response() })  ← BoxFuture
//! ```

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::request::Request;
use crate::response::{IntoResponse, Response};

// ── Internal types ────────────────────────────────────────────────────────────

/// A heap-allocated, type-erased future that resolves to a [`Response`].
///
/// `Send + 'static` let tokio move the future across threads.
pub type BoxFuture = Pin<Box<dyn Future<Output = Response> + Send + 'static>>;

/// Internal dispatch interface.
///
/// `#[doc(hidden)] pub` rather than `pub(crate)` because it sits behind the
/// public [`Chain`] type. External crates cannot usefully interact with it.
#[doc(hidden)]
pub trait ErasedHandler {
    fn call(&self, req: Request) -> BoxFuture;
}

type BoxedHandler = Arc<dyn ErasedHandler + Send + Sync + 'static>;

// ── Chain ─────────────────────────────────────────────────────────────────────

/// A type-erased handler: a terminal handler, possibly wrapped in middleware.
///
/// This is what a [`Middleware`](crate::Middleware) receives as `next` and
/// what it returns. Cloning is one atomic increment.
#[derive(Clone)]
pub struct Chain(BoxedHandler);

impl Chain {
    pub fn new(handler: impl Handler) -> Self {
        handler.into_chain()
    }

    /// Runs the request through this handler.
    pub fn call(&self, req: Request) -> BoxFuture {
        self.0.call(req)
    }
}

impl fmt::Debug for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Chain")
    }
}

// ── Public Handler trait ──────────────────────────────────────────────────────

/// Implemented for every valid route handler.
///
/// You never implement this yourself. It is automatically satisfied for any
/// `async fn` (or closure returning a future) with the signature:
///
/// ```text
/// async fn name(req: Request) -> impl IntoResponse
/// ```
///
/// and for an already built [`Chain`].
///
/// The trait is **sealed** (via the private `Sealed` supertrait).
pub trait Handler: private::Sealed + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_chain(self) -> Chain;
}

mod private {
    pub trait Sealed {}
}

// ── Blanket implementations ───────────────────────────────────────────────────

impl<F, Fut, R> private::Sealed for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
}

impl<F, Fut, R> Handler for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn into_chain(self) -> Chain {
        Chain(Arc::new(FnHandler(self)))
    }
}

impl private::Sealed for Chain {}

impl Handler for Chain {
    fn into_chain(self) -> Chain {
        self
    }
}

// ── Concrete wrapper ──────────────────────────────────────────────────────────

/// Newtype wrapper that holds a concrete handler `F` and implements
/// [`ErasedHandler`], bridging the typed world to the trait-object world.
struct FnHandler<F>(F);

impl<F, Fut, R> ErasedHandler for FnHandler<F>
where
    F: Fn(Request) -> Fut + Send + Sync,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn call(&self, req: Request) -> BoxFuture {
        let fut = (self.0)(req);
        Box::pin(async move { fut.await.into_response() })
    }
}
