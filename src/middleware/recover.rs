//! The error boundary.

use std::any::Any;
use std::panic::AssertUnwindSafe;

use futures_util::FutureExt;
use tracing::error;

use crate::handler::Chain;
use crate::middleware::Middleware;
use crate::render::{self, INTERNAL_SERVER_ERROR};
use crate::request::Request;
use crate::status::Status;

/// Catches a panic anywhere further down the chain and answers with a
/// generic structured `500`.
///
/// The panic message is logged, never sent to the client. Installed first by
/// [`Router::new`](crate::Router::new); nothing else in the framework
/// recovers from faults.
///
/// The request (and with it its [`Context`](crate::Context)) is dropped while
/// the panic unwinds, so cleanup does not depend on this middleware.
#[derive(Clone, Copy, Debug, Default)]
pub struct Recover;

impl Middleware for Recover {
    fn wrap(&self, next: Chain) -> Chain {
        Chain::new(move |req: Request| {
            let next = next.clone();
            let method = req.method();
            let path = req.path().to_owned();
            let request_id = req.context().id();
            async move {
                // The inner call happens inside the guarded future so a panic
                // raised before the handler's first await is caught too.
                let guarded = AssertUnwindSafe(async move { next.call(req).await });
                match guarded.catch_unwind().await {
                    Ok(res) => res,
                    Err(panic) => {
                        error!(
                            %request_id,
                            %method,
                            path = %path,
                            panic = panic_message(panic.as_ref()),
                            "handler panicked"
                        );
                        render::emit_error(&INTERNAL_SERVER_ERROR, Status::InternalServerError)
                    }
                }
            }
        })
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "non-string panic payload"
    }
}
