//! Per-request log line.

use std::time::Instant;

use tracing::info;

use crate::handler::Chain;
use crate::middleware::Middleware;
use crate::request::Request;

/// Emits one `info` event per request once the inner chain has answered:
/// request id, method, path, status and latency.
///
/// Register it before [`Recover`](super::Recover) to time requests that
/// end in a recovered fault as well; [`Router::bare`](crate::Router::bare)
/// plus explicit registration gives that order.
#[derive(Clone, Copy, Debug, Default)]
pub struct Trace;

impl Middleware for Trace {
    fn wrap(&self, next: Chain) -> Chain {
        Chain::new(move |req: Request| {
            let next = next.clone();
            async move {
                let started = Instant::now();
                let method = req.method();
                let path = req.path().to_owned();
                let request_id = req.context().id();

                let res = next.call(req).await;

                info!(
                    %request_id,
                    %method,
                    path = %path,
                    status = res.status_code(),
                    elapsed_us = started.elapsed().as_micros() as u64,
                    "request"
                );
                res
            }
        })
    }
}
