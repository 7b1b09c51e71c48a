//! HTTP server and graceful shutdown.
//!
//! # Graceful shutdown
//!
//! On **SIGTERM** or **Ctrl-C** the server:
//! 1. Immediately stops `listener.accept()`; no new connections are made.
//! 2. Lets every in-flight connection task run to completion.
//! 3. Returns from [`Server::serve`], which lets `main` exit cleanly.
//!
//! [`Server::serve_with_shutdown`] takes any future as the shutdown trigger.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Body;
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

use crate::context::Context;
use crate::error::Error;
use crate::method::Method;
use crate::render::{self, BAD_REQUEST, NOT_FOUND};
use crate::request::Request;
use crate::router::Router;
use crate::status::Status;

/// The HTTP server.
#[derive(Debug)]
pub struct Server {
    addr: SocketAddr,
}

impl Server {
    /// Configures the server to bind to `addr` when [`serve`](Server::serve)
    /// is called.
    ///
    /// ```rust
    /// use strata::Server;
    /// let server = Server::bind("0.0.0.0:3000").unwrap();
    /// assert!(Server::bind("not an address").is_err());
    /// ```
    pub fn bind(addr: &str) -> Result<Self, Error> {
        let parsed = addr.parse().map_err(|source| Error::Addr {
            addr: addr.to_owned(),
            source,
        })?;
        Ok(Self { addr: parsed })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Starts accepting connections and dispatching them through `router`.
    ///
    /// Returns only after a full graceful shutdown (SIGTERM or Ctrl-C,
    /// followed by all in-flight requests completing).
    pub async fn serve(self, router: Router) -> Result<(), Error> {
        self.serve_with_shutdown(router, shutdown_signal()).await
    }

    /// Like [`serve`](Server::serve), but stops accepting when `shutdown`
    /// resolves.
    pub async fn serve_with_shutdown<S>(self, router: Router, shutdown: S) -> Result<(), Error>
    where
        S: Future<Output = ()>,
    {
        let listener = TcpListener::bind(self.addr).await?;
        let local_addr = listener.local_addr()?;

        // Read-only from here on; shared by every connection task.
        let router = Arc::new(router);

        info!(addr = %local_addr, routes = router.len(), "strata listening");

        let mut tasks = tokio::task::JoinSet::new();

        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                // Check shutdown first so a signal immediately stops accepting
                // new connections, even if more are queued.
                biased;

                () = &mut shutdown => {
                    info!(in_flight = tasks.len(), "shutdown signal received, draining connections");
                    break;
                }

                res = listener.accept() => {
                    let (stream, remote_addr) = match res {
                        Ok(v) => v,
                        Err(e) => {
                            error!("accept error: {e}");
                            continue;
                        }
                    };

                    let router = Arc::clone(&router);
                    let io = TokioIo::new(stream);

                    tasks.spawn(async move {
                        // Called once per request on the connection.
                        let svc = service_fn(move |req| {
                            let router = Arc::clone(&router);
                            async move { dispatch(&router, req).await }
                        });

                        if let Err(e) = ConnBuilder::new(TokioExecutor::new())
                            .serve_connection(io, svc)
                            .await
                        {
                            error!(peer = %remote_addr, "connection error: {e}");
                        }
                    });
                }

                // Reap finished connection tasks so the JoinSet does not grow
                // without bound on long-running servers.
                Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
            }
        }

        while tasks.join_next().await.is_some() {}

        info!("strata stopped");
        Ok(())
    }
}

// ── Request dispatch ──────────────────────────────────────────────────────────

/// Turns one wire request into a [`Request`], routes it and converts the
/// answer back.
///
/// The error type is [`Infallible`](std::convert::Infallible): every failure
/// becomes a response, so hyper never sees an error.
async fn dispatch<B>(
    router: &Router,
    req: http::Request<B>,
) -> Result<http::Response<Full<Bytes>>, std::convert::Infallible>
where
    B: Body,
    B::Error: std::fmt::Display,
{
    let (parts, body) = req.into_parts();
    let context = Context::new();

    let Ok(method) = Method::try_from(&parts.method) else {
        debug!(request_id = %context.id(), method = %parts.method, path = parts.uri.path(), "unroutable method");
        return Ok(render::emit_error(&NOT_FOUND, Status::NotFound).into_inner());
    };

    let body = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            warn!(request_id = %context.id(), "failed to read request body: {e}");
            return Ok(render::emit_error(&BAD_REQUEST, Status::BadRequest).into_inner());
        }
    };

    let headers = parts
        .headers
        .iter()
        .filter_map(|(name, value)| {
            value.to_str().ok().map(|v| (name.as_str().to_owned(), v.to_owned()))
        })
        .collect();

    let request = Request {
        method,
        path: parts.uri.path().to_owned(),
        query: parts.uri.query().map(str::to_owned),
        headers,
        body,
        context,
    };

    Ok(router.handle(request).await.into_inner())
}

// ── Shutdown signal ───────────────────────────────────────────────────────────

/// Resolves on the first shutdown signal the process receives.
///
/// On Unix this listens for both **SIGTERM** and **SIGINT** (Ctrl-C).
/// On Windows only Ctrl-C is available. A signal handler that cannot be
/// installed is logged and its arm never fires.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to install Ctrl-C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let sigterm = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c   => {}
        () = sigterm  => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::from_fn;
    use crate::{Chain, Middleware, Response};

    fn wire(method: &str, uri: &str, body: &'static str) -> http::Request<Full<Bytes>> {
        http::Request::builder()
            .method(method)
            .uri(uri)
            .header("x-user", "ann")
            .body(Full::new(Bytes::from_static(body.as_bytes())))
            .unwrap()
    }

    async fn echo(req: Request) -> Response {
        Response::text(format!(
            "{} {} {:?} {} {}",
            req.method(),
            req.path(),
            req.query(),
            req.header("X-User").unwrap_or("-"),
            String::from_utf8_lossy(req.body()),
        ))
    }

    async fn body_of(res: http::Response<Full<Bytes>>) -> Bytes {
        res.into_body().collect().await.unwrap().to_bytes()
    }

    #[tokio::test]
    async fn wire_request_is_translated() {
        let app = Router::new().post("/echo", echo);
        let res = dispatch(&app, wire("POST", "/echo?x=1", "hi")).await.unwrap();

        assert_eq!(res.status(), http::StatusCode::OK);
        assert_eq!(body_of(res).await, "POST /echo Some(\"x=1\") ann hi");
    }

    #[tokio::test]
    async fn unknown_method_and_path_are_404() {
        let app = Router::new().get("/echo", echo);

        let res = dispatch(&app, wire("PATCH", "/echo", "")).await.unwrap();
        assert_eq!(res.status(), http::StatusCode::NOT_FOUND);

        let res = dispatch(&app, wire("GET", "/nope", "")).await.unwrap();
        assert_eq!(res.status(), http::StatusCode::NOT_FOUND);
        assert_eq!(res.headers()["content-type"], "application/vnd.api+json");
    }

    #[tokio::test]
    async fn response_headers_reach_the_wire() {
        let tag = from_fn(|req: Request, next: Chain| async move {
            let res = next.call(req).await;
            Response::builder()
                .status(Status::Accepted)
                .header("x-wrapped", "yes")
                .text(String::from_utf8_lossy(res.body()).into_owned())
        });
        let app = Router::new().get_with("/echo", echo, [tag.boxed()]);

        let res = dispatch(&app, wire("GET", "/echo", "")).await.unwrap();
        assert_eq!(res.status(), http::StatusCode::ACCEPTED);
        assert_eq!(res.headers()["x-wrapped"], "yes");
    }

    #[tokio::test]
    async fn serves_over_tcp_until_shutdown() {
        let server = Server::bind("127.0.0.1:0").unwrap();
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        let app = Router::new().get("/echo", echo);

        let handle = tokio::spawn(server.serve_with_shutdown(app, async {
            let _ = rx.await;
        }));

        tx.send(()).unwrap();
        handle.await.unwrap().unwrap();
    }
}
