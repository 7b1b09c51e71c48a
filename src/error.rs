//! Unified error types.

use crate::method::Method;

/// The error type returned by strata's fallible operations.
///
/// Application-level errors (404, 406, 500, etc.) are expressed as HTTP
/// [`Response`](crate::Response) values, not as `Error`s. This type surfaces
/// infrastructure failures: parsing the listen address, binding to a port.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid listen address `{addr}`: {source}")]
    Addr {
        addr: String,
        #[source]
        source: std::net::AddrParseError,
    },

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

/// No route is registered for a method + path pair.
///
/// Returned by [`Router::dispatch`](crate::Router::dispatch);
/// [`Router::handle`](crate::Router::handle) turns it into a `404` response.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
#[error("no route for {method} {path}")]
pub struct RouteNotFound {
    pub method: Method,
    pub path: String,
}
