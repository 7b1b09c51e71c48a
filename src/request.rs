//! Incoming HTTP request type.

use bytes::Bytes;

use crate::context::Context;
use crate::method::Method;

/// An incoming HTTP request together with its request-scoped [`Context`].
///
/// The router matches on [`method`](Request::method) and the exact
/// [`path`](Request::path); the query string is kept for handlers but never
/// takes part in matching.
pub struct Request {
    pub(crate) method: Method,
    pub(crate) path: String,
    pub(crate) query: Option<String>,
    pub(crate) headers: Vec<(String, String)>,
    pub(crate) body: Bytes,
    pub(crate) context: Context,
}

impl Request {
    /// Builds a request with no headers and an empty body.
    ///
    /// The server builds requests from the wire; this constructor is for
    /// driving a [`Router`](crate::Router) directly, e.g. in tests.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: None,
            headers: Vec::new(),
            body: Bytes::new(),
            context: Context::new(),
        }
    }

    pub fn get(path: impl Into<String>) -> Self { Self::new(Method::Get, path) }
    pub fn post(path: impl Into<String>) -> Self { Self::new(Method::Post, path) }
    pub fn put(path: impl Into<String>) -> Self { Self::new(Method::Put, path) }
    pub fn delete(path: impl Into<String>) -> Self { Self::new(Method::Delete, path) }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_owned(), value.to_owned()));
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    pub fn method(&self) -> Method { self.method }
    pub fn path(&self) -> &str { &self.path }
    pub fn query(&self) -> Option<&str> { self.query.as_deref() }
    pub fn headers(&self) -> &[(String, String)] { &self.headers }
    pub fn body(&self) -> &[u8] { &self.body }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn context(&self) -> &Context { &self.context }
    pub fn context_mut(&mut self) -> &mut Context { &mut self.context }
}

impl std::fmt::Debug for Request {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Request")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("query", &self.query)
            .field("body_len", &self.body.len())
            .field("context", &self.context)
            .finish()
    }
}
