//! Request-scoped key/value store.
//!
//! Every [`Request`](crate::Request) owns exactly one [`Context`]. It is
//! created when the request is received, travels through the middleware chain
//! together with the request, and is dropped with it when the handler
//! returns. Nothing is shared between requests, so a value written while
//! serving one request can never be read while serving another, and no entry
//! outlives the request that created it, whichever way the request ends.
//!
//! ```rust
//! use strata::Context;
//!
//! let mut ctx = Context::new();
//! ctx.insert("user", String::from("alice"));
//!
//! assert_eq!(ctx.get::<String>("user").map(String::as_str), Some("alice"));
//! assert!(ctx.get::<u64>("user").is_none()); // wrong type reads as missing
//! ```

use std::any::Any;
use std::collections::HashMap;
use std::fmt;

use uuid::Uuid;

/// Identifier of one in-flight request.
///
/// UUID v7: time-ordered, unique across concurrent requests, stable for the
/// request's whole lifetime.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct RequestId(Uuid);

impl RequestId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RequestId {
    fn default() -> Self { Self::new() }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

type Value = Box<dyn Any + Send + Sync>;

/// Key/value scratch space bound to a single request.
///
/// The entry map is allocated on the first [`insert`](Context::insert); a
/// request that never writes to its context costs no allocation.
pub struct Context {
    id: RequestId,
    entries: Option<HashMap<String, Value>>,
}

impl Context {
    /// Creates an empty context with a fresh [`RequestId`].
    pub fn new() -> Self {
        Self::with_id(RequestId::new())
    }

    pub fn with_id(id: RequestId) -> Self {
        Self { id, entries: None }
    }

    /// Identity of the request this context belongs to.
    pub fn id(&self) -> RequestId {
        self.id
    }

    /// Stores `value` under `key`, replacing any previous value.
    pub fn insert<T>(&mut self, key: impl Into<String>, value: T)
    where
        T: Any + Send + Sync,
    {
        self.entries
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), Box::new(value));
    }

    /// Returns the value stored under `key`.
    ///
    /// `None` when the key is missing or holds a value of another type.
    pub fn get<T: Any>(&self, key: &str) -> Option<&T> {
        self.entries.as_ref()?.get(key)?.downcast_ref()
    }

    pub fn get_mut<T: Any>(&mut self, key: &str) -> Option<&mut T> {
        self.entries.as_mut()?.get_mut(key)?.downcast_mut()
    }

    /// Removes and returns the value under `key` if it has type `T`.
    ///
    /// A value of a different type is left in place.
    pub fn remove<T: Any>(&mut self, key: &str) -> Option<T> {
        let entries = self.entries.as_mut()?;
        if !entries.get(key)?.is::<T>() {
            return None;
        }
        entries
            .remove(key)
            .and_then(|v| v.downcast::<T>().ok())
            .map(|v| *v)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.as_ref().is_some_and(|e| e.contains_key(key))
    }

    pub fn len(&self) -> usize {
        self.entries.as_ref().map_or(0, HashMap::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops every entry.
    pub fn clear(&mut self) {
        self.entries = None;
    }
}

impl Default for Context {
    fn default() -> Self { Self::new() }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<&str> = self
            .entries
            .iter()
            .flat_map(|e| e.keys().map(String::as_str))
            .collect();
        keys.sort_unstable();
        f.debug_struct("Context")
            .field("id", &self.id)
            .field("keys", &keys)
            .finish()
    }
}
