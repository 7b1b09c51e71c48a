//! JSON body decoding into the request context.

use std::fmt;
use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use tracing::debug;

use crate::handler::Chain;
use crate::middleware::Middleware;
use crate::render::{self, NOT_ACCEPTABLE};
use crate::request::Request;
use crate::status::Status;

/// Context key [`JsonBody`] stores the decoded value under.
pub const BODY_KEY: &str = "body";

/// Decodes the request body as JSON into `T` and stores it in the request
/// context under [`BODY_KEY`]; answers `406 Not Acceptable` when the body
/// does not decode.
///
/// ```rust
/// use serde::Deserialize;
/// use strata::{Middleware, Request, Response, Router, middleware::{BODY_KEY, JsonBody}};
///
/// #[derive(Deserialize)]
/// struct NewUser { name: String }
///
/// async fn create(req: Request) -> Response {
///     let user = req.context().get::<NewUser>(BODY_KEY).expect("set by JsonBody");
///     Response::text(user.name.clone())
/// }
///
/// let app = Router::new().post_with("/users", create, [JsonBody::<NewUser>::new().boxed()]);
/// ```
pub struct JsonBody<T> {
    _target: PhantomData<fn() -> T>,
}

impl<T> JsonBody<T> {
    pub fn new() -> Self {
        Self { _target: PhantomData }
    }
}

impl<T> Default for JsonBody<T> {
    fn default() -> Self { Self::new() }
}

impl<T> Clone for JsonBody<T> {
    fn clone(&self) -> Self { Self::new() }
}

impl<T> fmt::Debug for JsonBody<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "JsonBody<{}>", std::any::type_name::<T>())
    }
}

impl<T> Middleware for JsonBody<T>
where
    T: DeserializeOwned + Send + Sync + 'static,
{
    fn wrap(&self, next: Chain) -> Chain {
        Chain::new(move |mut req: Request| {
            let next = next.clone();
            async move {
                match serde_json::from_slice::<T>(req.body()) {
                    Ok(value) => {
                        req.context_mut().insert(BODY_KEY, value);
                        next.call(req).await
                    }
                    Err(e) => {
                        debug!(
                            request_id = %req.context().id(),
                            target = std::any::type_name::<T>(),
                            "rejecting request: body is not valid JSON: {e}"
                        );
                        render::emit_error(&NOT_ACCEPTABLE, Status::NotAcceptable)
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::compose;
    use crate::{Response, Status};
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct User {
        id: u32,
        first_name: String,
        #[serde(default)]
        middle_name: Option<String>,
    }

    fn chain() -> Chain {
        compose(
            Chain::new(|req: Request| async move {
                match req.context().get::<User>(BODY_KEY) {
                    Some(user) => Response::text(format!("{}:{}", user.id, user.first_name)),
                    None => Response::status(Status::InternalServerError),
                }
            }),
            &[JsonBody::<User>::new().boxed()],
        )
    }

    #[tokio::test]
    async fn decoded_body_reaches_handler() {
        let req = Request::post("/users").with_body(r#"{"id":7,"first_name":"ann"}"#);
        let res = chain().call(req).await;
        assert_eq!(res.status_code(), 200);
        assert_eq!(res.body(), b"7:ann");
    }

    #[tokio::test]
    async fn invalid_body_is_406() {
        for body in ["", "{", r#"{"id":"seven","first_name":"ann"}"#] {
            let res = chain().call(Request::post("/users").with_body(body)).await;
            assert_eq!(res.status_code(), 406, "body {body:?}");
        }
    }
}
