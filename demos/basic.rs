//! Minimal strata example: global logging, an auth hook, JSON bodies,
//! structured errors and an HTML template.
//!
//! Run with:
//!   RUST_LOG=info cargo run --example basic
//!
//! Try:
//!   curl http://localhost:8080/test
//!   curl http://localhost:8080/jsontest
//!   curl http://localhost:8080/jsonerror
//!   curl -H 'Accept: application/vnd.api+json' \
//!        -d '{"id":1234567,"first_name":"ann","last_name":"lee"}' \
//!        http://localhost:8080/postjson
//!   curl http://localhost:8080/gethtml      # reads templates/index.html

use serde::{Deserialize, Serialize};
use strata::middleware::{self, Accept, BODY_KEY, JsonBody, Recover, Trace};
use strata::render::{self, ErrorKind};
use strata::{Chain, Middleware, Request, Response, Router, Server, Status};

#[derive(Clone, Debug, Deserialize, Serialize)]
struct User {
    id: u64,
    first_name: String,
    last_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    middle_name: Option<String>,
}

const TEAPOT: ErrorKind = ErrorKind {
    kind: "teapot_error",
    title: "I'm a teapot",
    detail: "This endpoint only ever fails.",
};

#[tokio::main]
async fn main() -> Result<(), strata::Error> {
    tracing_subscriber::fmt::init();

    // Stand-in for a real identity check: attaches a user for later layers.
    let auth = middleware::from_fn(|mut req: Request, next: Chain| async move {
        req.context_mut().insert("user", User {
            id: 1234567,
            first_name: "ann".into(),
            last_name: "lee".into(),
            middle_name: None,
        });
        next.call(req).await
    });

    // Trace first so it also times requests the error boundary recovers.
    let app = Router::bare()
        .use_global(Trace)
        .use_global(Recover)
        .get("/test", test)
        .get_with("/jsontest", json_test, [auth.clone().boxed()])
        .get("/jsonerror", json_error)
        .post_with("/postjson", post_json, [
            Accept::json_api().boxed(),
            JsonBody::<User>::new().boxed(),
        ])
        .get_with("/gethtml", get_html, [auth.boxed()]);

    Server::bind("0.0.0.0:8080")?.serve(app).await
}

async fn test(_req: Request) -> &'static str {
    "Test"
}

async fn json_test(req: Request) -> Response {
    match req.context().get::<User>("user").map(serde_json::to_vec) {
        Some(Ok(body)) => Response::json(body),
        _ => render::emit_error(&render::INTERNAL_SERVER_ERROR, Status::InternalServerError),
    }
}

async fn json_error(_req: Request) -> Response {
    render::emit_error(&TEAPOT, Status::BadRequest)
}

async fn post_json(req: Request) -> Response {
    match req.context().get::<User>(BODY_KEY) {
        Some(user) => Response::text(format!("{} {} {}", user.id, user.first_name, user.last_name)),
        None => Response::status(Status::BadRequest),
    }
}

async fn get_html(req: Request) -> Response {
    match req.context().get::<User>("user") {
        Some(user) => render::render("index.html", user).await,
        None => Response::status(Status::Unauthorized),
    }
}
