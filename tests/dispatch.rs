//! End-to-end dispatch behaviour through the public API.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::Value;
use strata::middleware::{self, Accept, BODY_KEY, JsonBody, Recover, Trace};
use strata::{Chain, Method, Middleware, Request, Response, RouteNotFound, Router, Status};

// ============================================================================
// Helpers
// ============================================================================

type Log = Arc<Mutex<Vec<String>>>;

async fn ping(_req: Request) -> &'static str {
    "pong"
}

async fn boom(_req: Request) -> Response {
    panic!("handler exploded")
}

fn recorder(log: &Log, name: &'static str) -> impl Middleware + Clone + use<> {
    let log = Arc::clone(log);
    middleware::from_fn(move |req: Request, next: Chain| {
        let log = Arc::clone(&log);
        async move {
            log.lock().unwrap().push(format!("{name} in"));
            let res = next.call(req).await;
            log.lock().unwrap().push(format!("{name} out"));
            res
        }
    })
}

/// Stores a clone of `marker` in the context so tests can watch it being dropped.
fn stash(marker: &Arc<()>) -> impl Middleware + use<> {
    let marker = Arc::clone(marker);
    middleware::from_fn(move |mut req: Request, next: Chain| {
        req.context_mut().insert("marker", Arc::clone(&marker));
        next.call(req)
    })
}

fn error_type(res: &Response) -> String {
    let body: Value = serde_json::from_slice(res.body()).unwrap();
    body["errors"][0]["type"].as_str().unwrap().to_owned()
}

// ============================================================================
// Scenarios
// ============================================================================

#[tokio::test]
async fn ping_returns_pong() {
    let app = Router::new().get("/ping", ping);

    let res = app.handle(Request::get("/ping")).await;

    assert_eq!(res.status_code(), 200);
    assert_eq!(res.body(), b"pong");
}

#[tokio::test]
async fn middlewares_pass_values_down_the_chain() {
    let m1 = middleware::from_fn(|mut req: Request, next: Chain| async move {
        req.context_mut().insert("t0", 10_u32);
        next.call(req).await
    });
    let m2 = middleware::from_fn(|mut req: Request, next: Chain| async move {
        let t0 = req.context().get::<u32>("t0").copied().unwrap_or(0);
        req.context_mut().insert("t1", t0 + 1);
        next.call(req).await
    });
    let handler = |req: Request| async move {
        match req.context().get::<u32>("t1") {
            Some(t1) => Response::text(t1.to_string()),
            None => Response::status(Status::InternalServerError),
        }
    };

    let app = Router::new().use_global(m1).use_global(m2).get("/chain", handler);
    let res = app.handle(Request::get("/chain")).await;

    assert_eq!(res.body(), b"11");
}

#[tokio::test]
async fn fault_is_recovered_and_next_request_succeeds() {
    let app = Router::new().get("/boom", boom).get("/ping", ping);

    let res = app.handle(Request::get("/boom")).await;
    assert_eq!(res.status_code(), 500);
    assert_eq!(res.header("content-type"), Some("application/vnd.api+json"));
    assert_eq!(error_type(&res), "internal_server_error");
    assert!(!String::from_utf8_lossy(res.body()).contains("exploded"));

    let res = app.handle(Request::get("/ping")).await;
    assert_eq!(res.status_code(), 200);
    assert_eq!(res.body(), b"pong");
}

// ============================================================================
// Ordering
// ============================================================================

#[tokio::test]
async fn global_then_route_middleware_each_run_once_in_order() {
    let log = Log::default();
    let handler = {
        let log = Arc::clone(&log);
        move |_req: Request| {
            let log = Arc::clone(&log);
            async move {
                log.lock().unwrap().push("handler".to_owned());
                "ok"
            }
        }
    };

    let app = Router::bare()
        .use_global(recorder(&log, "g1"))
        .use_global(recorder(&log, "g2"))
        .use_global(recorder(&log, "g3"))
        .get_with("/order", handler, [
            recorder(&log, "r1").boxed(),
            recorder(&log, "r2").boxed(),
            recorder(&log, "r3").boxed(),
        ]);

    app.handle(Request::get("/order")).await;

    assert_eq!(
        *log.lock().unwrap(),
        [
            "g1 in", "g2 in", "g3 in", "r1 in", "r2 in", "r3 in",
            "handler",
            "r3 out", "r2 out", "r1 out", "g3 out", "g2 out", "g1 out",
        ]
    );
}

#[tokio::test]
async fn logging_outside_recovery_sees_the_recovered_response() {
    let log = Log::default();
    let status_seen = Arc::new(AtomicUsize::new(0));
    let observe = {
        let status_seen = Arc::clone(&status_seen);
        middleware::from_fn(move |req: Request, next: Chain| {
            let status_seen = Arc::clone(&status_seen);
            async move {
                let res = next.call(req).await;
                status_seen.store(res.status_code().into(), Ordering::SeqCst);
                res
            }
        })
    };

    let app = Router::bare()
        .use_global(observe)
        .use_global(Trace)
        .use_global(Recover)
        .get_with("/boom", boom, [recorder(&log, "inner").boxed()]);

    let res = app.handle(Request::get("/boom")).await;

    assert_eq!(res.status_code(), 500);
    assert_eq!(status_seen.load(Ordering::SeqCst), 500);
    // The inner layer saw the request go in but never came back out.
    assert_eq!(*log.lock().unwrap(), ["inner in"]);
}

// ============================================================================
// Not found
// ============================================================================

#[tokio::test]
async fn unregistered_route_runs_no_middleware_or_handler() {
    let log = Log::default();
    let app = Router::new()
        .use_global(recorder(&log, "global"))
        .get_with("/ping", ping, [recorder(&log, "route").boxed()]);

    assert_eq!(
        app.dispatch(Method::Post, "/ping").unwrap_err(),
        RouteNotFound { method: Method::Post, path: "/ping".to_owned() }
    );

    let res = app.handle(Request::delete("/ping")).await;
    assert_eq!(res.status_code(), 404);
    assert_eq!(error_type(&res), "not_found_error");
    assert!(log.lock().unwrap().is_empty());
}

// ============================================================================
// Context lifecycle
// ============================================================================

#[tokio::test]
async fn context_is_released_on_every_path() {
    let marker = Arc::new(());
    let app = Router::new()
        .use_global(stash(&marker))
        .get("/ok", ping)
        .get("/boom", boom)
        .post_with("/reject", ping, [Accept::json_api().boxed()]);
    // Ours plus the one held by the middleware itself.
    let baseline = Arc::strong_count(&marker);

    for req in [
        Request::get("/ok"),
        Request::get("/boom"),
        Request::post("/reject"),
        Request::get("/missing"),
    ] {
        app.handle(req).await;
        assert_eq!(Arc::strong_count(&marker), baseline);
    }
}

#[tokio::test]
async fn context_is_released_when_request_is_abandoned() {
    let marker = Arc::new(());
    let slow = |_req: Request| async {
        tokio::time::sleep(Duration::from_secs(60)).await;
        "late"
    };
    let app = Router::new().use_global(stash(&marker)).get("/slow", slow);
    let baseline = Arc::strong_count(&marker);

    let outcome = tokio::time::timeout(
        Duration::from_millis(20),
        app.handle(Request::get("/slow")),
    )
    .await;

    assert!(outcome.is_err());
    assert_eq!(Arc::strong_count(&marker), baseline);
}

#[tokio::test]
async fn concurrent_requests_never_see_each_others_values() {
    let write = middleware::from_fn(|mut req: Request, next: Chain| async move {
        let value = req.header("x-value").unwrap_or_default().to_owned();
        req.context_mut().insert("value", value);
        next.call(req).await
    });
    let read = |req: Request| async move {
        // Interleave with the other in-flight requests before reading back.
        for _ in 0..5 {
            tokio::task::yield_now().await;
        }
        req.context().get::<String>("value").cloned().unwrap_or_default()
    };
    let app = Arc::new(Router::new().use_global(write).get("/value", read));

    let tasks: Vec<_> = (0..64)
        .map(|i| {
            let app = Arc::clone(&app);
            tokio::spawn(async move {
                let expected = format!("request-{i}");
                let req = Request::get("/value").with_header("x-value", &expected);
                let res = app.handle(req).await;
                (expected, res)
            })
        })
        .collect();

    for task in tasks {
        let (expected, res) = task.await.unwrap();
        assert_eq!(res.body(), expected.as_bytes());
    }
}

// ============================================================================
// Built-in middleware on routes
// ============================================================================

#[derive(serde::Deserialize)]
struct NewUser {
    first_name: String,
}

async fn create_user(req: Request) -> Response {
    match req.context().get::<NewUser>(BODY_KEY) {
        Some(user) => Response::builder()
            .status(Status::Created)
            .text(user.first_name.clone()),
        None => Response::status(Status::InternalServerError),
    }
}

#[tokio::test]
async fn accept_and_json_body_guard_a_route() {
    let app = Router::new().post_with("/users", create_user, [
        Accept::json_api().boxed(),
        JsonBody::<NewUser>::new().boxed(),
    ]);

    let ok = Request::post("/users")
        .with_header("Accept", "application/vnd.api+json")
        .with_body(r#"{"first_name":"ann"}"#);
    let res = app.handle(ok).await;
    assert_eq!(res.status_code(), 201);
    assert_eq!(res.body(), b"ann");

    let no_accept = Request::post("/users").with_body(r#"{"first_name":"ann"}"#);
    let res = app.handle(no_accept).await;
    assert_eq!(res.status_code(), 406);
    assert_eq!(error_type(&res), "not_acceptable_error");

    let bad_json = Request::post("/users")
        .with_header("Accept", "application/vnd.api+json")
        .with_body("{not json");
    assert_eq!(app.handle(bad_json).await.status_code(), 406);
}
