use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use http::{Method, StatusCode};
use trellis::dispatcher::handler;
use trellis::http::{HttpMessage, Request, Response};
use trellis::ids::RequestId;
use trellis::middleware::{Middleware, Next, TracingMiddleware};
use trellis::router::{Route, Router};

mod common;
use common::{dispatcher, request, user_router, TestTracing};

type Log = Arc<Mutex<Vec<String>>>;

/// Records every hook call; optionally answers early from `before`.
struct Recorder {
    label: &'static str,
    log: Log,
    answer: Option<StatusCode>,
}

impl Recorder {
    fn new(label: &'static str, log: &Log) -> Arc<dyn Middleware> {
        Arc::new(Self {
            label,
            log: Arc::clone(log),
            answer: None,
        })
    }

    fn answering(label: &'static str, log: &Log, status: StatusCode) -> Arc<dyn Middleware> {
        Arc::new(Self {
            label,
            log: Arc::clone(log),
            answer: Some(status),
        })
    }
}

impl Middleware for Recorder {
    fn before(&self, _req: &Request, route: Option<&Route>) -> Next {
        self.log.lock().unwrap().push(format!(
            "before:{}:{}",
            self.label,
            route.map_or("-", Route::name)
        ));
        match self.answer {
            Some(status) => Next::Respond(Response::new().with_status(status)),
            None => Next::Proceed,
        }
    }

    fn after(&self, _req: &Request, res: Response, _latency: Duration) -> Response {
        self.log
            .lock()
            .unwrap()
            .push(format!("after:{}", self.label));
        res
    }
}

/// Adds a tenant attribute for the handler to read.
struct Tenant;

impl Middleware for Tenant {
    fn before(&self, req: &Request, _route: Option<&Route>) -> Next {
        Next::Forward(req.with_attribute("tenant", "acme"))
    }
}

fn entries(log: &Log) -> Vec<String> {
    log.lock().unwrap().clone()
}

fn logging_handler(log: &Log) -> trellis::dispatcher::HandlerRef {
    let log = Arc::clone(log);
    handler(move |_req, _res| {
        log.lock().unwrap().push("handler".to_string());
        "ok"
    })
}

#[test]
fn test_global_then_route_middleware_order() {
    let _tracing = TestTracing::init();
    let log: Log = Arc::default();

    let mut router = Router::new();
    router
        .register(
            Method::GET,
            "/orders",
            logging_handler(&log),
            vec![Recorder::new("route", &log)],
            Some("orders.index"),
        )
        .unwrap();
    let mut d = dispatcher(router);
    d.add_middleware(Recorder::new("outer", &log));
    d.add_middleware(Recorder::new("inner", &log));

    let res = d.handle(request(Method::GET, "/orders"));
    assert_eq!(res.status_code(), 200);
    assert_eq!(
        entries(&log),
        [
            "before:outer:orders.index",
            "before:inner:orders.index",
            "before:route:orders.index",
            "handler",
            "after:route",
            "after:inner",
            "after:outer",
        ]
    );
}

#[test]
fn test_early_response_skips_handler_and_later_hooks() {
    let log: Log = Arc::default();

    let mut router = Router::new();
    router
        .register(
            Method::GET,
            "/admin",
            logging_handler(&log),
            vec![Recorder::new("route", &log)],
            None,
        )
        .unwrap();
    let mut d = dispatcher(router);
    d.add_middleware(Recorder::new("outer", &log));
    d.add_middleware(Recorder::answering("gate", &log, StatusCode::UNAUTHORIZED));

    let res = d.handle(request(Method::GET, "/admin"));
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        entries(&log),
        [
            "before:outer:/admin",
            "before:gate:/admin",
            "after:gate",
            "after:outer",
        ]
    );
}

#[test]
fn test_forwarded_request_reaches_handler() {
    let tenant: Arc<dyn Middleware> = Arc::new(Tenant);
    let mut router = Router::new();
    router
        .register(
            Method::GET,
            "/whoami",
            handler(|req, _res| {
                req.attribute("tenant")
                    .and_then(|v| v.as_str())
                    .unwrap_or("none")
                    .to_string()
            }),
            vec![tenant],
            None,
        )
        .unwrap();
    let res = dispatcher(router).handle(request(Method::GET, "/whoami"));
    assert_eq!(res.content().unwrap(), Bytes::from_static(b"acme"));
}

#[test]
fn test_global_middleware_wraps_not_found() {
    let log: Log = Arc::default();
    let mut d = dispatcher(user_router());
    d.add_middleware(Recorder::new("outer", &log));

    let res = d.handle(request(Method::GET, "/nowhere"));
    assert_eq!(res.status_code(), 404);
    assert_eq!(entries(&log), ["before:outer:-", "after:outer"]);
}

#[test]
fn test_no_content_answers_skip_middleware() {
    let log: Log = Arc::default();
    let mut d = dispatcher(user_router());
    d.add_middleware(Recorder::new("outer", &log));

    let res = d.handle(request(Method::OPTIONS, "/user/1"));
    assert_eq!(res.status_code(), 204);
    assert!(entries(&log).is_empty());
}

#[test]
fn test_tracing_middleware_tags_response() {
    let _tracing = TestTracing::init();
    let mut d = dispatcher(user_router());
    d.add_middleware(Arc::new(TracingMiddleware));

    let res = d.handle(request(Method::GET, "/user/5"));
    let minted = res.header_line("x-request-id");
    assert!(minted.parse::<RequestId>().is_ok());

    let incoming = RequestId::new().to_string();
    let res = d.handle(request(Method::GET, "/user/5").with_header("X-Request-Id", incoming.clone()));
    assert_eq!(res.header_line("x-request-id"), incoming);
    assert_eq!(res.content().unwrap(), Bytes::from_static(b"user 5"));
}
