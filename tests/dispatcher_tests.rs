use std::sync::Arc;

use bytes::Bytes;
use http::{Method, StatusCode};
use serde_json::{json, Map, Value};
use thiserror::Error;
use trellis::dispatcher::{
    controller, handler, Dispatcher, Outcome, Registry, RenderableError, StatusError,
};
use trellis::http::{Body, HttpMessage, Response};
use trellis::router::Router;
use trellis::runtime_config::RuntimeConfig;
use trellis::server::{BufferedTransport, Environment, WireTransport};

mod common;
use common::{dispatcher, request, user_router, TestTracing};

#[derive(Debug, Error)]
#[error("order is not valid")]
struct InvalidOrder;

impl StatusError for InvalidOrder {
    fn status_code(&self) -> u16 {
        422
    }
}

impl RenderableError for InvalidOrder {
    fn render(&self) -> String {
        "<p>Order is not valid</p>".to_string()
    }
}

#[test]
fn test_options_on_existing_path_is_204_with_allow() {
    let _tracing = TestTracing::init();
    let res = dispatcher(user_router()).handle(request(Method::OPTIONS, "/user/42"));
    assert_eq!(res.status(), StatusCode::NO_CONTENT);
    assert!(res.header_line("allow").contains("GET"));
    assert!(!res.has_content());
}

#[test]
fn test_head_on_existing_path_is_204() {
    let res = dispatcher(user_router()).handle(request(Method::HEAD, "/user/42"));
    assert_eq!(res.status_code(), 204);
    assert_eq!(res.header_line("Allow"), "GET, HEAD, OPTIONS");
}

#[test]
fn test_wrong_method_is_405_with_same_allow() {
    let d = dispatcher(user_router());
    let options = d.handle(request(Method::OPTIONS, "/user/42"));
    let post = d.handle(request(Method::POST, "/user/42"));
    assert_eq!(post.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(post.header_line("allow"), options.header_line("allow"));
}

#[test]
fn test_unknown_path_is_404() {
    let res = dispatcher(user_router()).handle(request(Method::GET, "/does-not-exist"));
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[test]
fn test_attributes_are_injected_before_handler() {
    let res = dispatcher(user_router()).handle(request(Method::GET, "/user/42/"));
    assert_eq!(res.status_code(), 200);
    assert_eq!(res.content().unwrap(), Bytes::from_static(b"user 42"));
}

#[test]
fn test_mapping_result_becomes_json() {
    let mut router = Router::new();
    router
        .get(
            "/stats",
            handler(|_req, _res| {
                let mut map = Map::new();
                map.insert("visits".to_string(), json!(3));
                map
            }),
        )
        .unwrap();
    let res = dispatcher(router).handle(request(Method::GET, "/stats"));
    assert_eq!(res.header_line("content-type"), "application/json");
    let body: Value = serde_json::from_slice(&res.content().unwrap()).unwrap();
    assert_eq!(body, json!({"visits": 3}));
}

#[test]
fn test_renderable_error_sets_status_and_body() {
    let mut router = Router::new();
    router
        .post(
            "/orders",
            handler(|_req, _res| Outcome::render_error(InvalidOrder)),
        )
        .unwrap();
    let res = dispatcher(router).handle(request(Method::POST, "/orders"));
    assert_eq!(res.status_code(), 422);
    assert_eq!(
        res.content().unwrap(),
        Bytes::from_static(b"<p>Order is not valid</p>")
    );
}

#[test]
fn test_populated_response_passes_through() {
    let mut router = Router::new();
    router
        .get(
            "/teapot",
            handler(|_req, _res| {
                Response::new()
                    .with_status(StatusCode::IM_A_TEAPOT)
                    .with_header("X-Brew", "earl-grey")
                    .with_content("short and stout")
            }),
        )
        .unwrap();
    let res = dispatcher(router).handle(request(Method::GET, "/teapot"));
    assert_eq!(res.status_code(), 418);
    assert_eq!(res.header_line("x-brew"), "earl-grey");
    assert_eq!(res.content().unwrap(), Bytes::from_static(b"short and stout"));
}

#[test]
fn test_handler_error_result_sets_status() {
    let mut router = Router::new();
    router
        .get(
            "/profile",
            handler(|req, _res| req.require("token").map(|_| "ok")),
        )
        .unwrap();
    let res = dispatcher(router).handle(request(Method::GET, "/profile"));
    assert_eq!(res.status_code(), 400);
}

#[test]
fn test_unit_result_is_internal_error() {
    let mut router = Router::new();
    router.get("/void", handler(|_req, _res| ())).unwrap();
    let res = dispatcher(router).handle(request(Method::GET, "/void"));
    assert_eq!(res.status_code(), 500);
}

#[test]
fn test_panicking_handler_becomes_500() {
    let mut router = Router::new();
    router
        .get(
            "/boom",
            handler(|_req, _res| -> &'static str { panic!("kaboom") }),
        )
        .unwrap();
    let res = dispatcher(router).handle(request(Method::GET, "/boom"));
    assert_eq!(res.status_code(), 500);
}

#[test]
fn test_controller_reference_resolves_through_registry() {
    let mut router = Router::new();
    router
        .get("/users/:id", controller("UserController", "show"))
        .unwrap();
    router
        .get("/users/:id/posts", controller("UserController", "posts"))
        .unwrap();

    let mut registry = Registry::new();
    registry.register("UserController", "show", |req, _res| {
        json!({ "id": req.attribute("id") })
    });

    let d = Dispatcher::new(router, registry);
    let res = d.handle(request(Method::GET, "/users/9"));
    assert_eq!(res.content().unwrap(), Bytes::from_static(br#"{"id":"9"}"#));

    // registered route whose action is unknown to the registry
    let res = d.handle(request(Method::GET, "/users/9/posts"));
    assert_eq!(res.status_code(), 500);
}

#[test]
fn test_custom_not_found_and_not_allowed_handlers() {
    let mut router = user_router();
    router.on_not_found(handler(|req, _res| {
        Response::new()
            .with_status(StatusCode::NOT_FOUND)
            .with_content(format!("nothing at {}", req.path()))
    }));
    router.on_method_not_allowed(handler(|_req, _res| {
        Response::new()
            .with_status(StatusCode::METHOD_NOT_ALLOWED)
            .with_content("try another verb")
    }));
    let d = dispatcher(router);

    let res = d.handle(request(Method::GET, "/missing"));
    assert_eq!(res.status_code(), 404);
    assert_eq!(res.content().unwrap(), Bytes::from_static(b"nothing at /missing"));

    let res = d.handle(request(Method::DELETE, "/user/1"));
    assert_eq!(res.status_code(), 405);
    assert_eq!(res.header_line("allow"), "GET, HEAD, OPTIONS");
    assert_eq!(res.content().unwrap(), Bytes::from_static(b"try another verb"));
}

#[test]
fn test_explicit_options_route_is_dispatched() {
    let mut router = user_router();
    router
        .register(
            Method::OPTIONS,
            "/user/:id",
            handler(|_req, _res| {
                Response::new().with_header("Access-Control-Allow-Origin", "*")
            }),
            Vec::new(),
            None,
        )
        .unwrap();
    let res = dispatcher(router).handle(request(Method::OPTIONS, "/user/1"));
    assert_eq!(res.status_code(), 200);
    assert_eq!(res.header_line("access-control-allow-origin"), "*");
}

#[test]
fn test_dispatch_writes_wire_response_and_mirrors_cookies() {
    let mut env = Environment {
        method: "GET".to_string(),
        path: "/user/7".to_string(),
        ..Environment::default()
    };
    env.cookies.insert("sid".to_string(), "a b".to_string());

    let mut transport = WireTransport::new(Vec::new());
    dispatcher(user_router())
        .dispatch(&env, &mut transport)
        .unwrap();
    let text = String::from_utf8(transport.into_inner()).unwrap();
    assert!(text.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(text.contains("Content-Type: text/plain; charset=utf-8\r\n"));
    assert!(text.contains("Set-Cookie: sid=a%20b\r\n"));
    assert!(text.ends_with("\r\n\r\nuser 7"));
}

#[test]
fn test_serve_http_request() {
    let req = http::Request::builder()
        .method("POST")
        .uri("/echo")
        .header("Content-Type", "application/json")
        .body(Bytes::from_static(br#"{"msg":"hi"}"#))
        .unwrap();
    let mut router = Router::new();
    router
        .post("/echo", handler(|req, _res| req.require("msg")))
        .unwrap();

    let res = dispatcher(router).serve(req).unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.body(), &Bytes::from_static(br#""hi""#));
}

#[test]
fn test_body_limit_from_config() {
    let mut router = Router::new();
    router
        .post("/upload", handler(|req, _res| req.body().bytes().map(|b| b.len().to_string())))
        .unwrap();
    let d = Dispatcher::new(router, Registry::new()).with_config(RuntimeConfig {
        max_body_bytes: 4,
        ..RuntimeConfig::default()
    });

    let env = Environment {
        method: "POST".to_string(),
        path: "/upload".to_string(),
        body: Bytes::from_static(b"too large"),
        ..Environment::default()
    };
    let mut transport = BufferedTransport::new();
    d.dispatch(&env, &mut transport).unwrap();
    assert_eq!(transport.status, 413);
}

#[test]
fn test_dispatcher_is_shareable_across_threads() {
    let d = Arc::new(dispatcher(user_router()));
    let handles: Vec<_> = (0..4)
        .map(|i| {
            let d = Arc::clone(&d);
            std::thread::spawn(move || {
                let res = d.handle(request(Method::GET, &format!("/user/{i}")));
                res.content().unwrap()
            })
        })
        .collect();
    for (i, h) in handles.into_iter().enumerate() {
        assert_eq!(h.join().unwrap(), Bytes::from(format!("user {i}")));
    }
}

struct BrokenDisk;

impl std::io::Read for BrokenDisk {
    fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
        Err(std::io::Error::new(std::io::ErrorKind::Other, "disk gone"))
    }
}

#[test]
fn test_unreadable_response_body_still_answers_500() {
    let _tracing = TestTracing::init();
    let mut router = Router::new();
    router
        .get(
            "/report",
            handler(|_req, _res| Response::new().with_body(Body::from_reader(BrokenDisk))),
        )
        .unwrap();
    let env = Environment {
        method: "GET".to_string(),
        path: "/report".to_string(),
        ..Environment::default()
    };

    let d = dispatcher(router);
    let mut transport = WireTransport::new(Vec::new());
    d.dispatch(&env, &mut transport).unwrap();
    let text = String::from_utf8(transport.into_inner()).unwrap();
    assert!(text.starts_with("HTTP/1.1 500 Internal Server Error\r\n"));

    let served = d
        .serve(http::Request::get("/report").body(Bytes::new()).unwrap())
        .unwrap();
    assert_eq!(served.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(served.body().is_empty());
}

#[test]
fn test_options_on_the_wire_has_no_content_length() {
    let env = Environment {
        method: "OPTIONS".to_string(),
        path: "/user/42".to_string(),
        ..Environment::default()
    };
    let mut transport = WireTransport::new(Vec::new());
    dispatcher(user_router())
        .dispatch(&env, &mut transport)
        .unwrap();
    let text = String::from_utf8(transport.into_inner()).unwrap();
    assert_eq!(
        text,
        "HTTP/1.1 204 No Content\r\nAllow: GET, HEAD, OPTIONS\r\n\r\n"
    );
}

#[test]
fn test_malformed_method_is_not_treated_as_get() {
    let env = Environment {
        method: "BAD METHOD".to_string(),
        path: "/user/42".to_string(),
        ..Environment::default()
    };
    let mut transport = BufferedTransport::new();
    dispatcher(user_router())
        .dispatch(&env, &mut transport)
        .unwrap();
    assert_eq!(transport.status, 405);
    assert!(!transport.body.starts_with(b"user"));
}
