#![allow(dead_code)]

use http::Method;
use trellis::dispatcher::{handler, Dispatcher, Registry};
use trellis::http::Request;
use trellis::router::Router;

/// Routes every request through a per-test fmt subscriber so failures show
/// the pipeline's log lines.
pub struct TestTracing {
    _guard: tracing::subscriber::DefaultGuard,
}

impl TestTracing {
    pub fn init() -> Self {
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .finish();
        Self {
            _guard: tracing::subscriber::set_default(subscriber),
        }
    }
}

pub fn request(method: Method, target: &str) -> Request {
    Request::new(method, target.parse().unwrap())
}

/// `GET /user/:id` named `user.show`, plus `POST /users`.
pub fn user_router() -> Router {
    let mut router = Router::new();
    router
        .register(
            Method::GET,
            "/user/:id",
            handler(|req, _res| {
                format!(
                    "user {}",
                    req.attribute("id").and_then(|v| v.as_str()).unwrap_or("?")
                )
            }),
            Vec::new(),
            Some("user.show"),
        )
        .unwrap();
    router
        .post("/users", handler(|_req, _res| "created"))
        .unwrap();
    router
}

pub fn dispatcher(router: Router) -> Dispatcher {
    Dispatcher::new(router, Registry::new())
}
