use std::time::Duration;

use crate::http::{Request, Response};
use crate::router::Route;

/// What a `before` hook decided.
#[derive(Debug)]
pub enum Next {
    /// Continue with the request unchanged.
    Proceed,
    /// Continue with a derived request.
    Forward(Request),
    /// Stop here; later hooks and the handler are skipped.
    Respond(Response),
}

pub trait Middleware: Send + Sync {
    /// `route` is `None` when the request matched no route.
    fn before(&self, _req: &Request, _route: Option<&Route>) -> Next {
        Next::Proceed
    }

    fn after(&self, _req: &Request, res: Response, _latency: Duration) -> Response {
        res
    }
}
