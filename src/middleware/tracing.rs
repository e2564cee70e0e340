use std::cell::RefCell;
use std::time::Duration;

use tracing::{field, info, info_span, span::EnteredSpan};

use super::{Middleware, Next};
use crate::http::{HttpMessage, Request, Response};
use crate::ids::{RequestId, REQUEST_ID_HEADER};
use crate::router::Route;

thread_local! {
    // before and after run on the dispatching thread
    static SPAN_GUARD: RefCell<Option<EnteredSpan>> = const { RefCell::new(None) };
}

/// Opens a `request` span per dispatch and tags the exchange with a request id.
///
/// A valid incoming `x-request-id` is reused; otherwise a ULID is minted and
/// set on the request. The id is echoed on the response.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingMiddleware;

impl Middleware for TracingMiddleware {
    fn before(&self, req: &Request, route: Option<&Route>) -> Next {
        let incoming = req.header(REQUEST_ID_HEADER).first().map(String::as_str);
        let request_id = incoming
            .and_then(RequestId::parse_header)
            .unwrap_or_default();

        let span = info_span!(
            "request",
            request_id = %request_id,
            method = %req.method(),
            path = %req.path(),
            route = route.map_or("-", Route::name),
            status = field::Empty,
            latency_ms = field::Empty,
        );
        SPAN_GUARD.with(|g| *g.borrow_mut() = Some(span.entered()));

        if incoming == Some(request_id.to_string().as_str()) {
            Next::Proceed
        } else {
            Next::Forward(req.with_header(REQUEST_ID_HEADER, request_id.to_string()))
        }
    }

    fn after(&self, req: &Request, res: Response, latency: Duration) -> Response {
        let latency_ms = u64::try_from(latency.as_millis()).unwrap_or(u64::MAX);
        if let Some(span) = SPAN_GUARD.with(|g| g.borrow_mut().take()) {
            span.record("status", res.status_code());
            span.record("latency_ms", latency_ms);
            info!(status = res.status_code(), latency_ms, "Request completed");
        }
        match req.header(REQUEST_ID_HEADER).first() {
            Some(id) => res.with_header("X-Request-Id", id.clone()),
            None => res,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::Method;

    fn request() -> Request {
        Request::new(Method::GET, "/ping".parse().unwrap())
    }

    #[test]
    fn mints_request_id_when_missing() {
        let req = request();
        let forwarded = match TracingMiddleware.before(&req, None) {
            Next::Forward(r) => r,
            other => panic!("expected forwarded request, got {other:?}"),
        };
        let id = forwarded.header_line(REQUEST_ID_HEADER);
        assert!(id.parse::<RequestId>().is_ok());

        let res = TracingMiddleware.after(&forwarded, Response::new(), Duration::from_millis(3));
        assert_eq!(res.header_line("x-request-id"), id);
    }

    #[test]
    fn keeps_valid_incoming_id() {
        let id = RequestId::new().to_string();
        let req = request().with_header("X-Request-Id", id.clone());
        assert!(matches!(TracingMiddleware.before(&req, None), Next::Proceed));
        let res = TracingMiddleware.after(&req, Response::new(), Duration::ZERO);
        assert_eq!(res.header_line("x-request-id"), id);
    }
}
