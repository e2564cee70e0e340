//! Request-scoped resolution context.

use once_cell::unsync::OnceCell;

use crate::http::{Request, Response};
use crate::router::{RouteOutcome, Router};

/// One request/response pair on its way through the pipeline.
///
/// Holds the current request and the response built so far. Middleware and
/// handlers replace them with derived values; the dispatcher always reads the
/// latest ones back from here. The route outcome is computed on first use
/// and kept for the rest of the exchange.
pub struct Exchange<'r> {
    router: &'r Router,
    request: Request,
    response: Response,
    route: OnceCell<RouteOutcome>,
}

impl<'r> Exchange<'r> {
    #[must_use]
    pub fn new(router: &'r Router, request: Request) -> Self {
        Self {
            router,
            request,
            response: Response::new(),
            route: OnceCell::new(),
        }
    }

    /// Route outcome for the request as it was when first asked.
    pub fn current_route(&self) -> &RouteOutcome {
        self.route
            .get_or_init(|| self.router.resolve(self.request.method(), self.request.path()))
    }

    #[must_use]
    pub fn request(&self) -> &Request {
        &self.request
    }

    pub fn set_request(&mut self, request: Request) {
        self.request = request;
    }

    #[must_use]
    pub fn response(&self) -> &Response {
        &self.response
    }

    pub fn set_response(&mut self, response: Response) {
        self.response = response;
    }

    #[must_use]
    pub fn into_parts(self) -> (Request, Response) {
        (self.request, self.response)
    }
}
