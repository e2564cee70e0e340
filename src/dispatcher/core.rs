use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use http::StatusCode;
use tracing::{debug, error, info};

use super::exchange::Exchange;
use super::outcome::Outcome;
use super::reduce::reduce;
use super::resolver::{HandlerRef, Resolver};
use crate::error::HttpError;
use crate::http::{HttpMessage, Request, Response};
use crate::middleware::{Middleware, Next};
use crate::router::{allow_header, Route, RouteOutcome, Router};
use crate::runtime_config::RuntimeConfig;
use crate::server::{emit, BufferedTransport, Environment, Transport};

/// Drives one request from routing to the final response.
///
/// The router and resolver are shared read-only; all per-request state lives
/// in an [`Exchange`], so one dispatcher can serve any number of threads.
#[derive(Clone)]
pub struct Dispatcher {
    router: Arc<Router>,
    resolver: Arc<dyn Resolver>,
    middlewares: Vec<Arc<dyn Middleware>>,
    config: RuntimeConfig,
}

impl Dispatcher {
    #[must_use]
    pub fn new(router: Router, resolver: impl Resolver + 'static) -> Self {
        let config = RuntimeConfig::default();
        Self {
            router: Arc::new(router.with_slow_match_threshold(config.slow_match_threshold)),
            resolver: Arc::new(resolver),
            middlewares: Vec::new(),
            config,
        }
    }

    /// Apply runtime settings: body limit, panic handling and the router's
    /// slow-match threshold.
    #[must_use]
    pub fn with_config(mut self, config: RuntimeConfig) -> Self {
        let router = Arc::make_mut(&mut self.router);
        *router = router
            .clone()
            .with_slow_match_threshold(config.slow_match_threshold);
        self.config = config;
        self
    }

    /// Add a global middleware; it runs before every route's own middleware.
    pub fn add_middleware(&mut self, middleware: Arc<dyn Middleware>) {
        self.middlewares.push(middleware);
    }

    #[must_use]
    pub fn router(&self) -> &Router {
        &self.router
    }

    #[must_use]
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Route and resolve `request` into its final response.
    #[must_use]
    pub fn handle(&self, request: Request) -> Response {
        self.process(request).1
    }

    /// Build the request from `env`, handle it and write the response to `transport`.
    ///
    /// # Errors
    ///
    /// Fails only when the transport cannot be written. An unreadable response
    /// body is sent as a bare `500`.
    pub fn dispatch(&self, env: &Environment, transport: &mut dyn Transport) -> Result<(), HttpError> {
        let request = Request::from_environment(env);
        let request = request.with_body(request.body().clone().with_limit(self.config.max_body_bytes));
        let (request, response) = self.process(request);
        emit(&response, &request, transport)
    }

    /// Serve an `http::Request` and collect the emitted response.
    ///
    /// # Errors
    ///
    /// See [`Dispatcher::dispatch`].
    pub fn serve(&self, request: http::Request<Bytes>) -> Result<http::Response<Bytes>, HttpError> {
        let env = Environment::from(request);
        let mut transport = BufferedTransport::new();
        self.dispatch(&env, &mut transport)?;
        Ok(transport.into_response())
    }

    /// Returns the final request alongside the response; cookies are mirrored
    /// from it when emitting.
    fn process(&self, request: Request) -> (Request, Response) {
        let mut exchange = Exchange::new(&self.router, request);
        let outcome = exchange.current_route().clone();

        let response = match outcome {
            RouteOutcome::NoContent => {
                let allowed = self.router.allowed_methods(exchange.request().path());
                debug!(
                    method = %exchange.request().method(),
                    path = %exchange.request().path(),
                    allowed = ?allowed,
                    "Answering without content"
                );
                Response::new()
                    .with_status(StatusCode::NO_CONTENT)
                    .with_header("Allow", allow_header(&allowed))
            }
            RouteOutcome::Matched(matched) => {
                let request = exchange.request().with_attributes(matched.attributes_map());
                exchange.set_request(request);
                let chain: Vec<Arc<dyn Middleware>> = self
                    .middlewares
                    .iter()
                    .chain(matched.route.middlewares())
                    .cloned()
                    .collect();
                info!(
                    route = %matched.route.name(),
                    handler = ?matched.route.handler(),
                    middleware_count = chain.len(),
                    "Request dispatched to handler"
                );
                self.run_chain(&mut exchange, &chain, Some(matched.route.as_ref()), |ex| {
                    self.invoke(matched.route.handler(), ex)
                })
            }
            RouteOutcome::NotFound => {
                self.run_chain(&mut exchange, &self.middlewares, None, |ex| {
                    match self.router.not_found_handler() {
                        Some(handler) => self.invoke(handler, ex),
                        None => Outcome::from(HttpError::RouteNotFound {
                            path: ex.request().path().to_string(),
                        }),
                    }
                })
            }
            RouteOutcome::MethodNotAllowed { allowed } => {
                let response = self.run_chain(&mut exchange, &self.middlewares, None, |ex| {
                    match self.router.method_not_allowed_handler() {
                        Some(handler) => self.invoke(handler, ex),
                        None => Outcome::from(HttpError::MethodNotAllowed {
                            method: ex.request().method().clone(),
                            path: ex.request().path().to_string(),
                            allowed: allowed.clone(),
                        }),
                    }
                });
                response.with_header("Allow", allow_header(&allowed))
            }
        };

        let (request, _) = exchange.into_parts();
        (request, response)
    }

    /// Run `before` hooks in order, then `terminal` unless a hook answered, then
    /// reduce and run `after` hooks in reverse for every hook that was entered.
    fn run_chain(
        &self,
        exchange: &mut Exchange<'_>,
        chain: &[Arc<dyn Middleware>],
        route: Option<&Route>,
        terminal: impl FnOnce(&Exchange<'_>) -> Outcome,
    ) -> Response {
        let started = Instant::now();
        let mut entered = 0;
        let mut early: Option<Response> = None;

        for (idx, mw) in chain.iter().enumerate() {
            entered = idx + 1;
            match mw.before(exchange.request(), route) {
                Next::Proceed => {}
                Next::Forward(request) => exchange.set_request(request),
                Next::Respond(response) => {
                    debug!(
                        middleware_idx = idx,
                        status = response.status_code(),
                        "Middleware returned early response"
                    );
                    early = Some(response);
                    break;
                }
            }
        }

        let resolved = match early {
            Some(response) => Outcome::Response(response),
            None => terminal(&*exchange),
        };
        let mut response = reduce(resolved, exchange.response().clone());

        let latency = started.elapsed();
        debug!(
            middleware_count = entered,
            response_status = response.status_code(),
            latency_us = u64::try_from(latency.as_micros()).unwrap_or(u64::MAX),
            "Middleware after execution"
        );
        for mw in chain[..entered].iter().rev() {
            response = mw.after(exchange.request(), response, latency);
        }
        exchange.set_response(response.clone());
        response
    }

    /// Resolve and call a handler against the current request and response.
    fn invoke(&self, handler: &HandlerRef, exchange: &Exchange<'_>) -> Outcome {
        let callable = match self.resolver.resolve(handler) {
            Ok(callable) => callable,
            Err(err) => {
                error!(handler = ?handler, error = %err, "Handler resolution failed");
                return Outcome::from(err);
            }
        };

        let request = exchange.request();
        let response = exchange.response();
        let execution_start = Instant::now();

        let outcome = if self.config.catch_panics {
            match panic::catch_unwind(AssertUnwindSafe(|| callable(request, response))) {
                Ok(outcome) => outcome,
                Err(payload) => {
                    let message = panic_message(payload.as_ref());
                    error!(
                        handler = ?handler,
                        panic_message = %message,
                        "Handler panicked - CRITICAL"
                    );
                    Outcome::from(HttpError::HandlerPanicked { message })
                }
            }
        } else {
            callable(request, response)
        };

        debug!(
            handler = ?handler,
            result = outcome.kind(),
            execution_time_us = u64::try_from(execution_start.elapsed().as_micros()).unwrap_or(u64::MAX),
            "Handler execution complete"
        );
        outcome
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
