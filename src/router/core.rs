//! Router core module - route table and request resolution.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use http::Method;
use tracing::{debug, info, warn};

use super::route::{Route, RouteMatch, RouteOutcome, RoutePattern};
use crate::dispatcher::HandlerRef;
use crate::error::HttpError;
use crate::middleware::Middleware;

/// Routes registered under one method, in registration order.
#[derive(Clone, Default)]
struct MethodTable {
    routes: Vec<Arc<Route>>,
    by_uri: HashMap<String, usize>,
}

impl MethodTable {
    /// Store `route` under its URI. An implicit entry never replaces a route
    /// registered explicitly for this table's method.
    fn insert(&mut self, method: &Method, route: Arc<Route>) {
        let explicit = route.method() == method;
        match self.by_uri.get(route.uri()) {
            Some(&i) => {
                if explicit || self.routes[i].method() != method {
                    self.routes[i] = route;
                }
            }
            None => {
                self.by_uri.insert(route.uri().to_string(), self.routes.len());
                self.routes.push(route);
            }
        }
    }

    /// Exact key lookup for static routes, then pattern scan in registration order.
    fn find(&self, path: &str) -> Option<RouteMatch> {
        if let Some(&i) = self.by_uri.get(path) {
            let route = &self.routes[i];
            if route.pattern().is_static() {
                return Some(RouteMatch {
                    route: Arc::clone(route),
                    attributes: Default::default(),
                });
            }
        }
        self.routes.iter().find_map(|route| {
            route.pattern().captures(path).map(|attributes| RouteMatch {
                route: Arc::clone(route),
                attributes,
            })
        })
    }
}

/// Route table plus name index.
///
/// Built once at startup, then only read while requests are matched.
/// Resolution is a pure function of `(method, path)`; per-request memoization
/// lives in [`crate::dispatcher::Exchange`].
#[derive(Clone)]
pub struct Router {
    tables: HashMap<Method, MethodTable>,
    named: HashMap<String, Arc<Route>>,
    not_found: Option<HandlerRef>,
    method_not_allowed: Option<HandlerRef>,
    slow_match_threshold: Duration,
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl Router {
    #[must_use]
    pub fn new() -> Self {
        Self {
            tables: HashMap::new(),
            named: HashMap::new(),
            not_found: None,
            method_not_allowed: None,
            slow_match_threshold: Duration::from_millis(1),
        }
    }

    /// Match durations above `threshold` are logged as warnings.
    #[must_use]
    pub fn with_slow_match_threshold(mut self, threshold: Duration) -> Self {
        self.slow_match_threshold = threshold;
        self
    }

    /// Register a route.
    ///
    /// The URI is canonicalized (empty becomes `/`, trailing slash removed) and
    /// the route is stored under `method`, `HEAD` and `OPTIONS`.
    ///
    /// # Errors
    ///
    /// - [`HttpError::InvalidRoutePattern`] when the URI cannot be compiled
    /// - [`HttpError::DuplicateRouteName`] when `name` already belongs to a
    ///   route with a different method or URI
    pub fn register(
        &mut self,
        method: Method,
        uri: &str,
        handler: HandlerRef,
        middlewares: Vec<Arc<dyn Middleware>>,
        name: Option<&str>,
    ) -> Result<Arc<Route>, HttpError> {
        let uri = normalize_path(uri);
        let pattern = RoutePattern::compile(&uri)?;

        if let Some(name) = name {
            if let Some(existing) = self.named.get(name) {
                if *existing.method() != method || existing.uri() != uri {
                    return Err(HttpError::DuplicateRouteName {
                        name: name.to_string(),
                        existing: format!("{} {}", existing.method(), existing.uri()),
                    });
                }
            }
        }

        let route = Arc::new(Route::new(
            method,
            pattern,
            handler,
            middlewares,
            name.map(str::to_string),
        ));

        for bucket in route.methods() {
            self.tables
                .entry(bucket.clone())
                .or_default()
                .insert(&bucket, Arc::clone(&route));
        }
        // a replaced route loses its name
        self.named.retain(|old_name, existing| {
            let replaced = existing.method() == route.method() && existing.uri() == route.uri();
            if replaced {
                debug!(name = %old_name, uri = %route.uri(), "Route name evicted by re-registration");
            }
            !replaced
        });
        if let Some(name) = name {
            self.named.insert(name.to_string(), Arc::clone(&route));
        }

        info!(
            method = %route.method(),
            uri = %route.uri(),
            name = %route.name(),
            handler = ?route.handler(),
            middleware_count = route.middlewares().len(),
            "Route registered"
        );

        Ok(route)
    }

    /// Register a `GET` route without middleware or name.
    ///
    /// # Errors
    ///
    /// See [`Router::register`].
    pub fn get(&mut self, uri: &str, handler: HandlerRef) -> Result<Arc<Route>, HttpError> {
        self.register(Method::GET, uri, handler, Vec::new(), None)
    }

    /// # Errors
    ///
    /// See [`Router::register`].
    pub fn post(&mut self, uri: &str, handler: HandlerRef) -> Result<Arc<Route>, HttpError> {
        self.register(Method::POST, uri, handler, Vec::new(), None)
    }

    /// # Errors
    ///
    /// See [`Router::register`].
    pub fn put(&mut self, uri: &str, handler: HandlerRef) -> Result<Arc<Route>, HttpError> {
        self.register(Method::PUT, uri, handler, Vec::new(), None)
    }

    /// # Errors
    ///
    /// See [`Router::register`].
    pub fn patch(&mut self, uri: &str, handler: HandlerRef) -> Result<Arc<Route>, HttpError> {
        self.register(Method::PATCH, uri, handler, Vec::new(), None)
    }

    /// # Errors
    ///
    /// See [`Router::register`].
    pub fn delete(&mut self, uri: &str, handler: HandlerRef) -> Result<Arc<Route>, HttpError> {
        self.register(Method::DELETE, uri, handler, Vec::new(), None)
    }

    /// Handler invoked instead of the default 404 error.
    pub fn on_not_found(&mut self, handler: HandlerRef) {
        self.not_found = Some(handler);
    }

    /// Handler invoked instead of the default 405 error.
    pub fn on_method_not_allowed(&mut self, handler: HandlerRef) {
        self.method_not_allowed = Some(handler);
    }

    #[must_use]
    pub fn not_found_handler(&self) -> Option<&HandlerRef> {
        self.not_found.as_ref()
    }

    #[must_use]
    pub fn method_not_allowed_handler(&self) -> Option<&HandlerRef> {
        self.method_not_allowed.as_ref()
    }

    #[must_use]
    pub fn named(&self, name: &str) -> Option<&Arc<Route>> {
        self.named.get(name)
    }

    /// Path for the named route with `params` substituted.
    ///
    /// # Errors
    ///
    /// [`HttpError::UnknownRouteName`] or [`HttpError::MissingRouteParameter`].
    pub fn url_for(&self, name: &str, params: &[(&str, &str)]) -> Result<String, HttpError> {
        let route = self.named.get(name).ok_or_else(|| HttpError::UnknownRouteName {
            name: name.to_string(),
        })?;
        route.pattern().build(name, params)
    }

    /// Every route, once, under the method it was registered for.
    #[must_use]
    pub fn routes(&self) -> Vec<Arc<Route>> {
        let mut routes: Vec<Arc<Route>> = self
            .tables
            .iter()
            .flat_map(|(method, table)| {
                table
                    .routes
                    .iter()
                    .filter(move |r| r.method() == method)
                    .cloned()
            })
            .collect();
        routes.sort_by(|a, b| {
            a.uri()
                .cmp(b.uri())
                .then_with(|| method_rank(a.method()).cmp(&method_rank(b.method())))
        });
        routes
    }

    /// Log every registered route.
    pub fn dump_routes(&self) {
        for route in self.routes() {
            info!(
                method = %route.method(),
                uri = %route.uri(),
                name = %route.name(),
                "[route]"
            );
        }
    }

    /// Resolve `(method, path)` to a route, the no-content sentinel,
    /// method-not-allowed, or not-found.
    ///
    /// 1. The method's own table: exact key for static routes, then patterns
    ///    in registration order. A HEAD/OPTIONS hit on an implicit entry is
    ///    reported as [`RouteOutcome::NoContent`].
    /// 2. Otherwise every other method's table. A hit means NoContent for
    ///    HEAD/OPTIONS and MethodNotAllowed for anything else.
    /// 3. Otherwise NotFound.
    #[must_use]
    pub fn resolve(&self, method: &Method, path: &str) -> RouteOutcome {
        let path = normalize_path(path);
        debug!(method = %method, path = %path, "Route match attempt");
        let match_start = Instant::now();
        let head_or_options = *method == Method::HEAD || *method == Method::OPTIONS;

        if let Some(matched) = self.tables.get(method).and_then(|t| t.find(&path)) {
            let duration = match_start.elapsed();
            self.log_match(method, &path, &matched, duration);
            if head_or_options && matched.route.method() != method {
                return RouteOutcome::NoContent;
            }
            return RouteOutcome::Matched(matched);
        }

        let elsewhere = self
            .tables
            .iter()
            .filter(|(m, _)| *m != method)
            .any(|(_, table)| table.find(&path).is_some());

        let duration_us = match_start.elapsed().as_micros();
        if elsewhere {
            if head_or_options {
                debug!(method = %method, path = %path, duration_us, "Path exists, no content needed");
                return RouteOutcome::NoContent;
            }
            let allowed = self.allowed_methods(&path);
            warn!(
                method = %method,
                path = %path,
                allowed = ?allowed,
                duration_us,
                "Method not allowed"
            );
            return RouteOutcome::MethodNotAllowed { allowed };
        }

        warn!(method = %method, path = %path, duration_us, "No route matched");
        RouteOutcome::NotFound
    }

    fn log_match(&self, method: &Method, path: &str, matched: &RouteMatch, duration: Duration) {
        if duration > self.slow_match_threshold {
            warn!(
                method = %method,
                path = %path,
                route = %matched.route.name(),
                route_pattern = %matched.route.uri(),
                duration_us = duration.as_micros(),
                "Slow route matching detected"
            );
        } else {
            info!(
                method = %method,
                path = %path,
                route = %matched.route.name(),
                route_pattern = %matched.route.uri(),
                attributes = ?matched.attributes,
                duration_us = duration.as_micros(),
                "Route matched"
            );
        }
    }

    /// Union of the method sets of every route whose pattern matches `path`.
    ///
    /// Used for the `Allow` header; always includes the implicit HEAD and OPTIONS.
    #[must_use]
    pub fn allowed_methods(&self, path: &str) -> Vec<Method> {
        let path = normalize_path(path);
        let mut allowed: Vec<Method> = Vec::new();
        for table in self.tables.values() {
            for route in &table.routes {
                if route.pattern().is_match(&path) {
                    for method in route.methods() {
                        if !allowed.contains(&method) {
                            allowed.push(method);
                        }
                    }
                }
            }
        }
        allowed.sort_by_key(method_rank);
        allowed
    }
}

/// Canonical form: leading slash, no trailing slash, `/` for empty.
#[must_use]
pub fn normalize_path(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    }
}

fn method_rank(method: &Method) -> (u8, String) {
    let rank = match *method {
        Method::GET => 0,
        Method::HEAD => 1,
        Method::POST => 2,
        Method::PUT => 3,
        Method::PATCH => 4,
        Method::DELETE => 5,
        Method::OPTIONS => 6,
        _ => 7,
    };
    (rank, method.as_str().to_string())
}

/// `Allow` header value for a method list.
#[must_use]
pub fn allow_header(methods: &[Method]) -> String {
    methods
        .iter()
        .map(Method::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}
