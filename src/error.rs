//! Error taxonomy shared by the router, the message model and the dispatcher.
//!
//! Routing failures ([`HttpError::RouteNotFound`], [`HttpError::MethodNotAllowed`])
//! are produced per request and flow through the same reduction pipeline as
//! handler errors. Registration failures ([`HttpError::DuplicateRouteName`],
//! [`HttpError::InvalidRoutePattern`]) are returned from `Router::register` and
//! are expected to abort startup.

use http::{Method, StatusCode};
use thiserror::Error;

use crate::dispatcher::StatusError;

/// Errors raised by the routing core.
#[derive(Debug, Error)]
pub enum HttpError {
    /// No registered route matches the path under any method.
    #[error("no route matches path '{path}'")]
    RouteNotFound { path: String },

    /// The path is registered, but not for the requested method.
    #[error("method {method} is not allowed for '{path}'")]
    MethodNotAllowed {
        method: Method,
        path: String,
        /// Union of the methods that do answer this path.
        allowed: Vec<Method>,
    },

    /// A route name was registered twice for different routes.
    #[error("route name '{name}' is already registered for {existing}")]
    DuplicateRouteName { name: String, existing: String },

    /// `url_for` was asked for a name nobody registered.
    #[error("no route is named '{name}'")]
    UnknownRouteName { name: String },

    /// `url_for` was missing a value for a required placeholder.
    #[error("route '{name}' requires parameter '{param}'")]
    MissingRouteParameter { name: String, param: String },

    /// The URI template could not be compiled into a matcher.
    #[error("invalid route pattern '{pattern}': {reason}")]
    InvalidRoutePattern { pattern: String, reason: String },

    /// A URI string could not be parsed.
    #[error("invalid uri '{uri}': {reason}")]
    InvalidUri { uri: String, reason: String },

    /// A body could not be backed by the given resource.
    #[error("invalid stream resource '{resource}': {source}")]
    InvalidStreamResource {
        resource: String,
        #[source]
        source: std::io::Error,
    },

    /// A required request property was looked up and is not present.
    #[error("property '{name}' not found on request")]
    PropertyNotFound { name: String },

    /// The resolver could not turn a handler reference into something callable.
    #[error("handler '{handler}' could not be resolved")]
    UnresolvableHandler { handler: String },

    /// The request body exceeded the configured limit.
    #[error("request body exceeds {limit} bytes")]
    BodyTooLarge { limit: usize },

    /// A handler panicked while producing its result.
    #[error("handler panicked: {message}")]
    HandlerPanicked { message: String },

    /// Request input was not valid JSON.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// A handler result or response payload could not be serialized.
    #[error("response serialization failed: {0}")]
    Serialization(#[source] serde_json::Error),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl HttpError {
    /// HTTP status this error maps to when reduced into a response.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            HttpError::RouteNotFound { .. } => StatusCode::NOT_FOUND,
            HttpError::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            HttpError::BodyTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            HttpError::PropertyNotFound { .. } => StatusCode::BAD_REQUEST,
            HttpError::InvalidUri { .. } => StatusCode::BAD_REQUEST,
            HttpError::Json(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl StatusError for HttpError {
    fn status_code(&self) -> u16 {
        self.status().as_u16()
    }
}
