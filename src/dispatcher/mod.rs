//! # Dispatcher Module
//!
//! The dispatcher turns a routed request into a response. It resolves the
//! route's handler reference, runs the middleware chain around it and reduces
//! whatever the handler returned into the final [`crate::http::Response`].
//!
//! ## Request Flow
//!
//! 1. The router resolves `(method, path)` once per request; the outcome is
//!    kept on the request-scoped [`Exchange`]
//! 2. "No content needed" answers `204` with an `Allow` header right away
//! 3. Not-found and not-allowed run the custom fallback handler if one is
//!    registered, otherwise the matching [`crate::HttpError`]
//! 4. A matched route copies its attributes onto the request, runs global then
//!    route middleware, and calls the handler
//! 5. The handler's [`Outcome`] is reduced with [`reduce`]; `after` hooks run
//!    in reverse
//!
//! ## Handler Results
//!
//! Handlers return anything convertible into an [`Outcome`]:
//!
//! ```rust
//! use trellis::dispatcher::{handler, Dispatcher, Registry};
//! use trellis::http::{HttpMessage, Request};
//! use trellis::router::Router;
//! use http::Method;
//! use serde_json::json;
//!
//! # fn main() -> Result<(), trellis::HttpError> {
//! let mut router = Router::new();
//! router.get("/user/:id", handler(|req, _res| {
//!     json!({ "id": req.attribute("id") })
//! }))?;
//!
//! let dispatcher = Dispatcher::new(router, Registry::new());
//! let res = dispatcher.handle(Request::new(Method::GET, "/user/42".parse()?));
//! assert_eq!(res.status_code(), 200);
//! assert_eq!(res.header_line("content-type"), "application/json");
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! - Routing failures are reduced like handler errors (`404`, `405`)
//! - Unresolvable handler references become `500`
//! - Handler panics are caught and become `500` unless disabled in
//!   [`crate::runtime_config::RuntimeConfig`]

mod core;
mod exchange;
mod outcome;
mod reduce;
mod resolver;

pub use self::core::Dispatcher;
pub use exchange::Exchange;
pub use outcome::{HandlerFailure, Outcome, Renderable, RenderableError, StatusError, ToArray};
pub use reduce::reduce;
pub use resolver::{controller, handler, HandlerFn, HandlerRef, Registry, Resolver};
