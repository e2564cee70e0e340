//! # Trellis
//!
//! **Trellis** is the routing core of a server-side web toolkit: a route
//! registry and matcher, an immutable HTTP message model, and the pipeline
//! that turns whatever a handler returns into a response.
//!
//! ## Architecture
//!
//! - **[`router`]** - `:name` URI templates compiled to anchored matchers,
//!   per-method route tables, named routes and `Allow` computation
//! - **[`http`]** - immutable [`Request`](crate::http::Request) / [`Response`](crate::http::Response) with
//!   copy-on-write `with_*` mutators, headers, URIs and lazily read bodies
//! - **[`dispatcher`]** - handler resolution, middleware chain and the
//!   [`dispatcher::reduce`] step that maps handler results onto responses
//! - **[`middleware`]** - `before`/`after` hooks, including request tracing
//! - **[`server`]** - environment snapshots in, transports out
//! - **[`logging`]**, **[`runtime_config`]**, **[`ids`]** - ambient setup
//!
//! ### Request Handling Flow
//!
//! ```mermaid
//! sequenceDiagram
//!     participant Transport
//!     participant Dispatcher
//!     participant Router
//!     participant Middleware as Middleware Chain
//!     participant Handler
//!
//!     Transport->>Dispatcher: Environment snapshot
//!     Dispatcher->>Dispatcher: Request::from_environment
//!     Dispatcher->>Router: resolve(method, path)
//!     alt No content needed (HEAD/OPTIONS)
//!         Dispatcher-->>Transport: 204 + Allow
//!     else Not found / method not allowed
//!         Dispatcher->>Handler: custom fallback, if registered
//!         Dispatcher-->>Transport: 404 / 405 + Allow
//!     else Matched
//!         Dispatcher->>Dispatcher: copy route attributes onto request
//!         Dispatcher->>Middleware: before (global, then route)
//!         Middleware->>Handler: current request + response
//!         Handler-->>Dispatcher: Outcome
//!         Dispatcher->>Dispatcher: reduce(outcome, response)
//!         Dispatcher->>Middleware: after (reverse order)
//!         Dispatcher-->>Transport: headers, cookies, status, body
//!     end
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use trellis::dispatcher::{handler, Dispatcher, Registry};
//! use trellis::http::{HttpMessage, Request};
//! use trellis::router::Router;
//! use http::Method;
//!
//! # fn main() -> Result<(), trellis::HttpError> {
//! let mut router = Router::new();
//! router.get("/hello/:name", handler(|req, _res| {
//!     format!("Hello, {}!", req.attribute("name").and_then(|v| v.as_str()).unwrap_or("you"))
//! }))?;
//!
//! let dispatcher = Dispatcher::new(router, Registry::new());
//!
//! let res = dispatcher.handle(Request::new(Method::GET, "/hello/ada".parse()?));
//! assert_eq!(res.content()?, "Hello, ada!");
//!
//! let res = dispatcher.handle(Request::new(Method::OPTIONS, "/hello/ada".parse()?));
//! assert_eq!(res.status_code(), 204);
//! assert_eq!(res.header_line("allow"), "GET, HEAD, OPTIONS");
//! # Ok(())
//! # }
//! ```

pub mod dispatcher;
pub mod error;
pub mod http;
pub mod ids;
pub mod logging;
pub mod middleware;
pub mod router;
pub mod runtime_config;
pub mod server;

pub use dispatcher::{handler, Dispatcher, Outcome};
pub use error::HttpError;
pub use ids::RequestId;
pub use router::Router;
