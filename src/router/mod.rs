//! # Router Module
//!
//! The router module owns the route table: it compiles URI templates into
//! regex matchers, keeps route names unique, and resolves each request to a
//! route, the "no content needed" sentinel, method-not-allowed, or not-found.
//!
//! ## Overview
//!
//! The router is responsible for:
//! - Compiling `:name` placeholder templates into anchored matchers
//! - Storing every route under its method plus the implicit `HEAD` and `OPTIONS`
//! - Rejecting duplicate route names at registration time
//! - Extracting matched attributes, with an explicit absent marker for
//!   optional placeholders
//! - Computing the `Allow` method set for a path
//!
//! ## Architecture
//!
//! The router uses a two-phase approach:
//!
//! 1. **Registration**: at startup, `register()` canonicalizes the URI, compiles
//!    it and files the shared `Arc<Route>` under each method bucket.
//!
//! 2. **Matching**: for each request, the method's bucket is tried by exact key
//!    (static routes) and then by pattern, in registration order. Other buckets
//!    are consulted only to tell method-not-allowed apart from not-found.
//!
//! ## Example
//!
//! ```rust
//! use trellis::dispatcher::{handler, Outcome};
//! use trellis::router::{RouteOutcome, Router};
//! use http::Method;
//!
//! # fn main() -> Result<(), trellis::HttpError> {
//! let mut router = Router::new();
//! router.get("/user/:id", handler(|_req, _res| Outcome::from("profile")))?;
//!
//! match router.resolve(&Method::GET, "/user/42/") {
//!     RouteOutcome::Matched(m) => assert_eq!(m.get("id"), Some("42")),
//!     other => panic!("unexpected outcome: {other:?}"),
//! }
//! # Ok(())
//! # }
//! ```

mod core;
mod route;

pub use self::core::{allow_header, normalize_path, Router};
pub use route::{ParamVec, Route, RouteMatch, RouteOutcome, RoutePattern, MAX_INLINE_PARAMS};
