//! Middleware hooks run around route handlers.
//!
//! Global middleware is registered on the [`crate::dispatcher::Dispatcher`]
//! and runs first; a route's own middleware runs after it. `before` hooks run
//! in that order and may replace the request or answer directly; `after`
//! hooks run in reverse for every middleware whose `before` was reached.

mod core;
mod tracing;

pub use self::core::{Middleware, Next};
pub use self::tracing::TracingMiddleware;
