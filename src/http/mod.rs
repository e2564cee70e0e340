//! # HTTP Message Module
//!
//! Immutable request and response values.
//!
//! ## Overview
//!
//! - [`Uri`] - parsed URI components with default-port elision
//! - [`Headers`] - case-insensitive lookup, case-preserving enumeration
//! - [`Body`] - buffered or lazily read content, read at most once
//! - [`HttpMessage`] - header/protocol/body behaviour shared by both messages
//! - [`Request`] - server request populated once from an environment snapshot
//! - [`Response`] - status, reason phrase and content, with JSON and redirect helpers
//!
//! ## Mutation discipline
//!
//! No message is ever changed in place. Each `with_*` call clones the value,
//! applies one change to the clone and returns it:
//!
//! ```rust
//! use trellis::http::{HttpMessage, Response};
//! use http::StatusCode;
//!
//! let a = Response::new();
//! let b = a.with_status(StatusCode::NOT_FOUND).with_header("X-Foo", "1");
//!
//! assert_eq!(a.status_code(), 200);
//! assert!(!a.has_header("x-foo"));
//! assert!(b.has_header("x-foo"));
//! ```

mod body;
mod headers;
mod message;
mod request;
mod response;
mod uri;

pub use body::Body;
pub use headers::{HeaderEntry, Headers, MAX_INLINE_HEADERS};
pub use message::{HttpMessage, Message};
pub use request::{Request, UploadedFile};
pub use response::Response;
pub use uri::Uri;

