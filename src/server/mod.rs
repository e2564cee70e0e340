//! # Server Module
//!
//! The boundary between the dispatcher and whatever carries bytes to the
//! client. Inbound, an [`Environment`] snapshot describes the request;
//! outbound, [`emit`] writes a response through a [`Transport`].
//!
//! Two transports ship with the crate:
//!
//! - [`WireTransport`] writes HTTP/1.1 response text to any `io::Write`
//! - [`BufferedTransport`] captures the parts and converts them into an
//!   `http::Response<Bytes>`

mod environment;
mod transport;

pub use environment::{parse_cookies, Environment};
pub use transport::{emit, BufferedTransport, Transport, WireTransport};
