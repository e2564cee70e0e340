//! Writing a finished response to the client.

use std::io::{self, Write};

use bytes::Bytes;
use http::header::{HeaderName, HeaderValue, SET_COOKIE};
use http::{Method, StatusCode};
use tracing::{debug, error, warn};

use crate::error::HttpError;
use crate::http::{HttpMessage, Request, Response};

/// Sink for the parts of an outgoing response.
///
/// [`emit`] calls `header` once per header value and `cookie` once per
/// cookie, then `status`, then `body` exactly once.
pub trait Transport {
    fn status(&mut self, code: u16, reason: &str);
    fn header(&mut self, name: &str, value: &str);
    fn cookie(&mut self, name: &str, value: &str);
    /// # Errors
    ///
    /// Returns any error from the underlying writer.
    fn body(&mut self, content: &[u8]) -> io::Result<()>;
}

/// Emit `response` for `request` through `transport`.
///
/// Each header value becomes its own header line. The request's cookies are
/// mirrored back percent-encoded. `HEAD` responses are sent without a body.
///
/// The body is read before anything reaches the transport. When it cannot be
/// read, a bare `500` without the response's headers is sent instead.
///
/// # Errors
///
/// Fails only when the transport write fails.
pub fn emit(
    response: &Response,
    request: &Request,
    transport: &mut dyn Transport,
) -> Result<(), HttpError> {
    let content = if *request.method() == Method::HEAD {
        Ok(Bytes::new())
    } else {
        response.content()
    };

    let (status, reason, content) = match content {
        Ok(content) => {
            for entry in response.headers().iter() {
                for value in &entry.values {
                    transport.header(&entry.name, value);
                }
            }
            (response.status_code(), response.reason_phrase(), content)
        }
        Err(err) => {
            error!(
                status = response.status_code(),
                error = %err,
                "Response body could not be read, sending 500"
            );
            let status = StatusCode::INTERNAL_SERVER_ERROR;
            (
                status.as_u16(),
                status.canonical_reason().unwrap_or_default(),
                Bytes::new(),
            )
        }
    };

    let mut cookies: Vec<_> = request.cookie_params().iter().collect();
    cookies.sort();
    for (name, value) in cookies {
        transport.cookie(name, &urlencoding::encode(value));
    }

    transport.status(status, reason);
    transport.body(&content)?;

    debug!(
        status,
        header_count = response.headers().len(),
        body_size_bytes = content.len(),
        "Response emitted"
    );
    Ok(())
}

/// Statuses whose responses never carry a body or a `Content-Length`.
fn is_bodiless(status: u16) -> bool {
    (100..200).contains(&status) || status == 204 || status == 304
}

/// Writes HTTP/1.1 response text to any [`Write`].
///
/// Everything is buffered until `body` is called, then written in one go.
/// A `Content-Length` header is added when the response has none, except
/// for 1xx, 204 and 304 responses.
#[derive(Debug)]
pub struct WireTransport<W: Write> {
    writer: W,
    status: u16,
    reason: String,
    headers: Vec<(String, String)>,
}

impl<W: Write> WireTransport<W> {
    #[must_use]
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            status: 200,
            reason: "OK".to_string(),
            headers: Vec::new(),
        }
    }

    #[must_use]
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> Transport for WireTransport<W> {
    fn status(&mut self, code: u16, reason: &str) {
        self.status = code;
        self.reason = reason.to_string();
    }

    fn header(&mut self, name: &str, value: &str) {
        self.headers.push((name.to_string(), value.to_string()));
    }

    fn cookie(&mut self, name: &str, value: &str) {
        self.headers
            .push(("Set-Cookie".to_string(), format!("{name}={value}")));
    }

    fn body(&mut self, content: &[u8]) -> io::Result<()> {
        let mut head = format!("HTTP/1.1 {} {}\r\n", self.status, self.reason);
        for (name, value) in &self.headers {
            head.push_str(&format!("{name}: {value}\r\n"));
        }
        if !is_bodiless(self.status)
            && !self
                .headers
                .iter()
                .any(|(name, _)| name.eq_ignore_ascii_case("content-length"))
        {
            head.push_str(&format!("Content-Length: {}\r\n", content.len()));
        }
        head.push_str("\r\n");

        self.writer.write_all(head.as_bytes())?;
        self.writer.write_all(content)?;
        self.writer.flush()
    }
}

/// Captures the emitted parts in memory.
#[derive(Debug, Clone, Default)]
pub struct BufferedTransport {
    pub status: u16,
    pub reason: String,
    pub headers: Vec<(String, String)>,
    pub cookies: Vec<(String, String)>,
    pub body: Bytes,
}

impl BufferedTransport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Convert into an `http::Response`; cookies become `Set-Cookie` headers.
    ///
    /// Header names or values that `http` rejects are dropped with a warning.
    #[must_use]
    pub fn into_response(self) -> http::Response<Bytes> {
        let mut response = http::Response::new(self.body);
        *response.status_mut() =
            StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        for (name, value) in &self.headers {
            match (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(value),
            ) {
                (Ok(name), Ok(value)) => {
                    response.headers_mut().append(name, value);
                }
                _ => warn!(header = %name, "Dropping header that is not valid HTTP"),
            }
        }
        for (name, value) in &self.cookies {
            match HeaderValue::from_str(&format!("{name}={value}")) {
                Ok(value) => {
                    response.headers_mut().append(SET_COOKIE, value);
                }
                Err(_) => warn!(cookie = %name, "Dropping cookie that is not valid HTTP"),
            }
        }
        response
    }
}

impl Transport for BufferedTransport {
    fn status(&mut self, code: u16, reason: &str) {
        self.status = code;
        self.reason = reason.to_string();
    }

    fn header(&mut self, name: &str, value: &str) {
        self.headers.push((name.to_string(), value.to_string()));
    }

    fn cookie(&mut self, name: &str, value: &str) {
        self.cookies.push((name.to_string(), value.to_string()));
    }

    fn body(&mut self, content: &[u8]) -> io::Result<()> {
        self.body = Bytes::copy_from_slice(content);
        Ok(())
    }
}
