//! Behaviour shared by requests and responses.
//!
//! Every mutator follows the same discipline: clone the receiver, change one
//! thing on the clone, return the clone. The receiver is never altered.

use super::body::Body;
use super::headers::{HeaderEntry, Headers};

/// Headers, protocol version and body common to every message.
#[derive(Debug, Clone)]
pub struct Message {
    pub(crate) headers: Headers,
    pub(crate) protocol_version: String,
    pub(crate) body: Body,
}

impl Default for Message {
    fn default() -> Self {
        Self {
            headers: Headers::new(),
            protocol_version: "1.1".to_string(),
            body: Body::empty(),
        }
    }
}

/// Copy-on-write accessors and mutators over a [`Message`].
///
/// Implementors only expose their embedded message; everything else is provided.
pub trait HttpMessage: Clone {
    fn message(&self) -> &Message;
    fn message_mut(&mut self) -> &mut Message;

    fn protocol_version(&self) -> &str {
        &self.message().protocol_version
    }

    fn headers(&self) -> &Headers {
        &self.message().headers
    }

    fn header_entries(&self) -> Vec<&HeaderEntry> {
        self.message().headers.iter().collect()
    }

    fn has_header(&self, name: &str) -> bool {
        self.message().headers.contains(name)
    }

    fn header(&self, name: &str) -> &[String] {
        self.message().headers.get(name)
    }

    /// Comma-joined values, for reading only. The wire layer emits one line per value.
    fn header_line(&self, name: &str) -> String {
        self.message().headers.line(name)
    }

    fn body(&self) -> &Body {
        &self.message().body
    }

    #[must_use]
    fn with_protocol_version(&self, version: &str) -> Self {
        let mut next = self.clone();
        next.message_mut().protocol_version = version.to_string();
        next
    }

    #[must_use]
    fn with_header(&self, name: &str, value: impl Into<String>) -> Self {
        let mut next = self.clone();
        next.message_mut().headers.set(name, vec![value.into()]);
        next
    }

    #[must_use]
    fn with_header_values(&self, name: &str, values: Vec<String>) -> Self {
        let mut next = self.clone();
        next.message_mut().headers.set(name, values);
        next
    }

    #[must_use]
    fn with_added_header(&self, name: &str, value: impl Into<String>) -> Self {
        let mut next = self.clone();
        next.message_mut().headers.append(name, vec![value.into()]);
        next
    }

    #[must_use]
    fn without_header(&self, name: &str) -> Self {
        let mut next = self.clone();
        next.message_mut().headers.remove(name);
        next
    }

    #[must_use]
    fn with_body(&self, body: impl Into<Body>) -> Self {
        let mut next = self.clone();
        next.message_mut().body = body.into();
        next
    }
}
