//! Outgoing response.

use bytes::Bytes;
use http::StatusCode;
use serde::Serialize;

use super::body::Body;
use super::message::{HttpMessage, Message};
use crate::error::HttpError;

/// Immutable response: status, optional custom reason phrase, headers and content.
#[derive(Debug, Clone)]
pub struct Response {
    message: Message,
    status: StatusCode,
    reason: Option<String>,
}

impl Default for Response {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpMessage for Response {
    fn message(&self) -> &Message {
        &self.message
    }

    fn message_mut(&mut self) -> &mut Message {
        &mut self.message
    }
}

impl Response {
    /// Empty `200 OK` response.
    #[must_use]
    pub fn new() -> Self {
        Self {
            message: Message::default(),
            status: StatusCode::OK,
            reason: None,
        }
    }

    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    #[must_use]
    pub fn status_code(&self) -> u16 {
        self.status.as_u16()
    }

    /// Custom reason phrase if one was set, else the canonical one for the status.
    #[must_use]
    pub fn reason_phrase(&self) -> &str {
        match &self.reason {
            Some(reason) => reason,
            None => self.status.canonical_reason().unwrap_or(""),
        }
    }

    /// Whether a body was explicitly supplied.
    #[must_use]
    pub fn has_content(&self) -> bool {
        self.message.body.is_populated()
    }

    /// Response content.
    ///
    /// # Errors
    ///
    /// Fails only for reader-backed bodies whose stream cannot be read.
    pub fn content(&self) -> Result<Bytes, HttpError> {
        self.message.body.bytes()
    }

    /// Set the status; the reason phrase falls back to the canonical one.
    #[must_use]
    pub fn with_status(&self, status: StatusCode) -> Self {
        let mut next = self.clone();
        next.status = status;
        next.reason = None;
        next
    }

    #[must_use]
    pub fn with_status_reason(&self, status: StatusCode, reason: &str) -> Self {
        let mut next = self.clone();
        next.status = status;
        next.reason = (!reason.is_empty()).then(|| reason.to_string());
        next
    }

    #[must_use]
    pub fn with_content(&self, content: impl Into<Bytes>) -> Self {
        self.with_body(Body::full(content.into()))
    }

    /// Serialize `data` as the body and set `Content-Type: application/json`.
    ///
    /// Accepts anything `serde` can serialize: maps, sequences, structs or a
    /// `serde_json::Value` produced by a `to_array()` style conversion.
    ///
    /// # Errors
    ///
    /// [`HttpError::Serialization`] when `data` cannot be serialized.
    pub fn json<T: Serialize + ?Sized>(&self, data: &T) -> Result<Self, HttpError> {
        let payload = serde_json::to_vec(data).map_err(HttpError::Serialization)?;
        Ok(self
            .with_header("Content-Type", "application/json")
            .with_content(payload))
    }

    /// Redirect to `location` with `status` (302 when `None`).
    #[must_use]
    pub fn redirect(&self, location: &str, status: Option<StatusCode>) -> Self {
        self.with_status(status.unwrap_or(StatusCode::FOUND))
            .with_header("Location", location)
    }
}
