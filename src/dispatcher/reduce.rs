//! Reduce a handler [`Outcome`] into the final [`Response`].

use http::StatusCode;
use tracing::{debug, error, warn};

use super::outcome::Outcome;
use crate::http::{HttpMessage, Response};

const HTML: &str = "text/html; charset=utf-8";
const TEXT: &str = "text/plain; charset=utf-8";

/// Fold `resolved` into `current`.
///
/// Rules, first match wins:
///
/// 1. `current` already carries content: it is returned unchanged
/// 2. a response passes through as-is
/// 3. a renderable error sets the status from its code and the rendered body
/// 4. a renderable sets the rendered body
/// 5. a status error sets the status only
/// 6. text sets the body
/// 7. an array-convertible value is written as JSON
/// 8. anything else is logged and becomes a bare `500`
#[must_use]
pub fn reduce(resolved: Outcome, current: Response) -> Response {
    if current.has_content() {
        debug!(
            status = current.status_code(),
            discarded = resolved.kind(),
            "Response already populated, keeping it"
        );
        return current;
    }

    match resolved {
        Outcome::Response(response) => response,
        Outcome::RenderableError(err) => {
            let status = status_from_code(err.status_code());
            log_error(status, &err.to_string());
            with_default_type(current.with_status(status), HTML).with_content(err.render())
        }
        Outcome::Renderable(value) => {
            with_default_type(current, HTML).with_content(value.render())
        }
        Outcome::Error(err) => {
            let status = status_from_code(err.status_code());
            log_error(status, &err.to_string());
            current.with_status(status)
        }
        Outcome::Text(text) => with_default_type(current, TEXT).with_content(text),
        Outcome::Array(value) => match current.json(&value.to_array()) {
            Ok(response) => response,
            Err(err) => {
                error!(error = %err, "Failed to serialize handler result");
                current.with_status(StatusCode::INTERNAL_SERVER_ERROR)
            }
        },
        Outcome::Unknown(type_name) => {
            error!(
                result_type = type_name,
                "Handler returned a value with no response capability"
            );
            current.with_status(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// Codes outside `100..=599` (including `0`) reduce to `500`.
fn status_from_code(code: u16) -> StatusCode {
    StatusCode::from_u16(code)
        .ok()
        .filter(|status| status.as_u16() <= 599)
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

fn with_default_type(response: Response, content_type: &str) -> Response {
    if response.has_header("content-type") {
        response
    } else {
        response.with_header("Content-Type", content_type)
    }
}

fn log_error(status: StatusCode, message: &str) {
    if status.is_server_error() {
        error!(status = status.as_u16(), error = %message, "Handler error");
    } else {
        warn!(status = status.as_u16(), error = %message, "Handler error");
    }
}
