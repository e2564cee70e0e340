//! Handler results and the capabilities that decide how they become responses.

use std::any::type_name;
use std::fmt;

use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::error::HttpError;
use crate::http::Response;

/// An error that knows which HTTP status it stands for.
pub trait StatusError: std::error::Error + Send + 'static {
    /// Status code; values outside `100..=599` are reduced to `500`.
    fn status_code(&self) -> u16;
}

/// An error that also renders its own body.
pub trait RenderableError: StatusError {
    fn render(&self) -> String;
}

/// A value with a textual (usually HTML) representation.
pub trait Renderable: Send {
    fn render(&self) -> String;
}

/// A value convertible to a JSON array or object.
pub trait ToArray: Send {
    fn to_array(&self) -> Value;
}

impl ToArray for Value {
    fn to_array(&self) -> Value {
        self.clone()
    }
}

impl ToArray for Map<String, Value> {
    fn to_array(&self) -> Value {
        Value::Object(self.clone())
    }
}

impl ToArray for Vec<Value> {
    fn to_array(&self) -> Value {
        Value::Array(self.clone())
    }
}

/// Whatever a handler produced, tagged by the capability that applies.
///
/// The set is closed: [`super::reduce`] handles every variant, and values
/// that fit none of them are carried as [`Outcome::Unknown`] with their type
/// name so the failure can be logged.
pub enum Outcome {
    Response(Response),
    RenderableError(Box<dyn RenderableError>),
    Renderable(Box<dyn Renderable>),
    Error(Box<dyn StatusError>),
    Text(String),
    Array(Box<dyn ToArray>),
    Unknown(&'static str),
}

impl Outcome {
    #[must_use]
    pub fn render(value: impl Renderable + 'static) -> Self {
        Outcome::Renderable(Box::new(value))
    }

    #[must_use]
    pub fn render_error(error: impl RenderableError) -> Self {
        Outcome::RenderableError(Box::new(error))
    }

    #[must_use]
    pub fn error(error: impl StatusError) -> Self {
        Outcome::Error(Box::new(error))
    }

    #[must_use]
    pub fn array(value: impl ToArray + 'static) -> Self {
        Outcome::Array(Box::new(value))
    }

    /// Anything `Display`, rendered as plain text.
    #[must_use]
    pub fn display(value: impl fmt::Display) -> Self {
        Outcome::Text(value.to_string())
    }

    /// Serialize `data` to a JSON value; serialization failures become an error outcome.
    #[must_use]
    pub fn json<T: Serialize + ?Sized>(data: &T) -> Self {
        match serde_json::to_value(data) {
            Ok(value) => Outcome::Array(Box::new(value)),
            Err(err) => Outcome::from(HttpError::Serialization(err)),
        }
    }

    /// A value of type `T` that offers no usable capability.
    #[must_use]
    pub fn unknown<T: ?Sized>() -> Self {
        Outcome::Unknown(type_name::<T>())
    }

    /// Variant name, for logs.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Outcome::Response(_) => "response",
            Outcome::RenderableError(_) => "renderable_error",
            Outcome::Renderable(_) => "renderable",
            Outcome::Error(_) => "error",
            Outcome::Text(_) => "text",
            Outcome::Array(_) => "array",
            Outcome::Unknown(_) => "unknown",
        }
    }
}

impl fmt::Debug for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Response(res) => f.debug_tuple("Response").field(&res.status()).finish(),
            Outcome::RenderableError(err) => f
                .debug_tuple("RenderableError")
                .field(&err.status_code())
                .field(&err.to_string())
                .finish(),
            Outcome::Renderable(_) => f.write_str("Renderable"),
            Outcome::Error(err) => f
                .debug_tuple("Error")
                .field(&err.status_code())
                .field(&err.to_string())
                .finish(),
            Outcome::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Outcome::Array(value) => f.debug_tuple("Array").field(&value.to_array()).finish(),
            Outcome::Unknown(type_name) => f.debug_tuple("Unknown").field(type_name).finish(),
        }
    }
}

impl From<Response> for Outcome {
    fn from(response: Response) -> Self {
        Outcome::Response(response)
    }
}

impl From<String> for Outcome {
    fn from(text: String) -> Self {
        Outcome::Text(text)
    }
}

impl From<&str> for Outcome {
    fn from(text: &str) -> Self {
        Outcome::Text(text.to_string())
    }
}

impl From<Value> for Outcome {
    fn from(value: Value) -> Self {
        Outcome::Array(Box::new(value))
    }
}

impl From<Map<String, Value>> for Outcome {
    fn from(map: Map<String, Value>) -> Self {
        Outcome::Array(Box::new(map))
    }
}

impl From<Vec<Value>> for Outcome {
    fn from(items: Vec<Value>) -> Self {
        Outcome::Array(Box::new(items))
    }
}

impl From<HttpError> for Outcome {
    fn from(error: HttpError) -> Self {
        Outcome::Error(Box::new(error))
    }
}

/// `anyhow` failure from a handler, reported as `500`.
#[derive(Debug, Error)]
#[error("{0:#}")]
pub struct HandlerFailure(pub anyhow::Error);

impl StatusError for HandlerFailure {
    fn status_code(&self) -> u16 {
        500
    }
}

impl From<anyhow::Error> for Outcome {
    fn from(error: anyhow::Error) -> Self {
        Outcome::Error(Box::new(HandlerFailure(error)))
    }
}

/// A handler that returns nothing produced nothing usable.
impl From<()> for Outcome {
    fn from((): ()) -> Self {
        Outcome::unknown::<()>()
    }
}

impl<T, E> From<Result<T, E>> for Outcome
where
    T: Into<Outcome>,
    E: Into<Outcome>,
{
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(value) => value.into(),
            Err(error) => error.into(),
        }
    }
}
