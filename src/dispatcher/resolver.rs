//! Handler references and the resolver that turns them into callables.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::{debug, warn};

use super::outcome::Outcome;
use crate::error::HttpError;
use crate::http::{Request, Response};

/// A callable handler: reads the current request and the response built so
/// far, and returns whatever it produced.
pub type HandlerFn = Arc<dyn Fn(&Request, &Response) -> Outcome + Send + Sync>;

/// Opaque handler reference stored on a route.
///
/// Either the callable itself, or a `controller@action` pair that a
/// [`Resolver`] looks up at dispatch time.
#[derive(Clone)]
pub enum HandlerRef {
    Function(HandlerFn),
    Controller { controller: String, action: String },
}

impl HandlerRef {
    /// `controller@action` key, or `"<closure>"` for function handlers.
    #[must_use]
    pub fn key(&self) -> String {
        match self {
            HandlerRef::Function(_) => "<closure>".to_string(),
            HandlerRef::Controller { controller, action } => format!("{controller}@{action}"),
        }
    }
}

impl fmt::Debug for HandlerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

/// Wrap a closure as a handler reference.
///
/// The closure may return anything convertible into an [`Outcome`]: a
/// response, text, a JSON value, an error, or a `Result` of those.
pub fn handler<F, O>(f: F) -> HandlerRef
where
    F: Fn(&Request, &Response) -> O + Send + Sync + 'static,
    O: Into<Outcome>,
{
    HandlerRef::Function(Arc::new(move |req: &Request, res: &Response| f(req, res).into()))
}

/// Reference a controller action registered with a [`Registry`].
pub fn controller(controller: &str, action: &str) -> HandlerRef {
    HandlerRef::Controller {
        controller: controller.to_string(),
        action: action.to_string(),
    }
}

/// Turns a [`HandlerRef`] into something callable.
pub trait Resolver: Send + Sync {
    /// # Errors
    ///
    /// [`HttpError::UnresolvableHandler`] when the reference names nothing known.
    fn resolve(&self, handler: &HandlerRef) -> Result<HandlerFn, HttpError>;
}

/// Name-keyed table of controller actions.
///
/// Function references resolve to themselves; controller references are
/// looked up by their `controller@action` key.
#[derive(Clone, Default)]
pub struct Registry {
    actions: HashMap<String, HandlerFn>,
}

impl Registry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `f` as `controller@action`, replacing any previous entry.
    pub fn register<F, O>(&mut self, controller: &str, action: &str, f: F)
    where
        F: Fn(&Request, &Response) -> O + Send + Sync + 'static,
        O: Into<Outcome>,
    {
        let key = format!("{controller}@{action}");
        debug!(handler = %key, "Controller action registered");
        self.actions
            .insert(key, Arc::new(move |req: &Request, res: &Response| f(req, res).into()));
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

impl Resolver for Registry {
    fn resolve(&self, handler: &HandlerRef) -> Result<HandlerFn, HttpError> {
        match handler {
            HandlerRef::Function(f) => Ok(Arc::clone(f)),
            HandlerRef::Controller { .. } => {
                let key = handler.key();
                self.actions.get(&key).cloned().ok_or_else(|| {
                    warn!(handler = %key, "Handler not found in registry");
                    HttpError::UnresolvableHandler { handler: key }
                })
            }
        }
    }
}
