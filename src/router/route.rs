//! Route definitions and URI-template compilation.

use std::fmt;
use std::sync::Arc;

use http::Method;
use regex::Regex;
use serde_json::{Map, Value};
use smallvec::{smallvec, SmallVec};

use crate::dispatcher::HandlerRef;
use crate::error::HttpError;
use crate::middleware::Middleware;

/// Maximum number of placeholders before heap allocation.
/// Most routes have ≤4 placeholders (e.g., /users/:id/posts/:post).
pub const MAX_INLINE_PARAMS: usize = 8;

/// Captured placeholder values, in pattern order.
///
/// `None` is the explicit "absent" marker for an optional placeholder that
/// did not capture anything.
pub type ParamVec = SmallVec<[(Arc<str>, Option<String>); MAX_INLINE_PARAMS]>;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param { name: Arc<str>, optional: bool },
}

/// A URI template such as `/user/:id/post/:post?` compiled into an anchored matcher.
///
/// Each `:name` placeholder captures one or more word characters. A trailing
/// `?` makes the placeholder (and the slash before it) optional. A trailing
/// slash on the candidate path is always accepted. Literal segments are
/// compared case-sensitively and nothing is percent-decoded.
#[derive(Debug, Clone)]
pub struct RoutePattern {
    raw: String,
    segments: Vec<Segment>,
    regex: Regex,
}

impl RoutePattern {
    /// Compile a canonical URI (leading slash, no trailing slash).
    ///
    /// # Errors
    ///
    /// [`HttpError::InvalidRoutePattern`] for empty or non-identifier
    /// placeholder names, or names used twice.
    pub fn compile(uri: &str) -> Result<Self, HttpError> {
        let invalid = |reason: String| HttpError::InvalidRoutePattern {
            pattern: uri.to_string(),
            reason,
        };

        let trimmed = uri.trim_matches('/');
        let mut segments = Vec::new();
        let mut pattern = String::with_capacity(uri.len() * 2 + 8);
        pattern.push('^');

        if !trimmed.is_empty() {
            for raw in trimmed.split('/') {
                match raw.strip_prefix(':') {
                    Some(spec) => {
                        let (name, optional) = match spec.strip_suffix('?') {
                            Some(name) => (name, true),
                            None => (spec, false),
                        };
                        if !is_identifier(name) {
                            return Err(invalid(format!("'{raw}' is not a valid placeholder")));
                        }
                        if optional {
                            pattern.push_str(&format!("(?:/(?P<{name}>[[:word:]]+))?"));
                        } else {
                            pattern.push_str(&format!("/(?P<{name}>[[:word:]]+)"));
                        }
                        segments.push(Segment::Param {
                            name: Arc::from(name),
                            optional,
                        });
                    }
                    None => {
                        pattern.push('/');
                        pattern.push_str(&regex::escape(raw));
                        segments.push(Segment::Literal(raw.to_string()));
                    }
                }
            }
        }

        pattern.push_str("/?$");
        let regex = Regex::new(&pattern).map_err(|e| invalid(e.to_string()))?;

        Ok(Self {
            raw: uri.to_string(),
            segments,
            regex,
        })
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// True when the pattern has no placeholders and can be matched by key.
    #[must_use]
    pub fn is_static(&self) -> bool {
        self.segments
            .iter()
            .all(|s| matches!(s, Segment::Literal(_)))
    }

    /// Placeholder names in pattern order.
    pub fn param_names(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Param { name, .. } => Some(name.as_ref()),
            Segment::Literal(_) => None,
        })
    }

    #[must_use]
    pub fn is_match(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }

    /// Match `path` and return every placeholder, present or absent.
    #[must_use]
    pub fn captures(&self, path: &str) -> Option<ParamVec> {
        let caps = self.regex.captures(path)?;
        let mut params = ParamVec::new();
        for segment in &self.segments {
            if let Segment::Param { name, .. } = segment {
                let value = caps
                    .name(name)
                    .map(|m| m.as_str())
                    .filter(|v| !v.is_empty())
                    .map(str::to_string);
                params.push((Arc::clone(name), value));
            }
        }
        Some(params)
    }

    /// Substitute placeholders with `params` to produce a concrete path.
    ///
    /// # Errors
    ///
    /// [`HttpError::MissingRouteParameter`] when a required placeholder has no value.
    pub fn build(&self, route_name: &str, params: &[(&str, &str)]) -> Result<String, HttpError> {
        let mut path = String::with_capacity(self.raw.len());
        for segment in &self.segments {
            match segment {
                Segment::Literal(lit) => {
                    path.push('/');
                    path.push_str(lit);
                }
                Segment::Param { name, optional } => {
                    let value = params
                        .iter()
                        .rfind(|(k, _)| *k == name.as_ref())
                        .map(|(_, v)| *v);
                    match (value, optional) {
                        (Some(v), _) => {
                            path.push('/');
                            path.push_str(v);
                        }
                        (None, true) => {}
                        (None, false) => {
                            return Err(HttpError::MissingRouteParameter {
                                name: route_name.to_string(),
                                param: name.to_string(),
                            })
                        }
                    }
                }
            }
        }
        if path.is_empty() {
            path.push('/');
        }
        Ok(path)
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// One registered endpoint.
///
/// The route answers its registered method plus the implicit `HEAD` and
/// `OPTIONS`; the router stores the same `Arc<Route>` under all three.
pub struct Route {
    method: Method,
    pattern: RoutePattern,
    handler: HandlerRef,
    middlewares: Vec<Arc<dyn Middleware>>,
    name: Option<String>,
}

impl Route {
    pub(crate) fn new(
        method: Method,
        pattern: RoutePattern,
        handler: HandlerRef,
        middlewares: Vec<Arc<dyn Middleware>>,
        name: Option<String>,
    ) -> Self {
        Self {
            method,
            pattern,
            handler,
            middlewares,
            name,
        }
    }

    /// The method the route was registered for.
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Registered method, then `HEAD` and `OPTIONS`, without duplicates.
    #[must_use]
    pub fn methods(&self) -> SmallVec<[Method; 3]> {
        let mut methods: SmallVec<[Method; 3]> = smallvec![self.method.clone()];
        for implicit in [Method::HEAD, Method::OPTIONS] {
            if !methods.contains(&implicit) {
                methods.push(implicit);
            }
        }
        methods
    }

    /// Canonical URI pattern.
    #[must_use]
    pub fn uri(&self) -> &str {
        self.pattern.as_str()
    }

    #[must_use]
    pub fn pattern(&self) -> &RoutePattern {
        &self.pattern
    }

    /// Explicit name, or the URI pattern when none was given.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or_else(|| self.pattern.as_str())
    }

    #[must_use]
    pub fn has_explicit_name(&self) -> bool {
        self.name.is_some()
    }

    #[must_use]
    pub fn handler(&self) -> &HandlerRef {
        &self.handler
    }

    #[must_use]
    pub fn middlewares(&self) -> &[Arc<dyn Middleware>] {
        &self.middlewares
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("method", &self.method)
            .field("uri", &self.pattern.as_str())
            .field("name", &self.name())
            .field("handler", &self.handler)
            .field("middlewares", &self.middlewares.len())
            .finish()
    }
}

/// Result of matching a request path to a route.
#[derive(Debug, Clone)]
pub struct RouteMatch {
    pub route: Arc<Route>,
    /// Placeholder values keyed by placeholder name.
    pub attributes: ParamVec,
}

impl RouteMatch {
    /// Captured value for `name`; `None` when absent or unknown.
    ///
    /// Uses "last write wins" if a name appears more than once.
    #[inline]
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .and_then(|(_, v)| v.as_deref())
    }

    /// Attributes as JSON values; absent placeholders become `null`.
    #[must_use]
    pub fn attributes_map(&self) -> Map<String, Value> {
        self.attributes
            .iter()
            .map(|(k, v)| {
                let value = v.as_ref().map_or(Value::Null, |s| Value::String(s.clone()));
                (k.to_string(), value)
            })
            .collect()
    }
}

/// Outcome of resolving a request against the route table.
#[derive(Debug, Clone)]
pub enum RouteOutcome {
    Matched(RouteMatch),
    /// HEAD or OPTIONS on a path that exists: answer with an empty success.
    NoContent,
    /// The path exists under other methods only.
    MethodNotAllowed { allowed: Vec<Method> },
    NotFound,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compiles_named_placeholders() {
        let pattern = RoutePattern::compile("/user/:id/post/:post").unwrap();
        let params = pattern.captures("/user/42/post/hello_world").unwrap();
        assert_eq!(params.len(), 2);
        assert_eq!(params[0], (Arc::from("id"), Some("42".to_string())));
        assert_eq!(params[1], (Arc::from("post"), Some("hello_world".to_string())));
        assert!(!pattern.is_static());
        assert_eq!(pattern.param_names().collect::<Vec<_>>(), ["id", "post"]);
    }

    #[test]
    fn trailing_slash_is_optional() {
        let pattern = RoutePattern::compile("/user/:id").unwrap();
        assert!(pattern.is_match("/user/42"));
        assert!(pattern.is_match("/user/42/"));
        assert!(!pattern.is_match("/user"));
        assert!(!pattern.is_match("/user/42/extra"));
        assert!(!pattern.is_match("/user/4-2"));
    }

    #[test]
    fn literals_are_case_sensitive_and_escaped() {
        let pattern = RoutePattern::compile("/files/v1.0").unwrap();
        assert!(pattern.is_match("/files/v1.0"));
        assert!(!pattern.is_match("/files/v1x0"));
        assert!(!pattern.is_match("/Files/v1.0"));
        assert!(pattern.is_static());
    }

    #[test]
    fn optional_placeholder_records_absent_marker() {
        let pattern = RoutePattern::compile("/archive/:year/:month?").unwrap();
        let params = pattern.captures("/archive/2024").unwrap();
        assert_eq!(params[1], (Arc::from("month"), None));
        let params = pattern.captures("/archive/2024/05").unwrap();
        assert_eq!(params[1].1.as_deref(), Some("05"));
    }

    #[test]
    fn rejects_bad_placeholders() {
        assert!(matches!(
            RoutePattern::compile("/user/:"),
            Err(HttpError::InvalidRoutePattern { .. })
        ));
        assert!(matches!(
            RoutePattern::compile("/user/:1st"),
            Err(HttpError::InvalidRoutePattern { .. })
        ));
        assert!(matches!(
            RoutePattern::compile("/a/:id/b/:id"),
            Err(HttpError::InvalidRoutePattern { .. })
        ));
    }

    #[test]
    fn builds_paths() {
        let pattern = RoutePattern::compile("/archive/:year/:month?").unwrap();
        assert_eq!(pattern.build("archive", &[("year", "2024")]).unwrap(), "/archive/2024");
        assert_eq!(
            pattern
                .build("archive", &[("year", "2024"), ("month", "05")])
                .unwrap(),
            "/archive/2024/05"
        );
        assert!(matches!(
            pattern.build("archive", &[]),
            Err(HttpError::MissingRouteParameter { .. })
        ));
        let root = RoutePattern::compile("/").unwrap();
        assert_eq!(root.build("home", &[]).unwrap(), "/");
        assert!(root.is_match("/"));
    }
}
