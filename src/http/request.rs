//! Server-side request.
//!
//! A [`Request`] is populated once from an [`Environment`] snapshot; after that
//! every accessor is a plain read. Middleware and handlers derive new requests
//! through the `with_*` methods, which never alter the instance they are called on.

use std::collections::HashMap;
use std::path::PathBuf;

use http::Method;
use once_cell::sync::OnceCell;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::body::Body;
use super::message::{HttpMessage, Message};
use super::uri::Uri;
use crate::error::HttpError;
use crate::server::Environment;

/// A file received with the request, as described by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    /// Where the transport stored the upload.
    pub path: PathBuf,
    pub client_filename: Option<String>,
    pub client_media_type: Option<String>,
    pub size: u64,
    /// Transport-specific upload status; `0` means no error.
    pub error: u32,
}

impl UploadedFile {
    /// Open the stored upload as a lazily read body.
    ///
    /// # Errors
    ///
    /// [`HttpError::InvalidStreamResource`] when the stored file is gone.
    pub fn open(&self) -> Result<Body, HttpError> {
        Body::open(&self.path)
    }
}

/// Immutable server request.
#[derive(Debug, Clone)]
pub struct Request {
    message: Message,
    method: Method,
    uri: Uri,
    request_target: Option<String>,
    query_params: HashMap<String, String>,
    cookies: HashMap<String, String>,
    server_params: HashMap<String, String>,
    uploaded_files: HashMap<String, UploadedFile>,
    attributes: Map<String, Value>,
    /// Form fields the transport already decoded.
    form_fields: Map<String, Value>,
    parsed_body: OnceCell<Value>,
}

impl HttpMessage for Request {
    fn message(&self) -> &Message {
        &self.message
    }

    fn message_mut(&mut self) -> &mut Message {
        &mut self.message
    }
}

impl Request {
    /// Bare request for `method` and `uri`, with no headers or body.
    #[must_use]
    pub fn new(method: Method, uri: Uri) -> Self {
        let query_params = parse_query(uri.query());
        Self {
            message: Message::default(),
            method,
            uri,
            request_target: None,
            query_params,
            cookies: HashMap::new(),
            server_params: HashMap::new(),
            uploaded_files: HashMap::new(),
            attributes: Map::new(),
            form_fields: Map::new(),
            parsed_body: OnceCell::new(),
        }
    }

    /// Build the request from a transport snapshot.
    ///
    /// This is the only place environment values are read. An empty method
    /// defaults to `GET`; any other method is kept so routing can answer 404
    /// or 405. The protocol version comes from `SERVER_PROTOCOL`.
    #[must_use]
    pub fn from_environment(env: &Environment) -> Self {
        let method = method_from_environment(&env.method);

        let uri = Uri::default()
            .with_scheme(if env.scheme.is_empty() { "http" } else { env.scheme.as_str() })
            .with_host(&env.host)
            .with_port(env.port)
            .with_path(if env.path.is_empty() { "/" } else { env.path.as_str() })
            .with_query(&env.query);

        let protocol_version = env
            .server
            .get("SERVER_PROTOCOL")
            .and_then(|p| p.strip_prefix("HTTP/"))
            .unwrap_or("1.1")
            .to_string();

        let mut message = Message {
            protocol_version,
            body: Body::full(env.body.clone()),
            ..Message::default()
        };
        for (name, value) in &env.headers {
            message.headers.append(name, vec![value.clone()]);
        }

        let form_fields = env
            .form
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect();

        debug!(
            method = %method,
            path = %uri.path(),
            header_count = message.headers.len(),
            cookie_count = env.cookies.len(),
            "Request built from environment"
        );

        Self {
            message,
            method,
            query_params: parse_query(&env.query),
            uri,
            request_target: None,
            cookies: env.cookies.clone(),
            server_params: env.server.clone(),
            uploaded_files: env.files.clone(),
            attributes: Map::new(),
            form_fields,
            parsed_body: OnceCell::new(),
        }
    }

    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    #[must_use]
    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    /// Path component of the URI.
    #[must_use]
    pub fn path(&self) -> &str {
        self.uri.path()
    }

    /// Explicit request target, or `path[?query]` derived from the URI.
    #[must_use]
    pub fn request_target(&self) -> String {
        if let Some(target) = &self.request_target {
            return target.clone();
        }
        let mut target = if self.uri.path().is_empty() {
            "/".to_string()
        } else {
            self.uri.path().to_string()
        };
        if !self.uri.query().is_empty() {
            target.push('?');
            target.push_str(self.uri.query());
        }
        target
    }

    #[must_use]
    pub fn query_params(&self) -> &HashMap<String, String> {
        &self.query_params
    }

    #[must_use]
    pub fn query(&self, name: &str) -> Option<&str> {
        self.query_params.get(name).map(String::as_str)
    }

    #[must_use]
    pub fn cookie_params(&self) -> &HashMap<String, String> {
        &self.cookies
    }

    #[must_use]
    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    #[must_use]
    pub fn server_params(&self) -> &HashMap<String, String> {
        &self.server_params
    }

    #[must_use]
    pub fn server_param(&self, name: &str) -> Option<&str> {
        self.server_params.get(name).map(String::as_str)
    }

    #[must_use]
    pub fn uploaded_files(&self) -> &HashMap<String, UploadedFile> {
        &self.uploaded_files
    }

    #[must_use]
    pub fn uploaded_file(&self, name: &str) -> Option<&UploadedFile> {
        self.uploaded_files.get(name)
    }

    #[must_use]
    pub fn attributes(&self) -> &Map<String, Value> {
        &self.attributes
    }

    /// Attribute value. An attribute explicitly set to "absent" reads as `Some(Value::Null)`.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    /// Whether the `Content-Type` header declares JSON.
    #[must_use]
    pub fn is_json(&self) -> bool {
        let content_type = self.header_line("content-type").to_ascii_lowercase();
        content_type.contains("/json") || content_type.contains("+json")
    }

    /// Body decoded according to its content type, computed once and cached.
    ///
    /// JSON bodies become the decoded value, url-encoded bodies an object of
    /// strings; otherwise the transport's pre-decoded form fields, or `Null`.
    ///
    /// # Errors
    ///
    /// Fails when the body cannot be read or is malformed JSON.
    pub fn parsed_body(&self) -> Result<&Value, HttpError> {
        self.parsed_body.get_or_try_init(|| self.decode_body())
    }

    fn decode_body(&self) -> Result<Value, HttpError> {
        let content_type = self.header_line("content-type").to_ascii_lowercase();

        if self.is_json() {
            let bytes = self.body().bytes()?;
            if bytes.is_empty() {
                return Ok(Value::Null);
            }
            let value: Value = serde_json::from_slice(&bytes)?;
            debug!(
                body_size_bytes = bytes.len(),
                body_fields = value.as_object().map(Map::len),
                "JSON body parsed"
            );
            return Ok(value);
        }

        if !self.form_fields.is_empty() {
            return Ok(Value::Object(self.form_fields.clone()));
        }

        if content_type.starts_with("application/x-www-form-urlencoded") {
            let bytes = self.body().bytes()?;
            let fields: Map<String, Value> = url::form_urlencoded::parse(&bytes)
                .map(|(k, v)| (k.into_owned(), Value::String(v.into_owned())))
                .collect();
            return Ok(Value::Object(fields));
        }

        Ok(Value::Null)
    }

    /// Parsed body, attributes and query parameters merged into one map.
    ///
    /// On key collisions attributes override the body and query parameters
    /// override both.
    ///
    /// # Errors
    ///
    /// Propagates [`Request::parsed_body`] failures.
    pub fn all(&self) -> Result<Map<String, Value>, HttpError> {
        let mut merged = match self.parsed_body()? {
            Value::Object(fields) => fields.clone(),
            _ => Map::new(),
        };
        for (name, value) in &self.attributes {
            merged.insert(name.clone(), value.clone());
        }
        for (name, value) in &self.query_params {
            merged.insert(name.clone(), Value::String(value.clone()));
        }
        Ok(merged)
    }

    /// Single value from [`Request::all`].
    ///
    /// # Errors
    ///
    /// Propagates [`Request::parsed_body`] failures.
    pub fn input(&self, name: &str) -> Result<Option<Value>, HttpError> {
        Ok(self.all()?.remove(name))
    }

    /// Like [`Request::input`] but a missing key is an error.
    ///
    /// # Errors
    ///
    /// [`HttpError::PropertyNotFound`] when no input carries `name`.
    pub fn require(&self, name: &str) -> Result<Value, HttpError> {
        self.input(name)?.ok_or_else(|| HttpError::PropertyNotFound {
            name: name.to_string(),
        })
    }

    #[must_use]
    pub fn with_method(&self, method: Method) -> Self {
        let mut next = self.clone();
        next.method = method;
        next
    }

    /// Replace the URI.
    ///
    /// The `Host` header is updated from the new URI's host unless
    /// `preserve_host` is set and the request already carries a non-empty `Host`.
    /// Query parameters are left as they are.
    #[must_use]
    pub fn with_uri(&self, uri: Uri, preserve_host: bool) -> Self {
        let mut next = self.clone();
        let has_host = !next.header_line("host").is_empty();
        if !uri.host().is_empty() && (!preserve_host || !has_host) {
            let host = match uri.port() {
                Some(port) => format!("{}:{port}", uri.host()),
                None => uri.host().to_string(),
            };
            next.message.headers.set("Host", vec![host]);
        }
        next.uri = uri;
        next
    }

    #[must_use]
    pub fn with_request_target(&self, target: &str) -> Self {
        let mut next = self.clone();
        next.request_target = Some(target.to_string());
        next
    }

    #[must_use]
    pub fn with_query_params(&self, params: HashMap<String, String>) -> Self {
        let mut next = self.clone();
        next.query_params = params;
        next
    }

    #[must_use]
    pub fn with_cookie_params(&self, cookies: HashMap<String, String>) -> Self {
        let mut next = self.clone();
        next.cookies = cookies;
        next
    }

    #[must_use]
    pub fn with_uploaded_files(&self, files: HashMap<String, UploadedFile>) -> Self {
        let mut next = self.clone();
        next.uploaded_files = files;
        next
    }

    #[must_use]
    pub fn with_parsed_body(&self, body: Value) -> Self {
        let mut next = self.clone();
        next.parsed_body = OnceCell::with_value(body);
        next
    }

    #[must_use]
    pub fn with_attribute(&self, name: &str, value: impl Into<Value>) -> Self {
        let mut next = self.clone();
        next.attributes.insert(name.to_string(), value.into());
        next
    }

    /// Merge `attributes` in; existing names are overwritten.
    #[must_use]
    pub fn with_attributes(&self, attributes: Map<String, Value>) -> Self {
        let mut next = self.clone();
        next.attributes.extend(attributes);
        next
    }

    /// Remove an attribute; absent names are ignored.
    #[must_use]
    pub fn without_attribute(&self, name: &str) -> Self {
        let mut next = self.clone();
        next.attributes.remove(name);
        next
    }
}

/// Decode a raw query string. Repeated keys keep the last value.
fn parse_query(query: &str) -> HashMap<String, String> {
    url::form_urlencoded::parse(query.as_bytes())
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect()
}

/// Uppercased method; bytes that cannot appear in a method token become `_`.
fn method_from_environment(raw: &str) -> Method {
    if raw.is_empty() {
        return Method::GET;
    }
    let upper = raw.to_ascii_uppercase();
    if let Ok(method) = Method::from_bytes(upper.as_bytes()) {
        return method;
    }
    let token: String = upper
        .chars()
        .map(|c| if is_token_char(c) { c } else { '_' })
        .collect();
    warn!(method = %raw, sanitized = %token, "Request method is not a valid token");
    // every byte is now a token character, so this cannot fail
    Method::from_bytes(token.as_bytes()).unwrap_or(Method::CONNECT)
}

fn is_token_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || "!#$%&'*+-.^_`|~".contains(c)
}
