use std::collections::HashMap;

use bytes::Bytes;
use tracing::debug;

use crate::http::UploadedFile;

/// Snapshot of everything the transport knows about one request.
///
/// This is the only input [`crate::http::Request::from_environment`] reads.
/// Server parameters use CGI-style names (`SERVER_PROTOCOL`, `REQUEST_METHOD`,
/// `REQUEST_URI`, ...).
#[derive(Debug, Clone, Default)]
pub struct Environment {
    pub method: String,
    pub scheme: String,
    pub host: String,
    pub port: Option<u16>,
    pub path: String,
    pub query: String,
    /// Header lines in arrival order; repeated names are kept.
    pub headers: Vec<(String, String)>,
    pub cookies: HashMap<String, String>,
    pub server: HashMap<String, String>,
    pub files: HashMap<String, UploadedFile>,
    /// Form fields the transport already decoded.
    pub form: HashMap<String, String>,
    pub body: Bytes,
}

impl From<http::Request<Bytes>> for Environment {
    fn from(request: http::Request<Bytes>) -> Self {
        let (parts, body) = request.into_parts();

        let mut headers = Vec::with_capacity(parts.headers.len());
        for (name, value) in &parts.headers {
            match value.to_str() {
                Ok(value) => headers.push((name.as_str().to_string(), value.to_string())),
                Err(_) => debug!(header = %name, "Skipping non-UTF-8 header value"),
            }
        }

        let host_header = headers
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case("host"))
            .map(|(_, value)| value.as_str());
        let (host, port) = match parts.uri.host() {
            Some(host) => (host.to_string(), parts.uri.port_u16()),
            None => host_header.map(split_host_port).unwrap_or_default(),
        };

        let cookies = headers
            .iter()
            .filter(|(name, _)| name.eq_ignore_ascii_case("cookie"))
            .flat_map(|(_, value)| parse_cookies(value))
            .collect();

        let path = parts.uri.path().to_string();
        let query = parts.uri.query().unwrap_or_default().to_string();

        let mut server = HashMap::new();
        server.insert("SERVER_PROTOCOL".to_string(), format!("{:?}", parts.version));
        server.insert("REQUEST_METHOD".to_string(), parts.method.as_str().to_string());
        server.insert(
            "REQUEST_URI".to_string(),
            parts
                .uri
                .path_and_query()
                .map_or_else(|| path.clone(), |pq| pq.as_str().to_string()),
        );
        server.insert("QUERY_STRING".to_string(), query.clone());
        if !host.is_empty() {
            server.insert("SERVER_NAME".to_string(), host.clone());
        }
        if let Some(port) = port {
            server.insert("SERVER_PORT".to_string(), port.to_string());
        }

        Environment {
            method: parts.method.as_str().to_string(),
            scheme: parts.uri.scheme_str().unwrap_or("http").to_string(),
            host,
            port,
            path,
            query,
            headers,
            cookies,
            server,
            files: HashMap::new(),
            form: HashMap::new(),
            body,
        }
    }
}

/// Split `host[:port]`; a suffix that is not a port stays part of the host.
fn split_host_port(value: &str) -> (String, Option<u16>) {
    match value.rsplit_once(':') {
        Some((host, port)) if !host.is_empty() && !host.ends_with(':') => match port.parse() {
            Ok(port) => (host.to_string(), Some(port)),
            Err(_) => (value.to_string(), None),
        },
        _ => (value.to_string(), None),
    }
}

/// Parse a `Cookie` header into name/value pairs; values are percent-decoded.
pub fn parse_cookies(header: &str) -> Vec<(String, String)> {
    header
        .split(';')
        .filter_map(|pair| {
            let mut parts = pair.trim().splitn(2, '=');
            let name = parts.next()?.trim();
            if name.is_empty() {
                return None;
            }
            let raw = parts.next().unwrap_or("").trim();
            let value = urlencoding::decode(raw).map_or_else(|_| raw.to_string(), |v| v.into_owned());
            Some((name.to_string(), value))
        })
        .collect()
}
