//! URI value type.
//!
//! [`Uri`] holds already-split components. It never performs network access
//! and never re-reads the environment; values come either from [`str::parse`]
//! or from a transport snapshot at construction time.

use std::fmt;
use std::str::FromStr;

use crate::error::HttpError;

/// Port that is elided from the authority.
const DEFAULT_PORT: u16 = 80;

/// Immutable URI made of scheme, authority, path, query and fragment.
///
/// Scheme and host are stored lowercase and port `80` is stored as unset.
/// Every `with_*` method returns a new value and leaves the receiver untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Uri {
    scheme: String,
    user_info: String,
    host: String,
    port: Option<u16>,
    path: String,
    query: String,
    fragment: String,
}

impl Uri {
    #[must_use]
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    #[must_use]
    pub fn user_info(&self) -> &str {
        &self.user_info
    }

    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    #[must_use]
    pub fn port(&self) -> Option<u16> {
        self.port
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    #[must_use]
    pub fn query(&self) -> &str {
        &self.query
    }

    #[must_use]
    pub fn fragment(&self) -> &str {
        &self.fragment
    }

    /// `[userinfo@]host[:port]`, or an empty string when there is no host.
    #[must_use]
    pub fn authority(&self) -> String {
        if self.host.is_empty() {
            return String::new();
        }
        let mut authority = String::with_capacity(self.user_info.len() + self.host.len() + 7);
        if !self.user_info.is_empty() {
            authority.push_str(&self.user_info);
            authority.push('@');
        }
        authority.push_str(&self.host);
        if let Some(port) = self.port {
            authority.push(':');
            authority.push_str(&port.to_string());
        }
        authority
    }

    #[must_use]
    pub fn with_scheme(&self, scheme: &str) -> Self {
        Self {
            scheme: scheme.to_ascii_lowercase(),
            ..self.clone()
        }
    }

    /// Replace the user info; `password` is appended after a colon when given.
    #[must_use]
    pub fn with_user_info(&self, user: &str, password: Option<&str>) -> Self {
        let user_info = match password {
            Some(password) if !user.is_empty() => format!("{user}:{password}"),
            _ => user.to_string(),
        };
        Self {
            user_info,
            ..self.clone()
        }
    }

    #[must_use]
    pub fn with_host(&self, host: &str) -> Self {
        Self {
            host: host.to_ascii_lowercase(),
            ..self.clone()
        }
    }

    #[must_use]
    pub fn with_port(&self, port: Option<u16>) -> Self {
        Self {
            port: normalize_port(port),
            ..self.clone()
        }
    }

    #[must_use]
    pub fn with_path(&self, path: &str) -> Self {
        Self {
            path: path.to_string(),
            ..self.clone()
        }
    }

    #[must_use]
    pub fn with_query(&self, query: &str) -> Self {
        Self {
            query: query.trim_start_matches('?').to_string(),
            ..self.clone()
        }
    }

    #[must_use]
    pub fn with_fragment(&self, fragment: &str) -> Self {
        Self {
            fragment: fragment.trim_start_matches('#').to_string(),
            ..self.clone()
        }
    }

    fn parse_origin_form(raw: &str) -> Self {
        let (rest, fragment) = raw.split_once('#').unwrap_or((raw, ""));
        let (path, query) = rest.split_once('?').unwrap_or((rest, ""));
        Self {
            path: path.to_string(),
            query: query.to_string(),
            fragment: fragment.to_string(),
            ..Self::default()
        }
    }
}

fn normalize_port(port: Option<u16>) -> Option<u16> {
    port.filter(|p| *p != DEFAULT_PORT)
}

/// Whether `raw` starts with `scheme://`, as opposed to a path that merely
/// mentions one in its query or fragment.
fn has_scheme_prefix(raw: &str) -> bool {
    match raw.find("://") {
        Some(0) | None => false,
        Some(idx) => !raw[..idx].contains(|c: char| matches!(c, '/' | '?' | '#')),
    }
}

/// Explicit port from a raw authority (`[userinfo@]host[:port]`).
fn raw_port(authority: &str) -> Option<u16> {
    let host_port = authority.rsplit_once('@').map_or(authority, |(_, hp)| hp);
    let port = match host_port.rfind(']') {
        // bracketed IPv6 literal
        Some(end) => host_port[end + 1..].strip_prefix(':')?,
        None => host_port.rsplit_once(':')?.1,
    };
    port.parse().ok()
}

impl FromStr for Uri {
    type Err = HttpError;

    /// Absolute URIs (`scheme://...`) are validated with the `url` crate, which
    /// also supplies the lowercased host. Port, path, query and fragment are
    /// taken from the input as written, so default ports other than 80 and
    /// dot segments survive. Anything else is origin-form
    /// (`/path?query#fragment`).
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        if !has_scheme_prefix(raw) {
            return Ok(Self::parse_origin_form(raw));
        }

        let parsed = url::Url::parse(raw).map_err(|e| HttpError::InvalidUri {
            uri: raw.to_string(),
            reason: e.to_string(),
        })?;

        let (scheme, rest) = raw.split_once("://").unwrap_or((raw, ""));
        let authority_end = rest
            .find(|c: char| matches!(c, '/' | '?' | '#'))
            .unwrap_or(rest.len());
        let (authority, target) = rest.split_at(authority_end);
        let user_info = authority
            .rsplit_once('@')
            .map_or("", |(user_info, _)| user_info);

        let target = Self::parse_origin_form(target);
        let path = if target.path.is_empty() {
            "/".to_string()
        } else {
            target.path
        };

        Ok(Self {
            scheme: scheme.to_ascii_lowercase(),
            user_info: user_info.to_string(),
            host: parsed.host_str().unwrap_or_default().to_ascii_lowercase(),
            port: normalize_port(raw_port(authority)),
            path,
            query: target.query,
            fragment: target.fragment,
        })
    }
}

impl fmt::Display for Uri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let authority = self.authority();
        if !self.scheme.is_empty() {
            write!(f, "{}://", self.scheme)?;
        } else if !authority.is_empty() {
            f.write_str("//")?;
        }
        f.write_str(&authority)?;
        write!(f, "/{}", self.path.trim_start_matches('/'))?;
        if !self.query.is_empty() {
            write!(f, "?{}", self.query)?;
        }
        if !self.fragment.is_empty() {
            write!(f, "#{}", self.fragment)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_absolute_uri() {
        let uri: Uri = "HTTP://Bob:pw@Example.COM:8080/a/b?x=1#top".parse().unwrap();
        assert_eq!(uri.scheme(), "http");
        assert_eq!(uri.host(), "example.com");
        assert_eq!(uri.user_info(), "Bob:pw");
        assert_eq!(uri.port(), Some(8080));
        assert_eq!(uri.path(), "/a/b");
        assert_eq!(uri.query(), "x=1");
        assert_eq!(uri.fragment(), "top");
        assert_eq!(uri.authority(), "Bob:pw@example.com:8080");
    }

    #[test]
    fn parses_origin_form() {
        let uri: Uri = "/user/42?tab=posts#c1".parse().unwrap();
        assert_eq!(uri.path(), "/user/42");
        assert_eq!(uri.query(), "tab=posts");
        assert_eq!(uri.fragment(), "c1");
        assert_eq!(uri.authority(), "");
        assert_eq!(uri.to_string(), "/user/42?tab=posts#c1");
    }

    #[test]
    fn port_80_is_elided() {
        let uri = Uri::default().with_host("example.com").with_port(Some(80));
        assert_eq!(uri.port(), None);
        assert_eq!(uri.authority(), "example.com");

        let uri = uri.with_port(Some(8443));
        assert_eq!(uri.authority(), "example.com:8443");
    }

    #[test]
    fn with_methods_replace_one_field() {
        let original: Uri = "https://example.com/a?q=1".parse().unwrap();
        let changed = original.with_path("/b");
        assert_eq!(original.path(), "/a");
        assert_eq!(changed.path(), "/b");
        assert_eq!(changed.query(), "q=1");
        assert_eq!(changed.host(), "example.com");
        assert_eq!(changed.scheme(), "https");
    }

    #[test]
    fn path_is_reanchored_with_one_slash() {
        let uri = Uri::default()
            .with_scheme("https")
            .with_host("Example.com")
            .with_path("///docs/intro");
        assert_eq!(uri.to_string(), "https://example.com/docs/intro");

        let uri = uri.with_path("docs");
        assert_eq!(uri.to_string(), "https://example.com/docs");
    }

    #[test]
    fn absolute_url_in_query_stays_origin_form() {
        let uri: Uri = "/login?next=https://example.com/home".parse().unwrap();
        assert_eq!(uri.path(), "/login");
        assert_eq!(uri.query(), "next=https://example.com/home");
        assert_eq!(uri.host(), "");
    }

    #[test]
    fn only_port_80_is_dropped() {
        let uri: Uri = "https://example.com:443/a".parse().unwrap();
        assert_eq!(uri.port(), Some(443));
        assert_eq!(uri.authority(), "example.com:443");

        let uri: Uri = "http://example.com:80/a".parse().unwrap();
        assert_eq!(uri.port(), None);

        let uri: Uri = "http://[::1]:8080/".parse().unwrap();
        assert_eq!(uri.host(), "[::1]");
        assert_eq!(uri.port(), Some(8080));
    }

    #[test]
    fn path_is_kept_as_supplied() {
        let uri: Uri = "http://example.com/a/../b".parse().unwrap();
        assert_eq!(uri.path(), "/a/../b");

        let uri: Uri = "http://example.com?x=1".parse().unwrap();
        assert_eq!(uri.path(), "/");
        assert_eq!(uri.query(), "x=1");
    }

    #[test]
    fn invalid_absolute_uri_is_rejected() {
        let err = "http://exa mple.com/".parse::<Uri>().unwrap_err();
        assert!(matches!(err, HttpError::InvalidUri { .. }));
    }
}
