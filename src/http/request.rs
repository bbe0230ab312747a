//! Parsed request model.
//!
//! # Responsibilities
//! - Hold the method, target, version, headers and body of one request
//! - Carry the connection facts the handlers need (peer, port, scheme)
//! - Derive cookies lazily from the `Cookie` header
//!
//! # Design Decisions
//! - Immutable once built by the codec
//! - Method and target tokens are kept exactly as received

use std::collections::HashMap;
use std::fmt;
use std::net::SocketAddr;
use std::sync::OnceLock;

use super::headers::Headers;

/// Request method. Unknown tokens are carried verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Head,
    Post,
    Put,
    Delete,
    Patch,
    Options,
    Extension(String),
}

impl Method {
    /// Map a request-line token to a method. Matching is case-sensitive.
    pub fn parse(token: &str) -> Self {
        match token {
            "GET" => Method::Get,
            "HEAD" => Method::Head,
            "POST" => Method::Post,
            "PUT" => Method::Put,
            "DELETE" => Method::Delete,
            "PATCH" => Method::Patch,
            "OPTIONS" => Method::Options,
            other => Method::Extension(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Method::Get => "GET",
            Method::Head => "HEAD",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
            Method::Patch => "PATCH",
            Method::Options => "OPTIONS",
            Method::Extension(token) => token,
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Protocol versions this server speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Version {
    Http10,
    #[default]
    Http11,
}

impl Version {
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "HTTP/1.0" => Some(Version::Http10),
            "HTTP/1.1" => Some(Version::Http11),
            _ => None,
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Version::Http10 => "HTTP/1.0",
            Version::Http11 => "HTTP/1.1",
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Transport a connection arrived on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scheme {
    Plain,
    Secure,
}

impl Scheme {
    /// URL scheme name.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Scheme::Plain => "http",
            Scheme::Secure => "https",
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Facts about the connection a request was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionInfo {
    pub client_addr: SocketAddr,
    pub server_port: u16,
    pub scheme: Scheme,
}

/// Request line and header section, before the body is read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestHead {
    pub method: Method,
    pub target: String,
    pub version: Version,
    pub headers: Headers,
}

/// A fully read HTTP request.
#[derive(Debug, Clone)]
pub struct Request {
    head: RequestHead,
    body: Vec<u8>,
    connection: ConnectionInfo,
    cookies: OnceLock<HashMap<String, String>>,
}

impl Request {
    pub fn new(head: RequestHead, body: Vec<u8>, connection: ConnectionInfo) -> Self {
        Self {
            head,
            body,
            connection,
            cookies: OnceLock::new(),
        }
    }

    pub fn method(&self) -> &Method {
        &self.head.method
    }

    /// Request target exactly as sent, including any query string.
    pub fn target(&self) -> &str {
        &self.head.target
    }

    /// Target without query string or fragment.
    pub fn path(&self) -> &str {
        let target = self.head.target.as_str();
        let end = target
            .find(|c| c == '?' || c == '#')
            .unwrap_or(target.len());
        &target[..end]
    }

    /// Query string without the leading `?`.
    pub fn query(&self) -> Option<&str> {
        let target = self.head.target.as_str();
        let start = target.find('?')? + 1;
        let end = target.find('#').filter(|&i| i >= start).unwrap_or(target.len());
        Some(&target[start..end])
    }

    pub fn version(&self) -> Version {
        self.head.version
    }

    pub fn headers(&self) -> &Headers {
        &self.head.headers
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.head.headers.get(name)
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn client_addr(&self) -> SocketAddr {
        self.connection.client_addr
    }

    pub fn server_port(&self) -> u16 {
        self.connection.server_port
    }

    pub fn scheme(&self) -> Scheme {
        self.connection.scheme
    }

    /// Whether the client asked for the connection to stay open.
    ///
    /// HTTP/1.1 defaults to persistent unless `Connection: close`;
    /// HTTP/1.0 defaults to close unless `Connection: keep-alive`.
    pub fn wants_keep_alive(&self) -> bool {
        let headers = &self.head.headers;
        match self.head.version {
            Version::Http11 => !headers.has_token("Connection", "close"),
            Version::Http10 => headers.has_token("Connection", "keep-alive"),
        }
    }

    /// Cookies sent in the `Cookie` header, parsed on first use.
    pub fn cookies(&self) -> &HashMap<String, String> {
        self.cookies
            .get_or_init(|| parse_cookies(self.head.headers.get("Cookie").unwrap_or("")))
    }

    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies().get(name).map(String::as_str)
    }
}

/// Parse `a=1; b=2` into a map. Pairs without `=` are skipped.
fn parse_cookies(header: &str) -> HashMap<String, String> {
    header
        .split(';')
        .filter_map(|pair| {
            let (name, value) = pair.trim().split_once('=')?;
            let name = name.trim();
            if name.is_empty() {
                return None;
            }
            Some((name.to_string(), value.trim().to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(version: Version, headers: &[(&str, &str)], target: &str) -> Request {
        let head = RequestHead {
            method: Method::Get,
            target: target.to_string(),
            version,
            headers: headers.iter().copied().collect(),
        };
        let connection = ConnectionInfo {
            client_addr: "127.0.0.1:50000".parse().unwrap(),
            server_port: 8080,
            scheme: Scheme::Plain,
        };
        Request::new(head, Vec::new(), connection)
    }

    #[test]
    fn method_tokens_round_trip() {
        for token in ["GET", "HEAD", "POST", "PUT", "DELETE", "PATCH", "OPTIONS", "BREW", "get"] {
            assert_eq!(Method::parse(token).as_str(), token);
        }
        assert_eq!(Method::parse("get"), Method::Extension("get".into()));
    }

    #[test]
    fn versions() {
        assert_eq!(Version::parse("HTTP/1.0"), Some(Version::Http10));
        assert_eq!(Version::parse("HTTP/1.1"), Some(Version::Http11));
        assert_eq!(Version::parse("HTTP/2.0"), None);
    }

    #[test]
    fn keep_alive_defaults() {
        assert!(request(Version::Http11, &[], "/").wants_keep_alive());
        assert!(!request(Version::Http11, &[("Connection", "close")], "/").wants_keep_alive());
        assert!(!request(Version::Http10, &[], "/").wants_keep_alive());
        assert!(request(Version::Http10, &[("connection", "Keep-Alive")], "/").wants_keep_alive());
    }

    #[test]
    fn path_and_query() {
        let req = request(Version::Http11, &[], "/api/groups?id=4#top");
        assert_eq!(req.path(), "/api/groups");
        assert_eq!(req.query(), Some("id=4"));
        assert_eq!(req.target(), "/api/groups?id=4#top");

        let bare = request(Version::Http11, &[], "/index.html");
        assert_eq!(bare.path(), "/index.html");
        assert_eq!(bare.query(), None);
    }

    #[test]
    fn cookies_are_parsed_lazily_and_idempotently() {
        let req = request(
            Version::Http11,
            &[("Cookie", "session=abc; theme = dark ;flag; =orphan")],
            "/",
        );
        assert_eq!(req.cookie("session"), Some("abc"));
        assert_eq!(req.cookie("theme"), Some("dark"));
        assert_eq!(req.cookies().len(), 2);
        assert_eq!(req.cookies(), req.cookies());
    }

    #[test]
    fn no_cookie_header_means_no_cookies() {
        assert!(request(Version::Http11, &[], "/").cookies().is_empty());
    }
}
