//! Plain-to-secure redirection.
//!
//! # Design Decisions
//! - Only requests on the plain listener are ever redirected
//! - Prefixes match case-insensitively on segment boundaries
//! - The `Location` keeps the original target, query included
//! - The host comes from the `Host` header (port stripped), else the
//!   configured public host

use crate::config::ServerConfig;
use crate::http::Scheme;

/// Decides whether a request must move to the secure listener.
#[derive(Debug, Clone, Default)]
pub struct Redirector {
    secure_only: Vec<String>,
    secure_port: Option<u16>,
    public_host: String,
}

impl Redirector {
    pub fn new(secure_only: Vec<String>, secure_port: Option<u16>, public_host: impl Into<String>) -> Self {
        let secure_only = secure_only
            .into_iter()
            .map(|prefix| {
                let trimmed = prefix.trim_end_matches('/').to_ascii_lowercase();
                if trimmed.is_empty() {
                    "/".to_string()
                } else {
                    trimmed
                }
            })
            .collect();
        Self {
            secure_only,
            secure_port,
            public_host: public_host.into(),
        }
    }

    pub fn from_config(config: &ServerConfig) -> Self {
        Self::new(
            config.redirect.secure_only_routes.clone(),
            config.listener.tls.as_ref().map(|tls| tls.port),
            config.redirect.public_host.clone(),
        )
    }

    /// Never redirects.
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Secure URL for `target` when it must not be served over `scheme`.
    pub fn should_redirect(&self, scheme: Scheme, target: &str, host: Option<&str>) -> Option<String> {
        if scheme != Scheme::Plain {
            return None;
        }
        let port = self.secure_port?;

        let end = target.find(|c| c == '?' || c == '#').unwrap_or(target.len());
        let path = target[..end].to_ascii_lowercase();
        if !self.secure_only.iter().any(|prefix| under_prefix(&path, prefix)) {
            return None;
        }

        let host = host
            .map(strip_port)
            .filter(|h| is_plain_host(h))
            .unwrap_or(self.public_host.as_str());
        let target = if target.starts_with('/') { target.to_string() } else { format!("/{target}") };
        Some(if port == 443 {
            format!("https://{host}{target}")
        } else {
            format!("https://{host}:{port}{target}")
        })
    }
}

fn under_prefix(path: &str, prefix: &str) -> bool {
    if prefix == "/" {
        return true;
    }
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

/// A host that can be pasted into a URL authority as is. Anything else falls
/// back to the configured public host.
fn is_plain_host(host: &str) -> bool {
    !host.is_empty()
        && !host
            .chars()
            .any(|c| c.is_control() || c.is_whitespace() || matches!(c, '/' | '\\' | '?' | '#' | '@'))
}

/// `example.com:8080` → `example.com`, `[::1]:8080` → `[::1]`.
fn strip_port(host: &str) -> &str {
    let host = host.trim();
    if host.starts_with('[') {
        return match host.find(']') {
            Some(end) => &host[..=end],
            None => host,
        };
    }
    match host.split_once(':') {
        Some((name, port)) if !port.contains(':') => name,
        _ => host,
    }
}
