//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the server.
//! All types derive Serde traits for deserialization from config files.

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration for the push server.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServerConfig {
    /// Listener configuration (ports, TLS, connection limit).
    pub listener: ListenerConfig,

    /// Plain-to-secure redirect rules.
    pub redirect: RedirectConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Decoder size limits.
    pub limits: LimitsConfig,

    /// Event-stream settings.
    pub sse: SseConfig,

    /// Static file serving.
    pub static_files: StaticFilesConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Interface both listeners bind to.
    pub bind_host: IpAddr,

    /// Port of the plain listener.
    pub plain_port: u16,

    /// Optional TLS configuration; enables the secure listener.
    pub tls: Option<TlsConfig>,

    /// Maximum concurrent connections per listener (backpressure).
    pub max_connections: usize,

    /// Value of the `Server` response header.
    pub server_name: String,
}

impl ListenerConfig {
    pub fn plain_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_host, self.plain_port)
    }

    pub fn secure_addr(&self) -> Option<SocketAddr> {
        self.tls
            .as_ref()
            .map(|tls| SocketAddr::new(self.bind_host, tls.port))
    }
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_host: IpAddr::from([0, 0, 0, 0]),
            plain_port: 8080,
            tls: None,
            max_connections: 10_000,
            server_name: "push-server".to_string(),
        }
    }
}

/// TLS configuration for the secure listener.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TlsConfig {
    /// Port of the secure listener.
    #[serde(default = "default_tls_port")]
    pub port: u16,

    /// Path to certificate chain file (PEM).
    pub cert_path: PathBuf,

    /// Path to private key file (PEM).
    pub key_path: PathBuf,

    /// Upper bound on the TLS handshake.
    #[serde(default = "default_handshake_timeout")]
    pub handshake_timeout_secs: u64,
}

impl TlsConfig {
    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_secs(self.handshake_timeout_secs)
    }
}

fn default_tls_port() -> u16 {
    8443
}

fn default_handshake_timeout() -> u64 {
    10
}

/// Routes that must only be served over the secure listener.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RedirectConfig {
    /// Path prefixes; plain requests under them are redirected.
    pub secure_only_routes: Vec<String>,

    /// Host used in the `Location` when the request has no `Host` header.
    pub public_host: String,
}

impl Default for RedirectConfig {
    fn default() -> Self {
        Self {
            secure_only_routes: Vec::new(),
            public_host: "localhost".to_string(),
        }
    }
}

/// Timeout configuration for various operations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// How long an idle keep-alive connection waits for the next request line.
    pub idle_secs: u64,

    /// Time allowed for headers and body once the request line arrived.
    pub request_secs: u64,

    /// Time allowed to write one response before the connection is dropped.
    pub write_secs: u64,

    /// Bound on one event-stream write during a broadcast, in milliseconds.
    pub sse_write_ms: u64,

    /// How long shutdown waits for in-flight sessions.
    pub shutdown_grace_secs: u64,
}

impl TimeoutConfig {
    pub fn idle(&self) -> Duration {
        Duration::from_secs(self.idle_secs)
    }

    pub fn request(&self) -> Duration {
        Duration::from_secs(self.request_secs)
    }

    pub fn write(&self) -> Duration {
        Duration::from_secs(self.write_secs)
    }

    pub fn sse_write(&self) -> Duration {
        Duration::from_millis(self.sse_write_ms)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            idle_secs: 30,
            request_secs: 30,
            write_secs: 30,
            sse_write_ms: 5_000,
            shutdown_grace_secs: 10,
        }
    }
}

/// Size limits enforced by the request decoder.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Longest accepted request line or header line, in bytes.
    pub max_line_bytes: usize,

    /// Most header fields accepted per request.
    pub max_headers: usize,

    /// Largest accepted `Content-Length`.
    pub max_body_bytes: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_line_bytes: 8 * 1024,
            max_headers: 100,
            max_body_bytes: 2 * 1024 * 1024,
        }
    }
}

/// Event-stream configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SseConfig {
    /// Interval between comment heartbeats; 0 disables them.
    pub heartbeat_secs: u64,
}

impl SseConfig {
    pub fn heartbeat(&self) -> Option<Duration> {
        (self.heartbeat_secs > 0).then(|| Duration::from_secs(self.heartbeat_secs))
    }
}

impl Default for SseConfig {
    fn default() -> Self {
        Self { heartbeat_secs: 15 }
    }
}

/// Static file handler configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StaticFilesConfig {
    /// Directory files are served from.
    pub root: PathBuf,

    /// File served for directory targets.
    pub index: String,
}

impl Default for StaticFilesConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("./www"),
            index: "index.html".to_string(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log filter (trace, debug, info, warn, error, or an EnvFilter directive).
    pub log_level: String,

    /// Human-readable or JSON log lines.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_defaults() {
        let config: ServerConfig = toml::from_str("").unwrap();
        assert_eq!(config.listener.plain_port, 8080);
        assert!(config.listener.tls.is_none());
        assert_eq!(config.limits.max_headers, 100);
        assert_eq!(config.sse.heartbeat(), Some(Duration::from_secs(15)));
        assert_eq!(config.observability.log_format, LogFormat::Pretty);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config: ServerConfig = toml::from_str(
            r#"
            [listener]
            plain_port = 9000

            [listener.tls]
            cert_path = "certs/cert.pem"
            key_path = "certs/key.pem"

            [redirect]
            secure_only_routes = ["/api", "/account"]

            [sse]
            heartbeat_secs = 0

            [observability]
            log_format = "json"
            "#,
        )
        .unwrap();

        assert_eq!(config.listener.plain_port, 9000);
        assert_eq!(config.listener.max_connections, 10_000);
        let tls = config.listener.tls.as_ref().unwrap();
        assert_eq!(tls.port, 8443);
        assert_eq!(tls.handshake_timeout(), Duration::from_secs(10));
        assert_eq!(
            config.listener.secure_addr(),
            Some("0.0.0.0:8443".parse().unwrap())
        );
        assert_eq!(config.redirect.secure_only_routes, vec!["/api", "/account"]);
        assert_eq!(config.redirect.public_host, "localhost");
        assert_eq!(config.sse.heartbeat(), None);
        assert_eq!(config.observability.log_format, LogFormat::Json);
    }

    #[test]
    fn unknown_log_format_is_rejected() {
        let result: Result<ServerConfig, _> = toml::from_str("[observability]\nlog_format = \"xml\"");
        assert!(result.is_err());
    }
}
