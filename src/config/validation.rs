//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, ports valid, limits > 0)
//! - Check that redirect rules have a secure listener to point at
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServerConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::fmt;
use std::net::SocketAddr;

use super::schema::ServerConfig;

/// One semantic problem with a configuration value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Check `config` for semantic errors.
pub fn validate_config(config: &ServerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.max_connections == 0 {
        errors.push(ValidationError::new("listener.max_connections", "must be greater than 0"));
    }
    if config.listener.server_name.trim().is_empty() {
        errors.push(ValidationError::new("listener.server_name", "must not be empty"));
    }

    if let Some(tls) = &config.listener.tls {
        if tls.port != 0 && tls.port == config.listener.plain_port {
            errors.push(ValidationError::new(
                "listener.tls.port",
                format!("must differ from listener.plain_port ({})", tls.port),
            ));
        }
        if tls.cert_path.as_os_str().is_empty() {
            errors.push(ValidationError::new("listener.tls.cert_path", "must not be empty"));
        }
        if tls.key_path.as_os_str().is_empty() {
            errors.push(ValidationError::new("listener.tls.key_path", "must not be empty"));
        }
        if tls.handshake_timeout_secs == 0 {
            errors.push(ValidationError::new(
                "listener.tls.handshake_timeout_secs",
                "must be greater than 0",
            ));
        }
    }

    if !config.redirect.secure_only_routes.is_empty() && config.listener.tls.is_none() {
        errors.push(ValidationError::new(
            "redirect.secure_only_routes",
            "requires [listener.tls] to redirect to",
        ));
    }
    for route in &config.redirect.secure_only_routes {
        if !route.starts_with('/') {
            errors.push(ValidationError::new(
                "redirect.secure_only_routes",
                format!("{route:?} must start with '/'"),
            ));
        }
    }
    if config.redirect.public_host.trim().is_empty() {
        errors.push(ValidationError::new("redirect.public_host", "must not be empty"));
    }

    let timeouts = &config.timeouts;
    for (field, value) in [
        ("timeouts.idle_secs", timeouts.idle_secs),
        ("timeouts.request_secs", timeouts.request_secs),
        ("timeouts.write_secs", timeouts.write_secs),
        ("timeouts.sse_write_ms", timeouts.sse_write_ms),
    ] {
        if value == 0 {
            errors.push(ValidationError::new(field, "must be greater than 0"));
        }
    }

    let limits = &config.limits;
    for (field, value) in [
        ("limits.max_line_bytes", limits.max_line_bytes),
        ("limits.max_headers", limits.max_headers),
    ] {
        if value == 0 {
            errors.push(ValidationError::new(field, "must be greater than 0"));
        }
    }

    if config.static_files.index.contains('/') || config.static_files.index.is_empty() {
        errors.push(ValidationError::new(
            "static_files.index",
            "must be a plain file name",
        ));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("{:?} is not a socket address", config.observability.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::TlsConfig;

    fn tls(port: u16) -> TlsConfig {
        TlsConfig {
            port,
            cert_path: "cert.pem".into(),
            key_path: "key.pem".into(),
            handshake_timeout_secs: 10,
        }
    }

    #[test]
    fn defaults_are_valid() {
        assert!(validate_config(&ServerConfig::default()).is_ok());
    }

    #[test]
    fn redirect_requires_tls() {
        let mut config = ServerConfig::default();
        config.redirect.secure_only_routes = vec!["/api".into()];
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "redirect.secure_only_routes");

        config.listener.tls = Some(tls(8443));
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn collects_every_error() {
        let mut config = ServerConfig::default();
        config.listener.tls = Some(tls(8080));
        config.redirect.secure_only_routes = vec!["api".into()];
        config.timeouts.idle_secs = 0;
        config.limits.max_headers = 0;
        config.observability.metrics_enabled = true;
        config.observability.metrics_address = "nowhere".into();

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
        assert_eq!(
            fields,
            vec![
                "listener.tls.port",
                "redirect.secure_only_routes",
                "timeouts.idle_secs",
                "limits.max_headers",
                "observability.metrics_address",
            ]
        );
    }

    #[test]
    fn error_display_names_the_field() {
        let err = ValidationError::new("timeouts.idle_secs", "must be greater than 0");
        assert_eq!(err.to_string(), "timeouts.idle_secs: must be greater than 0");
    }
}
