//! TLS configuration, certificate loading, and the handshake acceptor.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use axum_server::accept::Accept;
use axum_server::tls_rustls::{RustlsAcceptor, RustlsConfig};
use thiserror::Error;
use tokio::net::TcpStream;

use crate::config::TlsConfig;

/// Stream produced by a completed handshake.
pub type TlsStream = <RustlsAcceptor as Accept<TcpStream, ()>>::Stream;

#[derive(Debug, Error)]
pub enum TlsError {
    #[error("Certificate file not found: {0:?}")]
    MissingCertificate(PathBuf),

    #[error("Private key file not found: {0:?}")]
    MissingKey(PathBuf),

    #[error("Failed to load TLS material: {0}")]
    Load(#[from] io::Error),
}

/// Load TLS configuration from certificate and key files.
pub async fn load_tls_config(cert_path: &Path, key_path: &Path) -> Result<RustlsConfig, TlsError> {
    if !cert_path.exists() {
        return Err(TlsError::MissingCertificate(cert_path.to_path_buf()));
    }
    if !key_path.exists() {
        return Err(TlsError::MissingKey(key_path.to_path_buf()));
    }
    Ok(RustlsConfig::from_pem_file(cert_path, key_path).await?)
}

/// Performs server-side handshakes for the secure listener.
#[derive(Clone)]
pub struct TlsAcceptor {
    inner: RustlsAcceptor,
    handshake_timeout: Duration,
}

impl TlsAcceptor {
    pub fn new(config: RustlsConfig, handshake_timeout: Duration) -> Self {
        Self {
            inner: RustlsAcceptor::new(config).handshake_timeout(handshake_timeout),
            handshake_timeout,
        }
    }

    pub async fn from_config(config: &TlsConfig) -> Result<Self, TlsError> {
        let rustls = load_tls_config(&config.cert_path, &config.key_path).await?;
        tracing::info!(
            cert_path = %config.cert_path.display(),
            port = config.port,
            "TLS configuration loaded"
        );
        Ok(Self::new(rustls, config.handshake_timeout()))
    }

    /// Run the handshake on an accepted stream.
    pub async fn accept(&self, stream: TcpStream) -> io::Result<TlsStream> {
        let (stream, ()) = self.inner.accept(stream, ()).await?;
        Ok(stream)
    }
}

impl fmt::Debug for TlsAcceptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TlsAcceptor")
            .field("handshake_timeout", &self.handshake_timeout)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_files_are_reported() {
        let dir = tempfile::tempdir().unwrap();
        let cert = dir.path().join("cert.pem");
        let key = dir.path().join("key.pem");

        let err = load_tls_config(&cert, &key).await.unwrap_err();
        assert!(matches!(err, TlsError::MissingCertificate(p) if p == cert));

        std::fs::write(&cert, "not a certificate").unwrap();
        let err = load_tls_config(&cert, &key).await.unwrap_err();
        assert!(matches!(err, TlsError::MissingKey(p) if p == key));
    }

    #[tokio::test]
    async fn garbage_pem_fails_to_load() {
        let dir = tempfile::tempdir().unwrap();
        let cert = dir.path().join("cert.pem");
        let key = dir.path().join("key.pem");
        std::fs::write(&cert, "not a certificate").unwrap();
        std::fs::write(&key, "not a key").unwrap();

        assert!(matches!(
            load_tls_config(&cert, &key).await,
            Err(TlsError::Load(_))
        ));
    }
}
