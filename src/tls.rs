//! TLS settings for mock servers.

use crate::error::{Error, Result};
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// A server side TLS configuration.
#[derive(Clone)]
pub struct TlsConfig(Arc<rustls::ServerConfig>);

impl TlsConfig {
    /// Use an already built rustls configuration.
    pub fn new(config: Arc<rustls::ServerConfig>) -> Self {
        TlsConfig(config)
    }

    /// Load a PEM certificate chain and private key from files.
    pub fn from_pem_files(cert_path: impl AsRef<Path>, key_path: impl AsRef<Path>) -> Result<Self> {
        let (cert_path, key_path) = (cert_path.as_ref(), key_path.as_ref());
        let cert_pem = std::fs::read(cert_path).map_err(|e| {
            Error::Tls(format!(
                "failed to read certificate file '{}': {}",
                cert_path.display(),
                e
            ))
        })?;
        let key_pem = std::fs::read(key_path).map_err(|e| {
            Error::Tls(format!(
                "failed to read private key file '{}': {}",
                key_path.display(),
                e
            ))
        })?;
        Self::from_pem(&cert_pem, &key_pem)
    }

    /// Build from an in-memory PEM certificate chain and private key.
    pub fn from_pem(cert_pem: &[u8], key_pem: &[u8]) -> Result<Self> {
        let certs: Vec<CertificateDer<'static>> = rustls_pemfile::certs(&mut &cert_pem[..])
            .collect::<std::result::Result<_, _>>()
            .map_err(|e| Error::Tls(format!("failed to parse certificate: {}", e)))?;
        if certs.is_empty() {
            return Err(Error::Tls("no certificate found".to_owned()));
        }

        let key: PrivateKeyDer<'static> = rustls_pemfile::private_key(&mut &key_pem[..])
            .map_err(|e| Error::Tls(format!("failed to parse private key: {}", e)))?
            .ok_or_else(|| Error::Tls("no private key found".to_owned()))?;

        let provider = Arc::new(rustls::crypto::ring::default_provider());
        let mut config = rustls::ServerConfig::builder_with_provider(provider)
            .with_safe_default_protocol_versions()
            .map_err(|e| Error::Tls(e.to_string()))?
            .with_no_client_auth()
            .with_single_cert(certs, key)
            .map_err(|e| Error::Tls(e.to_string()))?;
        config.alpn_protocols = vec![b"h2".to_vec(), b"http/1.1".to_vec()];
        Ok(TlsConfig(Arc::new(config)))
    }

    pub(crate) fn acceptor(&self) -> tokio_rustls::TlsAcceptor {
        tokio_rustls::TlsAcceptor::from(self.0.clone())
    }
}

impl fmt::Debug for TlsConfig {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("TlsConfig")
            .field("alpn_protocols", &self.0.alpn_protocols.len())
            .finish()
    }
}
