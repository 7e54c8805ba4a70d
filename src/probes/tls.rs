//! TLS handshake verification shared by the TCP and HTTPS probes

use crate::error::{AppError, Result};
use crate::models::TlsInfo;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_rustls::rustls::{self, pki_types::ServerName, ClientConfig, ProtocolVersion, RootCertStore};
use tokio_rustls::TlsConnector;

/// rustls connector with the Mozilla root set, full chain and hostname checks
#[derive(Clone)]
pub struct TlsVerifier {
    connector: TlsConnector,
}

impl TlsVerifier {
    pub fn new() -> Result<Self> {
        let mut roots = RootCertStore::empty();
        roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

        let config = ClientConfig::builder_with_provider(Arc::new(rustls::crypto::ring::default_provider()))
            .with_safe_default_protocol_versions()
            .map_err(|e| AppError::tls(format!("Failed to build TLS configuration: {}", e)))?
            .with_root_certificates(roots)
            .with_no_client_auth();

        Ok(Self {
            connector: TlsConnector::from(Arc::new(config)),
        })
    }

    /// Handshake over an established connection. Every failure is a TLS error.
    pub async fn handshake(&self, stream: TcpStream, host: &str) -> Result<TlsInfo> {
        let server_name = ServerName::try_from(host.to_string())
            .map_err(|e| AppError::tls(format!("Invalid server name '{}': {}", host, e)))?;

        let tls_stream = self
            .connector
            .connect(server_name, stream)
            .await
            .map_err(|e| AppError::tls(format!("handshake with {} failed: {}", host, e)))?;

        let version = tls_stream.get_ref().1.protocol_version().map(describe_version);
        Ok(TlsInfo {
            version,
            cert_valid: true,
        })
    }

    /// Connect to `host:port` and verify its certificate, bounded by `timeout`.
    ///
    /// Connect failures come back as network errors, handshake failures as
    /// TLS errors.
    pub async fn verify(&self, host: &str, port: u16, timeout: Duration) -> Result<TlsInfo> {
        let attempt = async {
            let stream = TcpStream::connect((host, port)).await.map_err(AppError::from)?;
            self.handshake(stream, host).await
        };

        tokio::time::timeout(timeout, attempt).await.map_err(|_| {
            AppError::timeout(format!(
                "TLS verification of {}:{} timed out after {}s",
                host,
                port,
                timeout.as_secs_f64()
            ))
        })?
    }
}

pub fn describe_version(version: ProtocolVersion) -> String {
    match version {
        ProtocolVersion::TLSv1_3 => "TLSv1.3".to_string(),
        ProtocolVersion::TLSv1_2 => "TLSv1.2".to_string(),
        other => format!("{:?}", other),
    }
}
