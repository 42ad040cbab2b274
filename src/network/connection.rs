use crate::error::{MiniTelError, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio_rustls::rustls::pki_types::ServerName;
use tokio_rustls::rustls::{ClientConfig, RootCertStore};
use tokio_rustls::TlsConnector;
use tracing::{debug, info, instrument, warn};

/// Any byte stream a session can run over: plain TCP, TLS, or an in-memory
/// pipe in tests.
pub trait Transport: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> Transport for T {}

pub type BoxedTransport = Box<dyn Transport>;

/// Where and how to reach the server.
#[derive(Debug, Clone)]
pub struct ConnectTarget {
    pub host: String,
    pub port: u16,
    pub tls: bool,
    pub connect_timeout: Duration,
}

impl ConnectTarget {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Open a TCP connection, wrapped in TLS when requested.
#[instrument(level = "debug", skip(target), fields(address = %target.address(), tls = target.tls))]
pub async fn open_transport(target: &ConnectTarget) -> Result<BoxedTransport> {
    let timeout = target.connect_timeout;
    match tokio::time::timeout(timeout, open_transport_unbounded(target)).await {
        Ok(result) => result,
        Err(_elapsed) => {
            warn!(timeout = ?timeout, "Connection attempt timed out");
            Err(MiniTelError::ConnectionTimeout { timeout })
        }
    }
}

async fn open_transport_unbounded(target: &ConnectTarget) -> Result<BoxedTransport> {
    debug!("Connecting to {}", target.address());
    let stream = TcpStream::connect((target.host.as_str(), target.port))
        .await
        .map_err(|e| {
            MiniTelError::connection(format!("failed to connect to {}: {}", target.address(), e))
        })?;

    if let Err(e) = stream.set_nodelay(true) {
        warn!(error = %e, "Failed to disable Nagle's algorithm");
    }

    if !target.tls {
        info!("Connected to {}", target.address());
        return Ok(Box::new(stream));
    }

    debug!("Upgrading connection to TLS");
    let connector = tls_connector()?;
    let server_name = ServerName::try_from(target.host.clone()).map_err(|e| {
        MiniTelError::connection(format!("invalid TLS server name '{}': {}", target.host, e))
    })?;
    let tls_stream = connector
        .connect(server_name, stream)
        .await
        .map_err(|e| MiniTelError::connection(format!("TLS handshake failed: {}", e)))?;

    info!("Connected to {} over TLS", target.address());
    Ok(Box::new(tls_stream))
}

/// TLS client configuration trusting the platform's root certificates.
fn tls_connector() -> Result<TlsConnector> {
    let native = rustls_native_certs::load_native_certs();
    for e in &native.errors {
        warn!(error = %e, "Failed to load a native root certificate");
    }

    let mut roots = RootCertStore::empty();
    let (added, ignored) = roots.add_parsable_certificates(native.certs);
    debug!(added, ignored, "Loaded native root certificates");

    if roots.is_empty() {
        return Err(MiniTelError::connection(
            "no trusted root certificates available for TLS",
        ));
    }

    let config = ClientConfig::builder()
        .with_root_certificates(roots)
        .with_no_client_auth();
    Ok(TlsConnector::from(Arc::new(config)))
}
