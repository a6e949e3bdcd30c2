//! TLS probe: handshake with the domain on port 443, classified by how it ends.
//!
//! Uses rustls so that the SNI extension is always sent in clear, which is
//! exactly what SNI-based filters key on.

use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, trace};
use rustls::crypto::CryptoProvider;
use rustls::{ClientConfig, RootCertStore};
use rustls_pki_types::ServerName;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_rustls::TlsConnector;

use crate::config::HTTPS_PORT;
use crate::types::TlsOutcome;

/// Initialize the rustls `CryptoProvider` (once).
///
/// `install_default` returns `Err` only when a provider is already installed.
fn ensure_crypto_provider() {
    let _ = CryptoProvider::install_default(rustls::crypto::ring::default_provider());
}

/// Build a connector that trusts the Mozilla root set.
pub(crate) fn build_tls_connector() -> TlsConnector {
    ensure_crypto_provider();

    let mut root_store = RootCertStore::empty();
    root_store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

    let config = ClientConfig::builder()
        .with_root_certificates(root_store)
        .with_no_client_auth();

    TlsConnector::from(Arc::new(config))
}

/// Map a handshake I/O error to an outcome.
///
/// The peer tearing the connection down mid-handshake (RST, abort, or a bare
/// close before `ServerHello`) is what an SNI filter looks like from here.
/// Everything else, certificate rejection included, is an ordinary failure.
pub(crate) fn classify_handshake_error(err: &io::Error) -> TlsOutcome {
    match err.kind() {
        io::ErrorKind::ConnectionReset
        | io::ErrorKind::ConnectionAborted
        | io::ErrorKind::UnexpectedEof
        | io::ErrorKind::BrokenPipe => TlsOutcome::Reset,
        _ => TlsOutcome::OtherFailure,
    }
}

/// Handshake with `domain` on port 443, resolving the name through the system.
pub async fn tls_handshake(connector: &TlsConnector, domain: &str, limit: Duration) -> TlsOutcome {
    tls_handshake_at(connector, domain, (domain, HTTPS_PORT), limit).await
}

/// Which phase of the attempt failed.
enum Failure {
    Connect(io::Error),
    Handshake(io::Error),
}

/// Handshake presenting `server_name` as SNI to `target`.
pub(crate) async fn tls_handshake_at(
    connector: &TlsConnector,
    server_name: &str,
    target: (&str, u16),
    limit: Duration,
) -> TlsOutcome {
    let Ok(sni) = ServerName::try_from(server_name.to_string()) else {
        debug!("[TLS] Invalid server name: {server_name}");
        return TlsOutcome::OtherFailure;
    };

    let start = Instant::now();
    let attempt = timeout(limit, async {
        let stream = TcpStream::connect(target).await.map_err(Failure::Connect)?;
        trace!("[TLS] TCP connected to {}:{}, starting handshake", target.0, target.1);
        connector
            .connect(sni, stream)
            .await
            .map_err(Failure::Handshake)?;
        Ok::<(), Failure>(())
    })
    .await;

    let outcome = match attempt {
        Ok(Ok(())) => TlsOutcome::Success,
        Ok(Err(Failure::Connect(e))) => {
            debug!("[TLS] TCP connection to {server_name} failed: {e}");
            TlsOutcome::OtherFailure
        }
        Ok(Err(Failure::Handshake(e))) => {
            let outcome = classify_handshake_error(&e);
            debug!("[TLS] Handshake with {server_name} failed ({outcome}): {e}");
            outcome
        }
        Err(_) => {
            debug!(
                "[TLS] Handshake with {server_name} timed out ({}ms)",
                limit.as_millis()
            );
            TlsOutcome::OtherFailure
        }
    };
    trace!("[TLS] {server_name} -> {outcome} in {:?}", start.elapsed());
    outcome
}
