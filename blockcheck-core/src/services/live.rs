//! [`NetworkProbe`] backed by real sockets.

use std::time::Duration;

use async_trait::async_trait;
use tokio_rustls::TlsConnector;

use super::{http, resolver, tcp, tls};
use crate::config::{ProbeConfig, ResolverSpec};
use crate::traits::NetworkProbe;
use crate::types::TlsOutcome;

/// Live probe set: hickory for DNS, tokio sockets for TCP/HTTP, rustls for TLS.
///
/// Cheap to clone; the TLS client configuration is shared.
#[derive(Clone)]
pub struct LiveProbe {
    timeout: Duration,
    connector: TlsConnector,
}

impl LiveProbe {
    /// Create a probe set bounding every call by `timeout`.
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            connector: tls::build_tls_connector(),
        }
    }

    /// Create a probe set using the timeout of `config`.
    pub fn from_config(config: &ProbeConfig) -> Self {
        Self::new(config.timeout)
    }
}

#[async_trait]
impl NetworkProbe for LiveProbe {
    async fn resolve(&self, domain: &str, resolver: &ResolverSpec) -> Vec<String> {
        resolver::resolve_with(domain, resolver, self.timeout).await
    }

    async fn tcp_connect(&self, address: &str, port: u16) -> bool {
        tcp::tcp_connect(address, port, self.timeout).await
    }

    async fn tls_handshake(&self, domain: &str) -> TlsOutcome {
        tls::tls_handshake(&self.connector, domain, self.timeout).await
    }

    async fn http_head(&self, address: &str, host: &str) -> bool {
        http::http_head(address, host, self.timeout).await
    }
}
