//! 网络探测抽象 Trait

use async_trait::async_trait;

use crate::config::ResolverSpec;
use crate::types::TlsOutcome;

/// The four leaf probes the orchestrator fans out.
///
/// Implementations:
/// - `LiveProbe`: real sockets (hickory DNS, tokio TCP, rustls)
/// - `StubProbe` (tests): scripted answers with call recording
///
/// Every method absorbs its own failures: the orchestrator only ever receives
/// typed outcomes, never errors. Implementations must bound each call by
/// their own timeout so that a stuck socket cannot stall a stage.
#[async_trait]
pub trait NetworkProbe: Send + Sync {
    /// Query `resolver` for the domain's addresses.
    ///
    /// Returns an empty list on error, timeout or an empty answer.
    async fn resolve(&self, domain: &str, resolver: &ResolverSpec) -> Vec<String>;

    /// Attempt a TCP connection to `address:port`, closing it right away.
    async fn tcp_connect(&self, address: &str, port: u16) -> bool;

    /// Attempt a TLS handshake with `domain` on port 443.
    async fn tls_handshake(&self, domain: &str) -> TlsOutcome;

    /// Send `HEAD /` to `address:80` with the given `Host` header and check
    /// for an HTTP status line.
    async fn http_head(&self, address: &str, host: &str) -> bool;
}
