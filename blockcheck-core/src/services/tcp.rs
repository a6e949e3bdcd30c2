//! Reachability probe: bounded TCP connect.

use std::time::Duration;

use log::trace;
use tokio::net::TcpStream;
use tokio::time::timeout;

/// Open a TCP connection to `address:port` within `limit`.
///
/// `address` may be an IPv4/IPv6 literal or a host name; the latter goes
/// through the system resolver. Returns `None` on any failure.
pub(crate) async fn connect(address: &str, port: u16, limit: Duration) -> Option<TcpStream> {
    match timeout(limit, TcpStream::connect((address, port))).await {
        Ok(Ok(stream)) => Some(stream),
        Ok(Err(e)) => {
            trace!("[TCP] {address}:{port} failed: {e}");
            None
        }
        Err(_) => {
            trace!("[TCP] {address}:{port} timed out ({}ms)", limit.as_millis());
            None
        }
    }
}

/// Whether `address:port` accepts a TCP connection within `limit`.
///
/// The stream is dropped, and therefore closed, before returning.
pub async fn tcp_connect(address: &str, port: u16, limit: Duration) -> bool {
    connect(address, port, limit).await.is_some()
}
