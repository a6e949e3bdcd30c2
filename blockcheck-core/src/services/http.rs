//! HTTP probe: minimal `HEAD /` over plain TCP.

use std::time::Duration;

use log::trace;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::time::timeout;

use super::tcp::connect;
use crate::config::HTTP_PORT;

/// Bytes read from the response; enough for any status line prefix.
const RESPONSE_PREFIX_BYTES: usize = 50;

/// Whether the leading response bytes look like an HTTP status line.
fn looks_like_status_line(prefix: &[u8]) -> bool {
    prefix.starts_with(b"HTTP")
}

/// Send `HEAD /` to `address:80` with `Host: host` and check the reply.
pub async fn http_head(address: &str, host: &str, limit: Duration) -> bool {
    http_head_at(address, HTTP_PORT, host, limit).await
}

/// Same as [`http_head`] against an arbitrary port.
pub(crate) async fn http_head_at(address: &str, port: u16, host: &str, limit: Duration) -> bool {
    let result = timeout(limit, async {
        let mut stream = connect(address, port, limit).await?;

        let request = format!("HEAD / HTTP/1.1\r\nHost: {host}\r\nConnection: close\r\n\r\n");
        stream.write_all(request.as_bytes()).await.ok()?;

        let mut response = [0u8; RESPONSE_PREFIX_BYTES];
        let n = stream.read(&mut response).await.ok()?;
        Some(looks_like_status_line(&response[..n]))
    })
    .await;

    let ok = result.ok().flatten().unwrap_or(false);
    trace!("[HTTP] {address}:{port} (Host: {host}) -> {ok}");
    ok
}
