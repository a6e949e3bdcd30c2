//! Resolver probe: one `A` query against one named upstream resolver.

use std::net::IpAddr;
use std::time::{Duration, Instant};

use hickory_resolver::{
    TokioResolver,
    config::{NameServerConfigGroup, ResolverConfig, ResolverOpts},
    name_server::TokioConnectionProvider,
};
use log::{debug, trace};
use tokio::time::timeout;

use crate::config::ResolverSpec;

/// DNS port used for every configured resolver.
const DNS_PORT: u16 = 53;

/// Build a resolver that talks to `ns_ip` only.
///
/// The resolver makes a single attempt bounded by `query_timeout` and keeps no
/// cache, so every run sees a fresh answer.
pub(crate) fn build_resolver_for_ns(ns_ip: IpAddr, query_timeout: Duration) -> TokioResolver {
    let config = ResolverConfig::from_parts(
        None,
        vec![],
        NameServerConfigGroup::from_ips_clear(&[ns_ip], DNS_PORT, true),
    );
    let provider = TokioConnectionProvider::default();
    let mut opts = ResolverOpts::default();
    opts.timeout = query_timeout;
    opts.attempts = 1;
    opts.cache_size = 0;
    TokioResolver::builder_with_config(config, provider)
        .with_options(opts)
        .build()
}

/// Resolve the IPv4 addresses of `domain` through `resolver`.
///
/// Any failure (no answer, `NXDOMAIN`, network error, timeout) yields an empty
/// list. The outer `timeout` guards against the resolver ignoring its own.
pub async fn resolve_with(domain: &str, resolver: &ResolverSpec, limit: Duration) -> Vec<String> {
    let start = Instant::now();
    let client = build_resolver_for_ns(resolver.address, limit);

    match timeout(limit, client.ipv4_lookup(domain)).await {
        Ok(Ok(response)) => {
            let ips: Vec<String> = response.iter().map(ToString::to_string).collect();
            trace!(
                "[DNS] {} answered {} address(es) for {domain} in {:?}",
                resolver.name,
                ips.len(),
                start.elapsed()
            );
            ips
        }
        Ok(Err(e)) => {
            debug!("[DNS] {} failed for {domain}: {e}", resolver.name);
            vec![]
        }
        Err(_) => {
            debug!(
                "[DNS] {} timed out for {domain} ({}ms)",
                resolver.name,
                limit.as_millis()
            );
            vec![]
        }
    }
}
