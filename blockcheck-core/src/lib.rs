//! Blockcheck Core Library
//!
//! Decides whether a domain appears to be blocked on the current network by
//! running four families of probes and combining their outcomes:
//! - DNS answers from several named resolvers (pollution check)
//! - TCP reachability of every returned address
//! - TLS handshake with SNI (reset detection)
//! - plain HTTP `HEAD` with the domain as `Host`
//!
//! Probes are abstracted behind [`NetworkProbe`], so the pipeline can run
//! against the live network ([`LiveProbe`]) or any injected implementation.

pub mod config;
pub mod error;
pub mod services;
pub mod traits;
pub mod types;

#[cfg(test)]
mod test_utils;

// Re-export common types
pub use config::{ProbeConfig, REMOTE_RESOLVER_PREFIX, ResolverSpec};
pub use error::{BlockCheckError, BlockCheckResult};
pub use services::{LiveProbe, ProbeOrchestrator, ProbeService};
pub use traits::NetworkProbe;
pub use types::{
    BlockIndicator, ConnectivityRecord, DnsMap, Report, Summary, TlsOutcome, Verdict,
};

/// Run the full pipeline for `domain` against the live network.
///
/// The domain is used as given; see [`ProbeService::check_domain`] for the
/// validating entry point.
pub async fn run_probe(domain: &str, config: &ProbeConfig) -> Report {
    ProbeOrchestrator::live(config.clone()).run(domain).await
}
