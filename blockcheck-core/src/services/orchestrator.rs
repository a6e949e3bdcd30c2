//! Staged probe pipeline: DNS, then TCP, then gated TLS/HTTP, then verdict.
//!
//! Each stage builds its job list from read-only inputs, runs the jobs
//! concurrently, and folds the keyed results into the report only after the
//! whole stage has joined. No accumulator is shared between in-flight probes.

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet};
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use futures::future::join_all;
use futures::stream::{self, StreamExt};
use log::{debug, info, warn};

use super::live::LiveProbe;
use super::summary;
use crate::config::{HTTPS_PORT, HTTP_PORT, ProbeConfig, REMOTE_RESOLVER_PREFIX};
use crate::traits::NetworkProbe;
use crate::types::{ConnectivityRecord, DnsMap, Report, TlsOutcome};

/// A probe gated on a successful TCP check.
#[derive(Debug, Clone, Copy)]
enum GatedJob<'a> {
    Tls(&'a str),
    Http(&'a str),
}

#[derive(Debug, Clone, Copy)]
enum GatedOutcome {
    Tls(TlsOutcome),
    Http(bool),
}

/// Run `jobs` with at most `limit` in flight; results come back in completion order.
async fn fan_out<I, F, T>(jobs: I, limit: usize) -> Vec<T>
where
    I: IntoIterator<Item = F>,
    F: Future<Output = T>,
{
    stream::iter(jobs).buffer_unordered(limit.max(1)).collect().await
}

/// Drives one probe run per call. Holds only read-only state, so one instance
/// can serve concurrent runs for different domains.
#[derive(Clone)]
pub struct ProbeOrchestrator {
    config: ProbeConfig,
    probe: Arc<dyn NetworkProbe>,
}

impl ProbeOrchestrator {
    pub fn new(config: ProbeConfig, probe: Arc<dyn NetworkProbe>) -> Self {
        Self { config, probe }
    }

    /// Orchestrator over real network probes.
    pub fn live(config: ProbeConfig) -> Self {
        let probe = Arc::new(LiveProbe::from_config(&config));
        Self::new(config, probe)
    }

    pub fn config(&self) -> &ProbeConfig {
        &self.config
    }

    /// Run the full pipeline for `domain`.
    pub async fn run(&self, domain: &str) -> Report {
        self.execute(domain, None).await
    }

    /// Run the pipeline, adding `remote` (answers gathered elsewhere) to the
    /// local resolver answers before the address union.
    ///
    /// Remote resolver names are prefixed with `remote:`. A remote entry never
    /// replaces a local resolver's answers.
    pub async fn run_with_remote_dns(&self, domain: &str, remote: &DnsMap) -> Report {
        self.execute(domain, Some(remote)).await
    }

    async fn execute(&self, domain: &str, remote: Option<&DnsMap>) -> Report {
        let start = Instant::now();
        let timestamp = unix_timestamp();
        debug!("[PROBE] Starting run for {domain}");

        let mut dns = self.dns_stage(domain).await;
        if let Some(remote) = remote {
            for (name, ips) in remote {
                match dns.entry(format!("{REMOTE_RESOLVER_PREFIX}{name}")) {
                    Entry::Vacant(slot) => {
                        slot.insert(ips.clone());
                    }
                    Entry::Occupied(slot) => {
                        warn!(
                            "[PROBE] Remote resolver {name} collides with local resolver {}, ignored",
                            slot.key()
                        );
                    }
                }
            }
        }

        let all_ips = summary::union_addresses(&dns);
        if all_ips.is_empty() {
            warn!("[PROBE] No resolver returned an address for {domain}");
            return Report {
                domain: domain.to_string(),
                dns,
                connectivity: BTreeMap::new(),
                summary: summary::summarize_unresolved(start.elapsed()),
                timestamp,
            };
        }
        debug!(
            "[PROBE] {domain} resolved to {} distinct address(es)",
            all_ips.len()
        );

        let mut connectivity = self.tcp_stage(&all_ips).await;
        self.gated_stage(domain, &all_ips, &mut connectivity).await;

        let summary = summary::summarize(&all_ips, &connectivity, start.elapsed());
        info!(
            "[PROBE] {domain}: blocked={} indicators={:?} in {:.2}s",
            summary.is_blocked(),
            summary.blocked_indicators(),
            summary.elapsed_time
        );

        Report {
            domain: domain.to_string(),
            dns,
            connectivity,
            summary,
            timestamp,
        }
    }

    /// Query every resolver at once. Resolvers are few, so no limiter here.
    async fn dns_stage(&self, domain: &str) -> DnsMap {
        let futures: Vec<_> = self
            .config
            .resolvers
            .iter()
            .map(|resolver| async move {
                let ips = self.probe.resolve(domain, resolver).await;
                (resolver.name.clone(), ips)
            })
            .collect();

        join_all(futures).await.into_iter().collect()
    }

    /// Every address x every configured port.
    async fn tcp_stage(&self, all_ips: &BTreeSet<String>) -> BTreeMap<String, ConnectivityRecord> {
        let targets: Vec<(&str, u16)> = all_ips
            .iter()
            .flat_map(|ip| self.config.ports.iter().map(move |&port| (ip.as_str(), port)))
            .collect();

        let jobs = targets.into_iter().map(|(ip, port)| async move {
            let reachable = self.probe.tcp_connect(ip, port).await;
            (ip, port, reachable)
        });
        let results = fan_out(jobs, self.config.max_concurrency).await;

        let mut connectivity: BTreeMap<String, ConnectivityRecord> = all_ips
            .iter()
            .map(|ip| (ip.clone(), ConnectivityRecord::default()))
            .collect();
        for (ip, port, reachable) in results {
            if let Some(record) = connectivity.get_mut(ip) {
                record.set_tcp(port, reachable);
            }
        }
        connectivity
    }

    /// TLS where `tcp_443` succeeded, HTTP where `tcp_80` succeeded, all in one batch.
    async fn gated_stage(
        &self,
        domain: &str,
        all_ips: &BTreeSet<String>,
        connectivity: &mut BTreeMap<String, ConnectivityRecord>,
    ) {
        let mut plan = Vec::new();
        for ip in all_ips {
            let Some(record) = connectivity.get(ip) else {
                continue;
            };
            if record.tcp(HTTPS_PORT) == Some(true) {
                plan.push(GatedJob::Tls(ip.as_str()));
            }
            if record.tcp(HTTP_PORT) == Some(true) {
                plan.push(GatedJob::Http(ip.as_str()));
            }
        }
        if plan.is_empty() {
            debug!("[PROBE] No address passed a TCP gate for {domain}");
            return;
        }

        let jobs = plan.into_iter().map(|job| async move {
            match job {
                GatedJob::Tls(ip) => (ip, GatedOutcome::Tls(self.probe.tls_handshake(domain).await)),
                GatedJob::Http(ip) => (
                    ip,
                    GatedOutcome::Http(self.probe.http_head(ip, domain).await),
                ),
            }
        });
        let results = fan_out(jobs, self.config.max_concurrency).await;

        for (ip, outcome) in results {
            let Some(record) = connectivity.get_mut(ip) else {
                continue;
            };
            match outcome {
                GatedOutcome::Tls(tls) => record.set_tls(tls),
                GatedOutcome::Http(ok) => record.set_http(ok),
            };
        }
    }
}

/// Current Unix time in seconds.
fn unix_timestamp() -> f64 {
    // i64 -> f64: microseconds since epoch stay far below 2^53
    #[allow(clippy::cast_precision_loss)]
    let micros = Utc::now().timestamp_micros() as f64;
    micros / 1_000_000.0
}
