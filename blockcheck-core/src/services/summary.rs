//! Verdict computation. Everything here is a pure function of the DNS answers
//! and the connectivity records.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use crate::config::{HTTPS_PORT, HTTP_PORT};
use crate::types::{BlockIndicator, ConnectivityRecord, DnsMap, Summary, TlsOutcome, Verdict};

pub const NO_ADDRESS_ERROR: &str = "No resolvable address obtained";
pub const DNS_STATUS_POLLUTED: &str = "Possible DNS pollution";
pub const DNS_STATUS_CONSISTENT: &str = "DNS answers consistent";
pub const CONCLUSION_BLOCKED: &str = "Domain appears to be blocked";
pub const CONCLUSION_CLEAR: &str = "No obvious blocking detected";

/// Deduplicated union of every resolver's answer.
pub fn union_addresses(dns: &DnsMap) -> BTreeSet<String> {
    dns.values().flatten().cloned().collect()
}

/// More than one distinct address across all resolvers counts as pollution.
///
/// There is no ground truth to compare against, so divergence is the signal.
pub fn is_dns_polluted(all_ips: &BTreeSet<String>) -> bool {
    all_ips.len() > 1
}

fn dns_status(dns_pollution: bool) -> String {
    if dns_pollution {
        DNS_STATUS_POLLUTED.to_string()
    } else {
        DNS_STATUS_CONSISTENT.to_string()
    }
}

/// Collect the independent blocking signals, in fixed order.
pub fn collect_indicators(
    dns_pollution: bool,
    connectivity: &BTreeMap<String, ConnectivityRecord>,
) -> Vec<BlockIndicator> {
    let mut indicators = Vec::new();

    if dns_pollution {
        indicators.push(BlockIndicator::DnsPollution);
    }

    if connectivity
        .values()
        .any(|record| record.tls() == Some(TlsOutcome::Reset))
    {
        indicators.push(BlockIndicator::TlsReset);
    }

    let all_tcp_failed = !connectivity.values().any(|record| {
        record.tcp(HTTP_PORT) == Some(true) || record.tcp(HTTPS_PORT) == Some(true)
    });
    if all_tcp_failed {
        indicators.push(BlockIndicator::TcpFailure);
    }

    indicators
}

/// Seconds rounded to two decimals.
pub fn round_secs(elapsed: Duration) -> f64 {
    (elapsed.as_secs_f64() * 100.0).round() / 100.0
}

/// Summary for a run that went through every stage.
pub fn summarize(
    all_ips: &BTreeSet<String>,
    connectivity: &BTreeMap<String, ConnectivityRecord>,
    elapsed: Duration,
) -> Summary {
    let dns_pollution = is_dns_polluted(all_ips);
    let blocked_indicators = collect_indicators(dns_pollution, connectivity);
    let is_blocked = !blocked_indicators.is_empty();
    let conclusion = if is_blocked {
        CONCLUSION_BLOCKED
    } else {
        CONCLUSION_CLEAR
    };

    Summary {
        all_ips: all_ips.iter().cloned().collect(),
        dns_pollution,
        dns_status: dns_status(dns_pollution),
        error: None,
        verdict: Some(Verdict {
            blocked_indicators,
            is_blocked,
            conclusion: conclusion.to_string(),
        }),
        elapsed_time: round_secs(elapsed),
    }
}

/// Summary for a run that stopped after the DNS stage with nothing resolved.
pub fn summarize_unresolved(elapsed: Duration) -> Summary {
    Summary {
        all_ips: vec![],
        dns_pollution: false,
        dns_status: dns_status(false),
        error: Some(NO_ADDRESS_ERROR.to_string()),
        verdict: None,
        elapsed_time: round_secs(elapsed),
    }
}
