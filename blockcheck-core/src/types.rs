//! Public types produced by a probe run.

use std::collections::BTreeMap;
use std::fmt;

use serde::de::{self, Deserializer};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};

/// Resolver name -> addresses it returned (empty on failure).
pub type DnsMap = BTreeMap<String, Vec<String>>;

/// Outcome of a TLS handshake against the probed domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TlsOutcome {
    /// Handshake completed.
    Success,
    /// Connection reset or torn down mid-handshake, the usual signature of SNI filtering.
    Reset,
    /// Any other failure: timeout, refused connection, certificate rejection.
    OtherFailure,
}

impl fmt::Display for TlsOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::Reset => write!(f, "reset"),
            Self::OtherFailure => write!(f, "other_failure"),
        }
    }
}

/// Per-address connectivity results.
///
/// Serialized as a flat map: `tcp_<port>` and `http` hold booleans, `tls` holds
/// a [`TlsOutcome`] tag. A key is only present if that check ran, and each key
/// is written at most once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectivityRecord {
    tcp: BTreeMap<u16, bool>,
    tls: Option<TlsOutcome>,
    http: Option<bool>,
}

impl ConnectivityRecord {
    /// Result of the TCP check on `port`, if it ran.
    pub fn tcp(&self, port: u16) -> Option<bool> {
        self.tcp.get(&port).copied()
    }

    /// All TCP results, ordered by port.
    pub fn tcp_results(&self) -> impl Iterator<Item = (u16, bool)> + '_ {
        self.tcp.iter().map(|(port, ok)| (*port, *ok))
    }

    /// Whether any TCP check on this address succeeded.
    pub fn any_tcp_reachable(&self) -> bool {
        self.tcp.values().any(|ok| *ok)
    }

    pub fn tls(&self) -> Option<TlsOutcome> {
        self.tls
    }

    pub fn http(&self) -> Option<bool> {
        self.http
    }

    /// Record a TCP result. Returns `false` (and keeps the first value) if the
    /// port was already recorded.
    pub(crate) fn set_tcp(&mut self, port: u16, reachable: bool) -> bool {
        if self.tcp.contains_key(&port) {
            return false;
        }
        self.tcp.insert(port, reachable);
        true
    }

    pub(crate) fn set_tls(&mut self, outcome: TlsOutcome) -> bool {
        if self.tls.is_some() {
            return false;
        }
        self.tls = Some(outcome);
        true
    }

    pub(crate) fn set_http(&mut self, ok: bool) -> bool {
        if self.http.is_some() {
            return false;
        }
        self.http = Some(ok);
        true
    }
}

impl Serialize for ConnectivityRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let len = self.tcp.len() + usize::from(self.tls.is_some()) + usize::from(self.http.is_some());
        let mut map = serializer.serialize_map(Some(len))?;
        for (port, ok) in &self.tcp {
            map.serialize_entry(&format!("tcp_{port}"), ok)?;
        }
        if let Some(tls) = &self.tls {
            map.serialize_entry("tls", tls)?;
        }
        if let Some(http) = &self.http {
            map.serialize_entry("http", http)?;
        }
        map.end()
    }
}

/// Wire shape of a single record value before the key tells us which it is.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawOutcome {
    Flag(bool),
    Tls(TlsOutcome),
}

impl<'de> Deserialize<'de> for ConnectivityRecord {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = BTreeMap::<String, RawOutcome>::deserialize(deserializer)?;
        let mut record = Self::default();
        for (key, value) in raw {
            match (key.as_str(), value) {
                ("tls", RawOutcome::Tls(outcome)) => record.tls = Some(outcome),
                ("http", RawOutcome::Flag(ok)) => record.http = Some(ok),
                (other, RawOutcome::Flag(ok)) => {
                    let port = other
                        .strip_prefix("tcp_")
                        .and_then(|p| p.parse::<u16>().ok())
                        .ok_or_else(|| de::Error::custom(format!("unknown check key: {other}")))?;
                    record.tcp.insert(port, ok);
                }
                (other, RawOutcome::Tls(_)) => {
                    return Err(de::Error::custom(format!(
                        "unexpected TLS outcome under key: {other}"
                    )));
                }
            }
        }
        Ok(record)
    }
}

/// A single blocking signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BlockIndicator {
    /// Resolvers disagree on the domain's addresses.
    #[serde(rename = "DNS pollution")]
    DnsPollution,
    /// A TLS handshake to the domain was reset.
    #[serde(rename = "TLS reset (suspected SNI block)")]
    TlsReset,
    /// No resolved address accepted a TCP connection on any gated port.
    #[serde(rename = "TCP connection failure")]
    TcpFailure,
}

impl fmt::Display for BlockIndicator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DnsPollution => write!(f, "DNS pollution"),
            Self::TlsReset => write!(f, "TLS reset (suspected SNI block)"),
            Self::TcpFailure => write!(f, "TCP connection failure"),
        }
    }
}

/// Blocking verdict, only produced once the connectivity stages ran.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    pub blocked_indicators: Vec<BlockIndicator>,
    pub is_blocked: bool,
    pub conclusion: String,
}

/// Derived view over a run's results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    /// Deduplicated union of resolver answers, sorted.
    pub all_ips: Vec<String>,
    pub dns_pollution: bool,
    pub dns_status: String,
    /// Set when the run stopped before the connectivity stages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(flatten)]
    pub verdict: Option<Verdict>,
    /// Wall-clock run duration in seconds, two decimals.
    pub elapsed_time: f64,
}

impl Summary {
    /// `true` when a verdict exists and flags the domain as blocked.
    pub fn is_blocked(&self) -> bool {
        self.verdict.as_ref().is_some_and(|v| v.is_blocked)
    }

    /// Indicators of the verdict, empty when there is none.
    pub fn blocked_indicators(&self) -> &[BlockIndicator] {
        self.verdict
            .as_ref()
            .map(|v| v.blocked_indicators.as_slice())
            .unwrap_or_default()
    }
}

/// Complete result of one probe run for one domain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub domain: String,
    /// Per-resolver answers.
    pub dns: DnsMap,
    /// Per-address connectivity, empty if nothing resolved.
    pub connectivity: BTreeMap<String, ConnectivityRecord>,
    pub summary: Summary,
    /// Unix time (seconds) at which the run started.
    pub timestamp: f64,
}
