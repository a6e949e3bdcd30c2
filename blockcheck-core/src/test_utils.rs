//! 测试辅助模块
//!
//! 提供脚本化的 `NetworkProbe` 实现和便捷的配置工厂方法。

use std::collections::{HashMap, VecDeque};
use std::net::{IpAddr, Ipv4Addr};
use std::sync::Mutex as StdMutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::config::{ProbeConfig, ResolverSpec};
use crate::traits::NetworkProbe;
use crate::types::TlsOutcome;

/// One recorded probe invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeCall {
    Resolve { resolver: String, domain: String },
    Tcp { address: String, port: u16 },
    Tls { domain: String },
    Http { address: String, host: String },
}

// ===== StubProbe =====

/// Scripted probe set. Unscripted checks fail: no DNS answer, TCP refused,
/// HTTP false. TLS outcomes are handed out in order, then `tls_default`.
pub struct StubProbe {
    dns: HashMap<String, Vec<String>>,
    tcp: HashMap<(String, u16), bool>,
    tcp_default: bool,
    tls_queue: StdMutex<VecDeque<TlsOutcome>>,
    tls_default: TlsOutcome,
    http: HashMap<String, bool>,
    http_default: bool,
    delay: Option<Duration>,
    calls: Mutex<Vec<ProbeCall>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl StubProbe {
    pub fn new() -> Self {
        Self {
            dns: HashMap::new(),
            tcp: HashMap::new(),
            tcp_default: false,
            tls_queue: StdMutex::new(VecDeque::new()),
            tls_default: TlsOutcome::OtherFailure,
            http: HashMap::new(),
            http_default: false,
            delay: None,
            calls: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn with_dns(mut self, resolver: &str, ips: &[&str]) -> Self {
        self.dns.insert(
            resolver.to_string(),
            ips.iter().map(|ip| (*ip).to_string()).collect(),
        );
        self
    }

    pub fn with_tcp(mut self, address: &str, port: u16, reachable: bool) -> Self {
        self.tcp.insert((address.to_string(), port), reachable);
        self
    }

    /// Every TCP connect, TLS handshake and HTTP probe succeeds unless scripted otherwise.
    pub fn reachable_everywhere(mut self) -> Self {
        self.tcp_default = true;
        self.tls_default = TlsOutcome::Success;
        self.http_default = true;
        self
    }

    pub fn with_tls_sequence(self, outcomes: &[TlsOutcome]) -> Self {
        if let Ok(mut queue) = self.tls_queue.lock() {
            queue.extend(outcomes.iter().copied());
        }
        self
    }

    pub fn with_http(mut self, address: &str, ok: bool) -> Self {
        self.http.insert(address.to_string(), ok);
        self
    }

    /// Every call sleeps this long before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub async fn calls(&self) -> Vec<ProbeCall> {
        self.calls.lock().await.clone()
    }

    pub async fn calls_matching(&self, pred: impl Fn(&ProbeCall) -> bool) -> Vec<ProbeCall> {
        self.calls().await.into_iter().filter(|c| pred(c)).collect()
    }

    /// Highest number of connectivity probes observed in flight at once.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    async fn enter(&self, call: ProbeCall) {
        self.calls.lock().await.push(call);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }

    fn leave(&self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl NetworkProbe for StubProbe {
    async fn resolve(&self, domain: &str, resolver: &ResolverSpec) -> Vec<String> {
        // DNS calls are not counted toward the in-flight bound.
        self.calls.lock().await.push(ProbeCall::Resolve {
            resolver: resolver.name.clone(),
            domain: domain.to_string(),
        });
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.dns.get(&resolver.name).cloned().unwrap_or_default()
    }

    async fn tcp_connect(&self, address: &str, port: u16) -> bool {
        self.enter(ProbeCall::Tcp {
            address: address.to_string(),
            port,
        })
        .await;
        let result = self
            .tcp
            .get(&(address.to_string(), port))
            .copied()
            .unwrap_or(self.tcp_default);
        self.leave();
        result
    }

    async fn tls_handshake(&self, domain: &str) -> TlsOutcome {
        self.enter(ProbeCall::Tls {
            domain: domain.to_string(),
        })
        .await;
        let scripted = self.tls_queue.lock().ok().and_then(|mut q| q.pop_front());
        self.leave();
        scripted.unwrap_or(self.tls_default)
    }

    async fn http_head(&self, address: &str, host: &str) -> bool {
        self.enter(ProbeCall::Http {
            address: address.to_string(),
            host: host.to_string(),
        })
        .await;
        let result = self.http.get(address).copied().unwrap_or(self.http_default);
        self.leave();
        result
    }
}

// ===== 工厂方法 =====

/// Default config with the given resolver names, all pointing at TEST-NET-1.
pub fn config_with_resolvers(names: &[&str]) -> ProbeConfig {
    let resolvers = names
        .iter()
        .map(|name| ResolverSpec::new(*name, IpAddr::V4(Ipv4Addr::new(192, 0, 2, 1))))
        .collect();
    ProbeConfig::default().with_resolvers(resolvers)
}
