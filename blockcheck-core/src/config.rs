//! Probe run configuration.
//!
//! A [`ProbeConfig`] is built once (from defaults or a config file) and handed
//! to every run by reference. Nothing in it changes while probes are in flight.

use std::collections::HashSet;
use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{BlockCheckError, BlockCheckResult};

/// Port probed with plain HTTP once reachable.
pub const HTTP_PORT: u16 = 80;

/// Port whose reachability gates the TLS handshake probe.
pub const HTTPS_PORT: u16 = 443;

/// Default per-probe timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(4);

/// Default bound on probes in flight per stage.
pub const DEFAULT_MAX_CONCURRENCY: usize = 20;

/// Prefix for resolver names taken from a remote vantage point. Reserved:
/// configured resolvers may not use it.
pub const REMOTE_RESOLVER_PREFIX: &str = "remote:";

/// A named upstream DNS resolver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolverSpec {
    /// Display name, unique within a configuration (e.g. `"Google(8.8.8.8)"`).
    pub name: String,
    /// Resolver IP address, queried on port 53.
    pub address: IpAddr,
}

impl ResolverSpec {
    pub fn new(name: impl Into<String>, address: IpAddr) -> Self {
        Self {
            name: name.into(),
            address,
        }
    }
}

/// Static configuration for a probe run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// Resolvers queried in the DNS stage.
    pub resolvers: Vec<ResolverSpec>,
    /// Ports checked for every resolved address in the TCP stage.
    pub ports: Vec<u16>,
    /// Upper bound for each individual probe.
    #[serde(with = "duration_secs")]
    pub timeout: Duration,
    /// Maximum number of probes in flight within a stage.
    pub max_concurrency: usize,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            resolvers: default_resolvers(),
            ports: vec![HTTP_PORT, HTTPS_PORT],
            timeout: DEFAULT_TIMEOUT,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
        }
    }
}

impl ProbeConfig {
    /// Replace the per-probe timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Replace the resolver set.
    #[must_use]
    pub fn with_resolvers(mut self, resolvers: Vec<ResolverSpec>) -> Self {
        self.resolvers = resolvers;
        self
    }

    /// Check the configuration before any probe runs.
    pub fn validate(&self) -> BlockCheckResult<()> {
        if self.resolvers.is_empty() {
            return Err(BlockCheckError::ConfigError(
                "At least one resolver is required".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for resolver in &self.resolvers {
            if resolver.name.trim().is_empty() {
                return Err(BlockCheckError::ConfigError(format!(
                    "Resolver {} has a blank name",
                    resolver.address
                )));
            }
            if resolver.name.starts_with(REMOTE_RESOLVER_PREFIX) {
                return Err(BlockCheckError::ConfigError(format!(
                    "Resolver name {} uses the reserved prefix {REMOTE_RESOLVER_PREFIX}",
                    resolver.name
                )));
            }
            if !seen.insert(resolver.name.as_str()) {
                return Err(BlockCheckError::ConfigError(format!(
                    "Duplicate resolver name: {}",
                    resolver.name
                )));
            }
        }

        if self.ports.is_empty() {
            return Err(BlockCheckError::ConfigError(
                "At least one port is required".to_string(),
            ));
        }
        if self.ports.contains(&0) {
            return Err(BlockCheckError::ConfigError(
                "Port 0 cannot be probed".to_string(),
            ));
        }
        let mut ports = HashSet::new();
        if let Some(port) = self.ports.iter().find(|port| !ports.insert(**port)) {
            return Err(BlockCheckError::ConfigError(format!(
                "Duplicate port: {port}"
            )));
        }
        if !ports.contains(&HTTP_PORT) && !ports.contains(&HTTPS_PORT) {
            return Err(BlockCheckError::ConfigError(format!(
                "Ports must include {HTTP_PORT} or {HTTPS_PORT}"
            )));
        }
        if self.timeout.is_zero() {
            return Err(BlockCheckError::ConfigError(
                "Timeout must be greater than zero".to_string(),
            ));
        }
        if self.max_concurrency == 0 {
            return Err(BlockCheckError::ConfigError(
                "max_concurrency must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// The reference resolver set: two global anycast resolvers and two
/// mainland-China resolvers, so that poisoned answers show up as divergence.
fn default_resolvers() -> Vec<ResolverSpec> {
    vec![
        ResolverSpec::new("Google(8.8.8.8)", IpAddr::V4(Ipv4Addr::new(8, 8, 8, 8))),
        ResolverSpec::new("Cloudflare(1.1.1.1)", IpAddr::V4(Ipv4Addr::new(1, 1, 1, 1))),
        ResolverSpec::new("Ali(223.5.5.5)", IpAddr::V4(Ipv4Addr::new(223, 5, 5, 5))),
        ResolverSpec::new(
            "114DNS(114.114.114.114)",
            IpAddr::V4(Ipv4Addr::new(114, 114, 114, 114)),
        ),
    ]
}

/// Durations as fractional seconds, so config files can say `timeout = 2.5`.
mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(|e| D::Error::custom(format!("{e}: {secs}")))
    }
}
