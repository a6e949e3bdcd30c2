//! Stateless service façade over the probe pipeline.
//!
//! Every method on [`ProbeService`] is an async associated function, no instance needed.

mod http;
mod live;
mod orchestrator;
mod resolver;
mod summary;
mod tcp;
mod tls;

use std::time::Duration;

use log::warn;

pub use live::LiveProbe;
pub use orchestrator::ProbeOrchestrator;
pub use summary::{
    CONCLUSION_BLOCKED, CONCLUSION_CLEAR, DNS_STATUS_CONSISTENT, DNS_STATUS_POLLUTED,
    NO_ADDRESS_ERROR,
};

use crate::config::ProbeConfig;
use crate::error::{BlockCheckError, BlockCheckResult};
use crate::types::Report;

/// Longest domain name accepted.
const MAX_DOMAIN_LEN: usize = 253;

/// Validate and normalise a domain name input.
///
/// Trims surrounding whitespace and rejects empty, overlong or space-containing
/// names. Anything else is left to the resolvers to judge.
fn validate_domain(domain: &str) -> BlockCheckResult<String> {
    let domain = domain.trim();
    if domain.is_empty() {
        return Err(BlockCheckError::ValidationError(
            "Domain name is required".to_string(),
        ));
    }
    if domain.chars().any(char::is_whitespace) {
        return Err(BlockCheckError::ValidationError(format!(
            "Invalid domain name: {domain}"
        )));
    }
    if domain.len() > MAX_DOMAIN_LEN {
        return Err(BlockCheckError::ValidationError(format!(
            "Domain name exceeds maximum length of {MAX_DOMAIN_LEN} characters (got {})",
            domain.len()
        )));
    }
    Ok(domain.to_string())
}

/// Entry point for front-ends.
///
/// ```rust,no_run
/// use blockcheck_core::{ProbeConfig, ProbeService};
/// # async fn demo() -> blockcheck_core::BlockCheckResult<()> {
/// let report = ProbeService::check_domain("example.com", &ProbeConfig::default()).await?;
/// println!("blocked: {}", report.summary.is_blocked());
/// # Ok(())
/// # }
/// ```
pub struct ProbeService;

impl ProbeService {
    /// Validate inputs, then run the full pipeline with live network probes.
    pub async fn check_domain(domain: &str, config: &ProbeConfig) -> BlockCheckResult<Report> {
        config.validate()?;
        let orchestrator = ProbeOrchestrator::live(config.clone());
        Self::check_with(&orchestrator, domain).await
    }

    /// Like [`ProbeService::check_domain`], but gives up after `deadline`.
    ///
    /// On expiry the run is dropped and no partial report is produced.
    pub async fn check_domain_with_deadline(
        domain: &str,
        config: &ProbeConfig,
        deadline: Duration,
    ) -> BlockCheckResult<Report> {
        config.validate()?;
        let orchestrator = ProbeOrchestrator::live(config.clone());
        Self::check_with_deadline(&orchestrator, domain, deadline).await
    }

    /// Validate the domain and run it through an existing orchestrator.
    pub async fn check_with(
        orchestrator: &ProbeOrchestrator,
        domain: &str,
    ) -> BlockCheckResult<Report> {
        let domain = validate_domain(domain)?;
        Ok(orchestrator.run(&domain).await)
    }

    /// [`ProbeService::check_with`] bounded by an outer deadline.
    pub async fn check_with_deadline(
        orchestrator: &ProbeOrchestrator,
        domain: &str,
        deadline: Duration,
    ) -> BlockCheckResult<Report> {
        let domain = validate_domain(domain)?;
        if let Ok(report) = tokio::time::timeout(deadline, orchestrator.run(&domain)).await {
            Ok(report)
        } else {
            warn!(
                "[PROBE] Run for {domain} exceeded {:.2}s deadline",
                deadline.as_secs_f64()
            );
            Err(BlockCheckError::DeadlineExceeded(deadline.as_secs_f64()))
        }
    }
}
