//! `blockcheck` entry point.
//!
//! Checks whether each given domain appears blocked from the current network
//! and prints a readable report, or the raw JSON report with `--json`.

mod render;
mod settings;

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use blockcheck_core::{BlockCheckError, ProbeConfig, ProbeOrchestrator, ProbeService, Report};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "blockcheck")]
#[command(about = "Check whether a domain appears to be blocked from this network", long_about = None)]
struct Args {
    /// Domains to check; prompts for one when omitted
    domains: Vec<String>,

    /// Config file (TOML). Defaults to <config dir>/blockcheck/config.toml if present
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// Per-probe timeout in seconds, overriding the config file
    #[arg(long, short = 't')]
    timeout: Option<f64>,

    /// Print the JSON report instead of the readable one (an array when several
    /// domains are given)
    #[arg(long, short = 'j')]
    json: bool,

    /// Also save the JSON report to this file (an array when several domains are given)
    #[arg(long, short = 'o')]
    output: Option<PathBuf>,

    /// More log output on stderr (-v debug, -vv trace)
    #[arg(long, short = 'v', action = clap::ArgAction::Count)]
    verbose: u8,

    /// Print the default config to stdout and exit
    #[arg(long)]
    print_config: bool,
}

fn default_log_level(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    }
}

fn init_tracing(verbose: u8) {
    // RUST_LOG wins over -v
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_log_level(verbose)));
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .without_time(),
        )
        .with(filter)
        .init();
}

/// Build the run configuration from the config file and flags.
fn resolve_config(args: &Args) -> Result<ProbeConfig> {
    let mut config = settings::load_config(args.config.as_deref())?;
    if let Some(secs) = args.timeout {
        let timeout = Duration::try_from_secs_f64(secs)
            .with_context(|| format!("Invalid --timeout value: {secs}"))?;
        config = config.with_timeout(timeout);
    }
    config.validate()?;
    Ok(config)
}

fn prompt_domain() -> Result<String> {
    print!("Domain to check: ");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read domain from stdin")?;
    Ok(line.trim().to_string())
}

/// Check one domain, printing the readable report unless `json` is set.
/// `None` when the domain was rejected.
async fn check_one(
    orchestrator: &ProbeOrchestrator,
    domain: &str,
    json: bool,
) -> Result<Option<Report>> {
    let mut stdout = io::stdout();
    if !json {
        render::write_header(&mut stdout, domain.trim())?;
        stdout.flush()?;
    }

    let report = match ProbeService::check_with(orchestrator, domain).await {
        Ok(report) => report,
        Err(e) => {
            log_check_error(domain, &e);
            return Ok(None);
        }
    };

    if !json {
        render::write_report(&mut stdout, &report)?;
    }
    Ok(Some(report))
}

/// One JSON document: the report itself for a single domain, else an array.
fn encode_reports(reports: &[Report], several_domains: bool) -> Result<String> {
    match reports {
        [single] if !several_domains => serde_json::to_string_pretty(single),
        many => serde_json::to_string_pretty(many),
    }
    .context("Failed to encode report")
}

fn save_reports(path: &Path, text: &str, count: usize) -> Result<()> {
    std::fs::write(path, text).with_context(|| format!("Failed to write {}", path.display()))?;
    tracing::info!("Saved {count} report(s) to {}", path.display());
    Ok(())
}

fn log_check_error(domain: &str, err: &BlockCheckError) {
    if err.is_expected() {
        tracing::warn!("{domain:?}: {err}");
    } else {
        tracing::error!("{domain:?}: {err}");
    }
    eprintln!("error: {err}");
}

async fn run(args: Args) -> Result<bool> {
    if args.print_config {
        print!("{}", settings::default_config_toml()?);
        return Ok(true);
    }

    let config = resolve_config(&args)?;
    let domains = if args.domains.is_empty() {
        vec![prompt_domain()?]
    } else {
        args.domains.clone()
    };

    tracing::debug!(
        "Checking {} domain(s) with {} resolver(s), timeout {:?}",
        domains.len(),
        config.resolvers.len(),
        config.timeout
    );
    let orchestrator = ProbeOrchestrator::live(config);

    let mut reports = Vec::with_capacity(domains.len());
    for domain in &domains {
        if let Some(report) = check_one(&orchestrator, domain, args.json).await? {
            reports.push(report);
        }
    }

    if args.json || args.output.is_some() {
        let text = encode_reports(&reports, domains.len() > 1)?;
        if args.json {
            println!("{text}");
        }
        if let Some(path) = &args.output {
            save_reports(path, &text, reports.len())?;
        }
    }
    Ok(reports.len() == domains.len())
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.verbose);

    match run(args).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            tracing::error!("{e:#}");
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
