//! Human-readable report rendering.

use std::io::{self, Write};

use blockcheck_core::{ConnectivityRecord, Report, TlsOutcome};

const RULE: &str = "============================";
const THIN_RULE: &str = "----------------------------";

fn tcp_label(ok: bool) -> &'static str {
    if ok {
        "✔ open"
    } else {
        "❌ unreachable"
    }
}

fn tls_label(outcome: TlsOutcome) -> &'static str {
    match outcome {
        TlsOutcome::Success => "✔ handshake ok",
        TlsOutcome::Reset => "❌ reset (suspected SNI block)",
        TlsOutcome::OtherFailure => "❌ handshake failed",
    }
}

fn http_label(ok: bool) -> &'static str {
    if ok {
        "✔ responded"
    } else {
        "❌ no response"
    }
}

pub fn write_header(out: &mut impl Write, domain: &str) -> io::Result<()> {
    writeln!(out, "{RULE}")?;
    writeln!(out, "  blockcheck")?;
    writeln!(out, "{RULE}")?;
    writeln!(out, "Target: {domain}")?;
    writeln!(out)
}

fn write_dns(out: &mut impl Write, report: &Report) -> io::Result<()> {
    writeln!(out, "DNS")?;
    let width = report.dns.keys().map(String::len).max().unwrap_or(0);
    for (name, ips) in &report.dns {
        let answer = if ips.is_empty() {
            "(no answer)".to_string()
        } else {
            ips.join(", ")
        };
        writeln!(out, "  {name:<width$} => {answer}")?;
    }
    let mark = if report.summary.dns_pollution { "⚠️" } else { "✔" };
    writeln!(out)?;
    writeln!(out, "{mark} {}", report.summary.dns_status)?;
    writeln!(out, "{THIN_RULE}")
}

fn write_address(out: &mut impl Write, ip: &str, record: &ConnectivityRecord) -> io::Result<()> {
    writeln!(out, "Address {ip}")?;
    for (port, ok) in record.tcp_results() {
        writeln!(out, "  TCP {port:<5}: {}", tcp_label(ok))?;
    }
    if let Some(tls) = record.tls() {
        writeln!(out, "  TLS      : {}", tls_label(tls))?;
    }
    if let Some(http) = record.http() {
        writeln!(out, "  HTTP     : {}", http_label(http))?;
    }
    writeln!(out)
}

fn write_verdict(out: &mut impl Write, report: &Report) -> io::Result<()> {
    let summary = &report.summary;
    if let Some(error) = &summary.error {
        writeln!(out, "❌ {error}; connectivity checks skipped.")?;
    }
    if let Some(verdict) = &summary.verdict {
        for indicator in &verdict.blocked_indicators {
            writeln!(out, "  - {indicator}")?;
        }
        let mark = if verdict.is_blocked { "⚠️" } else { "✔" };
        writeln!(out, "{mark} {}", verdict.conclusion)?;
    }
    writeln!(out, "Finished in {:.2}s", summary.elapsed_time)?;
    writeln!(out, "{RULE}")
}

/// Render everything after the header, in pipeline order.
pub fn write_report(out: &mut impl Write, report: &Report) -> io::Result<()> {
    write_dns(out, report)?;
    writeln!(out)?;
    for (ip, record) in &report.connectivity {
        write_address(out, ip, record)?;
    }
    write_verdict(out, report)
}
