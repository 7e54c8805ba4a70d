//! ICMP ping through the platform utility

use crate::models::{ProbeDetail, ProbeResult};
use crate::probes::command::CommandRunner;
use regex::Regex;
use std::sync::OnceLock;
use std::time::Duration;

/// Run `ping -n -c <count> <host>`; PASS iff the utility exits 0
pub async fn probe(commands: &dyn CommandRunner, host: &str, count: u32, timeout: Duration) -> ProbeResult {
    let args = vec![
        "-n".to_string(),
        "-c".to_string(),
        count.to_string(),
        host.to_string(),
    ];

    match commands.run("ping", &args, timeout).await {
        Ok(output) => {
            let tail = tail_lines(&output.stdout, 2);
            let detail = ProbeDetail::Ping {
                output: if tail.is_empty() { None } else { Some(tail) },
            };

            if output.success() {
                let result = ProbeResult::pass(host, detail);
                match parse_average_rtt(&output.stdout) {
                    Some(avg) => result.with_latency_ms(avg.round() as u64),
                    None => result,
                }
            } else {
                let stderr = output.stderr.trim();
                let error = if stderr.is_empty() {
                    format!("ping exited with status {}", output.exit_code)
                } else {
                    stderr.to_string()
                };
                ProbeResult::fail(host, detail, error)
            }
        }
        Err(e) => ProbeResult::fail(host, ProbeDetail::Ping { output: None }, e),
    }
}

/// Last `n` non-empty lines, newline-joined
pub fn tail_lines(text: &str, n: usize) -> String {
    let lines: Vec<&str> = text.lines().filter(|line| !line.trim().is_empty()).collect();
    let skip = lines.len().saturating_sub(n);
    lines[skip..].join("\n")
}

/// Average round trip from the summary line, in milliseconds.
///
/// Matches both `rtt min/avg/max/mdev` (Linux) and
/// `round-trip min/avg/max/stddev` (BSD/macOS).
pub fn parse_average_rtt(output: &str) -> Option<f64> {
    static SUMMARY: OnceLock<Option<Regex>> = OnceLock::new();
    let pattern = SUMMARY
        .get_or_init(|| Regex::new(r"min/avg/max/(?:mdev|stddev) = [\d.]+/([\d.]+)/").ok())
        .as_ref()?;

    pattern
        .captures(output)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}
