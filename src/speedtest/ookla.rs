//! Ookla speedtest CLI provider

use crate::error::{AppError, Result};
use crate::probes::command::{args, CommandRunner};
use serde::Deserialize;
use std::time::Duration;

const PROGRAM: &str = "speedtest";

/// Figures taken from one CLI run
#[derive(Debug, Clone, PartialEq)]
pub struct OoklaReport {
    pub download_mbps: f64,
    pub upload_mbps: f64,
    pub latency_ms: Option<u64>,
    pub server: String,
}

#[derive(Debug, Deserialize)]
struct RawReport {
    download: RawTransfer,
    upload: RawTransfer,
    #[serde(default)]
    ping: Option<RawPing>,
    #[serde(default)]
    server: Option<RawServer>,
}

#[derive(Debug, Deserialize)]
struct RawTransfer {
    /// Bytes per second
    bandwidth: f64,
}

#[derive(Debug, Deserialize)]
struct RawPing {
    latency: f64,
}

#[derive(Debug, Deserialize)]
struct RawServer {
    #[serde(default)]
    name: Option<String>,
}

/// Bytes per second to megabits per second, one decimal
pub fn to_mbps(bytes_per_second: f64) -> f64 {
    (bytes_per_second * 8.0 / 1_000_000.0 * 10.0).round() / 10.0
}

/// Parse the `-f json` report
pub fn parse_report(stdout: &str) -> Result<OoklaReport> {
    let raw: RawReport = serde_json::from_str(stdout.trim())?;

    Ok(OoklaReport {
        download_mbps: to_mbps(raw.download.bandwidth),
        upload_mbps: to_mbps(raw.upload.bandwidth),
        latency_ms: raw.ping.map(|p| p.latency.max(0.0).round() as u64),
        server: raw
            .server
            .and_then(|s| s.name)
            .unwrap_or_else(|| "Unknown".to_string()),
    })
}

/// Run the CLI once; any failure means the provider is unavailable
pub async fn run(commands: &dyn CommandRunner, timeout: Duration) -> Result<OoklaReport> {
    let output = commands
        .run(
            PROGRAM,
            &args(&["--accept-license", "--accept-gdpr", "-f", "json", "--progress=no"]),
            timeout,
        )
        .await?;

    if !output.success() {
        let stderr = output.stderr.trim();
        return Err(AppError::tooling(if stderr.is_empty() {
            format!("{} exited with status {}", PROGRAM, output.exit_code)
        } else {
            format!("{} failed: {}", PROGRAM, stderr)
        }));
    }

    parse_report(&output.stdout)
}
