//! Network Readiness Probe
//!
//! Runs a battery of connectivity probes (DNS, TCP/TLS, HTTPS, QUIC, sampled
//! UDP port ranges, ICMP ping, NTP and bandwidth) against a target list and
//! scores every check PASS, WARN or FAIL.

pub mod cli;
pub mod config;
pub mod error;
pub mod job;
pub mod logging;
pub mod models;
pub mod output;
pub mod probes;
pub mod runner;
pub mod speedtest;
pub mod types;

// Re-export commonly used types
pub use error::{AppError, Result};
pub use job::{CompletionSink, JobController, JobId, JobStatus, JsonHistorySink, RunState};
pub use models::{Config, ProbeDetail, ProbeResult, ResultEnvelope, RunSummary, TargetSet};
pub use output::{ColoredFormatter, OutputFormatter, OutputFormatterFactory, PlainFormatter};
pub use probes::{NetworkProbes, ProbeSettings, ProbeSuite};
pub use runner::StepRunner;
pub use types::{Category, ExecutionMode, Status};

/// Application version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const PKG_NAME: &str = env!("CARGO_PKG_NAME");
pub const PKG_DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// Default configuration values
pub mod defaults {
    use std::time::Duration;

    pub const DEFAULT_DNS_TIMEOUT: Duration = Duration::from_secs(3);
    pub const DEFAULT_TCP_TIMEOUT: Duration = Duration::from_secs(5);
    pub const DEFAULT_HTTPS_TIMEOUT: Duration = Duration::from_secs(10);
    pub const DEFAULT_QUIC_TIMEOUT: Duration = Duration::from_secs(5);
    pub const DEFAULT_UDP_WAIT: Duration = Duration::from_secs(1);
    pub const DEFAULT_PING_COUNT: u32 = 2;
    pub const DEFAULT_PING_TIMEOUT: Duration = Duration::from_secs(8);
    pub const DEFAULT_NTP_TIMEOUT: Duration = Duration::from_secs(3);
    pub const DEFAULT_TLS_PORTS: &[u16] = &[443];

    pub const DEFAULT_OOKLA_TIMEOUT: Duration = Duration::from_secs(120);
    pub const DEFAULT_SPEEDTEST_ENDPOINT: &str = "https://speed.cloudflare.com";
    pub const DEFAULT_SPEEDTEST_ROUNDS: u32 = 2;
    pub const DEFAULT_SPEEDTEST_PAUSE: Duration = Duration::from_secs(2);
    pub const DEFAULT_TRANSFER_TIMEOUT: Duration = Duration::from_secs(45);
    pub const DEFAULT_DOWNLOAD_BYTES: u64 = 25_000_000;
    pub const DEFAULT_UPLOAD_BYTES: u64 = 10_000_000;

    pub const DEFAULT_UDP_SAMPLE_SIZE: usize = 5;
    pub const DEFAULT_NTP_SERVER: &str = "pool.ntp.org";
    pub const DEFAULT_ENABLE_COLOR: bool = true;
    /// Runs kept in a history directory
    pub const DEFAULT_HISTORY_RETENTION: usize = 100;

    pub const DEFAULT_DNS_TARGETS: &[&str] = &["google.com", "cloudflare.com", "github.com", "8.8.8.8"];
    pub const DEFAULT_TCP_TARGETS: &[(&str, u16, &str)] = &[
        ("google.com", 443, "Google HTTPS"),
        ("cloudflare.com", 443, "Cloudflare HTTPS"),
    ];
    pub const DEFAULT_HTTPS_TARGETS: &[(&str, &str)] = &[
        ("https://www.google.com/", "Google"),
        ("https://www.cloudflare.com/", "Cloudflare"),
    ];
    pub const DEFAULT_QUIC_TARGETS: &[(&str, u16, &str)] = &[
        ("cloudflare.com", 443, "Cloudflare QUIC"),
        ("google.com", 443, "Google QUIC"),
    ];
    /// (host, start port, end port, sample size, label)
    pub const DEFAULT_UDP_RANGES: &[(&str, u16, u16, usize, &str)] = &[
        ("stun.l.google.com", 19302, 19309, 5, "WebRTC STUN"),
    ];
    pub const DEFAULT_PING_TARGETS: &[&str] = &["8.8.8.8", "1.1.1.1", "google.com"];
}
