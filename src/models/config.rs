//! Configuration data model and validation

use crate::speedtest::BandwidthThresholds;
use crate::types::{AppError, ExecutionMode, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// JSON target list; built-in targets when unset
    #[serde(default)]
    pub targets_file: Option<String>,

    /// DNS lookup timeout
    #[serde(default = "default_dns_timeout_secs")]
    pub dns_timeout_seconds: u64,

    /// TCP connect (and TLS handshake) timeout
    #[serde(default = "default_tcp_timeout_secs")]
    pub tcp_timeout_seconds: u64,

    /// HTTPS full-check timeout
    #[serde(default = "default_https_timeout_secs")]
    pub https_timeout_seconds: u64,

    /// HTTP/3 request timeout; the UDP stages add their own waits
    #[serde(default = "default_quic_timeout_secs")]
    pub quic_timeout_seconds: u64,

    /// How long a UDP probe waits for a reply before calling it silence
    #[serde(default = "default_udp_wait_ms")]
    pub udp_wait_ms: u64,

    /// Fixed seed for UDP port sampling
    #[serde(default)]
    pub udp_seed: Option<u64>,

    /// Echo requests per ping target
    #[serde(default = "default_ping_count")]
    pub ping_count: u32,

    /// Guard timeout around the ping utility
    #[serde(default = "default_ping_timeout_secs")]
    pub ping_timeout_seconds: u64,

    /// NTP request timeout
    #[serde(default = "default_ntp_timeout_secs")]
    pub ntp_timeout_seconds: u64,

    /// Ports on which a TCP probe with `verify_tls` performs a handshake
    #[serde(default = "default_tls_ports")]
    pub tls_ports: Vec<u16>,

    /// Try the Ookla CLI before the HTTP fallback
    #[serde(default = "default_use_ookla")]
    pub use_ookla: bool,

    /// Guard timeout around the Ookla CLI
    #[serde(default = "default_ookla_timeout_secs")]
    pub ookla_timeout_seconds: u64,

    /// Base URL of the HTTP speed test endpoint
    #[serde(default = "default_speedtest_endpoint")]
    pub speedtest_endpoint: String,

    /// Download+upload rounds of the HTTP fallback
    #[serde(default = "default_speedtest_rounds")]
    pub speedtest_rounds: u32,

    /// Pause between fallback rounds
    #[serde(default = "default_speedtest_pause_ms")]
    pub speedtest_pause_ms: u64,

    /// Per-transfer timeout of the HTTP fallback
    #[serde(default = "default_speedtest_timeout_secs")]
    pub speedtest_timeout_seconds: u64,

    /// Download payload size in bytes
    #[serde(default = "default_download_bytes")]
    pub download_bytes: u64,

    /// Upload payload size in bytes
    #[serde(default = "default_upload_bytes")]
    pub upload_bytes: u64,

    /// Tier boundaries for bandwidth classification
    #[serde(default)]
    pub bandwidth_thresholds: BandwidthThresholds,

    /// Probes in flight per category batch; 0 runs sequentially
    #[serde(default)]
    pub concurrency: usize,

    /// Site label copied into the result metadata
    #[serde(default)]
    pub site_label: Option<String>,

    /// Enable colored terminal output
    #[serde(default = "default_enable_color")]
    pub enable_color: bool,

    /// Enable verbose output
    #[serde(default)]
    pub verbose: bool,

    /// Enable debug output
    #[serde(default)]
    pub debug: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            targets_file: None,
            dns_timeout_seconds: default_dns_timeout_secs(),
            tcp_timeout_seconds: default_tcp_timeout_secs(),
            https_timeout_seconds: default_https_timeout_secs(),
            quic_timeout_seconds: default_quic_timeout_secs(),
            udp_wait_ms: default_udp_wait_ms(),
            udp_seed: None,
            ping_count: default_ping_count(),
            ping_timeout_seconds: default_ping_timeout_secs(),
            ntp_timeout_seconds: default_ntp_timeout_secs(),
            tls_ports: default_tls_ports(),
            use_ookla: default_use_ookla(),
            ookla_timeout_seconds: default_ookla_timeout_secs(),
            speedtest_endpoint: default_speedtest_endpoint(),
            speedtest_rounds: default_speedtest_rounds(),
            speedtest_pause_ms: default_speedtest_pause_ms(),
            speedtest_timeout_seconds: default_speedtest_timeout_secs(),
            download_bytes: default_download_bytes(),
            upload_bytes: default_upload_bytes(),
            bandwidth_thresholds: BandwidthThresholds::default(),
            concurrency: 0,
            site_label: None,
            enable_color: default_enable_color(),
            verbose: false,
            debug: false,
        }
    }
}

impl Config {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dns_timeout(&self) -> Duration {
        Duration::from_secs(self.dns_timeout_seconds)
    }

    pub fn tcp_timeout(&self) -> Duration {
        Duration::from_secs(self.tcp_timeout_seconds)
    }

    pub fn https_timeout(&self) -> Duration {
        Duration::from_secs(self.https_timeout_seconds)
    }

    pub fn quic_timeout(&self) -> Duration {
        Duration::from_secs(self.quic_timeout_seconds)
    }

    pub fn udp_wait(&self) -> Duration {
        Duration::from_millis(self.udp_wait_ms)
    }

    pub fn ping_timeout(&self) -> Duration {
        Duration::from_secs(self.ping_timeout_seconds)
    }

    pub fn ntp_timeout(&self) -> Duration {
        Duration::from_secs(self.ntp_timeout_seconds)
    }

    pub fn execution_mode(&self) -> ExecutionMode {
        ExecutionMode::from_concurrency(self.concurrency)
    }

    /// Validate the configuration and return any errors
    pub fn validate(&self) -> Result<()> {
        let timeouts = [
            ("DNS timeout", self.dns_timeout_seconds),
            ("TCP timeout", self.tcp_timeout_seconds),
            ("HTTPS timeout", self.https_timeout_seconds),
            ("QUIC timeout", self.quic_timeout_seconds),
            ("Ping timeout", self.ping_timeout_seconds),
            ("NTP timeout", self.ntp_timeout_seconds),
            ("Speedtest timeout", self.speedtest_timeout_seconds),
            ("Ookla timeout", self.ookla_timeout_seconds),
        ];
        for (name, seconds) in timeouts {
            if seconds == 0 {
                return Err(AppError::config(format!("{} must be greater than 0", name)));
            }
            if seconds > 300 {
                return Err(AppError::config(format!("{} cannot exceed 300 seconds", name)));
            }
        }

        if self.udp_wait_ms == 0 || self.udp_wait_ms > 10_000 {
            return Err(AppError::config("UDP wait must be between 1 and 10000 ms"));
        }

        if self.ping_count == 0 || self.ping_count > 20 {
            return Err(AppError::config("Ping count must be between 1 and 20"));
        }

        if self.tls_ports.iter().any(|&port| port == 0) {
            return Err(AppError::config("TLS ports cannot contain port 0"));
        }

        match url::Url::parse(&self.speedtest_endpoint) {
            Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => {}
            Ok(_) => {
                return Err(AppError::config(format!(
                    "Speedtest endpoint must use HTTP or HTTPS: {}",
                    self.speedtest_endpoint
                )))
            }
            Err(e) => {
                return Err(AppError::config(format!(
                    "Invalid speedtest endpoint '{}': {}",
                    self.speedtest_endpoint, e
                )))
            }
        }

        if self.speedtest_rounds == 0 || self.speedtest_rounds > 10 {
            return Err(AppError::config("Speedtest rounds must be between 1 and 10"));
        }

        if self.download_bytes == 0 || self.upload_bytes == 0 {
            return Err(AppError::config("Speedtest payload sizes must be greater than 0"));
        }

        self.bandwidth_thresholds.validate()?;

        if self.concurrency > 256 {
            return Err(AppError::config("Concurrency cannot exceed 256"));
        }

        if let Some(path) = &self.targets_file {
            if path.trim().is_empty() {
                return Err(AppError::config("Targets file path cannot be empty"));
            }
        }

        Ok(())
    }

    /// Merge environment variables into this configuration
    pub fn merge_from_env(&mut self) -> Result<()> {
        if let Ok(path) = std::env::var("TARGETS_FILE") {
            let path = path.trim().to_string();
            if !path.is_empty() {
                self.targets_file = Some(path);
            }
        }

        if let Some(value) = env_value("DNS_TIMEOUT_SECONDS")? {
            self.dns_timeout_seconds = value;
        }
        if let Some(value) = env_value("TCP_TIMEOUT_SECONDS")? {
            self.tcp_timeout_seconds = value;
        }
        if let Some(value) = env_value("HTTPS_TIMEOUT_SECONDS")? {
            self.https_timeout_seconds = value;
        }
        if let Some(value) = env_value("QUIC_TIMEOUT_SECONDS")? {
            self.quic_timeout_seconds = value;
        }
        if let Some(value) = env_value("UDP_WAIT_MS")? {
            self.udp_wait_ms = value;
        }
        if let Some(value) = env_value("PING_COUNT")? {
            self.ping_count = value;
        }
        if let Some(value) = env_value("NTP_TIMEOUT_SECONDS")? {
            self.ntp_timeout_seconds = value;
        }

        if let Ok(endpoint) = std::env::var("SPEEDTEST_ENDPOINT") {
            self.speedtest_endpoint = endpoint.trim().trim_end_matches('/').to_string();
        }
        if let Some(value) = env_value("SPEEDTEST_ROUNDS")? {
            self.speedtest_rounds = value;
        }
        if let Some(value) = env_value("CONCURRENCY")? {
            self.concurrency = value;
        }

        if let Ok(label) = std::env::var("SITE_LABEL") {
            let label = label.trim().to_string();
            self.site_label = if label.is_empty() { None } else { Some(label) };
        }

        if let Some(value) = env_value("ENABLE_COLOR")? {
            self.enable_color = value;
        }

        Ok(())
    }
}

fn env_value<T>(key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| AppError::config(format!("Invalid {} value '{}': {}", key, raw, e))),
        Err(_) => Ok(None),
    }
}

// Default value functions for serde
fn default_dns_timeout_secs() -> u64 {
    crate::defaults::DEFAULT_DNS_TIMEOUT.as_secs()
}

fn default_tcp_timeout_secs() -> u64 {
    crate::defaults::DEFAULT_TCP_TIMEOUT.as_secs()
}

fn default_https_timeout_secs() -> u64 {
    crate::defaults::DEFAULT_HTTPS_TIMEOUT.as_secs()
}

fn default_quic_timeout_secs() -> u64 {
    crate::defaults::DEFAULT_QUIC_TIMEOUT.as_secs()
}

fn default_udp_wait_ms() -> u64 {
    crate::defaults::DEFAULT_UDP_WAIT.as_millis() as u64
}

fn default_ping_count() -> u32 {
    crate::defaults::DEFAULT_PING_COUNT
}

fn default_ping_timeout_secs() -> u64 {
    crate::defaults::DEFAULT_PING_TIMEOUT.as_secs()
}

fn default_ntp_timeout_secs() -> u64 {
    crate::defaults::DEFAULT_NTP_TIMEOUT.as_secs()
}

fn default_tls_ports() -> Vec<u16> {
    crate::defaults::DEFAULT_TLS_PORTS.to_vec()
}

fn default_use_ookla() -> bool {
    true
}

fn default_ookla_timeout_secs() -> u64 {
    crate::defaults::DEFAULT_OOKLA_TIMEOUT.as_secs()
}

fn default_speedtest_endpoint() -> String {
    crate::defaults::DEFAULT_SPEEDTEST_ENDPOINT.to_string()
}

fn default_speedtest_rounds() -> u32 {
    crate::defaults::DEFAULT_SPEEDTEST_ROUNDS
}

fn default_speedtest_pause_ms() -> u64 {
    crate::defaults::DEFAULT_SPEEDTEST_PAUSE.as_millis() as u64
}

fn default_speedtest_timeout_secs() -> u64 {
    crate::defaults::DEFAULT_TRANSFER_TIMEOUT.as_secs()
}

fn default_download_bytes() -> u64 {
    crate::defaults::DEFAULT_DOWNLOAD_BYTES
}

fn default_upload_bytes() -> u64 {
    crate::defaults::DEFAULT_UPLOAD_BYTES
}

fn default_enable_color() -> bool {
    crate::defaults::DEFAULT_ENABLE_COLOR
}
