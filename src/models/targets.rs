//! Target list for one readiness run

use crate::types::{AppError, Result};
use serde::{Deserialize, Serialize};

/// A TCP reachability target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TcpTarget {
    pub host: String,
    pub port: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Verify the certificate chain when the port is a TLS port
    #[serde(default)]
    pub verify_tls: bool,
}

/// An HTTPS full-check target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpsTarget {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// A QUIC / HTTP3 target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuicTarget {
    pub host: String,
    #[serde(default = "default_quic_port")]
    pub port: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// A sampled UDP port range
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UdpRangeTarget {
    pub host: String,
    pub start_port: u16,
    pub end_port: u16,
    #[serde(default = "default_sample_size")]
    pub sample_size: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl UdpRangeTarget {
    /// Number of ports in the inclusive range
    pub fn range_len(&self) -> usize {
        if self.end_port < self.start_port {
            0
        } else {
            usize::from(self.end_port - self.start_port) + 1
        }
    }

    /// Ports actually probed: the requested sample capped at the range size
    pub fn effective_sample(&self) -> usize {
        self.sample_size.min(self.range_len())
    }
}

/// Every target of one run, grouped by category.
///
/// List order is preserved end to end: results come back in the order the
/// targets are listed here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetSet {
    #[serde(default)]
    pub dns: Vec<String>,
    #[serde(default)]
    pub tcp: Vec<TcpTarget>,
    #[serde(default)]
    pub https: Vec<HttpsTarget>,
    #[serde(default)]
    pub quic: Vec<QuicTarget>,
    #[serde(default, alias = "udp_range")]
    pub udp_ranges: Vec<UdpRangeTarget>,
    #[serde(default)]
    pub ping: Vec<String>,
    #[serde(default = "default_ntp_server")]
    pub ntp: String,
}

impl Default for TargetSet {
    fn default() -> Self {
        use crate::defaults::*;

        Self {
            dns: DEFAULT_DNS_TARGETS.iter().map(|&s| s.to_string()).collect(),
            tcp: DEFAULT_TCP_TARGETS
                .iter()
                .map(|&(host, port, label)| TcpTarget {
                    host: host.to_string(),
                    port,
                    label: Some(label.to_string()),
                    verify_tls: true,
                })
                .collect(),
            https: DEFAULT_HTTPS_TARGETS
                .iter()
                .map(|&(url, label)| HttpsTarget {
                    url: url.to_string(),
                    label: Some(label.to_string()),
                })
                .collect(),
            quic: DEFAULT_QUIC_TARGETS
                .iter()
                .map(|&(host, port, label)| QuicTarget {
                    host: host.to_string(),
                    port,
                    label: Some(label.to_string()),
                })
                .collect(),
            udp_ranges: DEFAULT_UDP_RANGES
                .iter()
                .map(|&(host, start_port, end_port, sample_size, label)| UdpRangeTarget {
                    host: host.to_string(),
                    start_port,
                    end_port,
                    sample_size,
                    label: Some(label.to_string()),
                })
                .collect(),
            ping: DEFAULT_PING_TARGETS.iter().map(|&s| s.to_string()).collect(),
            ntp: default_ntp_server(),
        }
    }
}

impl TargetSet {
    /// A set with no list targets; NTP and speedtest still run
    pub fn empty() -> Self {
        Self {
            dns: Vec::new(),
            tcp: Vec::new(),
            https: Vec::new(),
            quic: Vec::new(),
            udp_ranges: Vec::new(),
            ping: Vec::new(),
            ntp: default_ntp_server(),
        }
    }

    /// Steps a run over this set takes: every list entry plus NTP and speedtest
    pub fn step_count(&self) -> usize {
        self.dns.len()
            + self.tcp.len()
            + self.https.len()
            + self.quic.len()
            + self.udp_ranges.len()
            + self.ping.len()
            + 2
    }

    /// Reject sets that cannot be executed
    pub fn validate(&self) -> Result<()> {
        for name in &self.dns {
            require_host(name, "DNS target")?;
        }

        for target in &self.tcp {
            require_host(&target.host, "TCP target")?;
            if target.port == 0 {
                return Err(AppError::validation(format!("TCP target {} has port 0", target.host)));
            }
        }

        for target in &self.https {
            let parsed = url::Url::parse(&target.url)
                .map_err(|e| AppError::validation(format!("Invalid HTTPS target URL '{}': {}", target.url, e)))?;
            if !matches!(parsed.scheme(), "https" | "http") {
                return Err(AppError::validation(format!(
                    "HTTPS target URL must use https: {}",
                    target.url
                )));
            }
            if parsed.host_str().is_none() {
                return Err(AppError::validation(format!("HTTPS target URL has no host: {}", target.url)));
            }
        }

        for target in &self.quic {
            require_host(&target.host, "QUIC target")?;
            if target.port == 0 {
                return Err(AppError::validation(format!("QUIC target {} has port 0", target.host)));
            }
        }

        for target in &self.udp_ranges {
            require_host(&target.host, "UDP range target")?;
            if target.start_port == 0 {
                return Err(AppError::validation(format!(
                    "UDP range for {} starts at port 0",
                    target.host
                )));
            }
            if target.start_port > target.end_port {
                return Err(AppError::validation(format!(
                    "UDP range {}-{} for {} is inverted",
                    target.start_port, target.end_port, target.host
                )));
            }
            if target.sample_size == 0 {
                return Err(AppError::validation(format!(
                    "UDP range for {} has sample size 0",
                    target.host
                )));
            }
        }

        for host in &self.ping {
            require_host(host, "Ping target")?;
        }

        require_host(&self.ntp, "NTP server")?;

        Ok(())
    }

    /// Drop blank and placeholder entries that spreadsheet exports leave behind
    pub fn retain_valid_entries(&mut self) {
        self.dns.retain(|name| is_usable_entry(name));
        self.tcp.retain(|t| is_usable_entry(&t.host) && t.port != 0);
        self.https.retain(|t| is_usable_entry(&t.url));
        self.quic.retain(|t| is_usable_entry(&t.host) && t.port != 0);
        self.udp_ranges.retain(|t| is_usable_entry(&t.host));
        self.ping.retain(|host| is_usable_entry(host));
        if !is_usable_entry(&self.ntp) {
            self.ntp = default_ntp_server();
        }
    }
}

fn require_host(value: &str, what: &str) -> Result<()> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::validation(format!("{} cannot be empty", what)));
    }
    if trimmed.chars().any(char::is_whitespace) {
        return Err(AppError::validation(format!("{} '{}' contains whitespace", what, value)));
    }
    Ok(())
}

/// Placeholder cells ("N/A", "Error ...", header rows) are not targets
pub fn is_usable_entry(value: &str) -> bool {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("n/a") {
        return false;
    }
    let lowered = trimmed.to_lowercase();
    !(lowered.starts_with("error") || lowered == "name" || lowered == "host")
}

fn default_quic_port() -> u16 {
    443
}

fn default_sample_size() -> usize {
    crate::defaults::DEFAULT_UDP_SAMPLE_SIZE
}

fn default_ntp_server() -> String {
    crate::defaults::DEFAULT_NTP_SERVER.to_string()
}
