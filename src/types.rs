//! Type definitions and aliases

use serde::{Deserialize, Serialize};
use std::fmt;

// Re-export commonly used types
pub use crate::error::{AppError, Result};

/// Verdict of a single probe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
    /// Check succeeded
    Pass,
    /// Inconclusive or degraded, but not a hard failure
    Warn,
    /// Check failed
    Fail,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Pass => "PASS",
            Status::Warn => "WARN",
            Status::Fail => "FAIL",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Probe category, in the order a run produces them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Dns,
    Tcp,
    Https,
    Quic,
    UdpRange,
    Ping,
    Ntp,
    Speedtest,
}

impl Category {
    /// Fixed result order of a run
    pub const ORDER: [Category; 8] = [
        Category::Dns,
        Category::Tcp,
        Category::Https,
        Category::Quic,
        Category::UdpRange,
        Category::Ping,
        Category::Ntp,
        Category::Speedtest,
    ];

    /// Envelope key for this category
    pub fn key(&self) -> &'static str {
        match self {
            Category::Dns => "dns",
            Category::Tcp => "tcp",
            Category::Https => "https",
            Category::Quic => "quic",
            Category::UdpRange => "udp_range",
            Category::Ping => "ping",
            Category::Ntp => "ntp",
            Category::Speedtest => "speedtest",
        }
    }

    /// Human-readable section title
    pub fn title(&self) -> &'static str {
        match self {
            Category::Dns => "DNS Resolution",
            Category::Tcp => "TCP Connectivity",
            Category::Https => "HTTPS Full Check",
            Category::Quic => "QUIC / HTTP3",
            Category::UdpRange => "UDP Port Ranges",
            Category::Ping => "ICMP Ping",
            Category::Ntp => "NTP Time Sync",
            Category::Speedtest => "Bandwidth",
        }
    }

    /// NTP and speedtest hold at most one result per run
    pub fn is_singleton(&self) -> bool {
        matches!(self, Category::Ntp | Category::Speedtest)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// How a run schedules the probes of one category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionMode {
    /// One probe at a time
    Sequential,
    /// Probe a whole category batch at once, at most `max_in_flight` at a time.
    /// Results are still yielded in target order.
    Concurrent { max_in_flight: usize },
}

impl ExecutionMode {
    /// `0` means sequential
    pub fn from_concurrency(concurrency: usize) -> Self {
        match concurrency {
            0 | 1 => ExecutionMode::Sequential,
            n => ExecutionMode::Concurrent { max_in_flight: n },
        }
    }

    /// In-flight limit sized to the host's core count
    pub fn auto_concurrency() -> usize {
        (num_cpus::get() * 2).clamp(4, 32)
    }
}

impl Default for ExecutionMode {
    fn default() -> Self {
        ExecutionMode::Sequential
    }
}
