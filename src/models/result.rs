//! Uniform probe result and its per-category details

use crate::types::{Category, Status};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Negotiated TLS session facts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TlsInfo {
    /// `TLSv1.2` / `TLSv1.3`
    pub version: Option<String>,
    pub cert_valid: bool,
}

/// How a QUIC endpoint was confirmed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuicProtocol {
    #[serde(rename = "QUIC/HTTP3")]
    Http3,
    #[serde(rename = "QUIC/UDP")]
    Udp,
    /// Nothing confirmed either way
    #[serde(rename = "QUIC")]
    Unconfirmed,
}

impl fmt::Display for QuicProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            QuicProtocol::Http3 => "QUIC/HTTP3",
            QuicProtocol::Udp => "QUIC/UDP",
            QuicProtocol::Unconfirmed => "QUIC",
        })
    }
}

/// Where a bandwidth figure came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpeedSource {
    Ookla,
    Cloudflare,
}

impl fmt::Display for SpeedSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SpeedSource::Ookla => "ookla",
            SpeedSource::Cloudflare => "cloudflare",
        })
    }
}

/// Bandwidth tier a measurement lands in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BandwidthTier {
    Recommended,
    Minimum,
    Degraded,
    Insufficient,
}

impl BandwidthTier {
    pub fn status(&self) -> Status {
        match self {
            BandwidthTier::Recommended | BandwidthTier::Minimum => Status::Pass,
            BandwidthTier::Degraded => Status::Warn,
            BandwidthTier::Insufficient => Status::Fail,
        }
    }

    /// Advisory note shown next to the figures
    pub fn note(&self) -> &'static str {
        match self {
            BandwidthTier::Recommended => "Meets recommended bandwidth",
            BandwidthTier::Minimum => "Meets minimum bandwidth; below recommended",
            BandwidthTier::Degraded => "Below minimum bandwidth; degraded service expected",
            BandwidthTier::Insufficient => "Insufficient bandwidth",
        }
    }
}

/// Category-specific part of a [`ProbeResult`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "category", rename_all = "snake_case")]
pub enum ProbeDetail {
    Dns {
        #[serde(skip_serializing_if = "Option::is_none")]
        ip: Option<String>,
    },
    Tcp {
        #[serde(skip_serializing_if = "Option::is_none")]
        tls: Option<TlsInfo>,
    },
    Https {
        #[serde(skip_serializing_if = "Option::is_none")]
        http_status: Option<u16>,
        #[serde(skip_serializing_if = "Option::is_none")]
        tls: Option<TlsInfo>,
    },
    Quic {
        protocol: QuicProtocol,
        #[serde(skip_serializing_if = "Option::is_none")]
        note: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        response_bytes: Option<usize>,
    },
    UdpRange {
        sampled: usize,
        accessible: usize,
        note: String,
    },
    Ping {
        #[serde(skip_serializing_if = "Option::is_none")]
        output: Option<String>,
    },
    Ntp {
        #[serde(skip_serializing_if = "Option::is_none")]
        offset_ms: Option<i64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        stratum: Option<u8>,
    },
    Speedtest {
        #[serde(skip_serializing_if = "Option::is_none")]
        source: Option<SpeedSource>,
        #[serde(skip_serializing_if = "Option::is_none")]
        download_mbps: Option<f64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        upload_mbps: Option<f64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        tier: Option<BandwidthTier>,
        #[serde(skip_serializing_if = "Option::is_none")]
        note: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        server: Option<String>,
    },
}

impl ProbeDetail {
    pub fn category(&self) -> Category {
        match self {
            ProbeDetail::Dns { .. } => Category::Dns,
            ProbeDetail::Tcp { .. } => Category::Tcp,
            ProbeDetail::Https { .. } => Category::Https,
            ProbeDetail::Quic { .. } => Category::Quic,
            ProbeDetail::UdpRange { .. } => Category::UdpRange,
            ProbeDetail::Ping { .. } => Category::Ping,
            ProbeDetail::Ntp { .. } => Category::Ntp,
            ProbeDetail::Speedtest { .. } => Category::Speedtest,
        }
    }

    /// Empty speedtest detail, used for failures
    pub fn speedtest_empty() -> Self {
        ProbeDetail::Speedtest {
            source: None,
            download_mbps: None,
            upload_mbps: None,
            tier: None,
            note: None,
            server: None,
        }
    }
}

/// Outcome of one probe against one target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeResult {
    /// Target identifier (`host`, `host:port`, URL, port range)
    pub target: String,
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(flatten)]
    pub detail: ProbeDetail,
}

impl ProbeResult {
    pub fn new<S: Into<String>>(target: S, status: Status, detail: ProbeDetail) -> Self {
        Self {
            target: target.into(),
            status,
            latency_ms: None,
            error: None,
            label: None,
            detail,
        }
    }

    pub fn pass<S: Into<String>>(target: S, detail: ProbeDetail) -> Self {
        Self::new(target, Status::Pass, detail)
    }

    pub fn warn<S: Into<String>>(target: S, detail: ProbeDetail) -> Self {
        Self::new(target, Status::Warn, detail)
    }

    pub fn fail<S: Into<String>, E: ToString>(target: S, detail: ProbeDetail, error: E) -> Self {
        Self::new(target, Status::Fail, detail).with_error(error)
    }

    pub fn with_latency(mut self, elapsed: Duration) -> Self {
        self.latency_ms = Some(elapsed.as_millis() as u64);
        self
    }

    pub fn with_latency_ms(mut self, latency_ms: u64) -> Self {
        self.latency_ms = Some(latency_ms);
        self
    }

    pub fn with_error<E: ToString>(mut self, error: E) -> Self {
        self.error = Some(error.to_string());
        self
    }

    pub fn with_label(mut self, label: Option<String>) -> Self {
        self.label = label;
        self
    }

    pub fn category(&self) -> Category {
        self.detail.category()
    }

    /// Label if present, otherwise the target
    pub fn display_name(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.target)
    }
}
