//! Result envelope keyed by category

use crate::models::ProbeResult;
use crate::types::{Category, Status};
use serde::{Deserialize, Serialize};

/// Results of one run, grouped by category in run order.
///
/// `ntp` and `speedtest` are singleton-or-absent. `_meta` is caller-supplied
/// and carried through untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultEnvelope {
    #[serde(default)]
    pub dns: Vec<ProbeResult>,
    #[serde(default)]
    pub tcp: Vec<ProbeResult>,
    #[serde(default)]
    pub https: Vec<ProbeResult>,
    #[serde(default)]
    pub quic: Vec<ProbeResult>,
    #[serde(default)]
    pub udp_range: Vec<ProbeResult>,
    #[serde(default)]
    pub ping: Vec<ProbeResult>,
    #[serde(default)]
    pub ntp: Option<ProbeResult>,
    #[serde(default)]
    pub speedtest: Option<ProbeResult>,
    #[serde(rename = "_meta", default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<serde_json::Value>,
}

impl ResultEnvelope {
    pub fn new(meta: Option<serde_json::Value>) -> Self {
        Self {
            meta,
            ..Default::default()
        }
    }

    /// File a result under `category`
    pub fn push(&mut self, category: Category, result: ProbeResult) {
        match category {
            Category::Dns => self.dns.push(result),
            Category::Tcp => self.tcp.push(result),
            Category::Https => self.https.push(result),
            Category::Quic => self.quic.push(result),
            Category::UdpRange => self.udp_range.push(result),
            Category::Ping => self.ping.push(result),
            Category::Ntp => self.ntp = Some(result),
            Category::Speedtest => self.speedtest = Some(result),
        }
    }

    /// Results of one category
    pub fn category(&self, category: Category) -> &[ProbeResult] {
        match category {
            Category::Dns => &self.dns,
            Category::Tcp => &self.tcp,
            Category::Https => &self.https,
            Category::Quic => &self.quic,
            Category::UdpRange => &self.udp_range,
            Category::Ping => &self.ping,
            Category::Ntp => self.ntp.as_slice(),
            Category::Speedtest => self.speedtest.as_slice(),
        }
    }

    /// Every result in run order
    pub fn iter(&self) -> impl Iterator<Item = (Category, &ProbeResult)> + '_ {
        Category::ORDER
            .iter()
            .flat_map(move |&category| self.category(category).iter().map(move |r| (category, r)))
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary::from_results(self.iter().map(|(_, r)| r))
    }
}

/// PASS/WARN/FAIL tallies of a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub total: usize,
    pub passed: usize,
    pub warnings: usize,
    pub failed: usize,
}

impl RunSummary {
    pub fn from_results<'a, I>(results: I) -> Self
    where
        I: IntoIterator<Item = &'a ProbeResult>,
    {
        let mut summary = RunSummary::default();
        for result in results {
            summary.total += 1;
            match result.status {
                Status::Pass => summary.passed += 1,
                Status::Warn => summary.warnings += 1,
                Status::Fail => summary.failed += 1,
            }
        }
        summary
    }

    /// Worst status seen, PASS for an empty run
    pub fn overall(&self) -> Status {
        if self.failed > 0 {
            Status::Fail
        } else if self.warnings > 0 {
            Status::Warn
        } else {
            Status::Pass
        }
    }

    pub fn pass_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.passed as f64 * 100.0 / self.total as f64
        }
    }
}
