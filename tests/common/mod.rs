//! Shared fixtures for integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use network_readiness_probe::models::{
    HttpsTarget, ProbeDetail, ProbeResult, QuicProtocol, QuicTarget, TargetSet, TcpTarget, UdpRangeTarget,
};
use network_readiness_probe::probes::ProbeSuite;
use network_readiness_probe::types::Category;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Offline [`ProbeSuite`]: targets starting with `fail` FAIL, those starting
/// with `warn` WARN, everything else PASSes after `delay`.
#[derive(Default)]
pub struct ScriptedSuite {
    pub calls: Mutex<Vec<(Category, String)>>,
    pub delay: Duration,
    in_flight: AtomicUsize,
    pub peak: AtomicUsize,
}

impl ScriptedSuite {
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            ..Default::default()
        }
    }

    pub fn calls(&self) -> Vec<(Category, String)> {
        self.calls.lock().unwrap().clone()
    }

    async fn answer(&self, category: Category, target: &str, detail: ProbeDetail) -> ProbeResult {
        self.calls.lock().unwrap().push((category, target.to_string()));
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if target.starts_with("fail") {
            ProbeResult::fail(target, detail, "Network error: scripted failure")
        } else if target.starts_with("warn") {
            ProbeResult::warn(target, detail)
        } else {
            ProbeResult::pass(target, detail).with_latency_ms(5)
        }
    }
}

#[async_trait]
impl ProbeSuite for ScriptedSuite {
    async fn dns(&self, name: &str) -> ProbeResult {
        self.answer(Category::Dns, name, ProbeDetail::Dns { ip: Some("192.0.2.1".to_string()) }).await
    }

    async fn tcp(&self, target: &TcpTarget) -> ProbeResult {
        let result = self.answer(Category::Tcp, &target.host, ProbeDetail::Tcp { tls: None }).await;
        result.with_label(target.label.clone())
    }

    async fn https(&self, target: &HttpsTarget) -> ProbeResult {
        let detail = ProbeDetail::Https { http_status: Some(200), tls: None };
        self.answer(Category::Https, &target.url, detail).await
    }

    async fn quic(&self, target: &QuicTarget) -> ProbeResult {
        let detail = ProbeDetail::Quic {
            protocol: QuicProtocol::Http3,
            note: None,
            response_bytes: None,
        };
        self.answer(Category::Quic, &target.host, detail).await
    }

    async fn udp_range(&self, target: &UdpRangeTarget) -> ProbeResult {
        let detail = ProbeDetail::UdpRange {
            sampled: target.effective_sample(),
            accessible: target.effective_sample(),
            note: String::new(),
        };
        self.answer(Category::UdpRange, &target.host, detail).await
    }

    async fn ping(&self, host: &str) -> ProbeResult {
        self.answer(Category::Ping, host, ProbeDetail::Ping { output: None }).await
    }

    async fn ntp(&self, server: &str) -> ProbeResult {
        let detail = ProbeDetail::Ntp { offset_ms: Some(1), stratum: Some(2) };
        self.answer(Category::Ntp, server, detail).await
    }

    async fn speedtest(&self) -> ProbeResult {
        self.answer(Category::Speedtest, "speedtest", ProbeDetail::speedtest_empty()).await
    }
}

/// One target per category, with a FAIL in TCP and a WARN in ping
pub fn mixed_targets() -> TargetSet {
    TargetSet {
        dns: vec!["a.example".to_string(), "b.example".to_string()],
        tcp: vec![TcpTarget {
            host: "fail.example".to_string(),
            port: 443,
            label: Some("Edge".to_string()),
            verify_tls: false,
        }],
        https: vec![HttpsTarget {
            url: "https://portal.example/".to_string(),
            label: None,
        }],
        quic: vec![QuicTarget {
            host: "quic.example".to_string(),
            port: 443,
            label: None,
        }],
        udp_ranges: vec![UdpRangeTarget {
            host: "media.example".to_string(),
            start_port: 10000,
            end_port: 10009,
            sample_size: 3,
            label: None,
        }],
        ping: vec!["warn.example".to_string()],
        ntp: "time.example".to_string(),
    }
}

/// `count` passing DNS targets
pub fn dns_targets(count: usize) -> TargetSet {
    TargetSet {
        dns: (0..count).map(|i| format!("host{}.example", i)).collect(),
        ..TargetSet::empty()
    }
}
