//! Sampled UDP port-range probe

use crate::models::{ProbeDetail, ProbeResult, UdpRangeTarget};
use crate::probes::datagram::{DatagramOutcome, DatagramProber};
use crate::probes::dns::HostResolver;
use crate::probes::quic::MINIMAL_PROBE;
use crate::types::Status;
use rand::Rng;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

/// Pick the ports to probe: `sample_size` distinct ports from the inclusive
/// range, capped at the range size, in ascending order
pub fn sample_ports<R: Rng + ?Sized>(target: &UdpRangeTarget, rng: &mut R) -> Vec<u16> {
    let range_len = target.range_len();
    let amount = target.effective_sample();
    if amount == 0 {
        return Vec::new();
    }

    let mut ports: Vec<u16> = rand::seq::index::sample(rng, range_len, amount)
        .into_iter()
        .map(|offset| target.start_port + offset as u16)
        .collect();
    ports.sort_unstable();
    ports
}

/// PASS at 80% accessible, WARN at 50%, FAIL below. An empty sample fails.
pub fn classify(accessible: usize, sampled: usize) -> Status {
    if sampled == 0 {
        return Status::Fail;
    }
    if accessible * 10 >= sampled * 8 {
        Status::Pass
    } else if accessible * 2 >= sampled {
        Status::Warn
    } else {
        Status::Fail
    }
}

fn note(target: &UdpRangeTarget) -> String {
    let protocol = target.label.as_deref().unwrap_or("protocol");
    format!(
        "UDP silence counts as accessible; full validation requires an active {} session",
        protocol
    )
}

/// Probe each of `ports` with a minimal datagram. A reply or silence counts
/// as accessible; only socket-level errors count against the range.
pub async fn probe(
    target: &UdpRangeTarget,
    ports: &[u16],
    resolver: &HostResolver,
    datagrams: &dyn DatagramProber,
    wait: Duration,
    resolve_timeout: Duration,
) -> ProbeResult {
    let name = format!("{}:{}-{}", target.host, target.start_port, target.end_port);
    let start = Instant::now();

    let ip = match resolver.lookup_within(&target.host, resolve_timeout).await {
        Ok(ip) => ip,
        Err(e) => {
            let detail = ProbeDetail::UdpRange {
                sampled: ports.len(),
                accessible: 0,
                note: note(target),
            };
            return ProbeResult::fail(name, detail, e).with_label(target.label.clone());
        }
    };

    let mut accessible = 0;
    let mut last_error = None;
    for &port in ports {
        match datagrams.exchange(SocketAddr::new(ip, port), &MINIMAL_PROBE, wait).await {
            DatagramOutcome::Response(_) | DatagramOutcome::Silence => accessible += 1,
            DatagramOutcome::Error(e) => last_error = Some(e),
        }
    }

    let status = classify(accessible, ports.len());
    let detail = ProbeDetail::UdpRange {
        sampled: ports.len(),
        accessible,
        note: note(target),
    };
    let mut result = ProbeResult::new(name, status, detail)
        .with_latency(start.elapsed())
        .with_label(target.label.clone());
    if status != Status::Pass {
        if let Some(error) = last_error {
            result = result.with_error(format!(
                "{} of {} sampled ports failed; last error: {}",
                ports.len() - accessible,
                ports.len(),
                error
            ));
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;
    use std::sync::Mutex;

    fn target(start_port: u16, end_port: u16, sample_size: usize) -> UdpRangeTarget {
        UdpRangeTarget {
            host: "127.0.0.1".to_string(),
            start_port,
            end_port,
            sample_size,
            label: Some("WebRTC media".to_string()),
        }
    }

    /// Replies with the scripted outcome for every port, recording each one
    struct PerPort {
        outcome: fn(u16) -> DatagramOutcome,
        seen: Mutex<Vec<u16>>,
    }

    #[async_trait]
    impl DatagramProber for PerPort {
        async fn exchange(&self, addr: SocketAddr, _payload: &[u8], _wait: Duration) -> DatagramOutcome {
            self.seen.lock().unwrap().push(addr.port());
            (self.outcome)(addr.port())
        }
    }

    fn prober(outcome: fn(u16) -> DatagramOutcome) -> PerPort {
        PerPort { outcome, seen: Mutex::new(Vec::new()) }
    }

    #[test]
    fn test_sample_is_distinct_and_in_range() {
        let mut rng = StdRng::seed_from_u64(7);
        let target = target(10_000, 10_099, 20);
        let ports = sample_ports(&target, &mut rng);

        assert_eq!(ports.len(), 20);
        let unique: HashSet<u16> = ports.iter().copied().collect();
        assert_eq!(unique.len(), 20);
        assert!(ports.iter().all(|p| (10_000..=10_099).contains(p)));
    }

    #[test]
    fn test_sample_capped_at_range_size() {
        let mut rng = StdRng::seed_from_u64(1);
        let ports = sample_ports(&target(5000, 5002, 10), &mut rng);
        assert_eq!(ports, vec![5000, 5001, 5002]);
    }

    #[test]
    fn test_seeded_sampling_is_reproducible() {
        let target = target(20_000, 29_999, 5);
        let first = sample_ports(&target, &mut StdRng::seed_from_u64(42));
        let second = sample_ports(&target, &mut StdRng::seed_from_u64(42));
        assert_eq!(first, second);
    }

    #[test]
    fn test_classification_thresholds() {
        assert_eq!(classify(5, 5), Status::Pass);
        assert_eq!(classify(4, 5), Status::Pass);
        assert_eq!(classify(3, 5), Status::Warn);
        assert_eq!(classify(1, 2), Status::Warn);
        assert_eq!(classify(2, 5), Status::Fail);
        assert_eq!(classify(0, 5), Status::Fail);
        assert_eq!(classify(0, 0), Status::Fail);
    }

    #[tokio::test]
    async fn test_all_errors_fail_with_none_accessible() {
        let resolver = HostResolver::system(Duration::from_secs(1));
        let datagrams = prober(|_| DatagramOutcome::Error("Network is unreachable".to_string()));
        let target = target(40_000, 40_100, 5);
        let ports = sample_ports(&target, &mut StdRng::seed_from_u64(3));

        let result = probe(&target, &ports, &resolver, &datagrams, Duration::from_millis(10), Duration::from_secs(1)).await;
        assert_eq!(result.status, Status::Fail);
        let ProbeDetail::UdpRange { sampled, accessible, .. } = &result.detail else {
            panic!("expected a UDP range detail");
        };
        assert_eq!((*sampled, *accessible), (5, 0));
        assert!(result.error.as_deref().unwrap().contains("unreachable"));
        assert_eq!(*datagrams.seen.lock().unwrap(), ports);
    }

    #[tokio::test]
    async fn test_replies_and_silence_pass() {
        let resolver = HostResolver::system(Duration::from_secs(1));
        let datagrams = prober(|port| {
            if port % 2 == 0 {
                DatagramOutcome::Response(vec![1, 2, 3])
            } else {
                DatagramOutcome::Silence
            }
        });
        let target = target(40_000, 40_100, 5);
        let ports = sample_ports(&target, &mut StdRng::seed_from_u64(9));

        let result = probe(&target, &ports, &resolver, &datagrams, Duration::from_millis(10), Duration::from_secs(1)).await;
        assert_eq!(result.status, Status::Pass);
        let ProbeDetail::UdpRange { sampled, accessible, note } = &result.detail else {
            panic!("expected a UDP range detail");
        };
        assert_eq!(*accessible, *sampled);
        assert_eq!(*sampled, 5);
        assert!(note.contains("WebRTC media session"));
        assert!(result.error.is_none());
    }

    #[tokio::test]
    async fn test_partial_errors_warn() {
        let resolver = HostResolver::system(Duration::from_secs(1));
        let datagrams = prober(|port| {
            if port < 40_002 {
                DatagramOutcome::Error("Connection refused".to_string())
            } else {
                DatagramOutcome::Silence
            }
        });
        let target = target(40_000, 40_003, 4);
        let ports = sample_ports(&target, &mut StdRng::seed_from_u64(0));

        let result = probe(&target, &ports, &resolver, &datagrams, Duration::from_millis(10), Duration::from_secs(1)).await;
        assert_eq!(result.status, Status::Warn);
    }

    #[tokio::test]
    async fn test_unresolvable_host_fails() {
        let resolver = HostResolver::system(Duration::from_secs(2));
        let datagrams = prober(|_| DatagramOutcome::Silence);
        let mut target = target(40_000, 40_010, 3);
        target.host = "this-domain-should-not-exist.invalid".to_string();

        let result = probe(&target, &[40_001, 40_002, 40_003], &resolver, &datagrams, Duration::from_millis(10), Duration::from_secs(3)).await;
        assert_eq!(result.status, Status::Fail);
        assert!(datagrams.seen.lock().unwrap().is_empty());
        assert!(matches!(result.detail, ProbeDetail::UdpRange { accessible: 0, sampled: 3, .. }));
    }
}
