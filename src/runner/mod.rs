//! Step runner: the ordered, pull-driven traversal of a target set
//!
//! A run is a flat plan of steps in category order. Nothing touches the
//! network until a step is pulled, and every pulled step yields exactly one
//! `(Category, ProbeResult)` pair. In concurrent mode the first pull of a
//! category probes the whole category batch at once and buffers the results
//! in target order, so consumers see the same sequence either way.

use crate::error::Result;
use crate::models::{HttpsTarget, ProbeResult, QuicTarget, TargetSet, TcpTarget, UdpRangeTarget};
use crate::probes::ProbeSuite;
use crate::types::{Category, ExecutionMode};
use futures::future::join_all;
use futures::Stream;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::Semaphore;

/// One unit of work in a run
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    Dns(String),
    Tcp(TcpTarget),
    Https(HttpsTarget),
    Quic(QuicTarget),
    UdpRange(UdpRangeTarget),
    Ping(String),
    Ntp(String),
    Speedtest,
}

impl Step {
    pub fn category(&self) -> Category {
        match self {
            Step::Dns(_) => Category::Dns,
            Step::Tcp(_) => Category::Tcp,
            Step::Https(_) => Category::Https,
            Step::Quic(_) => Category::Quic,
            Step::UdpRange(_) => Category::UdpRange,
            Step::Ping(_) => Category::Ping,
            Step::Ntp(_) => Category::Ntp,
            Step::Speedtest => Category::Speedtest,
        }
    }

    async fn execute(&self, probes: &dyn ProbeSuite) -> ProbeResult {
        match self {
            Step::Dns(name) => probes.dns(name).await,
            Step::Tcp(target) => probes.tcp(target).await,
            Step::Https(target) => probes.https(target).await,
            Step::Quic(target) => probes.quic(target).await,
            Step::UdpRange(target) => probes.udp_range(target).await,
            Step::Ping(host) => probes.ping(host).await,
            Step::Ntp(server) => probes.ntp(server).await,
            Step::Speedtest => probes.speedtest().await,
        }
    }
}

/// Flatten a target set into steps, in category order
pub fn plan(targets: &TargetSet) -> VecDeque<Step> {
    let mut steps = VecDeque::with_capacity(targets.step_count());
    steps.extend(targets.dns.iter().cloned().map(Step::Dns));
    steps.extend(targets.tcp.iter().cloned().map(Step::Tcp));
    steps.extend(targets.https.iter().cloned().map(Step::Https));
    steps.extend(targets.quic.iter().cloned().map(Step::Quic));
    steps.extend(targets.udp_ranges.iter().cloned().map(Step::UdpRange));
    steps.extend(targets.ping.iter().cloned().map(Step::Ping));
    steps.push_back(Step::Ntp(targets.ntp.clone()));
    steps.push_back(Step::Speedtest);
    steps
}

/// Single-pass cursor over one run
pub struct StepRunner {
    probes: Arc<dyn ProbeSuite>,
    pending: VecDeque<Step>,
    ready: VecDeque<(Category, ProbeResult)>,
    mode: ExecutionMode,
    total_steps: usize,
    completed: usize,
}

impl StepRunner {
    /// Validates the target set; the plan is fixed from here on
    pub fn new(targets: TargetSet, probes: Arc<dyn ProbeSuite>) -> Result<Self> {
        targets.validate()?;
        let pending = plan(&targets);

        Ok(Self {
            probes,
            total_steps: pending.len(),
            pending,
            ready: VecDeque::new(),
            mode: ExecutionMode::Sequential,
            completed: 0,
        })
    }

    pub fn with_mode(mut self, mode: ExecutionMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn mode(&self) -> ExecutionMode {
        self.mode
    }

    pub fn total_steps(&self) -> usize {
        self.total_steps
    }

    /// Steps already handed to the consumer
    pub fn completed(&self) -> usize {
        self.completed
    }

    pub fn is_exhausted(&self) -> bool {
        self.pending.is_empty() && self.ready.is_empty()
    }

    /// Next result, or `None` forever once the plan is exhausted
    pub async fn next_step(&mut self) -> Option<(Category, ProbeResult)> {
        if self.ready.is_empty() {
            self.advance().await;
        }

        let item = self.ready.pop_front()?;
        self.completed += 1;
        Some(item)
    }

    /// The same cursor as a stream
    pub fn steps(self) -> impl Stream<Item = (Category, ProbeResult)> + Send {
        futures::stream::unfold(self, |mut runner| async move {
            runner.next_step().await.map(|item| (item, runner))
        })
    }

    async fn advance(&mut self) {
        let Some(step) = self.pending.pop_front() else {
            return;
        };
        let category = step.category();

        match self.mode {
            ExecutionMode::Concurrent { max_in_flight } if !category.is_singleton() => {
                let mut batch = vec![step];
                while self.pending.front().map(Step::category) == Some(category) {
                    if let Some(next) = self.pending.pop_front() {
                        batch.push(next);
                    }
                }

                let results = run_batch(self.probes.as_ref(), &batch, max_in_flight).await;
                self.ready.extend(results.into_iter().map(|result| (category, result)));
            }
            _ => {
                let result = step.execute(self.probes.as_ref()).await;
                self.ready.push_back((category, result));
            }
        }
    }
}

/// Probe a batch with at most `max_in_flight` probes running; results keep batch order
async fn run_batch(probes: &dyn ProbeSuite, batch: &[Step], max_in_flight: usize) -> Vec<ProbeResult> {
    let limiter = Semaphore::new(max_in_flight.max(1));
    let limiter = &limiter;

    join_all(batch.iter().map(|step| async move {
        let _permit = limiter.acquire().await.ok();
        step.execute(probes).await
    }))
    .await
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ProbeDetail;
    use crate::types::Status;
    use async_trait::async_trait;
    use futures::StreamExt;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    /// Passes everything, recording calls and peak concurrency
    #[derive(Default)]
    pub(super) struct RecordingSuite {
        pub calls: Mutex<Vec<(Category, String)>>,
        in_flight: AtomicUsize,
        pub peak: AtomicUsize,
        pub delay: Duration,
    }

    impl RecordingSuite {
        pub fn with_delay(delay: Duration) -> Self {
            Self { delay, ..Default::default() }
        }

        async fn record(&self, category: Category, target: &str, detail: ProbeDetail) -> ProbeResult {
            self.calls.lock().unwrap().push((category, target.to_string()));
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            ProbeResult::pass(target, detail)
        }
    }

    #[async_trait]
    impl ProbeSuite for RecordingSuite {
        async fn dns(&self, name: &str) -> ProbeResult {
            self.record(Category::Dns, name, ProbeDetail::Dns { ip: None }).await
        }

        async fn tcp(&self, target: &TcpTarget) -> ProbeResult {
            self.record(Category::Tcp, &target.host, ProbeDetail::Tcp { tls: None }).await
        }

        async fn https(&self, target: &HttpsTarget) -> ProbeResult {
            let detail = ProbeDetail::Https { http_status: Some(200), tls: None };
            self.record(Category::Https, &target.url, detail).await
        }

        async fn quic(&self, target: &QuicTarget) -> ProbeResult {
            let detail = ProbeDetail::Quic {
                protocol: crate::models::QuicProtocol::Http3,
                note: None,
                response_bytes: None,
            };
            self.record(Category::Quic, &target.host, detail).await
        }

        async fn udp_range(&self, target: &UdpRangeTarget) -> ProbeResult {
            let detail = ProbeDetail::UdpRange { sampled: 1, accessible: 1, note: String::new() };
            self.record(Category::UdpRange, &target.host, detail).await
        }

        async fn ping(&self, host: &str) -> ProbeResult {
            self.record(Category::Ping, host, ProbeDetail::Ping { output: None }).await
        }

        async fn ntp(&self, server: &str) -> ProbeResult {
            let detail = ProbeDetail::Ntp { offset_ms: Some(0), stratum: Some(2) };
            self.record(Category::Ntp, server, detail).await
        }

        async fn speedtest(&self) -> ProbeResult {
            self.record(Category::Speedtest, "speedtest", ProbeDetail::speedtest_empty()).await
        }
    }

    fn targets() -> TargetSet {
        let mut targets = TargetSet::empty();
        targets.dns = vec!["a.example".to_string(), "b.example".to_string()];
        targets.tcp = vec![TcpTarget {
            host: "c.example".to_string(),
            port: 443,
            label: None,
            verify_tls: false,
        }];
        targets.ping = vec!["d.example".to_string(), "e.example".to_string(), "f.example".to_string()];
        targets
    }

    #[tokio::test]
    async fn test_sequence_order_and_count() {
        let suite = Arc::new(RecordingSuite::default());
        let mut runner = StepRunner::new(targets(), suite.clone()).unwrap();
        assert_eq!(runner.total_steps(), 8);

        let mut seen = Vec::new();
        while let Some((category, result)) = runner.next_step().await {
            assert_eq!(result.category(), category);
            seen.push((category, result.target));
        }

        let categories: Vec<Category> = seen.iter().map(|(c, _)| *c).collect();
        assert_eq!(
            categories,
            vec![
                Category::Dns,
                Category::Dns,
                Category::Tcp,
                Category::Ping,
                Category::Ping,
                Category::Ping,
                Category::Ntp,
                Category::Speedtest,
            ]
        );
        assert_eq!(seen[0].1, "a.example");
        assert_eq!(seen[6].1, "pool.ntp.org");
        assert_eq!(runner.completed(), 8);
        assert!(runner.is_exhausted());
    }

    #[tokio::test]
    async fn test_exhausted_runner_stays_exhausted() {
        let suite = Arc::new(RecordingSuite::default());
        let mut runner = StepRunner::new(TargetSet::empty(), suite.clone()).unwrap();
        assert_eq!(runner.total_steps(), 2);

        assert_eq!(runner.next_step().await.map(|(c, _)| c), Some(Category::Ntp));
        assert_eq!(runner.next_step().await.map(|(c, _)| c), Some(Category::Speedtest));
        assert!(runner.next_step().await.is_none());
        assert!(runner.next_step().await.is_none());
        assert_eq!(suite.calls.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_probes_run_only_when_pulled() {
        let suite = Arc::new(RecordingSuite::default());
        let mut runner = StepRunner::new(targets(), suite.clone()).unwrap();
        assert!(suite.calls.lock().unwrap().is_empty());

        runner.next_step().await;
        assert_eq!(suite.calls.lock().unwrap().len(), 1);
        runner.next_step().await;
        assert_eq!(suite.calls.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_invalid_targets_rejected() {
        let mut bad = TargetSet::empty();
        bad.tcp.push(TcpTarget {
            host: "example.com".to_string(),
            port: 0,
            label: None,
            verify_tls: false,
        });
        let suite = Arc::new(RecordingSuite::default());
        assert!(StepRunner::new(bad, suite).is_err());
    }

    #[tokio::test]
    async fn test_concurrent_batches_keep_target_order() {
        let suite = Arc::new(RecordingSuite::with_delay(Duration::from_millis(20)));
        let runner = StepRunner::new(targets(), suite.clone())
            .unwrap()
            .with_mode(ExecutionMode::Concurrent { max_in_flight: 2 });

        let results: Vec<(Category, ProbeResult)> = runner.steps().collect().await;
        let targets: Vec<&str> = results.iter().map(|(_, r)| r.target.as_str()).collect();
        assert_eq!(
            targets,
            vec!["a.example", "b.example", "c.example", "d.example", "e.example", "f.example", "pool.ntp.org", "speedtest"]
        );
        assert!(results.iter().all(|(_, r)| r.status == Status::Pass));
        assert_eq!(suite.peak.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_sequential_never_overlaps() {
        let suite = Arc::new(RecordingSuite::with_delay(Duration::from_millis(5)));
        let runner = StepRunner::new(targets(), suite.clone()).unwrap();

        let count = runner.steps().count().await;
        assert_eq!(count, 8);
        assert_eq!(suite.peak.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_plan_layout() {
        let steps = plan(&targets());
        assert_eq!(steps.len(), targets().step_count());
        assert_eq!(steps.back(), Some(&Step::Speedtest));
        assert_eq!(steps[steps.len() - 2], Step::Ntp("pool.ntp.org".to_string()));
    }
}
