//! Bandwidth measurement
//!
//! The Ookla CLI is tried first. When it is missing or misbehaves, the HTTP
//! source runs a few download-then-upload rounds and keeps the best figure
//! of each direction across rounds.

pub mod cloudflare;
pub mod ookla;
pub mod thresholds;

pub use cloudflare::CloudflareSource;
pub use thresholds::{BandwidthThresholds, TierFloor};

use crate::error::{AppError, Result};
use crate::logging::ProbeLogger;
use crate::models::{Config, ProbeDetail, ProbeResult, SpeedSource};
use crate::probes::command::CommandRunner;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Target name of the single speedtest result
pub const TARGET: &str = "speedtest";

/// One direction-at-a-time throughput provider
#[async_trait]
pub trait ThroughputSource: Send + Sync {
    fn name(&self) -> &'static str;

    /// Download throughput in Mbps
    async fn download(&self) -> Result<f64>;

    /// Upload throughput in Mbps
    async fn upload(&self) -> Result<f64>;
}

#[derive(Debug, Clone)]
pub struct SpeedtestSettings {
    pub use_ookla: bool,
    pub ookla_timeout: Duration,
    pub rounds: u32,
    pub pause: Duration,
    pub thresholds: BandwidthThresholds,
}

impl From<&Config> for SpeedtestSettings {
    fn from(config: &Config) -> Self {
        Self {
            use_ookla: config.use_ookla,
            ookla_timeout: Duration::from_secs(config.ookla_timeout_seconds),
            rounds: config.speedtest_rounds,
            pause: Duration::from_millis(config.speedtest_pause_ms),
            thresholds: config.bandwidth_thresholds,
        }
    }
}

/// Best figure seen in each direction, plus the last error
#[derive(Debug, Default)]
pub struct RoundsOutcome {
    pub download_mbps: Option<f64>,
    pub upload_mbps: Option<f64>,
    pub last_error: Option<AppError>,
}

impl RoundsOutcome {
    fn record(slot: &mut Option<f64>, value: f64) {
        *slot = Some(slot.map_or(value, |best| best.max(value)));
    }
}

pub struct BandwidthProber {
    settings: SpeedtestSettings,
    fallback: Arc<dyn ThroughputSource>,
}

impl BandwidthProber {
    pub fn new(settings: SpeedtestSettings, fallback: Arc<dyn ThroughputSource>) -> Self {
        Self { settings, fallback }
    }

    /// Production prober using the configured HTTP endpoint as fallback
    pub fn from_config(config: &Config) -> Result<Self> {
        let fallback = CloudflareSource::new(
            &config.speedtest_endpoint,
            config.download_bytes,
            config.upload_bytes,
            Duration::from_secs(config.speedtest_timeout_seconds),
        )?;
        Ok(Self::new(SpeedtestSettings::from(config), Arc::new(fallback)))
    }

    pub fn settings(&self) -> &SpeedtestSettings {
        &self.settings
    }

    pub async fn measure(&self, commands: &dyn CommandRunner, logger: Option<&ProbeLogger>) -> ProbeResult {
        if self.settings.use_ookla {
            match ookla::run(commands, self.settings.ookla_timeout).await {
                Ok(report) => {
                    let result = self.verdict(
                        SpeedSource::Ookla,
                        report.download_mbps,
                        report.upload_mbps,
                        Some(report.server),
                    );
                    return match report.latency_ms {
                        Some(latency) => result.with_latency_ms(latency),
                        None => result,
                    };
                }
                Err(e) => {
                    if let Some(logger) = logger {
                        logger.log_fallback("ookla", &e).await;
                    }
                }
            }
        }

        let outcome = self.run_rounds().await;
        match (outcome.download_mbps, outcome.upload_mbps) {
            (Some(download), Some(upload)) => self.verdict(SpeedSource::Cloudflare, download, upload, None),
            _ => {
                let error = outcome
                    .last_error
                    .unwrap_or_else(|| AppError::internal("speedtest produced no measurement"));
                ProbeResult::fail(TARGET, ProbeDetail::speedtest_empty(), error)
            }
        }
    }

    /// Download-then-upload rounds with a pause in between
    pub async fn run_rounds(&self) -> RoundsOutcome {
        let mut outcome = RoundsOutcome::default();

        for round in 0..self.settings.rounds {
            if round > 0 && !self.settings.pause.is_zero() {
                tokio::time::sleep(self.settings.pause).await;
            }

            match self.fallback.download().await {
                Ok(mbps) => RoundsOutcome::record(&mut outcome.download_mbps, mbps),
                Err(e) => outcome.last_error = Some(e),
            }
            match self.fallback.upload().await {
                Ok(mbps) => RoundsOutcome::record(&mut outcome.upload_mbps, mbps),
                Err(e) => outcome.last_error = Some(e),
            }
        }

        outcome
    }

    fn verdict(&self, source: SpeedSource, download_mbps: f64, upload_mbps: f64, server: Option<String>) -> ProbeResult {
        let tier = self.settings.thresholds.classify(download_mbps, upload_mbps);
        ProbeResult::new(
            TARGET,
            tier.status(),
            ProbeDetail::Speedtest {
                source: Some(source),
                download_mbps: Some(download_mbps),
                upload_mbps: Some(upload_mbps),
                tier: Some(tier),
                note: Some(tier.note().to_string()),
                server,
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BandwidthTier;
    use crate::probes::command::CommandOutput;
    use crate::types::Status;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Serves queued figures; an empty queue is an error
    struct Queued {
        downloads: Mutex<Vec<Result<f64>>>,
        uploads: Mutex<Vec<Result<f64>>>,
    }

    impl Queued {
        fn new(downloads: Vec<Result<f64>>, uploads: Vec<Result<f64>>) -> Self {
            Self {
                downloads: Mutex::new(downloads),
                uploads: Mutex::new(uploads),
            }
        }

        fn pop(queue: &Mutex<Vec<Result<f64>>>) -> Result<f64> {
            let mut queue = queue.lock().unwrap();
            if queue.is_empty() {
                Err(AppError::network("queue drained"))
            } else {
                queue.remove(0)
            }
        }
    }

    #[async_trait]
    impl ThroughputSource for Queued {
        fn name(&self) -> &'static str {
            "queued"
        }

        async fn download(&self) -> Result<f64> {
            Self::pop(&self.downloads)
        }

        async fn upload(&self) -> Result<f64> {
            Self::pop(&self.uploads)
        }
    }

    struct Cli {
        reply: fn() -> Result<CommandOutput>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl CommandRunner for Cli {
        async fn run(&self, program: &str, _args: &[String], _timeout: Duration) -> Result<CommandOutput> {
            assert_eq!(program, "speedtest");
            self.calls.fetch_add(1, Ordering::SeqCst);
            (self.reply)()
        }
    }

    fn missing_cli() -> Cli {
        Cli {
            reply: || Err(AppError::tooling("speedtest is not installed")),
            calls: AtomicUsize::new(0),
        }
    }

    fn settings(rounds: u32) -> SpeedtestSettings {
        SpeedtestSettings {
            use_ookla: true,
            ookla_timeout: Duration::from_secs(1),
            rounds,
            pause: Duration::ZERO,
            thresholds: BandwidthThresholds::default(),
        }
    }

    fn figures(result: &ProbeResult) -> (Option<f64>, Option<f64>, Option<SpeedSource>) {
        match &result.detail {
            ProbeDetail::Speedtest { download_mbps, upload_mbps, source, .. } => (*download_mbps, *upload_mbps, *source),
            other => panic!("unexpected detail {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_ookla_report_wins() {
        let cli = Cli {
            reply: || {
                Ok(CommandOutput {
                    exit_code: 0,
                    stdout: r#"{"download":{"bandwidth":12500000},"upload":{"bandwidth":3125000},"server":{"name":"Edge"}}"#.to_string(),
                    stderr: String::new(),
                })
            },
            calls: AtomicUsize::new(0),
        };
        let fallback = Arc::new(Queued::new(vec![], vec![]));
        let prober = BandwidthProber::new(settings(2), fallback);

        let result = prober.measure(&cli, None).await;
        assert_eq!(result.status, Status::Pass);
        assert_eq!(figures(&result), (Some(100.0), Some(25.0), Some(SpeedSource::Ookla)));
        let ProbeDetail::Speedtest { server, tier, .. } = &result.detail else {
            panic!("expected a speedtest detail");
        };
        assert_eq!(server.as_deref(), Some("Edge"));
        assert_eq!(*tier, Some(BandwidthTier::Recommended));
    }

    #[tokio::test]
    async fn test_best_of_rounds_per_direction() {
        let fallback = Arc::new(Queued::new(vec![Ok(30.0), Ok(25.0)], vec![Ok(8.0), Ok(12.0)]));
        let prober = BandwidthProber::new(settings(2), fallback);

        let cli = missing_cli();
        let result = prober.measure(&cli, None).await;
        assert_eq!(cli.calls.load(Ordering::SeqCst), 1);
        assert_eq!(figures(&result), (Some(30.0), Some(12.0), Some(SpeedSource::Cloudflare)));
        assert_eq!(result.status, Status::Pass);
    }

    #[tokio::test]
    async fn test_one_failed_round_still_measures() {
        let fallback = Arc::new(Queued::new(
            vec![Err(AppError::network("reset")), Ok(9.0)],
            vec![Ok(4.0), Err(AppError::timeout("slow"))],
        ));
        let prober = BandwidthProber::new(settings(2), fallback);

        let result = prober.measure(&missing_cli(), None).await;
        assert_eq!(figures(&result), (Some(9.0), Some(4.0), Some(SpeedSource::Cloudflare)));
        assert_eq!(result.status, Status::Fail);
        assert!(result.error.is_none());
    }

    #[tokio::test]
    async fn test_every_round_failing_reports_last_error() {
        let fallback = Arc::new(Queued::new(
            vec![Err(AppError::network("first")), Err(AppError::network("second"))],
            vec![Err(AppError::network("third")), Err(AppError::timeout("last"))],
        ));
        let prober = BandwidthProber::new(settings(2), fallback);

        let result = prober.measure(&missing_cli(), None).await;
        assert_eq!(result.status, Status::Fail);
        assert_eq!(figures(&result), (None, None, None));
        assert!(result.error.as_deref().unwrap().contains("last"));
    }

    #[tokio::test]
    async fn test_ookla_skipped_when_disabled() {
        let cli = missing_cli();
        let mut settings = settings(1);
        settings.use_ookla = false;
        let prober = BandwidthProber::new(settings, Arc::new(Queued::new(vec![Ok(50.0)], vec![Ok(15.0)])));

        let result = prober.measure(&cli, None).await;
        assert_eq!(cli.calls.load(Ordering::SeqCst), 0);
        assert_eq!(result.status, Status::Pass);
    }

    #[tokio::test]
    async fn test_http_fallback_end_to_end() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/__down"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0u8; 2048]))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/__up"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let mut settings = settings(1);
        settings.thresholds = BandwidthThresholds {
            recommended: TierFloor::new(0.0, 0.0),
            minimum: TierFloor::new(0.0, 0.0),
            degraded: TierFloor::new(0.0, 0.0),
        };
        let source = CloudflareSource::new(&server.uri(), 2048, 1024, Duration::from_secs(5)).unwrap();
        let prober = BandwidthProber::new(settings, Arc::new(source));

        let result = prober.measure(&missing_cli(), None).await;
        assert_eq!(result.status, Status::Pass);
        assert_eq!(result.target, TARGET);
    }

    #[tokio::test]
    async fn test_http_fallback_server_errors_fail() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let source = CloudflareSource::new(&server.uri(), 2048, 1024, Duration::from_secs(5)).unwrap();
        let prober = BandwidthProber::new(settings(1), Arc::new(source));

        let result = prober.measure(&missing_cli(), None).await;
        assert_eq!(result.status, Status::Fail);
        assert!(result.error.is_some());
    }
}
