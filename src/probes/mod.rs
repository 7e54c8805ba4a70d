//! Network probes
//!
//! Every probe is a total function: whatever goes wrong ends up as a FAIL
//! (or WARN) [`ProbeResult`], never as an `Err`. External utilities and raw
//! datagrams go through the [`CommandRunner`] and [`DatagramProber`] seams so
//! probe logic can be exercised without a network.

pub mod command;
pub mod datagram;
pub mod dns;
pub mod https;
pub mod ntp;
pub mod ping;
pub mod quic;
pub mod tcp;
pub mod tls;
pub mod udp_range;

pub use command::{CommandOutput, CommandRunner, TokioCommandRunner};
pub use datagram::{DatagramOutcome, DatagramProber, UdpDatagramProber};
pub use dns::HostResolver;
pub use quic::Http3Support;
pub use tls::TlsVerifier;

use crate::error::Result;
use crate::logging::ProbeLogger;
use crate::models::{Config, HttpsTarget, ProbeResult, QuicTarget, TcpTarget, UdpRangeTarget};
use crate::speedtest::BandwidthProber;
use crate::types::Category;
use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// One probe per category
#[async_trait]
pub trait ProbeSuite: Send + Sync {
    async fn dns(&self, name: &str) -> ProbeResult;
    async fn tcp(&self, target: &TcpTarget) -> ProbeResult;
    async fn https(&self, target: &HttpsTarget) -> ProbeResult;
    async fn quic(&self, target: &QuicTarget) -> ProbeResult;
    async fn udp_range(&self, target: &UdpRangeTarget) -> ProbeResult;
    async fn ping(&self, host: &str) -> ProbeResult;
    async fn ntp(&self, server: &str) -> ProbeResult;
    async fn speedtest(&self) -> ProbeResult;
}

/// Timeouts and knobs the probes read on every call
#[derive(Debug, Clone)]
pub struct ProbeSettings {
    pub dns_timeout: Duration,
    pub tcp_timeout: Duration,
    pub https_timeout: Duration,
    pub quic_timeout: Duration,
    pub udp_wait: Duration,
    pub ping_count: u32,
    pub ping_timeout: Duration,
    pub ntp_timeout: Duration,
    pub tls_ports: Vec<u16>,
}

impl From<&Config> for ProbeSettings {
    fn from(config: &Config) -> Self {
        Self {
            dns_timeout: config.dns_timeout(),
            tcp_timeout: config.tcp_timeout(),
            https_timeout: config.https_timeout(),
            quic_timeout: config.quic_timeout(),
            udp_wait: config.udp_wait(),
            ping_count: config.ping_count,
            ping_timeout: config.ping_timeout(),
            ntp_timeout: config.ntp_timeout(),
            tls_ports: config.tls_ports.clone(),
        }
    }
}

/// Production [`ProbeSuite`] over real sockets, resolvers and utilities
pub struct NetworkProbes {
    settings: ProbeSettings,
    resolver: HostResolver,
    tls: TlsVerifier,
    http: reqwest::Client,
    commands: Arc<dyn CommandRunner>,
    datagrams: Arc<dyn DatagramProber>,
    http3: Http3Support,
    rng: Mutex<StdRng>,
    bandwidth: BandwidthProber,
    logger: ProbeLogger,
}

impl NetworkProbes {
    pub fn new(config: &Config) -> Result<Self> {
        Self::with_seams(config, Arc::new(TokioCommandRunner), Arc::new(UdpDatagramProber))
    }

    /// Same as [`NetworkProbes::new`] with caller-supplied command and datagram seams
    pub fn with_seams(
        config: &Config,
        commands: Arc<dyn CommandRunner>,
        datagrams: Arc<dyn DatagramProber>,
    ) -> Result<Self> {
        let settings = ProbeSettings::from(config);
        let rng = match config.udp_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Ok(Self {
            resolver: HostResolver::system(settings.dns_timeout),
            tls: TlsVerifier::new()?,
            http: https::build_client(settings.https_timeout)?,
            commands,
            datagrams,
            http3: Http3Support::new(),
            rng: Mutex::new(rng),
            bandwidth: BandwidthProber::from_config(config)?,
            logger: ProbeLogger::new(config),
            settings,
        })
    }

    pub fn settings(&self) -> &ProbeSettings {
        &self.settings
    }

    fn with_rng<T>(&self, f: impl FnOnce(&mut StdRng) -> T) -> T {
        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut rng)
    }

    async fn logged(&self, category: Category, result: ProbeResult) -> ProbeResult {
        self.logger.log_result(category, &result).await;
        result
    }
}

#[async_trait]
impl ProbeSuite for NetworkProbes {
    async fn dns(&self, name: &str) -> ProbeResult {
        let result = dns::probe(&self.resolver, name, self.settings.dns_timeout).await;
        self.logged(Category::Dns, result).await
    }

    async fn tcp(&self, target: &TcpTarget) -> ProbeResult {
        let result = tcp::probe(target, self.settings.tcp_timeout, &self.tls, &self.settings.tls_ports).await;
        self.logged(Category::Tcp, result).await
    }

    async fn https(&self, target: &HttpsTarget) -> ProbeResult {
        let result = https::probe(&self.http, &self.tls, target, self.settings.https_timeout).await;
        self.logged(Category::Https, result).await
    }

    async fn quic(&self, target: &QuicTarget) -> ProbeResult {
        let initial = self.with_rng(|rng| quic::initial_datagram(rng));
        let ctx = quic::QuicContext {
            commands: self.commands.as_ref(),
            datagrams: self.datagrams.as_ref(),
            resolver: &self.resolver,
            http3: &self.http3,
            timeout: self.settings.quic_timeout,
            wait: self.settings.udp_wait,
            logger: Some(&self.logger),
        };
        let result = quic::probe(&ctx, target, initial).await;
        self.logged(Category::Quic, result).await
    }

    async fn udp_range(&self, target: &UdpRangeTarget) -> ProbeResult {
        let ports = self.with_rng(|rng| udp_range::sample_ports(target, rng));
        let result = udp_range::probe(
            target,
            &ports,
            &self.resolver,
            self.datagrams.as_ref(),
            self.settings.udp_wait,
            self.settings.dns_timeout,
        )
        .await;
        self.logged(Category::UdpRange, result).await
    }

    async fn ping(&self, host: &str) -> ProbeResult {
        let result = ping::probe(
            self.commands.as_ref(),
            host,
            self.settings.ping_count,
            self.settings.ping_timeout,
        )
        .await;
        self.logged(Category::Ping, result).await
    }

    async fn ntp(&self, server: &str) -> ProbeResult {
        let result = ntp::probe(server, &self.resolver, self.datagrams.as_ref(), self.settings.ntp_timeout).await;
        self.logged(Category::Ntp, result).await
    }

    async fn speedtest(&self) -> ProbeResult {
        let result = self.bandwidth.measure(self.commands.as_ref(), Some(&self.logger)).await;
        self.logged(Category::Speedtest, result).await
    }
}
