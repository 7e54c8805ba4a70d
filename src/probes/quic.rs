//! QUIC reachability as a three-stage fallback.
//!
//! `Http3` asks curl for an HTTP/3-only response. When curl lacks HTTP/3 or
//! the answer is inconclusive, `UdpHandshake` sends an Initial-shaped
//! datagram and `UdpRaw` a minimal one. Silence after the last stage is a
//! WARN: a firewall dropping unsolicited UDP proves nothing.

use crate::error::AppError;
use crate::logging::ProbeLogger;
use crate::models::{ProbeDetail, ProbeResult, QuicProtocol, QuicTarget};
use crate::probes::command::{args, CommandRunner};
use crate::probes::datagram::{DatagramOutcome, DatagramProber};
use crate::probes::dns::HostResolver;
use rand::RngCore;
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use tokio::sync::OnceCell;

/// Long header, fixed bit, followed by zeros
pub const MINIMAL_PROBE: [u8; 16] = [0xC0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0];

/// Clients must pad Initial datagrams to at least this size
pub const INITIAL_DATAGRAM_LEN: usize = 1200;

/// Reserved "greasing" version; servers answer it with Version Negotiation
pub const GREASE_VERSION: u32 = 0x1a2a_3a4a;

const CURL_GUARD: Duration = Duration::from_secs(2);
const CURL_VERSION_TIMEOUT: Duration = Duration::from_secs(5);
pub const NO_RESPONSE_NOTE: &str = "Port accessible but no QUIC response";
pub const TIMEOUT_ERROR: &str = "QUIC test timeout";

/// Cached answer to "does the local curl speak HTTP/3"
#[derive(Debug, Default)]
pub struct Http3Support {
    available: OnceCell<bool>,
}

impl Http3Support {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn available(&self, commands: &dyn CommandRunner) -> bool {
        *self
            .available
            .get_or_init(|| async {
                match commands.run("curl", &args(&["--version"]), CURL_VERSION_TIMEOUT).await {
                    Ok(output) => {
                        output.success()
                            && (output.stdout.contains("HTTP3") || output.stdout.contains("http3"))
                    }
                    Err(_) => false,
                }
            })
            .await
    }
}

/// Everything a QUIC probe needs
pub struct QuicContext<'a> {
    pub commands: &'a dyn CommandRunner,
    pub datagrams: &'a dyn DatagramProber,
    pub resolver: &'a HostResolver,
    pub http3: &'a Http3Support,
    /// curl connect/overall timeout
    pub timeout: Duration,
    /// wait per UDP stage
    pub wait: Duration,
    pub logger: Option<&'a ProbeLogger>,
}

impl QuicContext<'_> {
    /// Worst case of all stages, including resolving the host
    pub fn budget(&self) -> Duration {
        self.timeout + CURL_GUARD + self.wait * 2 + self.timeout
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuicStage {
    Http3,
    UdpHandshake,
    UdpRaw,
}

#[derive(Debug)]
pub enum StageOutcome {
    /// Terminal result
    Confirmed(ProbeResult),
    /// Move on to the next stage
    Inconclusive,
    /// Hard error, terminal FAIL
    Failed(AppError),
}

/// 1200-byte long-header Initial with a random DCID and a greased version
pub fn initial_datagram<R: RngCore + ?Sized>(rng: &mut R) -> Vec<u8> {
    let mut dcid = [0u8; 8];
    rng.fill_bytes(&mut dcid);

    let mut packet = Vec::with_capacity(INITIAL_DATAGRAM_LEN);
    packet.push(0xC0);
    packet.extend_from_slice(&GREASE_VERSION.to_be_bytes());
    packet.push(dcid.len() as u8);
    packet.extend_from_slice(&dcid);
    packet.push(0); // SCID length
    packet.push(0); // token length
    // Two-byte varint length covering packet number and payload
    let remaining = (INITIAL_DATAGRAM_LEN - packet.len() - 2) as u16;
    packet.extend_from_slice(&(0x4000 | remaining).to_be_bytes());
    packet.push(0); // packet number
    packet.resize(INITIAL_DATAGRAM_LEN, 0);
    packet
}

/// Run the stages in order until one is terminal
pub async fn probe(ctx: &QuicContext<'_>, target: &QuicTarget, initial: Vec<u8>) -> ProbeResult {
    let name = format!("{}:{}", target.host, target.port);
    let start = Instant::now();

    let outcome = tokio::time::timeout(ctx.budget(), run_stages(ctx, target, &name, initial, start)).await;
    let result = match outcome {
        Ok(result) => result,
        Err(_) => fail(&name, AppError::timeout(TIMEOUT_ERROR)),
    };
    result.with_label(target.label.clone())
}

async fn run_stages(
    ctx: &QuicContext<'_>,
    target: &QuicTarget,
    name: &str,
    initial: Vec<u8>,
    start: Instant,
) -> ProbeResult {
    let mut stage = QuicStage::Http3;
    let mut addr: Option<SocketAddr> = None;

    loop {
        let outcome = match stage {
            QuicStage::Http3 => http3_stage(ctx, target, name, start).await,
            QuicStage::UdpHandshake | QuicStage::UdpRaw => {
                let resolved = match addr {
                    Some(resolved) => resolved,
                    None => match ctx.resolver.socket_addr(&target.host, target.port, ctx.timeout).await {
                        Ok(resolved) => {
                            addr = Some(resolved);
                            resolved
                        }
                        Err(e) => return fail(name, e),
                    },
                };
                let payload: &[u8] = if stage == QuicStage::UdpHandshake {
                    &initial
                } else {
                    &MINIMAL_PROBE
                };
                udp_stage(ctx, resolved, payload, name, start).await
            }
        };

        if let (StageOutcome::Inconclusive, Some(logger)) = (&outcome, ctx.logger) {
            logger.log_stage(name, stage.name(), "inconclusive").await;
        }

        match (outcome, stage) {
            (StageOutcome::Confirmed(result), _) => return result,
            (StageOutcome::Failed(e), _) => return fail(name, e),
            (StageOutcome::Inconclusive, QuicStage::Http3) => stage = QuicStage::UdpHandshake,
            (StageOutcome::Inconclusive, QuicStage::UdpHandshake) => stage = QuicStage::UdpRaw,
            (StageOutcome::Inconclusive, QuicStage::UdpRaw) => {
                let detail = ProbeDetail::Quic {
                    protocol: QuicProtocol::Udp,
                    note: Some(NO_RESPONSE_NOTE.to_string()),
                    response_bytes: None,
                };
                return ProbeResult::warn(name, detail).with_latency(start.elapsed());
            }
        }
    }
}

async fn http3_stage(ctx: &QuicContext<'_>, target: &QuicTarget, name: &str, start: Instant) -> StageOutcome {
    if !ctx.http3.available(ctx.commands).await {
        return StageOutcome::Inconclusive;
    }

    let seconds = ctx.timeout.as_secs().max(1).to_string();
    let url = format!("https://{}:{}/", target.host, target.port);
    let curl_args = vec![
        "-s".to_string(),
        "-I".to_string(),
        "--http3-only".to_string(),
        "--connect-timeout".to_string(),
        seconds.clone(),
        "--max-time".to_string(),
        seconds,
        url,
    ];

    match ctx.commands.run("curl", &curl_args, ctx.timeout + CURL_GUARD).await {
        Ok(output) if output.success() && output.stdout.contains("HTTP/3") => {
            let detail = ProbeDetail::Quic {
                protocol: QuicProtocol::Http3,
                note: None,
                response_bytes: None,
            };
            StageOutcome::Confirmed(ProbeResult::pass(name, detail).with_latency(start.elapsed()))
        }
        Ok(_) => StageOutcome::Inconclusive,
        Err(AppError::Timeout(_)) => StageOutcome::Failed(AppError::timeout(TIMEOUT_ERROR)),
        Err(_) => StageOutcome::Inconclusive,
    }
}

async fn udp_stage(
    ctx: &QuicContext<'_>,
    addr: SocketAddr,
    payload: &[u8],
    name: &str,
    start: Instant,
) -> StageOutcome {
    match ctx.datagrams.exchange(addr, payload, ctx.wait).await {
        DatagramOutcome::Response(bytes) => {
            let detail = ProbeDetail::Quic {
                protocol: QuicProtocol::Udp,
                note: None,
                response_bytes: Some(bytes.len()),
            };
            StageOutcome::Confirmed(ProbeResult::pass(name, detail).with_latency(start.elapsed()))
        }
        DatagramOutcome::Silence => StageOutcome::Inconclusive,
        DatagramOutcome::Error(e) => StageOutcome::Failed(AppError::network(e)),
    }
}

fn fail(name: &str, error: AppError) -> ProbeResult {
    let message = match &error {
        AppError::Timeout(msg) if msg == TIMEOUT_ERROR => TIMEOUT_ERROR.to_string(),
        other => other.to_string(),
    };
    let detail = ProbeDetail::Quic {
        protocol: QuicProtocol::Unconfirmed,
        note: None,
        response_bytes: None,
    };
    ProbeResult::fail(name, detail, message)
}

impl QuicStage {
    pub fn name(&self) -> &'static str {
        match self {
            QuicStage::Http3 => "http3",
            QuicStage::UdpHandshake => "udp-handshake",
            QuicStage::UdpRaw => "udp-raw",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use crate::probes::command::CommandOutput;
    use crate::types::Status;
    use async_trait::async_trait;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::sync::Mutex;

    /// curl stub: `version` answers `--version`, `request` answers the probe
    struct Curl {
        version: &'static str,
        request: fn() -> Result<CommandOutput>,
        calls: Mutex<usize>,
    }

    #[async_trait]
    impl CommandRunner for Curl {
        async fn run(&self, program: &str, args: &[String], _timeout: Duration) -> Result<CommandOutput> {
            assert_eq!(program, "curl");
            *self.calls.lock().unwrap() += 1;
            if args == ["--version"] {
                return Ok(CommandOutput { exit_code: 0, stdout: self.version.to_string(), stderr: String::new() });
            }
            assert!(args.contains(&"--http3-only".to_string()));
            (self.request)()
        }
    }

    fn curl(version: &'static str, request: fn() -> Result<CommandOutput>) -> Curl {
        Curl { version, request, calls: Mutex::new(0) }
    }

    const CURL_WITH_HTTP3: &str = "curl 8.5.0\nFeatures: alt-svc HTTP2 HTTP3 HTTPS-proxy SSL";
    const CURL_WITHOUT_HTTP3: &str = "curl 7.81.0\nFeatures: alt-svc HTTP2 HTTPS-proxy SSL";

    /// Scripted outcomes, consumed one per exchange
    struct Udp {
        outcomes: Mutex<Vec<DatagramOutcome>>,
        payload_sizes: Mutex<Vec<usize>>,
    }

    impl Udp {
        fn new(mut outcomes: Vec<DatagramOutcome>) -> Self {
            outcomes.reverse();
            Self { outcomes: Mutex::new(outcomes), payload_sizes: Mutex::new(Vec::new()) }
        }
    }

    #[async_trait]
    impl DatagramProber for Udp {
        async fn exchange(&self, _addr: SocketAddr, payload: &[u8], _wait: Duration) -> DatagramOutcome {
            self.payload_sizes.lock().unwrap().push(payload.len());
            self.outcomes.lock().unwrap().pop().unwrap_or(DatagramOutcome::Silence)
        }
    }

    fn target() -> QuicTarget {
        QuicTarget { host: "127.0.0.1".to_string(), port: 443, label: Some("Edge".to_string()) }
    }

    async fn run(commands: &Curl, datagrams: &Udp) -> ProbeResult {
        let resolver = HostResolver::system(Duration::from_secs(1));
        let http3 = Http3Support::new();
        let ctx = QuicContext {
            commands,
            datagrams,
            resolver: &resolver,
            http3: &http3,
            timeout: Duration::from_secs(1),
            wait: Duration::from_millis(50),
            logger: None,
        };
        probe(&ctx, &target(), initial_datagram(&mut StdRng::seed_from_u64(1))).await
    }

    fn protocol(result: &ProbeResult) -> QuicProtocol {
        match &result.detail {
            ProbeDetail::Quic { protocol, .. } => *protocol,
            other => panic!("expected a QUIC detail, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_http3_confirmation_passes() {
        let commands = curl(CURL_WITH_HTTP3, || {
            Ok(CommandOutput { exit_code: 0, stdout: "HTTP/3 200\r\nserver: edge\r\n".to_string(), stderr: String::new() })
        });
        let datagrams = Udp::new(vec![]);

        let result = run(&commands, &datagrams).await;
        assert_eq!(result.status, Status::Pass);
        assert_eq!(protocol(&result), QuicProtocol::Http3);
        assert_eq!(result.label.as_deref(), Some("Edge"));
        assert!(datagrams.payload_sizes.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_without_http3_curl_falls_back_to_udp() {
        let commands = curl(CURL_WITHOUT_HTTP3, || panic!("no HTTP/3 request expected"));
        let datagrams = Udp::new(vec![DatagramOutcome::Response(vec![0; 43])]);

        let result = run(&commands, &datagrams).await;
        assert_eq!(result.status, Status::Pass);
        assert_eq!(protocol(&result), QuicProtocol::Udp);
        assert!(matches!(result.detail, ProbeDetail::Quic { response_bytes: Some(43), .. }));
        assert_eq!(*datagrams.payload_sizes.lock().unwrap(), vec![INITIAL_DATAGRAM_LEN]);
    }

    #[tokio::test]
    async fn test_inconclusive_http3_then_raw_probe_response() {
        let commands = curl(CURL_WITH_HTTP3, || {
            Ok(CommandOutput { exit_code: 7, stdout: String::new(), stderr: String::new() })
        });
        let datagrams = Udp::new(vec![DatagramOutcome::Silence, DatagramOutcome::Response(vec![1])]);

        let result = run(&commands, &datagrams).await;
        assert_eq!(result.status, Status::Pass);
        assert_eq!(*datagrams.payload_sizes.lock().unwrap(), vec![INITIAL_DATAGRAM_LEN, MINIMAL_PROBE.len()]);
    }

    #[tokio::test]
    async fn test_total_silence_warns() {
        let commands = curl(CURL_WITHOUT_HTTP3, || panic!("no HTTP/3 request expected"));
        let datagrams = Udp::new(vec![DatagramOutcome::Silence, DatagramOutcome::Silence]);

        let result = run(&commands, &datagrams).await;
        assert_eq!(result.status, Status::Warn);
        assert!(result.error.is_none());
        assert!(matches!(&result.detail, ProbeDetail::Quic { note: Some(note), .. } if note == NO_RESPONSE_NOTE));
    }

    #[tokio::test]
    async fn test_socket_error_fails() {
        let commands = curl(CURL_WITHOUT_HTTP3, || panic!("no HTTP/3 request expected"));
        let datagrams = Udp::new(vec![DatagramOutcome::Error("Connection refused".to_string())]);

        let result = run(&commands, &datagrams).await;
        assert_eq!(result.status, Status::Fail);
        assert_eq!(protocol(&result), QuicProtocol::Unconfirmed);
        assert!(result.error.as_deref().unwrap().contains("Connection refused"));
    }

    #[tokio::test]
    async fn test_curl_timeout_fails_with_timeout_error() {
        let commands = curl(CURL_WITH_HTTP3, || Err(AppError::timeout("curl did not finish")));
        let datagrams = Udp::new(vec![]);

        let result = run(&commands, &datagrams).await;
        assert_eq!(result.status, Status::Fail);
        assert_eq!(result.error.as_deref(), Some(TIMEOUT_ERROR));
    }

    #[tokio::test]
    async fn test_curl_version_is_detected_once() {
        let commands = curl(CURL_WITHOUT_HTTP3, || panic!("no HTTP/3 request expected"));
        let http3 = Http3Support::new();
        assert!(!http3.available(&commands).await);
        assert!(!http3.available(&commands).await);
        assert_eq!(*commands.calls.lock().unwrap(), 1);
    }

    #[test]
    fn test_initial_datagram_shape() {
        let packet = initial_datagram(&mut StdRng::seed_from_u64(5));
        assert_eq!(packet.len(), INITIAL_DATAGRAM_LEN);
        assert_eq!(packet[0] & 0xC0, 0xC0);
        assert_eq!(&packet[1..5], &GREASE_VERSION.to_be_bytes());
        assert_eq!(packet[5], 8);
        let length = u16::from_be_bytes([packet[16], packet[17]]) & 0x3FFF;
        assert_eq!(length as usize, INITIAL_DATAGRAM_LEN - 18);
    }
}
