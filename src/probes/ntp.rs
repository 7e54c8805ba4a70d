//! SNTP clock-offset probe

use crate::error::{AppError, Result};
use crate::models::{ProbeDetail, ProbeResult};
use crate::probes::datagram::{DatagramOutcome, DatagramProber};
use crate::probes::dns::HostResolver;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

pub const NTP_PORT: u16 = 123;
const PACKET_LEN: usize = 48;
/// Seconds between 1900-01-01 and 1970-01-01
const NTP_UNIX_OFFSET: u64 = 2_208_988_800;
/// LI 0, version 3, mode 3 (client)
const CLIENT_HEADER: u8 = 0x1B;

/// 64-bit NTP timestamp: seconds since 1900 in the high half, fraction low
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NtpTimestamp(pub u64);

impl NtpTimestamp {
    pub fn from_system_time(time: SystemTime) -> Self {
        let since_epoch = time.duration_since(UNIX_EPOCH).unwrap_or_default();
        let seconds = since_epoch.as_secs() + NTP_UNIX_OFFSET;
        let fraction = (u64::from(since_epoch.subsec_nanos()) << 32) / 1_000_000_000;
        Self((seconds << 32) | fraction)
    }

    pub fn now() -> Self {
        Self::from_system_time(SystemTime::now())
    }

    /// Seconds since 1900 as a float
    pub fn as_secs_f64(&self) -> f64 {
        let seconds = (self.0 >> 32) as f64;
        let fraction = (self.0 & 0xFFFF_FFFF) as f64 / 4_294_967_296.0;
        seconds + fraction
    }

    fn read(bytes: &[u8]) -> Self {
        let mut raw = [0u8; 8];
        raw.copy_from_slice(&bytes[..8]);
        Self(u64::from_be_bytes(raw))
    }
}

/// One request/reply measurement
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NtpSample {
    /// Server clock minus local clock, seconds
    pub offset: f64,
    pub round_trip: f64,
    pub stratum: u8,
}

impl NtpSample {
    pub fn offset_ms(&self) -> i64 {
        (self.offset * 1000.0).round() as i64
    }

    pub fn round_trip_ms(&self) -> u64 {
        (self.round_trip.max(0.0) * 1000.0).round() as u64
    }
}

/// Client request carrying `transmit` as its transmit timestamp
pub fn build_request(transmit: NtpTimestamp) -> [u8; PACKET_LEN] {
    let mut packet = [0u8; PACKET_LEN];
    packet[0] = CLIENT_HEADER;
    packet[40..48].copy_from_slice(&transmit.0.to_be_bytes());
    packet
}

/// Validate a server reply and compute offset and round trip.
///
/// `sent` is the transmit timestamp of the request (t1), `received` the
/// local arrival time (t4).
pub fn parse_reply(reply: &[u8], sent: NtpTimestamp, received: NtpTimestamp) -> Result<NtpSample> {
    if reply.len() < PACKET_LEN {
        return Err(AppError::parse(format!(
            "NTP reply too short: {} bytes",
            reply.len()
        )));
    }

    let leap = reply[0] >> 6;
    let mode = reply[0] & 0x07;
    let stratum = reply[1];

    if mode != 4 {
        return Err(AppError::parse(format!("unexpected NTP mode {} in reply", mode)));
    }
    if stratum == 0 {
        let code = String::from_utf8_lossy(&reply[12..16]).trim_end_matches('\0').to_string();
        return Err(AppError::parse(format!("NTP server sent kiss-o'-death {}", code)));
    }
    if leap == 3 {
        return Err(AppError::parse("NTP server clock is not synchronized"));
    }

    let originate = NtpTimestamp::read(&reply[24..32]);
    if originate != sent {
        return Err(AppError::parse("NTP reply does not match the request"));
    }

    let t1 = sent.as_secs_f64();
    let t2 = NtpTimestamp::read(&reply[32..40]).as_secs_f64();
    let t3 = NtpTimestamp::read(&reply[40..48]).as_secs_f64();
    let t4 = received.as_secs_f64();

    Ok(NtpSample {
        offset: ((t2 - t1) + (t3 - t4)) / 2.0,
        round_trip: (t4 - t1) - (t3 - t2),
        stratum,
    })
}

/// Query `server` once within `timeout` overall; PASS with the offset, FAIL
/// on any error
pub async fn probe(
    server: &str,
    resolver: &HostResolver,
    datagrams: &dyn DatagramProber,
    timeout: Duration,
) -> ProbeResult {
    let bounded = tokio::time::timeout(timeout, query(server, resolver, datagrams, timeout)).await;
    let outcome = bounded.unwrap_or_else(|_| {
        Err(AppError::timeout(format!(
            "NTP query to {} timed out after {}s",
            server,
            timeout.as_secs_f64()
        )))
    });
    match outcome {
        Ok(sample) => ProbeResult::pass(
            server,
            ProbeDetail::Ntp {
                offset_ms: Some(sample.offset_ms()),
                stratum: Some(sample.stratum),
            },
        )
        .with_latency_ms(sample.round_trip_ms()),
        Err(e) => ProbeResult::fail(server, ProbeDetail::Ntp { offset_ms: None, stratum: None }, e),
    }
}

async fn query(
    server: &str,
    resolver: &HostResolver,
    datagrams: &dyn DatagramProber,
    timeout: Duration,
) -> Result<NtpSample> {
    let start = Instant::now();
    let addr = resolver.socket_addr(server, NTP_PORT, timeout).await?;

    let wait = timeout.saturating_sub(start.elapsed()).max(Duration::from_millis(1));
    let sent = NtpTimestamp::now();
    let request = build_request(sent);
    match datagrams.exchange(addr, &request, wait).await {
        DatagramOutcome::Response(reply) => parse_reply(&reply, sent, NtpTimestamp::now()),
        DatagramOutcome::Silence => Err(AppError::timeout(format!(
            "no NTP reply from {} within {}s",
            server,
            timeout.as_secs_f64()
        ))),
        DatagramOutcome::Error(e) => Err(AppError::network(e)),
    }
}
