//! TCP reachability probe with optional certificate verification

use crate::error::AppError;
use crate::models::{ProbeDetail, ProbeResult, TcpTarget};
use crate::probes::tls::TlsVerifier;
use std::time::{Duration, Instant};
use tokio::net::TcpStream;

/// Connect to the target. When `verify_tls` is set and the port is one of
/// `tls_ports`, the handshake must succeed too.
pub async fn probe(
    target: &TcpTarget,
    timeout: Duration,
    tls: &TlsVerifier,
    tls_ports: &[u16],
) -> ProbeResult {
    let name = format!("{}:{}", target.host, target.port);
    let start = Instant::now();

    let connected = tokio::time::timeout(timeout, TcpStream::connect((target.host.as_str(), target.port))).await;
    let stream = match connected {
        Ok(Ok(stream)) => stream,
        Ok(Err(e)) => {
            return ProbeResult::fail(name, ProbeDetail::Tcp { tls: None }, AppError::from(e))
                .with_label(target.label.clone())
        }
        Err(_) => {
            let error = AppError::timeout(format!(
                "connection to {} timed out after {}s",
                name,
                timeout.as_secs_f64()
            ));
            return ProbeResult::fail(name, ProbeDetail::Tcp { tls: None }, error)
                .with_label(target.label.clone());
        }
    };
    let connect_time = start.elapsed();

    if !(target.verify_tls && tls_ports.contains(&target.port)) {
        return ProbeResult::pass(name, ProbeDetail::Tcp { tls: None })
            .with_latency(connect_time)
            .with_label(target.label.clone());
    }

    let remaining = timeout.saturating_sub(connect_time).max(Duration::from_millis(1));
    let handshake = tokio::time::timeout(remaining, tls.handshake(stream, &target.host)).await;
    match handshake {
        Ok(Ok(info)) => ProbeResult::pass(name, ProbeDetail::Tcp { tls: Some(info) })
            .with_latency(connect_time)
            .with_label(target.label.clone()),
        Ok(Err(e)) => ProbeResult::fail(name, ProbeDetail::Tcp { tls: None }, e)
            .with_latency(connect_time)
            .with_label(target.label.clone()),
        Err(_) => {
            let error = AppError::tls(format!("handshake with {} timed out", name));
            ProbeResult::fail(name, ProbeDetail::Tcp { tls: None }, error)
                .with_latency(connect_time)
                .with_label(target.label.clone())
        }
    }
}
