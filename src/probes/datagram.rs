//! Single-datagram UDP exchange used by the QUIC, UDP range and NTP probes

use async_trait::async_trait;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;
use tokio::net::UdpSocket;

/// What came back after sending one datagram
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatagramOutcome {
    /// A reply arrived
    Response(Vec<u8>),
    /// Nothing arrived within the wait. Not proof of a closed port.
    Silence,
    /// Socket-level failure, including ICMP port unreachable
    Error(String),
}

#[async_trait]
pub trait DatagramProber: Send + Sync {
    async fn exchange(&self, addr: SocketAddr, payload: &[u8], wait: Duration) -> DatagramOutcome;
}

/// Production prober on a connected `tokio::net::UdpSocket`.
///
/// Connecting the socket makes the kernel report ICMP port unreachable as
/// `ConnectionRefused` on the next receive.
#[derive(Debug, Default, Clone, Copy)]
pub struct UdpDatagramProber;

const MAX_DATAGRAM: usize = 2048;

#[async_trait]
impl DatagramProber for UdpDatagramProber {
    async fn exchange(&self, addr: SocketAddr, payload: &[u8], wait: Duration) -> DatagramOutcome {
        let socket = match UdpSocket::bind(unspecified_for(addr)).await {
            Ok(socket) => socket,
            Err(e) => return DatagramOutcome::Error(format!("bind failed: {}", e)),
        };
        if let Err(e) = socket.connect(addr).await {
            return DatagramOutcome::Error(format!("connect to {} failed: {}", addr, e));
        }
        if let Err(e) = socket.send(payload).await {
            return DatagramOutcome::Error(format!("send to {} failed: {}", addr, e));
        }

        let mut buf = vec![0u8; MAX_DATAGRAM];
        match tokio::time::timeout(wait, socket.recv(&mut buf)).await {
            Ok(Ok(n)) => {
                buf.truncate(n);
                DatagramOutcome::Response(buf)
            }
            Ok(Err(e)) => DatagramOutcome::Error(format!("{}: {}", addr, e)),
            Err(_) => DatagramOutcome::Silence,
        }
    }
}

fn unspecified_for(addr: SocketAddr) -> SocketAddr {
    if addr.is_ipv4() {
        SocketAddr::from(([0, 0, 0, 0], 0))
    } else {
        SocketAddr::from(([0u16; 8], 0))
    }
}

/// Local address the kernel would route from to reach `destination`.
/// Connecting a UDP socket sends nothing.
pub async fn route_source_ip(destination: SocketAddr) -> Option<IpAddr> {
    let socket = UdpSocket::bind(unspecified_for(destination)).await.ok()?;
    socket.connect(destination).await.ok()?;
    let ip = socket.local_addr().ok()?.ip();
    (!ip.is_unspecified()).then_some(ip)
}

/// This host's LAN address, the source of its default route
pub async fn private_ip() -> Option<IpAddr> {
    route_source_ip(SocketAddr::from(([8, 8, 8, 8], 53))).await
}
