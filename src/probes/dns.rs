//! Name resolution and the DNS probe

use crate::error::{AppError, Result};
use crate::models::{ProbeDetail, ProbeResult};
use std::net::{IpAddr, SocketAddr};
use std::time::{Duration, Instant};
use trust_dns_resolver::{
    config::{ResolverConfig, ResolverOpts},
    system_conf, TokioAsyncResolver,
};

/// Resolver shared by every probe that needs an address
#[derive(Clone)]
pub struct HostResolver {
    resolver: TokioAsyncResolver,
}

impl HostResolver {
    /// Resolver from the platform configuration (`/etc/resolv.conf` etc.),
    /// falling back to the library defaults when it cannot be read
    pub fn system(timeout: Duration) -> Self {
        let (config, mut opts) = system_conf::read_system_conf()
            .unwrap_or_else(|_| (ResolverConfig::default(), ResolverOpts::default()));
        opts.timeout = timeout;
        opts.attempts = 1;

        Self {
            resolver: TokioAsyncResolver::tokio(config, opts),
        }
    }

    /// First address for `host`. IP literals are returned as-is.
    pub async fn lookup(&self, host: &str) -> Result<IpAddr> {
        if let Ok(ip) = host.parse::<IpAddr>() {
            return Ok(ip);
        }

        let response = self
            .resolver
            .lookup_ip(host)
            .await
            .map_err(|e| AppError::dns_resolution(format!("DNS lookup failed for {}: {}", host, e)))?;

        response
            .iter()
            .next()
            .ok_or_else(|| AppError::dns_resolution(format!("No addresses found for {}", host)))
    }

    /// Lookup bounded by `timeout`
    pub async fn lookup_within(&self, host: &str, timeout: Duration) -> Result<IpAddr> {
        tokio::time::timeout(timeout, self.lookup(host))
            .await
            .map_err(|_| {
                AppError::timeout(format!(
                    "DNS lookup for {} timed out after {}s",
                    host,
                    timeout.as_secs_f64()
                ))
            })?
    }

    pub async fn socket_addr(&self, host: &str, port: u16, timeout: Duration) -> Result<SocketAddr> {
        let ip = self.lookup_within(host, timeout).await?;
        Ok(SocketAddr::new(ip, port))
    }
}

/// Resolve `name`; PASS with the first address, FAIL otherwise
pub async fn probe(resolver: &HostResolver, name: &str, timeout: Duration) -> ProbeResult {
    let start = Instant::now();

    match resolver.lookup_within(name, timeout).await {
        Ok(ip) => ProbeResult::pass(name, ProbeDetail::Dns { ip: Some(ip.to_string()) })
            .with_latency(start.elapsed()),
        Err(e) => ProbeResult::fail(name, ProbeDetail::Dns { ip: None }, e),
    }
}
