//! HTTP throughput against a Cloudflare-style `__down` / `__up` endpoint

use crate::error::{AppError, Result};
use crate::speedtest::ThroughputSource;
use async_trait::async_trait;
use futures::StreamExt;
use rand::RngCore;
use reqwest::Client;
use std::time::{Duration, Instant};

pub struct CloudflareSource {
    client: Client,
    endpoint: String,
    download_bytes: u64,
    upload_bytes: u64,
}

impl CloudflareSource {
    pub fn new(endpoint: &str, download_bytes: u64, upload_bytes: u64, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .use_rustls_tls()
            .timeout(timeout)
            .user_agent(concat!("network-readiness-probe/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AppError::network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            download_bytes,
            upload_bytes,
        })
    }

    fn random_payload(&self) -> Vec<u8> {
        let mut payload = vec![0u8; self.upload_bytes as usize];
        rand::thread_rng().fill_bytes(&mut payload);
        payload
    }
}

/// Megabits per second for `bytes` moved in `elapsed`, one decimal
pub fn throughput_mbps(bytes: u64, elapsed: Duration) -> f64 {
    let seconds = elapsed.as_secs_f64().max(1e-6);
    let mbps = bytes as f64 * 8.0 / 1_000_000.0 / seconds;
    (mbps * 10.0).round() / 10.0
}

#[async_trait]
impl ThroughputSource for CloudflareSource {
    fn name(&self) -> &'static str {
        "cloudflare"
    }

    /// Stream the body until the requested size arrives or the server stops
    async fn download(&self) -> Result<f64> {
        let url = format!("{}/__down?bytes={}", self.endpoint, self.download_bytes);
        let start = Instant::now();

        let response = self.client.get(&url).send().await?.error_for_status()?;
        let mut body = response.bytes_stream();
        let mut received: u64 = 0;
        while let Some(chunk) = body.next().await {
            received += chunk?.len() as u64;
            if received >= self.download_bytes {
                break;
            }
        }

        if received == 0 {
            return Err(AppError::http_request(format!("{} returned an empty body", url)));
        }
        Ok(throughput_mbps(received, start.elapsed()))
    }

    async fn upload(&self) -> Result<f64> {
        let url = format!("{}/__up", self.endpoint);
        let payload = self.random_payload();
        let sent = payload.len() as u64;
        let start = Instant::now();

        self.client
            .post(&url)
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(payload)
            .send()
            .await?
            .error_for_status()?;

        Ok(throughput_mbps(sent, start.elapsed()))
    }
}
