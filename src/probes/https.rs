//! HTTPS full check: certificate verification, then a real GET

use crate::error::{AppError, Result};
use crate::models::{HttpsTarget, ProbeDetail, ProbeResult, TlsInfo};
use crate::probes::tls::TlsVerifier;
use reqwest::{redirect::Policy, Client};
use std::time::{Duration, Instant};

pub const MAX_REDIRECTS: usize = 10;

/// Client for the GET stage; certificate verification stays on
pub fn build_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .use_rustls_tls()
        .timeout(timeout)
        .redirect(Policy::limited(MAX_REDIRECTS))
        .user_agent(concat!("network-readiness-probe/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| AppError::network(format!("Failed to create HTTP client: {}", e)))
}

/// Two stages: a TLS handshake against the URL's host (skipped for
/// `http://`), then a GET following redirects. Status `< 400` passes,
/// `>= 400` warns, anything that prevents a response fails.
pub async fn probe(client: &Client, tls: &TlsVerifier, target: &HttpsTarget, timeout: Duration) -> ProbeResult {
    let start = Instant::now();
    let fail = |error: AppError, tls_info: Option<TlsInfo>| {
        ProbeResult::fail(
            target.url.clone(),
            ProbeDetail::Https { http_status: None, tls: tls_info },
            error,
        )
        .with_label(target.label.clone())
    };

    let url = match url::Url::parse(&target.url) {
        Ok(url) => url,
        Err(e) => return fail(AppError::from(e), None),
    };

    let tls_info = if url.scheme() == "https" {
        let (Some(host), Some(port)) = (url.host_str(), url.port_or_known_default()) else {
            return fail(AppError::validation(format!("URL has no host: {}", target.url)), None);
        };
        // IPv6 literals come back bracketed
        let host = host.trim_start_matches('[').trim_end_matches(']');
        match tls.verify(host, port, timeout).await {
            Ok(info) => Some(info),
            Err(e) => return fail(e, None),
        }
    } else {
        None
    };

    let remaining = timeout.saturating_sub(start.elapsed()).max(Duration::from_millis(1));
    match client.get(url).timeout(remaining).send().await {
        Ok(response) => {
            let code = response.status().as_u16();
            let detail = ProbeDetail::Https {
                http_status: Some(code),
                tls: tls_info,
            };
            let result = if code < 400 {
                ProbeResult::pass(target.url.clone(), detail)
            } else {
                ProbeResult::warn(target.url.clone(), detail).with_error(format!("HTTP status {}", code))
            };
            result.with_latency(start.elapsed()).with_label(target.label.clone())
        }
        Err(e) => fail(AppError::from(e), tls_info),
    }
}
