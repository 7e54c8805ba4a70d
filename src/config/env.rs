//! Environment variable handling and .env file management

use crate::error::{AppError, Result};
use std::path::Path;

/// Environment variable configuration manager
pub struct EnvManager;

impl EnvManager {
    /// Load .env file if it exists
    pub fn load_env_file(debug: bool) -> Result<()> {
        if Path::new(".env").exists() {
            dotenv::from_filename(".env")
                .map_err(|e| AppError::config(format!("Failed to load .env file: {}", e)))?;

            if debug {
                eprintln!("Loaded configuration from .env file");
            }
        } else if debug {
            eprintln!("No .env file found, using defaults and CLI arguments");
        }

        Ok(())
    }

    /// Create example .env file content
    pub fn create_example_env_content() -> String {
        let mut content = String::from(
            "# Network Readiness Probe Configuration\n\
             #\n\
             # Values here are defaults; command-line arguments override them.\n\n",
        );

        for (var, description, example) in Self::get_supported_env_vars() {
            content.push_str(&format!("# {}\n# {}={}\n\n", description, var, example));
        }

        content
    }

    /// Save example .env file to disk
    pub fn save_example_env_file(path: &Path) -> Result<()> {
        let content = Self::create_example_env_content();
        std::fs::write(path, content)
            .map_err(|e| AppError::config(format!("Failed to write example .env file: {}", e)))?;

        Ok(())
    }

    /// Validate environment variable format before parsing
    pub fn validate_env_var(key: &str, value: &str) -> Result<()> {
        let value = value.trim();
        match key {
            "DNS_TIMEOUT_SECONDS" | "TCP_TIMEOUT_SECONDS" | "HTTPS_TIMEOUT_SECONDS" | "QUIC_TIMEOUT_SECONDS"
            | "NTP_TIMEOUT_SECONDS" => {
                let seconds: u64 = value
                    .parse()
                    .map_err(|e| AppError::config(format!("Invalid {} value '{}': {}", key, value, e)))?;
                if seconds == 0 || seconds > 300 {
                    return Err(AppError::config(format!("{} must be between 1 and 300, got: {}", key, seconds)));
                }
            }
            "UDP_WAIT_MS" => {
                let millis: u64 = value
                    .parse()
                    .map_err(|e| AppError::config(format!("Invalid UDP_WAIT_MS value '{}': {}", value, e)))?;
                if millis == 0 || millis > 10_000 {
                    return Err(AppError::config(format!("UDP_WAIT_MS must be between 1 and 10000, got: {}", millis)));
                }
            }
            "PING_COUNT" => {
                let count: u32 = value
                    .parse()
                    .map_err(|e| AppError::config(format!("Invalid PING_COUNT value '{}': {}", value, e)))?;
                if count == 0 || count > 20 {
                    return Err(AppError::config(format!("PING_COUNT must be between 1 and 20, got: {}", count)));
                }
            }
            "SPEEDTEST_ROUNDS" => {
                let rounds: u32 = value
                    .parse()
                    .map_err(|e| AppError::config(format!("Invalid SPEEDTEST_ROUNDS value '{}': {}", value, e)))?;
                if rounds == 0 || rounds > 10 {
                    return Err(AppError::config(format!("SPEEDTEST_ROUNDS must be between 1 and 10, got: {}", rounds)));
                }
            }
            "CONCURRENCY" => {
                let concurrency: usize = value
                    .parse()
                    .map_err(|e| AppError::config(format!("Invalid CONCURRENCY value '{}': {}", value, e)))?;
                if concurrency > 256 {
                    return Err(AppError::config(format!("CONCURRENCY cannot exceed 256, got: {}", concurrency)));
                }
            }
            "SPEEDTEST_ENDPOINT" => {
                let parsed = url::Url::parse(value)
                    .map_err(|e| AppError::config(format!("Invalid SPEEDTEST_ENDPOINT '{}': {}", value, e)))?;
                if !matches!(parsed.scheme(), "http" | "https") {
                    return Err(AppError::config(format!("SPEEDTEST_ENDPOINT must use HTTP or HTTPS: {}", value)));
                }
            }
            "ENABLE_COLOR" => {
                value
                    .parse::<bool>()
                    .map_err(|e| AppError::config(format!("Invalid ENABLE_COLOR value '{}': {}", value, e)))?;
            }
            _ => {
                // TARGETS_FILE, SITE_LABEL and unknown keys are free-form
            }
        }

        Ok(())
    }

    /// Get list of all supported environment variables with descriptions
    pub fn get_supported_env_vars() -> Vec<(&'static str, &'static str, &'static str)> {
        vec![
            ("TARGETS_FILE", "JSON target list", "/etc/nrp/targets.json"),
            ("DNS_TIMEOUT_SECONDS", "DNS lookup timeout (1-300)", "3"),
            ("TCP_TIMEOUT_SECONDS", "TCP connect and TLS timeout (1-300)", "5"),
            ("HTTPS_TIMEOUT_SECONDS", "HTTPS check timeout (1-300)", "10"),
            ("QUIC_TIMEOUT_SECONDS", "HTTP/3 request timeout (1-300)", "5"),
            ("UDP_WAIT_MS", "Wait for a UDP reply in milliseconds (1-10000)", "1000"),
            ("PING_COUNT", "Echo requests per ping target (1-20)", "2"),
            ("NTP_TIMEOUT_SECONDS", "NTP request timeout (1-300)", "3"),
            ("SPEEDTEST_ENDPOINT", "HTTP speed test base URL", "https://speed.cloudflare.com"),
            ("SPEEDTEST_ROUNDS", "HTTP speed test rounds (1-10)", "2"),
            ("CONCURRENCY", "Probes in flight per category, 0 = sequential", "0"),
            ("SITE_LABEL", "Site label for metadata and history", "Warehouse 3"),
            ("ENABLE_COLOR", "Enable colored output", "true"),
        ]
    }

    /// Display environment variable help
    pub fn display_env_help() -> String {
        let mut help = String::new();
        help.push_str("Supported Environment Variables:\n\n");

        for (var, description, example) in Self::get_supported_env_vars() {
            help.push_str(&format!("  {:<22} {}\n", var, description));
            help.push_str(&format!("  {:<22} Example: {}\n\n", "", example));
        }

        help.push_str("Configuration Priority (highest to lowest):\n");
        help.push_str("  1. Command-line arguments\n");
        help.push_str("  2. Environment variables\n");
        help.push_str("  3. .env file values\n");
        help.push_str("  4. Default values\n");

        help
    }
}
