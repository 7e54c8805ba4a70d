//! Additional comprehensive tests for configuration parsing and validation

use super::{EnvManager, TargetLoader};
use crate::models::Config;
use crate::speedtest::TierFloor;
use proptest::prelude::*;

/// Test edge cases in configuration validation
mod config_edge_cases {
    use super::*;

    #[test]
    fn test_timeout_boundaries() {
        let mut config = Config {
            dns_timeout_seconds: 300,
            ntp_timeout_seconds: 1,
            ..Default::default()
        };
        assert!(config.validate().is_ok());

        config.dns_timeout_seconds = 301;
        assert!(config.validate().is_err());

        config.dns_timeout_seconds = 3;
        config.quic_timeout_seconds = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_udp_wait_and_ping_boundaries() {
        let mut config = Config {
            udp_wait_ms: 10_000,
            ping_count: 20,
            ..Default::default()
        };
        assert!(config.validate().is_ok());

        config.udp_wait_ms = 10_001;
        assert!(config.validate().is_err());

        config.udp_wait_ms = 1;
        config.ping_count = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_speedtest_settings() {
        let mut config = Config {
            speedtest_endpoint: "http://10.0.0.5:8080".to_string(),
            speedtest_rounds: 10,
            ..Default::default()
        };
        assert!(config.validate().is_ok());

        config.speedtest_endpoint = "speed.example".to_string();
        assert!(config.validate().is_err());

        config.speedtest_endpoint = "https://speed.example".to_string();
        config.upload_bytes = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_threshold_table_is_validated() {
        let mut config = Config::default();
        config.bandwidth_thresholds.minimum = TierFloor::new(100.0, 10.0);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("minimum"));
    }

    #[test]
    fn test_tls_ports_and_concurrency() {
        let mut config = Config {
            tls_ports: vec![443, 8443, 993],
            concurrency: 256,
            ..Default::default()
        };
        assert!(config.validate().is_ok());

        config.tls_ports.push(0);
        assert!(config.validate().is_err());

        config.tls_ports.pop();
        config.concurrency = 257;
        assert!(config.validate().is_err());
    }
}

/// Test serialized configuration with missing fields
mod serde_defaults {
    use super::*;

    #[test]
    fn test_partial_json_fills_defaults() {
        let config: Config = serde_json::from_str(r#"{"ping_count": 5, "site_label": "North"}"#).unwrap();
        assert_eq!(config.ping_count, 5);
        assert_eq!(config.site_label.as_deref(), Some("North"));
        assert_eq!(config.dns_timeout_seconds, 3);
        assert_eq!(config.tls_ports, vec![443]);
        assert_eq!(config.bandwidth_thresholds.recommended, TierFloor::new(80.0, 20.0));
        assert!(config.use_ookla);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_target_file_alias() {
        let targets = TargetLoader::parse(
            r#"{"udp_range": [{"host": "media.example", "start_port": 10000, "end_port": 10100, "sample_size": 8}]}"#,
        )
        .unwrap();
        assert_eq!(targets.udp_ranges.len(), 1);
        assert_eq!(targets.udp_ranges[0].effective_sample(), 8);
        assert_eq!(targets.ntp, "pool.ntp.org");
    }
}

/// Test environment variable parsing edge cases
mod env_parsing_tests {
    use super::*;

    #[test]
    fn test_env_var_boundary_values() {
        assert!(EnvManager::validate_env_var("NTP_TIMEOUT_SECONDS", "1").is_ok());
        assert!(EnvManager::validate_env_var("NTP_TIMEOUT_SECONDS", "300").is_ok());
        assert!(EnvManager::validate_env_var("UDP_WAIT_MS", "10000").is_ok());
        assert!(EnvManager::validate_env_var("SPEEDTEST_ROUNDS", "10").is_ok());
        assert!(EnvManager::validate_env_var("SPEEDTEST_ROUNDS", "11").is_err());
    }

    #[test]
    fn test_env_var_boolean_validation() {
        assert!(EnvManager::validate_env_var("ENABLE_COLOR", "true").is_ok());
        assert!(EnvManager::validate_env_var("ENABLE_COLOR", "false").is_ok());

        // Only lowercase literals parse
        assert!(EnvManager::validate_env_var("ENABLE_COLOR", "TRUE").is_err());
        assert!(EnvManager::validate_env_var("ENABLE_COLOR", "yes").is_err());
        assert!(EnvManager::validate_env_var("ENABLE_COLOR", "1").is_err());
    }

    #[test]
    fn test_env_var_negative_numbers() {
        assert!(EnvManager::validate_env_var("PING_COUNT", "-1").is_err());
        assert!(EnvManager::validate_env_var("CONCURRENCY", "-4").is_err());
    }
}

proptest! {
    #[test]
    fn test_any_timeout_in_range_validates(seconds in 1u64..=300) {
        let config = Config {
            dns_timeout_seconds: seconds,
            tcp_timeout_seconds: seconds,
            https_timeout_seconds: seconds,
            quic_timeout_seconds: seconds,
            ..Default::default()
        };
        prop_assert!(config.validate().is_ok());
    }

    #[test]
    fn test_timeout_env_validation_matches_range(seconds in 0u64..1000) {
        let result = EnvManager::validate_env_var("TCP_TIMEOUT_SECONDS", &seconds.to_string());
        prop_assert_eq!(result.is_ok(), (1..=300).contains(&seconds));
    }
}
