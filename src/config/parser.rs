//! Configuration parsing from CLI arguments and environment variables

use crate::{cli::Cli, config::env::EnvManager, error::Result, models::Config, types::ExecutionMode};

/// Configuration parser that combines CLI arguments with environment variables
pub struct ConfigParser {
    cli: Cli,
}

impl ConfigParser {
    /// Create a new configuration parser with CLI arguments
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Defaults, then `.env`, then the environment, then the command line
    pub fn parse(&self) -> Result<Config> {
        let mut config = Config::default();

        EnvManager::load_env_file(self.cli.debug)?;
        config.merge_from_env()?;
        self.apply_cli_overrides(&mut config);
        config.validate()?;

        Ok(config)
    }

    /// Apply CLI argument overrides to configuration
    fn apply_cli_overrides(&self, config: &mut Config) {
        let cli = &self.cli;

        if let Some(path) = &cli.targets {
            config.targets_file = Some(path.trim().to_string());
        }
        if let Some(concurrency) = cli.concurrency {
            config.concurrency = concurrency;
        } else if cli.auto_concurrency {
            config.concurrency = ExecutionMode::auto_concurrency();
        }
        if let Some(count) = cli.ping_count {
            config.ping_count = count;
        }
        if let Some(seed) = cli.udp_seed {
            config.udp_seed = Some(seed);
        }
        if cli.no_ookla {
            config.use_ookla = false;
        }
        if let Some(endpoint) = &cli.speedtest_endpoint {
            config.speedtest_endpoint = endpoint.trim().trim_end_matches('/').to_string();
        }
        if let Some(rounds) = cli.speedtest_rounds {
            config.speedtest_rounds = rounds;
        }
        if let Some(label) = &cli.site_label {
            config.site_label = Some(label.trim().to_string());
        }

        if cli.color {
            config.enable_color = true;
        } else if cli.no_color || !cli.use_colors() {
            config.enable_color = false;
        }

        // CLI-only
        config.verbose = cli.verbose || cli.debug;
        config.debug = cli.debug;

        if config.debug {
            eprintln!("Applied CLI overrides to configuration");
            eprintln!("{}", display_config_summary(config));
        }
    }
}

/// Convenience function to load complete configuration from CLI arguments
pub fn load_config(cli: Cli) -> Result<Config> {
    ConfigParser::new(cli).parse()
}

/// Display configuration summary for debug purposes
pub fn display_config_summary(config: &Config) -> String {
    let mut summary = Vec::new();

    summary.push(format!(
        "Targets: {}",
        config.targets_file.as_deref().unwrap_or("built-in defaults")
    ));
    summary.push(format!(
        "Timeouts: dns={}s tcp={}s https={}s quic={}s ntp={}s",
        config.dns_timeout_seconds,
        config.tcp_timeout_seconds,
        config.https_timeout_seconds,
        config.quic_timeout_seconds,
        config.ntp_timeout_seconds
    ));
    summary.push(format!("UDP wait: {}ms", config.udp_wait_ms));
    summary.push(format!("Ping count: {}", config.ping_count));
    summary.push(format!(
        "Speedtest: ookla={} endpoint={} rounds={}",
        config.use_ookla, config.speedtest_endpoint, config.speedtest_rounds
    ));
    summary.push(format!("Execution: {:?}", config.execution_mode()));
    if let Some(label) = &config.site_label {
        summary.push(format!("Site: {}", label));
    }
    summary.push(format!("Color Output: {}", config.enable_color));
    summary.push(format!("Verbose: {}", config.verbose));
    summary.push(format!("Debug: {}", config.debug));

    summary.join("\n")
}
