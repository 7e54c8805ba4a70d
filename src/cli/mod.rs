//! Command-line interface

use crate::defaults::DEFAULT_HISTORY_RETENTION;
use clap::Parser;
use std::path::PathBuf;

/// Network Readiness Probe - checks whether a site's network can support a deployment
#[derive(Parser, Debug, Clone)]
#[command(name = "nrp")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// JSON file with the targets to probe (built-in targets when omitted)
    #[arg(short, long, value_name = "FILE")]
    pub targets: Option<String>,

    /// Print the result envelope as JSON instead of a report
    #[arg(long)]
    pub json: bool,

    /// Write a history file for the run into this directory
    #[arg(long, value_name = "DIR")]
    pub history_dir: Option<PathBuf>,

    /// Runs kept in the history directory; older ones are pruned
    #[arg(long, value_name = "N", default_value_t = DEFAULT_HISTORY_RETENTION, requires = "history_dir")]
    pub history_keep: usize,

    /// Site label recorded in the run metadata and history file name
    #[arg(long, value_name = "LABEL")]
    pub site_label: Option<String>,

    /// Print the built-in target list as JSON and exit
    #[arg(long)]
    pub print_default_targets: bool,

    /// Describe the supported environment variables and exit
    #[arg(long)]
    pub env_help: bool,

    /// Write a commented example .env file and exit
    #[arg(long, value_name = "FILE")]
    pub write_env_example: Option<PathBuf>,

    /// Exit with a non-zero status when any probe fails
    #[arg(long)]
    pub strict: bool,

    /// Probes in flight per category (0 or 1 runs sequentially)
    #[arg(short, long, value_name = "N", conflicts_with = "auto_concurrency")]
    pub concurrency: Option<usize>,

    /// Size per-category concurrency from the host's core count
    #[arg(long)]
    pub auto_concurrency: bool,

    /// Echo requests per ping target
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u32).range(1..=20))]
    pub ping_count: Option<u32>,

    /// Fixed seed for UDP port sampling
    #[arg(long, value_name = "SEED")]
    pub udp_seed: Option<u64>,

    /// Skip the Ookla CLI and measure bandwidth over HTTP only
    #[arg(long)]
    pub no_ookla: bool,

    /// Base URL of the HTTP speed test endpoint
    #[arg(long, value_name = "URL")]
    pub speedtest_endpoint: Option<String>,

    /// Download+upload rounds of the HTTP speed test
    #[arg(long, value_name = "N")]
    pub speedtest_rounds: Option<u32>,

    /// Force colored output
    #[arg(long)]
    pub color: bool,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Enable debug output
    #[arg(long)]
    pub debug: bool,
}

impl Cli {
    /// Validate CLI arguments for conflicts
    pub fn validate(&self) -> Result<(), String> {
        if self.color && self.no_color {
            return Err("Cannot specify both --color and --no-color".to_string());
        }

        if let Some(label) = &self.site_label {
            if label.trim().is_empty() {
                return Err("--site-label cannot be empty".to_string());
            }
        }

        if let Some(targets) = &self.targets {
            if targets.trim().is_empty() {
                return Err("--targets cannot be empty".to_string());
            }
        }

        Ok(())
    }

    /// Check if colors should be enabled
    pub fn use_colors(&self) -> bool {
        if self.color {
            true
        } else if self.no_color {
            false
        } else {
            supports_color()
        }
    }
}

/// Check if the terminal supports color output
fn supports_color() -> bool {
    if let Ok(term) = std::env::var("TERM") {
        if term == "dumb" {
            return false;
        }
    }

    if std::env::var("NO_COLOR").is_ok() {
        return false;
    }

    if std::env::var("FORCE_COLOR").is_ok() {
        return true;
    }

    #[cfg(target_os = "windows")]
    {
        if std::env::var("ANSICON").is_ok() || std::env::var("ConEmuANSI").is_ok() {
            return true;
        }
    }

    #[cfg(unix)]
    {
        true
    }
    #[cfg(not(unix))]
    {
        false
    }
}
