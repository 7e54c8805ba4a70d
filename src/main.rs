//! Network Readiness Probe - Main CLI Application
//!
//! Runs one readiness job against the configured targets and prints a report
//! or the JSON result envelope.

use clap::Parser;
use network_readiness_probe::{
    cli::Cli,
    config::{load_config, EnvManager, TargetLoader},
    error::{AppError, ErrorReporter, Result},
    job::{JobController, JsonHistorySink},
    models::Config,
    output::{OutputCoordinator, OutputFormatterFactory},
    probes::{datagram, NetworkProbes, ProbeSuite},
    PKG_NAME, VERSION,
};
use serde_json::json;
use std::io::{IsTerminal, Write};
use std::process;
use std::sync::Arc;
use std::time::Duration;

/// Exit code for `--strict` runs with at least one FAIL
const STRICT_FAILURE_EXIT_CODE: i32 = 6;

const PROGRESS_INTERVAL: Duration = Duration::from_millis(250);

#[tokio::main]
async fn main() {
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("Application panic: {}", panic_info);
        process::exit(99);
    }));

    let cli = Cli::parse();

    if let Err(message) = cli.validate() {
        eprintln!("Error: {}", message);
        process::exit(1);
    }

    let reporter = ErrorReporter::new(cli.use_colors(), cli.verbose || cli.debug);

    match run_application(cli).await {
        Ok(code) => process::exit(code),
        Err(e) => {
            reporter.report_error(&e);
            print_error_suggestions(&e);
            process::exit(e.exit_code());
        }
    }
}

/// Main application logic; returns the process exit code
async fn run_application(cli: Cli) -> Result<i32> {
    if cli.print_default_targets {
        println!("{}", TargetLoader::default_targets_json()?);
        return Ok(0);
    }

    if cli.env_help {
        print!("{}", EnvManager::display_env_help());
        return Ok(0);
    }

    if let Some(path) = &cli.write_env_example {
        EnvManager::save_example_env_file(path)?;
        println!("Wrote example configuration to {}", path.display());
        return Ok(0);
    }

    if cli.debug {
        eprintln!(
            "{} v{} ({}, built {}, {})",
            PKG_NAME,
            VERSION,
            env!("GIT_COMMIT"),
            env!("BUILD_TIME"),
            env!("TARGET_TRIPLE")
        );
    }

    let json_output = cli.json;
    let strict = cli.strict;
    let history_dir = cli.history_dir.clone();
    let history_keep = cli.history_keep;

    let config = load_config(cli)?;
    let targets = TargetLoader::load(&config)?;

    if config.verbose {
        eprintln!(
            "Probing {} targets ({:?})",
            targets.step_count(),
            config.execution_mode()
        );
    }

    let probes: Arc<dyn ProbeSuite> = Arc::new(NetworkProbes::new(&config)?);
    let mut controller = JobController::new(probes, &config);
    let history = history_dir
        .map(|dir| Arc::new(JsonHistorySink::new(dir, config.site_label.clone()).with_retention(history_keep)));
    if let Some(sink) = &history {
        controller = controller.with_sink(Arc::clone(sink) as _);
    }

    let coordinator = OutputCoordinator::new(OutputFormatterFactory::create_formatter(
        config.enable_color,
        config.verbose,
    ));
    let show_progress = !json_output && std::io::stderr().is_terminal();
    let stream_results = config.verbose && !json_output;
    let clear_line = if show_progress { "\r\x1b[2K" } else { "" };

    let job_id = controller.start(targets, Some(run_metadata(&config).await)).await?;

    let mut ticker = tokio::time::interval(PROGRESS_INTERVAL);
    let wait = controller.wait(&job_id);
    tokio::pin!(wait);
    let mut reported = 0;

    let finished = loop {
        tokio::select! {
            status = &mut wait => break status,
            _ = ticker.tick() => {
                if !show_progress && !stream_results {
                    continue;
                }
                if let Some(status) = controller.status(&job_id).await {
                    if stream_results {
                        for (category, result) in status.results.iter().skip(reported) {
                            eprintln!("{}{}", clear_line, coordinator.display_probe_result(category, result)?);
                        }
                        reported = status.completed_steps;
                    }
                    if show_progress {
                        eprint!("{}{}", clear_line, coordinator.display_progress(&status)?);
                        let _ = std::io::stderr().flush();
                    }
                }
            }
        }
    };
    eprint!("{}", clear_line);

    let finished = finished.ok_or_else(|| AppError::internal(format!("Job {} disappeared before finishing", job_id)))?;

    if stream_results {
        for (category, result) in finished.results.iter().skip(reported) {
            eprintln!("{}", coordinator.display_probe_result(category, result)?);
        }
    }

    if json_output {
        println!("{}", coordinator.display_json(&finished.results)?);
    } else {
        println!("{}", coordinator.display_report(&finished.results)?);
    }

    if let (Some(sink), false) = (&history, json_output) {
        let saved = sink
            .index()
            .await
            .map(|index| index.iter().any(|entry| entry.job_id == job_id))
            .unwrap_or(false);
        if saved {
            eprintln!(
                "{}",
                coordinator.display_success(&format!("History saved to {}", sink.directory().display()))?
            );
        } else {
            eprintln!(
                "{}",
                coordinator.display_warning(&format!("History was not written to {}", sink.directory().display()))?
            );
        }
    }

    let summary = finished.results.summary();
    if strict && summary.failed > 0 {
        if !json_output {
            eprintln!(
                "{}",
                coordinator.display_error(&format!("{} of {} checks failed", summary.failed, summary.total))?
            );
        }
        return Ok(STRICT_FAILURE_EXIT_CODE);
    }

    Ok(0)
}

/// Caller-side metadata attached to the envelope untouched
async fn run_metadata(config: &Config) -> serde_json::Value {
    json!({
        "site_label": config.site_label,
        "hostname": hostname(),
        "private_ip": datagram::private_ip().await.map(|ip| ip.to_string()),
        "started_at": chrono::Utc::now().to_rfc3339(),
        "version": VERSION,
        "commit": env!("GIT_COMMIT"),
    })
}

fn hostname() -> Option<String> {
    std::env::var("HOSTNAME")
        .ok()
        .or_else(|| std::fs::read_to_string("/etc/hostname").ok())
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
}

/// Print helpful suggestions for common errors
fn print_error_suggestions(error: &AppError) {
    match error {
        AppError::Config(_) | AppError::Validation(_) => {
            eprintln!();
            eprintln!("Configuration help:");
            eprintln!("  - Check your .env file format");
            eprintln!("  - Run with --print-default-targets to see a valid targets file");
            eprintln!("  - Port ranges must satisfy start <= end and ports must be non-zero");
            eprintln!("  - SPEEDTEST_ENDPOINT must start with http:// or https://");
        }
        AppError::Io(_) => {
            eprintln!();
            eprintln!("File help:");
            eprintln!("  - Check that --history-dir is writable");
        }
        _ => {}
    }
}
