//! External command abstraction for ping, curl and the speedtest CLI

use crate::error::{AppError, Result};
use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// Captured result of one external command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// Process exit code, `-1` when killed by a signal
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Runs an external program to completion under a timeout
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Spawn failures are [`AppError::Tooling`], timeouts [`AppError::Timeout`].
    /// A non-zero exit is not an error.
    async fn run(&self, program: &str, args: &[String], timeout: Duration) -> Result<CommandOutput>;
}

/// Production runner on `tokio::process`
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioCommandRunner;

#[async_trait]
impl CommandRunner for TokioCommandRunner {
    async fn run(&self, program: &str, args: &[String], timeout: Duration) -> Result<CommandOutput> {
        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => AppError::tooling(format!("{} is not installed", program)),
                _ => AppError::tooling(format!("failed to start {}: {}", program, e)),
            })?;

        // Dropping the wait future on timeout kills the child
        let output = tokio::time::timeout(timeout, child.wait_with_output())
            .await
            .map_err(|_| {
                AppError::timeout(format!(
                    "{} did not finish within {}s",
                    program,
                    timeout.as_secs_f64()
                ))
            })?
            .map_err(|e| AppError::tooling(format!("failed to collect output of {}: {}", program, e)))?;

        Ok(CommandOutput {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Build an owned argument list from string slices
pub fn args(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|s| s.to_string()).collect()
}
