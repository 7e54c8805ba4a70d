//! Structured logging for the readiness prober
//!
//! This module provides:
//! - Structured logging with levels, correlation IDs and fields
//! - Console, JSON and compact output formats
//! - A probe logger for results and fallback stages
//! - A run logger for job lifecycle events
//!
//! Every entry goes to stderr; stdout is reserved for reports.

use crate::error::{AppError, Result};
use crate::models::{Config, ProbeResult, RunSummary};
use crate::types::{Category, Status};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

/// Log level enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LogLevel {
    /// Trace level - most detailed
    Trace = 0,
    /// Debug level - detailed information for debugging
    Debug = 1,
    /// Info level - general application information
    Info = 2,
    /// Warning level - potentially harmful situations
    Warn = 3,
    /// Error level - error events but application can continue
    Error = 4,
}

impl LogLevel {
    /// Get log level name as string
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "TRACE",
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
        }
    }

    /// Get ANSI color code for console output
    pub fn color_code(&self) -> &'static str {
        match self {
            LogLevel::Trace => "\x1b[37m", // White
            LogLevel::Debug => "\x1b[36m", // Cyan
            LogLevel::Info => "\x1b[32m",  // Green
            LogLevel::Warn => "\x1b[33m",  // Yellow
            LogLevel::Error => "\x1b[31m", // Red
        }
    }

    /// Reset ANSI color code
    pub fn reset_code() -> &'static str {
        "\x1b[0m"
    }
}

impl std::str::FromStr for LogLevel {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_uppercase().as_str() {
            "TRACE" => Ok(LogLevel::Trace),
            "DEBUG" => Ok(LogLevel::Debug),
            "INFO" => Ok(LogLevel::Info),
            "WARN" | "WARNING" => Ok(LogLevel::Warn),
            "ERROR" => Ok(LogLevel::Error),
            _ => Err(AppError::parse(format!("Invalid log level: {}", s))),
        }
    }
}

/// Log entry structure for structured logging
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    /// Timestamp when log entry was created
    pub timestamp: DateTime<Utc>,
    /// Log level
    pub level: LogLevel,
    /// Log message
    pub message: String,
    /// Logger name/component
    pub logger: String,
    /// Correlation ID for tracking related events
    pub correlation_id: Option<String>,
    /// Additional structured fields
    pub fields: HashMap<String, serde_json::Value>,
}

/// Log output format options
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LogFormat {
    /// Human-readable console format
    Console,
    /// JSON format for structured logging
    Json,
    /// Compact single-line format
    Compact,
}

/// Logger implementation with multiple output formats
pub struct Logger {
    min_level: LogLevel,
    use_color: bool,
    format: LogFormat,
    name: String,
}

impl Logger {
    /// Create a new logger
    pub fn new(name: String) -> Self {
        Self {
            min_level: LogLevel::Info,
            use_color: true,
            format: LogFormat::Console,
            name,
        }
    }

    /// Create a logger with specific configuration
    pub fn with_config(name: String, config: &Config) -> Self {
        let min_level = if config.debug {
            LogLevel::Debug
        } else if config.verbose {
            LogLevel::Info
        } else {
            LogLevel::Warn
        };

        Self {
            min_level,
            use_color: config.enable_color,
            format: if config.debug { LogFormat::Json } else { LogFormat::Console },
            name,
        }
    }

    /// Create a log entry builder
    pub fn log(&self, level: LogLevel, message: &str) -> LogEntryBuilder {
        LogEntryBuilder::new(self, level, message.to_string())
    }

    pub fn debug(&self, message: &str) -> LogEntryBuilder {
        self.log(LogLevel::Debug, message)
    }

    pub fn info(&self, message: &str) -> LogEntryBuilder {
        self.log(LogLevel::Info, message)
    }

    pub fn warn(&self, message: &str) -> LogEntryBuilder {
        self.log(LogLevel::Warn, message)
    }

    pub fn error(&self, message: &str) -> LogEntryBuilder {
        self.log(LogLevel::Error, message)
    }

    /// Check if a log level would be output
    pub fn would_log(&self, level: LogLevel) -> bool {
        level >= self.min_level
    }

    async fn write_entry(&self, entry: LogEntry) {
        if !self.would_log(entry.level) {
            return;
        }

        let mut line = self.render(&entry);
        line.push('\n');
        let mut stderr = tokio::io::stderr();
        let _ = stderr.write_all(line.as_bytes()).await;
        let _ = stderr.flush().await;
    }

    fn render(&self, entry: &LogEntry) -> String {
        match self.format {
            LogFormat::Console => self.format_console(entry),
            LogFormat::Json => self.format_json(entry),
            LogFormat::Compact => self.format_compact(entry),
        }
    }

    fn format_console(&self, entry: &LogEntry) -> String {
        let timestamp = entry.timestamp.format("%Y-%m-%d %H:%M:%S%.3f");
        let level_str = entry.level.as_str();

        let formatted_level = if self.use_color {
            format!("{}{:>5}{}", entry.level.color_code(), level_str, LogLevel::reset_code())
        } else {
            format!("{:>5}", level_str)
        };

        let mut output = format!("{} {} [{}] {}", timestamp, formatted_level, entry.logger, entry.message);

        if let Some(correlation_id) = &entry.correlation_id {
            let short: String = correlation_id.chars().take(8).collect();
            output.push_str(&format!(" [{}]", short));
        }

        if !entry.fields.is_empty() {
            let mut fields: Vec<String> = entry.fields.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
            fields.sort();
            output.push_str(&format!(" {{{}}}", fields.join(", ")));
        }

        output
    }

    fn format_json(&self, entry: &LogEntry) -> String {
        match serde_json::to_string(entry) {
            Ok(json) => json,
            Err(_) => format!(
                "{{\"error\": \"Failed to serialize log entry\", \"message\": {:?}}}",
                entry.message
            ),
        }
    }

    fn format_compact(&self, entry: &LogEntry) -> String {
        let timestamp = entry.timestamp.format("%H:%M:%S");
        format!(
            "{} {} {}: {}",
            timestamp,
            entry.level.as_str().chars().next().unwrap_or('?'),
            entry.logger,
            entry.message
        )
    }
}

/// Builder pattern for creating log entries
pub struct LogEntryBuilder<'a> {
    logger: &'a Logger,
    entry: LogEntry,
}

impl<'a> LogEntryBuilder<'a> {
    fn new(logger: &'a Logger, level: LogLevel, message: String) -> Self {
        Self {
            logger,
            entry: LogEntry {
                timestamp: Utc::now(),
                level,
                message,
                logger: logger.name.clone(),
                correlation_id: None,
                fields: HashMap::new(),
            },
        }
    }

    /// Add a correlation ID
    pub fn correlation_id(mut self, id: &str) -> Self {
        self.entry.correlation_id = Some(id.to_string());
        self
    }

    /// Add a structured field
    pub fn field<T: Serialize>(mut self, key: &str, value: T) -> Self {
        if let Ok(json_value) = serde_json::to_value(value) {
            self.entry.fields.insert(key.to_string(), json_value);
        }
        self
    }

    /// Add probe outcome fields
    pub fn probe(self, category: Category, result: &ProbeResult) -> Self {
        let builder = self
            .field("category", category.key())
            .field("target", &result.target)
            .field("status", result.status.as_str());
        let builder = match result.latency_ms {
            Some(latency) => builder.field("latency_ms", latency),
            None => builder,
        };
        match &result.error {
            Some(error) => builder.field("error", error),
            None => builder,
        }
    }

    /// Add error information
    pub fn error_info(self, error: &AppError) -> Self {
        self.field("error_category", error.category())
            .field("error_recoverable", error.is_recoverable())
    }

    /// Finalize and write the log entry
    pub async fn log(self) {
        self.logger.write_entry(self.entry).await;
    }
}

/// Logger for individual probes and their fallback stages
pub struct ProbeLogger {
    logger: Logger,
}

impl ProbeLogger {
    pub fn new(config: &Config) -> Self {
        Self {
            logger: Logger::with_config("PROBE".to_string(), config),
        }
    }

    /// Failures at warn level, everything else at debug
    pub async fn log_result(&self, category: Category, result: &ProbeResult) {
        let level = match result.status {
            Status::Fail => LogLevel::Warn,
            Status::Warn => LogLevel::Info,
            Status::Pass => LogLevel::Debug,
        };
        let message = format!("{} {} -> {}", category.key(), result.display_name(), result.status);

        self.logger.log(level, &message).probe(category, result).log().await;
    }

    /// A fallback stage finished without a verdict
    pub async fn log_stage(&self, target: &str, stage: &str, outcome: &str) {
        self.logger
            .debug(&format!("{} stage {} was {}", target, stage, outcome))
            .field("target", target)
            .field("stage", stage)
            .field("outcome", outcome)
            .log()
            .await;
    }

    /// A provider was unusable and the next one is tried
    pub async fn log_fallback(&self, provider: &str, error: &AppError) {
        self.logger
            .info(&format!("{} unavailable, falling back: {}", provider, error))
            .field("provider", provider)
            .error_info(error)
            .log()
            .await;
    }
}

/// Logger for job lifecycle events
pub struct RunLogger {
    logger: Logger,
}

impl RunLogger {
    pub fn new(config: &Config) -> Self {
        Self {
            logger: Logger::with_config("RUN".to_string(), config),
        }
    }

    /// Returns the correlation ID used for the rest of the run
    pub async fn run_started(&self, job_id: &str, total_steps: usize) -> String {
        let correlation_id = Uuid::new_v4().to_string();
        self.logger
            .info(&format!("Run {} started with {} steps", job_id, total_steps))
            .correlation_id(&correlation_id)
            .field("job_id", job_id)
            .field("total_steps", total_steps)
            .log()
            .await;
        correlation_id
    }

    pub async fn step_completed(&self, correlation_id: &str, completed: usize, total: usize, category: Category, result: &ProbeResult) {
        self.logger
            .debug(&format!("Step {}/{} done", completed, total))
            .correlation_id(correlation_id)
            .field("completed", completed)
            .field("total", total)
            .probe(category, result)
            .log()
            .await;
    }

    pub async fn run_finished(&self, correlation_id: &str, job_id: &str, summary: &RunSummary, elapsed: Duration) {
        let level = if summary.failed > 0 { LogLevel::Warn } else { LogLevel::Info };
        self.logger
            .log(
                level,
                &format!(
                    "Run {} finished in {:.1}s: {} passed, {} warnings, {} failed",
                    job_id,
                    elapsed.as_secs_f64(),
                    summary.passed,
                    summary.warnings,
                    summary.failed
                ),
            )
            .correlation_id(correlation_id)
            .field("job_id", job_id)
            .field("duration_ms", elapsed.as_millis() as u64)
            .field("summary", summary)
            .log()
            .await;
    }

    pub async fn sink_failed(&self, correlation_id: &str, sink: &str, error: &AppError) {
        self.logger
            .error(&format!("Completion sink {} failed: {}", sink, error))
            .correlation_id(correlation_id)
            .field("sink", sink)
            .error_info(error)
            .log()
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ProbeDetail;
    use std::str::FromStr;

    fn entry(level: LogLevel) -> LogEntry {
        LogEntry {
            timestamp: Utc::now(),
            level,
            message: "Test message".to_string(),
            logger: "TEST".to_string(),
            correlation_id: Some("0123456789abcdef".to_string()),
            fields: {
                let mut map = HashMap::new();
                map.insert("key".to_string(), serde_json::Value::String("value".to_string()));
                map
            },
        }
    }

    #[test]
    fn test_log_level_parsing() {
        assert_eq!(LogLevel::from_str("DEBUG").unwrap(), LogLevel::Debug);
        assert_eq!(LogLevel::from_str("info").unwrap(), LogLevel::Info);
        assert_eq!(LogLevel::from_str("warning").unwrap(), LogLevel::Warn);
        assert!(LogLevel::from_str("invalid").is_err());
    }

    #[test]
    fn test_log_level_ordering() {
        assert!(LogLevel::Trace < LogLevel::Debug);
        assert!(LogLevel::Debug < LogLevel::Info);
        assert!(LogLevel::Info < LogLevel::Warn);
        assert!(LogLevel::Warn < LogLevel::Error);
    }

    #[test]
    fn test_logger_with_config() {
        let config = Config {
            debug: true,
            enable_color: false,
            ..Default::default()
        };
        let logger = Logger::with_config("TEST".to_string(), &config);
        assert_eq!(logger.min_level, LogLevel::Debug);
        assert_eq!(logger.format, LogFormat::Json);
        assert!(!logger.use_color);

        let quiet = Logger::with_config("TEST".to_string(), &Config::default());
        assert_eq!(quiet.min_level, LogLevel::Warn);
        assert!(!quiet.would_log(LogLevel::Info));
        assert!(quiet.would_log(LogLevel::Error));

        let verbose = Logger::with_config("TEST".to_string(), &Config { verbose: true, ..Default::default() });
        assert_eq!(verbose.min_level, LogLevel::Info);
    }

    #[test]
    fn test_log_formats() {
        let mut logger = Logger::new("TEST".to_string());
        logger.use_color = false;
        let entry = entry(LogLevel::Info);

        let console = logger.format_console(&entry);
        assert!(console.contains(" INFO [TEST] Test message [01234567]"));
        assert!(console.contains("key=\"value\""));

        let json: serde_json::Value = serde_json::from_str(&logger.format_json(&entry)).unwrap();
        assert_eq!(json["level"], "Info");
        assert_eq!(json["fields"]["key"], "value");

        logger.format = LogFormat::Compact;
        let compact = logger.render(&entry);
        assert!(compact.contains(" I TEST: Test message"));
    }

    #[test]
    fn test_probe_fields() {
        let logger = Logger::new("TEST".to_string());
        let result = ProbeResult::fail("example.com", ProbeDetail::Dns { ip: None }, "NXDOMAIN");
        let builder = logger.warn("probe").probe(Category::Dns, &result);

        assert_eq!(builder.entry.fields["category"], "dns");
        assert_eq!(builder.entry.fields["status"], "FAIL");
        assert_eq!(builder.entry.fields["error"], "NXDOMAIN");
        assert!(!builder.entry.fields.contains_key("latency_ms"));
    }

    #[tokio::test]
    async fn test_specialized_loggers() {
        let config = Config::default();
        let probe_logger = ProbeLogger::new(&config);
        assert_eq!(probe_logger.logger.name, "PROBE");
        let result = ProbeResult::pass("8.8.8.8", ProbeDetail::Dns { ip: Some("8.8.8.8".to_string()) });
        probe_logger.log_result(Category::Dns, &result).await;
        probe_logger.log_stage("example.com:443", "http3", "inconclusive").await;

        let run_logger = RunLogger::new(&config);
        assert_eq!(run_logger.logger.name, "RUN");
        let correlation_id = run_logger.run_started("job-test", 3).await;
        assert_eq!(correlation_id.len(), 36);
        run_logger
            .run_finished(&correlation_id, "job-test", &RunSummary::default(), Duration::from_millis(5))
            .await;
    }
}
