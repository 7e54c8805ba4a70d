//! Output formatting and display system
//!
//! This module renders run results as colored or plain text tables, or as the
//! JSON result envelope.

mod colored;
mod formatter;

pub use colored::{ColorScheme, ColoredFormatter, LatencyLevel};
pub use formatter::{
    describe_result, format_latency, Alignment, Column, FormattingOptions, OutputFormatter, PlainFormatter, RowData,
    TableFormat,
};

use crate::{
    error::Result,
    job::JobStatus,
    models::{ProbeResult, ResultEnvelope},
    types::Category,
};

/// Output formatting factory for creating appropriate formatters
pub struct OutputFormatterFactory;

impl OutputFormatterFactory {
    /// Create a formatter based on color support and preferences
    pub fn create_formatter(enable_color: bool, verbose: bool) -> Box<dyn OutputFormatter> {
        let options = FormattingOptions {
            enable_color,
            verbose_mode: verbose,
            table_borders: true,
            max_width: 120,
        };

        if enable_color {
            Box::new(ColoredFormatter::new(options))
        } else {
            Box::new(PlainFormatter::new(options))
        }
    }
}

/// Main output coordinator that handles all result display
pub struct OutputCoordinator {
    formatter: Box<dyn OutputFormatter>,
}

impl OutputCoordinator {
    /// Create a new output coordinator with the specified formatter
    pub fn new(formatter: Box<dyn OutputFormatter>) -> Self {
        Self { formatter }
    }

    /// Human-readable report of a finished run
    pub fn display_report(&self, envelope: &ResultEnvelope) -> Result<String> {
        self.formatter.format_report(envelope)
    }

    /// The result envelope as pretty JSON
    pub fn display_json(&self, envelope: &ResultEnvelope) -> Result<String> {
        Ok(serde_json::to_string_pretty(envelope)?)
    }

    /// Progress line for a running job
    pub fn display_progress(&self, status: &JobStatus) -> Result<String> {
        self.formatter.format_progress(status)
    }

    /// One line for a result as it completes
    pub fn display_probe_result(&self, category: Category, result: &ProbeResult) -> Result<String> {
        self.formatter.format_probe_result(category, result)
    }

    pub fn display_error(&self, message: &str) -> Result<String> {
        self.formatter.format_error(message)
    }

    pub fn display_warning(&self, message: &str) -> Result<String> {
        self.formatter.format_warning(message)
    }

    pub fn display_success(&self, message: &str) -> Result<String> {
        self.formatter.format_success(message)
    }
}
