//! Core formatting traits and implementations
//!
//! This module defines the output formatting interface and provides
//! a plain text implementation with table formatting capabilities.

use crate::{
    error::{AppError, Result},
    job::JobStatus,
    models::{ProbeDetail, ProbeResult, ResultEnvelope, RunSummary},
    types::Category,
};
use std::fmt::Write as _;

/// Main trait for output formatting
pub trait OutputFormatter: Send + Sync {
    /// Format a header section
    fn format_header(&self, title: &str) -> Result<String>;

    /// Format the results of one category as a table
    fn format_category(&self, category: Category, results: &[ProbeResult]) -> Result<String>;

    /// Format PASS/WARN/FAIL tallies and the overall verdict
    fn format_summary(&self, summary: &RunSummary) -> Result<String>;

    /// Format a one-line progress update for a running job
    fn format_progress(&self, status: &JobStatus) -> Result<String>;

    /// Format individual probe result
    fn format_probe_result(&self, category: Category, result: &ProbeResult) -> Result<String>;

    /// Format error messages
    fn format_error(&self, error: &str) -> Result<String>;

    /// Format warning messages
    fn format_warning(&self, warning: &str) -> Result<String>;

    /// Format success messages
    fn format_success(&self, message: &str) -> Result<String>;

    /// Full report: every non-empty category in run order, then the summary
    fn format_report(&self, envelope: &ResultEnvelope) -> Result<String> {
        let mut output = String::new();

        output.push_str(&self.format_header("Network Readiness Report")?);
        output.push_str("\n\n");

        for category in Category::ORDER {
            let results = envelope.category(category);
            if results.is_empty() {
                continue;
            }
            output.push_str(&self.format_category(category, results)?);
            output.push_str("\n\n");
        }

        output.push_str(&self.format_summary(&envelope.summary())?);
        Ok(output)
    }
}

/// Configuration options for formatting
#[derive(Debug, Clone)]
pub struct FormattingOptions {
    /// Enable colored output
    pub enable_color: bool,
    /// Show full error text and ping output instead of a truncated details column
    pub verbose_mode: bool,
    /// Show table borders
    pub table_borders: bool,
    /// Maximum output width
    pub max_width: usize,
}

impl Default for FormattingOptions {
    fn default() -> Self {
        Self {
            enable_color: true,
            verbose_mode: false,
            table_borders: true,
            max_width: 120,
        }
    }
}

impl FormattingOptions {
    /// Width left for the details column once the fixed columns are laid out
    pub fn details_width(&self) -> usize {
        if self.verbose_mode {
            usize::MAX
        } else {
            self.max_width.saturating_sub(STATUS_WIDTH + TARGET_MAX_WIDTH + LATENCY_WIDTH + 13).max(20)
        }
    }
}

const STATUS_WIDTH: usize = 6;
const TARGET_MAX_WIDTH: usize = 40;
const LATENCY_WIDTH: usize = 9;

/// Table formatting configuration
#[derive(Debug, Clone)]
pub struct TableFormat {
    /// Column definitions
    pub columns: Vec<Column>,
    /// Show borders around table
    pub show_borders: bool,
    /// Show header row
    pub show_header: bool,
}

/// Column definition for table formatting
#[derive(Debug, Clone)]
pub struct Column {
    /// Column header
    pub header: String,
    /// Column alignment
    pub alignment: Alignment,
    /// Minimum width
    pub min_width: usize,
    /// Maximum width
    pub max_width: usize,
}

impl Column {
    fn new(header: &str, alignment: Alignment, min_width: usize, max_width: usize) -> Self {
        Self {
            header: header.to_string(),
            alignment,
            min_width,
            max_width,
        }
    }
}

/// Text alignment options
#[derive(Debug, Clone)]
pub enum Alignment {
    Left,
    Right,
}

/// Row data for table formatting
pub type RowData = Vec<String>;

/// The Status / Target / Latency / Details layout every category shares
pub fn result_table_format(options: &FormattingOptions) -> TableFormat {
    TableFormat {
        columns: vec![
            Column::new("Status", Alignment::Left, STATUS_WIDTH, STATUS_WIDTH),
            Column::new("Target", Alignment::Left, 12, TARGET_MAX_WIDTH),
            Column::new("Latency", Alignment::Right, LATENCY_WIDTH, LATENCY_WIDTH),
            Column::new("Details", Alignment::Left, 7, options.details_width()),
        ],
        show_borders: options.table_borders,
        show_header: true,
    }
}

/// Calculate column widths for the given rows, bounded per column
pub fn calculate_column_widths(format: &TableFormat, rows: &[RowData]) -> Vec<usize> {
    format
        .columns
        .iter()
        .enumerate()
        .map(|(idx, column)| {
            let content = rows
                .iter()
                .filter_map(|row| row.get(idx))
                .map(|cell| cell.chars().count())
                .max()
                .unwrap_or(0);
            content
                .max(column.min_width)
                .max(column.header.chars().count())
                .min(column.max_width)
        })
        .collect()
}

/// Pad or cut text to exactly `width` characters
pub fn align_text(text: &str, width: usize, alignment: &Alignment) -> String {
    let length = text.chars().count();
    if length > width {
        if width <= 3 {
            return text.chars().take(width).collect();
        }
        let cut: String = text.chars().take(width - 3).collect();
        return format!("{}...", cut);
    }

    let padding = width - length;
    match alignment {
        Alignment::Left => format!("{}{}", text, " ".repeat(padding)),
        Alignment::Right => format!("{}{}", " ".repeat(padding), text),
    }
}

/// `12ms`, `1.50s`, or `-` when nothing was timed
pub fn format_latency(latency_ms: Option<u64>) -> String {
    match latency_ms {
        None => "-".to_string(),
        Some(ms) if ms < 1000 => format!("{}ms", ms),
        Some(ms) => format!("{:.2}s", ms as f64 / 1000.0),
    }
}

/// Format percentage with appropriate precision
pub fn format_percentage(percentage: f64) -> String {
    if percentage >= 99.95 {
        "100.0%".to_string()
    } else if percentage < 0.05 {
        "0.0%".to_string()
    } else {
        format!("{:.1}%", percentage)
    }
}

/// Category-specific facts plus the error text, for the details column
pub fn describe_result(result: &ProbeResult, verbose: bool) -> String {
    let mut parts: Vec<String> = Vec::new();

    match &result.detail {
        ProbeDetail::Dns { ip } => {
            if let Some(ip) = ip {
                parts.push(ip.clone());
            }
        }
        ProbeDetail::Tcp { tls } => {
            if let Some(tls) = tls {
                parts.push(describe_tls(tls.version.as_deref(), tls.cert_valid));
            }
        }
        ProbeDetail::Https { http_status, tls } => {
            if let Some(code) = http_status {
                parts.push(format!("HTTP {}", code));
            }
            if let Some(tls) = tls {
                parts.push(describe_tls(tls.version.as_deref(), tls.cert_valid));
            }
        }
        ProbeDetail::Quic { protocol, note, response_bytes } => {
            parts.push(protocol.to_string());
            if let Some(bytes) = response_bytes {
                parts.push(format!("{} bytes", bytes));
            }
            if let Some(note) = note {
                parts.push(note.clone());
            }
        }
        ProbeDetail::UdpRange { sampled, accessible, note } => {
            parts.push(format!("{}/{} accessible", accessible, sampled));
            if verbose && !note.is_empty() {
                parts.push(note.clone());
            }
        }
        ProbeDetail::Ping { output } => {
            if verbose {
                if let Some(output) = output {
                    parts.push(output.lines().map(str::trim).collect::<Vec<_>>().join(" | "));
                }
            }
        }
        ProbeDetail::Ntp { offset_ms, stratum } => {
            if let Some(offset) = offset_ms {
                parts.push(format!("offset {:+}ms", offset));
            }
            if let Some(stratum) = stratum {
                parts.push(format!("stratum {}", stratum));
            }
        }
        ProbeDetail::Speedtest { source, download_mbps, upload_mbps, note, server, .. } => {
            if let (Some(down), Some(up)) = (download_mbps, upload_mbps) {
                parts.push(format!("down {:.1} Mbps, up {:.1} Mbps", down, up));
            }
            if let Some(source) = source {
                match server {
                    Some(server) => parts.push(format!("via {} ({})", source, server)),
                    None => parts.push(format!("via {}", source)),
                }
            }
            if let Some(note) = note {
                parts.push(note.clone());
            }
        }
    }

    if let Some(error) = &result.error {
        parts.push(error.clone());
    }

    parts.join(", ")
}

fn describe_tls(version: Option<&str>, cert_valid: bool) -> String {
    let validity = if cert_valid { "cert valid" } else { "cert invalid" };
    match version {
        Some(version) => format!("{} {}", version, validity),
        None => validity.to_string(),
    }
}

/// Cells of one table row, before any coloring
pub fn result_row(result: &ProbeResult, verbose: bool) -> RowData {
    vec![
        result.status.as_str().to_string(),
        result.display_name().to_string(),
        format_latency(result.latency_ms),
        describe_result(result, verbose),
    ]
}

pub(super) fn write_failed(e: std::fmt::Error) -> AppError {
    AppError::io(format!("Failed to format output: {}", e))
}

/// Plain text formatter implementation
pub struct PlainFormatter {
    options: FormattingOptions,
}

impl PlainFormatter {
    /// Create a new plain formatter with options
    pub fn new(options: FormattingOptions) -> Self {
        Self { options }
    }

    /// Create a table with the given format and data
    fn create_table(&self, format: &TableFormat, rows: &[RowData]) -> String {
        if rows.is_empty() {
            return String::new();
        }

        let widths = calculate_column_widths(format, rows);
        let mut output = String::new();

        if format.show_header {
            if format.show_borders {
                output.push_str(&self.create_horizontal_border(&widths));
                output.push('\n');
            }
            let headers: Vec<String> = format.columns.iter().map(|c| c.header.clone()).collect();
            output.push_str(&self.create_row(&headers, &widths, format));
            output.push('\n');
            if format.show_borders {
                output.push_str(&self.create_horizontal_border(&widths));
                output.push('\n');
            }
        }

        for row in rows {
            output.push_str(&self.create_row(row, &widths, format));
            output.push('\n');
        }

        if format.show_borders {
            output.push_str(&self.create_horizontal_border(&widths));
        }

        output.trim_end().to_string()
    }

    /// Create a table row
    fn create_row(&self, data: &[String], widths: &[usize], format: &TableFormat) -> String {
        let mut row = String::new();

        if format.show_borders {
            row.push('|');
        }

        for (idx, (cell, &width)) in data.iter().zip(widths.iter()).enumerate() {
            let alignment = format.columns.get(idx).map(|c| &c.alignment).unwrap_or(&Alignment::Left);
            let padded = align_text(cell, width, alignment);

            if format.show_borders {
                row.push(' ');
                row.push_str(&padded);
                row.push_str(" |");
            } else {
                row.push_str(&padded);
                row.push_str("  ");
            }
        }

        row.trim_end().to_string()
    }

    /// Create horizontal border for table
    fn create_horizontal_border(&self, widths: &[usize]) -> String {
        let mut border = String::from("+");
        for &width in widths {
            border.push_str(&"-".repeat(width + 2));
            border.push('+');
        }
        border
    }
}

impl OutputFormatter for PlainFormatter {
    fn format_header(&self, title: &str) -> Result<String> {
        let mut output = String::new();
        let border = "=".repeat(title.len() + 4);

        writeln!(output, "{}", border).map_err(write_failed)?;
        writeln!(output, "  {}  ", title).map_err(write_failed)?;
        write!(output, "{}", border).map_err(write_failed)?;

        Ok(output)
    }

    fn format_category(&self, category: Category, results: &[ProbeResult]) -> Result<String> {
        let mut output = String::new();
        let summary = RunSummary::from_results(results);

        writeln!(output, "{} ({}/{} passed)", category.title(), summary.passed, summary.total)
            .map_err(write_failed)?;
        writeln!(output, "{}", "-".repeat(category.title().len())).map_err(write_failed)?;

        let rows: Vec<RowData> = results.iter().map(|r| result_row(r, self.options.verbose_mode)).collect();
        output.push_str(&self.create_table(&result_table_format(&self.options), &rows));

        Ok(output)
    }

    fn format_summary(&self, summary: &RunSummary) -> Result<String> {
        let mut output = String::new();

        writeln!(output, "Summary:").map_err(write_failed)?;
        writeln!(output, "--------").map_err(write_failed)?;
        writeln!(output, "Total Checks:     {}", summary.total).map_err(write_failed)?;
        writeln!(output, "Passed:           {} ({})", summary.passed, format_percentage(summary.pass_rate()))
            .map_err(write_failed)?;
        writeln!(output, "Warnings:         {}", summary.warnings).map_err(write_failed)?;
        writeln!(output, "Failed:           {}", summary.failed).map_err(write_failed)?;
        write!(output, "Overall:          {}", summary.overall()).map_err(write_failed)?;

        Ok(output)
    }

    fn format_progress(&self, status: &JobStatus) -> Result<String> {
        let mut line = format!(
            "[{:>3}%] {}/{} checks",
            status.progress, status.completed_steps, status.total_steps
        );
        if let Some((category, last)) = status.results.iter().last() {
            write!(line, " | {} {} {}", category, last.display_name(), last.status).map_err(write_failed)?;
        }
        Ok(line)
    }

    fn format_probe_result(&self, category: Category, result: &ProbeResult) -> Result<String> {
        let details = describe_result(result, self.options.verbose_mode);
        let mut line = format!(
            "[{}] {} {} ({})",
            result.status,
            category,
            result.display_name(),
            format_latency(result.latency_ms)
        );
        if !details.is_empty() {
            write!(line, ": {}", details).map_err(write_failed)?;
        }
        Ok(line)
    }

    fn format_error(&self, error: &str) -> Result<String> {
        Ok(format!("ERROR: {}", error))
    }

    fn format_warning(&self, warning: &str) -> Result<String> {
        Ok(format!("WARNING: {}", warning))
    }

    fn format_success(&self, message: &str) -> Result<String> {
        Ok(format!("SUCCESS: {}", message))
    }
}
