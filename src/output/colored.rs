//! Colored formatter implementation with terminal color support
//!
//! This module provides a rich colored output formatter that uses
//! ANSI colors and Unicode symbols for enhanced visual presentation.

use super::formatter::{
    align_text, calculate_column_widths, describe_result, format_latency, format_percentage, result_row,
    result_table_format, write_failed, FormattingOptions, OutputFormatter, RowData,
};
use crate::{
    error::Result,
    job::JobStatus,
    models::{ProbeResult, RunSummary},
    types::{Category, Status},
};
use colored::*;
use std::fmt::Write as _;

/// Latency band used to tint the latency column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LatencyLevel {
    Fast,     // < 50ms
    Moderate, // 50-200ms
    Slow,     // 200-1000ms
    VerySlow, // >= 1000ms
}

impl LatencyLevel {
    pub fn from_latency_ms(latency_ms: u64) -> Self {
        match latency_ms {
            0..=49 => Self::Fast,
            50..=199 => Self::Moderate,
            200..=999 => Self::Slow,
            _ => Self::VerySlow,
        }
    }

    pub fn color(&self) -> Color {
        match self {
            Self::Fast => Color::Green,
            Self::Moderate => Color::Cyan,
            Self::Slow => Color::Yellow,
            Self::VerySlow => Color::Red,
        }
    }
}

/// Color scheme configuration
#[derive(Debug, Clone)]
pub struct ColorScheme {
    pub header: Color,
    pub success: Color,
    pub warning: Color,
    pub error: Color,
    pub info: Color,
    pub muted: Color,
    pub border: Color,
}

impl Default for ColorScheme {
    fn default() -> Self {
        Self {
            header: Color::Blue,
            success: Color::Green,
            warning: Color::Yellow,
            error: Color::Red,
            info: Color::Cyan,
            muted: Color::BrightBlack,
            border: Color::BrightBlack,
        }
    }
}

/// Colored formatter implementation
pub struct ColoredFormatter {
    options: FormattingOptions,
    color_scheme: ColorScheme,
}

impl ColoredFormatter {
    /// Create a new colored formatter with options
    pub fn new(options: FormattingOptions) -> Self {
        Self {
            options,
            color_scheme: ColorScheme::default(),
        }
    }

    /// Apply color to text if colors are enabled
    fn colorize(&self, text: &str, color: Color) -> ColoredString {
        if self.options.enable_color {
            text.color(color)
        } else {
            text.normal()
        }
    }

    /// Apply bold formatting if colors are enabled
    fn bold(&self, text: &str) -> ColoredString {
        if self.options.enable_color {
            text.bold()
        } else {
            text.normal()
        }
    }

    /// Bold and colored, or untouched when colors are off
    fn emphasize(&self, text: &str, color: Color) -> ColoredString {
        if self.options.enable_color {
            text.color(color).bold()
        } else {
            text.normal()
        }
    }

    fn status_color(&self, status: Status) -> Color {
        match status {
            Status::Pass => self.color_scheme.success,
            Status::Warn => self.color_scheme.warning,
            Status::Fail => self.color_scheme.error,
        }
    }

    fn status_symbol(status: Status) -> &'static str {
        match status {
            Status::Pass => "✅",
            Status::Warn => "⚠️ ",
            Status::Fail => "❌",
        }
    }

    /// Format percentage with color coding based on value
    fn format_percentage_colored(&self, percentage: f64) -> ColoredString {
        let formatted = format_percentage(percentage);
        let color = if percentage >= 95.0 {
            self.color_scheme.success
        } else if percentage >= 80.0 {
            self.color_scheme.warning
        } else {
            self.color_scheme.error
        };
        self.colorize(&formatted, color)
    }

    fn format_latency_colored(&self, latency_ms: Option<u64>) -> ColoredString {
        let formatted = format_latency(latency_ms);
        match latency_ms {
            Some(ms) => self.colorize(&formatted, LatencyLevel::from_latency_ms(ms).color()),
            None => self.colorize(&formatted, self.color_scheme.muted),
        }
    }

    /// Create a colored section header
    fn create_section_header(&self, title: &str, icon: &str) -> String {
        if self.options.enable_color {
            format!("{} {}", icon, title.bold().color(self.color_scheme.header))
        } else {
            format!("{} {}", icon, title)
        }
    }

    fn category_icon(category: Category) -> &'static str {
        match category {
            Category::Dns => "🔎",
            Category::Tcp => "🔌",
            Category::Https => "🔒",
            Category::Quic => "⚡",
            Category::UdpRange => "📡",
            Category::Ping => "📶",
            Category::Ntp => "🕒",
            Category::Speedtest => "🚀",
        }
    }

    /// Widths come from the uncolored cells; color is applied after padding
    fn create_colored_table(&self, results: &[ProbeResult]) -> String {
        let format = result_table_format(&self.options);
        let rows: Vec<RowData> = results.iter().map(|r| result_row(r, self.options.verbose_mode)).collect();
        let widths = calculate_column_widths(&format, &rows);
        let separator = self.colorize(if format.show_borders { " │ " } else { "  " }, self.color_scheme.border);

        let mut output = String::new();

        let header: Vec<String> = format
            .columns
            .iter()
            .zip(widths.iter())
            .map(|(column, &width)| self.bold(&align_text(&column.header, width, &column.alignment)).to_string())
            .collect();
        output.push_str(header.join(&separator.to_string()).trim_end());
        output.push('\n');

        if format.show_borders {
            let rule: Vec<String> = widths.iter().map(|&w| "─".repeat(w)).collect();
            output.push_str(&self.colorize(&rule.join("─┼─"), self.color_scheme.border).to_string());
            output.push('\n');
        }

        for (result, row) in results.iter().zip(rows.iter()) {
            let cells: Vec<String> = row
                .iter()
                .zip(widths.iter())
                .zip(format.columns.iter())
                .enumerate()
                .map(|(idx, ((cell, &width), column))| {
                    let padded = align_text(cell, width, &column.alignment);
                    match idx {
                        0 => self.emphasize(&padded, self.status_color(result.status)).to_string(),
                        2 => match result.latency_ms {
                            Some(ms) => self.colorize(&padded, LatencyLevel::from_latency_ms(ms).color()).to_string(),
                            None => self.colorize(&padded, self.color_scheme.muted).to_string(),
                        },
                        3 if result.error.is_some() => self.colorize(&padded, self.color_scheme.error).to_string(),
                        _ => padded,
                    }
                })
                .collect();
            output.push_str(cells.join(&separator.to_string()).trim_end());
            output.push('\n');
        }

        output.trim_end().to_string()
    }
}

impl OutputFormatter for ColoredFormatter {
    fn format_header(&self, title: &str) -> Result<String> {
        let mut output = String::new();

        let decorated_title = format!("🎯 {}", title);
        let border = "═".repeat(decorated_title.chars().count() + 4);

        writeln!(output, "{}", self.colorize(&border, self.color_scheme.border)).map_err(write_failed)?;
        writeln!(output, "  {}  ", self.emphasize(&decorated_title, self.color_scheme.header))
            .map_err(write_failed)?;
        write!(output, "{}", self.colorize(&border, self.color_scheme.border)).map_err(write_failed)?;

        Ok(output)
    }

    fn format_category(&self, category: Category, results: &[ProbeResult]) -> Result<String> {
        let mut output = String::new();
        let summary = RunSummary::from_results(results);

        writeln!(
            output,
            "{} {}",
            self.create_section_header(category.title(), Self::category_icon(category)),
            self.colorize(&format!("({}/{} passed)", summary.passed, summary.total), self.color_scheme.muted)
        )
        .map_err(write_failed)?;
        output.push_str(&self.create_colored_table(results));

        Ok(output)
    }

    fn format_summary(&self, summary: &RunSummary) -> Result<String> {
        let mut output = String::new();

        writeln!(output, "{}", self.create_section_header("Summary", "📊")).map_err(write_failed)?;
        writeln!(
            output,
            "🧪 Total Checks: {}",
            self.colorize(&summary.total.to_string(), self.color_scheme.info)
        )
        .map_err(write_failed)?;
        writeln!(
            output,
            "✅ Passed:       {} ({})",
            self.colorize(&summary.passed.to_string(), self.color_scheme.success),
            self.format_percentage_colored(summary.pass_rate())
        )
        .map_err(write_failed)?;

        if summary.warnings > 0 {
            writeln!(
                output,
                "⚠️  Warnings:     {}",
                self.colorize(&summary.warnings.to_string(), self.color_scheme.warning)
            )
            .map_err(write_failed)?;
        }
        if summary.failed > 0 {
            writeln!(
                output,
                "❌ Failed:       {}",
                self.colorize(&summary.failed.to_string(), self.color_scheme.error)
            )
            .map_err(write_failed)?;
        }

        let overall = summary.overall();
        write!(
            output,
            "{} Overall:      {}",
            Self::status_symbol(overall),
            self.emphasize(overall.as_str(), self.status_color(overall))
        )
        .map_err(write_failed)?;

        Ok(output)
    }

    fn format_progress(&self, status: &JobStatus) -> Result<String> {
        let mut line = format!(
            "⏳ {} {}/{} checks",
            self.colorize(&format!("{:>3}%", status.progress), self.color_scheme.info),
            status.completed_steps,
            status.total_steps
        );
        if let Some((category, last)) = status.results.iter().last() {
            write!(
                line,
                " | {} {} {}",
                self.colorize(category.key(), self.color_scheme.muted),
                last.display_name(),
                self.colorize(last.status.as_str(), self.status_color(last.status))
            )
            .map_err(write_failed)?;
        }
        Ok(line)
    }

    fn format_probe_result(&self, category: Category, result: &ProbeResult) -> Result<String> {
        let details = describe_result(result, self.options.verbose_mode);
        let mut line = format!(
            "{} {} {} ({})",
            Self::status_symbol(result.status),
            self.colorize(category.key(), self.color_scheme.muted),
            self.colorize(result.display_name(), self.color_scheme.info),
            self.format_latency_colored(result.latency_ms)
        );
        if !details.is_empty() {
            write!(line, ": {}", details).map_err(write_failed)?;
        }
        Ok(line)
    }

    fn format_error(&self, error: &str) -> Result<String> {
        Ok(format!("❌ {}", self.colorize(error, self.color_scheme.error)))
    }

    fn format_warning(&self, warning: &str) -> Result<String> {
        Ok(format!("⚠️  {}", self.colorize(warning, self.color_scheme.warning)))
    }

    fn format_success(&self, message: &str) -> Result<String> {
        Ok(format!("✅ {}", self.colorize(message, self.color_scheme.success)))
    }
}
