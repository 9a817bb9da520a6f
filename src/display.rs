//! Terminal rendering for the workflow views

use crate::reconcile::{HeaderSet, PlaceholderSet, ValidationResult};
use crate::row::RowRecord;
use crate::workflow::{GenerationProgress, Notification, ProgressSink};
use indicatif::{ProgressBar, ProgressStyle};
use std::fmt::Write;

const SIZE_UNITS: [&str; 3] = ["Bytes", "KB", "MB"];

/// Human-readable size, rounded to two decimals with trailing zeros dropped.
pub fn format_file_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 Bytes".to_string();
    }
    let mut scaled = bytes as f64;
    let mut exponent = 0;
    while scaled >= 1024.0 && exponent < SIZE_UNITS.len() - 1 {
        scaled /= 1024.0;
        exponent += 1;
    }
    let rounded = (scaled * 100.0).round() / 100.0;
    format!("{} {}", rounded, SIZE_UNITS[exponent])
}

pub fn format_percentage(progress: &GenerationProgress) -> String {
    format!("{}%", progress.percentage())
}

pub fn render_validation_report(
    placeholders: &PlaceholderSet,
    headers: &HeaderSet,
    row_count: usize,
    validation: &ValidationResult,
) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Template placeholders ({}):", placeholders.len());
    let _ = writeln!(out, "  {}", join_or_none(placeholders.as_slice()));
    let _ = writeln!(out, "Excel columns ({}):", headers.len());
    let _ = writeln!(out, "  {}", join_or_none(headers.as_slice()));
    let _ = writeln!(out, "Total rows to process: {row_count}");

    if !validation.missing_in_excel.is_empty() {
        let _ = writeln!(out, "\n⚠ Missing in Excel:");
        let _ = writeln!(
            out,
            "  The following placeholders are in the template but not in Excel: {}",
            validation.missing_in_excel.join(", ")
        );
        let _ = writeln!(
            out,
            "  These placeholders will remain empty in generated documents."
        );
    }

    if validation.has_extra_columns() {
        let _ = writeln!(out, "\nℹ Extra in Excel:");
        let _ = writeln!(
            out,
            "  The following columns are in Excel but not used in template: {}",
            validation.extra_in_excel.join(", ")
        );
        let _ = writeln!(out, "  These columns will be ignored during generation.");
    }

    if validation.valid && !validation.has_extra_columns() {
        let _ = writeln!(out, "\n✓ Perfect Match!");
        let _ = writeln!(
            out,
            "  All template placeholders match Excel columns exactly."
        );
    }

    out
}

/// One `LABEL: value` line per placeholder, in template order.
pub fn render_preview(placeholders: &PlaceholderSet, row: &RowRecord) -> String {
    let width = placeholders.iter().map(|p| p.len()).max().unwrap_or(0);
    let mut out = String::new();
    let _ = writeln!(out, "PREVIEW (first row)");
    let _ = writeln!(out, "{}", "-".repeat(width + 24));
    for placeholder in placeholders.iter() {
        let _ = writeln!(
            out,
            "{:<width$}  {}",
            format!("{placeholder}:"),
            row.preview_value(placeholder),
            width = width + 1
        );
    }
    let _ = writeln!(out, "{}", "-".repeat(width + 24));
    out
}

pub fn show_validation_report(
    placeholders: &PlaceholderSet,
    headers: &HeaderSet,
    row_count: usize,
    validation: &ValidationResult,
) {
    println!("\n📋 Validation results");
    print!(
        "{}",
        render_validation_report(placeholders, headers, row_count, validation)
    );
}

pub fn show_preview(placeholders: &PlaceholderSet, row: &RowRecord) {
    println!();
    print!("{}", render_preview(placeholders, row));
}

pub fn show_notification(notification: &Notification) {
    if notification.is_error() {
        eprintln!("{notification}");
    } else {
        println!("{notification}");
    }
}

pub fn show_error(error: &str) {
    eprintln!("\n❌ Error: {}", error);
}

/// Progress bar fed by the generation replay.
pub struct BarProgressSink {
    bar: ProgressBar,
}

impl BarProgressSink {
    pub fn new() -> Self {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} ({msg})")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("█▓▒░ "),
        );
        Self { bar }
    }

    /// A sink that tracks progress without drawing anything.
    pub fn hidden() -> Self {
        Self {
            bar: ProgressBar::hidden(),
        }
    }

    pub fn position(&self) -> u64 {
        self.bar.position()
    }

    pub fn length(&self) -> Option<u64> {
        self.bar.length()
    }
}

impl Default for BarProgressSink {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressSink for BarProgressSink {
    fn started(&self, total: usize) {
        self.bar.set_length(total as u64);
        self.bar.set_position(0);
        self.bar.set_message("generating");
    }

    fn update(&self, progress: GenerationProgress) {
        self.bar.set_length(progress.total as u64);
        self.bar.set_position(progress.current as u64);
        self.bar.set_message(format_percentage(&progress));
    }

    fn finished(&self, progress: GenerationProgress) {
        self.bar.finish_with_message(format!(
            "✓ {} documents, {}",
            progress.current,
            format_percentage(&progress)
        ));
    }
}

fn join_or_none(items: &[String]) -> String {
    if items.is_empty() {
        "(none)".to_string()
    } else {
        items.join(", ")
    }
}
