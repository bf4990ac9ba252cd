//! Human-readable output for the zwrap CLI
//!
//! Everything here writes to stderr; stdout may be carrying stream data.

use crate::json_output::RunSummaryJson;
use console::style;
use std::time::Duration;

/// Print a run summary
pub fn display_summary(summary: &RunSummaryJson) {
    let backend = summary
        .backend
        .map_or_else(|| "unresolved".to_string(), |backend| backend.to_string());

    eprintln!(
        "{} {} via {}",
        style("✓").green().bold(),
        style(&summary.operation).bold(),
        style(backend).cyan()
    );
    eprintln!("  In:       {}", style(format_bytes(summary.total_in)).green());
    eprintln!("  Out:      {}", style(format_bytes(summary.total_out)).green());
    eprintln!("  Ratio:    {}", style(format!("{:.3}", summary.ratio)).yellow());
    eprintln!(
        "  Duration: {}",
        style(format_duration(Duration::from_secs_f64(summary.duration_seconds))).blue()
    );
}

/// Format bytes in human-readable format
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    format!("{:.2} {}", size, UNITS[unit_index])
}

/// Format duration in human-readable format
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs < 60 {
        format!("{:.2}s", duration.as_secs_f64())
    } else {
        format!("{}m {}s", secs / 60, secs % 60)
    }
}

/// Display an info message
pub fn display_info(message: &str) {
    eprintln!("{} {}", style("ℹ").blue().bold(), style(message).blue());
}
