//! Output formatting and styling.
//!
//! Centralizes all user-facing output: colored status messages, progress
//! bars for organize runs, and the formatted history listing.

use crate::history::HistoryEntry;
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};

/// Consistent styling for CLI messages.
pub struct OutputFormatter;

impl OutputFormatter {
    /// Prints a success message in green with a checkmark.
    pub fn success(message: &str) {
        println!("{} {}", "✓".green(), message);
    }

    /// Prints an error message in red with an X mark.
    pub fn error(message: &str) {
        eprintln!("{} {}", "✗".red(), message);
    }

    /// Prints a warning message in yellow.
    pub fn warning(message: &str) {
        println!("{} {}", "⚠".yellow(), message);
    }

    /// Prints an info message in cyan.
    pub fn info(message: &str) {
        println!("{}", message.cyan());
    }

    /// Prints a regular message without styling.
    pub fn plain(message: &str) {
        println!("{}", message);
    }

    /// Creates a progress bar for file operations.
    pub fn create_progress_bar(total: u64) -> ProgressBar {
        let pb = ProgressBar::new(total);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.cyan} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .expect("Invalid progress bar template")
                .progress_chars("█▓░"),
        );
        pb
    }
}

/// Formats the history listing.
///
/// Each entry shows its reversibility marker (✓ reversible, ✗ not), the
/// timeline ID, a formatted timestamp, the operation type, the description,
/// and counts of moved files and config changes where present. A trailing
/// usage hint explains how to roll back.
pub fn format_history(entries: &[&HistoryEntry]) -> String {
    if entries.is_empty() {
        return "No operations recorded yet.".to_string();
    }

    let mut lines = vec!["Operation History".to_string(), "=".repeat(50)];

    for entry in entries {
        let marker = if entry.reversible { "✓" } else { "✗" };
        lines.push(format!(
            "{} {} | {}",
            marker,
            entry.timeline_id,
            entry.formatted_time()
        ));
        lines.push(format!("   Type: {}", entry.operation_type));
        lines.push(format!("   Description: {}", entry.description));
        if !entry.files_moved.is_empty() {
            lines.push(format!("   Files moved: {}", entry.files_moved.len()));
        }
        if !entry.config_changes.is_empty() {
            lines.push(format!("   Config changes: {}", entry.config_changes.len()));
        }
        lines.push(String::new());
    }

    lines.push(format!("Showing {} recent operations", entries.len()));
    lines.push("Use 'sortback undo <timeline_id>' to rollback to a specific point".to_string());
    lines.push("Use 'sortback undo' to rollback the last operation".to_string());

    lines.join("\n")
}
