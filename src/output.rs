//! CLI output formatting for stash and organize runs.
//!
//! # Information-First Display
//!
//! Output is **row-centric, not file-centric**. The primary display for
//! every row is its positional index plus the image URL it came from;
//! what happened to it is shown as indented context. This makes the
//! output readable as a run log while still letting users trace a row
//! back to its manifest line.
//!
//! # Output Format
//!
//! ## Stash
//!
//! ```text
//! Stashing 3 posts → stash/images
//! 001 https://cdn.example.com/a.jpg
//!     saved: a.jpg
//! 002 https://cdn.example.com/pic.webp
//!     saved: pic.jpg (converted webp → jpg)
//! 003 https://cdn.example.com/gone.jpg
//!     fetch_failed: HTTP status 404
//!
//! Stashed 2/3 posts (1 fetch failed)
//! ```
//!
//! ## Organize
//!
//! ```text
//! 001 a.jpg → Summer_Party/
//! 002 b.png → Summer_Party/
//! 003 skipped: no event label
//!
//! Copied 2 images into 1 event folders (1 rows skipped)
//! ```
//!
//! # Architecture
//!
//! Each stage has a `format_*` function (returns `Vec<String>` or
//! `String`) for testability and a `print_*` wrapper that writes to
//! stdout. Format functions are pure — no I/O, no side effects.

use crate::organize::OrganizeReport;
use crate::pipeline::{RowOutcome, RunSummary, StashEvent};

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// A row's displayed identity: its image URL, or a placeholder when the
/// input had none.
fn display_source(url: &str) -> &str {
    if url.is_empty() { "(no image url)" } else { url }
}

fn display_filename(path: &std::path::Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

// ============================================================================
// Stash output
// ============================================================================

/// Format a single stash progress event as display lines.
///
/// Rows lead with their positional index and source URL; the outcome is
/// indented context underneath.
pub fn format_stash_event(event: &StashEvent) -> Vec<String> {
    match event {
        StashEvent::Started { total, images_dir } => {
            vec![format!(
                "Stashing {} posts \u{2192} {}",
                total,
                images_dir.display()
            )]
        }
        StashEvent::RowFinished {
            index,
            image_url,
            outcome,
            ..
        } => {
            let mut lines = vec![format!(
                "{} {}",
                format_index(*index),
                display_source(image_url)
            )];
            match outcome {
                RowOutcome::Saved { path, converted } => {
                    let filename = display_filename(path);
                    match converted {
                        Some((from, to)) => lines.push(format!(
                            "    saved: {} (converted {} \u{2192} {})",
                            filename, from, to
                        )),
                        None => lines.push(format!("    saved: {}", filename)),
                    }
                }
                RowOutcome::Failed { status, error } => {
                    lines.push(format!("    {}: {}", status, error));
                }
            }
            lines
        }
    }
}

/// Print a stash progress event to stdout.
pub fn print_stash_event(event: &StashEvent) {
    for line in format_stash_event(event) {
        println!("{}", line);
    }
}

/// Format the end-of-run summary line.
pub fn format_run_summary(summary: &RunSummary) -> String {
    let mut failures = Vec::new();
    if summary.fetch_failed > 0 {
        failures.push(format!("{} fetch failed", summary.fetch_failed));
    }
    if summary.convert_failed > 0 {
        failures.push(format!("{} convert failed", summary.convert_failed));
    }
    if failures.is_empty() {
        format!("Stashed {}/{} posts", summary.saved, summary.total)
    } else {
        format!(
            "Stashed {}/{} posts ({})",
            summary.saved,
            summary.total,
            failures.join(", ")
        )
    }
}

/// Print the end-of-run summary to stdout.
pub fn print_run_summary(summary: &RunSummary) {
    println!("{}", format_run_summary(summary));
}

// ============================================================================
// Organize output
// ============================================================================

/// Format an organize report as display lines.
///
/// Planned copies and skipped rows are interleaved back into manifest
/// order, each leading with its positional index. The closing line
/// says `Would copy` on dry runs so plan output can't be mistaken for
/// work done.
pub fn format_organize_report(report: &OrganizeReport) -> Vec<String> {
    let mut entries: Vec<(usize, String)> = Vec::new();

    for copy in &report.planned {
        let file = display_filename(&copy.dest);
        let folder = copy.dest.parent().map(display_filename).unwrap_or_default();
        entries.push((
            copy.row,
            format!("{} {} \u{2192} {}/", format_index(copy.row), file, folder),
        ));
    }
    for skip in &report.skipped {
        entries.push((
            skip.row,
            format!("{} skipped: {}", format_index(skip.row), skip.detail),
        ));
    }
    entries.sort_by_key(|(row, _)| *row);

    let mut lines: Vec<String> = entries.into_iter().map(|(_, line)| line).collect();
    if !lines.is_empty() {
        lines.push(String::new());
    }

    let verb = if report.dry_run { "Would copy" } else { "Copied" };
    let count = if report.dry_run {
        report.planned.len()
    } else {
        report.copied
    };
    let mut closing = format!(
        "{} {} images into {} event folders",
        verb,
        count,
        report.event_dir_count()
    );
    if !report.skipped.is_empty() {
        closing.push_str(&format!(" ({} rows skipped)", report.skipped.len()));
    }
    lines.push(closing);

    lines
}

/// Print an organize report to stdout.
pub fn print_organize_report(report: &OrganizeReport) {
    for line in format_organize_report(report) {
        println!("{}", line);
    }
}
