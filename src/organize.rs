//! Event organizer: copy stashed images into per-event folders.
//!
//! Reads a manifest produced by the stash run (or any CSV carrying an
//! image path and an event column) and lays the images out by event:
//!
//! ```text
//! events/
//! ├── Summer_Party/
//! │   ├── a.jpg
//! │   └── b.jpg
//! └── Launch/
//!     └── c.png
//! ```
//!
//! Rows without an event label or without a stored image are skipped
//! and reported, never fatal. The original files stay where they are;
//! organizing copies. Dry-run builds the same plan without touching
//! the filesystem.

use crate::manifest::find_column;
use crate::paths::sanitize_event_dir;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OrganizeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("missing required column: {0}")]
    MissingColumn(String),
}

/// One manifest row, reduced to what organizing needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrganizeRow {
    /// Stored image path as written in the manifest, possibly empty.
    pub image: String,
    pub event: Option<String>,
}

/// A copy the organizer intends to make.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedCopy {
    /// 1-based manifest row.
    pub row: usize,
    pub source: PathBuf,
    pub dest: PathBuf,
    /// Event label as it appeared in the manifest.
    pub event: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    MissingEvent,
    MissingSource,
}

/// A row the organizer left alone, and why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRow {
    /// 1-based manifest row.
    pub row: usize,
    pub reason: SkipReason,
    pub detail: String,
}

/// What an organize run did (or, for dry runs, would do).
#[derive(Debug, Clone)]
pub struct OrganizeReport {
    pub planned: Vec<PlannedCopy>,
    pub skipped: Vec<SkippedRow>,
    /// Copies actually performed; always 0 on a dry run.
    pub copied: usize,
    pub dry_run: bool,
}

impl OrganizeReport {
    /// Number of distinct event folders the plan lands in.
    pub fn event_dir_count(&self) -> usize {
        self.planned
            .iter()
            .filter_map(|copy| copy.dest.parent())
            .collect::<HashSet<_>>()
            .len()
    }
}

/// Read the columns organizing needs from a manifest CSV.
///
/// Accepts `local_image_path` (the stash manifest's own column) as well
/// as `image_name`/`image` for hand-made tables. Header matching is
/// case-insensitive.
pub fn read_rows(manifest_csv: &Path) -> Result<Vec<OrganizeRow>, OrganizeError> {
    let mut reader = csv::Reader::from_path(manifest_csv)?;
    let headers = reader.headers()?.clone();

    let image = find_column(&headers, &["local_image_path", "image_name", "image"])
        .ok_or_else(|| OrganizeError::MissingColumn("local_image_path".to_string()))?;
    let event = find_column(&headers, &["event"])
        .ok_or_else(|| OrganizeError::MissingColumn("event".to_string()))?;

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let cell = |idx: usize| record.get(idx).unwrap_or("").trim().to_string();
        let event_value = cell(event);
        rows.push(OrganizeRow {
            image: cell(image),
            event: (!event_value.is_empty()).then_some(event_value),
        });
    }
    Ok(rows)
}

/// Decide, per row, whether it can be copied and where to.
///
/// Relative image paths resolve against `manifest_dir` first (the stash
/// manifest writes paths like `images/a.jpg`), then fall back to the
/// bare filename inside `images_dir` for hand-made tables. Nothing here
/// touches the filesystem beyond existence checks.
pub fn plan(
    rows: &[OrganizeRow],
    manifest_dir: &Path,
    images_dir: &Path,
    events_dir: &Path,
) -> (Vec<PlannedCopy>, Vec<SkippedRow>) {
    let mut planned = Vec::new();
    let mut skipped = Vec::new();

    for (idx, row) in rows.iter().enumerate() {
        let row_no = idx + 1;

        let Some(event) = &row.event else {
            skipped.push(SkippedRow {
                row: row_no,
                reason: SkipReason::MissingEvent,
                detail: "no event label".to_string(),
            });
            continue;
        };
        if row.image.is_empty() {
            skipped.push(SkippedRow {
                row: row_no,
                reason: SkipReason::MissingSource,
                detail: "no stored image recorded".to_string(),
            });
            continue;
        }

        let source = resolve_source(manifest_dir, images_dir, &row.image);
        match source.file_name() {
            Some(name) if source.is_file() => {
                let dest = events_dir.join(sanitize_event_dir(event)).join(name);
                planned.push(PlannedCopy {
                    row: row_no,
                    source,
                    dest,
                    event: event.clone(),
                });
            }
            _ => skipped.push(SkippedRow {
                row: row_no,
                reason: SkipReason::MissingSource,
                detail: format!("file not found: {}", source.display()),
            }),
        }
    }

    (planned, skipped)
}

fn resolve_source(manifest_dir: &Path, images_dir: &Path, image: &str) -> PathBuf {
    let path = Path::new(image);
    if path.is_absolute() {
        return path.to_path_buf();
    }
    let relative = manifest_dir.join(path);
    if relative.is_file() {
        return relative;
    }
    // A bare filename from a hand-made table lives in the images directory.
    match path.file_name() {
        Some(name) => images_dir.join(name),
        None => relative,
    }
}

/// Perform the planned copies. Event folders are created on demand.
fn apply(planned: &[PlannedCopy]) -> Result<usize, OrganizeError> {
    let mut copied = 0;
    for copy in planned {
        if let Some(parent) = copy.dest.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::copy(&copy.source, &copy.dest)?;
        copied += 1;
    }
    Ok(copied)
}

/// Organize a manifest's images into per-event folders under `events_dir`.
///
/// Skipped rows are in the report, not errors. Filesystem failures
/// while copying are fatal: a half-applied plan should be loud.
pub fn organize(
    manifest_csv: &Path,
    images_dir: &Path,
    events_dir: &Path,
    dry_run: bool,
) -> Result<OrganizeReport, OrganizeError> {
    let rows = read_rows(manifest_csv)?;
    let manifest_dir = manifest_csv.parent().unwrap_or(Path::new("."));
    let (planned, skipped) = plan(&rows, manifest_dir, images_dir, events_dir);
    let copied = if dry_run { 0 } else { apply(&planned)? };
    Ok(OrganizeReport {
        planned,
        skipped,
        copied,
        dry_run,
    })
}
