//! Per-row stash engine: fetch, normalize, place, record.
//!
//! ```text
//! posts.csv ──> fetch ──> normalize ──> images/<name>.<ext>
//!                 │            │
//!                 └────────────┴─────> manifest.csv (one row per input)
//! ```
//!
//! A bad row never aborts the run. Fetch and conversion failures land in
//! the row's own `status`/`error` cells and processing moves on. Only
//! environment failures escape as [`PipelineError`]: unreadable input,
//! an output directory that cannot be created or written.
//!
//! The manifest keeps input order and gets exactly one row per input
//! row, so reruns and diffs line up.

use crate::config::{ConfigError, StashConfig};
use crate::fetch::{self, HttpTransport, Transport};
use crate::manifest::{self, ManifestError, ManifestRow, PostRecord, RowStatus};
use crate::normalize::{self, ImageFormat, NormalizePolicy};
use crate::paths::{PathAssigner, PathError};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use thiserror::Error;

/// Manifest file written into the output directory.
pub const MANIFEST_FILENAME: &str = "manifest.csv";
/// Subdirectory of the output directory that holds the images.
pub const IMAGES_DIRNAME: &str = "images";

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Input error: {0}")]
    Manifest(#[from] ManifestError),
    #[error("Path error: {0}")]
    Paths(#[from] PathError),
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
    #[error("HTTP client error: {0}")]
    Http(#[from] fetch::TransportError),
}

/// Progress events, one stream per run.
///
/// Sent over a channel so a printer thread can render them while rows
/// are still being fetched. Dropping the receiver is harmless.
#[derive(Debug, Clone)]
pub enum StashEvent {
    /// Emitted once, before the first row.
    Started { total: usize, images_dir: PathBuf },
    /// Emitted after each row, in input order.
    RowFinished {
        /// 1-based position in the input.
        index: usize,
        total: usize,
        image_url: String,
        outcome: RowOutcome,
    },
}

/// How a single row ended.
#[derive(Debug, Clone)]
pub enum RowOutcome {
    Saved {
        path: PathBuf,
        /// `Some((from, to))` when the bytes were re-encoded.
        converted: Option<(ImageFormat, ImageFormat)>,
    },
    Failed {
        status: RowStatus,
        error: String,
    },
}

/// Counts for the end-of-run report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub total: usize,
    pub saved: usize,
    pub fetch_failed: usize,
    pub convert_failed: usize,
}

/// Stash every post in `input_csv` into `output_dir`.
///
/// Writes `<output_dir>/images/*` and `<output_dir>/manifest.csv`.
/// Returns the summary counts; per-row failures are in the manifest,
/// not the return value.
pub fn run(
    input_csv: &Path,
    output_dir: &Path,
    config: &StashConfig,
    events: Option<Sender<StashEvent>>,
) -> Result<RunSummary, PipelineError> {
    let transport = HttpTransport::new(config.fetch.fetch_config().timeout)?;
    run_with_transport(&transport, input_csv, output_dir, config, events)
}

/// [`run`] with an injected transport, for tests.
pub fn run_with_transport(
    transport: &impl Transport,
    input_csv: &Path,
    output_dir: &Path,
    config: &StashConfig,
    events: Option<Sender<StashEvent>>,
) -> Result<RunSummary, PipelineError> {
    let fetch_config = config.fetch.fetch_config();
    let policy = config.normalize.policy()?;

    let records = manifest::read_records(input_csv)?;
    fs::create_dir_all(output_dir)?;
    let mut assigner = PathAssigner::new(&output_dir.join(IMAGES_DIRNAME))?;

    let total = records.len();
    if let Some(tx) = &events {
        let _ = tx.send(StashEvent::Started {
            total,
            images_dir: assigner.images_dir().to_path_buf(),
        });
    }

    let mut summary = RunSummary {
        total,
        saved: 0,
        fetch_failed: 0,
        convert_failed: 0,
    };
    let mut rows = Vec::with_capacity(total);

    for (idx, record) in records.into_iter().enumerate() {
        let outcome = stash_record(transport, &record, &fetch_config, &policy, &mut assigner)?;
        match &outcome {
            RowOutcome::Saved { .. } => summary.saved += 1,
            RowOutcome::Failed {
                status: RowStatus::FetchFailed,
                ..
            } => summary.fetch_failed += 1,
            RowOutcome::Failed { .. } => summary.convert_failed += 1,
        }
        if let Some(tx) = &events {
            let _ = tx.send(StashEvent::RowFinished {
                index: idx + 1,
                total,
                image_url: record.image_url.clone(),
                outcome: outcome.clone(),
            });
        }
        rows.push(manifest_row(record, outcome, output_dir));
    }

    manifest::write_manifest(&output_dir.join(MANIFEST_FILENAME), &rows)?;
    Ok(summary)
}

/// Fetch, normalize, and store one post's image.
///
/// Fetch and conversion failures come back as a [`RowOutcome::Failed`];
/// only filesystem trouble is an `Err`.
fn stash_record(
    transport: &impl Transport,
    record: &PostRecord,
    fetch_config: &fetch::FetchConfig,
    policy: &NormalizePolicy,
    assigner: &mut PathAssigner,
) -> Result<RowOutcome, PipelineError> {
    let fetched = match fetch::fetch(transport, &record.image_url, fetch_config) {
        Ok(fetched) => fetched,
        Err(err) => {
            return Ok(RowOutcome::Failed {
                status: RowStatus::FetchFailed,
                error: err.to_string(),
            });
        }
    };

    let source_format = fetched.format;
    let normalized = match normalize::normalize(fetched.bytes, source_format, policy) {
        Ok(normalized) => normalized,
        Err(err) => {
            return Ok(RowOutcome::Failed {
                status: RowStatus::ConvertFailed,
                error: err.to_string(),
            });
        }
    };

    let path = assigner.assign(&record.image_url, normalized.format);
    fs::write(&path, &normalized.bytes)?;

    let converted =
        (normalized.format != source_format).then_some((source_format, normalized.format));
    Ok(RowOutcome::Saved { path, converted })
}

/// Turn an input record and its outcome into one manifest row.
fn manifest_row(record: PostRecord, outcome: RowOutcome, output_dir: &Path) -> ManifestRow {
    let (local_image_path, status, error) = match outcome {
        RowOutcome::Saved { path, .. } => {
            let rel = path
                .strip_prefix(output_dir)
                .unwrap_or(&path)
                .to_string_lossy()
                .into_owned();
            (Some(rel), RowStatus::Ok, None)
        }
        RowOutcome::Failed { status, error } => (None, status, Some(error)),
    };
    ManifestRow {
        post_url: record.post_url,
        image_url: record.image_url,
        caption: record.caption,
        hashtags: record.hashtags,
        local_image_path,
        status,
        error,
        event: record.event,
    }
}
