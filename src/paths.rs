//! Filename derivation and collision-free path assignment.
//!
//! All on-disk names go through this module: archive filenames are derived
//! here, and event folder names for the organize stage are sanitized here.
//! Centralizing the rules keeps one source URL mapping to one filename no
//! matter which stage asks.
//!
//! ## Filename Derivation
//!
//! ```text
//! https://cdn.example.com/photos/sunset.png?w=640   →  sunset.<ext>
//! https://cdn.example.com/download?id=91            →  img_3f8a2c91bd.<ext>
//! data:image/png;base64,iVBOR...                    →  img_0b94e17a22.<ext>
//! ```
//!
//! The stem comes from the last URL path segment, sanitized to filesystem-safe
//! characters. Generic stems (`download`, `image`, `img`, `file`, or nothing
//! at all) carry no identity, so they are replaced by a short hash of the
//! full source string — stable across runs, distinct across sources.
//!
//! The extension reflects what is actually stored: the post-normalization
//! format. A format outside the known set keeps whatever extension the
//! source implied, defaulting to `.jpg`.
//!
//! ## Collisions
//!
//! Two different sources can derive the same filename. The assigner keeps
//! an in-memory claim table per run and suffixes later claims with `-1`,
//! `-2`, ... — so a re-run over the same input re-derives exactly the same
//! paths instead of suffixing against the previous run's files.

use crate::normalize::ImageFormat;
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PathError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Maximum length for derived filename stems and event folder names.
const MAX_NAME_LEN: usize = 80;

/// Extension used when neither the format nor the source implies one.
const DEFAULT_EXTENSION: &str = "jpg";

/// Stems that carry no identity and get replaced by a source hash.
const GENERIC_STEMS: [&str; 4] = ["download", "image", "img", "file"];

/// Hands out collision-free paths under the images directory.
///
/// Claims live in memory for the duration of one run. The suffixing order
/// is the row order of the input, which makes assignments deterministic.
pub struct PathAssigner {
    images_dir: PathBuf,
    claimed: HashSet<String>,
}

impl PathAssigner {
    /// Create the images directory (if needed) and an empty claim table.
    pub fn new(images_dir: &Path) -> Result<PathAssigner, PathError> {
        std::fs::create_dir_all(images_dir)?;
        Ok(PathAssigner {
            images_dir: images_dir.to_path_buf(),
            claimed: HashSet::new(),
        })
    }

    pub fn images_dir(&self) -> &Path {
        &self.images_dir
    }

    /// Derive and claim a path for an image fetched from `source`.
    ///
    /// `format` is the format of the bytes as they will be written, i.e.
    /// after normalization.
    pub fn assign(&mut self, source: &str, format: ImageFormat) -> PathBuf {
        let (stem, source_ext) = match source_filename(source) {
            Some(name) => {
                let (stem, ext) = split_name(&name);
                (sanitize_stem(&stem), ext)
            }
            None => (String::new(), None),
        };

        let stem = if stem.is_empty() || GENERIC_STEMS.contains(&stem.to_ascii_lowercase().as_str())
        {
            hashed_stem(source)
        } else {
            stem
        };

        let ext = match format.extension() {
            Some(ext) => ext.to_string(),
            None => source_ext.unwrap_or_else(|| DEFAULT_EXTENSION.to_string()),
        };

        let mut name = format!("{stem}.{ext}");
        let mut suffix = 0;
        while self.claimed.contains(&name) {
            suffix += 1;
            name = format!("{stem}-{suffix}.{ext}");
        }
        self.claimed.insert(name.clone());
        self.images_dir.join(name)
    }
}

/// Short stable stem for sources whose URL carries no usable name.
fn hashed_stem(source: &str) -> String {
    let digest = Sha256::digest(source.as_bytes());
    let hex = format!("{:x}", digest);
    format!("img_{}", &hex[..10])
}

/// Extract the filename part of a source: last URL path segment for URLs,
/// the file name for bare paths, nothing for data URLs.
fn source_filename(source: &str) -> Option<String> {
    if source.starts_with("data:") {
        return None;
    }
    if let Ok(url) = reqwest::Url::parse(source) {
        // Query string and fragment are already excluded here.
        let name = url.path_segments().and_then(|mut segs| segs.next_back())?;
        if name.is_empty() {
            return None;
        }
        return Some(name.to_string());
    }
    Path::new(source)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
}

/// Split `name.ext` into stem and normalized extension.
///
/// The dot split only counts when the tail actually looks like an
/// extension — short and alphanumeric. `archive.tar.gz`-style names keep
/// the last component only.
fn split_name(name: &str) -> (String, Option<String>) {
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && looks_like_extension(ext) => {
            (stem.to_string(), Some(normalize_extension(ext)))
        }
        _ => (name.to_string(), None),
    }
}

fn looks_like_extension(ext: &str) -> bool {
    !ext.is_empty() && ext.len() <= 5 && ext.chars().all(|c| c.is_ascii_alphanumeric())
}

fn normalize_extension(ext: &str) -> String {
    let lower = ext.to_ascii_lowercase();
    match lower.as_str() {
        "jpeg" | "jpe" => "jpg".to_string(),
        _ => lower,
    }
}

/// Sanitize a filename stem to filesystem-safe characters.
///
/// - Keeps alphanumerics, `-`, `_`, `.`
/// - Replaces runs of anything else with a single `_`
/// - Strips leading/trailing dots and underscores
/// - Truncates to `MAX_NAME_LEN` characters
fn sanitize_stem(stem: &str) -> String {
    let mut cleaned = String::with_capacity(stem.len());
    let mut last_replaced = false;
    for c in stem.chars() {
        if c.is_alphanumeric() || matches!(c, '-' | '_' | '.') {
            cleaned.push(c);
            last_replaced = false;
        } else if !last_replaced {
            cleaned.push('_');
            last_replaced = true;
        }
    }
    cleaned
        .trim_matches(|c| c == '.' || c == '_')
        .chars()
        .take(MAX_NAME_LEN)
        .collect()
}

/// Sanitize an event label into a folder name.
///
/// Spaces become underscores, anything outside alphanumerics and `-_. `
/// becomes an underscore, and an empty result falls back to `unknown` so
/// unlabeled rows still land somewhere visible. Edge dots are stripped:
/// a label of `..` must not name a parent directory.
pub fn sanitize_event_dir(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '-' | '_' | '.' | ' ') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned: String = cleaned
        .trim_matches(|c: char| c.is_whitespace() || c == '.')
        .replace(' ', "_")
        .chars()
        .take(MAX_NAME_LEN)
        .collect();
    if cleaned.is_empty() {
        "unknown".to_string()
    } else {
        cleaned
    }
}
