//! CSV reading and writing: input post tables and the output manifest.
//!
//! ## Input
//!
//! One row per post. Header names are matched case-insensitively and
//! ignore surrounding whitespace; column order is free.
//!
//! ```text
//! url          required unless image_url is present; doubles as both
//!              post_url and image_url when it is the only URL column
//! image_url    direct image address (wins over url)
//! post_url     address of the post itself
//! caption      free text
//! hashtags     separated by commas and/or whitespace
//! event        label used by the organize stage
//! ```
//!
//! Missing URL columns are a fatal input error. A row with an *empty*
//! URL cell is not — it flows through the pipeline and fails like any
//! other bad source, recorded on its own row.
//!
//! ## Output
//!
//! Fixed columns, one row per input row, input order preserved:
//!
//! ```text
//! post_url, image_url, caption, hashtags,
//! local_image_path, status, error, event
//! ```
//!
//! `status` is `ok`, `fetch_failed`, or `convert_failed`;
//! `local_image_path` is filled exactly when status is `ok`, `error`
//! exactly when it is not. `event` is carried through for the organize
//! stage, empty when the input had none.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("missing required column: {0}")]
    MissingColumn(String),
}

/// One input row, resolved to canonical fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostRecord {
    pub post_url: String,
    pub image_url: String,
    pub caption: String,
    pub hashtags: Vec<String>,
    pub event: Option<String>,
}

/// Row outcome recorded in the output manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowStatus {
    Ok,
    FetchFailed,
    ConvertFailed,
}

impl fmt::Display for RowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RowStatus::Ok => "ok",
            RowStatus::FetchFailed => "fetch_failed",
            RowStatus::ConvertFailed => "convert_failed",
        };
        f.write_str(label)
    }
}

/// One output manifest row. Field order here is the CSV column order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestRow {
    pub post_url: String,
    pub image_url: String,
    pub caption: String,
    #[serde(with = "hashtag_cell")]
    pub hashtags: Vec<String>,
    pub local_image_path: Option<String>,
    pub status: RowStatus,
    pub error: Option<String>,
    pub event: Option<String>,
}

/// Hashtag lists live in one CSV cell, space-joined.
mod hashtag_cell {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(tags: &[String], ser: S) -> Result<S::Ok, S::Error> {
        ser.serialize_str(&tags.join(" "))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<Vec<String>, D::Error> {
        let raw = String::deserialize(de)?;
        Ok(super::split_hashtags(&raw))
    }
}

/// Split a hashtag cell on commas and whitespace, dropping empties.
pub fn split_hashtags(raw: &str) -> Vec<String> {
    raw.split(|c: char| c == ',' || c.is_whitespace())
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect()
}

/// Position of the first header matching any of `names`, ignoring case
/// and surrounding whitespace.
pub(crate) fn find_column(headers: &csv::StringRecord, names: &[&str]) -> Option<usize> {
    headers.iter().position(|header| {
        let header = header.trim().to_ascii_lowercase();
        names.iter().any(|name| header == *name)
    })
}

/// Read an input post table.
///
/// Rows come back in file order. Cells are trimmed; a missing optional
/// column reads as empty on every row.
pub fn read_records(path: &Path) -> Result<Vec<PostRecord>, ManifestError> {
    let mut reader = csv::Reader::from_path(path)?;
    let headers = reader.headers()?.clone();

    let url = find_column(&headers, &["url"]);
    let image_url = find_column(&headers, &["image_url"]);
    if url.is_none() && image_url.is_none() {
        return Err(ManifestError::MissingColumn(
            "image_url (or url)".to_string(),
        ));
    }
    let post_url = find_column(&headers, &["post_url"]);
    let caption = find_column(&headers, &["caption"]);
    let hashtags = find_column(&headers, &["hashtags"]);
    let event = find_column(&headers, &["event"]);

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row?;
        let cell = |idx: Option<usize>| {
            idx.and_then(|i| row.get(i))
                .unwrap_or("")
                .trim()
                .to_string()
        };
        let or_url = |value: String| if value.is_empty() { cell(url) } else { value };

        let event_value = cell(event);
        records.push(PostRecord {
            post_url: or_url(cell(post_url)),
            image_url: or_url(cell(image_url)),
            caption: cell(caption),
            hashtags: split_hashtags(&cell(hashtags)),
            event: (!event_value.is_empty()).then_some(event_value),
        });
    }
    Ok(records)
}

/// Write the output manifest. Headers come from [`ManifestRow`]'s fields.
pub fn write_manifest(path: &Path, rows: &[ManifestRow]) -> Result<(), ManifestError> {
    let mut writer = csv::Writer::from_path(path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_input(tmp: &TempDir, content: &str) -> std::path::PathBuf {
        let path = tmp.path().join("posts.csv");
        fs::write(&path, content).unwrap();
        path
    }

    // =========================================================================
    // Input reading
    // =========================================================================

    #[test]
    fn url_column_doubles_as_post_and_image_url() {
        let tmp = TempDir::new().unwrap();
        let path = write_input(
            &tmp,
            "url,caption\nhttps://example.com/a.jpg,Beach day\n",
        );
        let records = read_records(&path).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].post_url, "https://example.com/a.jpg");
        assert_eq!(records[0].image_url, "https://example.com/a.jpg");
        assert_eq!(records[0].caption, "Beach day");
    }

    #[test]
    fn specific_columns_win_over_url() {
        let tmp = TempDir::new().unwrap();
        let path = write_input(
            &tmp,
            "url,post_url,image_url\n\
             https://example.com/fallback,https://example.com/post/1,https://cdn.example.com/a.jpg\n",
        );
        let records = read_records(&path).unwrap();
        assert_eq!(records[0].post_url, "https://example.com/post/1");
        assert_eq!(records[0].image_url, "https://cdn.example.com/a.jpg");
    }

    #[test]
    fn header_matching_ignores_case_and_whitespace() {
        let tmp = TempDir::new().unwrap();
        let path = write_input(
            &tmp,
            " Image_URL ,Caption,EVENT\nhttps://example.com/a.jpg,hi,Summer Party\n",
        );
        let records = read_records(&path).unwrap();
        assert_eq!(records[0].image_url, "https://example.com/a.jpg");
        assert_eq!(records[0].event.as_deref(), Some("Summer Party"));
    }

    #[test]
    fn missing_url_columns_is_fatal() {
        let tmp = TempDir::new().unwrap();
        let path = write_input(&tmp, "caption,hashtags\nhello,#a\n");
        let result = read_records(&path);
        assert!(matches!(result, Err(ManifestError::MissingColumn(_))));
    }

    #[test]
    fn empty_image_url_cell_is_not_fatal() {
        let tmp = TempDir::new().unwrap();
        let path = write_input(&tmp, "image_url,caption\n,no image here\n");
        let records = read_records(&path).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].image_url, "");
    }

    #[test]
    fn rows_preserve_file_order() {
        let tmp = TempDir::new().unwrap();
        let path = write_input(
            &tmp,
            "url\nhttps://example.com/1.jpg\nhttps://example.com/2.jpg\nhttps://example.com/3.jpg\n",
        );
        let records = read_records(&path).unwrap();
        let urls: Vec<&str> = records.iter().map(|r| r.image_url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "https://example.com/1.jpg",
                "https://example.com/2.jpg",
                "https://example.com/3.jpg",
            ]
        );
    }

    #[test]
    fn absent_event_column_reads_as_none() {
        let tmp = TempDir::new().unwrap();
        let path = write_input(&tmp, "url\nhttps://example.com/a.jpg\n");
        let records = read_records(&path).unwrap();
        assert_eq!(records[0].event, None);
    }

    // =========================================================================
    // Hashtag splitting
    // =========================================================================

    #[test]
    fn hashtags_split_on_spaces_and_commas() {
        assert_eq!(split_hashtags("#beach #sunset"), vec!["#beach", "#sunset"]);
        assert_eq!(split_hashtags("beach,sunset"), vec!["beach", "sunset"]);
        assert_eq!(
            split_hashtags("#a, #b  ,#c"),
            vec!["#a", "#b", "#c"]
        );
    }

    #[test]
    fn empty_hashtag_cell_is_empty_list() {
        assert_eq!(split_hashtags(""), Vec::<String>::new());
        assert_eq!(split_hashtags("  ,  "), Vec::<String>::new());
    }

    // =========================================================================
    // Output writing
    // =========================================================================

    fn sample_rows() -> Vec<ManifestRow> {
        vec![
            ManifestRow {
                post_url: "https://example.com/post/1".to_string(),
                image_url: "https://cdn.example.com/a.jpg".to_string(),
                caption: "Beach day".to_string(),
                hashtags: vec!["#beach".to_string(), "#sunset".to_string()],
                local_image_path: Some("images/a.jpg".to_string()),
                status: RowStatus::Ok,
                error: None,
                event: Some("Summer Party".to_string()),
            },
            ManifestRow {
                post_url: "https://example.com/post/2".to_string(),
                image_url: "https://cdn.example.com/gone.jpg".to_string(),
                caption: String::new(),
                hashtags: Vec::new(),
                local_image_path: None,
                status: RowStatus::FetchFailed,
                error: Some("HTTP status 404".to_string()),
                event: None,
            },
        ]
    }

    #[test]
    fn write_emits_fixed_header_order() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("out.csv");
        write_manifest(&path, &sample_rows()).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let header = content.lines().next().unwrap();
        assert_eq!(
            header,
            "post_url,image_url,caption,hashtags,local_image_path,status,error,event"
        );
    }

    #[test]
    fn statuses_serialize_as_snake_case() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("out.csv");
        write_manifest(&path, &sample_rows()).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains(",ok,"));
        assert!(content.contains(",fetch_failed,"));
    }

    #[test]
    fn written_rows_read_back_identically() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("out.csv");
        let rows = sample_rows();
        write_manifest(&path, &rows).unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let back: Vec<ManifestRow> = reader
            .deserialize()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(back, rows);
    }

    #[test]
    fn failed_row_has_no_path_and_ok_row_has_no_error() {
        let rows = sample_rows();
        assert!(rows[0].local_image_path.is_some() && rows[0].error.is_none());
        assert!(rows[1].local_image_path.is_none() && rows[1].error.is_some());
    }
}
