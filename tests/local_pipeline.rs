//! End-to-end runs against local image files.
//!
//! The fetch layer accepts bare filesystem paths as sources, so these
//! tests drive the real `pipeline::run` entry point (config, fetching,
//! conversion, path assignment, manifest writing) without touching the
//! network. The organize tests then consume the manifest a stash run
//! actually produced.

use snapstash::config::StashConfig;
use snapstash::manifest::{ManifestRow, RowStatus};
use snapstash::organize;
use snapstash::pipeline::{self, RunSummary};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn test_config() -> StashConfig {
    let mut config = StashConfig::default();
    config.fetch.max_retries = 0;
    config.fetch.retry_delay_ms = 0;
    config
}

fn write_png(path: &Path, width: u32, height: u32) {
    let img = image::RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    });
    img.save_with_format(path, image::ImageFormat::Png).unwrap();
}

fn write_webp(path: &Path, width: u32, height: u32) {
    let img = image::RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    });
    let mut bytes = Vec::new();
    let encoder = image::codecs::webp::WebPEncoder::new_lossless(&mut bytes);
    encoder
        .encode(img.as_raw(), width, height, image::ExtendedColorType::Rgb8)
        .unwrap();
    fs::write(path, bytes).unwrap();
}

fn read_manifest(output_dir: &Path) -> Vec<ManifestRow> {
    let mut reader = csv::Reader::from_path(output_dir.join("manifest.csv")).unwrap();
    reader.deserialize().collect::<Result<_, _>>().unwrap()
}

#[test]
fn stash_run_from_local_files() {
    let tmp = TempDir::new().unwrap();
    let src = tmp.path().join("src");
    fs::create_dir_all(&src).unwrap();
    write_png(&src.join("beach.png"), 8, 8);
    write_png(&src.join("sunset.png"), 16, 16);

    let posts = tmp.path().join("posts.csv");
    fs::write(
        &posts,
        format!(
            "url,caption,hashtags,event\n\
             {beach},Beach day,#beach #sun,Summer Party\n\
             {missing},Gone,,Summer Party\n\
             {sunset},Sunset,,Launch\n",
            beach = src.join("beach.png").display(),
            missing = src.join("nope.png").display(),
            sunset = src.join("sunset.png").display(),
        ),
    )
    .unwrap();

    let out = tmp.path().join("stash");
    let summary = pipeline::run(&posts, &out, &test_config(), None).unwrap();
    assert_eq!(
        summary,
        RunSummary {
            total: 3,
            saved: 2,
            fetch_failed: 1,
            convert_failed: 0,
        }
    );

    let rows = read_manifest(&out);
    assert_eq!(rows.len(), 3);

    assert_eq!(rows[0].status, RowStatus::Ok);
    assert_eq!(rows[0].local_image_path.as_deref(), Some("images/beach.png"));
    assert_eq!(rows[0].caption, "Beach day");
    assert_eq!(rows[0].hashtags, vec!["#beach", "#sun"]);
    assert!(out.join("images/beach.png").is_file());

    assert_eq!(rows[1].status, RowStatus::FetchFailed);
    assert_eq!(rows[1].local_image_path, None);
    assert!(rows[1].error.is_some());

    assert_eq!(rows[2].status, RowStatus::Ok);
    assert_eq!(rows[2].event.as_deref(), Some("Launch"));
}

#[test]
fn webp_rows_are_converted_to_jpg() {
    let tmp = TempDir::new().unwrap();
    let src = tmp.path().join("src");
    fs::create_dir_all(&src).unwrap();
    write_webp(&src.join("pic.webp"), 8, 8);

    let posts = tmp.path().join("posts.csv");
    fs::write(
        &posts,
        format!("url\n{}\n", src.join("pic.webp").display()),
    )
    .unwrap();

    let out = tmp.path().join("stash");
    let summary = pipeline::run(&posts, &out, &test_config(), None).unwrap();
    assert_eq!(summary.saved, 1);

    let rows = read_manifest(&out);
    assert_eq!(rows[0].local_image_path.as_deref(), Some("images/pic.jpg"));

    let stored = fs::read(out.join("images/pic.jpg")).unwrap();
    assert_eq!(
        image::guess_format(&stored).unwrap(),
        image::ImageFormat::Jpeg
    );
}

#[test]
fn non_image_file_is_a_row_failure_not_a_run_failure() {
    let tmp = TempDir::new().unwrap();
    let src = tmp.path().join("src");
    fs::create_dir_all(&src).unwrap();
    fs::write(src.join("notes.txt"), "not an image").unwrap();
    write_png(&src.join("real.png"), 8, 8);

    let posts = tmp.path().join("posts.csv");
    fs::write(
        &posts,
        format!(
            "url\n{}\n{}\n",
            src.join("notes.txt").display(),
            src.join("real.png").display(),
        ),
    )
    .unwrap();

    let out = tmp.path().join("stash");
    let summary = pipeline::run(&posts, &out, &test_config(), None).unwrap();
    assert_eq!(summary.fetch_failed, 1);
    assert_eq!(summary.saved, 1);

    let rows = read_manifest(&out);
    assert_eq!(rows[0].status, RowStatus::FetchFailed);
    assert_eq!(rows[1].status, RowStatus::Ok);
}

#[test]
fn rerun_assigns_identical_names_without_duplicates() {
    let tmp = TempDir::new().unwrap();
    let src = tmp.path().join("src");
    fs::create_dir_all(&src).unwrap();
    write_png(&src.join("a.png"), 8, 8);
    write_png(&src.join("b.png"), 8, 8);

    let posts = tmp.path().join("posts.csv");
    fs::write(
        &posts,
        format!(
            "url\n{}\n{}\n",
            src.join("a.png").display(),
            src.join("b.png").display(),
        ),
    )
    .unwrap();

    let out = tmp.path().join("stash");
    let first = pipeline::run(&posts, &out, &test_config(), None).unwrap();
    let second = pipeline::run(&posts, &out, &test_config(), None).unwrap();
    assert_eq!(first, second);

    // Same names both times: two files, no -1 copies.
    let names: Vec<String> = fs::read_dir(out.join("images"))
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names.len(), 2);

    let rows = read_manifest(&out);
    assert_eq!(rows[0].local_image_path.as_deref(), Some("images/a.png"));
    assert_eq!(rows[1].local_image_path.as_deref(), Some("images/b.png"));
}

#[test]
fn organize_groups_stash_output_by_event() {
    let tmp = TempDir::new().unwrap();
    let src = tmp.path().join("src");
    fs::create_dir_all(&src).unwrap();
    write_png(&src.join("beach.png"), 8, 8);
    write_png(&src.join("cake.png"), 8, 8);
    write_png(&src.join("stray.png"), 8, 8);

    let posts = tmp.path().join("posts.csv");
    fs::write(
        &posts,
        format!(
            "url,event\n{},Summer Party\n{},Summer Party\n{},\n",
            src.join("beach.png").display(),
            src.join("cake.png").display(),
            src.join("stray.png").display(),
        ),
    )
    .unwrap();

    let out = tmp.path().join("stash");
    pipeline::run(&posts, &out, &test_config(), None).unwrap();
    let manifest = out.join("manifest.csv");
    let events = tmp.path().join("events");

    // Dry run: full plan, nothing on disk.
    let dry = organize::organize(&manifest, &out.join("images"), &events, true).unwrap();
    assert_eq!(dry.planned.len(), 2);
    assert_eq!(dry.skipped.len(), 1);
    assert_eq!(dry.copied, 0);
    assert!(!events.exists());

    let report = organize::organize(&manifest, &out.join("images"), &events, false).unwrap();
    // The dry run planned exactly what the real run then did.
    assert_eq!(dry.planned, report.planned);
    assert_eq!(report.copied, 2);
    assert!(events.join("Summer_Party/beach.png").is_file());
    assert!(events.join("Summer_Party/cake.png").is_file());

    // Copies, not moves.
    assert!(out.join("images/beach.png").is_file());
}
