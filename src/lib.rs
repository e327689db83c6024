//! # Snapstash
//!
//! Archive social media post images from a CSV export into local files.
//! Feed it a table of posts — URLs, captions, hashtags, events — and it
//! downloads every image, optionally re-encodes awkward formats, and
//! writes an enriched manifest tying each post to its stored file.
//!
//! # Architecture: Per-Row Pipeline Plus Organizer
//!
//! A stash run walks the input CSV row by row; the organizer is a
//! separate pass over the resulting manifest:
//!
//! ```text
//! 1. Stash     posts.csv  →  stash/images/ + stash/manifest.csv
//!              (fetch → normalize → place → record, one row at a time)
//! 2. Organize  manifest   →  events/<Event_Name>/
//!              (copy stored images into per-event folders)
//! ```
//!
//! The split exists for three reasons:
//!
//! - **Resilience**: a dead link or a broken image costs one manifest
//!   row, never the run. The manifest records exactly what happened to
//!   every row.
//! - **Rerunnability**: the manifest is plain CSV in input order, so
//!   reruns and diffs line up and downstream tools can join it back to
//!   the source export.
//! - **Testability**: fetching hides behind a transport trait, so the
//!   whole pipeline runs in tests against canned responses without a
//!   network.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`manifest`] | CSV contract — flexible input headers in, fixed-column manifest out |
//! | [`fetch`] | Image download: transport seam, blocking HTTP client, retry policy, data/file sources |
//! | [`normalize`] | Byte-level format detection and policy-driven re-encoding |
//! | [`paths`] | Filename derivation, sanitizing, and collision-free assignment |
//! | [`pipeline`] | The per-row engine tying fetch → normalize → store → record together |
//! | [`organize`] | Event organizer — copies stashed images into per-event folders |
//! | [`config`] | `snapstash.toml` loading and validation |
//! | [`output`] | CLI output formatting — progress events and end-of-run reports |
//!
//! # Design Decisions
//!
//! ## Sniffed Formats Over Content-Type
//!
//! CDNs lie. Image URLs get served with `text/html` headers, WebP
//! arrives labeled as JPEG, and soft-404 pages come back `200 OK`. So
//! the `Content-Type` header is never trusted: magic bytes decide what
//! a download is, and a body that doesn't sniff as an image is rejected
//! as a fetch failure no matter what the server claimed.
//!
//! ## Pure-Rust Image Handling
//!
//! Re-encoding uses the `image` crate's own encoders — no ImageMagick,
//! no libvips, no system dependencies. The one casualty is HEIC: it is
//! *recognized* (so policy and reporting can name it) but not decoded.
//! A HEIC row under a conversion policy fails with a clear per-row
//! error instead of a mystery crash.
//!
//! ## Deterministic, Collision-Free Filenames
//!
//! Stored names derive from the source URL (`.../pic.jpg` → `pic.jpg`),
//! falling back to a short content-addressed stem (`img_3f9ab2c01d`)
//! when the URL carries no usable name. A per-run claim table hands out
//! `-1`, `-2` suffixes on collision. Derivation depends only on the
//! input sequence, so a rerun assigns the same names and overwrites in
//! place rather than accumulating copies.
//!
//! ## Blocking HTTP
//!
//! Downloads go through `reqwest`'s blocking client, built once per run
//! with the configured timeout. Rows are processed sequentially — the
//! polite rate for scraping a CDN you don't own — which makes an async
//! runtime pure overhead here. Retries use a linear backoff and only
//! fire on timeouts, transport errors, and 5xx/429 answers.

pub mod config;
pub mod fetch;
pub mod manifest;
pub mod normalize;
pub mod organize;
pub mod output;
pub mod paths;
pub mod pipeline;

#[cfg(test)]
pub(crate) mod test_helpers;
