//! Image format detection and normalization.
//!
//! Decides, per downloaded image, whether the bytes are stored as-is or
//! re-encoded into a more portable format. The decision is driven by a
//! [`NormalizePolicy`] built from config/CLI flags:
//!
//! ```text
//! Passthrough           store every image exactly as fetched
//! ConvertSet            re-encode only listed source formats
//!                       (e.g. webp → jpg, heic → jpg)
//! Force                 re-encode everything into one target format
//! ```
//!
//! Force wins over per-format rules when both are configured. An image
//! already in the target format is never re-encoded — the original bytes
//! pass through untouched.
//!
//! ## Format Detection
//!
//! Formats are detected from magic bytes, never from URLs or HTTP headers
//! (CDNs routinely serve images with wrong or missing `Content-Type`).
//! Anything recognizably an image but outside the known set — GIF, BMP,
//! TIFF — is [`ImageFormat::Unknown`]: it can still be stored, and still
//! re-encoded under a force policy.
//!
//! ## JPEG Output
//!
//! JPEG has no alpha channel, so transparent source pixels are composited
//! onto a white background before encoding. Output quality is fixed at 92.
//!
//! ## HEIC
//!
//! HEIC is detected (so it can be named in errors and kept as-is under
//! passthrough) but there is no pure-Rust decoder for it. A policy that
//! asks to convert *from* HEIC fails with [`ConvertError::UnsupportedFormat`].

use image::codecs::jpeg::JpegEncoder;
use image::codecs::webp::WebPEncoder;
use image::{DynamicImage, ExtendedColorType, Rgb, RgbImage};
use std::collections::BTreeMap;
use std::fmt;
use std::io::Cursor;
use thiserror::Error;

/// JPEG encode quality for normalized output (0-100).
const JPEG_QUALITY: u8 = 92;

#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("Decode failed: {0}")]
    DecodeFailed(String),
    #[error("Encode to {0} failed: {1}")]
    EncodeFailed(&'static str, String),
    #[error("No decoder available for {0} images")]
    UnsupportedFormat(ImageFormat),
}

/// Detected format of a fetched image.
///
/// `Unknown` means the bytes are recognizably *some* image (GIF, BMP,
/// TIFF, AVIF, ...) just not one of the formats this tool reasons about.
/// Bytes that are not an image at all never produce an `ImageFormat` —
/// detection returns `None` and the fetch is rejected upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ImageFormat {
    Jpg,
    Png,
    Webp,
    Heic,
    Unknown,
}

impl ImageFormat {
    /// Canonical file extension, `None` for `Unknown`.
    pub fn extension(self) -> Option<&'static str> {
        match self {
            ImageFormat::Jpg => Some("jpg"),
            ImageFormat::Png => Some("png"),
            ImageFormat::Webp => Some("webp"),
            ImageFormat::Heic => Some("heic"),
            ImageFormat::Unknown => None,
        }
    }

    /// Detect an image format from magic bytes.
    ///
    /// Returns `None` when the bytes do not look like any image format —
    /// an HTML error page served with status 200, a truncated download,
    /// an empty body.
    pub fn sniff(bytes: &[u8]) -> Option<ImageFormat> {
        // HEIF containers first: `image` has no HEIC support, and its own
        // sniffer must not get a chance to misfile them under a sibling
        // ISO-BMFF brand.
        if looks_like_heif(bytes) {
            return Some(ImageFormat::Heic);
        }
        match image::guess_format(bytes) {
            Ok(image::ImageFormat::Jpeg) => Some(ImageFormat::Jpg),
            Ok(image::ImageFormat::Png) => Some(ImageFormat::Png),
            Ok(image::ImageFormat::WebP) => Some(ImageFormat::Webp),
            Ok(_) => Some(ImageFormat::Unknown),
            Err(_) => None,
        }
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension().unwrap_or("unknown"))
    }
}

/// ISO-BMFF brands that mark HEIF/HEIC containers.
const HEIF_BRANDS: [&[u8]; 8] = [
    b"heic", b"heix", b"heim", b"heis", b"hevc", b"hevx", b"mif1", b"msf1",
];

fn looks_like_heif(bytes: &[u8]) -> bool {
    bytes.len() >= 12 && &bytes[4..8] == b"ftyp" && HEIF_BRANDS.contains(&&bytes[8..12])
}

/// A format images can be re-encoded into.
///
/// Narrower than [`ImageFormat`]: only formats with a pure-Rust encoder
/// qualify as targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetFormat {
    Jpg,
    Png,
    Webp,
}

impl TargetFormat {
    /// Parse a config/CLI value. Case-insensitive, accepts `jpeg` for `jpg`.
    pub fn parse(value: &str) -> Option<TargetFormat> {
        match value.trim().to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Some(TargetFormat::Jpg),
            "png" => Some(TargetFormat::Png),
            "webp" => Some(TargetFormat::Webp),
            _ => None,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            TargetFormat::Jpg => "jpg",
            TargetFormat::Png => "png",
            TargetFormat::Webp => "webp",
        }
    }

    /// The detected format this target corresponds to.
    pub fn as_image_format(self) -> ImageFormat {
        match self {
            TargetFormat::Jpg => ImageFormat::Jpg,
            TargetFormat::Png => ImageFormat::Png,
            TargetFormat::Webp => ImageFormat::Webp,
        }
    }
}

impl fmt::Display for TargetFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// What to do with a fetched image before storing it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NormalizePolicy {
    /// Store every image exactly as fetched.
    Passthrough,
    /// Re-encode only the listed source formats into their targets.
    ConvertSet(BTreeMap<ImageFormat, TargetFormat>),
    /// Re-encode every image into one target format.
    Force(TargetFormat),
}

impl NormalizePolicy {
    /// Build a policy from the per-format rules and the force override.
    ///
    /// A force target shadows the per-format rules entirely. No rules at
    /// all means passthrough.
    pub fn from_rules(
        convert_webp: Option<TargetFormat>,
        convert_heic: Option<TargetFormat>,
        force: Option<TargetFormat>,
    ) -> NormalizePolicy {
        if let Some(target) = force {
            return NormalizePolicy::Force(target);
        }
        let mut rules = BTreeMap::new();
        if let Some(target) = convert_webp {
            rules.insert(ImageFormat::Webp, target);
        }
        if let Some(target) = convert_heic {
            rules.insert(ImageFormat::Heic, target);
        }
        if rules.is_empty() {
            NormalizePolicy::Passthrough
        } else {
            NormalizePolicy::ConvertSet(rules)
        }
    }

    /// The target format for a detected source format, `None` to keep as-is.
    pub fn target_for(&self, detected: ImageFormat) -> Option<TargetFormat> {
        match self {
            NormalizePolicy::Passthrough => None,
            NormalizePolicy::ConvertSet(rules) => rules.get(&detected).copied(),
            NormalizePolicy::Force(target) => Some(*target),
        }
    }
}

/// The outcome of normalization: final bytes and their format.
#[derive(Debug, Clone)]
pub struct Normalized {
    pub bytes: Vec<u8>,
    pub format: ImageFormat,
}

/// Apply a normalize policy to fetched image bytes.
///
/// Passthrough (no rule for this format, or already in the target format)
/// returns the original bytes unchanged. Otherwise the image is decoded
/// and re-encoded into the target format.
pub fn normalize(
    bytes: Vec<u8>,
    detected: ImageFormat,
    policy: &NormalizePolicy,
) -> Result<Normalized, ConvertError> {
    let target = match policy.target_for(detected) {
        Some(target) => target,
        None => {
            return Ok(Normalized {
                bytes,
                format: detected,
            });
        }
    };
    if target.as_image_format() == detected {
        // Already in the target format — never re-encode.
        return Ok(Normalized {
            bytes,
            format: detected,
        });
    }
    if detected == ImageFormat::Heic {
        return Err(ConvertError::UnsupportedFormat(ImageFormat::Heic));
    }

    let img =
        image::load_from_memory(&bytes).map_err(|e| ConvertError::DecodeFailed(e.to_string()))?;
    let encoded = encode_as(&img, target)?;
    Ok(Normalized {
        bytes: encoded,
        format: target.as_image_format(),
    })
}

fn encode_as(img: &DynamicImage, target: TargetFormat) -> Result<Vec<u8>, ConvertError> {
    let mut out = Vec::new();
    match target {
        TargetFormat::Jpg => {
            let rgb = flatten_alpha(img);
            let mut encoder = JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY);
            encoder
                .encode_image(&rgb)
                .map_err(|e| ConvertError::EncodeFailed("jpg", e.to_string()))?;
        }
        TargetFormat::Png => {
            img.write_to(&mut Cursor::new(&mut out), image::ImageFormat::Png)
                .map_err(|e| ConvertError::EncodeFailed("png", e.to_string()))?;
        }
        TargetFormat::Webp => {
            // Lossless WebP encodes RGB8/RGBA8 only — convert up front.
            let encoder = WebPEncoder::new_lossless(&mut out);
            let result = if img.color().has_alpha() {
                let rgba = img.to_rgba8();
                encoder.encode(
                    rgba.as_raw(),
                    rgba.width(),
                    rgba.height(),
                    ExtendedColorType::Rgba8,
                )
            } else {
                let rgb = img.to_rgb8();
                encoder.encode(
                    rgb.as_raw(),
                    rgb.width(),
                    rgb.height(),
                    ExtendedColorType::Rgb8,
                )
            };
            result.map_err(|e| ConvertError::EncodeFailed("webp", e.to_string()))?;
        }
    }
    Ok(out)
}

/// Composite transparent pixels onto a white background.
///
/// JPEG has no alpha channel; dropping it instead of blending would turn
/// transparent regions black in most viewers.
fn flatten_alpha(img: &DynamicImage) -> RgbImage {
    if !img.color().has_alpha() {
        return img.to_rgb8();
    }
    let rgba = img.to_rgba8();
    let mut flat = RgbImage::new(rgba.width(), rgba.height());
    for (x, y, px) in rgba.enumerate_pixels() {
        let a = px[3] as u32;
        let blend = |c: u8| (((c as u32) * a + 255 * (255 - a) + 127) / 255) as u8;
        flat.put_pixel(x, y, Rgb([blend(px[0]), blend(px[1]), blend(px[2])]));
    }
    flat
}
