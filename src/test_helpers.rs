//! Shared test utilities for the snapstash test suite.
//!
//! Provides in-memory synthetic images (real encoded bytes, tiny
//! dimensions) and canned transport responses, so tests exercise actual
//! decode/encode/sniff paths without fixture files or a network.
//!
//! # Usage
//!
//! ```text
//! use crate::fetch::transport::tests::MockTransport;
//! use crate::test_helpers::*;
//!
//! let transport = MockTransport::with_responses(vec![
//!     Ok(ok_response(gradient_png(8, 8), "image/png")),
//!     Ok(status_response(503)),
//! ]);
//! ```

use crate::fetch::{TransportError, TransportResponse};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::webp::WebPEncoder;
use image::{DynamicImage, ExtendedColorType, Rgb, RgbImage, Rgba, RgbaImage};
use std::io::Cursor;

// =========================================================================
// Synthetic images
// =========================================================================

/// A small RGB gradient — enough pixel variety to survive lossy encoders.
pub fn gradient_rgb(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        Rgb([
            (x * 255 / width.max(1)) as u8,
            (y * 255 / height.max(1)) as u8,
            128,
        ])
    })
}

/// PNG-encoded gradient.
pub fn gradient_png(width: u32, height: u32) -> Vec<u8> {
    let img = DynamicImage::ImageRgb8(gradient_rgb(width, height));
    let mut out = Vec::new();
    img.write_to(&mut Cursor::new(&mut out), image::ImageFormat::Png)
        .unwrap();
    out
}

/// JPEG-encoded gradient.
pub fn gradient_jpeg(width: u32, height: u32) -> Vec<u8> {
    let img = gradient_rgb(width, height);
    let mut out = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut out, 85);
    encoder.encode_image(&img).unwrap();
    out
}

/// Lossless-WebP-encoded gradient.
pub fn gradient_webp(width: u32, height: u32) -> Vec<u8> {
    let img = gradient_rgb(width, height);
    let mut out = Vec::new();
    WebPEncoder::new_lossless(&mut out)
        .encode(img.as_raw(), width, height, ExtendedColorType::Rgb8)
        .unwrap();
    out
}

/// PNG with the left half fully transparent and the right half opaque red.
pub fn png_with_alpha(width: u32, height: u32) -> Vec<u8> {
    let img = RgbaImage::from_fn(width, height, |x, _| {
        if x < width / 2 {
            Rgba([200, 30, 30, 0])
        } else {
            Rgba([200, 30, 30, 255])
        }
    });
    let mut out = Vec::new();
    DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut out), image::ImageFormat::Png)
        .unwrap();
    out
}

/// A minimal HEIF container header followed by opaque payload.
///
/// Sniffable as HEIC but not decodable — which is exactly how real HEIC
/// files behave in this crate.
pub fn heic_stub() -> Vec<u8> {
    let mut bytes = Vec::new();
    bytes.extend_from_slice(&[0, 0, 0, 24]);
    bytes.extend_from_slice(b"ftypheic");
    bytes.extend_from_slice(&[0, 0, 0, 0]);
    bytes.extend_from_slice(b"mif1heic");
    bytes.extend_from_slice(&[0u8; 64]);
    bytes
}

// =========================================================================
// Canned transport responses
// =========================================================================

/// A 200 response carrying the given body.
pub fn ok_response(body: Vec<u8>, content_type: &str) -> TransportResponse {
    TransportResponse {
        status: 200,
        content_type: Some(content_type.to_string()),
        body,
    }
}

/// A non-200 response with a small HTML body, as servers actually send.
pub fn status_response(status: u16) -> TransportResponse {
    TransportResponse {
        status,
        content_type: Some("text/html".to_string()),
        body: format!("<html>{status}</html>").into_bytes(),
    }
}

/// Shorthand for a network-level failure.
pub fn network_error(message: &str) -> TransportError {
    TransportError::Network(message.to_string())
}
