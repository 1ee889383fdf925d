//! Image compression and format conversion
//!
//! Both operations decode the upload, re-encode it with the encoder that
//! belongs to the requested [`ImageFormat`] and hand back the new bytes.

use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::DynamicImage;
use tracing::{debug, warn};

use crate::error::{Result, TransformError};
use crate::format::ImageFormat;

/// JPEG quality used by [`convert`], where quality is not configurable.
const CONVERT_JPEG_QUALITY: u8 = 90;

/// Encoder quality, guaranteed to lie in `10..=100`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(u8);

impl Quality {
    pub const MIN: i64 = 10;
    pub const MAX: i64 = 100;

    pub fn new(value: i64) -> Result<Self> {
        if (Self::MIN..=Self::MAX).contains(&value) {
            Ok(Quality(value as u8))
        } else {
            Err(TransformError::Validation(
                "Invalid quality value (10-100)".into(),
            ))
        }
    }

    /// Parse a quality sent as a form field.
    pub fn parse(raw: &str) -> Result<Self> {
        raw.trim()
            .parse::<i64>()
            .map_err(|_| TransformError::Validation("Invalid quality value (10-100)".into()))
            .and_then(Self::new)
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

/// Re-encode an image in `format` at the given quality.
pub fn compress(bytes: &[u8], format: ImageFormat, quality: Quality) -> Result<Vec<u8>> {
    let img = decode(bytes)?;

    if let Some(actual) = ImageFormat::sniff(bytes) {
        if actual != format {
            warn!(
                "Upload looks like {:?} but its name selects {:?}",
                actual, format
            );
        }
    }

    let out = match format {
        ImageFormat::Jpeg => encode_jpeg(&img, quality.get()),
        ImageFormat::Png => encode_png(&img, png_compression(quality)),
        ImageFormat::Webp => encode_webp(&img, Some(quality.get())),
    }?;

    debug!(
        "Compressed {} bytes to {} bytes as {:?} (quality {})",
        bytes.len(),
        out.len(),
        format,
        quality.get()
    );
    Ok(out)
}

/// Re-encode an image in `format` with the highest fidelity the format allows.
pub fn convert(bytes: &[u8], format: ImageFormat) -> Result<Vec<u8>> {
    let img = decode(bytes)?;

    match format {
        ImageFormat::Jpeg => encode_jpeg(&img, CONVERT_JPEG_QUALITY),
        ImageFormat::Png => encode_png(&img, CompressionType::Default),
        ImageFormat::Webp => encode_webp(&img, None),
    }
}

fn decode(bytes: &[u8]) -> Result<DynamicImage> {
    if bytes.is_empty() {
        return Err(TransformError::Validation("No image uploaded".into()));
    }
    image::load_from_memory(bytes).map_err(|e| TransformError::Codec(format!("decode: {}", e)))
}

/// PNG is lossless, so quality only decides how hard deflate works.
fn png_compression(quality: Quality) -> CompressionType {
    match quality.get() {
        0..=49 => CompressionType::Fast,
        50..=89 => CompressionType::Default,
        _ => CompressionType::Best,
    }
}

fn encode_jpeg(img: &DynamicImage, quality: u8) -> Result<Vec<u8>> {
    // JPEG carries neither alpha nor 16-bit samples
    let flattened = match img {
        DynamicImage::ImageLuma8(_) | DynamicImage::ImageRgb8(_) => img.clone(),
        _ => DynamicImage::ImageRgb8(img.to_rgb8()),
    };

    let mut out = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut out, quality);
    flattened
        .write_with_encoder(encoder)
        .map_err(|e| TransformError::Codec(format!("jpeg encode: {}", e)))?;
    Ok(out)
}

fn encode_png(img: &DynamicImage, compression: CompressionType) -> Result<Vec<u8>> {
    let mut out = Cursor::new(Vec::new());
    let encoder = PngEncoder::new_with_quality(&mut out, compression, FilterType::Adaptive);
    img.write_with_encoder(encoder)
        .map_err(|e| TransformError::Codec(format!("png encode: {}", e)))?;
    Ok(out.into_inner())
}

/// Lossy at `quality` when given, lossless otherwise.
fn encode_webp(img: &DynamicImage, quality: Option<u8>) -> Result<Vec<u8>> {
    // libwebp only takes 8-bit RGB or RGBA input
    let rgb = if img.color().has_alpha() {
        DynamicImage::ImageRgba8(img.to_rgba8())
    } else {
        DynamicImage::ImageRgb8(img.to_rgb8())
    };

    let encoder = webp::Encoder::from_image(&rgb)
        .map_err(|e| TransformError::Codec(format!("webp encode: {}", e)))?;
    let memory = match quality {
        Some(q) => encoder.encode_simple(false, f32::from(q)),
        None => encoder.encode_simple(true, 100.0),
    }
    .map_err(|e| TransformError::Codec(format!("webp encode: {:?}", e)))?;

    Ok(memory.to_vec())
}
