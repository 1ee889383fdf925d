//! Supported output image formats
//!
//! The set is closed: every format maps to a concrete encoder in
//! [`crate::image_ops`] at compile time.

use crate::error::{Result, TransformError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Jpeg,
    Png,
    Webp,
}

impl ImageFormat {
    /// Pick the compression output format from an uploaded file name.
    ///
    /// `png` and `webp` extensions keep their format; anything else,
    /// including a missing extension, becomes JPEG.
    pub fn from_file_name(name: &str) -> Self {
        let ext = name.rsplit('.').next().unwrap_or_default().to_lowercase();
        match ext.as_str() {
            "png" => ImageFormat::Png,
            "webp" => ImageFormat::Webp,
            _ => ImageFormat::Jpeg,
        }
    }

    /// Parse a conversion target as sent by clients (`jpeg`, `jpg`, `png`, `webp`).
    pub fn parse_target(target: &str) -> Result<Self> {
        match target {
            "jpeg" | "jpg" => Ok(ImageFormat::Jpeg),
            "png" => Ok(ImageFormat::Png),
            "webp" => Ok(ImageFormat::Webp),
            other => Err(TransformError::Validation(format!(
                "Unsupported target format '{}'. Must be jpeg, jpg, png or webp",
                other
            ))),
        }
    }

    /// Detect the format from magic bytes, if it is one we can emit.
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        match image::guess_format(bytes).ok()? {
            image::ImageFormat::Jpeg => Some(ImageFormat::Jpeg),
            image::ImageFormat::Png => Some(ImageFormat::Png),
            image::ImageFormat::WebP => Some(ImageFormat::Webp),
            _ => None,
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Png => "image/png",
            ImageFormat::Webp => "image/webp",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "jpeg",
            ImageFormat::Png => "png",
            ImageFormat::Webp => "webp",
        }
    }
}
