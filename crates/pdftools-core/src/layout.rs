//! Fit-scale placement of content inside a page box

use crate::error::{Result, TransformError};
use crate::paper::PageBox;

/// Where scaled content lands on a page, in PDF user space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub scale: f32,
}

/// Uniform scale that makes `width` x `height` fit entirely inside `page`.
pub fn fit_scale(width: f32, height: f32, page: PageBox) -> f32 {
    (page.width / width).min(page.height / height)
}

impl Placement {
    /// Scale content to fit `page` without distortion and center it.
    pub fn centered(width: f32, height: f32, page: PageBox) -> Result<Self> {
        if !(width > 0.0 && height > 0.0 && width.is_finite() && height.is_finite()) {
            return Err(TransformError::Assembly(format!(
                "Content has no area ({} x {})",
                width, height
            )));
        }

        let scale = fit_scale(width, height, page);
        let scaled_width = width * scale;
        let scaled_height = height * scale;

        Ok(Placement {
            x: (page.width - scaled_width) / 2.0,
            y: (page.height - scaled_height) / 2.0,
            width: scaled_width,
            height: scaled_height,
            scale,
        })
    }
}
