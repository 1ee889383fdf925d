//! Paper sizes in PDF points (1/72 inch)

use crate::error::{Result, TransformError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaperSize {
    A3,
    A4,
    A5,
    Letter,
    Legal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Portrait,
    Landscape,
}

/// Width and height of a target page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageBox {
    pub width: f32,
    pub height: f32,
}

impl PageBox {
    pub const A4_PORTRAIT: PageBox = PageBox {
        width: 595.28,
        height: 841.89,
    };
}

impl PaperSize {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "A3" => Some(PaperSize::A3),
            "A4" => Some(PaperSize::A4),
            "A5" => Some(PaperSize::A5),
            "Letter" => Some(PaperSize::Letter),
            "Legal" => Some(PaperSize::Legal),
            _ => None,
        }
    }

    /// Portrait dimensions.
    fn portrait(self) -> PageBox {
        let (width, height) = match self {
            PaperSize::A3 => (841.89, 1190.55),
            PaperSize::A4 => (595.28, 841.89),
            PaperSize::A5 => (419.53, 595.28),
            PaperSize::Letter => (612.0, 792.0),
            PaperSize::Legal => (612.0, 1008.0),
        };
        PageBox { width, height }
    }

    pub fn page_box(self, orientation: Orientation) -> PageBox {
        let portrait = self.portrait();
        match orientation {
            Orientation::Portrait => portrait,
            Orientation::Landscape => PageBox {
                width: portrait.height,
                height: portrait.width,
            },
        }
    }
}

impl Orientation {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "portrait" => Some(Orientation::Portrait),
            "landscape" => Some(Orientation::Landscape),
            _ => None,
        }
    }
}

/// Look up the page box for a named size and orientation.
pub fn resolve_page_box(size: &str, orientation: &str) -> Result<PageBox> {
    match (PaperSize::from_name(size), Orientation::from_name(orientation)) {
        (Some(size), Some(orientation)) => Ok(size.page_box(orientation)),
        _ => Err(TransformError::Validation(
            "Invalid paper size or orientation".into(),
        )),
    }
}
