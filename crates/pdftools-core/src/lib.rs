//! Image and PDF transformations
//!
//! Stateless operations over in-memory buffers:
//! - `compress` / `convert`: re-encode an image as JPEG, PNG or WebP
//! - `images_to_pdf`: one fitted, centered page per image
//! - `split_by_spec`: pick pages by a spec like "1-3,5"
//! - `merge_documents`: concatenate PDFs, rescaling every page to one size

pub mod builder;
pub mod error;
pub mod format;
pub mod image_ops;
pub mod images;
pub mod layout;
pub mod merge;
pub mod paper;
pub mod ranges;
pub mod split;

pub use error::TransformError;
pub use format::ImageFormat;
pub use image_ops::{compress, convert, Quality};
pub use images::{images_to_pdf, AssembledPdf, SkipReason, SkippedFile, UploadedFile};
pub use layout::{fit_scale, Placement};
pub use merge::merge_documents;
pub use paper::{resolve_page_box, Orientation, PageBox, PaperSize};
pub use ranges::{parse_page_spec, resolve_indices, PageRange};
pub use split::{split_by_spec, split_document, split_ranges};

/// Parse PDF bytes into a document.
pub fn load_document(bytes: &[u8]) -> Result<lopdf::Document, TransformError> {
    lopdf::Document::load_mem(bytes)
        .map_err(|e| TransformError::Assembly(format!("Failed to parse PDF: {}", e)))
}

/// Parse PDF bytes and return page count
pub fn get_page_count(bytes: &[u8]) -> Result<usize, TransformError> {
    Ok(load_document(bytes)?.get_pages().len())
}
