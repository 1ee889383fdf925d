//! PDF Merge
//!
//! Every page of every source becomes a Form XObject that is scaled to fit a
//! fixed target page and centered on it. Output order is document order,
//! then page order.

use lopdf::{Dictionary, Document, Object, Stream};
use tracing::debug;

use crate::builder::{draw_xobject, xobject_resources, ImportedPage, PdfBuilder};
use crate::error::{Result, TransformError};
use crate::layout::Placement;
use crate::paper::PageBox;

/// Merge `documents` onto pages of size `page`.
///
/// A source that cannot be parsed fails the whole merge.
pub fn merge_documents(documents: Vec<Vec<u8>>, page: PageBox) -> Result<Vec<u8>> {
    if documents.is_empty() {
        return Err(TransformError::Validation("No documents to merge".into()));
    }

    // Parse everything up front so a bad input fails before any work
    let mut sources = Vec::with_capacity(documents.len());
    for (i, bytes) in documents.iter().enumerate() {
        let doc = Document::load_mem(bytes).map_err(|e| {
            TransformError::Assembly(format!("Failed to load document {}: {}", i + 1, e))
        })?;
        sources.push(doc);
    }

    let mut builder = PdfBuilder::new();
    for source in sources {
        for imported in builder.import_pages(source)? {
            add_form_page(&mut builder, imported, page)?;
        }
    }

    debug!(
        "Merged {} documents into {} pages",
        documents.len(),
        builder.page_count()
    );
    builder.finish()
}

fn add_form_page(builder: &mut PdfBuilder, source: ImportedPage, page: PageBox) -> Result<()> {
    let [llx, lly, urx, ury] = source.media_box;
    let placement = Placement::centered(urx - llx, ury - lly, page)?;

    let mut dict = Dictionary::new();
    dict.set("Type", Object::Name(b"XObject".to_vec()));
    dict.set("Subtype", Object::Name(b"Form".to_vec()));
    dict.set("FormType", Object::Integer(1));
    dict.set(
        "BBox",
        Object::Array(source.media_box.iter().map(|v| Object::Real(*v)).collect()),
    );
    if let Some(resources) = source.resources {
        dict.set("Resources", resources);
    }
    let form_id = builder.add_object(Stream::new(dict, source.content));

    // Map the BBox origin onto the placement origin
    let s = placement.scale;
    let ops = draw_xobject(
        "Pg0",
        [s, 0.0, 0.0, s, placement.x - s * llx, placement.y - s * lly],
    );
    builder.add_page(page, xobject_resources("Pg0", form_id), ops)?;
    Ok(())
}
