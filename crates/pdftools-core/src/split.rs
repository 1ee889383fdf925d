//! PDF Split
//!
//! Builds a new document holding exactly the selected pages, in the order
//! given and with repeats kept.

use std::collections::HashSet;

use lopdf::{Dictionary, Document, Object, ObjectId};
use tracing::debug;

use crate::builder::inherited_attribute;
use crate::error::{Result, TransformError};
use crate::load_document;
use crate::ranges::{parse_page_spec, resolve_indices, PageRange};

/// Attributes a page may inherit from its ancestors in the page tree.
const INHERITABLE: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Split using a textual page spec such as `"1-3,5"` (1-based).
///
/// The spec is validated before the document is parsed; pages past the end
/// of the document fail the request before anything is copied.
pub fn split_by_spec(bytes: &[u8], spec: &str) -> Result<Vec<u8>> {
    let ranges = parse_page_spec(spec)?;
    split_ranges(bytes, &ranges)
}

/// Split using already parsed page ranges (1-based).
pub fn split_ranges(bytes: &[u8], ranges: &[PageRange]) -> Result<Vec<u8>> {
    let doc = load_document(bytes)?;
    let indices = resolve_indices(ranges, doc.get_pages().len())?;
    extract_pages(doc, &indices)
}

/// Split using 0-based page indices.
pub fn split_document(bytes: &[u8], indices: &[usize]) -> Result<Vec<u8>> {
    let doc = load_document(bytes)?;
    extract_pages(doc, indices)
}

fn extract_pages(mut doc: Document, indices: &[usize]) -> Result<Vec<u8>> {
    if indices.is_empty() {
        return Err(TransformError::Validation("No pages specified".into()));
    }

    let page_ids: Vec<ObjectId> = doc.get_pages().into_values().collect();
    if let Some(&bad) = indices.iter().find(|&&i| i >= page_ids.len()) {
        return Err(TransformError::Validation(format!(
            "Page {} does not exist (document has {} pages)",
            bad + 1,
            page_ids.len()
        )));
    }

    let root_pages_id = root_pages_id(&doc)?;
    let mut used = HashSet::new();
    let mut kids = Vec::with_capacity(indices.len());

    for &index in indices {
        let source_id = page_ids[index];
        let mut page = doc
            .get_dictionary(source_id)
            .map_err(|e| TransformError::Assembly(format!("page {}: {}", index + 1, e)))?
            .clone();

        // Pages hang directly off the root afterwards, so inherited values
        // must live on the page itself
        for key in INHERITABLE {
            if page.get(key).is_err() {
                if let Some(value) = inherited_attribute(&doc, source_id, key) {
                    page.set(key.to_vec(), value);
                }
            }
        }
        page.set("Parent", Object::Reference(root_pages_id));

        let id = if used.insert(source_id) {
            doc.objects.insert(source_id, Object::Dictionary(page));
            source_id
        } else {
            // A repeated page needs its own node; annotations cannot be shared
            page.remove(b"Annots");
            doc.add_object(page)
        };
        kids.push(id);
    }

    let mut pages = Dictionary::new();
    pages.set("Type", Object::Name(b"Pages".to_vec()));
    pages.set("Count", Object::Integer(kids.len() as i64));
    pages.set(
        "Kids",
        Object::Array(kids.iter().map(|id| Object::Reference(*id)).collect()),
    );
    doc.objects.insert(root_pages_id, Object::Dictionary(pages));

    doc.prune_objects();
    doc.compress();

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)
        .map_err(|e| TransformError::Assembly(format!("Save failed: {}", e)))?;

    debug!("Split {} pages into new document", kids.len());
    Ok(buffer)
}

fn root_pages_id(doc: &Document) -> Result<ObjectId> {
    let catalog_id = doc
        .trailer
        .get(b"Root")
        .and_then(|root| root.as_reference())
        .map_err(|_| TransformError::Assembly("No Root in trailer".into()))?;

    doc.get_dictionary(catalog_id)
        .and_then(|catalog| catalog.get(b"Pages"))
        .and_then(|pages| pages.as_reference())
        .map_err(|_| TransformError::Assembly("No Pages in catalog".into()))
}
