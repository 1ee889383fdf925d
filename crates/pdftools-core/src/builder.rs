//! Page-by-page construction of a new PDF
//!
//! The builder keeps a single flat page tree under the catalog. Pages are
//! appended in call order and the document is serialized once in
//! [`PdfBuilder::finish`].

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};

use crate::error::{Result, TransformError};
use crate::paper::PageBox;

/// Page tree nesting beyond this is treated as a broken document.
const MAX_TREE_DEPTH: usize = 64;

/// A page taken from another document by [`PdfBuilder::import_pages`].
pub struct ImportedPage {
    /// Decoded, concatenated content streams.
    pub content: Vec<u8>,
    pub resources: Option<Object>,
    pub media_box: [f32; 4],
}

pub struct PdfBuilder {
    doc: Document,
    pages_id: ObjectId,
    kids: Vec<ObjectId>,
}

impl PdfBuilder {
    pub fn new() -> Self {
        let mut doc = Document::with_version("1.7");
        let pages_id = doc.new_object_id();

        let mut catalog = Dictionary::new();
        catalog.set("Type", Object::Name(b"Catalog".to_vec()));
        catalog.set("Pages", Object::Reference(pages_id));
        let catalog_id = doc.add_object(catalog);
        doc.trailer.set("Root", Object::Reference(catalog_id));

        Self {
            doc,
            pages_id,
            kids: Vec::new(),
        }
    }

    pub fn page_count(&self) -> usize {
        self.kids.len()
    }

    pub fn add_object<T: Into<Object>>(&mut self, object: T) -> ObjectId {
        self.doc.add_object(object)
    }

    /// Move every object of `source` into this document and describe its
    /// pages in terms of the moved objects.
    ///
    /// Object ids in `source` are renumbered past ours first. The source's
    /// own catalog and page tree come along but stay unreferenced and are
    /// pruned in [`PdfBuilder::finish`].
    pub fn import_pages(&mut self, mut source: Document) -> Result<Vec<ImportedPage>> {
        source.renumber_objects_with(self.doc.max_id + 1);

        let mut pages = Vec::new();
        for (number, page_id) in source.get_pages() {
            let content = source
                .get_page_content(page_id)
                .map_err(|e| TransformError::Assembly(format!("page {}: {}", number, e)))?;
            pages.push(ImportedPage {
                content,
                resources: inherited_attribute(&source, page_id, b"Resources"),
                media_box: media_box(&source, page_id),
            });
        }

        let top = source.objects.keys().map(|(id, _)| *id).max().unwrap_or(0);
        self.doc.max_id = self.doc.max_id.max(top);
        self.doc.objects.extend(source.objects);
        Ok(pages)
    }

    /// Append a page of size `page` with the given resources and content.
    pub fn add_page(
        &mut self,
        page: PageBox,
        resources: Dictionary,
        operations: Vec<Operation>,
    ) -> Result<ObjectId> {
        let content = Content { operations }
            .encode()
            .map_err(|e| TransformError::Assembly(format!("encode page content: {}", e)))?;
        let content_id = self.doc.add_object(Stream::new(Dictionary::new(), content));

        let mut page_dict = Dictionary::new();
        page_dict.set("Type", Object::Name(b"Page".to_vec()));
        page_dict.set("Parent", Object::Reference(self.pages_id));
        page_dict.set(
            "MediaBox",
            Object::Array(vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Real(page.width),
                Object::Real(page.height),
            ]),
        );
        page_dict.set("Resources", resources);
        page_dict.set("Contents", Object::Reference(content_id));

        let page_id = self.doc.add_object(page_dict);
        self.kids.push(page_id);
        Ok(page_id)
    }

    /// Write the page tree, drop unreachable objects and serialize.
    pub fn finish(mut self) -> Result<Vec<u8>> {
        let mut pages = Dictionary::new();
        pages.set("Type", Object::Name(b"Pages".to_vec()));
        pages.set("Count", Object::Integer(self.kids.len() as i64));
        pages.set(
            "Kids",
            Object::Array(self.kids.iter().map(|id| Object::Reference(*id)).collect()),
        );
        self.doc.objects.insert(self.pages_id, Object::Dictionary(pages));

        self.doc.prune_objects();
        self.doc.compress();

        let mut buffer = Vec::new();
        self.doc
            .save_to(&mut buffer)
            .map_err(|e| TransformError::Assembly(format!("save failed: {}", e)))?;
        Ok(buffer)
    }
}

impl Default for PdfBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Content operations that paint XObject `name` under transform `matrix`.
pub fn draw_xobject(name: &str, matrix: [f32; 6]) -> Vec<Operation> {
    vec![
        Operation::new("q", vec![]),
        Operation::new("cm", matrix.iter().map(|v| Object::Real(*v)).collect()),
        Operation::new("Do", vec![Object::Name(name.as_bytes().to_vec())]),
        Operation::new("Q", vec![]),
    ]
}

/// Resources dictionary exposing a single XObject under `name`.
pub fn xobject_resources(name: &str, id: ObjectId) -> Dictionary {
    let mut xobjects = Dictionary::new();
    xobjects.set(name.as_bytes().to_vec(), Object::Reference(id));
    let mut resources = Dictionary::new();
    resources.set("XObject", xobjects);
    resources
}

/// Look up a page attribute, following `/Parent` for inheritable keys.
pub fn inherited_attribute(doc: &Document, page_id: ObjectId, key: &[u8]) -> Option<Object> {
    let mut node = doc.get_dictionary(page_id).ok()?;
    for _ in 0..MAX_TREE_DEPTH {
        if let Ok(value) = node.get(key) {
            return Some(value.clone());
        }
        let parent = node.get(b"Parent").ok()?.as_reference().ok()?;
        node = doc.get_dictionary(parent).ok()?;
    }
    None
}

/// A page's MediaBox as `[llx, lly, urx, ury]`, defaulting to US Letter.
pub fn media_box(doc: &Document, page_id: ObjectId) -> [f32; 4] {
    const LETTER: [f32; 4] = [0.0, 0.0, 612.0, 792.0];

    let Some(object) = inherited_attribute(doc, page_id, b"MediaBox") else {
        return LETTER;
    };
    let object = match object {
        Object::Reference(id) => match doc.get_object(id) {
            Ok(resolved) => resolved.clone(),
            Err(_) => return LETTER,
        },
        other => other,
    };
    let Ok(values) = object.as_array() else {
        return LETTER;
    };

    let numbers: Vec<f32> = values.iter().filter_map(number).collect();
    match numbers.as_slice() {
        [a, b, c, d] => [a.min(*c), b.min(*d), a.max(*c), b.max(*d)],
        _ => LETTER,
    }
}

fn number(object: &Object) -> Option<f32> {
    match object {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}
