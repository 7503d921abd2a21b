use std::collections::HashMap;
use std::path::Path;

use lopdf::{Document, Object, ObjectId, Stream};
use tracing::debug;

use super::canvas::{ImageHandle, PageCanvas};
use super::font::{FontSet, FontWeight};
use super::image::RasterImage;
use super::page_index::PageIndex;
use crate::error::{Error, Result};
use crate::layout::Rectangle;

/// Maximum depth followed when walking `/Parent` chains.
const MAX_INHERITANCE_DEPTH: usize = 10;

/// US Letter, used when a page carries no MediaBox anywhere in its tree.
const DEFAULT_MEDIA_BOX: [f32; 4] = [0.0, 0.0, 612.0, 792.0];

/// A loaded template PDF that pages and drawings are added to.
///
/// Pages present in the original file are the *template pages*; anything
/// appended afterwards (overflow appendix, summary) follows them.
pub struct TemplateDocument {
    doc: Document,
    template_page_count: usize,
    images: Vec<ObjectId>,
    fonts: HashMap<FontWeight, ObjectId>,
}

impl TemplateDocument {
    /// Parse a template from bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let doc = Document::load_mem(bytes)
            .map_err(|e| Error::PdfOpen(format!("Failed to parse PDF: {e}")))?;

        let template_page_count = doc.get_pages().len();
        if template_page_count == 0 {
            return Err(Error::TemplateEmpty);
        }

        Ok(Self {
            doc,
            template_page_count,
            images: Vec::new(),
            fonts: HashMap::new(),
        })
    }

    /// Open a template from a file path
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let bytes = std::fs::read(path.as_ref()).map_err(|e| {
            Error::PdfOpen(format!("Failed to read file {}: {}", path.as_ref().display(), e))
        })?;
        Self::from_bytes(&bytes)
    }

    pub const fn template_page_count(&self) -> usize {
        self.template_page_count
    }

    pub fn page_count(&self) -> usize {
        self.doc.get_pages().len()
    }

    pub const fn document(&self) -> &Document {
        &self.doc
    }

    pub const fn document_mut(&mut self) -> &mut Document {
        &mut self.doc
    }

    /// Page object ids in page order.
    pub fn page_ids(&self) -> Vec<ObjectId> {
        self.doc.get_pages().into_values().collect()
    }

    pub fn page_id(&self, page: PageIndex) -> Result<ObjectId> {
        let pages = self.doc.get_pages();
        let index = PageIndex::try_from_page_num(page.as_usize(), pages.len())?;
        pages
            .get(&index.as_lopdf_page_number()?)
            .copied()
            .ok_or(Error::PdfInvalidPage {
                page: page.as_usize(),
                total: pages.len(),
            })
    }

    /// The page's MediaBox as a rectangle, following inheritance.
    pub fn media_box(&self, page: PageIndex) -> Result<Rectangle> {
        let page_id = self.page_id(page)?;
        let page_obj = self
            .doc
            .get_object(page_id)
            .map_err(|e| Error::Lopdf(format!("Failed to get page object: {e}")))?;
        let [x0, y0, x1, y1] = get_media_box(&self.doc, page_obj, MAX_INHERITANCE_DEPTH);
        Ok(Rectangle::from_corners(x0, y0, x1, y1))
    }

    /// Append a blank page to the root page tree.
    pub fn append_page(&mut self, width: f32, height: f32) -> Result<PageIndex> {
        let pages_id = self
            .doc
            .catalog()
            .and_then(|catalog| catalog.get(b"Pages"))
            .and_then(Object::as_reference)
            .map_err(|e| Error::Lopdf(format!("Failed to locate page tree: {e}")))?;

        let page_id = self.doc.add_object(lopdf::Dictionary::from_iter([
            ("Type", Object::Name(b"Page".to_vec())),
            ("Parent", Object::Reference(pages_id)),
            (
                "MediaBox",
                Object::Array(vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Real(width),
                    Object::Real(height),
                ]),
            ),
            ("Resources", Object::Dictionary(lopdf::Dictionary::new())),
        ]));

        let pages = self
            .doc
            .get_object_mut(pages_id)
            .and_then(Object::as_dict_mut)
            .map_err(|e| Error::Lopdf(format!("Failed to get page tree: {e}")))?;

        let mut kids = match pages.get(b"Kids") {
            Ok(Object::Array(kids)) => kids.clone(),
            _ => Vec::new(),
        };
        kids.push(Object::Reference(page_id));
        let count = pages
            .get(b"Count")
            .and_then(Object::as_i64)
            .unwrap_or(0)
            .saturating_add(1);
        pages.set("Kids", Object::Array(kids));
        pages.set("Count", Object::Integer(count));

        let index = PageIndex::new(self.page_count().saturating_sub(1));
        debug!(page = %index, "appended page");
        Ok(index)
    }

    /// Register an image; the returned handle can be drawn on any page.
    pub fn add_image(&mut self, image: &RasterImage) -> ImageHandle {
        let id = self.doc.add_object(Object::Stream(image.to_xobject()));
        self.images.push(id);
        ImageHandle::new(self.images.len() - 1)
    }

    /// Materialise a canvas onto a page: registers fonts and images in the
    /// page resources and appends the content stream.
    pub fn draw(&mut self, page: PageIndex, canvas: &PageCanvas, fonts: &FontSet) -> Result<()> {
        if canvas.is_empty() {
            return Ok(());
        }
        let page_id = self.page_id(page)?;

        if canvas.has_text() {
            for weight in [FontWeight::Regular, FontWeight::Bold] {
                let font_id = match self.fonts.get(&weight) {
                    Some(id) => *id,
                    None => {
                        let id = fonts.face(weight).add_to_document(&mut self.doc);
                        self.fonts.insert(weight, id);
                        id
                    }
                };
                self.add_page_resource(page_id, b"Font", weight.resource_name(), font_id)?;
            }
        }

        for handle in canvas.images() {
            let image_id = *self
                .images
                .get(handle.index())
                .ok_or_else(|| Error::Lopdf(format!("Unknown image handle {}", handle.index())))?;
            self.add_page_resource(page_id, b"XObject", &handle.resource_name(), image_id)?;
        }

        self.append_content(page_id, &canvas.to_content(fonts))
    }

    /// Serialize the document.
    pub fn save(mut self) -> Result<Vec<u8>> {
        self.doc.prune_objects();
        self.doc.compress();

        let mut output = Vec::new();
        self.doc
            .save_to(&mut output)
            .map_err(|e| Error::PdfSave(format!("Failed to save PDF: {e}")))?;
        Ok(output)
    }

    /// Append content to a page, isolating any existing content in q/Q so
    /// its graphics state cannot leak into ours.
    fn append_content(&mut self, page_id: ObjectId, content: &str) -> Result<()> {
        let existing_contents = self
            .doc
            .get_object(page_id)
            .and_then(Object::as_dict)
            .map_err(|e| Error::Lopdf(format!("Failed to get page: {e}")))?
            .get(b"Contents")
            .ok()
            .cloned();

        let content_id = self
            .doc
            .add_object(Stream::new(lopdf::Dictionary::new(), content.as_bytes().to_vec()));

        let new_contents = match existing_contents {
            Some(Object::Reference(existing_id)) => {
                let open_id = self.save_state_stream();
                let close_id = self.restore_state_stream();
                Object::Array(vec![
                    Object::Reference(open_id),
                    Object::Reference(existing_id),
                    Object::Reference(close_id),
                    Object::Reference(content_id),
                ])
            }
            Some(Object::Array(arr)) if !arr.is_empty() => {
                let open_id = self.save_state_stream();
                let close_id = self.restore_state_stream();
                let mut wrapped = Vec::with_capacity(arr.len() + 3);
                wrapped.push(Object::Reference(open_id));
                wrapped.extend(arr);
                wrapped.push(Object::Reference(close_id));
                wrapped.push(Object::Reference(content_id));
                Object::Array(wrapped)
            }
            _ => Object::Reference(content_id),
        };

        let page = self
            .doc
            .get_object_mut(page_id)
            .and_then(Object::as_dict_mut)
            .map_err(|e| Error::Lopdf(format!("Failed to get page: {e}")))?;
        page.set("Contents", new_contents);
        Ok(())
    }

    fn save_state_stream(&mut self) -> ObjectId {
        self.doc
            .add_object(Stream::new(lopdf::Dictionary::new(), b"q\n".to_vec()))
    }

    fn restore_state_stream(&mut self) -> ObjectId {
        self.doc
            .add_object(Stream::new(lopdf::Dictionary::new(), b"\nQ\n".to_vec()))
    }

    /// Add `name -> id` to a page's `/Resources /<category>` dictionary.
    ///
    /// The resolved resources (possibly inherited) are copied inline onto the
    /// page so the change is local to it.
    fn add_page_resource(
        &mut self,
        page_id: ObjectId,
        category: &[u8],
        name: &str,
        id: ObjectId,
    ) -> Result<()> {
        let mut resources = resolve_resources(&self.doc, page_id)?;

        let mut entries = resources
            .get(category)
            .ok()
            .and_then(|obj| resolve_dict_object(&self.doc, obj))
            .unwrap_or_default();
        entries.set(name, Object::Reference(id));
        resources.set(category, Object::Dictionary(entries));

        let page = self
            .doc
            .get_object_mut(page_id)
            .and_then(Object::as_dict_mut)
            .map_err(|e| Error::Lopdf(format!("Failed to get page: {e}")))?;
        page.set("Resources", Object::Dictionary(resources));
        Ok(())
    }
}

impl std::fmt::Debug for TemplateDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemplateDocument")
            .field("template_page_count", &self.template_page_count)
            .field("page_count", &self.page_count())
            .field("images", &self.images.len())
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get media box from a page object, walking up `/Parent` for inherited values.
fn get_media_box(doc: &Document, page_obj: &Object, depth: usize) -> [f32; 4] {
    if depth == 0 {
        return DEFAULT_MEDIA_BOX;
    }
    if let Object::Dictionary(dict) = page_obj {
        let media_box = dict
            .get(b"MediaBox")
            .ok()
            .and_then(|obj| match obj {
                Object::Reference(id) => doc.get_object(*id).ok(),
                other => Some(other),
            });
        if let Some(Object::Array(arr)) = media_box
            && arr.len() == 4
        {
            let values: Vec<f32> = arr.iter().filter_map(number).collect();
            if values.len() == 4 {
                return [values[0], values[1], values[2], values[3]];
            }
        }

        if let Ok(Object::Reference(parent_id)) = dict.get(b"Parent")
            && let Ok(parent) = doc.get_object(*parent_id)
        {
            return get_media_box(doc, parent, depth - 1);
        }
    }

    DEFAULT_MEDIA_BOX
}

/// Numeric PDF object as f32.
pub(crate) fn number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}

/// Resolve the Resources dictionary for a page, handling indirect references
/// and inheritance from parent Pages nodes.
fn resolve_resources(doc: &Document, page_id: ObjectId) -> Result<lopdf::Dictionary> {
    let page = doc
        .get_object(page_id)
        .map_err(|e| Error::Lopdf(format!("Failed to get page: {e}")))?;

    if let Object::Dictionary(page_dict) = page {
        if let Ok(res_obj) = page_dict.get(b"Resources")
            && let Some(dict) = resolve_dict_object(doc, res_obj)
        {
            return Ok(dict);
        }

        if let Ok(parent_obj) = page_dict.get(b"Parent")
            && let Some(dict) = resolve_inherited_resources(doc, parent_obj, MAX_INHERITANCE_DEPTH)
        {
            return Ok(dict);
        }
    }

    Ok(lopdf::Dictionary::new())
}

/// Resolve an object that should be a Dictionary (handles References).
pub(crate) fn resolve_dict_object(doc: &Document, obj: &Object) -> Option<lopdf::Dictionary> {
    match obj {
        Object::Dictionary(d) => Some(d.clone()),
        Object::Reference(ref_id) => match doc.get_object(*ref_id) {
            Ok(Object::Dictionary(d)) => Some(d.clone()),
            _ => None,
        },
        _ => None,
    }
}

/// Walk up the Pages tree to find inherited Resources.
fn resolve_inherited_resources(
    doc: &Document,
    parent_obj: &Object,
    depth: usize,
) -> Option<lopdf::Dictionary> {
    if depth == 0 {
        return None;
    }

    let Object::Reference(parent_id) = parent_obj else {
        return None;
    };
    let Ok(Object::Dictionary(parent)) = doc.get_object(*parent_id) else {
        return None;
    };

    if let Ok(res_obj) = parent.get(b"Resources")
        && let Some(dict) = resolve_dict_object(doc, res_obj)
    {
        return Some(dict);
    }

    parent
        .get(b"Parent")
        .ok()
        .and_then(|grandparent| resolve_inherited_resources(doc, grandparent, depth - 1))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use super::*;
    use crate::layout::Rectangle;

    /// Two-page document with page resources inherited from the page tree.
    pub(crate) fn sample_pdf() -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let page_tree_id = doc.new_object_id();

        let font_id = doc.add_object(lopdf::Dictionary::from_iter([
            ("Type", Object::Name(b"Font".to_vec())),
            ("Subtype", Object::Name(b"Type1".to_vec())),
            ("BaseFont", Object::Name(b"Courier".to_vec())),
        ]));

        let content_id = doc.add_object(Stream::new(
            lopdf::Dictionary::new(),
            b"BT /F1 12 Tf 72 720 Td (Template) Tj ET".to_vec(),
        ));

        let mut kids = Vec::new();
        for _ in 0..2 {
            kids.push(Object::Reference(doc.add_object(lopdf::Dictionary::from_iter([
                ("Type", Object::Name(b"Page".to_vec())),
                ("Parent", Object::Reference(page_tree_id)),
                ("Contents", Object::Reference(content_id)),
            ]))));
        }

        let page_tree = lopdf::Dictionary::from_iter([
            ("Type", Object::Name(b"Pages".to_vec())),
            ("Kids", Object::Array(kids)),
            ("Count", Object::Integer(2)),
            (
                "MediaBox",
                Object::Array(vec![0.into(), 0.into(), 595.into(), 842.into()]),
            ),
            (
                "Resources",
                Object::Dictionary(lopdf::Dictionary::from_iter([(
                    "Font",
                    Object::Dictionary(lopdf::Dictionary::from_iter([(
                        "F1",
                        Object::Reference(font_id),
                    )])),
                )])),
            ),
        ]);
        doc.objects.insert(page_tree_id, Object::Dictionary(page_tree));

        let catalog_id = doc.add_object(lopdf::Dictionary::from_iter([
            ("Type", Object::Name(b"Catalog".to_vec())),
            ("Pages", Object::Reference(page_tree_id)),
        ]));
        doc.trailer.set("Root", Object::Reference(catalog_id));

        let mut output = Vec::new();
        doc.save_to(&mut output).unwrap();
        output
    }

    #[test]
    fn test_open_and_inherited_media_box() {
        let doc = TemplateDocument::from_bytes(&sample_pdf()).unwrap();
        assert_eq!(doc.page_count(), 2);
        assert_eq!(doc.template_page_count(), 2);
        let media_box = doc.media_box(PageIndex::new(1)).unwrap();
        assert_eq!(media_box, Rectangle::new(0.0, 0.0, 595.0, 842.0));
    }

    #[test]
    fn test_garbage_is_rejected() {
        assert!(matches!(
            TemplateDocument::from_bytes(b"%PDF-nope"),
            Err(Error::PdfOpen(_))
        ));
    }

    #[test]
    fn test_append_page_updates_tree() {
        let mut doc = TemplateDocument::from_bytes(&sample_pdf()).unwrap();
        let index = doc.append_page(612.0, 792.0).unwrap();
        assert_eq!(index, PageIndex::new(2));
        assert_eq!(doc.page_count(), 3);
        assert_eq!(doc.template_page_count(), 2);
        assert_eq!(
            doc.media_box(index).unwrap(),
            Rectangle::new(0.0, 0.0, 612.0, 792.0)
        );

        let saved = doc.save().unwrap();
        let reloaded = Document::load_mem(&saved).unwrap();
        assert_eq!(reloaded.get_pages().len(), 3);
    }

    #[test]
    fn test_draw_keeps_inherited_resources() {
        let mut doc = TemplateDocument::from_bytes(&sample_pdf()).unwrap();
        let mut canvas = PageCanvas::new(595.0, 842.0);
        canvas.text(72.0, 700.0, 10.0, FontWeight::Regular, "Filled");
        doc.draw(PageIndex::new(0), &canvas, &FontSet::standard()).unwrap();

        let page_id = doc.page_id(PageIndex::new(0)).unwrap();
        let resources = resolve_resources(doc.document(), page_id).unwrap();
        let fonts = resources.get(b"Font").unwrap().as_dict().unwrap();
        assert!(fonts.has(b"F1"));
        assert!(fonts.has(b"FChkR"));

        let contents = doc
            .document()
            .get_object(page_id)
            .and_then(Object::as_dict)
            .and_then(|d| d.get(b"Contents"))
            .and_then(Object::as_array)
            .unwrap();
        assert_eq!(contents.len(), 4);

        // the second page still shares the original, untouched resources
        let other = doc.page_id(PageIndex::new(1)).unwrap();
        let other_resources = resolve_resources(doc.document(), other).unwrap();
        assert!(!other_resources.get(b"Font").unwrap().as_dict().unwrap().has(b"FChkR"));
    }

    #[test]
    fn test_invalid_page() {
        let doc = TemplateDocument::from_bytes(&sample_pdf()).unwrap();
        assert!(matches!(
            doc.page_id(PageIndex::new(5)),
            Err(Error::PdfInvalidPage { page: 5, total: 2 })
        ));
    }
}
