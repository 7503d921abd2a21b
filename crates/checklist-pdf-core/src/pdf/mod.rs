pub(crate) mod acroform;
mod canvas;
pub(crate) mod document;
mod font;
mod image;
mod page_index;

pub use acroform::{Alignment, FieldCatalog, FieldDescriptor, FieldKind, FormField, Widget, WidgetField};
pub use canvas::{DrawOp, ImageHandle, PageCanvas};
pub use document::TemplateDocument;
pub use font::{EmbeddedFont, FontFace, FontSet, FontWeight};
pub use image::{MAX_IMAGE_BYTES, RasterImage};
pub use page_index::PageIndex;
