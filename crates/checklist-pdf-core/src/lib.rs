//! Checklist PDF Core Library
//!
//! This library fills a fixed-layout maintenance checklist template:
//! - Shrink-to-fit text layout for form fields and table cells
//! - Overflow appendix pages for text that does not fit
//! - Paginated summary pages (parts, team roster, sign-off, signatures)
//! - Image embedding and an audit record per generated document

pub mod assemble;
pub mod audit;
pub mod config;
pub mod error;
pub mod layout;
pub mod pdf;
pub mod render;
pub mod report;
pub mod util;

pub use assemble::{Assembly, AssemblyInput, DocumentAssembler};
pub use audit::{AuditRecord, EmployeeSummary, SkippedField};
pub use config::{AppConfig, ChecklistConfig, EmployeePolicy, FontConfig, LayoutConfig};
pub use error::{Error, Result};
pub use layout::{
    FieldLayoutResult, FieldTextLayoutEngine, GlyphMetrics, LayoutPolicy, Rectangle,
    TableCellLayoutEngine, TextMeasurer,
};
pub use pdf::{FieldCatalog, FieldDescriptor, FieldKind, FontSet, TemplateDocument};
pub use render::{OverflowEntry, OverflowPageAppender, OverflowPlacement, PaginatedSectionRenderer};
pub use report::{Attachment, BreakTier, ImageSlot, Submission};

use std::path::Path;

use tracing::debug;

/// Read and decode an image file for the given slot.
pub fn load_attachment(slot: ImageSlot, path: impl AsRef<Path>) -> Result<Attachment> {
    let path = path.as_ref();
    let bytes = std::fs::read(path)?;
    debug!(%slot, path = %path.display(), "loading attachment");
    Attachment::decode(slot, &bytes)
}

/// List the fields of a template file.
pub fn list_fields(path: impl AsRef<Path>) -> Result<Vec<FieldDescriptor>> {
    let doc = TemplateDocument::from_file(path)?;
    Ok(FieldCatalog::from_document(&doc)?.descriptors())
}
