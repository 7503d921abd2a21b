//! Page-producing stages: the paginated summary and the overflow appendix.

mod overflow;
mod sections;

pub use overflow::{AppendixLayout, OverflowEntry, OverflowPageAppender, OverflowPlacement};
pub use sections::{
    Block, CONTINUED_SUFFIX, Cell, Column, ImageRef, PaginatedSectionRenderer, PhotoTile, Section,
    SignaturePad, Table,
};
