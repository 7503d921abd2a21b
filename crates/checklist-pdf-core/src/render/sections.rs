//! Multi-page summary rendering.
//!
//! Sections are drawn top to bottom onto as many pages as needed. When a
//! row or block does not fit above the bottom margin a new page is started,
//! the current section heading is repeated with a `(cont.)` suffix and, in
//! the middle of a table, the table header row is drawn again. A row taller
//! than the space left on a fresh page is split between its lines and carried
//! over, so no cell text ever runs past the bottom margin.

use tracing::debug;

use crate::config::LayoutConfig;
use crate::layout::{CellLayout, LayoutPolicy, Rectangle, TableCellLayoutEngine, TextMeasurer};
use crate::pdf::{FontSet, FontWeight, ImageHandle, PageCanvas};

const TITLE_SIZE: f32 = 16.0;
const TITLE_HEIGHT: f32 = 28.0;
const HEADING_SIZE: f32 = 12.0;
const HEADING_HEIGHT: f32 = 20.0;
const SECTION_GAP: f32 = 12.0;
const BLOCK_GAP: f32 = 6.0;
const CHECKBOX_SIZE: f32 = 9.0;
const SIGNATURE_PAD_HEIGHT: f32 = 70.0;
const PHOTO_HEIGHT: f32 = 180.0;
const CAPTION_HEIGHT: f32 = 14.0;
const COLUMN_GAP: f32 = 12.0;
const ASCENT_RATIO: f32 = 0.8;
const EPSILON: f32 = 0.01;

/// Heading suffix on continuation pages.
pub const CONTINUED_SUFFIX: &str = " (cont.)";

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Check(bool),
}

impl Cell {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub heading: String,
    /// Share of the content width relative to the other columns
    pub weight: f32,
}

impl Column {
    pub fn new(heading: &str, weight: f32) -> Self {
        Self {
            heading: heading.to_string(),
            weight,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub columns: Vec<Column>,
    /// Whether the column headings form a header row
    pub header: bool,
    pub rows: Vec<Vec<Cell>>,
}

impl Table {
    pub const fn new(columns: Vec<Column>, rows: Vec<Vec<Cell>>) -> Self {
        Self {
            columns,
            header: true,
            rows,
        }
    }

    /// A two-column label/value table without a header row.
    pub fn key_values(pairs: Vec<(String, String)>) -> Self {
        Self {
            columns: vec![Column::new("", 1.5), Column::new("", 3.5)],
            header: false,
            rows: pairs
                .into_iter()
                .map(|(k, v)| vec![Cell::Text(k), Cell::Text(v)])
                .collect(),
        }
    }
}

/// A placed image plus its pixel size, for aspect-preserving fits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageRef {
    pub handle: ImageHandle,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SignaturePad {
    pub label: String,
    pub name: String,
    pub image: Option<ImageRef>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PhotoTile {
    pub caption: String,
    pub image: ImageRef,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Table(Table),
    Paragraph(String),
    Signatures(Vec<SignaturePad>),
    Photos(Vec<PhotoTile>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    pub heading: String,
    pub blocks: Vec<Block>,
}

impl Section {
    pub fn new(heading: &str, blocks: Vec<Block>) -> Self {
        Self {
            heading: heading.to_string(),
            blocks,
        }
    }
}

/// Position of the pen while drawing.
///
/// A page break replaces the cursor wholesale. `content_top` is the first
/// usable y on the page, below any title or repeated headings, and lets
/// [`RenderPass::ensure_space`] refuse to break an untouched page.
#[derive(Debug, Clone, Copy, PartialEq)]
struct PageCursor {
    page: usize,
    y: f32,
    content_top: f32,
}

impl PageCursor {
    fn is_fresh(&self) -> bool {
        self.y >= self.content_top - EPSILON
    }
}

enum CellContent {
    Lines(CellLayout),
    Check(bool),
    /// Continuation of a split row where the cell had nothing left
    Empty,
}

struct RowLayout {
    height: f32,
    cells: Vec<CellContent>,
}

impl RowLayout {
    /// Height of the row when only its first line is kept.
    fn first_line_height(&self, base: f32, padding: f32) -> f32 {
        self.cells
            .iter()
            .map(|content| match content {
                CellContent::Lines(cell) if !cell.lines.is_empty() => {
                    cell.line_height + 2.0 * padding
                }
                CellContent::Check(_) => CHECKBOX_SIZE + 2.0 * padding,
                _ => 0.0,
            })
            .fold(base, f32::max)
    }
}

/// Whole lines of `line_height` that fit in `height`.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn lines_within(height: f32, line_height: f32) -> usize {
    if line_height <= 0.0 {
        return 0;
    }
    ((height + EPSILON) / line_height).floor().max(0.0) as usize
}

/// Keep the first `keep` lines of a cell, returning the rest.
fn split_cell(cell: &CellLayout, keep: usize) -> (CellLayout, CellLayout) {
    let keep = keep.min(cell.lines.len());
    let part = |lines: &[String]| CellLayout {
        lines: lines.to_vec(),
        font_size: cell.font_size,
        line_height: cell.line_height,
        line_count: lines.len(),
    };
    (part(&cell.lines[..keep]), part(&cell.lines[keep..]))
}

/// Draws section descriptors onto pages of a fixed size.
pub struct PaginatedSectionRenderer<'a> {
    fonts: &'a FontSet,
    layout: LayoutConfig,
    title: String,
    page_width: f32,
    page_height: f32,
}

impl<'a> PaginatedSectionRenderer<'a> {
    pub fn new(fonts: &'a FontSet, layout: LayoutConfig, page_width: f32, page_height: f32) -> Self {
        Self {
            fonts,
            layout,
            title: "Maintenance Summary".to_string(),
            page_width,
            page_height,
        }
    }

    #[must_use]
    pub fn with_title(mut self, title: &str) -> Self {
        self.title = title.to_string();
        self
    }

    fn content_width(&self) -> f32 {
        (self.page_width - 2.0 * self.layout.margin).max(1.0)
    }

    /// Height between the margins of an empty page.
    fn usable_height(&self) -> f32 {
        (self.page_height - 2.0 * self.layout.margin).max(1.0)
    }

    fn engine(&self, weight: FontWeight) -> TableCellLayoutEngine<'a> {
        TableCellLayoutEngine::new(TextMeasurer::new(self.fonts.face(weight)))
            .with_shrink_step(self.layout.shrink_step)
            .with_tolerance(self.layout.width_tolerance)
    }

    /// Render every section; always returns at least the title page.
    pub fn render(&self, sections: &[Section]) -> Vec<PageCanvas> {
        let mut pass = RenderPass::start(self);
        for section in sections {
            pass.section(section);
        }
        debug!(sections = sections.len(), pages = pass.pages.len(), "rendered summary");
        pass.pages
    }
}

/// State of one render call.
struct RenderPass<'r, 'a> {
    renderer: &'r PaginatedSectionRenderer<'a>,
    regular: TableCellLayoutEngine<'a>,
    bold: TableCellLayoutEngine<'a>,
    cell_policy: LayoutPolicy,
    pages: Vec<PageCanvas>,
    cursor: PageCursor,
    heading: Option<String>,
}

impl<'r, 'a> RenderPass<'r, 'a> {
    fn start(renderer: &'r PaginatedSectionRenderer<'a>) -> Self {
        let mut pass = Self {
            renderer,
            regular: renderer.engine(FontWeight::Regular),
            bold: renderer.engine(FontWeight::Bold),
            cell_policy: renderer.layout.cell_policy(),
            pages: Vec::new(),
            cursor: PageCursor {
                page: 0,
                y: 0.0,
                content_top: 0.0,
            },
            heading: None,
        };
        pass.new_page();
        let margin = renderer.layout.margin;
        let baseline = pass.cursor.y - TITLE_SIZE;
        pass.canvas()
            .text(margin, baseline, TITLE_SIZE, FontWeight::Bold, &renderer.title);
        pass.cursor.y -= TITLE_HEIGHT;
        pass.cursor.content_top = pass.cursor.y;
        pass
    }

    fn margin(&self) -> f32 {
        self.renderer.layout.margin
    }

    fn canvas(&mut self) -> &mut PageCanvas {
        let index = self.cursor.page;
        &mut self.pages[index]
    }

    fn new_page(&mut self) {
        self.pages
            .push(PageCanvas::new(self.renderer.page_width, self.renderer.page_height));
        let top = self.renderer.page_height - self.margin();
        self.cursor = PageCursor {
            page: self.pages.len() - 1,
            y: top,
            content_top: top,
        };
    }

    /// Break the page if `required` does not fit above the bottom margin.
    ///
    /// On a break the section heading is repeated with `(cont.)` and, when
    /// `table` is given, its header row is redrawn. Returns whether a break
    /// happened. A page with nothing drawn on it yet is never broken.
    fn ensure_space(&mut self, required: f32, table: Option<&Table>) -> bool {
        if self.cursor.y - required >= self.margin() - EPSILON || self.cursor.is_fresh() {
            return false;
        }
        self.break_page(table);
        true
    }

    /// Start a continuation page for the current section.
    fn break_page(&mut self, table: Option<&Table>) {
        self.new_page();
        if let Some(heading) = self.heading.clone() {
            self.draw_heading(&format!("{heading}{CONTINUED_SUFFIX}"));
        }
        if let Some(table) = table
            && table.header
        {
            let widths = self.column_widths(table);
            let header = self.header_layout(table, &widths);
            self.draw_row(&header, &widths, true);
        }
        self.cursor.content_top = self.cursor.y;
    }

    fn draw_heading(&mut self, text: &str) {
        let x = self.margin();
        let baseline = self.cursor.y - HEADING_SIZE;
        self.canvas().text(x, baseline, HEADING_SIZE, FontWeight::Bold, text);
        self.cursor.y -= HEADING_HEIGHT;
    }

    fn section(&mut self, section: &Section) {
        // Keep the heading with the start of the first block
        self.heading = None;
        let lead = section
            .blocks
            .first()
            .map_or(0.0, |block| self.leading_height(block));
        self.ensure_space(HEADING_HEIGHT + lead, None);

        self.draw_heading(&section.heading);
        self.heading = Some(section.heading.clone());

        for (i, block) in section.blocks.iter().enumerate() {
            if i > 0 {
                self.cursor.y -= BLOCK_GAP;
            }
            match block {
                Block::Table(table) => self.table(table),
                Block::Paragraph(text) => self.paragraph(text),
                Block::Signatures(pads) => self.signatures(pads),
                Block::Photos(tiles) => self.photos(tiles),
            }
        }

        self.heading = None;
        self.cursor.y -= SECTION_GAP;
    }

    /// Height that must follow a heading on the same page.
    fn leading_height(&self, block: &Block) -> f32 {
        match block {
            Block::Table(table) => {
                let widths = self.column_widths(table);
                let header = if table.header {
                    self.header_layout(table, &widths).height
                } else {
                    0.0
                };
                let first = table
                    .rows
                    .first()
                    .map_or(0.0, |row| self.lead_height(&self.row_layout(row, &widths)));
                header + first
            }
            Block::Paragraph(_) => self.cell_policy.line_height(self.cell_policy.font_size),
            Block::Signatures(_) => signature_row_height(),
            Block::Photos(_) => PHOTO_HEIGHT + CAPTION_HEIGHT,
        }
    }

    fn column_widths(&self, table: &Table) -> Vec<f32> {
        let total: f32 = table.columns.iter().map(|c| c.weight.max(0.0)).sum();
        let width = self.renderer.content_width();
        if total <= 0.0 {
            let n = table.columns.len().max(1) as f32;
            return table.columns.iter().map(|_| width / n).collect();
        }
        table
            .columns
            .iter()
            .map(|c| width * c.weight.max(0.0) / total)
            .collect()
    }

    fn layout_cells(
        &self,
        cells: &[Cell],
        widths: &[f32],
        engine: &TableCellLayoutEngine<'a>,
    ) -> RowLayout {
        let padding = self.renderer.layout.cell_padding;
        let mut height = self.renderer.layout.base_row_height;
        let contents = cells
            .iter()
            .zip(widths)
            .map(|(cell, width)| match cell {
                Cell::Text(text) => {
                    let laid_out = engine.layout(text, width - 2.0 * padding, &self.cell_policy);
                    height = height.max(laid_out.height() + 2.0 * padding);
                    CellContent::Lines(laid_out)
                }
                Cell::Check(checked) => {
                    height = height.max(CHECKBOX_SIZE + 2.0 * padding);
                    CellContent::Check(*checked)
                }
            })
            .collect();
        RowLayout {
            height,
            cells: contents,
        }
    }

    /// Space a row needs below its heading before the page may start it.
    ///
    /// Rows taller than a page are split anyway, so one line is enough.
    fn lead_height(&self, row: &RowLayout) -> f32 {
        if row.height > self.renderer.usable_height() {
            let layout = &self.renderer.layout;
            row.first_line_height(layout.base_row_height, layout.cell_padding)
        } else {
            row.height
        }
    }

    fn row_layout(&self, row: &[Cell], widths: &[f32]) -> RowLayout {
        self.layout_cells(row, widths, &self.regular)
    }

    fn header_layout(&self, table: &Table, widths: &[f32]) -> RowLayout {
        let cells: Vec<Cell> = table
            .columns
            .iter()
            .map(|c| Cell::Text(c.heading.clone()))
            .collect();
        self.layout_cells(&cells, widths, &self.bold)
    }

    fn table(&mut self, table: &Table) {
        let widths = self.column_widths(table);

        if table.header {
            let header = self.header_layout(table, &widths);
            let first = table
                .rows
                .first()
                .map_or(0.0, |row| self.lead_height(&self.row_layout(row, &widths)));
            if !self.ensure_space(header.height + first, Some(table)) {
                self.draw_row(&header, &widths, true);
            }
        }

        for row in &table.rows {
            let laid_out = self.row_layout(row, &widths);
            if laid_out.height <= self.renderer.usable_height() {
                self.ensure_space(laid_out.height, Some(table));
            }
            self.draw_split_row(laid_out, &widths, table);
        }
    }

    /// Draw a row, continuing it on new pages while it does not fit.
    fn draw_split_row(&mut self, row: RowLayout, widths: &[f32], table: &Table) {
        let mut pending = row;
        loop {
            let available = self.cursor.y - self.margin();
            let (head, rest) = self.split_row(pending, available, self.cursor.is_fresh());
            if let Some(head) = head {
                self.draw_row(&head, widths, false);
            }
            match rest {
                Some(rest) => {
                    self.break_page(Some(table));
                    pending = rest;
                }
                None => break,
            }
        }
    }

    /// Cut a row so its first part fits in `available`.
    ///
    /// Returns the part to draw now and the remainder, if any. A fresh page
    /// always takes at least one line of every cell.
    fn split_row(
        &self,
        row: RowLayout,
        available: f32,
        fresh: bool,
    ) -> (Option<RowLayout>, Option<RowLayout>) {
        if row.height <= available + EPSILON {
            return (Some(row), None);
        }

        let layout = &self.renderer.layout;
        let padding = layout.cell_padding;
        let keeps: Vec<usize> = row
            .cells
            .iter()
            .map(|content| match content {
                CellContent::Lines(cell) => {
                    let fits = lines_within(available - 2.0 * padding, cell.line_height);
                    if fresh { fits.max(1) } else { fits }
                }
                _ => 0,
            })
            .collect();
        let starved = row.cells.iter().zip(&keeps).any(|(content, keep)| {
            matches!(content, CellContent::Lines(cell) if *keep == 0 && !cell.lines.is_empty())
        });
        if starved {
            return (None, Some(row));
        }

        let mut head = Vec::with_capacity(row.cells.len());
        let mut rest = Vec::with_capacity(row.cells.len());
        let mut head_height = layout.base_row_height;
        let mut rest_height = layout.base_row_height;
        let mut carried = false;

        for (content, keep) in row.cells.iter().zip(keeps) {
            match content {
                CellContent::Lines(cell) => {
                    let (now, later) = split_cell(cell, keep);
                    head_height = head_height.max(now.height() + 2.0 * padding);
                    if !later.lines.is_empty() {
                        carried = true;
                        rest_height = rest_height.max(later.height() + 2.0 * padding);
                    }
                    head.push(CellContent::Lines(now));
                    rest.push(CellContent::Lines(later));
                }
                CellContent::Check(checked) => {
                    head_height = head_height.max(CHECKBOX_SIZE + 2.0 * padding);
                    head.push(CellContent::Check(*checked));
                    rest.push(CellContent::Empty);
                }
                CellContent::Empty => {
                    head.push(CellContent::Empty);
                    rest.push(CellContent::Empty);
                }
            }
        }

        if !carried {
            return (Some(row), None);
        }
        debug!(available, remaining = rest_height, "split table row across pages");
        let head = RowLayout {
            height: head_height,
            cells: head,
        };
        let rest = RowLayout {
            height: rest_height,
            cells: rest,
        };
        (Some(head), Some(rest))
    }

    fn draw_row(&mut self, row: &RowLayout, widths: &[f32], header: bool) {
        let padding = self.renderer.layout.cell_padding;
        let top = self.cursor.y;
        let mut x = self.margin();
        let weight = if header {
            FontWeight::Bold
        } else {
            FontWeight::Regular
        };

        for (content, width) in row.cells.iter().zip(widths) {
            let rect = Rectangle::new(x, top - row.height, *width, row.height);
            let canvas = self.canvas();
            canvas.rect(rect, header.then_some(0.9), true);

            match content {
                CellContent::Lines(cell) => {
                    let first = top - padding - cell.font_size * ASCENT_RATIO;
                    for (i, line) in cell.lines.iter().enumerate() {
                        let y = first - i as f32 * cell.line_height;
                        canvas.text(x + padding, y, cell.font_size, weight, line);
                    }
                }
                CellContent::Check(checked) => {
                    let square = Rectangle::new(
                        x + (width - CHECKBOX_SIZE) / 2.0,
                        top - (row.height + CHECKBOX_SIZE) / 2.0,
                        CHECKBOX_SIZE,
                        CHECKBOX_SIZE,
                    );
                    canvas.rect(square, None, true);
                    if *checked {
                        canvas.check_mark(square);
                    }
                }
                CellContent::Empty => {}
            }
            x += width;
        }
        self.cursor.y -= row.height;
    }

    fn paragraph(&mut self, text: &str) {
        let laid_out = self
            .regular
            .layout(text, self.renderer.content_width(), &self.cell_policy);
        let x = self.margin();
        for line in &laid_out.lines {
            self.ensure_space(laid_out.line_height, None);
            let baseline = self.cursor.y - laid_out.font_size * ASCENT_RATIO;
            self.canvas()
                .text(x, baseline, laid_out.font_size, FontWeight::Regular, line);
            self.cursor.y -= laid_out.line_height;
        }
    }

    fn signatures(&mut self, pads: &[SignaturePad]) {
        let width = (self.renderer.content_width() - COLUMN_GAP) / 2.0;
        let font_size = self.cell_policy.font_size;

        for pair in pads.chunks(2) {
            self.ensure_space(signature_row_height(), None);
            let top = self.cursor.y;
            for (i, pad) in pair.iter().enumerate() {
                let x = self.margin() + i as f32 * (width + COLUMN_GAP);
                let canvas = self.canvas();
                canvas.text(x, top - font_size, font_size, FontWeight::Bold, &pad.label);

                let rect = Rectangle::new(
                    x,
                    top - CAPTION_HEIGHT - SIGNATURE_PAD_HEIGHT,
                    width,
                    SIGNATURE_PAD_HEIGHT,
                );
                canvas.rect(rect, None, true);
                if let Some(image) = pad.image {
                    let placed = rect
                        .inset(4.0)
                        .fit_aspect(image.width as f32, image.height as f32);
                    canvas.image(image.handle, placed);
                }

                if !pad.name.is_empty() {
                    let baseline = rect.y - font_size - 2.0;
                    canvas.text(x, baseline, font_size, FontWeight::Regular, &pad.name);
                }
            }
            self.cursor.y -= signature_row_height();
        }
    }

    fn photos(&mut self, tiles: &[PhotoTile]) {
        let width = (self.renderer.content_width() - COLUMN_GAP) / 2.0;
        let font_size = self.cell_policy.font_size;

        for pair in tiles.chunks(2) {
            self.ensure_space(PHOTO_HEIGHT + CAPTION_HEIGHT, None);
            let top = self.cursor.y;
            for (i, tile) in pair.iter().enumerate() {
                let x = self.margin() + i as f32 * (width + COLUMN_GAP);
                let rect = Rectangle::new(x, top - PHOTO_HEIGHT, width, PHOTO_HEIGHT);
                let placed = rect
                    .inset(4.0)
                    .fit_aspect(tile.image.width as f32, tile.image.height as f32);
                let canvas = self.canvas();
                canvas.rect(rect, None, true);
                canvas.image(tile.image.handle, placed);
                canvas.text(x, rect.y - font_size - 2.0, font_size, FontWeight::Regular, &tile.caption);
            }
            self.cursor.y -= PHOTO_HEIGHT + CAPTION_HEIGHT + BLOCK_GAP;
        }
    }
}

const fn signature_row_height() -> f32 {
    CAPTION_HEIGHT + SIGNATURE_PAD_HEIGHT + CAPTION_HEIGHT + BLOCK_GAP
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::pdf::DrawOp;

    const PAGE: (f32, f32) = (612.0, 792.0);

    fn renderer(fonts: &FontSet) -> PaginatedSectionRenderer<'_> {
        PaginatedSectionRenderer::new(fonts, LayoutConfig::default(), PAGE.0, PAGE.1)
    }

    fn texts(canvas: &PageCanvas) -> Vec<String> {
        canvas
            .ops()
            .iter()
            .filter_map(|op| match op {
                DrawOp::Text { text, .. } => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    fn parts_table(rows: usize) -> Table {
        Table::new(
            vec![
                Column::new("Part No.", 1.0),
                Column::new("Description", 3.0),
                Column::new("Qty", 0.6),
            ],
            (0..rows)
                .map(|i| {
                    vec![
                        Cell::text(format!("P-{i}")),
                        Cell::text("Filter"),
                        Cell::text("1"),
                    ]
                })
                .collect(),
        )
    }

    #[test]
    fn test_empty_render_is_title_page() {
        let fonts = FontSet::standard();
        let pages = renderer(&fonts).render(&[]);
        assert_eq!(pages.len(), 1);
        assert_eq!(texts(&pages[0]), vec!["Maintenance Summary"]);
    }

    #[test]
    fn test_small_table_fits_one_page() {
        let fonts = FontSet::standard();
        let section = Section::new("Parts Used", vec![Block::Table(parts_table(3))]);
        let pages = renderer(&fonts).render(&[section]);
        assert_eq!(pages.len(), 1);
        let text = texts(&pages[0]);
        assert!(text.contains(&"Parts Used".to_string()));
        assert!(text.contains(&"P-2".to_string()));
    }

    #[test]
    fn test_continuation_repeats_heading_and_header() {
        let fonts = FontSet::standard();
        let section = Section::new("Parts Used", vec![Block::Table(parts_table(80))]);
        let pages = renderer(&fonts).render(&[section]);
        assert!(pages.len() >= 2);

        for page in &pages[1..] {
            let text = texts(page);
            assert_eq!(text[0], "Parts Used (cont.)");
            assert_eq!(text[1], "Part No.");
        }

        // every row appears exactly once across all pages
        let all: Vec<String> = pages.iter().flat_map(texts).collect();
        for i in 0..80 {
            let label = format!("P-{i}");
            assert_eq!(all.iter().filter(|t| **t == label).count(), 1, "{label}");
        }
    }

    #[test]
    fn test_rows_stay_above_bottom_margin() {
        let fonts = FontSet::standard();
        let margin = LayoutConfig::default().margin;
        let section = Section::new("Parts Used", vec![Block::Table(parts_table(120))]);
        for page in renderer(&fonts).render(&[section]) {
            for op in page.ops() {
                if let DrawOp::Rect { rect, .. } = op {
                    assert!(rect.y >= margin - 0.5, "row at {} below margin", rect.y);
                }
            }
        }
    }

    #[test]
    fn test_pagination_is_deterministic() {
        let fonts = FontSet::standard();
        let sections = vec![
            Section::new("Parts Used", vec![Block::Table(parts_table(70))]),
            Section::new(
                "Notes",
                vec![Block::Paragraph("Checked all units. ".repeat(40))],
            ),
        ];
        let first = renderer(&fonts).render(&sections);
        let second = renderer(&fonts).render(&sections);
        assert_eq!(first, second);

        let more = vec![Section::new("Parts Used", vec![Block::Table(parts_table(140))])];
        assert!(renderer(&fonts).render(&more).len() >= first.len());
    }

    #[test]
    fn test_tall_row_is_split_between_margins() {
        let fonts = FontSet::standard();
        let margin = LayoutConfig::default().margin;
        let tall = (0..200).map(|i| format!("line {i}")).collect::<Vec<_>>().join("\n");
        let table = Table::new(
            vec![Column::new("Notes", 3.0), Column::new("Done", 1.0)],
            vec![
                vec![Cell::text(tall), Cell::Check(true)],
                vec![Cell::text("after"), Cell::Check(false)],
            ],
        );
        let pages = renderer(&fonts).render(&[Section::new("Engineer Notes", vec![Block::Table(table)])]);
        assert!(pages.len() >= 3);

        for page in &pages {
            for op in page.ops() {
                match op {
                    DrawOp::Text { y, text, .. } => {
                        assert!(*y >= margin && *y <= PAGE.1 - margin, "'{text}' drawn at {y}");
                    }
                    DrawOp::Rect { rect, .. } => {
                        assert!(rect.y >= margin - 0.5, "cell at {} below margin", rect.y);
                    }
                    _ => {}
                }
            }
        }
        for page in &pages[1..] {
            let text = texts(page);
            assert_eq!(text[0], "Engineer Notes (cont.)");
            assert_eq!(text[1], "Notes");
        }

        let all: Vec<String> = pages.iter().flat_map(texts).collect();
        for i in 0..200 {
            let label = format!("line {i}");
            assert_eq!(all.iter().filter(|t| **t == label).count(), 1, "{label}");
        }
        assert!(texts(pages.last().unwrap()).contains(&"after".to_string()));

        // the check mark belongs to the first part of the split row only
        let strokes: usize = pages
            .iter()
            .map(|page| {
                page.ops()
                    .iter()
                    .filter(|op| matches!(op, DrawOp::Line { .. }))
                    .count()
            })
            .sum();
        assert_eq!(strokes, 2);
    }

    #[test]
    fn test_check_cells() {
        let fonts = FontSet::standard();
        let table = Table::new(
            vec![Column::new("Statement", 4.0), Column::new("Confirmed", 1.0)],
            vec![
                vec![Cell::text("Work complete"), Cell::Check(true)],
                vec![Cell::text("Area clean"), Cell::Check(false)],
            ],
        );
        let pages = renderer(&fonts).render(&[Section::new("Sign-Off Checklist", vec![Block::Table(table)])]);
        let strokes = pages[0]
            .ops()
            .iter()
            .filter(|op| matches!(op, DrawOp::Line { .. }))
            .count();
        assert_eq!(strokes, 2);
    }

    #[test]
    fn test_key_values_have_no_header() {
        let fonts = FontSet::standard();
        let table = Table::key_values(vec![("Engineer name".into(), "Jo Bloggs".into())]);
        let pages = renderer(&fonts).render(&[Section::new("Sign-Off Details", vec![Block::Table(table)])]);
        let fills = pages[0]
            .ops()
            .iter()
            .filter(|op| matches!(op, DrawOp::Rect { fill_gray: Some(_), .. }))
            .count();
        assert_eq!(fills, 0);
    }
}
