//! Appendix pages for text that did not fit its form field.
//!
//! Entries are packed greedily in input order using a line budget: an entry
//! costs its body lines (measured in appendix base lines) plus a fixed
//! overhead for the label line and spacing. A new page starts when the next
//! entry would exceed the page capacity. Entries larger than a whole page
//! are split across pages with a `(cont.)` label.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::sections::CONTINUED_SUFFIX;
use crate::config::LayoutConfig;
use crate::error::Result;
use crate::layout::{LayoutPolicy, Rectangle, TableCellLayoutEngine, TextMeasurer};
use crate::pdf::{FontSet, FontWeight, PageCanvas, TemplateDocument};

/// Lines reserved at the top of every appendix page for the title.
const TITLE_LINES: usize = 2;
const ASCENT_RATIO: f32 = 0.8;

/// Text that did not fit its field.
#[derive(Debug, Clone, PartialEq)]
pub struct OverflowEntry {
    pub field: String,
    pub label: String,
    pub text: String,
    /// Size the field was finally rendered at
    pub font_size: f32,
}

/// Where an overflow entry landed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverflowPlacement {
    pub field: String,
    pub label: String,
    /// Page holding the start of the entry
    pub page_index: usize,
    /// Page holding its end; differs from `page_index` only for split entries
    pub last_page_index: usize,
    pub font_size: f32,
}

/// Appendix pages plus placements relative to the first of them.
#[derive(Debug, Clone, PartialEq)]
pub struct AppendixLayout {
    pub pages: Vec<PageCanvas>,
    pub placements: Vec<OverflowPlacement>,
}

pub struct OverflowPageAppender<'a> {
    fonts: &'a FontSet,
    layout: LayoutConfig,
    title: String,
}

impl<'a> OverflowPageAppender<'a> {
    pub fn new(fonts: &'a FontSet, layout: LayoutConfig) -> Self {
        Self {
            fonts,
            layout,
            title: "Additional Notes".to_string(),
        }
    }

    #[must_use]
    pub fn with_title(mut self, title: &str) -> Self {
        self.title = title.to_string();
        self
    }

    fn base_line_height(&self) -> f32 {
        self.layout.appendix_font_size * self.layout.line_height_multiplier
    }

    /// Entry lines available on one page below the title.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn capacity(&self, page_height: f32) -> usize {
        let usable = (page_height - 2.0 * self.layout.margin).max(0.0);
        let lines = (usable / self.base_line_height()).floor() as usize;
        lines
            .saturating_sub(TITLE_LINES)
            .max(self.layout.overflow_line_overhead + 1)
    }

    /// Budget charged for `lines` body lines drawn at `line_height`.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn line_cost(&self, lines: usize, line_height: f32) -> usize {
        let body = (lines as f32 * line_height / self.base_line_height()).ceil() as usize;
        body + self.layout.overflow_line_overhead
    }

    /// Body lines of `line_height` that fit in `units` base lines.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn lines_fitting(&self, units: usize, line_height: f32) -> usize {
        if line_height <= 0.0 {
            return units;
        }
        // small epsilon so exact multiples are not lost to float error
        ((units as f32 * self.base_line_height() + 0.001) / line_height).floor() as usize
    }

    /// Lay out entries onto appendix pages without touching a document.
    pub fn layout(&self, entries: &[OverflowEntry], page_width: f32, page_height: f32) -> AppendixLayout {
        let mut pass = AppendixPass {
            appender: self,
            page_width,
            page_height,
            capacity: self.capacity(page_height),
            pages: Vec::new(),
            used: 0,
        };
        let engine = TableCellLayoutEngine::new(TextMeasurer::new(self.fonts.face(FontWeight::Regular)))
            .with_shrink_step(self.layout.shrink_step)
            .with_tolerance(self.layout.width_tolerance);
        let width = (page_width - 2.0 * self.layout.margin).max(1.0);

        let mut placements = Vec::with_capacity(entries.len());
        for entry in entries {
            let policy = LayoutPolicy::multiline(
                entry.font_size,
                entry.font_size.min(self.layout.min_font_size),
            )
            .with_line_height(self.layout.line_height_multiplier);
            let cell = engine.layout(&entry.text, width, &policy);

            if pass.pages.is_empty() {
                pass.start_page();
            }
            let cost = self.line_cost(cell.line_count, cell.line_height);
            if pass.used > 0 && pass.used + cost > pass.capacity {
                pass.start_page();
            }

            let first_page = pass.pages.len() - 1;
            let mut remaining: &[String] = &cell.lines;
            let mut continued = false;
            loop {
                let free = pass
                    .capacity
                    .saturating_sub(pass.used + self.layout.overflow_line_overhead);
                let mut take = self.lines_fitting(free, cell.line_height).min(remaining.len());
                if take == 0 && !remaining.is_empty() {
                    if pass.used > 0 {
                        pass.start_page();
                        continue;
                    }
                    take = 1;
                }

                let (chunk, rest) = remaining.split_at(take);
                let label = if continued {
                    format!("{}{CONTINUED_SUFFIX}", entry.label)
                } else {
                    entry.label.clone()
                };
                pass.draw_entry(&label, chunk, cell.font_size, cell.line_height);

                remaining = rest;
                if remaining.is_empty() {
                    break;
                }
                pass.start_page();
                continued = true;
            }

            placements.push(OverflowPlacement {
                field: entry.field.clone(),
                label: entry.label.clone(),
                page_index: first_page,
                last_page_index: pass.pages.len() - 1,
                font_size: cell.font_size,
            });
        }

        debug!(
            entries = entries.len(),
            pages = pass.pages.len(),
            capacity = pass.capacity,
            "packed overflow appendix"
        );
        AppendixLayout {
            pages: pass.pages,
            placements,
        }
    }

    /// Append appendix pages to `doc` and return placements with absolute
    /// page indices.
    pub fn append(
        &self,
        doc: &mut TemplateDocument,
        entries: &[OverflowEntry],
        page_size: Rectangle,
    ) -> Result<Vec<OverflowPlacement>> {
        if entries.is_empty() {
            return Ok(Vec::new());
        }

        let AppendixLayout { pages, mut placements } =
            self.layout(entries, page_size.width, page_size.height);
        let first = doc.page_count();
        for canvas in &pages {
            let index = doc.append_page(page_size.width, page_size.height)?;
            doc.draw(index, canvas, self.fonts)?;
        }
        for placement in &mut placements {
            placement.page_index += first;
            placement.last_page_index += first;
        }

        info!(entries = entries.len(), pages = pages.len(), "appended overflow pages");
        Ok(placements)
    }
}

struct AppendixPass<'p, 'a> {
    appender: &'p OverflowPageAppender<'a>,
    page_width: f32,
    page_height: f32,
    capacity: usize,
    pages: Vec<PageCanvas>,
    /// Base lines consumed on the current page, title excluded
    used: usize,
}

impl AppendixPass<'_, '_> {
    fn start_page(&mut self) {
        let layout = &self.appender.layout;
        let mut canvas = PageCanvas::new(self.page_width, self.page_height);
        let title_size = layout.appendix_font_size + 4.0;
        canvas.text(
            layout.margin,
            self.page_height - layout.margin - title_size,
            title_size,
            FontWeight::Bold,
            &self.appender.title,
        );
        self.pages.push(canvas);
        self.used = 0;
    }

    /// Top of the next free base line on the current page.
    fn cursor_y(&self) -> f32 {
        let base = self.appender.base_line_height();
        self.page_height
            - self.appender.layout.margin
            - (TITLE_LINES + self.used) as f32 * base
    }

    fn draw_entry(&mut self, label: &str, lines: &[String], font_size: f32, line_height: f32) {
        let layout = self.appender.layout;
        let base = self.appender.base_line_height();
        let top = self.cursor_y();
        let cost = self.appender.line_cost(lines.len(), line_height);

        let Some(canvas) = self.pages.last_mut() else {
            return;
        };
        canvas.text(
            layout.margin,
            top - layout.appendix_font_size * ASCENT_RATIO,
            layout.appendix_font_size,
            FontWeight::Bold,
            label,
        );
        for (i, line) in lines.iter().enumerate() {
            let y = top - base - i as f32 * line_height - font_size * ASCENT_RATIO;
            canvas.text(layout.margin, y, font_size, FontWeight::Regular, line);
        }
        self.used += cost;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::pdf::DrawOp;

    const PAGE: (f32, f32) = (612.0, 792.0);

    fn entry(field: &str, text: &str) -> OverflowEntry {
        OverflowEntry {
            field: field.to_string(),
            label: format!("Label {field}"),
            text: text.to_string(),
            font_size: 10.0,
        }
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

    #[test]
    fn test_capacity_and_cost() {
        let fonts = FontSet::standard();
        let appender = OverflowPageAppender::new(&fonts, LayoutConfig::default());
        // (792 - 80) / 11.5 = 61.9 -> 61 lines, minus two title lines
        assert_eq!(appender.capacity(PAGE.1), 59);
        assert_eq!(appender.line_cost(1, 11.5), 3);
        assert_eq!(appender.line_cost(3, 10.35), 5);
    }

    #[test]
    fn test_greedy_packing_preserves_order() {
        let fonts = FontSet::standard();
        let appender = OverflowPageAppender::new(&fonts, LayoutConfig::default());
        let entries: Vec<OverflowEntry> =
            (0..20).map(|i| entry(&format!("f{i}"), "Short note")).collect();
        let layout = appender.layout(&entries, PAGE.0, PAGE.1);

        // 19 entries of cost 3 use 57 of 59 lines, the 20th starts page two
        assert_eq!(layout.pages.len(), 2);
        assert_eq!(layout.placements[18].page_index, 0);
        assert_eq!(layout.placements[19].page_index, 1);
        let fields: Vec<&str> = layout.placements.iter().map(|p| p.field.as_str()).collect();
        let expected: Vec<String> = (0..20).map(|i| format!("f{i}")).collect();
        assert_eq!(fields, expected.iter().map(String::as_str).collect::<Vec<_>>());
        assert!(
            layout
                .placements
                .windows(2)
                .all(|w| w[0].page_index <= w[1].page_index)
        );
    }

    #[test]
    fn test_oversized_entry_is_split() {
        let fonts = FontSet::standard();
        let appender = OverflowPageAppender::new(&fonts, LayoutConfig::default());
        let long = (1..=150).map(|i| format!("line {i}")).collect::<Vec<_>>().join("\n");
        let layout = appender.layout(&[entry("notes", &long), entry("after", "tail")], PAGE.0, PAGE.1);

        let placement = &layout.placements[0];
        assert_eq!(placement.page_index, 0);
        assert!(placement.last_page_index >= 2);
        assert!(texts(&layout.pages[1]).contains(&"Label notes (cont.)".to_string()));

        let all: Vec<String> = layout.pages.iter().flat_map(texts).collect();
        for i in 1..=150 {
            let line = format!("line {i}");
            assert_eq!(all.iter().filter(|t| **t == line).count(), 1);
        }
        assert!(layout.placements[1].page_index >= placement.last_page_index);
    }

    #[test]
    fn test_pages_carry_title() {
        let fonts = FontSet::standard();
        let appender = OverflowPageAppender::new(&fonts, LayoutConfig::default());
        let layout = appender.layout(&[entry("a", "text")], PAGE.0, PAGE.1);
        assert_eq!(texts(&layout.pages[0]), vec!["Additional Notes", "Label a", "text"]);
    }

    #[test]
    fn test_no_entries_no_pages() {
        let fonts = FontSet::standard();
        let appender = OverflowPageAppender::new(&fonts, LayoutConfig::default());
        let layout = appender.layout(&[], PAGE.0, PAGE.1);
        assert!(layout.pages.is_empty());
        assert!(layout.placements.is_empty());
    }
}
