//! Shrink-to-fit layout for table cells whose height grows with content.

use super::field::LayoutPolicy;
use super::wrap::TextMeasurer;
use super::{DEFAULT_SHRINK_STEP, DEFAULT_WIDTH_TOLERANCE};

/// Wrapped content of one table cell.
#[derive(Debug, Clone, PartialEq)]
pub struct CellLayout {
    pub lines: Vec<String>,
    pub font_size: f32,
    pub line_height: f32,
    pub line_count: usize,
}

impl CellLayout {
    /// Height of the text block, excluding padding.
    pub fn height(&self) -> f32 {
        self.line_count as f32 * self.line_height
    }
}

/// Lays out cell text against a column width with no line ceiling.
///
/// Text is never truncated: if a line is still too wide at the minimum size
/// it is accepted as-is.
pub struct TableCellLayoutEngine<'a> {
    measurer: TextMeasurer<'a>,
    shrink_step: f32,
    tolerance: f32,
}

impl<'a> TableCellLayoutEngine<'a> {
    pub const fn new(measurer: TextMeasurer<'a>) -> Self {
        Self {
            measurer,
            shrink_step: DEFAULT_SHRINK_STEP,
            tolerance: DEFAULT_WIDTH_TOLERANCE,
        }
    }

    #[must_use]
    pub fn with_shrink_step(mut self, step: f32) -> Self {
        if step > 0.0 && step.is_finite() {
            self.shrink_step = step;
        }
        self
    }

    #[must_use]
    pub const fn with_tolerance(mut self, tolerance: f32) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub const fn measurer(&self) -> TextMeasurer<'a> {
        self.measurer
    }

    pub fn layout(&self, text: &str, max_width: f32, policy: &LayoutPolicy) -> CellLayout {
        let floor = policy.floor_font_size();
        let mut font_size = policy.font_size;

        loop {
            let lines = self.measurer.wrap(text, font_size, max_width);
            let widest = self.measurer.widest(&lines, font_size);

            if widest <= max_width + self.tolerance || font_size <= floor {
                let line_count = lines.len();
                return CellLayout {
                    lines,
                    font_size,
                    line_height: policy.line_height(font_size),
                    line_count,
                };
            }
            font_size = (font_size - self.shrink_step).max(floor);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::StandardMetrics;

    fn engine() -> TableCellLayoutEngine<'static> {
        TableCellLayoutEngine::new(TextMeasurer::new(&StandardMetrics::Helvetica))
    }

    #[test]
    fn test_cell_grows_instead_of_truncating() {
        let policy = LayoutPolicy::multiline(9.0, 7.0).with_line_height(1.2);
        let text = "Replaced compressor contactor and re-terminated supply cabling";
        let cell = engine().layout(text, 80.0, &policy);

        assert!(cell.line_count > 1);
        assert!((cell.font_size - 9.0).abs() < f32::EPSILON);
        assert_eq!(cell.lines.join(" "), text);
        assert!((cell.height() - cell.line_count as f32 * 10.8).abs() < 0.01);
    }

    #[test]
    fn test_wide_glyph_shrinks_to_minimum() {
        // a lone "W" is 9.44pt at 10pt; the column is narrower at every size down to 7pt
        let policy = LayoutPolicy::multiline(10.0, 7.0);
        let cell = engine().layout("W", 5.0, &policy);
        assert!((cell.font_size - 7.0).abs() < f32::EPSILON);
        assert_eq!(cell.lines, vec!["W"]);
    }

    #[test]
    fn test_shrinks_only_until_it_fits() {
        // "W" is 9.44pt wide at 10pt, 8.97pt at 9.5pt and 8.50pt at 9pt
        let policy = LayoutPolicy::multiline(10.0, 6.0);
        let cell = engine().layout("W", 8.5, &policy);
        assert!(cell.font_size < 10.0);
        assert!(cell.font_size >= 9.0 - f32::EPSILON);
    }

    #[test]
    fn test_empty_cell() {
        let cell = engine().layout("", 50.0, &LayoutPolicy::default());
        assert_eq!(cell.line_count, 0);
        assert!(cell.height().abs() < f32::EPSILON);
    }
}
