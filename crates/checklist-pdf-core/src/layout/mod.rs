//! Text layout for fixed-size form rectangles and auto-sized table cells.
//!
//! # Coordinate System
//!
//! All geometry uses PDF page units with a **bottom-left origin**:
//! - (0, 0) is the bottom-left corner of the page
//! - X increases to the right
//! - Y increases upward
//!
//! A [`Rectangle`] is therefore anchored at its bottom-left corner and its
//! top edge is `y + height`.

mod cell;
mod field;
mod metrics;
mod style;
mod wrap;

pub use cell::{CellLayout, TableCellLayoutEngine};
pub use field::{FieldLayoutResult, FieldTextLayoutEngine, LayoutPolicy, WrappedLine};
pub use metrics::{GlyphMetrics, StandardMetrics};
pub use style::{PolicyOverride, StyleRule, StyleRules};
pub use wrap::TextMeasurer;

// =============================================================================
// Layout Constants
// =============================================================================

/// Font size decrement applied by every shrink-to-fit loop (in points).
pub const DEFAULT_SHRINK_STEP: f32 = 0.5;

/// Slack allowed when checking whether a cell line fits its column (in points).
pub const DEFAULT_WIDTH_TOLERANCE: f32 = 0.1;

/// Rectangle in page coordinates (origin bottom-left).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rectangle {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rectangle {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    /// Build from two opposite corners, as found in a PDF `/Rect` array.
    pub fn from_corners(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self {
            x: x0.min(x1),
            y: y0.min(y1),
            width: (x1 - x0).abs(),
            height: (y1 - y0).abs(),
        }
    }

    pub fn top(&self) -> f32 {
        self.y + self.height
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    /// Shrink by `padding` on every side, never going below zero size.
    pub fn inset(&self, padding: f32) -> Self {
        let dx = padding.min(self.width / 2.0);
        let dy = padding.min(self.height / 2.0);
        Self {
            x: self.x + dx,
            y: self.y + dy,
            width: self.width - 2.0 * dx,
            height: self.height - 2.0 * dy,
        }
    }

    /// Largest rectangle with the given aspect ratio, centred inside `self`.
    pub fn fit_aspect(&self, content_width: f32, content_height: f32) -> Self {
        if content_width <= 0.0 || content_height <= 0.0 {
            return *self;
        }
        let scale = (self.width / content_width).min(self.height / content_height);
        let width = content_width * scale;
        let height = content_height * scale;
        Self {
            x: self.x + (self.width - width) / 2.0,
            y: self.y + (self.height - height) / 2.0,
            width,
            height,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_corners_normalises() {
        let rect = Rectangle::from_corners(200.0, 700.0, 50.0, 680.0);
        assert_eq!(rect, Rectangle::new(50.0, 680.0, 150.0, 20.0));
        assert!((rect.top() - 700.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_inset_never_negative() {
        let rect = Rectangle::new(0.0, 0.0, 3.0, 10.0).inset(2.0);
        assert!(rect.width >= 0.0);
        assert!((rect.height - 6.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_fit_aspect_preserves_ratio() {
        let slot = Rectangle::new(0.0, 0.0, 200.0, 100.0);
        let fitted = slot.fit_aspect(400.0, 400.0);
        assert!((fitted.width - 100.0).abs() < 0.001);
        assert!((fitted.height - 100.0).abs() < 0.001);
        assert!((fitted.x - 50.0).abs() < 0.001);
    }
}
