//! Recorded drawing operations for one page.
//!
//! Layout code draws onto a [`PageCanvas`] without touching lopdf. The canvas
//! is turned into a content stream once the target page and its resources are
//! known.

use std::collections::BTreeSet;
use std::fmt::Write;

use super::font::{FontSet, FontWeight};
use crate::layout::Rectangle;

/// Reference to an image registered with a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ImageHandle(usize);

impl ImageHandle {
    pub(crate) const fn new(index: usize) -> Self {
        Self(index)
    }

    pub(crate) const fn index(self) -> usize {
        self.0
    }

    /// XObject resource name.
    pub fn resource_name(self) -> String {
        format!("Im{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    Text {
        x: f32,
        y: f32,
        font_size: f32,
        weight: FontWeight,
        text: String,
    },
    Rect {
        rect: Rectangle,
        fill_gray: Option<f32>,
        stroke: bool,
        line_width: f32,
    },
    Line {
        from: (f32, f32),
        to: (f32, f32),
        line_width: f32,
    },
    Image {
        handle: ImageHandle,
        rect: Rectangle,
    },
}

/// Drawing surface for a single page in PDF user space (origin bottom-left).
#[derive(Debug, Clone, PartialEq)]
pub struct PageCanvas {
    width: f32,
    height: f32,
    ops: Vec<DrawOp>,
}

impl PageCanvas {
    pub const fn new(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            ops: Vec::new(),
        }
    }

    pub const fn width(&self) -> f32 {
        self.width
    }

    pub const fn height(&self) -> f32 {
        self.height
    }

    pub fn ops(&self) -> &[DrawOp] {
        &self.ops
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn push(&mut self, op: DrawOp) {
        self.ops.push(op);
    }

    /// Draw one line of text with its baseline at `y`.
    pub fn text(&mut self, x: f32, y: f32, font_size: f32, weight: FontWeight, text: &str) {
        if text.is_empty() {
            return;
        }
        self.ops.push(DrawOp::Text {
            x,
            y,
            font_size,
            weight,
            text: text.to_string(),
        });
    }

    pub fn rect(&mut self, rect: Rectangle, fill_gray: Option<f32>, stroke: bool) {
        self.ops.push(DrawOp::Rect {
            rect,
            fill_gray,
            stroke,
            line_width: 0.5,
        });
    }

    pub fn line(&mut self, from: (f32, f32), to: (f32, f32), line_width: f32) {
        self.ops.push(DrawOp::Line {
            from,
            to,
            line_width,
        });
    }

    /// Two short strokes forming a tick inside `rect`.
    pub fn check_mark(&mut self, rect: Rectangle) {
        let line_width = (rect.width.min(rect.height) * 0.12).clamp(0.8, 2.0);
        let low = (rect.x + rect.width * 0.38, rect.y + rect.height * 0.2);
        self.line(
            (rect.x + rect.width * 0.18, rect.y + rect.height * 0.5),
            low,
            line_width,
        );
        self.line(
            low,
            (rect.x + rect.width * 0.85, rect.y + rect.height * 0.85),
            line_width,
        );
    }

    pub fn image(&mut self, handle: ImageHandle, rect: Rectangle) {
        self.ops.push(DrawOp::Image { handle, rect });
    }

    /// Images referenced by this canvas.
    pub fn images(&self) -> BTreeSet<ImageHandle> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                DrawOp::Image { handle, .. } => Some(*handle),
                _ => None,
            })
            .collect()
    }

    pub fn has_text(&self) -> bool {
        self.ops.iter().any(|op| matches!(op, DrawOp::Text { .. }))
    }

    /// Render the recorded operations as a content stream.
    pub fn to_content(&self, fonts: &FontSet) -> String {
        let mut content = String::new();
        content.push_str("q\n");

        for op in &self.ops {
            match op {
                DrawOp::Text {
                    x,
                    y,
                    font_size,
                    weight,
                    text,
                } => {
                    let hex = fonts.face(*weight).encode(text);
                    content.push_str("BT\n0 g\n0 Tr\n");
                    let _ = writeln!(content, "/{} {} Tf", weight.resource_name(), fmt_num(*font_size));
                    let _ = writeln!(content, "{} {} Td", fmt_num(*x), fmt_num(*y));
                    let _ = writeln!(content, "<{hex}> Tj");
                    content.push_str("ET\n");
                }
                DrawOp::Rect {
                    rect,
                    fill_gray,
                    stroke,
                    line_width,
                } => {
                    let path = format!(
                        "{} {} {} {} re",
                        fmt_num(rect.x),
                        fmt_num(rect.y),
                        fmt_num(rect.width),
                        fmt_num(rect.height)
                    );
                    if let Some(gray) = fill_gray {
                        let _ = writeln!(content, "{} g\n{path} f", fmt_num(*gray));
                    }
                    if *stroke {
                        let _ = writeln!(content, "0 G\n{} w\n{path} S", fmt_num(*line_width));
                    }
                }
                DrawOp::Line {
                    from,
                    to,
                    line_width,
                } => {
                    let _ = writeln!(
                        content,
                        "0 G\n{} w\n1 J\n{} {} m\n{} {} l\nS",
                        fmt_num(*line_width),
                        fmt_num(from.0),
                        fmt_num(from.1),
                        fmt_num(to.0),
                        fmt_num(to.1)
                    );
                }
                DrawOp::Image { handle, rect } => {
                    let _ = writeln!(
                        content,
                        "q\n{} 0 0 {} {} {} cm\n/{} Do\nQ",
                        fmt_num(rect.width),
                        fmt_num(rect.height),
                        fmt_num(rect.x),
                        fmt_num(rect.y),
                        handle.resource_name()
                    );
                }
            }
        }

        content.push_str("Q\n");
        content
    }
}

/// Format a coordinate with at most three decimals and no trailing zeros.
fn fmt_num(value: f32) -> String {
    if !value.is_finite() {
        return "0".to_string();
    }
    let formatted = format!("{value:.3}");
    let trimmed = formatted.trim_end_matches('0').trim_end_matches('.');
    if trimmed == "-0" || trimmed.is_empty() {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fmt_num() {
        assert_eq!(fmt_num(10.0), "10");
        assert_eq!(fmt_num(9.5), "9.5");
        assert_eq!(fmt_num(1.23456), "1.235");
        assert_eq!(fmt_num(-0.0001), "0");
        assert_eq!(fmt_num(f32::NAN), "0");
    }

    #[test]
    fn test_text_content() {
        let mut canvas = PageCanvas::new(612.0, 792.0);
        canvas.text(50.0, 700.0, 12.0, FontWeight::Bold, "Hi");
        let content = canvas.to_content(&FontSet::standard());
        assert!(content.starts_with("q\n"));
        assert!(content.contains("/FChkB 12 Tf"));
        assert!(content.contains("50 700 Td"));
        assert!(content.contains("<4869> Tj"));
        assert!(content.ends_with("Q\n"));
    }

    #[test]
    fn test_empty_text_is_not_recorded() {
        let mut canvas = PageCanvas::new(100.0, 100.0);
        canvas.text(0.0, 0.0, 10.0, FontWeight::Regular, "");
        assert!(canvas.is_empty());
    }

    #[test]
    fn test_check_mark_is_two_strokes() {
        let mut canvas = PageCanvas::new(100.0, 100.0);
        canvas.check_mark(Rectangle::new(10.0, 10.0, 10.0, 10.0));
        assert_eq!(canvas.ops().len(), 2);
        assert!(canvas.ops().iter().all(|op| matches!(op, DrawOp::Line { .. })));
    }

    #[test]
    fn test_rect_fill_and_stroke() {
        let mut canvas = PageCanvas::new(100.0, 100.0);
        canvas.rect(Rectangle::new(1.0, 2.0, 3.0, 4.0), Some(0.9), true);
        let content = canvas.to_content(&FontSet::standard());
        assert!(content.contains("0.9 g\n1 2 3 4 re f"));
        assert!(content.contains("1 2 3 4 re S"));
    }

    #[test]
    fn test_images_are_collected() {
        let mut canvas = PageCanvas::new(100.0, 100.0);
        canvas.image(ImageHandle::new(2), Rectangle::new(0.0, 0.0, 10.0, 10.0));
        canvas.image(ImageHandle::new(2), Rectangle::new(20.0, 0.0, 10.0, 10.0));
        assert_eq!(canvas.images().len(), 1);
        assert!(canvas.to_content(&FontSet::standard()).contains("/Im2 Do"));
    }
}
