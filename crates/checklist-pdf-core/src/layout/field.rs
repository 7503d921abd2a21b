//! Shrink-to-fit layout for bounded form-field rectangles.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::wrap::TextMeasurer;
use super::{DEFAULT_SHRINK_STEP, Rectangle};

/// Per-field text style.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LayoutPolicy {
    /// Starting font size
    pub font_size: f32,
    /// Smallest size the shrink loop may reach
    pub min_font_size: f32,
    /// Line height as a multiple of font size
    pub line_height_multiplier: f32,
    /// Whether more than one line may be shown
    pub multiline: bool,
}

impl LayoutPolicy {
    pub const fn single_line(font_size: f32, min_font_size: f32) -> Self {
        Self {
            font_size,
            min_font_size,
            line_height_multiplier: 1.15,
            multiline: false,
        }
    }

    pub const fn multiline(font_size: f32, min_font_size: f32) -> Self {
        Self {
            font_size,
            min_font_size,
            line_height_multiplier: 1.15,
            multiline: true,
        }
    }

    #[must_use]
    pub const fn with_line_height(mut self, multiplier: f32) -> Self {
        self.line_height_multiplier = multiplier;
        self
    }

    pub fn line_height(&self, font_size: f32) -> f32 {
        font_size * self.line_height_multiplier
    }

    /// Lower bound of the shrink loop, never above the starting size.
    pub fn floor_font_size(&self) -> f32 {
        self.min_font_size.min(self.font_size)
    }
}

impl Default for LayoutPolicy {
    fn default() -> Self {
        Self::single_line(10.0, 7.0)
    }
}

/// One rendered line and the size it is drawn at.
#[derive(Debug, Clone, PartialEq)]
pub struct WrappedLine {
    pub text: String,
    pub font_size: f32,
}

/// Outcome of fitting text into a rectangle.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldLayoutResult {
    /// Lines that fit, joined with `\n`
    pub fitted_text: String,
    /// Lines that did not fit, joined with `\n`; empty when everything fit
    pub overflow_text: String,
    pub total_line_count: usize,
    pub displayed_line_count: usize,
    pub applied_font_size: f32,
}

impl FieldLayoutResult {
    pub fn has_overflow(&self) -> bool {
        !self.overflow_text.is_empty()
    }

    /// Fitted lines paired with the applied font size, ready to draw.
    pub fn fitted_lines(&self) -> Vec<WrappedLine> {
        if self.displayed_line_count == 0 {
            return Vec::new();
        }
        self.fitted_text
            .split('\n')
            .map(|text| WrappedLine {
                text: text.to_string(),
                font_size: self.applied_font_size,
            })
            .collect()
    }
}

/// Fits free text into a fixed rectangle, shrinking the font before giving up
/// and reporting the remainder as overflow.
pub struct FieldTextLayoutEngine<'a> {
    measurer: TextMeasurer<'a>,
    shrink_step: f32,
}

impl<'a> FieldTextLayoutEngine<'a> {
    pub const fn new(measurer: TextMeasurer<'a>) -> Self {
        Self {
            measurer,
            shrink_step: DEFAULT_SHRINK_STEP,
        }
    }

    #[must_use]
    pub fn with_shrink_step(mut self, step: f32) -> Self {
        if step > 0.0 && step.is_finite() {
            self.shrink_step = step;
        }
        self
    }

    /// Lay out `text` inside `rect`.
    ///
    /// Starting at `policy.font_size`, the size drops by the shrink step while
    /// overflow remains, stopping at `policy.min_font_size`. The returned size
    /// is the last one tried.
    pub fn layout(&self, text: &str, rect: &Rectangle, policy: &LayoutPolicy) -> FieldLayoutResult {
        let floor = policy.floor_font_size();
        let mut font_size = policy.font_size;

        loop {
            let attempt = self.attempt(text, rect, policy, font_size);
            if !attempt.has_overflow() || font_size <= floor {
                debug!(
                    font_size,
                    displayed = attempt.displayed_line_count,
                    total = attempt.total_line_count,
                    "field layout settled"
                );
                return attempt;
            }
            font_size = (font_size - self.shrink_step).max(floor);
        }
    }

    fn attempt(
        &self,
        text: &str,
        rect: &Rectangle,
        policy: &LayoutPolicy,
        font_size: f32,
    ) -> FieldLayoutResult {
        let lines = self.measurer.wrap(text, font_size, rect.width);
        let total = lines.len();

        let budget = if policy.multiline {
            max_lines(rect.height, policy.line_height(font_size))
        } else {
            1
        };
        let displayed = total.min(budget);

        let (fitted, rest) = lines.split_at(displayed);
        let overflow: Vec<&str> = if policy.multiline {
            rest.iter()
                .map(String::as_str)
                .skip_while(|line| line.trim().is_empty())
                .collect()
        } else {
            rest.iter()
                .map(String::as_str)
                .filter(|line| !line.trim().is_empty())
                .collect()
        };

        FieldLayoutResult {
            fitted_text: fitted.join("\n"),
            overflow_text: overflow.join("\n"),
            total_line_count: total,
            displayed_line_count: displayed,
            applied_font_size: font_size,
        }
    }
}

/// Lines that fit a height, never less than one.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn max_lines(height: f32, line_height: f32) -> usize {
    if line_height > 0.0 && height.is_finite() {
        (height / line_height).floor().max(1.0) as usize
    } else {
        1
    }
}
