//! Greedy word wrapping against measured glyph widths.

use super::metrics::GlyphMetrics;

/// Wraps text to a width using a font's glyph metrics.
///
/// Without usable metrics (no face bound, or widths that are not finite and
/// positive) every operation falls back to literal newline splitting.
#[derive(Clone, Copy)]
pub struct TextMeasurer<'a> {
    metrics: Option<&'a dyn GlyphMetrics>,
}

impl<'a> TextMeasurer<'a> {
    pub const fn new(metrics: &'a dyn GlyphMetrics) -> Self {
        Self {
            metrics: Some(metrics),
        }
    }

    /// A measurer with no font bound; wrapping degrades to newline splitting.
    pub const fn unmeasured() -> Self {
        Self { metrics: None }
    }

    /// Measured width, or `None` when measurement is unavailable.
    pub fn measure(&self, text: &str, font_size: f32) -> Option<f32> {
        let width = self.metrics?.width(text, font_size);
        (width.is_finite() && width >= 0.0).then_some(width)
    }

    fn can_measure(&self, font_size: f32) -> bool {
        self.metrics
            .map(|m| m.width("M", font_size))
            .is_some_and(|w| w.is_finite() && w > 0.0)
    }

    fn fits(&self, text: &str, font_size: f32, max_width: f32) -> bool {
        self.measure(text, font_size).is_some_and(|w| w <= max_width)
    }

    /// Wrap `text` into lines no wider than `max_width` at `font_size`.
    ///
    /// Each newline-delimited paragraph wraps independently and a blank
    /// paragraph yields one empty line. Words wider than the line are split
    /// into character fragments. Trailing empty lines are dropped.
    pub fn wrap(&self, text: &str, font_size: f32, max_width: f32) -> Vec<String> {
        if !(max_width > 0.0 && max_width.is_finite()) || !self.can_measure(font_size) {
            return literal_lines(text);
        }

        let mut lines = Vec::new();
        for paragraph in text.split('\n') {
            let paragraph = paragraph.trim_end_matches('\r');
            if paragraph.trim().is_empty() {
                lines.push(String::new());
                continue;
            }

            let mut current = String::new();
            for word in paragraph.split_whitespace() {
                if !current.is_empty() {
                    let candidate = format!("{current} {word}");
                    if self.fits(&candidate, font_size, max_width) {
                        current = candidate;
                        continue;
                    }
                    lines.push(std::mem::take(&mut current));
                }

                if self.fits(word, font_size, max_width) {
                    current = word.to_string();
                } else {
                    let mut fragments = self.split_word(word, font_size, max_width);
                    current = fragments.pop().unwrap_or_default();
                    lines.extend(fragments);
                }
            }

            if !current.is_empty() {
                lines.push(current);
            }
        }

        strip_trailing_empty(&mut lines);
        lines
    }

    /// Split a single word into the fewest fragments that each fit.
    ///
    /// A fragment always holds at least one character, so this terminates even
    /// when a single glyph is wider than `max_width`.
    fn split_word(&self, word: &str, font_size: f32, max_width: f32) -> Vec<String> {
        let mut fragments = Vec::new();
        let mut current = String::new();

        for c in word.chars() {
            current.push(c);
            if current.chars().count() > 1 && !self.fits(&current, font_size, max_width) {
                current.pop();
                fragments.push(std::mem::take(&mut current));
                current.push(c);
            }
        }

        if !current.is_empty() {
            fragments.push(current);
        }
        fragments
    }

    /// Width of the widest line, or zero when measurement is unavailable.
    pub fn widest(&self, lines: &[String], font_size: f32) -> f32 {
        lines
            .iter()
            .filter_map(|line| self.measure(line, font_size))
            .fold(0.0, f32::max)
    }
}

/// Split on literal newlines only; the documents-as-is fallback.
fn literal_lines(text: &str) -> Vec<String> {
    let mut lines: Vec<String> = text
        .split('\n')
        .map(|line| line.trim_end_matches('\r').to_string())
        .collect();
    strip_trailing_empty(&mut lines);
    lines
}

fn strip_trailing_empty(lines: &mut Vec<String>) {
    while lines.last().is_some_and(|line| line.trim().is_empty()) {
        lines.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::StandardMetrics;

    fn measurer() -> TextMeasurer<'static> {
        TextMeasurer::new(&StandardMetrics::Helvetica)
    }

    struct BrokenMetrics;

    impl GlyphMetrics for BrokenMetrics {
        fn width(&self, _text: &str, _font_size: f32) -> f32 {
            f32::NAN
        }
    }

    #[test]
    fn test_wrap_basic() {
        // "Hello world" is 49.45pt at 10pt, each word about 23pt
        let lines = measurer().wrap("Hello world", 10.0, 30.0);
        assert_eq!(lines, vec!["Hello", "world"]);

        let lines = measurer().wrap("Hello world", 10.0, 60.0);
        assert_eq!(lines, vec!["Hello world"]);
    }

    #[test]
    fn test_every_line_fits() {
        let text = "Cabinet B2 fan replaced and tested under load for thirty minutes this morning";
        let m = measurer();
        for width in [40.0, 75.0, 150.0, 300.0] {
            for line in m.wrap(text, 10.0, width) {
                assert!(m.measure(&line, 10.0).unwrap() <= width, "{line:?} > {width}");
            }
        }
    }

    #[test]
    fn test_long_token_is_split() {
        let token = "x".repeat(200);
        let m = measurer();
        let lines = m.wrap(&token, 10.0, 50.0);
        assert!(lines.len() > 1);
        assert_eq!(lines.concat(), token);
        for line in &lines {
            assert!(m.measure(line, 10.0).unwrap() <= 50.0);
        }
    }

    #[test]
    fn test_glyph_wider_than_line_still_progresses() {
        let lines = measurer().wrap("WWW", 10.0, 1.0);
        assert_eq!(lines, vec!["W", "W", "W"]);
    }

    #[test]
    fn test_blank_paragraphs_preserved_trailing_stripped() {
        let lines = measurer().wrap("first\n\n  \nsecond\n\n\n", 10.0, 200.0);
        assert_eq!(lines, vec!["first", "", "", "second"]);
    }

    #[test]
    fn test_zero_width_falls_back_to_literal_lines() {
        let lines = measurer().wrap("one two\nthree\n", 10.0, 0.0);
        assert_eq!(lines, vec!["one two", "three"]);
    }

    #[test]
    fn test_unusable_metrics_fall_back() {
        let broken = BrokenMetrics;
        let lines = TextMeasurer::new(&broken).wrap("a b c\nd", 10.0, 5.0);
        assert_eq!(lines, vec!["a b c", "d"]);

        let lines = TextMeasurer::unmeasured().wrap("a b c", 10.0, 5.0);
        assert_eq!(lines, vec!["a b c"]);
    }
}
