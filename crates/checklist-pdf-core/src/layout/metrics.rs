//! Glyph width measurement.
//!
//! The built-in tables are the AFM advance widths of the PDF standard
//! Helvetica faces for ASCII 0x20..=0x7E, in 1/1000 em. Characters outside
//! that range fall back to an average width, which is close enough for
//! Latin-1 accented letters.

/// Measures rendered text width for one font face.
///
/// Implementations must be pure: the same text and size always produce the
/// same width, and appending non-empty text never makes the width shrink.
pub trait GlyphMetrics: Send + Sync {
    /// Width of `text` in points at `font_size`.
    fn width(&self, text: &str, font_size: f32) -> f32;
}

/// Metrics for the standard 14 Helvetica faces that need no embedding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StandardMetrics {
    Helvetica,
    HelveticaBold,
}

/// Fallback advance for characters outside the ASCII table.
const FALLBACK_WIDTH: u16 = 556;

#[rustfmt::skip]
const HELVETICA_WIDTHS: [u16; 95] = [
    // sp    !    "    #    $    %    &    '    (    )    *    +    ,    -    .    /
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    // 0    1    2    3    4    5    6    7    8    9
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556,
    // :    ;    <    =    >    ?    @
    278, 278, 584, 584, 584, 556, 1015,
    // A    B    C    D    E    F    G    H    I    J    K    L    M
    667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833,
    // N    O    P    Q    R    S    T    U    V    W    X    Y    Z
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611,
    // [    \    ]    ^    _    `
    278, 278, 278, 469, 556, 333,
    // a    b    c    d    e    f    g    h    i    j    k    l    m
    556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833,
    // n    o    p    q    r    s    t    u    v    w    x    y    z
    556, 556, 556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500,
    // {    |    }    ~
    334, 260, 334, 584,
];

#[rustfmt::skip]
const HELVETICA_BOLD_WIDTHS: [u16; 95] = [
    // sp    !    "    #    $    %    &    '    (    )    *    +    ,    -    .    /
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    // 0    1    2    3    4    5    6    7    8    9
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556,
    // :    ;    <    =    >    ?    @
    333, 333, 584, 584, 584, 611, 975,
    // A    B    C    D    E    F    G    H    I    J    K    L    M
    722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833,
    // N    O    P    Q    R    S    T    U    V    W    X    Y    Z
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611,
    // [    \    ]    ^    _    `
    333, 278, 333, 584, 556, 333,
    // a    b    c    d    e    f    g    h    i    j    k    l    m
    556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889,
    // n    o    p    q    r    s    t    u    v    w    x    y    z
    611, 611, 611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500,
    // {    |    }    ~
    389, 280, 389, 584,
];

impl StandardMetrics {
    /// PDF `/BaseFont` name of this face.
    pub const fn base_font(self) -> &'static [u8] {
        match self {
            Self::Helvetica => b"Helvetica",
            Self::HelveticaBold => b"Helvetica-Bold",
        }
    }

    const fn table(self) -> &'static [u16; 95] {
        match self {
            Self::Helvetica => &HELVETICA_WIDTHS,
            Self::HelveticaBold => &HELVETICA_BOLD_WIDTHS,
        }
    }

    /// Advance width of one character in 1/1000 em.
    pub fn char_width(self, c: char) -> u16 {
        let code = c as usize;
        if (0x20..=0x7E).contains(&code) {
            self.table()[code - 0x20]
        } else {
            FALLBACK_WIDTH
        }
    }
}

impl GlyphMetrics for StandardMetrics {
    fn width(&self, text: &str, font_size: f32) -> f32 {
        let units: u32 = text.chars().map(|c| u32::from(self.char_width(c))).sum();
        units as f32 * font_size / 1000.0
    }
}
