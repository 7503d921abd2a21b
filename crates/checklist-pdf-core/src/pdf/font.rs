//! Font faces used for flattened field text and generated pages.
//!
//! Two kinds of face are supported:
//! - **Standard**: Helvetica / Helvetica-Bold from the PDF base-14 set. Nothing
//!   is embedded; text is WinAnsi-encoded and measured with AFM widths.
//! - **Embedded**: a TrueType file supplied through configuration, embedded as
//!   a CIDFont with Identity-H encoding so any glyph the font covers renders.
//!
//! # PDF Font Structure (embedded faces)
//!
//! - **Type0 font**: The top-level font dictionary that references:
//!   - **CIDFont**: Contains glyph metrics and references:
//!     - **FontDescriptor**: Font metadata (flags, bounding box, etc.)
//!     - **FontFile2**: The embedded TrueType font program
//!   - **ToUnicode CMap**: Maps glyph IDs back to Unicode for copy/paste

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::Path;
use std::sync::Arc;

use lopdf::{Document, Object, ObjectId, Stream};
use ttf_parser::Face;

use crate::config::FontConfig;
use crate::error::{Error, Result};
use crate::layout::{GlyphMetrics, StandardMetrics};

/// Character ranges whose glyph widths are recorded for embedded faces.
const EMBEDDED_RANGES: &[(u32, u32)] = &[
    (0x0020, 0x007F), // Basic Latin (ASCII printable)
    (0x00A0, 0x00FF), // Latin-1 Supplement
    (0x0100, 0x017F), // Latin Extended-A
    (0x0180, 0x024F), // Latin Extended-B
    (0x2000, 0x206F), // General Punctuation (smart quotes, dashes, etc.)
    (0x20AC, 0x20AC), // Euro sign
];

/// Weight of a face within a [`FontSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FontWeight {
    Regular,
    Bold,
}

impl FontWeight {
    /// Name under which the face is registered in page resources.
    pub const fn resource_name(self) -> &'static str {
        match self {
            Self::Regular => "FChkR",
            Self::Bold => "FChkB",
        }
    }
}

/// A TrueType face parsed once at load time.
///
/// Only the metrics needed for layout and embedding are kept; the raw font
/// program is held for the FontFile2 stream.
pub struct EmbeddedFont {
    data: Vec<u8>,
    name: String,
    units_per_em: u16,
    ascender: i16,
    descender: i16,
    cap_height: i16,
    bbox: [i16; 4],
    /// char -> (glyph id, advance in font units)
    glyphs: BTreeMap<char, (u16, u16)>,
    notdef_advance: u16,
}

impl EmbeddedFont {
    /// Parse a TrueType font program.
    pub fn from_bytes(data: Vec<u8>, name: &str) -> Result<Self> {
        let face = Face::parse(&data, 0)
            .map_err(|e| Error::FontLoad(format!("Failed to parse font {name}: {e}")))?;

        let mut glyphs = BTreeMap::new();
        for &(start, end) in EMBEDDED_RANGES {
            for codepoint in start..=end {
                if let Some(c) = char::from_u32(codepoint)
                    && let Some(gid) = face.glyph_index(c)
                {
                    let advance = face.glyph_hor_advance(gid).unwrap_or(0);
                    glyphs.insert(c, (gid.0, advance));
                }
            }
        }

        let bbox = face.global_bounding_box();
        let notdef_advance = face
            .glyph_hor_advance(ttf_parser::GlyphId(0))
            .unwrap_or(0);
        let units_per_em = face.units_per_em();
        let ascender = face.ascender();
        let descender = face.descender();
        let cap_height = face.capital_height().unwrap_or(ascender);

        if units_per_em == 0 {
            return Err(Error::FontLoad(format!("{name} reports zero units per em")));
        }

        Ok(Self {
            name: sanitize_font_name(name),
            units_per_em,
            ascender,
            descender,
            cap_height,
            bbox: [bbox.x_min, bbox.y_min, bbox.x_max, bbox.y_max],
            glyphs,
            notdef_advance,
            data,
        })
    }

    /// Load a TrueType font from disk.
    pub fn from_file(path: &Path) -> Result<Self> {
        let data = std::fs::read(path).map_err(|e| {
            Error::FontLoad(format!("Failed to read font {}: {e}", path.display()))
        })?;
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("EmbeddedFont");
        Self::from_bytes(data, name)
    }

    /// Get the glyph ID for a character, falling back to .notdef (0) if not found.
    pub fn glyph_id(&self, c: char) -> u16 {
        self.glyphs.get(&c).map_or(0, |&(gid, _)| gid)
    }

    fn advance(&self, c: char) -> u16 {
        self.glyphs.get(&c).map_or(self.notdef_advance, |&(_, adv)| adv)
    }

    pub const fn units_per_em(&self) -> u16 {
        self.units_per_em
    }

    /// Convert text to a hex string of glyph IDs for PDF content streams.
    /// Returns the hex string without angle brackets.
    pub fn text_to_hex_glyphs(&self, text: &str) -> String {
        text.chars().fold(String::new(), |mut acc, c| {
            let _ = write!(acc, "{:04X}", self.glyph_id(c));
            acc
        })
    }

    /// Embed the font objects and return the Type0 font dictionary id.
    pub fn embed(&self, doc: &mut Document) -> ObjectId {
        let font_file_id = self.create_font_file(doc);
        let font_descriptor_id = self.create_font_descriptor(doc, font_file_id);
        let cid_font_id = self.create_cid_font(doc, font_descriptor_id);
        let to_unicode_id = self.create_to_unicode_cmap(doc);
        self.create_type0_font(doc, cid_font_id, to_unicode_id)
    }

    /// Create the FontFile2 stream containing the raw TrueType data.
    fn create_font_file(&self, doc: &mut Document) -> ObjectId {
        let mut dict = lopdf::Dictionary::new();
        dict.set(
            "Length1",
            Object::Integer(i64::try_from(self.data.len()).unwrap_or(i64::MAX)),
        );

        let stream = Stream::new(dict, self.data.clone()).with_compression(true);
        doc.add_object(Object::Stream(stream))
    }

    /// Create the FontDescriptor dictionary with font metrics.
    fn create_font_descriptor(&self, doc: &mut Document, font_file_id: ObjectId) -> ObjectId {
        let dict = lopdf::Dictionary::from_iter([
            ("Type", Object::Name(b"FontDescriptor".to_vec())),
            ("FontName", Object::Name(self.name.as_bytes().to_vec())),
            ("Flags", Object::Integer(32)), // Nonsymbolic
            (
                "FontBBox",
                Object::Array(self.bbox.iter().map(|&v| Object::Integer(i64::from(v))).collect()),
            ),
            ("ItalicAngle", Object::Integer(0)),
            ("Ascent", Object::Integer(i64::from(self.ascender))),
            ("Descent", Object::Integer(i64::from(self.descender))),
            ("CapHeight", Object::Integer(i64::from(self.cap_height))),
            ("StemV", Object::Integer(80)),
            ("FontFile2", Object::Reference(font_file_id)),
        ]);

        doc.add_object(Object::Dictionary(dict))
    }

    /// Create the CIDFont dictionary with per-glyph width information.
    fn create_cid_font(&self, doc: &mut Document, font_descriptor_id: ObjectId) -> ObjectId {
        let default_width = self.scale_width(self.advance(' '));

        let dict = lopdf::Dictionary::from_iter([
            ("Type", Object::Name(b"Font".to_vec())),
            ("Subtype", Object::Name(b"CIDFontType2".to_vec())),
            ("BaseFont", Object::Name(self.name.as_bytes().to_vec())),
            (
                "CIDSystemInfo",
                Object::Dictionary(lopdf::Dictionary::from_iter([
                    ("Registry", Object::string_literal("Adobe")),
                    ("Ordering", Object::string_literal("Identity")),
                    ("Supplement", Object::Integer(0)),
                ])),
            ),
            ("FontDescriptor", Object::Reference(font_descriptor_id)),
            ("DW", Object::Integer(default_width)),
            ("W", Object::Array(self.build_widths_array())),
            ("CIDToGIDMap", Object::Name(b"Identity".to_vec())),
        ]);

        doc.add_object(Object::Dictionary(dict))
    }

    /// Scale a font-unit width to PDF's 1000-unit system.
    fn scale_width(&self, width: u16) -> i64 {
        (i64::from(width) * 1000) / i64::from(self.units_per_em)
    }

    /// Build the W (widths) array for CIDFont.
    /// The W array format is: [gid [w1 w2 ...]] for consecutive GIDs starting at gid.
    fn build_widths_array(&self) -> Vec<Object> {
        let gid_widths: BTreeMap<u16, i64> = self
            .glyphs
            .values()
            .filter(|(gid, _)| *gid != 0)
            .map(|&(gid, adv)| (gid, self.scale_width(adv)))
            .collect();

        let mut result = Vec::new();
        let mut iter = gid_widths.iter().peekable();

        while let Some((&first_gid, &first_width)) = iter.next() {
            let mut widths = vec![Object::Integer(first_width)];
            let mut expected_next = first_gid.saturating_add(1);

            while let Some(&(&gid, &width)) = iter.peek() {
                if gid != expected_next {
                    break;
                }
                widths.push(Object::Integer(width));
                expected_next = expected_next.saturating_add(1);
                iter.next();
            }

            result.push(Object::Integer(i64::from(first_gid)));
            result.push(Object::Array(widths));
        }

        result
    }

    /// Create a ToUnicode CMap mapping every recorded glyph back to its character.
    fn create_to_unicode_cmap(&self, doc: &mut Document) -> ObjectId {
        let mut mappings: BTreeMap<u16, char> = BTreeMap::new();
        for (&c, &(gid, _)) in &self.glyphs {
            if gid != 0 {
                mappings.entry(gid).or_insert(c);
            }
        }

        let mut cmap = String::from(
            "/CIDInit /ProcSet findresource begin\n12 dict begin\nbegincmap\n\
             /CIDSystemInfo << /Registry (Adobe) /Ordering (UCS) /Supplement 0 >> def\n\
             /CMapName /Adobe-Identity-UCS def\n/CMapType 2 def\n\
             1 begincodespacerange\n<0000> <FFFF>\nendcodespacerange\n",
        );

        // bfchar blocks are limited to 100 entries each
        let entries: Vec<(u16, char)> = mappings.into_iter().collect();
        for chunk in entries.chunks(100) {
            let _ = writeln!(cmap, "{} beginbfchar", chunk.len());
            for &(gid, c) in chunk {
                let mut utf16 = [0u16; 2];
                let encoded: String = c
                    .encode_utf16(&mut utf16)
                    .iter()
                    .map(|unit| format!("{unit:04X}"))
                    .collect();
                let _ = writeln!(cmap, "<{gid:04X}> <{encoded}>");
            }
            cmap.push_str("endbfchar\n");
        }

        cmap.push_str("endcmap\nCMapName currentdict /CMap defineresource pop\nend\nend");

        let stream = Stream::new(lopdf::Dictionary::new(), cmap.into_bytes());
        doc.add_object(Object::Stream(stream))
    }

    /// Create the Type0 (composite) font dictionary.
    fn create_type0_font(
        &self,
        doc: &mut Document,
        cid_font_id: ObjectId,
        to_unicode_id: ObjectId,
    ) -> ObjectId {
        let dict = lopdf::Dictionary::from_iter([
            ("Type", Object::Name(b"Font".to_vec())),
            ("Subtype", Object::Name(b"Type0".to_vec())),
            ("BaseFont", Object::Name(self.name.as_bytes().to_vec())),
            ("Encoding", Object::Name(b"Identity-H".to_vec())),
            ("DescendantFonts", Object::Array(vec![Object::Reference(cid_font_id)])),
            ("ToUnicode", Object::Reference(to_unicode_id)),
        ]);

        doc.add_object(Object::Dictionary(dict))
    }
}

impl GlyphMetrics for EmbeddedFont {
    fn width(&self, text: &str, font_size: f32) -> f32 {
        let units: u32 = text.chars().map(|c| u32::from(self.advance(c))).sum();
        units as f32 * font_size / f32::from(self.units_per_em)
    }
}

impl std::fmt::Debug for EmbeddedFont {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddedFont")
            .field("name", &self.name)
            .field("units_per_em", &self.units_per_em)
            .field("glyphs", &self.glyphs.len())
            .finish_non_exhaustive()
    }
}

/// A face that can measure, encode and embed text.
#[derive(Debug, Clone)]
pub enum FontFace {
    Standard(StandardMetrics),
    Embedded(Arc<EmbeddedFont>),
}

impl FontFace {
    /// Encode text as the hex body of a PDF string for this face.
    pub fn encode(&self, text: &str) -> String {
        match self {
            Self::Standard(_) => text.chars().fold(String::new(), |mut acc, c| {
                let _ = write!(acc, "{:02X}", win_ansi_code(c));
                acc
            }),
            Self::Embedded(font) => font.text_to_hex_glyphs(text),
        }
    }

    /// Add the font dictionary (and any embedded program) to a document.
    pub fn add_to_document(&self, doc: &mut Document) -> ObjectId {
        match self {
            Self::Standard(metrics) => doc.add_object(lopdf::Dictionary::from_iter([
                ("Type", Object::Name(b"Font".to_vec())),
                ("Subtype", Object::Name(b"Type1".to_vec())),
                ("BaseFont", Object::Name(metrics.base_font().to_vec())),
                ("Encoding", Object::Name(b"WinAnsiEncoding".to_vec())),
            ])),
            Self::Embedded(font) => font.embed(doc),
        }
    }
}

impl GlyphMetrics for FontFace {
    fn width(&self, text: &str, font_size: f32) -> f32 {
        match self {
            Self::Standard(metrics) => metrics.width(text, font_size),
            Self::Embedded(font) => font.width(text, font_size),
        }
    }
}

/// The regular and bold faces used for one document.
#[derive(Debug, Clone)]
pub struct FontSet {
    regular: FontFace,
    bold: FontFace,
}

impl FontSet {
    /// Helvetica and Helvetica-Bold, no embedding required.
    pub const fn standard() -> Self {
        Self {
            regular: FontFace::Standard(StandardMetrics::Helvetica),
            bold: FontFace::Standard(StandardMetrics::HelveticaBold),
        }
    }

    /// Build from configuration, falling back to the standard faces for any
    /// weight without a configured TrueType file.
    pub fn from_config(config: &FontConfig) -> Result<Self> {
        let mut set = Self::standard();
        if let Some(path) = &config.regular {
            set.regular = FontFace::Embedded(Arc::new(EmbeddedFont::from_file(path)?));
        }
        if let Some(path) = &config.bold {
            set.bold = FontFace::Embedded(Arc::new(EmbeddedFont::from_file(path)?));
        }
        Ok(set)
    }

    pub const fn face(&self, weight: FontWeight) -> &FontFace {
        match weight {
            FontWeight::Regular => &self.regular,
            FontWeight::Bold => &self.bold,
        }
    }
}

impl Default for FontSet {
    fn default() -> Self {
        Self::standard()
    }
}

/// Map a character to its WinAnsiEncoding byte, `?` when unmappable.
fn win_ansi_code(c: char) -> u8 {
    match c {
        '\t' => b' ',
        ' '..='~' | '\u{A0}'..='\u{FF}' => u8::try_from(u32::from(c)).unwrap_or(b'?'),
        '€' => 0x80,
        '‚' => 0x82,
        'ƒ' => 0x83,
        '„' => 0x84,
        '…' => 0x85,
        '†' => 0x86,
        '‡' => 0x87,
        'ˆ' => 0x88,
        '‰' => 0x89,
        'Š' => 0x8A,
        '‹' => 0x8B,
        'Œ' => 0x8C,
        'Ž' => 0x8E,
        '‘' => 0x91,
        '’' => 0x92,
        '“' => 0x93,
        '”' => 0x94,
        '•' => 0x95,
        '–' => 0x96,
        '—' => 0x97,
        '˜' => 0x98,
        '™' => 0x99,
        'š' => 0x9A,
        '›' => 0x9B,
        'œ' => 0x9C,
        'ž' => 0x9E,
        'Ÿ' => 0x9F,
        _ => b'?',
    }
}

/// PDF names may not contain whitespace or delimiters.
fn sanitize_font_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect();
    if cleaned.is_empty() {
        "EmbeddedFont".to_string()
    } else {
        cleaned
    }
}
