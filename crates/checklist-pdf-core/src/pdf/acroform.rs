//! AcroForm field catalog and flattening.
//!
//! The catalog is read once from the template. Layout code talks to fields
//! through the [`FormField`] capability; appearance streams are never
//! generated. Flattening instead draws each field's content into the page
//! and then removes the widgets and the `/AcroForm` entry.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;

use lopdf::{Document, Object, ObjectId};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::canvas::PageCanvas;
use super::document::{TemplateDocument, number, resolve_dict_object};
use super::font::FontWeight;
use super::page_index::PageIndex;
use crate::error::{Error, Result};
use crate::layout::{GlyphMetrics, Rectangle};

/// Field flag bits (`/Ff`), 1-based bit positions from the PDF reference.
const FF_MULTILINE: i64 = 1 << 12;
const FF_RADIO: i64 = 1 << 15;
const FF_PUSHBUTTON: i64 = 1 << 16;
const FF_COMBO: i64 = 1 << 17;

/// Maximum depth of the `/Kids` hierarchy that is followed.
const MAX_FIELD_DEPTH: usize = 16;

/// Approximate ascent of the supported faces as a fraction of font size.
const ASCENT_RATIO: f32 = 0.8;

/// Approximate cap height as a fraction of font size.
const CAP_HEIGHT_RATIO: f32 = 0.7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FieldKind {
    Text,
    Checkbox,
    Dropdown,
    OptionList,
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Text => "text",
            Self::Checkbox => "checkbox",
            Self::Dropdown => "dropdown",
            Self::OptionList => "option-list",
        };
        f.write_str(name)
    }
}

/// One entry of a form-field catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: FieldKind,
    pub label: String,
}

/// Horizontal text alignment (`/Q`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Alignment {
    #[default]
    Left,
    Center,
    Right,
}

impl Alignment {
    const fn from_quadding(q: i64) -> Self {
        match q {
            1 => Self::Center,
            2 => Self::Right,
            _ => Self::Left,
        }
    }
}

/// A widget annotation: where a field is shown.
#[derive(Debug, Clone, PartialEq)]
pub struct Widget {
    pub id: ObjectId,
    pub page: Option<PageIndex>,
    pub rect: Rectangle,
    /// Name of the "on" appearance state (`/AP /N` key other than `Off`)
    pub on_state: Option<String>,
}

/// What layout code needs from a live form field.
pub trait FormField {
    fn name(&self) -> &str;

    /// Rectangle of the first placed widget.
    fn bounding_box(&self) -> Option<Rectangle>;

    /// Set the text shown by the field. Fails for fields that cannot show
    /// free text.
    fn set_display_text(&mut self, text: &str) -> Result<()>;

    fn set_rendered_font_size(&mut self, font_size: f32);
}

#[derive(Debug, Clone, PartialEq)]
enum Appearance {
    Empty,
    Text(String),
    Checked(bool),
    /// Radio group: only the widget with this on-state is marked
    Selected(String),
}

/// Text laid out against one particular widget.
#[derive(Debug, Clone, PartialEq)]
struct FittedText {
    text: String,
    font_size: f32,
}

/// A terminal AcroForm field and its widgets.
#[derive(Debug, Clone)]
pub struct WidgetField {
    descriptor: FieldDescriptor,
    widgets: Vec<Widget>,
    alignment: Alignment,
    multiline: bool,
    radio: bool,
    font_size: f32,
    line_height_multiplier: f32,
    appearance: Appearance,
    /// Per-widget text for widgets other than the first, keyed by index
    widget_text: BTreeMap<usize, FittedText>,
}

impl WidgetField {
    pub const fn descriptor(&self) -> &FieldDescriptor {
        &self.descriptor
    }

    pub const fn kind(&self) -> FieldKind {
        self.descriptor.kind
    }

    pub fn label(&self) -> &str {
        &self.descriptor.label
    }

    pub fn widgets(&self) -> &[Widget] {
        &self.widgets
    }

    /// Page of the first placed widget.
    pub fn page(&self) -> Option<PageIndex> {
        self.widgets.iter().find_map(|w| w.page)
    }

    /// Widgets that sit on a page, with their index.
    pub fn placed_widgets(&self) -> impl Iterator<Item = (usize, &Widget)> {
        self.widgets.iter().enumerate().filter(|(_, w)| w.page.is_some())
    }

    /// Whether this button field is a radio group.
    pub const fn is_radio(&self) -> bool {
        self.radio
    }

    /// Whether the template marks the field as multi-line.
    pub const fn is_multiline(&self) -> bool {
        self.multiline
    }

    pub const fn alignment(&self) -> Alignment {
        self.alignment
    }

    pub const fn font_size(&self) -> f32 {
        self.font_size
    }

    pub const fn set_line_height_multiplier(&mut self, multiplier: f32) {
        self.line_height_multiplier = multiplier;
    }

    pub fn set_checked(&mut self, checked: bool) -> Result<()> {
        if self.descriptor.kind != FieldKind::Checkbox {
            return Err(self.mismatch(FieldKind::Checkbox));
        }
        self.appearance = Appearance::Checked(checked);
        Ok(())
    }

    /// Choose a radio option by its on-state name. An empty value selects
    /// nothing.
    pub fn select(&mut self, option: &str) -> Result<()> {
        if self.descriptor.kind != FieldKind::Checkbox {
            return Err(self.mismatch(FieldKind::Checkbox));
        }
        let option = option.trim();
        if !option.is_empty()
            && !self.widgets.iter().any(|w| w.on_state.as_deref() == Some(option))
        {
            debug!(field = %self.descriptor.name, option, "no radio widget has this state");
        }
        self.appearance = if option.is_empty() {
            Appearance::Empty
        } else {
            Appearance::Selected(option.to_string())
        };
        Ok(())
    }

    /// Show different text in one widget, laid out against its own box.
    pub fn set_widget_text(&mut self, index: usize, text: &str, font_size: f32) {
        self.widget_text.insert(
            index,
            FittedText {
                text: text.to_string(),
                font_size,
            },
        );
    }

    /// Leave the field blank when flattened.
    pub fn clear(&mut self) {
        self.appearance = Appearance::Empty;
        self.widget_text.clear();
    }

    pub fn display_text(&self) -> Option<&str> {
        match &self.appearance {
            Appearance::Text(text) => Some(text),
            _ => None,
        }
    }

    pub const fn is_checked(&self) -> bool {
        matches!(self.appearance, Appearance::Checked(true))
    }

    fn mismatch(&self, expected: FieldKind) -> Error {
        Error::FieldTypeMismatch {
            name: self.descriptor.name.clone(),
            expected: expected.to_string(),
            found: self.descriptor.kind.to_string(),
        }
    }

    /// Draw the field's content onto the canvases of the pages it sits on.
    pub fn draw(&self, metrics: &dyn GlyphMetrics, padding: f32, canvases: &mut [PageCanvas]) {
        for (i, widget) in self.widgets.iter().enumerate() {
            let Some(canvas) = widget.page.and_then(|p| canvases.get_mut(p.as_usize())) else {
                continue;
            };
            match &self.appearance {
                Appearance::Empty | Appearance::Checked(false) => {}
                Appearance::Checked(true) => canvas.check_mark(widget.rect.inset(1.0)),
                Appearance::Selected(option) => {
                    if widget.on_state.as_deref() == Some(option.as_str()) {
                        canvas.check_mark(widget.rect.inset(1.0));
                    }
                }
                Appearance::Text(text) => {
                    let (text, size) = self
                        .widget_text
                        .get(&i)
                        .map_or((text.as_str(), self.font_size), |fitted| {
                            (fitted.text.as_str(), fitted.font_size)
                        });
                    self.draw_text(metrics, padding, widget.rect, text, size, canvas);
                }
            }
        }
    }

    fn draw_text(
        &self,
        metrics: &dyn GlyphMetrics,
        padding: f32,
        rect: Rectangle,
        text: &str,
        size: f32,
        canvas: &mut PageCanvas,
    ) {
        let inner = rect.inset(padding);
        let line_height = size * self.line_height_multiplier;
        let lines: Vec<&str> = text.split('\n').collect();

        // A lone line in a short box is centred vertically
        let first_baseline = if lines.len() == 1 && inner.height < 2.0 * line_height {
            inner.y + (inner.height - size * CAP_HEIGHT_RATIO) / 2.0
        } else {
            inner.top() - size * ASCENT_RATIO
        };

        for (i, line) in lines.iter().enumerate() {
            let width = metrics.width(line, size);
            let x = match self.alignment {
                Alignment::Left => inner.x,
                Alignment::Center => inner.x + (inner.width - width) / 2.0,
                Alignment::Right => inner.right() - width,
            };
            let y = first_baseline - i as f32 * line_height;
            canvas.text(x, y, size, FontWeight::Regular, line);
        }
    }
}

impl FormField for WidgetField {
    fn name(&self) -> &str {
        &self.descriptor.name
    }

    fn bounding_box(&self) -> Option<Rectangle> {
        self.widgets.iter().find(|w| w.page.is_some()).map(|w| w.rect)
    }

    fn set_display_text(&mut self, text: &str) -> Result<()> {
        if self.descriptor.kind == FieldKind::Checkbox {
            return Err(self.mismatch(FieldKind::Text));
        }
        self.appearance = if text.is_empty() {
            Appearance::Empty
        } else {
            Appearance::Text(text.to_string())
        };
        self.widget_text.clear();
        Ok(())
    }

    fn set_rendered_font_size(&mut self, font_size: f32) {
        if font_size.is_finite() && font_size > 0.0 {
            self.font_size = font_size;
        }
    }
}

/// Attributes a field node inherits from its ancestors.
#[derive(Debug, Clone, Copy, Default)]
struct Inherited<'a> {
    field_type: Option<&'a [u8]>,
    flags: i64,
    quadding: i64,
}

/// All terminal fields of a template, in document order.
#[derive(Debug, Clone, Default)]
pub struct FieldCatalog {
    fields: Vec<WidgetField>,
    index: HashMap<String, usize>,
}

impl FieldCatalog {
    /// Read the `/AcroForm` tree. A template without a form yields an empty
    /// catalog.
    pub fn from_document(template: &TemplateDocument) -> Result<Self> {
        let doc = template.document();
        let page_of = widget_pages(doc, &template.page_ids());

        let Some(acroform) = doc
            .catalog()
            .ok()
            .and_then(|catalog| catalog.get(b"AcroForm").ok())
            .and_then(|obj| resolve_dict_object(doc, obj))
        else {
            debug!("template has no AcroForm");
            return Ok(Self::default());
        };

        let roots = match acroform.get(b"Fields") {
            Ok(Object::Array(arr)) => arr.clone(),
            Ok(Object::Reference(id)) => doc
                .get_object(*id)
                .and_then(Object::as_array)
                .cloned()
                .map_err(|e| Error::Lopdf(format!("Failed to read /Fields: {e}")))?,
            _ => Vec::new(),
        };

        let mut catalog = Self::default();
        for root in &roots {
            catalog.walk(doc, root, None, Inherited::default(), &page_of, MAX_FIELD_DEPTH);
        }
        debug!(fields = catalog.fields.len(), "read form field catalog");
        Ok(catalog)
    }

    fn walk<'d>(
        &mut self,
        doc: &'d Document,
        node: &Object,
        parent_name: Option<&str>,
        inherited: Inherited<'d>,
        page_of: &HashMap<ObjectId, PageIndex>,
        depth: usize,
    ) {
        if depth == 0 {
            warn!("form field tree too deep, ignoring remainder");
            return;
        }
        let Object::Reference(node_id) = node else {
            return;
        };
        let Ok(Object::Dictionary(dict)) = doc.get_object(*node_id) else {
            return;
        };

        let partial = dict
            .get(b"T")
            .ok()
            .and_then(|t| t.as_str().ok())
            .map(decode_text_string);
        let name = match (parent_name, partial) {
            (Some(parent), Some(partial)) => format!("{parent}.{partial}"),
            (None, Some(partial)) => partial,
            (Some(parent), None) => parent.to_string(),
            (None, None) => return,
        };

        let inherited = Inherited {
            field_type: dict
                .get(b"FT")
                .ok()
                .and_then(|ft| ft.as_name().ok())
                .or(inherited.field_type),
            flags: dict
                .get(b"Ff")
                .ok()
                .and_then(|ff| ff.as_i64().ok())
                .unwrap_or(inherited.flags),
            quadding: dict
                .get(b"Q")
                .ok()
                .and_then(|q| q.as_i64().ok())
                .unwrap_or(inherited.quadding),
        };

        let kids = match dict.get(b"Kids") {
            Ok(Object::Array(kids)) => kids.as_slice(),
            _ => &[],
        };

        let mut widgets = Vec::new();
        for kid in kids {
            let kid_is_field = kid
                .as_reference()
                .ok()
                .and_then(|id| doc.get_object(id).ok())
                .and_then(|obj| obj.as_dict().ok())
                .is_some_and(|d| d.has(b"T"));
            if kid_is_field {
                self.walk(doc, kid, Some(&name), inherited, page_of, depth - 1);
            } else if let Ok(kid_id) = kid.as_reference()
                && let Some(widget) = read_widget(doc, kid_id, page_of)
            {
                widgets.push(widget);
            }
        }
        if kids.is_empty()
            && let Some(widget) = read_widget(doc, *node_id, page_of)
        {
            widgets.push(widget);
        }

        if widgets.is_empty() {
            return;
        }

        let Some(kind) = classify(inherited.field_type, inherited.flags) else {
            debug!(field = %name, "skipping non-data form field");
            return;
        };

        let label = dict
            .get(b"TU")
            .ok()
            .and_then(|tu| tu.as_str().ok())
            .map(decode_text_string)
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| humanize(&name));

        if self.index.contains_key(&name) {
            warn!(field = %name, "duplicate form field name, keeping first");
            return;
        }
        self.index.insert(name.clone(), self.fields.len());
        self.fields.push(WidgetField {
            descriptor: FieldDescriptor { name, kind, label },
            widgets,
            alignment: Alignment::from_quadding(inherited.quadding),
            multiline: kind == FieldKind::Text && inherited.flags & FF_MULTILINE != 0,
            radio: kind == FieldKind::Checkbox && inherited.flags & FF_RADIO != 0,
            font_size: 10.0,
            line_height_multiplier: 1.15,
            appearance: Appearance::Empty,
            widget_text: BTreeMap::new(),
        });
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn fields(&self) -> &[WidgetField] {
        &self.fields
    }

    pub fn fields_mut(&mut self) -> &mut [WidgetField] {
        &mut self.fields
    }

    pub fn get(&self, name: &str) -> Option<&WidgetField> {
        self.index.get(name).and_then(|&i| self.fields.get(i))
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut WidgetField> {
        self.index.get(name).and_then(|&i| self.fields.get_mut(i))
    }

    pub fn descriptors(&self) -> Vec<FieldDescriptor> {
        self.fields.iter().map(|f| f.descriptor.clone()).collect()
    }

    /// Check caller-supplied descriptors against the live fields.
    ///
    /// Returns the names that are missing or whose type disagrees; those
    /// fields are cleared so nothing is drawn for them.
    pub fn validate(&mut self, expected: &[FieldDescriptor]) -> Vec<String> {
        let mut rejected = Vec::new();
        for descriptor in expected {
            match self.get_mut(&descriptor.name) {
                None => {
                    warn!(field = %descriptor.name, "descriptor names a field the template lacks");
                    rejected.push(descriptor.name.clone());
                }
                Some(field) if field.kind() != descriptor.kind => {
                    let err = field.mismatch(descriptor.kind);
                    warn!(field = %descriptor.name, error = %err, "descriptor type mismatch");
                    field.clear();
                    rejected.push(descriptor.name.clone());
                }
                Some(_) => {}
            }
        }
        rejected
    }

    /// Remove every widget annotation and the `/AcroForm` entry.
    pub fn strip_from(&self, template: &mut TemplateDocument) -> Result<()> {
        let widget_ids: HashSet<ObjectId> = self
            .fields
            .iter()
            .flat_map(|f| f.widgets.iter().map(|w| w.id))
            .collect();
        let page_ids = template.page_ids();
        let doc = template.document_mut();

        for page_id in page_ids {
            let annots = doc
                .get_object(page_id)
                .and_then(Object::as_dict)
                .ok()
                .and_then(|page| page.get(b"Annots").ok())
                .and_then(|annots| match annots {
                    Object::Array(arr) => Some(arr.clone()),
                    Object::Reference(id) => doc
                        .get_object(*id)
                        .and_then(Object::as_array)
                        .ok()
                        .cloned(),
                    _ => None,
                });
            let Some(annots) = annots else {
                continue;
            };

            let remaining: Vec<Object> = annots
                .into_iter()
                .filter(|a| a.as_reference().map_or(true, |id| !widget_ids.contains(&id)))
                .collect();

            let page = doc
                .get_object_mut(page_id)
                .and_then(Object::as_dict_mut)
                .map_err(|e| Error::Lopdf(format!("Failed to get page: {e}")))?;
            if remaining.is_empty() {
                page.remove(b"Annots");
            } else {
                page.set("Annots", Object::Array(remaining));
            }
        }

        let root_id = doc
            .trailer
            .get(b"Root")
            .and_then(Object::as_reference)
            .map_err(|e| Error::Lopdf(format!("Failed to locate catalog: {e}")))?;
        let catalog = doc
            .get_object_mut(root_id)
            .and_then(Object::as_dict_mut)
            .map_err(|e| Error::Lopdf(format!("Failed to get catalog: {e}")))?;
        catalog.remove(b"AcroForm");

        debug!(widgets = widget_ids.len(), "removed form widgets");
        Ok(())
    }
}

/// Map every annotation id to the page that lists it in `/Annots`.
fn widget_pages(doc: &Document, page_ids: &[ObjectId]) -> HashMap<ObjectId, PageIndex> {
    let mut map = HashMap::new();
    for (i, page_id) in page_ids.iter().enumerate() {
        let annots = doc
            .get_object(*page_id)
            .and_then(Object::as_dict)
            .ok()
            .and_then(|page| page.get(b"Annots").ok())
            .and_then(|annots| match annots {
                Object::Array(arr) => Some(arr.as_slice()),
                Object::Reference(id) => doc
                    .get_object(*id)
                    .and_then(Object::as_array)
                    .ok()
                    .map(Vec::as_slice),
                _ => None,
            });
        for annot in annots.unwrap_or_default() {
            if let Ok(id) = annot.as_reference() {
                map.insert(id, PageIndex::new(i));
            }
        }
    }

    // Fall back to each page id for widgets found only through /P
    for (i, page_id) in page_ids.iter().enumerate() {
        map.entry(*page_id).or_insert(PageIndex::new(i));
    }
    map
}

fn read_widget(
    doc: &Document,
    id: ObjectId,
    page_of: &HashMap<ObjectId, PageIndex>,
) -> Option<Widget> {
    let dict = doc.get_object(id).and_then(Object::as_dict).ok()?;
    let rect = match dict.get(b"Rect").ok()? {
        Object::Array(arr) if arr.len() == 4 => {
            let v: Vec<f32> = arr.iter().filter_map(number).collect();
            (v.len() == 4).then(|| Rectangle::from_corners(v[0], v[1], v[2], v[3]))?
        }
        _ => return None,
    };
    let page = page_of.get(&id).copied().or_else(|| {
        dict.get(b"P")
            .and_then(Object::as_reference)
            .ok()
            .and_then(|p| page_of.get(&p).copied())
    });
    Some(Widget {
        id,
        page,
        rect,
        on_state: on_state(doc, dict),
    })
}

/// The non-`Off` key of a widget's normal appearance dictionary.
fn on_state(doc: &Document, widget: &lopdf::Dictionary) -> Option<String> {
    let appearance = widget
        .get(b"AP")
        .ok()
        .and_then(|ap| resolve_dict_object(doc, ap))?;
    let normal = appearance
        .get(b"N")
        .ok()
        .and_then(|n| resolve_dict_object(doc, n))?;
    normal
        .iter()
        .map(|(state, _)| state)
        .find(|state| state.as_slice() != b"Off")
        .map(|state| String::from_utf8_lossy(state).into_owned())
}

fn classify(field_type: Option<&[u8]>, flags: i64) -> Option<FieldKind> {
    match field_type? {
        b"Tx" => Some(FieldKind::Text),
        b"Btn" if flags & FF_PUSHBUTTON != 0 => None,
        b"Btn" => Some(FieldKind::Checkbox),
        b"Ch" if flags & FF_COMBO != 0 => Some(FieldKind::Dropdown),
        b"Ch" => Some(FieldKind::OptionList),
        _ => None,
    }
}

/// Decode a PDF text string: UTF-16BE with BOM, UTF-8 with BOM, otherwise
/// treated as Latin-1.
pub(crate) fn decode_text_string(bytes: &[u8]) -> String {
    if let Some(rest) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = rest
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        String::from_utf16_lossy(&units)
    } else if let Some(rest) = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]) {
        String::from_utf8_lossy(rest).into_owned()
    } else {
        bytes.iter().map(|&b| char::from(b)).collect()
    }
}

/// `cooling.fan_notes` -> `Fan Notes`
fn humanize(name: &str) -> String {
    let last = name.rsplit('.').next().unwrap_or(name);
    last.split(['_', '-', ' '])
        .filter(|w| !w.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_uppercase().chain(chars).collect()
            })
        })
        .collect::<Vec<_>>()
        .join(" ")
}
