//! Integration tests for checklist-pdf-core
//!
//! These tests verify the end-to-end workflow:
//! - Template loading and field discovery
//! - Filling, shrink-to-fit and flattening
//! - Overflow appendix and summary pagination
//! - Audit record contents

#![allow(clippy::unwrap_used)]

use std::io::Cursor;

use checklist_pdf_core::{
    AppConfig, Assembly, AssemblyInput, Attachment, BreakTier, DocumentAssembler, FieldCatalog,
    FieldDescriptor, FieldKind, FontSet, ImageSlot, Submission, TemplateDocument,
    layout::{PolicyOverride, StyleRule},
    report::EmployeeInput,
};
use image::{ImageFormat, Rgba, RgbaImage};
use lopdf::{Document, Object, StringFormat};

// =============================================================================
// Fixtures
// =============================================================================

const EXAMPLE: &str =
    "Cabinet B2 fan replaced and tested under load for thirty minutes this morning";

fn text_string(s: &str) -> Object {
    Object::String(s.as_bytes().to_vec(), StringFormat::Literal)
}

fn widget(
    doc: &mut Document,
    page_id: lopdf::ObjectId,
    name: &str,
    ft: &[u8],
    flags: i64,
    rect: [i64; 4],
) -> lopdf::ObjectId {
    doc.add_object(lopdf::Dictionary::from_iter([
        ("Type", Object::Name(b"Annot".to_vec())),
        ("Subtype", Object::Name(b"Widget".to_vec())),
        ("FT", Object::Name(ft.to_vec())),
        ("T", text_string(name)),
        ("Ff", Object::Integer(flags)),
        ("Rect", Object::Array(rect.iter().map(|v| Object::Integer(*v)).collect())),
        ("P", Object::Reference(page_id)),
    ]))
}

/// One Letter page with a two-line summary field, a site name, a checkbox,
/// a dropdown and a photo slot.
fn template_pdf() -> Vec<u8> {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();
    let page_id = doc.new_object_id();

    // 154 x 30 minus 2pt padding leaves 150 x 26
    let summary = widget(&mut doc, page_id, "work_summary", b"Tx", 1 << 12, [60, 600, 214, 630]);
    let site = widget(&mut doc, page_id, "site_name", b"Tx", 0, [60, 700, 300, 718]);
    let check = widget(&mut doc, page_id, "filters_replaced", b"Btn", 0, [60, 560, 72, 572]);
    let visit = widget(&mut doc, page_id, "visit_type", b"Ch", 1 << 17, [320, 700, 450, 718]);
    let photo = widget(&mut doc, page_id, "photo_1", b"Tx", 0, [320, 400, 520, 550]);
    let fields = [summary, site, check, visit, photo];

    let content_id = doc.add_object(lopdf::Stream::new(
        lopdf::Dictionary::new(),
        b"BT /F1 12 Tf 60 750 Td (Maintenance Checklist) Tj ET".to_vec(),
    ));
    doc.objects.insert(
        page_id,
        Object::Dictionary(lopdf::Dictionary::from_iter([
            ("Type", Object::Name(b"Page".to_vec())),
            ("Parent", Object::Reference(pages_id)),
            ("MediaBox", Object::Array(vec![0.into(), 0.into(), 612.into(), 792.into()])),
            ("Contents", Object::Reference(content_id)),
            (
                "Annots",
                Object::Array(fields.iter().map(|id| Object::Reference(*id)).collect()),
            ),
        ])),
    );
    doc.objects.insert(
        pages_id,
        Object::Dictionary(lopdf::Dictionary::from_iter([
            ("Type", Object::Name(b"Pages".to_vec())),
            ("Kids", Object::Array(vec![Object::Reference(page_id)])),
            ("Count", Object::Integer(1)),
        ])),
    );
    let acroform_id = doc.add_object(lopdf::Dictionary::from_iter([(
        "Fields",
        Object::Array(fields.iter().map(|id| Object::Reference(*id)).collect()),
    )]));
    let catalog_id = doc.add_object(lopdf::Dictionary::from_iter([
        ("Type", Object::Name(b"Catalog".to_vec())),
        ("Pages", Object::Reference(pages_id)),
        ("AcroForm", Object::Reference(acroform_id)),
    ]));
    doc.trailer.set("Root", Object::Reference(catalog_id));

    let mut out = Vec::new();
    doc.save_to(&mut out).unwrap();
    out
}

fn png(width: u32, height: u32) -> Vec<u8> {
    let img = RgbaImage::from_pixel(width, height, Rgba([40, 90, 160, 255]));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png).unwrap();
    out.into_inner()
}

fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.style_rules.insert(
        0,
        StyleRule::containing(
            &["summary"],
            PolicyOverride {
                font_size: Some(10.0),
                min_font_size: Some(9.0),
                line_height_multiplier: Some(1.2),
                multiline: Some(true),
            },
        ),
    );
    config
}

fn employee(name: &str, arrival: &str, departure: &str) -> EmployeeInput {
    EmployeeInput {
        name: name.to_string(),
        role: "Engineer".to_string(),
        arrival: Some(arrival.to_string()),
        departure: Some(departure.to_string()),
    }
}

fn submission() -> Submission {
    let mut submission = Submission::from_json(
        r#"{
            "fields": {
                "site_name": "North Data Hall",
                "filters_replaced": "yes",
                "visit_type": "Planned",
                "signoff_datetime": "2026-03-14T17:05",
                "engineer_name": "Sam Okafor",
                "part_number": ["FAN-220", "", "FLT-9"],
                "part_description": ["Condenser fan", "", "Filter set"]
            }
        }"#,
    )
    .unwrap();
    submission.push_value("work_summary", EXAMPLE.to_string());
    submission.employees = vec![
        employee("Sam Okafor", "09:00", "09:00"),
        employee("Lee Park", "07:00", "16:30"),
    ];
    submission
}

fn assemble(input: &AssemblyInput) -> Assembly {
    DocumentAssembler::with_fonts(test_config(), FontSet::standard())
        .assemble(input)
        .unwrap()
}

fn input() -> AssemblyInput {
    AssemblyInput {
        template: template_pdf(),
        template_name: "checklist.pdf".to_string(),
        submission: submission(),
        ..AssemblyInput::default()
    }
}

fn page_dict(doc: &Document, index: usize) -> lopdf::Dictionary {
    let pages = doc.get_pages();
    let id = pages.values().nth(index).copied().unwrap();
    doc.get_object(id).unwrap().as_dict().unwrap().clone()
}

fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> &'a Object {
    match obj {
        Object::Reference(id) => doc.get_object(*id).unwrap(),
        other => other,
    }
}

// =============================================================================
// Template Tests
// =============================================================================

#[test]
fn test_template_catalog() {
    let doc = TemplateDocument::from_bytes(&template_pdf()).unwrap();
    let catalog = FieldCatalog::from_document(&doc).unwrap();
    assert_eq!(catalog.len(), 5);
    assert_eq!(catalog.get("filters_replaced").unwrap().kind(), FieldKind::Checkbox);
    assert_eq!(catalog.get("visit_type").unwrap().kind(), FieldKind::Dropdown);
    assert!(catalog.get("work_summary").unwrap().is_multiline());
}

// =============================================================================
// Assembly Tests
// =============================================================================

#[test]
fn test_flattened_output_has_no_form() {
    let assembly = assemble(&input());
    let doc = Document::load_mem(&assembly.pdf).unwrap();

    let catalog = doc.catalog().unwrap();
    assert!(catalog.get(b"AcroForm").is_err());

    let first = page_dict(&doc, 0);
    let annots = first
        .get(b"Annots")
        .map(|a| resolve(&doc, a).as_array().unwrap().len())
        .unwrap_or(0);
    assert_eq!(annots, 0);
    assert_eq!(doc.get_pages().len(), assembly.audit.page_count);
}

#[test]
fn test_overflow_lands_on_appendix() {
    let assembly = assemble(&input());
    let audit = &assembly.audit;

    assert_eq!(audit.template_page_count, 1);
    assert_eq!(audit.overflow.len(), 1);
    let placement = &audit.overflow[0];
    assert_eq!(placement.field, "work_summary");
    assert_eq!(placement.page_index, 1);
    assert_eq!(placement.last_page_index, 1);
    assert!(placement.font_size <= 10.0);
    // template, one appendix page, at least one summary page
    assert!(audit.page_count >= 3);
}

#[test]
fn test_no_overflow_without_long_text() {
    let with_overflow = assemble(&input()).audit.page_count;

    let mut input = input();
    input.submission.fields.remove("work_summary");
    let assembly = assemble(&input);
    assert!(assembly.audit.overflow.is_empty());
    assert_eq!(assembly.audit.page_count + 1, with_overflow);
}

#[test]
fn test_parts_and_employees_in_audit() {
    let audit = assemble(&input()).audit;

    assert_eq!(audit.parts_slots_used, vec![1, 3]);

    assert_eq!(audit.employees.len(), 2);
    let sam = &audit.employees[0];
    assert!(sam.auto_corrected);
    assert_eq!(sam.duration_minutes, Some(15));
    assert_eq!(sam.break_tier, BreakTier::None);

    let lee = &audit.employees[1];
    assert_eq!(lee.duration_minutes, Some(570));
    assert_eq!(lee.break_tier, BreakTier::FortyFiveMinutes);

    assert_eq!(audit.break_totals.total_minutes, 585);
    assert_eq!(audit.break_totals.required_break_minutes, 45);
}

#[test]
fn test_descriptor_mismatch_is_skipped() {
    let mut input = input();
    input.descriptors = vec![
        FieldDescriptor {
            name: "site_name".to_string(),
            kind: FieldKind::Text,
            label: "Site".to_string(),
        },
        FieldDescriptor {
            name: "visit_type".to_string(),
            kind: FieldKind::Checkbox,
            label: "Visit type".to_string(),
        },
    ];
    let audit = assemble(&input).audit;
    let skipped: Vec<&str> = audit.skipped_fields.iter().map(|s| s.field.as_str()).collect();
    assert_eq!(skipped, vec!["visit_type"]);
}

#[test]
fn test_photo_in_field_and_summary() {
    let mut input = input();
    input.attachments = vec![
        Attachment::decode(ImageSlot::Photo(1), &png(40, 30)).unwrap(),
        Attachment::decode(ImageSlot::Photo(2), &png(30, 40)).unwrap(),
        Attachment::decode(ImageSlot::EngineerSignature, &png(120, 40)).unwrap(),
    ];
    let assembly = assemble(&input);
    let doc = Document::load_mem(&assembly.pdf).unwrap();

    let first = page_dict(&doc, 0);
    let resources = resolve(&doc, first.get(b"Resources").unwrap()).as_dict().unwrap();
    let xobjects = resolve(&doc, resources.get(b"XObject").unwrap()).as_dict().unwrap();
    assert_eq!(xobjects.len(), 1);

    // the unplaced photo and the signature are drawn on summary pages
    let summary_images: usize = (assembly.audit.template_page_count..assembly.audit.page_count)
        .map(|i| page_dict(&doc, i))
        .filter_map(|page| {
            let resources = resolve(&doc, page.get(b"Resources").ok()?).as_dict().ok()?;
            let xobjects = resolve(&doc, resources.get(b"XObject").ok()?).as_dict().ok()?;
            Some(xobjects.len())
        })
        .sum();
    assert_eq!(summary_images, 2);
}

#[test]
fn test_long_roster_paginates() {
    let short = assemble(&input()).audit.page_count;

    let mut input = input();
    input.submission.employees = (0..80)
        .map(|i| employee(&format!("Technician {i}"), "08:00", "16:00"))
        .collect();
    let long = assemble(&input).audit;

    assert!(long.page_count > short);
    assert_eq!(long.employees.len(), 80);
    assert!(long.employees.iter().all(|e| e.break_tier == BreakTier::ThirtyMinutes));
}

#[test]
fn test_output_md5_matches_audit() {
    let assembly = assemble(&input());
    assert_eq!(
        assembly.audit.pdf_md5,
        format!("{:x}", md5::compute(&assembly.pdf))
    );
}
