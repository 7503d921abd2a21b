//! Document assembly: fill, flatten, append overflow and summary pages.

use std::collections::BTreeSet;

use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::audit::{AuditRecord, EmployeeSummary, SkippedField};
use crate::config::AppConfig;
use crate::error::{Error, Result};
use crate::layout::{FieldTextLayoutEngine, Rectangle, StyleRules, TextMeasurer};
use crate::pdf::{
    FieldCatalog, FieldDescriptor, FieldKind, FontSet, FontWeight, FormField, PageCanvas,
    PageIndex, TemplateDocument, WidgetField,
};
use crate::render::{ImageRef, OverflowEntry, OverflowPageAppender, PaginatedSectionRenderer, PhotoTile};
use crate::report::{
    Attachment, ImageSlot, RosterTotals, Submission, SummaryInput, parts_rows, resolve_roster,
    signoff_datetime, summary_sections,
};

/// Everything needed to produce one document.
#[derive(Debug, Clone, Default)]
pub struct AssemblyInput {
    /// Template PDF bytes
    pub template: Vec<u8>,
    /// Template file name, recorded in the audit
    pub template_name: String,
    pub submission: Submission,
    pub attachments: Vec<Attachment>,
    /// Expected field catalog; empty skips the check
    pub descriptors: Vec<FieldDescriptor>,
}

/// A finished document and its audit record.
#[derive(Debug, Clone)]
pub struct Assembly {
    pub pdf: Vec<u8>,
    pub audit: AuditRecord,
}

/// Fills one fixed template per call. Holds no per-submission state, so a
/// single instance can serve concurrent requests.
pub struct DocumentAssembler {
    config: AppConfig,
    fonts: FontSet,
    style: StyleRules,
}

impl DocumentAssembler {
    /// Create an assembler, loading any configured TrueType fonts.
    pub fn new(config: AppConfig) -> Result<Self> {
        let fonts = FontSet::from_config(&config.fonts)?;
        Ok(Self::with_fonts(config, fonts))
    }

    pub fn with_fonts(config: AppConfig, fonts: FontSet) -> Self {
        let style = config.style_rules();
        Self {
            config,
            fonts,
            style,
        }
    }

    pub const fn config(&self) -> &AppConfig {
        &self.config
    }

    pub const fn fonts(&self) -> &FontSet {
        &self.fonts
    }

    pub fn assemble(&self, input: &AssemblyInput) -> Result<Assembly> {
        let mut doc = TemplateDocument::from_bytes(&input.template)?;
        let mut catalog = FieldCatalog::from_document(&doc)?;
        let mut skipped = Vec::new();

        let rejected: BTreeSet<String> = if input.descriptors.is_empty() {
            BTreeSet::new()
        } else {
            catalog.validate(&input.descriptors).into_iter().collect()
        };
        for name in &rejected {
            skipped.push(SkippedField::new(name, "descriptor does not match template field"));
        }

        let mut canvases = (0..doc.template_page_count())
            .map(|i| {
                doc.media_box(PageIndex::new(i))
                    .map(|b| PageCanvas::new(b.width, b.height))
            })
            .collect::<Result<Vec<_>>>()?;

        let overflow = self.fill_fields(&mut catalog, &input.submission, &rejected, &mut skipped);

        // Images
        let mut engineer_signature = None;
        let mut customer_signature = None;
        let mut photos = Vec::new();
        for attachment in &input.attachments {
            let image = ImageRef {
                handle: doc.add_image(&attachment.image),
                width: attachment.image.width(),
                height: attachment.image.height(),
            };
            match attachment.slot {
                ImageSlot::EngineerSignature => engineer_signature = Some(image),
                ImageSlot::CustomerSignature => customer_signature = Some(image),
                ImageSlot::Photo(n) => {
                    let placed = catalog
                        .get(&attachment.slot.field_name())
                        .filter(|_| !rejected.contains(&attachment.slot.field_name()))
                        .and_then(|field| Some((field.page()?, field.bounding_box()?)));
                    if let Some((page, rect)) = placed
                        && let Some(canvas) = canvases.get_mut(page.as_usize())
                    {
                        let target = rect.fit_aspect(image.width as f32, image.height as f32);
                        canvas.image(image.handle, target);
                        debug!(slot = %attachment.slot, "placed photo in template field");
                    } else {
                        photos.push(PhotoTile {
                            caption: format!("Photo {n}"),
                            image,
                        });
                    }
                }
            }
        }

        // Flatten
        let padding = self.config.layout.field_padding;
        for field in catalog.fields() {
            field.draw(self.fonts.face(FontWeight::Regular), padding, &mut canvases);
        }
        catalog.strip_from(&mut doc)?;
        for (i, canvas) in canvases.iter().enumerate() {
            doc.draw(PageIndex::new(i), canvas, &self.fonts)?;
        }
        info!(fields = catalog.len(), overflow = overflow.len(), "flattened template");

        let page_size = doc.media_box(PageIndex::new(0))?;
        let placements = OverflowPageAppender::new(&self.fonts, self.config.layout)
            .append(&mut doc, &overflow, page_size)?;

        // Summary
        let today = Utc::now().date_naive();
        let base_date = signoff_datetime(&input.submission, today).map_or(today, |dt| dt.date());
        let roster = resolve_roster(&input.submission.employees, &self.config.employees, base_date);
        let totals = RosterTotals::from_entries(&roster);
        let parts = parts_rows(&input.submission);
        let sections = summary_sections(&SummaryInput {
            submission: &input.submission,
            checklist: &self.config.checklist,
            parts: &parts,
            roster: &roster,
            totals,
            engineer_signature,
            customer_signature,
            photos,
            base_date,
        });
        let summary = PaginatedSectionRenderer::new(
            &self.fonts,
            self.config.layout,
            page_size.width,
            page_size.height,
        )
        .render(&sections);
        for canvas in &summary {
            let index = doc.append_page(page_size.width, page_size.height)?;
            doc.draw(index, canvas, &self.fonts)?;
        }

        let page_count = doc.page_count();
        let template_page_count = doc.template_page_count();
        let pdf = doc.save()?;

        let audit = AuditRecord {
            submission_id: Uuid::new_v4(),
            generated_at: Utc::now(),
            template: input.template_name.clone(),
            page_count,
            template_page_count,
            pdf_md5: AuditRecord::digest(&pdf),
            overflow: placements,
            parts_slots_used: parts.iter().filter(|p| p.has_data()).map(|p| p.slot).collect(),
            employees: roster.iter().map(EmployeeSummary::from).collect(),
            break_totals: totals,
            skipped_fields: skipped,
        };
        info!(
            id = %audit.submission_id,
            pages = page_count,
            summary_pages = summary.len(),
            bytes = pdf.len(),
            "assembled checklist"
        );
        Ok(Assembly { pdf, audit })
    }

    /// Write submitted values into the live fields and collect overflow.
    fn fill_fields(
        &self,
        catalog: &mut FieldCatalog,
        submission: &Submission,
        rejected: &BTreeSet<String>,
        skipped: &mut Vec<SkippedField>,
    ) -> Vec<OverflowEntry> {
        let engine = FieldTextLayoutEngine::new(TextMeasurer::new(self.fonts.face(FontWeight::Regular)))
            .with_shrink_step(self.config.layout.shrink_step);
        let padding = self.config.layout.field_padding;
        let mut overflow = Vec::new();

        for field in catalog.fields_mut() {
            let name = field.name().to_string();
            if rejected.contains(&name) || ImageSlot::parse(&name).is_some() {
                continue;
            }
            let Some(value) = submission.get(&name) else {
                continue;
            };

            let outcome = if field.is_radio() {
                field.select(&value.display_text())
            } else if field.kind() == FieldKind::Checkbox {
                field.set_checked(value.is_truthy())
            } else {
                let text = value.display_text();
                if text.trim().is_empty() {
                    continue;
                }
                self.fill_text(&engine, padding, field, &text)
                    .map(|entry| overflow.extend(entry))
            };

            if let Err(e) = outcome {
                warn!(field = %name, error = %e, "field left unset");
                skipped.push(SkippedField::new(&name, e.to_string()));
            }
        }
        overflow
    }

    fn fill_text(
        &self,
        engine: &FieldTextLayoutEngine<'_>,
        padding: f32,
        field: &mut WidgetField,
        text: &str,
    ) -> Result<Option<OverflowEntry>> {
        let Some(bbox) = field.bounding_box() else {
            return Err(Error::FieldNotFound(format!(
                "{} has no widget on a page",
                field.name()
            )));
        };

        let mut policy = self.style.policy_for(field.name());
        policy.multiline |= field.is_multiline();
        let result = engine.layout(text, &bbox.inset(padding), &policy);

        field.set_display_text(&result.fitted_text)?;
        field.set_rendered_font_size(result.applied_font_size);
        field.set_line_height_multiplier(policy.line_height_multiplier);

        // The first widget decides what moves to the appendix; the others
        // show as much as fits their own box
        let others: Vec<(usize, Rectangle)> = field
            .placed_widgets()
            .skip(1)
            .map(|(i, widget)| (i, widget.rect))
            .collect();
        for (i, rect) in others {
            let fitted = engine.layout(text, &rect.inset(padding), &policy);
            field.set_widget_text(i, &fitted.fitted_text, fitted.applied_font_size);
        }
        debug!(
            field = field.name(),
            size = result.applied_font_size,
            shown = result.displayed_line_count,
            total = result.total_line_count,
            "laid out field"
        );

        Ok(result.has_overflow().then(|| OverflowEntry {
            field: field.name().to_string(),
            label: field.label().to_string(),
            text: result.overflow_text,
            font_size: result.applied_font_size,
        }))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::layout::GlyphMetrics;
    use crate::pdf::DrawOp;
    use crate::pdf::acroform::tests::multi_widget_pdf;
    use crate::pdf::document::tests::sample_pdf;

    #[test]
    fn test_each_widget_is_laid_out_in_its_own_box() {
        let assembler = DocumentAssembler::with_fonts(AppConfig::default(), FontSet::standard());
        let pdf = multi_widget_pdf(
            "site_name",
            b"Tx",
            0,
            &[[50, 700, 450, 720], [50, 100, 110, 112]],
            &[],
        );
        let doc = TemplateDocument::from_bytes(&pdf).unwrap();
        let mut catalog = FieldCatalog::from_document(&doc).unwrap();
        let face = assembler.fonts().face(FontWeight::Regular);
        let engine = FieldTextLayoutEngine::new(TextMeasurer::new(face));
        let padding = assembler.config().layout.field_padding;

        let field = catalog.get_mut("site_name").unwrap();
        let overflow = assembler
            .fill_text(&engine, padding, field, "Northfield Hospital Plant Room B")
            .unwrap();
        assert!(overflow.is_none());

        let mut canvases = vec![PageCanvas::new(612.0, 792.0)];
        field.draw(face, padding, &mut canvases);
        let (wide, narrow): (Vec<_>, Vec<_>) = canvases[0]
            .ops()
            .iter()
            .filter_map(|op| match op {
                DrawOp::Text {
                    x, y, font_size, text, ..
                } => Some((*x, *y, *font_size, text.clone())),
                _ => None,
            })
            .partition(|(_, y, _, _)| *y > 400.0);

        assert_eq!(wide.len(), 1);
        assert_eq!(wide[0].3, "Northfield Hospital Plant Room B");
        assert!(!narrow.is_empty());
        for (x, _, size, text) in narrow {
            assert!(size <= wide[0].2);
            assert!(
                x + face.width(&text, size) <= 110.0 + 0.5,
                "'{text}' runs past the narrow widget"
            );
        }
    }

    #[test]
    fn test_plain_template_gets_summary_pages() {
        let assembler = DocumentAssembler::with_fonts(AppConfig::default(), FontSet::standard());
        let input = AssemblyInput {
            template: sample_pdf(),
            template_name: "plain.pdf".to_string(),
            ..AssemblyInput::default()
        };
        let assembly = assembler.assemble(&input).unwrap();

        assert_eq!(assembly.audit.template_page_count, 2);
        assert!(assembly.audit.page_count > 2);
        assert!(assembly.audit.overflow.is_empty());
        assert!(assembly.pdf.starts_with(b"%PDF"));
        assert_eq!(assembly.audit.pdf_md5, AuditRecord::digest(&assembly.pdf));
    }

    #[test]
    fn test_invalid_template_fails() {
        let assembler = DocumentAssembler::with_fonts(AppConfig::default(), FontSet::standard());
        let input = AssemblyInput {
            template: b"not a pdf".to_vec(),
            ..AssemblyInput::default()
        };
        assert!(assembler.assemble(&input).is_err());
    }
}
