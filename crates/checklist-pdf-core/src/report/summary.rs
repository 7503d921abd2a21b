//! Section descriptors for the summary pages.
//!
//! Builds the fixed section order of the summary: parts record, on-site
//! team, the configured checklist sections, sign-off checklist, sign-off
//! details, signatures and finally any photos without a template slot.

use chrono::{NaiveDate, NaiveDateTime};

use super::employees::{EmployeeEntry, RosterTotals, parse_time};
use super::parts::{PART_HEADINGS, PartsRow};
use super::submission::{FieldValue, Submission};
use crate::config::{ChecklistConfig, ChecklistSection};
use crate::render::{Block, Cell, Column, ImageRef, PhotoTile, Section, SignaturePad, Table};

pub const SIGNOFF_DETAIL_KEYS: [(&str, &str); 4] = [
    ("engineer_company", "Engineer Company"),
    ("engineer_name", "Engineer Name"),
    ("customer_company", "Customer Company"),
    ("customer_name", "Customer Name"),
];

const PART_WEIGHTS: [f32; 5] = [1.2, 2.6, 0.6, 1.3, 1.3];
const DATETIME_FORMAT: &str = "%d/%m/%Y %H:%M";

/// Everything the summary needs, resolved by the assembler.
#[derive(Debug, Clone)]
pub struct SummaryInput<'a> {
    pub submission: &'a Submission,
    pub checklist: &'a ChecklistConfig,
    pub parts: &'a [PartsRow],
    pub roster: &'a [EmployeeEntry],
    pub totals: RosterTotals,
    pub engineer_signature: Option<ImageRef>,
    pub customer_signature: Option<ImageRef>,
    pub photos: Vec<PhotoTile>,
    pub base_date: NaiveDate,
}

pub fn summary_sections(input: &SummaryInput<'_>) -> Vec<Section> {
    let mut sections = vec![
        parts_section(input.parts),
        roster_section(input.roster, &input.totals),
    ];
    sections.extend(
        input
            .checklist
            .sections
            .iter()
            .map(|section| checklist_section(section, input.submission)),
    );
    sections.push(signoff_checklist_section(input.checklist, input.submission));
    sections.push(signoff_details_section(input.submission, input.base_date));
    sections.push(signature_section(input));
    if !input.photos.is_empty() {
        sections.push(Section::new(
            "Site Photos",
            vec![Block::Photos(input.photos.clone())],
        ));
    }
    sections
}

/// Only slots with data are listed.
pub fn parts_section(parts: &[PartsRow]) -> Section {
    let rows: Vec<Vec<Cell>> = parts
        .iter()
        .filter(|row| row.has_data())
        .map(|row| row.cells().into_iter().map(Cell::text).collect())
        .collect();

    let block = if rows.is_empty() {
        Block::Paragraph("No parts recorded.".to_string())
    } else {
        let columns = PART_HEADINGS
            .iter()
            .zip(PART_WEIGHTS)
            .map(|(heading, weight)| Column::new(heading, weight))
            .collect();
        Block::Table(Table::new(columns, rows))
    };
    Section::new("Parts Used", vec![block])
}

pub fn roster_section(roster: &[EmployeeEntry], totals: &RosterTotals) -> Section {
    if roster.is_empty() {
        return Section::new(
            "On-Site Team",
            vec![Block::Paragraph("No team members recorded.".to_string())],
        );
    }

    let columns = vec![
        Column::new("Name", 2.0),
        Column::new("Role", 1.6),
        Column::new("Arrival", 1.0),
        Column::new("Departure", 1.1),
        Column::new("Duration", 1.0),
        Column::new("Break", 1.8),
    ];
    let rows = roster
        .iter()
        .map(|entry| {
            let mut departure = entry.departure_text();
            if entry.auto_corrected {
                departure.push('*');
            }
            vec![
                Cell::text(entry.name.as_str()),
                Cell::text(entry.role.as_str()),
                Cell::text(entry.arrival_text()),
                Cell::text(departure),
                Cell::text(entry.duration_text()),
                Cell::text(entry.break_tier().to_string()),
            ]
        })
        .collect();

    let mut blocks = vec![
        Block::Table(Table::new(columns, rows)),
        Block::Paragraph(totals.summary_line()),
    ];
    if roster.iter().any(|e| e.auto_corrected) {
        blocks.push(Block::Paragraph(
            "* Departure adjusted because it was not after the arrival time.".to_string(),
        ));
    }
    Section::new("On-Site Team", blocks)
}

fn checklist_section(section: &ChecklistSection, submission: &Submission) -> Section {
    let columns = vec![
        Column::new("Item", 3.2),
        Column::new("Status", 1.0),
        Column::new("Notes", 2.8),
    ];
    let rows = section
        .items
        .iter()
        .map(|item| {
            vec![
                Cell::text(item.label.as_str()),
                Cell::text(item_status(submission.get(&item.key))),
                Cell::text(
                    submission
                        .text(&format!("{}_notes", item.key))
                        .unwrap_or_default(),
                ),
            ]
        })
        .collect();
    Section::new(&section.title, vec![Block::Table(Table::new(columns, rows))])
}

/// `Done` / `Not done` for yes/no answers, the answer itself otherwise.
pub fn item_status(value: Option<&FieldValue>) -> String {
    let Some(value) = value else {
        return "-".to_string();
    };
    match value {
        FieldValue::Flag(true) => return "Done".to_string(),
        FieldValue::Flag(false) => return "Not done".to_string(),
        _ => {}
    }
    if value.is_truthy() {
        return "Done".to_string();
    }
    let text = value.display_text();
    let text = text.trim();
    if text.is_empty() {
        "-".to_string()
    } else if matches!(
        text.to_ascii_lowercase().as_str(),
        "0" | "n" | "no" | "false" | "off" | "not done"
    ) {
        "Not done".to_string()
    } else {
        text.to_string()
    }
}

fn signoff_checklist_section(checklist: &ChecklistConfig, submission: &Submission) -> Section {
    let columns = vec![Column::new("Statement", 6.0), Column::new("Confirmed", 1.0)];
    let rows = checklist
        .signoff
        .iter()
        .map(|item| {
            vec![
                Cell::text(item.label.as_str()),
                Cell::Check(submission.flag(&format!("signoff_{}", item.key))),
            ]
        })
        .collect();
    Section::new(
        "Sign-Off Checklist",
        vec![Block::Table(Table::new(columns, rows))],
    )
}

fn signoff_details_section(submission: &Submission, base_date: NaiveDate) -> Section {
    let mut pairs: Vec<(String, String)> = SIGNOFF_DETAIL_KEYS
        .iter()
        .map(|(key, label)| {
            ((*label).to_string(), submission.text(key).unwrap_or_default())
        })
        .collect();

    let when = submission.text("signoff_datetime").map(|raw| {
        parse_time(&raw, base_date).map_or(raw, |dt| dt.format(DATETIME_FORMAT).to_string())
    });
    pairs.push(("Date / Time".to_string(), when.unwrap_or_default()));

    Section::new("Sign-Off Details", vec![Block::Table(Table::key_values(pairs))])
}

fn signature_section(input: &SummaryInput<'_>) -> Section {
    let name = |key: &str| input.submission.text(key).unwrap_or_default();
    Section::new(
        "Signatures",
        vec![Block::Signatures(vec![
            SignaturePad {
                label: "Engineer".to_string(),
                name: name("engineer_name"),
                image: input.engineer_signature,
            },
            SignaturePad {
                label: "Customer".to_string(),
                name: name("customer_name"),
                image: input.customer_signature,
            },
        ])],
    )
}

/// Sign-off moment, when the submission carries one with a date.
pub fn signoff_datetime(submission: &Submission, fallback: NaiveDate) -> Option<NaiveDateTime> {
    submission
        .text("signoff_datetime")
        .and_then(|raw| parse_time(&raw, fallback))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::{AppConfig, EmployeePolicy};
    use crate::report::{EmployeeInput, parts_rows, resolve_roster};

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 5, 2).unwrap()
    }

    fn table(section: &Section) -> &Table {
        section
            .blocks
            .iter()
            .find_map(|b| match b {
                Block::Table(t) => Some(t),
                _ => None,
            })
            .unwrap()
    }

    #[test]
    fn test_section_order() {
        let config = AppConfig::default();
        let submission = Submission::default();
        let parts = parts_rows(&submission);
        let input = SummaryInput {
            submission: &submission,
            checklist: &config.checklist,
            parts: &parts,
            roster: &[],
            totals: RosterTotals::default(),
            engineer_signature: None,
            customer_signature: None,
            photos: Vec::new(),
            base_date: date(),
        };
        let headings: Vec<String> = summary_sections(&input)
            .into_iter()
            .map(|s| s.heading)
            .collect();

        assert_eq!(headings[0], "Parts Used");
        assert_eq!(headings[1], "On-Site Team");
        let n = config.checklist.sections.len();
        for (i, section) in config.checklist.sections.iter().enumerate() {
            assert_eq!(headings[2 + i], section.title);
        }
        assert_eq!(
            &headings[2 + n..],
            ["Sign-Off Checklist", "Sign-Off Details", "Signatures"]
        );
    }

    #[test]
    fn test_empty_parts_paragraph() {
        let section = parts_section(&parts_rows(&Submission::default()));
        assert_eq!(
            section.blocks,
            vec![Block::Paragraph("No parts recorded.".to_string())]
        );
    }

    #[test]
    fn test_parts_rows_skip_empty_slots() {
        let mut submission = Submission::default();
        for value in ["", "F-220", "  "] {
            submission.push_value("part_number", value.to_string());
        }
        let section = parts_section(&parts_rows(&submission));
        let table = table(&section);
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.rows[0][0], Cell::text("F-220"));
        assert_eq!(table.columns.len(), 5);
    }

    #[test]
    fn test_roster_marks_corrections() {
        let roster = resolve_roster(
            &[EmployeeInput {
                name: "Jo".into(),
                role: "Fitter".into(),
                arrival: Some("10:00".into()),
                departure: Some("09:00".into()),
            }],
            &EmployeePolicy::default(),
            date(),
        );
        let totals = RosterTotals::from_entries(&roster);
        let section = roster_section(&roster, &totals);
        let row = &table(&section).rows[0];
        assert_eq!(row[3], Cell::text("10:15*"));
        assert_eq!(row[4], Cell::text("15m"));
        assert_eq!(row[5], Cell::text("None"));
        assert!(section.blocks.contains(&Block::Paragraph(totals.summary_line())));
    }

    #[test]
    fn test_item_status() {
        assert_eq!(item_status(None), "-");
        assert_eq!(item_status(Some(&FieldValue::Flag(true))), "Done");
        assert_eq!(item_status(Some(&FieldValue::Text("no".into()))), "Not done");
        assert_eq!(item_status(Some(&FieldValue::Text("N/A".into()))), "N/A");
        assert_eq!(item_status(Some(&FieldValue::Text(" ".into()))), "-");
    }

    #[test]
    fn test_signoff_checks_and_details() {
        let config = AppConfig::default();
        let mut submission = Submission::default();
        let first = &config.checklist.signoff[0];
        submission.fields.insert(format!("signoff_{}", first.key), FieldValue::Flag(true));
        submission.push_value("signoff_datetime", "2026-05-02T16:45".to_string());
        submission.push_value("engineer_name", "R. Patel".to_string());

        let checks = signoff_checklist_section(&config.checklist, &submission);
        let rows = &table(&checks).rows;
        assert_eq!(rows[0][1], Cell::Check(true));
        assert_eq!(rows[1][1], Cell::Check(false));

        let details = signoff_details_section(&submission, date());
        let rows = &table(&details).rows;
        assert_eq!(rows[1][1], Cell::text("R. Patel"));
        assert_eq!(rows[4][1], Cell::text("02/05/2026 16:45"));
        assert!(!table(&details).header);
    }
}
