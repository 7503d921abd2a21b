//! Parts-used record.

use super::submission::Submission;

/// Number of part slots on the submission form.
pub const PART_SLOTS: usize = 15;

/// Submission keys of the five part columns, in column order.
pub const PART_KEYS: [&str; 5] = [
    "part_number",
    "part_description",
    "part_quantity",
    "part_serial_removed",
    "part_serial_fitted",
];

/// Column headings matching [`PART_KEYS`].
pub const PART_HEADINGS: [&str; 5] = [
    "Part No.",
    "Description",
    "Qty",
    "Serial Removed",
    "Serial Fitted",
];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartsRow {
    /// 1-based form slot
    pub slot: usize,
    pub part_number: String,
    pub description: String,
    pub quantity: String,
    pub serial_removed: String,
    pub serial_fitted: String,
}

impl PartsRow {
    pub fn cells(&self) -> [&str; 5] {
        [
            self.part_number.as_str(),
            self.description.as_str(),
            self.quantity.as_str(),
            self.serial_removed.as_str(),
            self.serial_fitted.as_str(),
        ]
    }

    /// True when any cell has non-whitespace content.
    pub fn has_data(&self) -> bool {
        self.cells().iter().any(|cell| !cell.trim().is_empty())
    }
}

/// Build all slots from the list-valued part keys.
pub fn parts_rows(submission: &Submission) -> Vec<PartsRow> {
    let columns: Vec<Vec<String>> = PART_KEYS.iter().map(|key| submission.list(key)).collect();
    let cell = |column: usize, slot: usize| -> String {
        columns
            .get(column)
            .and_then(|values| values.get(slot))
            .map(|s| s.trim().to_string())
            .unwrap_or_default()
    };

    (0..PART_SLOTS)
        .map(|i| PartsRow {
            slot: i + 1,
            part_number: cell(0, i),
            description: cell(1, i),
            quantity: cell(2, i),
            serial_removed: cell(3, i),
            serial_fitted: cell(4, i),
        })
        .collect()
}

/// Slots that carry data, in form order.
pub fn used_rows(submission: &Submission) -> Vec<PartsRow> {
    parts_rows(submission)
        .into_iter()
        .filter(PartsRow::has_data)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::FieldValue;

    fn submission(columns: &[(&str, &[&str])]) -> Submission {
        let mut submission = Submission::default();
        for (key, values) in columns {
            submission.fields.insert(
                (*key).to_string(),
                FieldValue::List(values.iter().map(|v| (*v).to_string()).collect()),
            );
        }
        submission
    }

    #[test]
    fn test_always_fifteen_slots() {
        let rows = parts_rows(&Submission::default());
        assert_eq!(rows.len(), PART_SLOTS);
        assert_eq!(rows[14].slot, 15);
        assert!(rows.iter().all(|r| !r.has_data()));
    }

    #[test]
    fn test_whitespace_rows_are_skipped() {
        let sub = submission(&[
            ("part_number", &["  ", "B-2", ""]),
            ("part_description", &["\t", "", ""]),
            ("part_serial_fitted", &["", "", "SN-9"]),
        ]);
        let used = used_rows(&sub);
        assert_eq!(used.iter().map(|r| r.slot).collect::<Vec<_>>(), vec![2, 3]);
        assert_eq!(used[1].cells(), ["", "", "", "", "SN-9"]);
    }

    #[test]
    fn test_extra_values_beyond_slots_are_ignored() {
        let many: Vec<&str> = vec!["X"; 20];
        let sub = submission(&[("part_number", &many)]);
        assert_eq!(used_rows(&sub).len(), PART_SLOTS);
    }
}
