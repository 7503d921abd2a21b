//! Submission data and the records derived from it.

mod employees;
mod parts;
mod submission;
mod summary;

pub use employees::{
    BreakTier, EmployeeEntry, RosterTotals, format_duration, parse_time, resolve_roster,
};
pub use parts::{PART_HEADINGS, PART_KEYS, PART_SLOTS, PartsRow, parts_rows, used_rows};
pub use submission::{Attachment, EmployeeInput, FieldValue, ImageSlot, Submission};
pub use summary::{SummaryInput, item_status, signoff_datetime, summary_sections};
