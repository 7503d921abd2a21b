//! JSON sidecar describing one generated document.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::render::OverflowPlacement;
use crate::report::{BreakTier, EmployeeEntry, RosterTotals};

/// Audit metadata for an assembled checklist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub submission_id: Uuid,
    pub generated_at: DateTime<Utc>,
    /// File name of the template, without directories
    pub template: String,
    pub page_count: usize,
    pub template_page_count: usize,
    pub pdf_md5: String,
    pub overflow: Vec<OverflowPlacement>,
    /// 1-based part slots that carried data
    pub parts_slots_used: Vec<usize>,
    pub employees: Vec<EmployeeSummary>,
    pub break_totals: RosterTotals,
    pub skipped_fields: Vec<SkippedField>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmployeeSummary {
    pub name: String,
    pub role: String,
    pub duration_minutes: Option<i64>,
    pub break_tier: BreakTier,
    pub auto_corrected: bool,
}

impl From<&EmployeeEntry> for EmployeeSummary {
    fn from(entry: &EmployeeEntry) -> Self {
        Self {
            name: entry.name.clone(),
            role: entry.role.clone(),
            duration_minutes: entry.duration_minutes,
            break_tier: entry.break_tier(),
            auto_corrected: entry.auto_corrected,
        }
    }
}

/// A field left unset, with the reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedField {
    pub field: String,
    pub reason: String,
}

impl SkippedField {
    pub fn new(field: &str, reason: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

impl AuditRecord {
    /// Hex MD5 of the finished PDF bytes.
    pub fn digest(pdf: &[u8]) -> String {
        format!("{:x}", md5::compute(pdf))
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::AuditEncode(e.to_string()))
    }

    pub fn write_to(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, self.to_json_pretty()?)?;
        Ok(())
    }
}
