//! On-site team roster: time parsing, durations and break tiers.

use std::fmt;

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::submission::EmployeeInput;
use crate::config::EmployeePolicy;

/// Rest-break category required for a worked duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakTier {
    None,
    ThirtyMinutes,
    FortyFiveMinutes,
    Pending,
}

impl BreakTier {
    /// Upper bounds are inclusive: 360 min needs no break, 540 min needs 30.
    pub const fn for_duration(minutes: Option<i64>) -> Self {
        match minutes {
            None => Self::Pending,
            Some(m) if m <= 0 => Self::Pending,
            Some(m) if m <= 360 => Self::None,
            Some(m) if m <= 540 => Self::ThirtyMinutes,
            Some(_) => Self::FortyFiveMinutes,
        }
    }

    pub const fn required_minutes(self) -> i64 {
        match self {
            Self::None | Self::Pending => 0,
            Self::ThirtyMinutes => 30,
            Self::FortyFiveMinutes => 45,
        }
    }
}

impl fmt::Display for BreakTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::None => "None",
            Self::ThirtyMinutes => "30 min (2 x 15 allowed)",
            Self::FortyFiveMinutes => "45 min",
            Self::Pending => "Pending",
        };
        f.write_str(label)
    }
}

/// A resolved roster row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmployeeEntry {
    pub name: String,
    pub role: String,
    pub arrival: Option<NaiveDateTime>,
    pub departure: Option<NaiveDateTime>,
    pub duration_minutes: Option<i64>,
    /// Departure was moved because it was not after the arrival
    pub auto_corrected: bool,
    /// Times were copied from the first row
    pub synced: bool,
}

impl EmployeeEntry {
    pub const fn break_tier(&self) -> BreakTier {
        BreakTier::for_duration(self.duration_minutes)
    }

    pub fn arrival_text(&self) -> String {
        self.arrival.map(|t| t.format("%H:%M").to_string()).unwrap_or_default()
    }

    pub fn departure_text(&self) -> String {
        self.departure.map(|t| t.format("%H:%M").to_string()).unwrap_or_default()
    }

    pub fn duration_text(&self) -> String {
        self.duration_minutes
            .filter(|m| *m > 0)
            .map_or_else(|| "Pending".to_string(), format_duration)
    }
}

/// `495 -> "8h 15m"`, `480 -> "8h"`, `15 -> "15m"`; zero components are
/// omitted and a zero duration is `"0m"`.
pub fn format_duration(minutes: i64) -> String {
    let minutes = minutes.max(0);
    let (h, m) = (minutes / 60, minutes % 60);
    match (h, m) {
        (0, m) => format!("{m}m"),
        (h, 0) => format!("{h}h"),
        (h, m) => format!("{h}h {m}m"),
    }
}

/// Parse `HH:MM[:SS]` (on `base_date`), `YYYY-MM-DDTHH:MM[:SS]` or RFC 3339.
/// RFC 3339 values keep their local wall-clock time.
pub fn parse_time(value: &str, base_date: NaiveDate) -> Option<NaiveDateTime> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    for format in ["%H:%M", "%H:%M:%S"] {
        if let Ok(time) = NaiveTime::parse_from_str(value, format) {
            return Some(base_date.and_time(time));
        }
    }
    for format in ["%Y-%m-%dT%H:%M", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(datetime) = NaiveDateTime::parse_from_str(value, format) {
            return Some(datetime);
        }
    }
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.naive_local())
}

/// Resolve submitted rows into roster entries.
///
/// Blank rows are dropped. Unparseable times leave the duration unresolved
/// (break tier pending) instead of failing.
pub fn resolve_roster(
    inputs: &[EmployeeInput],
    policy: &EmployeePolicy,
    base_date: NaiveDate,
) -> Vec<EmployeeEntry> {
    let primary = inputs.iter().find(|i| !i.is_blank());

    inputs
        .iter()
        .filter(|input| !input.is_blank())
        .enumerate()
        .map(|(position, input)| {
            let synced = policy.sync_to_primary && position > 0 && !input.has_times();
            let source = match primary {
                Some(primary) if synced => primary,
                _ => input,
            };
            resolve_entry(input, source, policy, base_date, synced)
        })
        .collect()
}

fn resolve_entry(
    input: &EmployeeInput,
    times: &EmployeeInput,
    policy: &EmployeePolicy,
    base_date: NaiveDate,
    synced: bool,
) -> EmployeeEntry {
    let parse = |value: Option<&str>, what: &str| {
        let raw = value.unwrap_or("").trim();
        let parsed = parse_time(raw, base_date);
        if parsed.is_none() && !raw.is_empty() {
            warn!(employee = %input.name, value = raw, "unparseable {what} time");
        }
        parsed
    };
    let arrival = parse(times.arrival.as_deref(), "arrival");
    let mut departure = parse(times.departure.as_deref(), "departure");

    let mut auto_corrected = false;
    if let (Some(start), Some(end)) = (arrival, departure)
        && end <= start
    {
        let corrected = start + Duration::minutes(policy.minimum_minutes);
        debug!(employee = %input.name, %corrected, "departure not after arrival, corrected");
        departure = Some(corrected);
        auto_corrected = true;
    }

    let duration_minutes = match (arrival, departure) {
        (Some(start), Some(end)) => Some((end - start).num_minutes()),
        _ => None,
    };

    EmployeeEntry {
        name: input.name.trim().to_string(),
        role: input.role.trim().to_string(),
        arrival,
        departure,
        duration_minutes,
        auto_corrected,
        synced,
    }
}

/// Sums rendered beneath the roster.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterTotals {
    pub total_minutes: i64,
    pub required_break_minutes: i64,
    pub no_break: usize,
    pub thirty_minute: usize,
    pub forty_five_minute: usize,
    pub pending: usize,
}

impl RosterTotals {
    pub fn from_entries(entries: &[EmployeeEntry]) -> Self {
        let mut totals = Self::default();
        for entry in entries {
            let tier = entry.break_tier();
            if tier != BreakTier::Pending {
                totals.total_minutes += entry.duration_minutes.unwrap_or(0);
            }
            totals.required_break_minutes += tier.required_minutes();
            match tier {
                BreakTier::None => totals.no_break += 1,
                BreakTier::ThirtyMinutes => totals.thirty_minute += 1,
                BreakTier::FortyFiveMinutes => totals.forty_five_minute += 1,
                BreakTier::Pending => totals.pending += 1,
            }
        }
        totals
    }

    pub fn summary_line(&self) -> String {
        format!(
            "Total time on site: {}. Required breaks: {}. No break: {}, 30 min: {}, 45 min: {}, pending: {}.",
            format_duration(self.total_minutes),
            format_duration(self.required_break_minutes),
            self.no_break,
            self.thirty_minute,
            self.forty_five_minute,
            self.pending
        )
    }
}
