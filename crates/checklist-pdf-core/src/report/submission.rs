//! Submitted form data.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::pdf::RasterImage;

/// Raw value of one submitted key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Flag(bool),
    Text(String),
    List(Vec<String>),
}

impl FieldValue {
    /// Text shown for the value; list entries are joined with `", "`.
    pub fn display_text(&self) -> String {
        match self {
            Self::Flag(true) => "Yes".to_string(),
            Self::Flag(false) => String::new(),
            Self::Text(text) => text.clone(),
            Self::List(items) => items
                .iter()
                .map(|s| s.trim())
                .filter(|s| !s.is_empty())
                .collect::<Vec<_>>()
                .join(", "),
        }
    }

    /// Whether the value ticks a checkbox.
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Flag(flag) => *flag,
            Self::Text(text) => is_truthy_text(text),
            Self::List(items) => items.iter().any(|s| is_truthy_text(s)),
        }
    }

    /// Values of a repeated key. A single text value is a one-element list.
    pub fn as_list(&self) -> Vec<String> {
        match self {
            Self::Flag(_) => Vec::new(),
            Self::Text(text) => vec![text.clone()],
            Self::List(items) => items.clone(),
        }
    }
}

/// Browser checkbox values and the usual spellings of "yes".
fn is_truthy_text(text: &str) -> bool {
    matches!(
        text.trim().to_ascii_lowercase().as_str(),
        "1" | "y" | "yes" | "true" | "on" | "x" | "checked" | "ok" | "done"
    )
}

/// One row of the on-site team as submitted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmployeeInput {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub arrival: Option<String>,
    #[serde(default)]
    pub departure: Option<String>,
}

impl EmployeeInput {
    pub fn is_blank(&self) -> bool {
        self.name.trim().is_empty()
            && self.role.trim().is_empty()
            && blank(self.arrival.as_deref())
            && blank(self.departure.as_deref())
    }

    pub fn has_times(&self) -> bool {
        !blank(self.arrival.as_deref()) || !blank(self.departure.as_deref())
    }
}

fn blank(value: Option<&str>) -> bool {
    value.is_none_or(|v| v.trim().is_empty())
}

/// A completed checklist as received from the browser or a JSON file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
    #[serde(default)]
    pub fields: BTreeMap<String, FieldValue>,
    #[serde(default)]
    pub employees: Vec<EmployeeInput>,
}

impl Submission {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::Submission(format!("Invalid JSON: {e}")))
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.fields.get(key)
    }

    /// Trimmed text of a key, `None` when absent or blank.
    pub fn text(&self, key: &str) -> Option<String> {
        self.fields
            .get(key)
            .map(FieldValue::display_text)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

    pub fn flag(&self, key: &str) -> bool {
        self.fields.get(key).is_some_and(FieldValue::is_truthy)
    }

    pub fn list(&self, key: &str) -> Vec<String> {
        self.fields.get(key).map(FieldValue::as_list).unwrap_or_default()
    }

    /// Add or append a value, turning repeated keys into a list.
    pub fn push_value(&mut self, key: &str, value: String) {
        match self.fields.get_mut(key) {
            None => {
                self.fields.insert(key.to_string(), FieldValue::Text(value));
            }
            Some(FieldValue::List(items)) => items.push(value),
            Some(existing) => {
                let mut items = existing.as_list();
                items.push(value);
                *existing = FieldValue::List(items);
            }
        }
    }
}

/// Where an uploaded image goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ImageSlot {
    /// 1-based photo number
    Photo(usize),
    EngineerSignature,
    CustomerSignature,
}

impl ImageSlot {
    /// Parse `photo_<n>`, `engineer_signature` or `customer_signature`.
    pub fn parse(name: &str) -> Option<Self> {
        let name = name.trim().to_ascii_lowercase();
        match name.as_str() {
            "engineer_signature" => Some(Self::EngineerSignature),
            "customer_signature" => Some(Self::CustomerSignature),
            _ => name
                .strip_prefix("photo_")
                .and_then(|n| n.parse::<usize>().ok())
                .filter(|n| *n > 0)
                .map(Self::Photo),
        }
    }

    /// Template field that may host the image.
    pub fn field_name(self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ImageSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Photo(n) => write!(f, "photo_{n}"),
            Self::EngineerSignature => f.write_str("engineer_signature"),
            Self::CustomerSignature => f.write_str("customer_signature"),
        }
    }
}

/// A decoded image and its target slot.
#[derive(Debug, Clone)]
pub struct Attachment {
    pub slot: ImageSlot,
    pub image: RasterImage,
}

impl Attachment {
    pub fn decode(slot: ImageSlot, bytes: &[u8]) -> Result<Self> {
        Ok(Self {
            slot,
            image: RasterImage::decode(bytes)?,
        })
    }
}
