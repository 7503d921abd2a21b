use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::layout::{LayoutPolicy, StyleRule, StyleRules};

/// Optional TrueType faces. Unset weights use the built-in Helvetica metrics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FontConfig {
    #[serde(default)]
    pub regular: Option<PathBuf>,
    #[serde(default)]
    pub bold: Option<PathBuf>,
}

/// Layout constants.
///
/// Every empirical number used by the field, cell and appendix layout lives
/// here so it can be tuned per template without a rebuild.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Font size decrement per shrink-to-fit iteration
    pub shrink_step: f32,
    /// Extra lines charged per overflow entry (label line and spacing)
    pub overflow_line_overhead: usize,
    /// Starting font size for fields no style rule matches
    pub font_size: f32,
    pub min_font_size: f32,
    pub line_height_multiplier: f32,
    /// Inset between a field rectangle and its text
    pub field_padding: f32,
    /// Page margin of generated pages
    pub margin: f32,
    /// Minimum table row height
    pub base_row_height: f32,
    pub cell_padding: f32,
    pub cell_font_size: f32,
    pub cell_min_font_size: f32,
    /// Slack when checking a cell line against its column width
    pub width_tolerance: f32,
    /// Body font size of the overflow appendix
    pub appendix_font_size: f32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            shrink_step: crate::layout::DEFAULT_SHRINK_STEP,
            overflow_line_overhead: 2,
            font_size: 10.0,
            min_font_size: 7.0,
            line_height_multiplier: 1.15,
            field_padding: 2.0,
            margin: 40.0,
            base_row_height: 16.0,
            cell_padding: 3.0,
            cell_font_size: 9.0,
            cell_min_font_size: 7.0,
            width_tolerance: crate::layout::DEFAULT_WIDTH_TOLERANCE,
            appendix_font_size: 10.0,
        }
    }
}

impl LayoutConfig {
    /// Policy for fields without a matching style rule.
    pub const fn default_policy(&self) -> LayoutPolicy {
        LayoutPolicy::single_line(self.font_size, self.min_font_size)
            .with_line_height(self.line_height_multiplier)
    }

    /// Policy used for every table cell.
    pub const fn cell_policy(&self) -> LayoutPolicy {
        LayoutPolicy::multiline(self.cell_font_size, self.cell_min_font_size)
            .with_line_height(self.line_height_multiplier)
    }

    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("layout.shrink_step", self.shrink_step),
            ("layout.font_size", self.font_size),
            ("layout.min_font_size", self.min_font_size),
            ("layout.line_height_multiplier", self.line_height_multiplier),
            ("layout.base_row_height", self.base_row_height),
            ("layout.cell_font_size", self.cell_font_size),
            ("layout.cell_min_font_size", self.cell_min_font_size),
            ("layout.appendix_font_size", self.appendix_font_size),
        ];
        for (field, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(Error::ConfigInvalid {
                    field: field.to_string(),
                    reason: format!("must be a positive number, got {value}"),
                });
            }
        }

        let non_negative = [
            ("layout.field_padding", self.field_padding),
            ("layout.margin", self.margin),
            ("layout.cell_padding", self.cell_padding),
            ("layout.width_tolerance", self.width_tolerance),
        ];
        for (field, value) in non_negative {
            if !(value.is_finite() && value >= 0.0) {
                return Err(Error::ConfigInvalid {
                    field: field.to_string(),
                    reason: format!("must not be negative, got {value}"),
                });
            }
        }

        let floors = [
            ("layout.min_font_size", self.min_font_size, self.font_size),
            ("layout.cell_min_font_size", self.cell_min_font_size, self.cell_font_size),
        ];
        for (field, min, size) in floors {
            if min > size {
                return Err(Error::ConfigInvalid {
                    field: field.to_string(),
                    reason: format!("{min} is above the starting size {size}"),
                });
            }
        }
        Ok(())
    }
}

/// Employee roster handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmployeePolicy {
    /// Later rows without their own times inherit the first row's times
    pub sync_to_primary: bool,
    /// Minutes added to the arrival when a departure is not after it
    pub minimum_minutes: i64,
}

impl Default for EmployeePolicy {
    fn default() -> Self {
        Self {
            sync_to_primary: false,
            minimum_minutes: 15,
        }
    }
}

/// One checklist line: the submission key and the printed label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistItem {
    pub key: String,
    pub label: String,
}

impl ChecklistItem {
    pub fn new(key: &str, label: &str) -> Self {
        Self {
            key: key.to_string(),
            label: label.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistSection {
    pub title: String,
    pub items: Vec<ChecklistItem>,
}

/// Checklist sections in print order plus the sign-off statements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistConfig {
    #[serde(default)]
    pub sections: Vec<ChecklistSection>,
    #[serde(default)]
    pub signoff: Vec<ChecklistItem>,
}

impl Default for ChecklistConfig {
    fn default() -> Self {
        let section = |title: &str, items: &[(&str, &str)]| ChecklistSection {
            title: title.to_string(),
            items: items
                .iter()
                .map(|(key, label)| ChecklistItem::new(key, label))
                .collect(),
        };

        Self {
            sections: vec![
                section(
                    "Electrical Checks",
                    &[
                        ("isolators_tested", "Isolators operated and tested"),
                        ("terminations_checked", "Terminations checked for tightness"),
                        ("supply_voltage", "Supply voltage measured and recorded"),
                        ("earth_bonding", "Earth bonding inspected"),
                    ],
                ),
                section(
                    "Mechanical Checks",
                    &[
                        ("fans_inspected", "Fans inspected for wear and noise"),
                        ("belts_pulleys", "Belts and pulleys checked"),
                        ("filters_replaced", "Filters cleaned or replaced"),
                        ("fixings_secure", "Mountings and fixings secure"),
                    ],
                ),
                section(
                    "Cooling System",
                    &[
                        ("refrigerant_pressures", "Refrigerant pressures recorded"),
                        ("condensate_drain", "Condensate drain clear"),
                        ("coils_cleaned", "Coils inspected and cleaned"),
                        ("leak_check", "Leak check completed"),
                    ],
                ),
                section(
                    "Safety and Housekeeping",
                    &[
                        ("alarms_tested", "Alarms and interlocks tested"),
                        ("labels_legible", "Warning labels present and legible"),
                        ("area_clear", "Access routes clear"),
                    ],
                ),
            ],
            signoff: vec![
                ChecklistItem::new("work_complete", "All scheduled work has been completed"),
                ChecklistItem::new("system_operational", "System left in normal operation"),
                ChecklistItem::new("area_clean", "Work area left clean and safe"),
                ChecklistItem::new("customer_briefed", "Customer briefed on work carried out"),
                ChecklistItem::new("defects_recorded", "Outstanding defects recorded"),
            ],
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Template PDF used when no path is given on the command line
    #[serde(default)]
    pub template_path: Option<PathBuf>,

    /// Where generated documents are written
    #[serde(default)]
    pub output_dir: Option<PathBuf>,

    #[serde(default)]
    pub fonts: FontConfig,

    #[serde(default)]
    pub layout: LayoutConfig,

    /// Ordered field-name rules; the first match wins
    #[serde(default = "StyleRules::builtin_rules")]
    pub style_rules: Vec<StyleRule>,

    #[serde(default)]
    pub employees: EmployeePolicy,

    #[serde(default)]
    pub checklist: ChecklistConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            template_path: None,
            output_dir: None,
            fonts: FontConfig::default(),
            layout: LayoutConfig::default(),
            style_rules: StyleRules::builtin_rules(),
            employees: EmployeePolicy::default(),
            checklist: ChecklistConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            Error::ConfigLoad(format!(
                "Failed to read config file {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| Error::ConfigLoad(format!("Failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Load an explicit file if given, otherwise search the default locations.
    pub fn load_from(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::from_file(path),
            None => Ok(Self::load()),
        }
    }

    /// Load from default locations (~/.config/checklist-pdf/config.toml, ./config.toml)
    pub fn load() -> Self {
        // Try user config
        if let Some(config_dir) = crate::util::config_dir() {
            let user_config = config_dir.join("checklist-pdf").join("config.toml");
            if user_config.exists() {
                match Self::from_file(&user_config) {
                    Ok(config) => {
                        tracing::debug!("Loaded config from {}", user_config.display());
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        // Try local config
        let local_config = PathBuf::from("config.toml");
        if local_config.exists() {
            match Self::from_file(&local_config) {
                Ok(config) => {
                    tracing::debug!("Loaded config from ./config.toml");
                    return config;
                }
                Err(e) => {
                    tracing::warn!("Failed to load ./config.toml: {}", e);
                }
            }
        }

        // Return defaults
        tracing::debug!("No config file found, using defaults");
        Self::default()
    }

    pub fn validate(&self) -> Result<()> {
        self.layout.validate()?;
        self.validate_style_rules()?;
        if self.employees.minimum_minutes <= 0 {
            return Err(Error::ConfigInvalid {
                field: "employees.minimum_minutes".to_string(),
                reason: "must be at least one minute".to_string(),
            });
        }
        for section in &self.checklist.sections {
            if section.title.trim().is_empty() {
                return Err(Error::ConfigInvalid {
                    field: "checklist.sections.title".to_string(),
                    reason: "section titles must not be empty".to_string(),
                });
            }
        }
        Ok(())
    }

    /// Override values must be positive, and each rule's resolved policy
    /// must not start below its own floor.
    fn validate_style_rules(&self) -> Result<()> {
        let base = self.layout.default_policy();
        for (i, rule) in self.style_rules.iter().enumerate() {
            let field = |name: &str| format!("style_rules[{i}].{name}");
            let overrides = [
                ("font_size", rule.style.font_size),
                ("min_font_size", rule.style.min_font_size),
                ("line_height_multiplier", rule.style.line_height_multiplier),
            ];
            for (name, value) in overrides {
                if let Some(value) = value
                    && !(value.is_finite() && value > 0.0)
                {
                    return Err(Error::ConfigInvalid {
                        field: field(name),
                        reason: format!("must be a positive number, got {value}"),
                    });
                }
            }

            let policy = rule.style.apply(base);
            if policy.min_font_size > policy.font_size {
                return Err(Error::ConfigInvalid {
                    field: field("min_font_size"),
                    reason: format!(
                        "{} is above the rule's font size {}",
                        policy.min_font_size, policy.font_size
                    ),
                });
            }
        }
        Ok(())
    }

    /// The rule table resolving field names to layout policies.
    pub fn style_rules(&self) -> StyleRules {
        StyleRules::new(self.layout.default_policy(), self.style_rules.clone())
    }

    /// Directory generated documents are written to, `./output` by default.
    pub fn output_dir(&self) -> PathBuf {
        self.output_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("output"))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert!((config.layout.shrink_step - 0.5).abs() < f32::EPSILON);
        assert_eq!(config.layout.overflow_line_overhead, 2);
        assert!(!config.employees.sync_to_primary);
        assert_eq!(config.employees.minimum_minutes, 15);
        assert_eq!(config.checklist.sections.len(), 4);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
template_path = "forms/checklist.pdf"

[layout]
shrink_step = 0.25

[employees]
sync_to_primary = true

[[style_rules]]
contains = ["serial"]
font_size = 8.0
"#
        )
        .unwrap();

        let config = AppConfig::from_file(file.path()).unwrap();
        assert_eq!(config.template_path, Some(PathBuf::from("forms/checklist.pdf")));
        assert!((config.layout.shrink_step - 0.25).abs() < f32::EPSILON);
        assert_eq!(config.layout.overflow_line_overhead, 2);
        assert!(config.employees.sync_to_primary);
        assert_eq!(config.employees.minimum_minutes, 15);
        assert_eq!(config.style_rules.len(), 1);

        let rules = config.style_rules();
        assert!((rules.policy_for("part_serial_fitted").font_size - 8.0).abs() < f32::EPSILON);
        assert!((rules.policy_for("site_name").font_size - 10.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[layout]\nshrink_step = 0.0").unwrap();
        assert!(matches!(
            AppConfig::from_file(file.path()),
            Err(Error::ConfigInvalid { .. })
        ));
    }

    #[test]
    fn test_style_rule_overrides_validated() {
        let cases = [
            ("font_size = 8.0\nmin_font_size = 9.0", "style_rules[0].min_font_size"),
            ("line_height_multiplier = 0.0", "style_rules[0].line_height_multiplier"),
            ("font_size = -2.0", "style_rules[0].font_size"),
            // the inherited floor of 7 is above this size
            ("font_size = 6.0", "style_rules[0].min_font_size"),
        ];
        for (body, expected) in cases {
            let mut file = tempfile::NamedTempFile::new().unwrap();
            writeln!(file, "[[style_rules]]\ncontains = [\"serial\"]\n{body}").unwrap();
            let result = AppConfig::from_file(file.path());
            assert!(
                matches!(&result, Err(Error::ConfigInvalid { field, .. }) if field == expected),
                "{body}: {result:?}"
            );
        }

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[[style_rules]]\ncontains = [\"serial\"]\nfont_size = 8.0\nmin_font_size = 6.5\nline_height_multiplier = 1.3"
        )
        .unwrap();
        assert!(AppConfig::from_file(file.path()).is_ok());
    }

    #[test]
    fn test_layout_floor_above_size_rejected() {
        let layout = LayoutConfig {
            cell_min_font_size: 10.0,
            ..LayoutConfig::default()
        };
        assert!(matches!(
            layout.validate(),
            Err(Error::ConfigInvalid { field, .. }) if field == "layout.cell_min_font_size"
        ));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            AppConfig::from_file("/nonexistent/checklist.toml"),
            Err(Error::ConfigLoad(_))
        ));
    }
}
