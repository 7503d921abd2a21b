//! Field-name driven style rules.
//!
//! Rules are evaluated top to bottom and the first match wins. A field whose
//! name matches nothing gets the default single-line policy.

use serde::{Deserialize, Serialize};

use super::field::LayoutPolicy;

/// Partial policy applied on top of the default when a rule matches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PolicyOverride {
    #[serde(default)]
    pub font_size: Option<f32>,
    #[serde(default)]
    pub min_font_size: Option<f32>,
    #[serde(default)]
    pub line_height_multiplier: Option<f32>,
    #[serde(default)]
    pub multiline: Option<bool>,
}

impl PolicyOverride {
    pub fn apply(&self, base: LayoutPolicy) -> LayoutPolicy {
        LayoutPolicy {
            font_size: self.font_size.unwrap_or(base.font_size),
            min_font_size: self.min_font_size.unwrap_or(base.min_font_size),
            line_height_multiplier: self
                .line_height_multiplier
                .unwrap_or(base.line_height_multiplier),
            multiline: self.multiline.unwrap_or(base.multiline),
        }
    }
}

/// One `(predicate, override)` pair.
///
/// The predicate matches when the lowercased field name contains any of
/// `contains`, or starts with `prefix`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyleRule {
    #[serde(default)]
    pub contains: Vec<String>,
    #[serde(default)]
    pub prefix: Option<String>,
    #[serde(flatten)]
    pub style: PolicyOverride,
}

impl StyleRule {
    pub fn containing(needles: &[&str], style: PolicyOverride) -> Self {
        Self {
            contains: needles.iter().map(|s| (*s).to_string()).collect(),
            prefix: None,
            style,
        }
    }

    pub fn matches(&self, field_name: &str) -> bool {
        let name = field_name.to_lowercase();
        self.contains
            .iter()
            .any(|needle| !needle.is_empty() && name.contains(&needle.to_lowercase()))
            || self
                .prefix
                .as_ref()
                .is_some_and(|prefix| name.starts_with(&prefix.to_lowercase()))
    }
}

/// Ordered rule table resolving a field name to its layout policy.
#[derive(Debug, Clone, PartialEq)]
pub struct StyleRules {
    default: LayoutPolicy,
    rules: Vec<StyleRule>,
}

impl StyleRules {
    pub const fn new(default: LayoutPolicy, rules: Vec<StyleRule>) -> Self {
        Self { default, rules }
    }

    /// Rules shipped with the maintenance checklist template.
    pub fn builtin_rules() -> Vec<StyleRule> {
        vec![
            StyleRule::containing(
                &["notes", "desc", "comment", "remarks", "findings"],
                PolicyOverride {
                    font_size: Some(9.0),
                    min_font_size: Some(6.0),
                    multiline: Some(true),
                    ..PolicyOverride::default()
                },
            ),
            StyleRule::containing(
                &["address"],
                PolicyOverride {
                    font_size: Some(9.0),
                    min_font_size: Some(7.0),
                    multiline: Some(true),
                    ..PolicyOverride::default()
                },
            ),
            StyleRule::containing(
                &["date", "time"],
                PolicyOverride {
                    min_font_size: Some(8.0),
                    multiline: Some(false),
                    ..PolicyOverride::default()
                },
            ),
        ]
    }

    pub const fn default_policy(&self) -> LayoutPolicy {
        self.default
    }

    pub fn rules(&self) -> &[StyleRule] {
        &self.rules
    }

    pub fn policy_for(&self, field_name: &str) -> LayoutPolicy {
        self.rules
            .iter()
            .find(|rule| rule.matches(field_name))
            .map_or(self.default, |rule| rule.style.apply(self.default))
    }
}

impl Default for StyleRules {
    fn default() -> Self {
        Self::new(LayoutPolicy::default(), Self::builtin_rules())
    }
}
