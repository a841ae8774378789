//! Core catalog types.
//!
//! Copyright (c) 2025 Posit, PBC
//!
//! The type hierarchy is:
//! - VariableRecord: one `@name: value;` declaration from a unit
//! - Catalog: every user-editable record of a unit, plus its group layout
//! - ResolvedVariable: a record joined with its effective and resolved value

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Group used for declarations that no `// @group:` marker precedes.
pub const DEFAULT_GROUP: &str = "General";

/// Semantic type of a variable's value.
///
/// Inferred from the value first and, for references and untyped values,
/// from the variable name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VariableType {
    Color,
    Size,
    Number,
    FontFamily,
    FontWeight,
    Duration,
    Easing,
    Border,
    Shadow,
    Keyword,
    Reference,
    Mixed,
}

impl VariableType {
    /// Stage-1 results that name-based inference may refine.
    pub fn is_refinable(self) -> bool {
        matches!(
            self,
            VariableType::Reference | VariableType::Mixed | VariableType::Keyword
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            VariableType::Color => "color",
            VariableType::Size => "size",
            VariableType::Number => "number",
            VariableType::FontFamily => "font-family",
            VariableType::FontWeight => "font-weight",
            VariableType::Duration => "duration",
            VariableType::Easing => "easing",
            VariableType::Border => "border",
            VariableType::Shadow => "shadow",
            VariableType::Keyword => "keyword",
            VariableType::Reference => "reference",
            VariableType::Mixed => "mixed",
        }
    }
}

impl std::fmt::Display for VariableType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single declared variable.
///
/// `raw_value` is the right-hand side exactly as written: a literal, a
/// reference, an arithmetic expression or a function call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableRecord {
    pub name: String,
    pub raw_value: String,
    #[serde(rename = "type")]
    pub var_type: VariableType,
    pub group: String,
    pub source_unit: String,
    pub label: String,
}

/// Parsed variables of one unit.
///
/// `variables` keeps declaration order. `groups` lists every group marker in
/// order of first appearance with the names currently assigned to it; a
/// group may be empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    pub unit: String,
    pub variables: IndexMap<String, VariableRecord>,
    pub groups: IndexMap<String, Vec<String>>,
}

impl Catalog {
    /// Create an empty catalog for a unit
    pub fn new(unit: impl Into<String>) -> Self {
        Self {
            unit: unit.into(),
            ..Default::default()
        }
    }

    pub fn get(&self, name: &str) -> Option<&VariableRecord> {
        self.variables.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.variables.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    pub fn records(&self) -> impl Iterator<Item = &VariableRecord> {
        self.variables.values()
    }

    /// Records grouped for presentation, including empty groups.
    pub fn grouped(&self) -> Vec<(&str, Vec<&VariableRecord>)> {
        self.groups
            .iter()
            .map(|(label, names)| {
                let records = names.iter().filter_map(|n| self.variables.get(n)).collect();
                (label.as_str(), records)
            })
            .collect()
    }
}

/// Result payload for one variable of a unit.
///
/// `value` is the effective raw value (the override if one exists, else the
/// declared default); `resolved` is the outcome of cascade resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedVariable {
    pub name: String,
    pub value: String,
    #[serde(rename = "type")]
    pub var_type: VariableType,
    pub group: String,
    pub label: String,
    pub resolved: String,
    /// Whether `value` comes from the override store
    #[serde(default)]
    pub overridden: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, value: &str, group: &str) -> VariableRecord {
        VariableRecord {
            name: name.to_string(),
            raw_value: value.to_string(),
            var_type: VariableType::Mixed,
            group: group.to_string(),
            source_unit: "button".to_string(),
            label: name.to_string(),
        }
    }

    #[test]
    fn test_variable_type_serde_kebab_case() {
        let json = serde_json::to_string(&VariableType::FontFamily).unwrap();
        assert_eq!(json, "\"font-family\"");
        let parsed: VariableType = serde_json::from_str("\"font-weight\"").unwrap();
        assert_eq!(parsed, VariableType::FontWeight);
        assert_eq!(VariableType::FontFamily.to_string(), "font-family");
    }

    #[test]
    fn test_refinable_types() {
        assert!(VariableType::Reference.is_refinable());
        assert!(VariableType::Mixed.is_refinable());
        assert!(VariableType::Keyword.is_refinable());
        assert!(!VariableType::Color.is_refinable());
        assert!(!VariableType::Number.is_refinable());
    }

    #[test]
    fn test_catalog_grouped_keeps_empty_groups() {
        let mut catalog = Catalog::new("button");
        catalog
            .variables
            .insert("button-color".to_string(), record("button-color", "#fff", "Colors"));
        catalog.groups.insert("Colors".to_string(), vec!["button-color".to_string()]);
        catalog.groups.insert("Sizes".to_string(), vec![]);

        let grouped = catalog.grouped();
        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped[0].0, "Colors");
        assert_eq!(grouped[0].1.len(), 1);
        assert_eq!(grouped[1].0, "Sizes");
        assert!(grouped[1].1.is_empty());
    }

    #[test]
    fn test_record_serializes_type_field() {
        let json = serde_json::to_value(record("x", "1", DEFAULT_GROUP)).unwrap();
        assert_eq!(json["type"], "mixed");
        assert!(json.get("var_type").is_none());
    }
}
