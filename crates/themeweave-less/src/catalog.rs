//! Variable catalog parsing.
//!
//! Copyright (c) 2025 Posit, PBC
//!
//! A unit source is scanned line by line. Two kinds of lines matter:
//!
//! ```text
//! // @group: Colors
//! @button-background: @global-muted-background;   // trailing comments are fine
//! ```
//!
//! Everything else (rules, mixins, malformed declarations) is skipped.
//! Parsing is total: it never fails, it only produces fewer records.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::infer::infer_type;
use crate::types::{Catalog, DEFAULT_GROUP, VariableRecord};

/// A single-line `@name: value;` declaration, optionally followed by a comment.
///
/// Captures the name in group 1 and the trimmed value in group 2.
static DECLARATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*@([A-Za-z_-][A-Za-z0-9_-]*)\s*:\s*([^;]*?)\s*;\s*(?://.*|/\*.*\*/\s*)?$")
        .unwrap()
});

/// `// @group: Label` or `/* @group: Label */` on a line of its own.
static GROUP_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(?://\s*@group:\s*(.+?)\s*|/\*\s*@group:\s*(.+?)\s*\*/\s*)$").unwrap()
});

/// Values that declare nothing.
const PLACEHOLDER_VALUES: &[&str] = &["", "~\"\"", "~''", "\"\"", "''"];

/// Split a declaration line into `(name, value)`.
pub fn parse_declaration(line: &str) -> Option<(&str, &str)> {
    let caps = DECLARATION.captures(line)?;
    Some((caps.get(1)?.as_str(), caps.get(2)?.as_str()))
}

/// Label of a group marker line, if the line is one.
pub fn group_marker(line: &str) -> Option<&str> {
    let caps = GROUP_MARKER.captures(line)?;
    caps.get(1).or_else(|| caps.get(2)).map(|m| m.as_str())
}

/// Empty or no-op values such as `~""`.
pub fn is_placeholder_value(value: &str) -> bool {
    PLACEHOLDER_VALUES.contains(&value.trim())
}

/// Helper declarations that must never surface as editable variables.
pub fn is_internal_name(name: &str) -> bool {
    name.starts_with("internal-") || name.starts_with('_') || name.starts_with('-')
}

/// Every declaration in `source`, in order, duplicates included.
///
/// Unlike [`parse_catalog`] nothing is filtered; this is the view the
/// resolver and the fallback generator need, where internal helpers still
/// take part in reference chains.
pub fn scan_declarations(source: &str) -> Vec<(String, String)> {
    let source = source.strip_prefix('\u{feff}').unwrap_or(source);
    source
        .lines()
        .filter_map(parse_declaration)
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .collect()
}

/// Human-readable label: `button-hover-color` in unit `button` → `Hover Color`.
pub fn derive_label(unit: &str, name: &str) -> String {
    let stripped = name
        .strip_prefix(unit)
        .and_then(|rest| rest.strip_prefix('-'))
        .filter(|rest| !rest.is_empty())
        .unwrap_or(name);

    stripped
        .split('-')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Parse a unit's source into its catalog.
///
/// # Behavior
///
/// - A group marker sets the current group and resets that group's member list
/// - Placeholder values and internal names are skipped
/// - A name declared twice keeps its first position but takes the value, type
///   and group of the last declaration
pub fn parse_catalog(unit: &str, source: &str) -> Catalog {
    let source = source.strip_prefix('\u{feff}').unwrap_or(source);
    let mut catalog = Catalog::new(unit);
    let mut group = DEFAULT_GROUP.to_string();

    for line in source.lines() {
        if let Some(label) = group_marker(line) {
            group = label.to_string();
            catalog.groups.insert(group.clone(), Vec::new());
            continue;
        }

        let Some((name, value)) = parse_declaration(line) else {
            continue;
        };
        if is_placeholder_value(value) {
            debug!(unit, name, "skipping placeholder declaration");
            continue;
        }
        if is_internal_name(name) {
            debug!(unit, name, "skipping internal declaration");
            continue;
        }

        if let Some(previous) = catalog.variables.get(name) {
            if let Some(members) = catalog.groups.get_mut(&previous.group) {
                members.retain(|member| member != name);
            }
        }
        catalog
            .groups
            .entry(group.clone())
            .or_default()
            .push(name.to_string());

        let record = VariableRecord {
            name: name.to_string(),
            raw_value: value.to_string(),
            var_type: infer_type(name, value),
            group: group.clone(),
            source_unit: unit.to_string(),
            label: derive_label(unit, name),
        };
        catalog.variables.insert(name.to_string(), record);
    }

    catalog
}
