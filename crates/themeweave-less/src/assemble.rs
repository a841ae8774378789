//! Source assembly.
//!
//! Copyright (c) 2025 Posit, PBC
//!
//! Builds one complete LESS program per unit by concatenating layers in a
//! fixed order. The compiler applies last-definition-wins to variables, so
//! the order is what makes overrides override:
//!
//! 1. base declarations
//! 2. mixins
//! 3. declarations of every other unit (sorted)
//! 4. global defaults not declared in the base layer
//! 5. theme-level declaration overrides
//! 6. this unit's declarations
//! 7. hook stubs for every hook call site
//! 8. this unit's rule body
//! 9. user overrides
//!
//! Reordering these layers changes compiled output.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use tracing::{debug, warn};

use themeweave_system_runtime::OverrideMap;

use crate::catalog::{parse_declaration, scan_declarations};
use crate::error::LessError;
use crate::layout::ThemeSources;
use crate::scan::code_mask;

/// Declarations-section marker: `// Variables` or `/* Variables */`.
static DECLARATIONS_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*(?://\s*variables\s*|/\*\s*variables\s*\*/\s*)$").unwrap()
});

/// A hook call site such as `.hook-button();`. Captures the hook name.
static HOOK_CALL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\.(hook-[A-Za-z0-9_-]+)\(\s*\)\s*;").unwrap());

/// One layer of an assembled program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Layer {
    Base,
    Mixins,
    CrossUnit,
    GlobalDefaults,
    Theme,
    UnitDeclarations,
    HookStubs,
    RuleBody,
    Overrides,
}

impl Layer {
    /// Emission order.
    pub const ORDER: [Layer; 9] = [
        Layer::Base,
        Layer::Mixins,
        Layer::CrossUnit,
        Layer::GlobalDefaults,
        Layer::Theme,
        Layer::UnitDeclarations,
        Layer::HookStubs,
        Layer::RuleBody,
        Layer::Overrides,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Layer::Base => "base",
            Layer::Mixins => "mixins",
            Layer::CrossUnit => "cross-unit",
            Layer::GlobalDefaults => "global-defaults",
            Layer::Theme => "theme",
            Layer::UnitDeclarations => "unit-declarations",
            Layer::HookStubs => "hook-stubs",
            Layer::RuleBody => "rule-body",
            Layer::Overrides => "overrides",
        }
    }
}

impl std::fmt::Display for Layer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// An assembled program as tagged fragments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssembledSource {
    pub unit: String,
    /// One entry per layer, in [`Layer::ORDER`]; text may be empty
    pub fragments: Vec<(Layer, String)>,
}

impl AssembledSource {
    pub fn fragment(&self, layer: Layer) -> Option<&str> {
        self.fragments
            .iter()
            .find(|(l, _)| *l == layer)
            .map(|(_, text)| text.as_str())
    }

    /// The complete program: non-empty fragments joined by a blank line.
    pub fn to_source(&self) -> String {
        let parts: Vec<&str> = self
            .fragments
            .iter()
            .map(|(_, text)| text.trim_matches('\n'))
            .filter(|text| !text.trim().is_empty())
            .collect();
        let mut source = parts.join("\n\n");
        if !source.is_empty() {
            source.push('\n');
        }
        source
    }
}

/// A unit file split into its declarations and its rule body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnitParts {
    /// Extracted declaration lines, verbatim
    pub declarations: Vec<String>,
    /// Every other line, in order
    pub body: String,
}

/// Whether `line` opens a rule block: a non-comment line ending in `{`.
pub fn is_rule_selector_line(line: &str) -> bool {
    let trimmed = line.trim();
    !trimmed.starts_with("//")
        && !trimmed.starts_with("/*")
        && !trimmed.starts_with('*')
        && trimmed.ends_with('{')
}

/// Split a unit file into declarations and rule body.
///
/// With a declarations marker, declaration lines between the marker and the
/// first rule-selector line are extracted. Without one, declaration lines
/// before the first rule-selector line are.
pub fn split_unit(source: &str) -> UnitParts {
    let source = source.strip_prefix('\u{feff}').unwrap_or(source);
    let lines: Vec<&str> = source.lines().collect();

    let marker = lines.iter().position(|l| DECLARATIONS_MARKER.is_match(l));
    let start = marker.map_or(0, |m| m + 1);
    let end = lines[start..]
        .iter()
        .position(|l| is_rule_selector_line(l))
        .map_or(lines.len(), |p| start + p);

    let mut parts = UnitParts::default();
    let mut body = Vec::with_capacity(lines.len());
    for (i, line) in lines.iter().enumerate() {
        if (start..end).contains(&i) && parse_declaration(line).is_some() {
            parts.declarations.push(line.trim().to_string());
        } else {
            body.push(*line);
        }
    }
    parts.body = body.join("\n");
    parts
}

/// Distinct hook names called in `source` outside strings and comments.
pub fn hook_call_sites(source: &str) -> BTreeSet<String> {
    let mask = code_mask(source);
    HOOK_CALL
        .captures_iter(source)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            if !mask[whole.start()] {
                return None;
            }
            caps.get(1).map(|m| m.as_str().to_string())
        })
        .collect()
}

/// Restrict a variable name to `[A-Za-z0-9_-]`.
pub fn sanitize_name(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect()
}

/// Whether `value` contains `;`, `{` or `}` and would break out of an
/// `@name: value;` declaration.
pub fn has_statement_delimiter(value: &str) -> bool {
    value.contains([';', '{', '}'])
}

/// Override declarations in sorted name order.
///
/// Names are sanitized; entries whose name or value ends up empty are
/// skipped, as are values that would break out of the declaration.
pub fn format_overrides(overrides: &OverrideMap) -> String {
    let mut sanitized = BTreeMap::new();
    for (name, value) in overrides {
        let clean = sanitize_name(name);
        let value = value.trim();
        if clean.is_empty() || value.is_empty() {
            debug!(name = %name, "skipping empty override");
            continue;
        }
        if has_statement_delimiter(value) {
            warn!(name = %name, value, "ignoring override value with statement delimiters");
            continue;
        }
        sanitized.insert(clean, value);
    }
    sanitized
        .into_iter()
        .map(|(name, value)| format!("@{}: {};", name, value))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Build the complete program for `unit`.
///
/// # Errors
///
/// Returns `LessError::UnitNotFound` when the unit has no rule-body file.
/// Missing shared layers contribute nothing.
pub fn assemble(
    sources: &ThemeSources<'_>,
    unit: &str,
    overrides: &OverrideMap,
) -> Result<AssembledSource, LessError> {
    let own = split_unit(&sources.unit(unit)?);
    let base = sources.base()?.unwrap_or_default();
    let mixins = sources.mixins()?.unwrap_or_default();
    let theme = sources.theme()?.unwrap_or_default();

    let mut cross_unit = Vec::new();
    for other in sources.units()? {
        if other == unit {
            continue;
        }
        let parts = split_unit(&sources.unit(&other)?);
        cross_unit.extend(parts.declarations);
    }

    let base_names: HashSet<String> = scan_declarations(&base)
        .into_iter()
        .map(|(name, _)| name)
        .collect();
    let global_defaults: Vec<String> = sources
        .global()?
        .unwrap_or_default()
        .lines()
        .filter(|line| parse_declaration(line).is_some_and(|(name, _)| !base_names.contains(name)))
        .map(|line| line.trim().to_string())
        .collect();

    let mut hooks = hook_call_sites(&own.body);
    if let Some(inverse) = sources.inverse()? {
        hooks.extend(hook_call_sites(&inverse));
    }
    let stubs: Vec<String> = hooks.iter().map(|h| format!(".{}() {{}}", h)).collect();

    debug!(
        unit,
        cross_unit = cross_unit.len(),
        global_defaults = global_defaults.len(),
        hooks = stubs.len(),
        overrides = overrides.len(),
        "assembled unit source"
    );

    let fragments = vec![
        (Layer::Base, base),
        (Layer::Mixins, mixins),
        (Layer::CrossUnit, cross_unit.join("\n")),
        (Layer::GlobalDefaults, global_defaults.join("\n")),
        (Layer::Theme, theme),
        (Layer::UnitDeclarations, own.declarations.join("\n")),
        (Layer::HookStubs, stubs.join("\n")),
        (Layer::RuleBody, own.body),
        (Layer::Overrides, format_overrides(overrides)),
    ];

    Ok(AssembledSource {
        unit: unit.to_string(),
        fragments,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_split_unit_with_marker() {
        let source = "\
@before-marker: 1px;
// Variables
// ========
@button-color: #fff;
@button-size: 2px;

.uk-button {
    @scoped: 3px;
    color: @button-color;
}
@after-rules: 4px;";
        let parts = split_unit(source);
        assert_eq!(parts.declarations, vec!["@button-color: #fff;", "@button-size: 2px;"]);
        assert!(parts.body.contains("@before-marker: 1px;"));
        assert!(parts.body.contains("@scoped: 3px;"));
        assert!(parts.body.contains("@after-rules: 4px;"));
        assert!(!parts.body.contains("@button-color: #fff;"));
    }

    #[test]
    fn test_split_unit_without_marker() {
        let source = "@card-a: 1px;\n\n.uk-card {\n  padding: @card-a;\n}\n@card-b: 2px;\n";
        let parts = split_unit(source);
        assert_eq!(parts.declarations, vec!["@card-a: 1px;"]);
        assert_eq!(parts.body, "\n.uk-card {\n  padding: @card-a;\n}\n@card-b: 2px;");
    }

    #[test]
    fn test_split_unit_block_marker_and_mixin_definition() {
        let source = "/* VARIABLES */\n@a: 1;\n.hook-card() {\n}\n@b: 2;\n";
        let parts = split_unit(source);
        assert_eq!(parts.declarations, vec!["@a: 1;"]);
        assert!(parts.body.contains("@b: 2;"));
    }

    #[test]
    fn test_rule_selector_line() {
        assert!(is_rule_selector_line(".uk-button {"));
        assert!(is_rule_selector_line("  .hook-button() {"));
        assert!(is_rule_selector_line("@media (min-width: 640px) {"));
        assert!(!is_rule_selector_line("// .commented {"));
        assert!(!is_rule_selector_line("@a: 1px;"));
    }

    #[test]
    fn test_hook_call_sites() {
        let source = "\
.uk-button {
    .hook-button();
    &:hover { .hook-button-hover(); }
    // .hook-commented();
}
.hook-button() {}
.hook-button();
";
        let hooks: Vec<_> = hook_call_sites(source).into_iter().collect();
        assert_eq!(hooks, vec!["hook-button", "hook-button-hover"]);
    }

    #[test]
    fn test_format_overrides_sanitizes_and_skips_empty() {
        let overrides = OverrideMap::from([
            ("btn-color".to_string(), "".to_string()),
            ("button-background".to_string(), " #1e87f0 ".to_string()),
            ("a<b>c".to_string(), "1px".to_string()),
            ("!!!".to_string(), "2px".to_string()),
            ("evil".to_string(), "red; } body { x: y".to_string()),
        ]);
        assert_eq!(
            format_overrides(&overrides),
            "@abc: 1px;\n@button-background: #1e87f0;"
        );
    }

    #[test]
    fn test_to_source_skips_empty_fragments() {
        let assembled = AssembledSource {
            unit: "x".to_string(),
            fragments: vec![
                (Layer::Base, "@a: 1;\n".to_string()),
                (Layer::Mixins, String::new()),
                (Layer::RuleBody, ".x { a: @a; }".to_string()),
            ],
        };
        assert_eq!(assembled.to_source(), "@a: 1;\n\n.x { a: @a; }\n");
        assert_eq!(assembled.fragment(Layer::Mixins), Some(""));
        assert_eq!(assembled.fragment(Layer::Overrides), None);
    }

    #[test]
    fn test_layer_order_names() {
        let names: Vec<_> = Layer::ORDER.iter().map(|l| l.to_string()).collect();
        assert_eq!(names.first().map(String::as_str), Some("base"));
        assert_eq!(names.last().map(String::as_str), Some("overrides"));
        assert_eq!(names.len(), 9);
    }
}
