//! Cascade resolution.
//!
//! Copyright (c) 2025 Posit, PBC
//!
//! Two resolution strategies share this module:
//!
//! - [`Resolver`] follows a chain of bare references (`@a: @b;`) for a
//!   single variable, looking each link up in the user overrides first and
//!   in the declared defaults second. It is used for the variable listings.
//! - [`resolve_all`] rewrites every `@name` occurrence inside every value of
//!   a snapshot until a fixed point. It handles expressions such as
//!   `(@global-line-height * 3) * 1em` and feeds the fallback generator.
//!
//! Neither fails. Names that cannot be resolved stay as literal `@name`
//! text. Cycles stop at the depth limit in [`Resolver`]; in [`resolve_all`]
//! references to names on a cycle are left unexpanded.

use std::collections::{BTreeMap, HashMap, HashSet};

use indexmap::IndexMap;
use tracing::debug;

use themeweave_system_runtime::{OverrideMap, OverrideStore, RuntimeResult};

use crate::scan::{code_mask, is_ident_byte, split_top_level_whitespace};
use crate::types::{Catalog, ResolvedVariable};

/// Reference hops followed by [`Resolver::resolve`] before giving up.
pub const DEFAULT_DEPTH_BUDGET: usize = 10;

/// Substitution passes run by [`resolve_all`] before giving up.
pub const DEFAULT_MAX_PASSES: usize = 10;

/// Longest value [`resolve_all`] will produce by substitution.
pub const MAX_RESOLVED_LEN: usize = 4096;

/// The name referenced by a value that is exactly `@name`.
pub fn is_bare_reference(value: &str) -> Option<&str> {
    let name = value.trim().strip_prefix('@')?;
    if !name.is_empty() && name.bytes().all(is_ident_byte) {
        Some(name)
    } else {
        None
    }
}

/// Every unit's overrides, flattened once per resolution session.
///
/// Overrides are visible across units by bare name. When several units
/// override the same name, the requesting unit's own value wins, then the
/// first unit in sorted order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OverrideLookup {
    units: BTreeMap<String, OverrideMap>,
}

impl OverrideLookup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the overrides of every listed unit from `store`.
    pub fn load<'u>(
        store: &dyn OverrideStore,
        units: impl IntoIterator<Item = &'u str>,
    ) -> RuntimeResult<Self> {
        let mut lookup = Self::new();
        for unit in units {
            let values = store.get(unit)?;
            lookup.insert(unit, values);
        }
        debug!(units = lookup.units.len(), "loaded override lookup");
        Ok(lookup)
    }

    /// Add or replace one unit's overrides. Empty maps are dropped.
    pub fn insert(&mut self, unit: &str, values: OverrideMap) {
        if values.is_empty() {
            self.units.remove(unit);
        } else {
            self.units.insert(unit.to_string(), values);
        }
    }

    /// Override value of `name` as seen from `unit`.
    pub fn get(&self, unit: &str, name: &str) -> Option<&str> {
        if let Some(value) = self.units.get(unit).and_then(|m| m.get(name)) {
            return Some(value);
        }
        self.units
            .iter()
            .filter(|(other, _)| other.as_str() != unit)
            .find_map(|(_, m)| m.get(name))
            .map(String::as_str)
    }

    /// Every override visible from `unit`, with collisions settled.
    pub fn flattened_for(&self, unit: &str) -> OverrideMap {
        let mut flat = OverrideMap::new();
        for (other, values) in self.units.iter().rev() {
            if other != unit {
                flat.extend(values.iter().map(|(k, v)| (k.clone(), v.clone())));
            }
        }
        if let Some(own) = self.units.get(unit) {
            flat.extend(own.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
        flat
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}

/// Single-variable resolver for one session.
///
/// Holds the global defaults catalog and the override lookup; both are
/// snapshots taken when the session started.
#[derive(Debug, Clone)]
pub struct Resolver {
    global: Catalog,
    overrides: OverrideLookup,
}

impl Resolver {
    pub fn new(global: Catalog, overrides: OverrideLookup) -> Self {
        Self { global, overrides }
    }

    pub fn overrides(&self) -> &OverrideLookup {
        &self.overrides
    }

    pub fn global(&self) -> &Catalog {
        &self.global
    }

    /// Resolve `name` as seen from `catalog`'s unit.
    ///
    /// The starting value is the override, else the unit's declared value,
    /// else the global default. Unknown names come back as `@name`.
    pub fn resolve(&self, catalog: &Catalog, name: &str, depth_budget: usize) -> String {
        let unit = catalog.unit.as_str();
        let start = self
            .overrides
            .get(unit, name)
            .or_else(|| catalog.get(name).map(|r| r.raw_value.as_str()))
            .or_else(|| self.global.get(name).map(|r| r.raw_value.as_str()));

        match start {
            Some(value) => self.follow(catalog, value, depth_budget),
            None => {
                debug!(unit, name, "unresolved variable");
                format!("@{}", name)
            }
        }
    }

    /// Follow a value through bare-reference hops.
    ///
    /// Each hop looks in the overrides, then the unit's own declarations,
    /// then the global defaults. A missing target or an exhausted budget
    /// returns the current value unchanged.
    pub fn follow(&self, catalog: &Catalog, value: &str, depth_budget: usize) -> String {
        let unit = catalog.unit.as_str();
        let mut current = value;
        let mut budget = depth_budget;

        while let Some(target) = is_bare_reference(current) {
            if budget == 0 {
                debug!(unit, value, "reference depth budget exhausted");
                break;
            }
            let next = self
                .overrides
                .get(unit, target)
                .or_else(|| catalog.get(target).map(|r| r.raw_value.as_str()))
                .or_else(|| self.global.get(target).map(|r| r.raw_value.as_str()));
            match next {
                Some(next) => {
                    current = next;
                    budget -= 1;
                }
                None => {
                    debug!(unit, reference = target, "unresolved reference");
                    break;
                }
            }
        }
        current.trim().to_string()
    }

    /// Every catalog record joined with its effective and resolved value.
    pub fn resolve_catalog(&self, catalog: &Catalog) -> Vec<ResolvedVariable> {
        catalog
            .records()
            .map(|record| {
                let override_value = self.overrides.get(&catalog.unit, &record.name);
                let value = override_value.unwrap_or(&record.raw_value).to_string();
                ResolvedVariable {
                    name: record.name.clone(),
                    resolved: self.resolve(catalog, &record.name, DEFAULT_DEPTH_BUDGET),
                    value,
                    var_type: record.var_type,
                    group: record.group.clone(),
                    label: record.label.clone(),
                    overridden: override_value.is_some(),
                }
            })
            .collect()
    }
}

/// Resolve every value of `snapshot` to a fixed point.
///
/// Each pass replaces every `@name` occurrence with the value `name` had at
/// the end of the previous pass. A substituted value containing infix
/// arithmetic is parenthesized when it lands inside a larger expression.
/// Stops at the first pass that changes nothing or after `max_passes`.
///
/// A reference to a name on a cycle (`@a: @a + @a;`, `@a: @b * @b; @b: @a;`)
/// is never expanded, and a substitution that would grow a value past
/// [`MAX_RESOLVED_LEN`] is discarded.
pub fn resolve_all(snapshot: &IndexMap<String, String>, max_passes: usize) -> IndexMap<String, String> {
    let cyclic = cyclic_names(snapshot);
    let mut current = snapshot.clone();
    for pass in 1..=max_passes {
        let next: IndexMap<String, String> = current
            .iter()
            .map(|(name, value)| {
                let substituted =
                    substitute_filtered(value, &current, |target| cyclic.contains(target));
                if substituted.len() > MAX_RESOLVED_LEN && substituted.len() > value.len() {
                    debug!(name = %name, len = substituted.len(), "resolved value too long, keeping previous");
                    (name.clone(), value.clone())
                } else {
                    (name.clone(), substituted)
                }
            })
            .collect();
        if next == current {
            debug!(passes = pass, "bulk resolution reached a fixed point");
            return next;
        }
        current = next;
    }
    debug!(max_passes, "bulk resolution stopped at the pass limit");
    current
}

/// Names referenced as code (`@name`, not `@{name}`) in `value`.
fn referenced_names(value: &str) -> Vec<&str> {
    let bytes = value.as_bytes();
    let mask = code_mask(value);
    let mut names = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] != b'@' || !mask[i] {
            i += 1;
            continue;
        }
        let start = i + 1;
        let mut end = start;
        while end < bytes.len() && is_ident_byte(bytes[end]) {
            end += 1;
        }
        if end > start {
            names.push(&value[start..end]);
        }
        i = end.max(i + 1);
    }
    names
}

/// Names whose value leads back to themselves through references.
fn cyclic_names(snapshot: &IndexMap<String, String>) -> HashSet<&str> {
    let edges: HashMap<&str, Vec<&str>> = snapshot
        .iter()
        .map(|(name, value)| {
            let targets = referenced_names(value)
                .into_iter()
                .filter(|target| snapshot.contains_key(*target))
                .collect();
            (name.as_str(), targets)
        })
        .collect();

    let cyclic: HashSet<&str> = edges
        .keys()
        .copied()
        .filter(|&start| {
            let mut seen = HashSet::new();
            let mut stack = edges[start].clone();
            while let Some(next) = stack.pop() {
                if next == start {
                    return true;
                }
                if seen.insert(next) {
                    stack.extend(edges.get(next).into_iter().flatten().copied());
                }
            }
            false
        })
        .collect();
    if !cyclic.is_empty() {
        debug!(count = cyclic.len(), "cyclic references left unexpanded");
    }
    cyclic
}

/// Replace each known `@name` in `value` once.
///
/// References inside strings, comments and `@{name}` interpolations are left
/// alone.
pub fn substitute_references(value: &str, values: &IndexMap<String, String>) -> String {
    substitute_filtered(value, values, |_| false)
}

fn substitute_filtered(
    value: &str,
    values: &IndexMap<String, String>,
    skip: impl Fn(&str) -> bool,
) -> String {
    let bytes = value.as_bytes();
    let mask = code_mask(value);
    let whole = is_bare_reference(value).is_some();
    let mut out = String::with_capacity(value.len());
    let mut copied = 0;
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] != b'@' || !mask[i] {
            i += 1;
            continue;
        }
        let start = i + 1;
        let mut end = start;
        while end < bytes.len() && is_ident_byte(bytes[end]) {
            end += 1;
        }
        let name = &value[start..end];
        let replacement = (!name.is_empty() && !skip(name))
            .then(|| values.get(name))
            .flatten();
        let Some(replacement) = replacement else {
            i = end.max(i + 1);
            continue;
        };

        out.push_str(&value[copied..i]);
        if !whole && has_infix_arithmetic(replacement) && !is_parenthesized(replacement) {
            out.push('(');
            out.push_str(replacement.trim());
            out.push(')');
        } else {
            out.push_str(replacement.trim());
        }
        copied = end;
        i = end;
    }
    out.push_str(&value[copied..]);
    out
}

/// Whether a value has a top-level `*`, `+`, spaced `-` or `/` operator.
///
/// An unspaced `/` only counts in a single-token value: in `12px/1.5 Arial`
/// it is the font shorthand separator.
fn has_infix_arithmetic(value: &str) -> bool {
    let mask = code_mask(value);
    let bytes = value.as_bytes();
    let single_token = split_top_level_whitespace(value).len() <= 1;
    let spaced = |i: usize| {
        i > 0
            && bytes[i - 1].is_ascii_whitespace()
            && bytes.get(i + 1).is_some_and(|n| n.is_ascii_whitespace())
    };
    let mut depth = 0usize;
    for (i, &b) in bytes.iter().enumerate() {
        if !mask[i] {
            continue;
        }
        match b {
            b'(' => depth += 1,
            b')' => depth = depth.saturating_sub(1),
            b'*' | b'+' if depth == 0 => return true,
            b'/' if depth == 0 && (single_token || spaced(i)) => return true,
            b'-' if depth == 0 && spaced(i) => return true,
            _ => {}
        }
    }
    false
}

/// Whether the whole value is one parenthesized group.
fn is_parenthesized(value: &str) -> bool {
    let value = value.trim();
    if !value.starts_with('(') {
        return false;
    }
    let mask = code_mask(value);
    crate::scan::matching_paren(value, &mask, 0) == Some(value.len() - 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::parse_catalog;
    use themeweave_system_runtime::MemoryOverrideStore;

    fn snapshot(pairs: &[(&str, &str)]) -> IndexMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    /// Build a lookup from `(unit, name, value)` triples.
    fn overrides(entries: &[(&str, &str, &str)]) -> OverrideLookup {
        let mut table: BTreeMap<String, OverrideMap> = BTreeMap::new();
        for (unit, name, value) in entries {
            table
                .entry(unit.to_string())
                .or_default()
                .insert(name.to_string(), value.to_string());
        }
        let mut lookup = OverrideLookup::new();
        for (unit, values) in table {
            lookup.insert(&unit, values);
        }
        lookup
    }

    #[test]
    fn test_is_bare_reference() {
        assert_eq!(is_bare_reference("@primary-color"), Some("primary-color"));
        assert_eq!(is_bare_reference("  @a  "), Some("a"));
        assert_eq!(is_bare_reference("@a * 2"), None);
        assert_eq!(is_bare_reference("@{a}"), None);
        assert_eq!(is_bare_reference("@"), None);
        assert_eq!(is_bare_reference("#fff"), None);
    }

    #[test]
    fn test_override_lookup_precedence() {
        let lookup = overrides(&[
            ("alert", "shared", "from-alert"),
            ("button", "shared", "from-button"),
            ("card", "shared", "from-card"),
            ("card", "only-card", "x"),
        ]);
        assert_eq!(lookup.get("button", "shared"), Some("from-button"));
        assert_eq!(lookup.get("card", "shared"), Some("from-card"));
        assert_eq!(lookup.get("nav", "shared"), Some("from-alert"));
        assert_eq!(lookup.get("button", "only-card"), Some("x"));
        assert_eq!(lookup.get("button", "missing"), None);

        let flat = lookup.flattened_for("button");
        assert_eq!(flat["shared"], "from-button");
        assert_eq!(flat["only-card"], "x");
        assert_eq!(lookup.flattened_for("nav")["shared"], "from-alert");
    }

    #[test]
    fn test_override_lookup_load_skips_empty_units() {
        let store = MemoryOverrideStore::new();
        store
            .put("button", &OverrideMap::from([("a".to_string(), "1".to_string())]))
            .unwrap();
        let lookup = OverrideLookup::load(&store, ["button", "card"]).unwrap();
        assert!(!lookup.is_empty());

        let mut expected = OverrideLookup::new();
        expected.insert("button", OverrideMap::from([("a".to_string(), "1".to_string())]));
        assert_eq!(lookup, expected);
    }

    #[test]
    fn test_resolve_reference_through_global() {
        let global = parse_catalog("global", "@primary-color: #303033;\n");
        let button = parse_catalog("button", "@btn-color: @primary-color;\n");
        let resolver = Resolver::new(global, OverrideLookup::new());
        assert_eq!(
            resolver.resolve(&button, "btn-color", DEFAULT_DEPTH_BUDGET),
            "#303033"
        );
    }

    #[test]
    fn test_resolve_cross_unit_override() {
        let global = parse_catalog("global", "@primary-color: #303033;\n");
        let button = parse_catalog("button", "@btn-color: @primary-color;\n");
        let resolver = Resolver::new(global, overrides(&[("card", "primary-color", "#ff0000")]));
        assert_eq!(
            resolver.resolve(&button, "btn-color", DEFAULT_DEPTH_BUDGET),
            "#ff0000"
        );
    }

    #[test]
    fn test_resolve_non_reference_unchanged() {
        let global = parse_catalog("global", "@global-margin: 20px;\n");
        let card = parse_catalog("card", "@card-margin: @global-margin * 2;\n");
        let resolver = Resolver::new(global, OverrideLookup::new());
        assert_eq!(
            resolver.resolve(&card, "card-margin", DEFAULT_DEPTH_BUDGET),
            "@global-margin * 2"
        );
    }

    #[test]
    fn test_resolve_unknown_and_dangling() {
        let global = Catalog::new("global");
        let card = parse_catalog("card", "@card-color: @nowhere;\n");
        let resolver = Resolver::new(global, OverrideLookup::new());
        assert_eq!(resolver.resolve(&card, "ghost", DEFAULT_DEPTH_BUDGET), "@ghost");
        assert_eq!(
            resolver.resolve(&card, "card-color", DEFAULT_DEPTH_BUDGET),
            "@nowhere"
        );
    }

    #[test]
    fn test_resolve_self_reference_and_cycle_terminate() {
        let global = parse_catalog("global", "@a: @a;\n@b: @c;\n@c: @b;\n");
        let unit = Catalog::new("x");
        let resolver = Resolver::new(global, OverrideLookup::new());
        assert_eq!(resolver.resolve(&unit, "a", DEFAULT_DEPTH_BUDGET), "@a");
        let cycled = resolver.resolve(&unit, "b", DEFAULT_DEPTH_BUDGET);
        assert!(cycled == "@b" || cycled == "@c");
        assert_eq!(resolver.resolve(&unit, "b", 0), "@c");
    }

    #[test]
    fn test_resolve_catalog_marks_overrides() {
        let global = parse_catalog("global", "@global-color: #222;\n");
        let card = parse_catalog("card", "@card-color: @global-color;\n@card-gap: 20px;\n");
        let resolver = Resolver::new(global, overrides(&[("card", "card-gap", "30px")]));

        let resolved = resolver.resolve_catalog(&card);
        assert_eq!(resolved.len(), 2);
        assert_eq!(resolved[0].value, "@global-color");
        assert_eq!(resolved[0].resolved, "#222");
        assert!(!resolved[0].overridden);
        assert_eq!(resolved[1].value, "30px");
        assert_eq!(resolved[1].resolved, "30px");
        assert!(resolved[1].overridden);
    }

    #[test]
    fn test_resolve_all_embedded_expressions() {
        let resolved = resolve_all(
            &snapshot(&[
                ("global-line-height", "1.5"),
                ("base-margin", "(@global-line-height * 3) * 1em"),
                ("card-margin", "@base-margin"),
            ]),
            DEFAULT_MAX_PASSES,
        );
        assert_eq!(resolved["base-margin"], "(1.5 * 3) * 1em");
        assert_eq!(resolved["card-margin"], "(1.5 * 3) * 1em");
    }

    #[test]
    fn test_resolve_all_parenthesizes_embedded_arithmetic() {
        let resolved = resolve_all(
            &snapshot(&[("gutter", "10px + 5px"), ("double", "@gutter * 2")]),
            DEFAULT_MAX_PASSES,
        );
        assert_eq!(resolved["double"], "(10px + 5px) * 2");
    }

    #[test]
    fn test_resolve_all_leaves_unknown_and_interpolation() {
        let resolved = resolve_all(
            &snapshot(&[("a", "@missing + 1"), ("b", "~\"@{a}\""), ("c", "@{a}")]),
            DEFAULT_MAX_PASSES,
        );
        assert_eq!(resolved["a"], "@missing + 1");
        assert_eq!(resolved["b"], "~\"@{a}\"");
        assert_eq!(resolved["c"], "@{a}");
    }

    #[test]
    fn test_resolve_all_is_pure_and_terminates_on_cycles() {
        let input = snapshot(&[("a", "@a"), ("b", "@c"), ("c", "@b"), ("d", "@d + 1")]);
        let resolved = resolve_all(&input, DEFAULT_MAX_PASSES);
        assert_eq!(input["a"], "@a");
        assert_eq!(resolved["a"], "@a");
        assert!(resolved["d"].contains("@d"));
    }

    #[test]
    fn test_resolve_all_repeated_self_reference_stays_literal() {
        let input = snapshot(&[
            ("global-margin", "@global-margin + @global-margin"),
            ("spacing", "@spacing @spacing"),
        ]);
        let resolved = resolve_all(&input, DEFAULT_MAX_PASSES);
        assert_eq!(resolved, input);
    }

    #[test]
    fn test_resolve_all_mutual_cycle_with_arithmetic() {
        let resolved = resolve_all(
            &snapshot(&[
                ("a", "@b * @b"),
                ("b", "@a"),
                ("c", "@a + 1"),
                ("d", "@e * 2"),
                ("e", "3px + 1px"),
            ]),
            DEFAULT_MAX_PASSES,
        );
        assert_eq!(resolved["a"], "@b * @b");
        assert_eq!(resolved["b"], "@a");
        assert_eq!(resolved["c"], "@a + 1");
        assert_eq!(resolved["d"], "(3px + 1px) * 2");
    }

    #[test]
    fn test_resolve_all_caps_value_length() {
        let mut pairs = vec![("l0".to_string(), "1px".to_string())];
        for level in 1..=12 {
            pairs.push((
                format!("l{}", level),
                format!("@l{} @l{}", level - 1, level - 1),
            ));
        }
        let input: IndexMap<String, String> = pairs.into_iter().collect();
        let resolved = resolve_all(&input, 20);

        assert!(resolved.values().all(|v| v.len() <= MAX_RESOLVED_LEN));
        assert_eq!(resolved["l10"].len(), 4095);
        assert!(!resolved["l10"].contains('@'));
        assert!(resolved["l12"].contains('@'));
    }

    #[test]
    fn test_font_shorthand_is_not_parenthesized() {
        let resolved = resolve_all(
            &snapshot(&[
                ("base-font", "12px/1.5 Arial"),
                ("heading-font", "bold @base-font"),
                ("ratio", "16px/2"),
                ("half", "@ratio + 1px"),
            ]),
            DEFAULT_MAX_PASSES,
        );
        assert_eq!(resolved["heading-font"], "bold 12px/1.5 Arial");
        assert_eq!(resolved["half"], "(16px/2) + 1px");
    }
}
