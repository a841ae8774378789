//! Saving, resetting and transferring user overrides.
//!
//! Copyright (c) 2025 Posit, PBC
//!
//! The store only ever holds values that differ from the declared default.
//! A save reads the unit's full set, applies the submission and writes the
//! whole set back (or deletes it when nothing is left).

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info, warn};

use themeweave_system_runtime::OverrideMap;

use crate::assemble::{has_statement_delimiter, sanitize_name};
use crate::engine::ThemeEngine;
use crate::error::LessError;

static HEX_COLOR: Lazy<Regex> = Lazy::new(|| Regex::new(r"#[0-9A-Fa-f]{3,8}\b").unwrap());

/// Canonical form used to compare a value with its default.
///
/// Trims, collapses whitespace runs to one space and lowercases hex colours.
pub fn normalize_value(value: &str) -> String {
    let collapsed = value.split_whitespace().collect::<Vec<_>>().join(" ");
    HEX_COLOR
        .replace_all(&collapsed, |caps: &regex::Captures| caps[0].to_ascii_lowercase())
        .into_owned()
}

/// Apply `submitted` to `unit`'s stored overrides.
///
/// Names are sanitized and must be declared by the unit. A value that is
/// empty or equal to the normalized default removes the override. Stored
/// entries for names the unit no longer declares are dropped as well.
///
/// Returns the persisted set.
pub fn save_overrides(
    engine: &mut ThemeEngine<'_>,
    unit: &str,
    submitted: &OverrideMap,
) -> Result<OverrideMap, LessError> {
    let catalog = engine.catalog(unit)?.clone();
    let store = engine.store();
    let mut current = store.get(unit)?;

    for (name, value) in submitted {
        let clean = sanitize_name(name);
        let Some(record) = catalog.get(&clean) else {
            warn!(unit, name = %name, "ignoring override for undeclared variable");
            continue;
        };
        let value = value.trim();
        if has_statement_delimiter(value) {
            warn!(unit, name = %clean, value, "ignoring override value with statement delimiters");
            continue;
        }
        let normalized = normalize_value(value);
        if normalized.is_empty() || normalized == normalize_value(&record.raw_value) {
            if current.remove(&clean).is_some() {
                debug!(unit, name = %clean, "override removed");
            }
        } else {
            current.insert(clean, value.to_string());
        }
    }

    current.retain(|name, value| {
        catalog
            .get(name)
            .is_some_and(|record| normalize_value(value) != normalize_value(&record.raw_value))
    });

    if current.is_empty() {
        store.delete(unit)?;
    } else {
        store.put(unit, &current)?;
    }
    engine.invalidate(unit);
    info!(unit, count = current.len(), "saved overrides");
    Ok(current)
}

/// Remove every override of `unit`.
pub fn reset_overrides(engine: &mut ThemeEngine<'_>, unit: &str) -> Result<(), LessError> {
    engine.store().delete(unit)?;
    engine.invalidate(unit);
    info!(unit, "reset overrides");
    Ok(())
}

/// Resolved value of every variable of `unit`, keyed by name.
pub fn export_resolved(engine: &mut ThemeEngine<'_>, unit: &str) -> Result<OverrideMap, LessError> {
    Ok(engine
        .variables(unit)?
        .into_iter()
        .map(|variable| (variable.name, variable.resolved))
        .collect())
}

/// Save a previous export of `unit` back as overrides.
///
/// Values that match the declared default are not stored, so applying the
/// export of an untouched unit leaves the store empty.
pub fn apply_resolved(
    engine: &mut ThemeEngine<'_>,
    unit: &str,
    exported: &OverrideMap,
) -> Result<OverrideMap, LessError> {
    save_overrides(engine, unit, exported)
}
