/*
 * vars.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Vars command implementation
 */

//! `themeweave vars <unit>`: the unit's catalog, grouped, with the value each
//! variable resolves to.
//!
//! ```text
//! Colors
//!   btn-color          color     @primary-color  -> #303033
//!   btn-hover-color    color     #000 (override)
//! ```

use anyhow::{Context, Result};

use themeweave_less::ResolvedVariable;

use super::Theme;

pub fn execute(theme: &Theme, unit: &str, json: bool) -> Result<()> {
    let mut engine = theme.engine();
    let variables = engine.variables(unit)?;

    if json {
        let text = serde_json::to_string_pretty(&variables).context("Failed to serialize catalog")?;
        println!("{}", text);
        return Ok(());
    }

    print!("{}", render_table(&variables));
    Ok(())
}

/// Plain-text listing, grouped in order of first appearance.
fn render_table(variables: &[ResolvedVariable]) -> String {
    let name_width = variables.iter().map(|v| v.name.len()).max().unwrap_or(0);
    let mut groups: Vec<(&str, Vec<&ResolvedVariable>)> = Vec::new();
    for variable in variables {
        match groups.iter_mut().find(|(group, _)| *group == variable.group) {
            Some((_, members)) => members.push(variable),
            None => groups.push((variable.group.as_str(), vec![variable])),
        }
    }

    let mut out = String::new();
    for (group, members) in groups {
        out.push_str(group);
        out.push('\n');
        for variable in members {
            let mut line = format!(
                "  {:name_width$}  {:11} {}",
                variable.name,
                variable.var_type.as_str(),
                variable.value,
            );
            if variable.overridden {
                line.push_str(" (override)");
            }
            if variable.resolved != variable.value {
                line.push_str(&format!("  -> {}", variable.resolved));
            }
            out.push_str(line.trim_end());
            out.push('\n');
        }
    }
    out
}
