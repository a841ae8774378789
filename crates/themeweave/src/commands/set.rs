/*
 * set.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Set command implementation
 */

//! `themeweave set <unit> NAME=VALUE...`
//!
//! Saves overrides through the same path an editor would: names must be
//! declared by the unit, and values equal to the declared default (or
//! empty) remove the override instead of storing it.

use anyhow::{Context, Result};

use themeweave_less::save_overrides;

use super::{Theme, parse_assignments};

pub fn execute(theme: &Theme, unit: &str, values: &[String]) -> Result<()> {
    let submitted = parse_assignments(values)?;
    let mut engine = theme.engine();
    let saved = save_overrides(&mut engine, unit, &submitted)
        .with_context(|| format!("Failed to save overrides of '{}'", unit))?;

    for name in submitted.keys() {
        if !saved.contains_key(name) {
            eprintln!("{}: using default", name);
        }
    }
    eprintln!("{} override(s) stored for {}", saved.len(), unit);
    Ok(())
}
