/*
 * reset.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! `themeweave reset`: drop every override of a unit.

use anyhow::{Context, Result};

use themeweave_less::reset_overrides;

use super::Theme;

pub fn execute(theme: &Theme, unit: &str) -> Result<()> {
    let mut engine = theme.engine();
    // Unknown units are an error, not a no-op.
    engine.catalog(unit)?;
    reset_overrides(&mut engine, unit)
        .with_context(|| format!("Failed to reset overrides of '{}'", unit))?;
    eprintln!("Reset overrides of {}", unit);
    Ok(())
}
