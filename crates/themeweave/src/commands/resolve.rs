/*
 * resolve.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! `themeweave resolve`: follow one variable's reference chain.

use anyhow::Result;

use super::Theme;

pub fn execute(theme: &Theme, unit: &str, name: &str) -> Result<()> {
    let mut engine = theme.engine();
    let name = name.trim_start_matches('@');
    println!("{}", engine.resolve(unit, name)?);
    Ok(())
}
