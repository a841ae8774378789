/*
 * units.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! `themeweave units`: list the compilable units of a theme.

use anyhow::Result;

use super::Theme;

pub fn execute(theme: &Theme) -> Result<()> {
    let engine = theme.engine();
    for unit in engine.units()? {
        println!("{}", unit);
    }
    Ok(())
}
