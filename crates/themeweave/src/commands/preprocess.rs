/*
 * preprocess.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! `themeweave preprocess <unit>`: the assembled program after the
//! compatibility passes.

use anyhow::{Context, Result};

use super::Theme;

pub fn execute(theme: &Theme, unit: &str, json: bool) -> Result<()> {
    let preprocessed = theme.engine().preprocess_unit(unit)?;
    if json {
        let text = serde_json::to_string_pretty(&preprocessed)
            .context("Failed to serialize preprocessed source")?;
        println!("{}", text);
    } else {
        print!("{}", preprocessed.source);
    }
    Ok(())
}
