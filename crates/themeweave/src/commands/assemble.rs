/*
 * assemble.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! `themeweave assemble <unit>`: the complete LESS program handed to the
//! compiler, before preprocessing.

use anyhow::Result;

use themeweave_less::AssembledSource;

use super::Theme;

pub fn execute(theme: &Theme, unit: &str, layers: bool) -> Result<()> {
    let assembled = theme.engine().assemble(unit)?;
    if layers {
        print!("{}", labelled(&assembled));
    } else {
        print!("{}", assembled.to_source());
    }
    Ok(())
}

/// Every layer, empty ones included, under a `/* layer: <name> */` header.
fn labelled(assembled: &AssembledSource) -> String {
    let mut out = String::new();
    for (layer, text) in &assembled.fragments {
        out.push_str(&format!("/* layer: {} */\n", layer));
        let text = text.trim_matches('\n');
        if !text.is_empty() {
            out.push_str(text);
            out.push('\n');
        }
        out.push('\n');
    }
    out
}
