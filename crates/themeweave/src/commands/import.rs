/*
 * import.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! `themeweave import`: apply a file written by `themeweave export`.

use std::path::Path;

use anyhow::{Context, Result};

use themeweave_less::apply_resolved;
use themeweave_system_runtime::{OverrideMap, SystemRuntime};

use super::Theme;

pub fn execute(theme: &Theme, unit: &str, file: &Path) -> Result<()> {
    let text = theme
        .runtime
        .file_read_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let exported: OverrideMap = serde_json::from_str(&text)
        .with_context(|| format!("{} is not a JSON object of strings", file.display()))?;

    let mut engine = theme.engine();
    let saved = apply_resolved(&mut engine, unit, &exported)?;
    eprintln!(
        "Applied {} value(s); {} override(s) stored for {}",
        exported.len(),
        saved.len(),
        unit
    );
    Ok(())
}
