/*
 * export.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! `themeweave export`: a unit's resolved values as a JSON object.

use std::path::Path;

use anyhow::{Context, Result};

use themeweave_less::export_resolved;

use super::{Theme, write_output};

pub fn execute(theme: &Theme, unit: &str, output: Option<&Path>) -> Result<()> {
    let mut engine = theme.engine();
    let exported = export_resolved(&mut engine, unit)?;
    let mut json = serde_json::to_string_pretty(&exported).context("Failed to serialize export")?;
    json.push('\n');
    write_output(&theme.runtime, output, &json)
}
