/*
 * fallback.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! `themeweave fallback`: the `:root` custom property block.

use std::path::Path;

use anyhow::Result;

use super::{Theme, write_output};

pub fn execute(theme: &Theme, output: Option<&Path>) -> Result<()> {
    let css = theme.engine().fallback_css()?;
    write_output(&theme.runtime, output, &css)
}
