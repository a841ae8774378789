/*
 * compile.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Compile command implementation
 */

//! `themeweave compile <unit>`
//!
//! Compiles through `lessc` (located via `THEMEWEAVE_LESSC` or `PATH`).
//! When no compiler can run, the static custom property block is emitted
//! instead unless `--no-fallback` is given.

use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::warn;

use themeweave_system_runtime::LesscCompiler;

use super::{Theme, parse_assignments, write_output};

/// Arguments for the compile command
#[derive(Debug)]
pub struct CompileArgs {
    pub unit: String,
    /// Output file; stdout when absent
    pub output: Option<PathBuf>,
    /// Unsaved `NAME=VALUE` edits
    pub defines: Vec<String>,
    pub no_fallback: bool,
}

pub fn execute(theme: &Theme, args: CompileArgs) -> Result<()> {
    let pending = parse_assignments(&args.defines)?;
    let engine = theme.engine();
    let compiler = LesscCompiler::new(&theme.runtime);

    let css = match engine.compile_unit(&args.unit, &compiler, &pending) {
        Ok(output) => output.css,
        Err(e) if e.is_compiler_unavailable() && !args.no_fallback => {
            warn!(unit = %args.unit, error = %e, "emitting fallback properties instead");
            engine.fallback_css()?
        }
        Err(e) => {
            return Err(e).with_context(|| format!("Failed to compile '{}'", args.unit));
        }
    };

    write_output(&theme.runtime, args.output.as_deref(), &css)
}
