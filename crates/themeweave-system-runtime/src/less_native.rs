//! LESS compilation through the `lessc` executable.
//!
//! Copyright (c) 2025 Posit, PBC
//!
//! This module provides the native [`StyleCompiler`] used for live and
//! preview compilation. The compiler binary is located once, when the
//! `LesscCompiler` is created:
//!
//! 1. `$THEMEWEAVE_LESSC`, if it points at a file
//! 2. `lessc` on `PATH`
//!
//! Source is piped on stdin and variable overrides are passed with
//! `--modify-var`, which lessc applies after parsing so they win over any
//! declaration in the source.

use std::fmt::Debug;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::traits::{RuntimeError, RuntimeResult, StyleCompiler, SystemRuntime};

/// Environment variable that may point at a specific lessc binary.
pub const LESSC_ENV_VAR: &str = "THEMEWEAVE_LESSC";

/// Name of the compiler binary searched on PATH.
pub const LESSC_BINARY: &str = "lessc";

/// [`StyleCompiler`] backed by a `lessc` child process.
pub struct LesscCompiler<'a> {
    runtime: &'a dyn SystemRuntime,
    binary: Option<PathBuf>,
}

impl<'a> LesscCompiler<'a> {
    /// Locate lessc through the runtime.
    pub fn new(runtime: &'a dyn SystemRuntime) -> Self {
        let binary = runtime.find_binary(LESSC_BINARY, LESSC_ENV_VAR);
        debug!(binary = ?binary, "lessc lookup");
        Self { runtime, binary }
    }

    /// Use an explicit binary path instead of searching.
    pub fn with_binary(runtime: &'a dyn SystemRuntime, binary: impl Into<PathBuf>) -> Self {
        Self {
            runtime,
            binary: Some(binary.into()),
        }
    }

    /// The binary that will be executed, if one was found.
    pub fn binary(&self) -> Option<&Path> {
        self.binary.as_deref()
    }
}

impl Debug for LesscCompiler<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LesscCompiler")
            .field("runtime", &"<SystemRuntime>")
            .field("binary", &self.binary)
            .finish()
    }
}

/// Build the lessc argument list.
///
/// The trailing `-` tells lessc to read the program from stdin.
pub fn lessc_args(variables: &[(String, String)]) -> Vec<String> {
    let mut args = vec!["--no-color".to_string()];
    for (name, value) in variables {
        args.push(format!("--modify-var={}={}", name, value));
    }
    args.push("-".to_string());
    args
}

impl StyleCompiler for LesscCompiler<'_> {
    fn is_available(&self) -> bool {
        self.binary
            .as_deref()
            .is_some_and(|path| self.runtime.is_file(path).unwrap_or(false))
    }

    fn name(&self) -> &str {
        LESSC_BINARY
    }

    fn compile(&self, source: &str, variables: &[(String, String)]) -> RuntimeResult<String> {
        let Some(binary) = self.binary.as_deref() else {
            return Err(RuntimeError::NotSupported(format!(
                "{} not found (set {} or add it to PATH)",
                LESSC_BINARY, LESSC_ENV_VAR
            )));
        };

        let args = lessc_args(variables);
        let output = self
            .runtime
            .exec_command(binary, &args, Some(source.as_bytes()))?;

        if output.success() {
            Ok(output.stdout_string())
        } else {
            // lessc reports parse errors on stderr; keep them verbatim.
            let stderr = output.stderr_string();
            if stderr.trim().is_empty() {
                return Err(RuntimeError::ProcessFailed {
                    code: output.code,
                    message: format!("{} wrote no diagnostic", LESSC_BINARY),
                });
            }
            Err(RuntimeError::LessError(stderr.trim_end().to_string()))
        }
    }
}
