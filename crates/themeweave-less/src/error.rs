//! Error types for the theme pipeline.
//!
//! Copyright (c) 2025 Posit, PBC
//!
//! Only assembly, compilation, configuration and I/O can fail. Parsing,
//! resolution and arithmetic evaluation never return errors: malformed
//! declarations are skipped, unresolved references stay literal and
//! expressions that do not reduce are passed through.

use thiserror::Error;

use themeweave_system_runtime::RuntimeError;

/// Errors that can occur during theme operations
#[derive(Debug, Error)]
pub enum LessError {
    /// The requested unit has no rule-body source file
    #[error("Unit '{unit}' not found (no rule-body source at {path})")]
    UnitNotFound { unit: String, path: String },

    /// The external compiler cannot be located or initialized
    #[error("LESS compiler unavailable: {reason}")]
    CompilerUnavailable { reason: String },

    /// The external compiler rejected the source; `message` is its own diagnostic
    #[error("LESS compilation failed: {message}")]
    CompileParse { message: String },

    /// Configuration file could not be understood
    #[error("Invalid theme configuration{}: {message}", .hint.as_ref().map(|h| format!(" in {}", h)).unwrap_or_default())]
    InvalidConfig {
        message: String,
        hint: Option<String>,
    },

    /// File access or override store failure
    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    /// File I/O error
    #[error("Failed to read theme file: {0}")]
    Io(#[from] std::io::Error),
}

impl LessError {
    /// Whether a caller should switch to the static fallback path.
    pub fn is_compiler_unavailable(&self) -> bool {
        matches!(self, LessError::CompilerUnavailable { .. })
    }
}
