/*
 * traits.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Defines the SystemRuntime, StyleCompiler and OverrideStore traits and
 * their supporting types.
 *
 * The theme pipeline never touches the filesystem, child processes or the
 * override backend directly. Everything goes through these traits so that:
 * - NativeRuntime: full system access using std
 * - test doubles: in-memory stores and scripted compilers
 * can be swapped without touching pipeline code.
 */

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

pub type RuntimeResult<T> = Result<T, RuntimeError>;

/// Override values for one unit, keyed by variable name.
///
/// A `BTreeMap` keeps serialization and iteration order stable.
pub type OverrideMap = BTreeMap<String, String>;

/// Failures at the system boundary.
#[derive(Debug)]
pub enum RuntimeError {
    Io(io::Error),

    /// The runtime cannot do this at all, e.g. no compiler is installed
    NotSupported(String),

    /// A child process exited non-zero without a usable diagnostic
    ProcessFailed { code: i32, message: String },

    /// LESS compilation failed; carries the compiler's own diagnostic text
    LessError(String),

    /// The override store could not be read or written
    Store(String),
}

impl std::fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RuntimeError::Io(e) => write!(f, "I/O failure: {}", e),
            RuntimeError::NotSupported(msg) => write!(f, "Not available: {}", msg),
            RuntimeError::ProcessFailed { code, message } => {
                write!(f, "Command failed (exit {}): {}", code, message)
            }
            RuntimeError::LessError(msg) => write!(f, "LESS compilation error: {}", msg),
            RuntimeError::Store(msg) => write!(f, "Override store error: {}", msg),
        }
    }
}

impl std::error::Error for RuntimeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RuntimeError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for RuntimeError {
    fn from(e: io::Error) -> Self {
        RuntimeError::Io(e)
    }
}

/// What kind of entry `path_exists` should require.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathKind {
    File,
    Directory,
}

/// Captured result of a child process.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub code: i32,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == 0
    }

    /// Compiled CSS or other text output; invalid UTF-8 is replaced.
    pub fn stdout_string(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    /// Compiler diagnostics; invalid UTF-8 is replaced.
    pub fn stderr_string(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }
}

/// Low-level system operations used by the theme pipeline.
///
/// Implementations provide the actual system interaction. The pipeline only
/// reads layer files, lists unit directories and runs the external compiler,
/// so the surface is small.
pub trait SystemRuntime: Send + Sync {
    // ═══════════════════════════════════════════════════════════════════════
    // FILES AND DIRECTORIES
    // ═══════════════════════════════════════════════════════════════════════

    fn file_read(&self, path: &Path) -> RuntimeResult<Vec<u8>>;

    /// Layer files are text; a file that is not UTF-8 is an `InvalidData`
    /// I/O error.
    fn file_read_string(&self, path: &Path) -> RuntimeResult<String> {
        let bytes = self.file_read(path)?;
        String::from_utf8(bytes).map_err(|e| {
            RuntimeError::Io(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("{} is not valid UTF-8: {}", path.display(), e),
            ))
        })
    }

    /// Create or truncate `path` and write `contents`.
    fn file_write(&self, path: &Path, contents: &[u8]) -> RuntimeResult<()>;

    /// `kind: None` accepts any entry.
    fn path_exists(&self, path: &Path, kind: Option<PathKind>) -> RuntimeResult<bool>;

    fn is_file(&self, path: &Path) -> RuntimeResult<bool> {
        self.path_exists(path, Some(PathKind::File))
    }

    fn is_dir(&self, path: &Path) -> RuntimeResult<bool> {
        self.path_exists(path, Some(PathKind::Directory))
    }

    fn dir_create(&self, path: &Path, recursive: bool) -> RuntimeResult<()>;

    /// Entries of a directory, sorted by path.
    fn dir_list(&self, path: &Path) -> RuntimeResult<Vec<PathBuf>>;

    // ═══════════════════════════════════════════════════════════════════════
    // PROCESSES AND ENVIRONMENT
    // ═══════════════════════════════════════════════════════════════════════

    /// Run `command` to completion, feeding `stdin` if given.
    ///
    /// A non-zero exit is still `Ok`; callers check `CommandOutput::success()`.
    fn exec_command(
        &self,
        command: &Path,
        args: &[String],
        stdin: Option<&[u8]>,
    ) -> RuntimeResult<CommandOutput>;

    fn env_get(&self, name: &str) -> RuntimeResult<Option<String>>;

    /// Locate an executable: `env_var` first (e.g. `THEMEWEAVE_LESSC`),
    /// then the search path.
    ///
    /// Only the environment variable is consulted here. `NativeRuntime`
    /// adds the PATH search.
    fn find_binary(&self, name: &str, env_var: &str) -> Option<PathBuf> {
        let _ = name;
        let configured = self.env_get(env_var).ok().flatten()?;
        let path = PathBuf::from(configured);
        self.is_file(&path).unwrap_or(false).then_some(path)
    }
}

/// The external style-to-CSS compiler boundary.
///
/// Callers must query [`StyleCompiler::is_available`] before compiling so
/// they can short-circuit to the static fallback path.
pub trait StyleCompiler {
    /// Whether the compiler can be used at all.
    fn is_available(&self) -> bool;

    /// Backend name for diagnostics (e.g. `"lessc"`).
    fn name(&self) -> &str;

    /// Compile LESS source to CSS.
    ///
    /// `variables` are applied as compiler-level substitutions before the
    /// source is parsed. On failure the compiler's diagnostic is returned
    /// verbatim in `RuntimeError::LessError`.
    fn compile(&self, source: &str, variables: &[(String, String)]) -> RuntimeResult<String>;
}

/// Key-value store for user overrides, namespaced per unit.
///
/// Entries only hold values that differ from the catalog default. Writers
/// replace a unit's whole map at once; an empty map is expressed by `delete`.
pub trait OverrideStore {
    /// Overrides for one unit (empty when the unit has none).
    fn get(&self, unit: &str) -> RuntimeResult<OverrideMap>;

    /// Replace the overrides for one unit.
    fn put(&self, unit: &str, values: &OverrideMap) -> RuntimeResult<()>;

    /// Remove every override for one unit.
    fn delete(&self, unit: &str) -> RuntimeResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lessc_output_decoding() {
        let output = CommandOutput {
            code: 0,
            stdout: b".uk-button { color: #fff; }".to_vec(),
            stderr: Vec::new(),
        };
        assert!(output.success());
        assert_eq!(output.stdout_string(), ".uk-button { color: #fff; }");

        let failed = CommandOutput {
            code: 1,
            stdout: Vec::new(),
            stderr: b"ParseError: Unrecognised input \xff".to_vec(),
        };
        assert!(!failed.success());
        assert!(failed.stderr_string().starts_with("ParseError"));
    }

    #[test]
    fn test_error_messages_name_the_failure() {
        let cases = [
            (RuntimeError::NotSupported("lessc not found".to_string()), "lessc not found"),
            (
                RuntimeError::ProcessFailed {
                    code: 2,
                    message: "no diagnostic".to_string(),
                },
                "(exit 2)",
            ),
            (
                RuntimeError::LessError("Unrecognised input on line 3".to_string()),
                "LESS compilation error",
            ),
            (RuntimeError::Store("corrupt file".to_string()), "Override store"),
        ];
        for (err, expected) in cases {
            let text = err.to_string();
            assert!(text.contains(expected), "{text:?} lacks {expected:?}");
        }
    }

    #[test]
    fn test_only_io_errors_have_a_source() {
        use std::error::Error;

        let err = RuntimeError::from(io::Error::new(io::ErrorKind::NotFound, "gone"));
        assert!(err.source().is_some());
        assert!(RuntimeError::Store("x".to_string()).source().is_none());
    }
}
