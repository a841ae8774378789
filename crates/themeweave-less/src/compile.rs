//! Compiler adapter.
//!
//! Copyright (c) 2025 Posit, PBC
//!
//! Hands preprocessed source to a [`StyleCompiler`] and maps its failures
//! onto [`LessError`]. Whether to fall back to the static property block
//! when no compiler is available is the caller's decision; this module only
//! reports it.

use serde::Serialize;
use tracing::{debug, info, warn};

use themeweave_system_runtime::{OverrideMap, RuntimeError, StyleCompiler};

use crate::assemble::{has_statement_delimiter, sanitize_name};
use crate::error::LessError;
use crate::preprocess::Preprocessed;

/// Stylesheet produced by a successful compile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompiledOutput {
    pub css: String,
    /// Number of extracted at-rule blocks appended after compilation
    pub reinjected: usize,
}

/// Compiler-level substitutions for `overrides`.
///
/// Filtered the same way the override layer is written: names are
/// sanitized, entries with an empty name or value are dropped, and so are
/// values containing statement delimiters.
pub fn compiler_variables(overrides: &OverrideMap) -> Vec<(String, String)> {
    overrides
        .iter()
        .filter_map(|(name, value)| {
            let clean = sanitize_name(name);
            let value = value.trim();
            if clean.is_empty() || value.is_empty() {
                return None;
            }
            if has_statement_delimiter(value) {
                warn!(name = %name, value, "ignoring compiler variable with statement delimiters");
                return None;
            }
            Some((clean, value.to_string()))
        })
        .collect()
}

/// Append extracted fragments to compiled CSS, blank-line separated.
pub fn reinject_fragments(css: &str, fragments: &[String]) -> String {
    if fragments.is_empty() {
        return css.to_string();
    }
    let mut out = css.trim_end().to_string();
    for fragment in fragments {
        if !out.is_empty() {
            out.push_str("\n\n");
        }
        out.push_str(fragment.trim());
    }
    out.push('\n');
    out
}

/// Compile preprocessed source.
///
/// # Errors
///
/// - `LessError::CompilerUnavailable` if the compiler cannot run; checked
///   before any work is done
/// - `LessError::CompileParse` carrying the compiler's own diagnostic
pub fn compile(
    compiler: &dyn StyleCompiler,
    preprocessed: &Preprocessed,
    overrides: &OverrideMap,
) -> Result<CompiledOutput, LessError> {
    if !compiler.is_available() {
        return Err(LessError::CompilerUnavailable {
            reason: format!("{} is not available", compiler.name()),
        });
    }

    let variables = compiler_variables(overrides);
    info!(
        compiler = compiler.name(),
        variables = variables.len(),
        "compiling LESS source"
    );

    let css = compiler
        .compile(&preprocessed.source, &variables)
        .map_err(|e| match e {
            RuntimeError::NotSupported(reason) => LessError::CompilerUnavailable { reason },
            RuntimeError::LessError(message) => LessError::CompileParse { message },
            RuntimeError::ProcessFailed { message, .. } => LessError::CompileParse { message },
            other => LessError::Runtime(other),
        })?;

    debug!(
        bytes = css.len(),
        reinject = preprocessed.reinject.len(),
        "compiled LESS source"
    );
    Ok(CompiledOutput {
        css: reinject_fragments(&css, &preprocessed.reinject),
        reinjected: preprocessed.reinject.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use themeweave_system_runtime::RuntimeResult;

    /// Records its inputs and replies with a canned result.
    struct FakeCompiler {
        available: bool,
        reply: Result<String, String>,
        seen: RefCell<Vec<(String, Vec<(String, String)>)>>,
    }

    impl FakeCompiler {
        fn ok(css: &str) -> Self {
            Self {
                available: true,
                reply: Ok(css.to_string()),
                seen: RefCell::new(Vec::new()),
            }
        }
    }

    impl StyleCompiler for FakeCompiler {
        fn is_available(&self) -> bool {
            self.available
        }

        fn name(&self) -> &str {
            "fake"
        }

        fn compile(&self, source: &str, variables: &[(String, String)]) -> RuntimeResult<String> {
            self.seen
                .borrow_mut()
                .push((source.to_string(), variables.to_vec()));
            self.reply.clone().map_err(RuntimeError::LessError)
        }
    }

    fn preprocessed(source: &str, reinject: &[&str]) -> Preprocessed {
        Preprocessed {
            source: source.to_string(),
            reinject: reinject.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_compile_success_appends_reinjected_blocks() {
        let compiler = FakeCompiler::ok(".a {\n  color: red;\n}\n");
        let output = compile(
            &compiler,
            &preprocessed(".a { color: red; }", &["@layer base;", "@container (min-width: 1px) { }"]),
            &OverrideMap::new(),
        )
        .unwrap();

        assert_eq!(
            output.css,
            ".a {\n  color: red;\n}\n\n@layer base;\n\n@container (min-width: 1px) { }\n"
        );
        assert_eq!(output.reinjected, 2);
    }

    #[test]
    fn test_compile_passes_sanitized_variables() {
        let compiler = FakeCompiler::ok("");
        let overrides = OverrideMap::from([
            ("button-color".to_string(), "#fff".to_string()),
            ("bad name!".to_string(), "1px".to_string()),
            ("empty".to_string(), " ".to_string()),
        ]);
        compile(&compiler, &preprocessed("@a: 1;", &[]), &overrides).unwrap();

        let seen = compiler.seen.borrow();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0, "@a: 1;");
        assert_eq!(
            seen[0].1,
            vec![
                ("badname".to_string(), "1px".to_string()),
                ("button-color".to_string(), "#fff".to_string()),
            ]
        );
    }

    #[test]
    fn test_compiler_variables_drop_statement_delimiters() {
        let overrides = OverrideMap::from([
            ("button-color".to_string(), "red; } body { x: y".to_string()),
            ("card-open".to_string(), "{".to_string()),
            ("card-padding".to_string(), "20px".to_string()),
        ]);
        assert_eq!(
            compiler_variables(&overrides),
            vec![("card-padding".to_string(), "20px".to_string())]
        );
    }

    #[test]
    fn test_compile_unavailable_does_no_work() {
        let mut compiler = FakeCompiler::ok("");
        compiler.available = false;
        let err = compile(&compiler, &preprocessed("", &[]), &OverrideMap::new()).unwrap_err();
        assert!(err.is_compiler_unavailable());
        assert!(compiler.seen.borrow().is_empty());
    }

    #[test]
    fn test_compile_error_is_verbatim() {
        let mut compiler = FakeCompiler::ok("");
        compiler.reply = Err("ParseError: Unrecognised input in - on line 3, column 1:".to_string());
        let err = compile(&compiler, &preprocessed(".a {", &[]), &OverrideMap::new()).unwrap_err();
        match err {
            LessError::CompileParse { message } => {
                assert_eq!(message, "ParseError: Unrecognised input in - on line 3, column 1:");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_reinject_fragments_without_fragments() {
        assert_eq!(reinject_fragments(".a{}", &[]), ".a{}");
        assert_eq!(reinject_fragments("", &["@layer x;".to_string()]), "@layer x;\n");
    }
}
