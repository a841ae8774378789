/*
 * themeweave-system-runtime
 * Copyright (c) 2025 Posit, PBC
 *
 * Runtime abstraction layer for the themeweave pipeline.
 *
 * This crate provides trait-based boundaries for everything the theme
 * pipeline needs from the outside world:
 *
 * - SystemRuntime: layer file access, process execution, binary discovery
 * - StyleCompiler: the external LESS compiler (native: lessc)
 * - OverrideStore: persistence of user overrides (memory, JSON file)
 */

mod less_native;
mod native;
mod store;
mod traits;

// Re-export core types (API surface)
pub use traits::{
    CommandOutput, OverrideMap, OverrideStore, PathKind, RuntimeError, RuntimeResult,
    StyleCompiler, SystemRuntime,
};

// Re-export implementations
pub use less_native::{LESSC_BINARY, LESSC_ENV_VAR, LesscCompiler, lessc_args};
pub use native::NativeRuntime;
pub use store::{JsonOverrideStore, MemoryOverrideStore, OverrideTable};

/// The runtime used by the CLI.
pub fn default_runtime() -> NativeRuntime {
    NativeRuntime::new()
}
