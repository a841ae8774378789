//! Theme variable catalog and LESS compilation pipeline.
//!
//! Copyright (c) 2025 Posit, PBC
//!
//! This crate turns a directory of LESS theme sources into an editable
//! variable catalog and, on demand, into compiled CSS.
//!
//! # Architecture
//!
//! - [`parse_catalog`] - declarations of one unit, typed and grouped
//! - [`Resolver`] / [`resolve_all`] - cascade resolution across units and overrides
//! - [`assemble`] - the complete LESS program for one unit, layer by layer
//! - [`preprocess`] - source rewrites that older LESS compilers need
//! - [`compile`] - the compiler boundary ([`StyleCompiler`])
//! - [`FallbackGenerator`] - static `:root` custom properties when no compiler runs
//! - [`ThemeEngine`] - all of the above over one theme root and override store
//!
//! # Example
//!
//! ```ignore
//! use themeweave_less::{ThemeConfig, ThemeEngine};
//! use themeweave_system_runtime::{JsonOverrideStore, LesscCompiler, NativeRuntime, OverrideMap};
//!
//! let runtime = NativeRuntime::new();
//! let config = ThemeConfig::load(&runtime, "theme/themeweave.toml".as_ref())?;
//! let store = JsonOverrideStore::new(config.store_path("theme".as_ref()));
//! let mut engine = ThemeEngine::from_config("theme", &config, &runtime, &store);
//!
//! for variable in engine.variables("button")? {
//!     println!("{} = {}", variable.name, variable.resolved);
//! }
//!
//! let compiler = LesscCompiler::new(&runtime);
//! let css = match engine.compile_unit("button", &compiler, &OverrideMap::new()) {
//!     Ok(output) => output.css,
//!     Err(e) if e.is_compiler_unavailable() => engine.fallback_css()?,
//!     Err(e) => return Err(e),
//! };
//! ```

pub mod assemble;
pub mod cache;
pub mod catalog;
pub mod compile;
pub mod config;
pub mod engine;
pub mod error;
pub mod evaluate;
pub mod fallback;
pub mod infer;
pub mod layout;
pub mod overrides;
pub mod preprocess;
pub mod resolve;
pub mod scan;
pub mod types;

// Re-export commonly used types
pub use assemble::{AssembledSource, Layer, assemble, format_overrides, split_unit};
pub use cache::CatalogCache;
pub use catalog::{derive_label, parse_catalog, scan_declarations};
pub use compile::{CompiledOutput, compile};
pub use config::{CONFIG_FILE_NAME, ThemeConfig};
pub use engine::ThemeEngine;
pub use error::LessError;
pub use evaluate::evaluate;
pub use fallback::{DEFAULT_FALLBACK_VARIABLES, FallbackGenerator, generate_fallback};
pub use infer::infer_type;
pub use layout::{ThemeLayout, ThemeSources};
pub use overrides::{apply_resolved, export_resolved, normalize_value, reset_overrides, save_overrides};
pub use preprocess::{Preprocessed, preprocess};
pub use resolve::{
    DEFAULT_DEPTH_BUDGET, DEFAULT_MAX_PASSES, MAX_RESOLVED_LEN, OverrideLookup, Resolver, resolve_all,
};
pub use types::{Catalog, DEFAULT_GROUP, ResolvedVariable, VariableRecord, VariableType};

// The runtime boundary types appear in this crate's signatures
pub use themeweave_system_runtime::{OverrideMap, OverrideStore, StyleCompiler};
