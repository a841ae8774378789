/*
 * engine.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * One theme root, its override store and the parsed catalog cache.
 */

//! [`ThemeEngine`] ties the pipeline stages to a theme root.
//!
//! Every request re-reads the override store, so each call sees the last
//! saved state. Parsed catalogs are cached until [`ThemeEngine::invalidate`].

use std::path::PathBuf;

use indexmap::IndexMap;
use tracing::{debug, info};

use themeweave_system_runtime::{OverrideMap, OverrideStore, StyleCompiler, SystemRuntime};

use crate::assemble::{AssembledSource, assemble, split_unit};
use crate::cache::CatalogCache;
use crate::catalog::{parse_declaration, scan_declarations};
use crate::compile::{CompiledOutput, compile};
use crate::config::ThemeConfig;
use crate::error::LessError;
use crate::fallback::FallbackGenerator;
use crate::layout::{ThemeLayout, ThemeSources};
use crate::preprocess::{Preprocessed, preprocess};
use crate::resolve::{DEFAULT_DEPTH_BUDGET, OverrideLookup, Resolver};
use crate::types::{Catalog, ResolvedVariable};

pub struct ThemeEngine<'a> {
    sources: ThemeSources<'a>,
    store: &'a dyn OverrideStore,
    cache: CatalogCache,
    fallback: FallbackGenerator,
}

impl std::fmt::Debug for ThemeEngine<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThemeEngine")
            .field("sources", &self.sources)
            .field("cached", &self.cache.len())
            .field("fallback", &self.fallback)
            .finish_non_exhaustive()
    }
}

impl<'a> ThemeEngine<'a> {
    pub fn new(sources: ThemeSources<'a>, store: &'a dyn OverrideStore) -> Self {
        Self {
            sources,
            store,
            cache: CatalogCache::new(),
            fallback: FallbackGenerator::default(),
        }
    }

    /// Engine for `root` laid out and tuned by `config`.
    pub fn from_config(
        root: impl Into<PathBuf>,
        config: &ThemeConfig,
        runtime: &'a dyn SystemRuntime,
        store: &'a dyn OverrideStore,
    ) -> Self {
        let sources = ThemeSources::new(root, config.layout.clone(), runtime);
        Self::new(sources, store).with_fallback(config.fallback_generator())
    }

    pub fn with_fallback(mut self, fallback: FallbackGenerator) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn sources(&self) -> &ThemeSources<'a> {
        &self.sources
    }

    pub fn layout(&self) -> &ThemeLayout {
        self.sources.layout()
    }

    pub fn store(&self) -> &'a dyn OverrideStore {
        self.store
    }

    /// Compilable units, sorted.
    pub fn units(&self) -> Result<Vec<String>, LessError> {
        self.sources.units()
    }

    /// Catalog of one unit, parsed on first use.
    ///
    /// The global defaults unit is accepted too.
    pub fn catalog(&mut self, unit: &str) -> Result<&Catalog, LessError> {
        if unit == self.sources.layout().global_unit {
            return self.global_catalog();
        }
        let sources = &self.sources;
        self.cache.get_or_parse(unit, || sources.unit(unit))
    }

    /// Catalog of the global defaults unit; empty when the file is missing.
    pub fn global_catalog(&mut self) -> Result<&Catalog, LessError> {
        let sources = &self.sources;
        let unit = sources.layout().global_unit.as_str();
        self.cache
            .get_or_parse(unit, || sources.global().map(Option::unwrap_or_default))
    }

    /// Every unit's stored overrides, the global unit included.
    pub fn override_lookup(&self) -> Result<OverrideLookup, LessError> {
        let mut units = self.sources.units()?;
        units.push(self.sources.layout().global_unit.clone());
        Ok(OverrideLookup::load(
            self.store,
            units.iter().map(String::as_str),
        )?)
    }

    /// A resolver over a fresh snapshot of the store.
    pub fn session(&mut self) -> Result<Resolver, LessError> {
        let lookup = self.override_lookup()?;
        let global = self.global_catalog()?.clone();
        Ok(Resolver::new(global, lookup))
    }

    /// Resolved value of `name` as seen from `unit`.
    pub fn resolve(&mut self, unit: &str, name: &str) -> Result<String, LessError> {
        let resolver = self.session()?;
        let catalog = self.catalog(unit)?;
        Ok(resolver.resolve(catalog, name, DEFAULT_DEPTH_BUDGET))
    }

    /// Every variable of `unit` with its effective and resolved value.
    pub fn variables(&mut self, unit: &str) -> Result<Vec<ResolvedVariable>, LessError> {
        let resolver = self.session()?;
        let catalog = self.catalog(unit)?;
        Ok(resolver.resolve_catalog(catalog))
    }

    /// Overrides visible from `unit`, collisions settled.
    pub fn effective_overrides(&self, unit: &str) -> Result<OverrideMap, LessError> {
        Ok(self.override_lookup()?.flattened_for(unit))
    }

    /// Assemble `unit` with the stored overrides as its override layer.
    pub fn assemble(&self, unit: &str) -> Result<AssembledSource, LessError> {
        let overrides = self.effective_overrides(unit)?;
        assemble(&self.sources, unit, &overrides)
    }

    pub fn preprocess_unit(&self, unit: &str) -> Result<Preprocessed, LessError> {
        Ok(preprocess(&self.assemble(unit)?.to_source()))
    }

    /// Compile `unit`.
    ///
    /// `pending` holds unsaved edits; they reach the compiler as variable
    /// substitutions on top of the stored override layer.
    ///
    /// # Errors
    ///
    /// `LessError::CompilerUnavailable` is returned before the unit is read.
    pub fn compile_unit(
        &self,
        unit: &str,
        compiler: &dyn StyleCompiler,
        pending: &OverrideMap,
    ) -> Result<CompiledOutput, LessError> {
        if !compiler.is_available() {
            return Err(LessError::CompilerUnavailable {
                reason: format!("{} is not available", compiler.name()),
            });
        }
        let preprocessed = self.preprocess_unit(unit)?;
        let output = compile(compiler, &preprocessed, pending)?;
        info!(unit, bytes = output.css.len(), "compiled unit");
        Ok(output)
    }

    /// Declared defaults across the theme, in assembly order.
    ///
    /// Base declarations come first, then each unit's declarations, then the
    /// global defaults not declared in the base layer, then the theme layer.
    /// A later declaration replaces the value of an earlier one.
    pub fn fallback_defaults(&self) -> Result<IndexMap<String, String>, LessError> {
        let mut defaults = IndexMap::new();

        let base = self.sources.base()?.unwrap_or_default();
        defaults.extend(scan_declarations(&base));
        let base_len = defaults.len();

        for unit in self.sources.units()? {
            for line in split_unit(&self.sources.unit(&unit)?).declarations {
                if let Some((name, value)) = parse_declaration(&line) {
                    defaults.insert(name.to_string(), value.to_string());
                }
            }
        }

        let global = self.sources.global()?.unwrap_or_default();
        for (name, value) in scan_declarations(&global) {
            if defaults.get_index_of(&name).is_none_or(|i| i >= base_len) {
                defaults.insert(name, value);
            }
        }

        let theme = self.sources.theme()?.unwrap_or_default();
        defaults.extend(scan_declarations(&theme));

        debug!(count = defaults.len(), "collected fallback defaults");
        Ok(defaults)
    }

    /// The static `:root` custom property block.
    pub fn fallback_css(&self) -> Result<String, LessError> {
        let defaults = self.fallback_defaults()?;
        let overrides = self.effective_overrides(&self.sources.layout().global_unit)?;
        Ok(self.fallback.generate(&defaults, &overrides))
    }

    /// Drop `unit`'s cached catalog.
    pub fn invalidate(&mut self, unit: &str) -> bool {
        self.cache.invalidate(unit)
    }

    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::fs;
    use std::path::Path;

    use pretty_assertions::assert_eq;
    use themeweave_system_runtime::{MemoryOverrideStore, NativeRuntime, RuntimeResult};

    fn write(root: &Path, relative: &str, contents: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    fn theme() -> tempfile::TempDir {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path();
        write(root, "base/variables.less", "@global-margin: 20px;\n@global-color: #333;\n");
        write(
            root,
            "components/global.less",
            "@global-margin: 99px;\n@primary-color: #303033;\n@global-large-margin: @global-margin * 2;\n",
        );
        write(
            root,
            "components/button.less",
            "// @group: Colors\n@btn-color: @primary-color;\n@btn-padding: @global-margin;\n\n.uk-button {\n  color: @btn-color;\n}\n",
        );
        write(
            root,
            "components/card.less",
            "@card-background: #fff;\n\n.uk-card {\n  background: @card-background;\n}\n",
        );
        temp
    }

    struct Unavailable {
        calls: Cell<usize>,
    }

    impl StyleCompiler for Unavailable {
        fn is_available(&self) -> bool {
            false
        }

        fn name(&self) -> &str {
            "missing"
        }

        fn compile(&self, _source: &str, _variables: &[(String, String)]) -> RuntimeResult<String> {
            self.calls.set(self.calls.get() + 1);
            Ok(String::new())
        }
    }

    #[test]
    fn test_catalog_is_cached_until_invalidated() {
        let temp = theme();
        let runtime = NativeRuntime::new();
        let store = MemoryOverrideStore::new();
        let mut engine = ThemeEngine::new(
            ThemeSources::new(temp.path(), ThemeLayout::default(), &runtime),
            &store,
        );

        assert_eq!(engine.catalog("button").unwrap().len(), 2);
        write(temp.path(), "components/button.less", "@btn-color: red;\n");
        assert_eq!(engine.catalog("button").unwrap().len(), 2);

        assert!(engine.invalidate("button"));
        assert_eq!(engine.catalog("button").unwrap().len(), 1);
    }

    #[test]
    fn test_missing_unit_and_missing_global() {
        let temp = tempfile::tempdir().unwrap();
        let runtime = NativeRuntime::new();
        let store = MemoryOverrideStore::new();
        let mut engine = ThemeEngine::new(
            ThemeSources::new(temp.path(), ThemeLayout::default(), &runtime),
            &store,
        );

        assert!(matches!(
            engine.catalog("nope"),
            Err(LessError::UnitNotFound { .. })
        ));
        assert!(engine.global_catalog().unwrap().is_empty());
        assert_eq!(engine.resolve("global", "anything").unwrap(), "@anything");
    }

    #[test]
    fn test_resolve_through_global_defaults_and_overrides() {
        let temp = theme();
        let runtime = NativeRuntime::new();
        let store = MemoryOverrideStore::new();
        let mut engine = ThemeEngine::new(
            ThemeSources::new(temp.path(), ThemeLayout::default(), &runtime),
            &store,
        );

        assert_eq!(engine.resolve("button", "btn-color").unwrap(), "#303033");

        store
            .put("card", &OverrideMap::from([("primary-color".to_string(), "#ff0000".to_string())]))
            .unwrap();
        assert_eq!(engine.resolve("button", "btn-color").unwrap(), "#ff0000");

        let variables = engine.variables("button").unwrap();
        assert_eq!(variables[0].name, "btn-color");
        assert_eq!(variables[0].group, "Colors");
        assert_eq!(variables[0].resolved, "#ff0000");
        assert!(!variables[0].overridden);
    }

    #[test]
    fn test_assemble_uses_stored_overrides() {
        let temp = theme();
        let runtime = NativeRuntime::new();
        let store = MemoryOverrideStore::new();
        store
            .put("button", &OverrideMap::from([("btn-color".to_string(), "#000".to_string())]))
            .unwrap();
        let engine = ThemeEngine::new(
            ThemeSources::new(temp.path(), ThemeLayout::default(), &runtime),
            &store,
        );

        let assembled = engine.assemble("card").unwrap();
        assert_eq!(
            assembled.fragment(crate::assemble::Layer::Overrides),
            Some("@btn-color: #000;")
        );
        assert!(engine.preprocess_unit("card").unwrap().source.contains(".uk-card"));
    }

    #[test]
    fn test_compile_unit_unavailable_before_any_work() {
        let runtime = NativeRuntime::new();
        let store = MemoryOverrideStore::new();
        let engine = ThemeEngine::new(
            ThemeSources::new("/does/not/exist", ThemeLayout::default(), &runtime),
            &store,
        );
        let compiler = Unavailable { calls: Cell::new(0) };

        let err = engine
            .compile_unit("button", &compiler, &OverrideMap::new())
            .unwrap_err();
        assert!(err.is_compiler_unavailable());
        assert_eq!(compiler.calls.get(), 0);
    }

    #[test]
    fn test_fallback_defaults_order_and_css() {
        let temp = theme();
        write(temp.path(), "theme/variables.less", "@global-color: #111;\n");
        let runtime = NativeRuntime::new();
        let store = MemoryOverrideStore::new();
        let engine = ThemeEngine::new(
            ThemeSources::new(temp.path(), ThemeLayout::default(), &runtime),
            &store,
        )
        .with_fallback(FallbackGenerator::new(
            ["global-margin", "global-large-margin", "global-color", "btn-color"]
                .iter()
                .map(|s| s.to_string()),
        ));

        let defaults = engine.fallback_defaults().unwrap();
        // Base wins over the global unit for names both declare.
        assert_eq!(defaults["global-margin"], "20px");
        assert_eq!(defaults["global-color"], "#111");

        store
            .put("card", &OverrideMap::from([("global-margin".to_string(), "10px".to_string())]))
            .unwrap();
        assert_eq!(
            engine.fallback_css().unwrap(),
            ":root {\n  --global-margin: 10px;\n  --global-large-margin: 20px;\n  --global-color: #111;\n  --btn-color: #303033;\n}\n"
        );
    }
}
