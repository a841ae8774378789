//! Compiler-independent custom property generation.
//!
//! Copyright (c) 2025 Posit, PBC
//!
//! When no LESS compiler is available the theme still needs its key values
//! as CSS custom properties. This module merges defaults with overrides,
//! resolves references with [`resolve_all`], evaluates arithmetic and emits
//! a `:root` block restricted to an allow list:
//!
//! ```text
//! :root {
//!   --global-font-size: 16px;
//!   --global-primary-background: #1e87f0;
//! }
//! ```

use indexmap::IndexMap;
use tracing::debug;

use themeweave_system_runtime::OverrideMap;

use crate::evaluate::evaluate;
use crate::resolve::{DEFAULT_MAX_PASSES, resolve_all};

/// Variables emitted when the configuration does not name its own list.
pub const DEFAULT_FALLBACK_VARIABLES: &[&str] = &[
    "global-font-family",
    "global-font-size",
    "global-line-height",
    "global-xlarge-font-size",
    "global-large-font-size",
    "global-medium-font-size",
    "global-small-font-size",
    "global-color",
    "global-emphasis-color",
    "global-muted-color",
    "global-link-color",
    "global-link-hover-color",
    "global-inverse-color",
    "global-background",
    "global-muted-background",
    "global-primary-background",
    "global-secondary-background",
    "global-success-background",
    "global-warning-background",
    "global-danger-background",
    "global-border-width",
    "global-border",
    "global-margin",
    "global-small-margin",
    "global-medium-margin",
    "global-large-margin",
    "global-gutter",
    "global-small-gutter",
    "global-medium-gutter",
    "global-large-gutter",
    "global-control-height",
    "global-small-box-shadow",
    "global-medium-box-shadow",
    "global-large-box-shadow",
];

/// Allow list and pass limit for fallback generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallbackGenerator {
    pub variables: Vec<String>,
    pub max_passes: usize,
}

impl Default for FallbackGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_FALLBACK_VARIABLES.iter().map(|s| s.to_string()))
    }
}

impl FallbackGenerator {
    pub fn new(variables: impl IntoIterator<Item = String>) -> Self {
        Self {
            variables: variables.into_iter().collect(),
            max_passes: DEFAULT_MAX_PASSES,
        }
    }

    pub fn with_max_passes(mut self, max_passes: usize) -> Self {
        self.max_passes = max_passes;
        self
    }

    /// Resolved and evaluated value of every allow-listed name, in list order.
    ///
    /// Names missing from the merged map, and values that still hold an
    /// unresolved `@` reference after resolution, are left out.
    pub fn values(&self, defaults: &IndexMap<String, String>, overrides: &OverrideMap) -> Vec<(String, String)> {
        let mut merged = defaults.clone();
        for (name, value) in overrides {
            if !value.trim().is_empty() {
                merged.insert(name.clone(), value.trim().to_string());
            }
        }
        let resolved = resolve_all(&merged, self.max_passes);

        let mut seen = std::collections::HashSet::new();
        let mut values = Vec::new();
        for name in &self.variables {
            if !seen.insert(name.as_str()) {
                continue;
            }
            let Some(value) = resolved.get(name) else {
                continue;
            };
            let value = evaluate(value);
            if value.contains('@') {
                debug!(name = %name, value = %value, "fallback value still has references");
                continue;
            }
            if value.trim().is_empty() {
                continue;
            }
            values.push((name.clone(), value.trim().to_string()));
        }
        values
    }

    /// The `:root` block of custom properties.
    pub fn generate(&self, defaults: &IndexMap<String, String>, overrides: &OverrideMap) -> String {
        let values = self.values(defaults, overrides);
        debug!(count = values.len(), "generated fallback properties");
        let mut css = String::from(":root {\n");
        for (name, value) in values {
            css.push_str(&format!("  --{}: {};\n", name, value));
        }
        css.push_str("}\n");
        css
    }
}

/// Generate the fallback block for an explicit allow list.
pub fn generate_fallback(
    defaults: &IndexMap<String, String>,
    overrides: &OverrideMap,
    allow_list: &[&str],
) -> String {
    FallbackGenerator::new(allow_list.iter().map(|s| s.to_string())).generate(defaults, overrides)
}
