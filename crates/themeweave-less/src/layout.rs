//! Theme source layout.
//!
//! Copyright (c) 2025 Posit, PBC
//!
//! A theme root contains the shared layers and one rule-body file per unit:
//!
//! ```text
//! <root>/
//!   base/variables.less        base declarations
//!   mixins/mixins.less         mixin definitions
//!   components/global.less     global defaults unit
//!   components/inverse.less    shared inverse layer (hook call sites)
//!   components/<unit>.less     one file per unit
//!   theme/variables.less       theme-level declaration overrides
//! ```
//!
//! Every path is relative to the root and can be changed in the `[layout]`
//! section of `themeweave.toml`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use themeweave_system_runtime::SystemRuntime;

use crate::error::LessError;

/// Extension of unit source files.
pub const UNIT_EXTENSION: &str = "less";

/// Where each layer lives under the theme root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ThemeLayout {
    pub base: PathBuf,
    pub mixins: PathBuf,
    /// Directory holding one `<unit>.less` file per unit
    pub components: PathBuf,
    pub theme: PathBuf,
    /// Unit whose declarations act as global defaults
    pub global_unit: String,
    /// Unit file read only for its hook call sites
    pub inverse_unit: String,
}

impl Default for ThemeLayout {
    fn default() -> Self {
        Self {
            base: PathBuf::from("base/variables.less"),
            mixins: PathBuf::from("mixins/mixins.less"),
            components: PathBuf::from("components"),
            theme: PathBuf::from("theme/variables.less"),
            global_unit: "global".to_string(),
            inverse_unit: "inverse".to_string(),
        }
    }
}

impl ThemeLayout {
    /// Relative path of a unit's rule-body file.
    pub fn unit_path(&self, unit: &str) -> PathBuf {
        self.components.join(format!("{}.{}", unit, UNIT_EXTENSION))
    }

    /// Units that are shared layers rather than compilable units.
    pub fn is_shared_unit(&self, unit: &str) -> bool {
        unit == self.global_unit || unit == self.inverse_unit
    }
}

/// Whether `unit` is usable as a file stem: non-empty, `[A-Za-z0-9_-]` only.
pub fn is_valid_unit_name(unit: &str) -> bool {
    !unit.is_empty()
        && unit
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

/// Read access to the layer files of one theme root.
pub struct ThemeSources<'a> {
    root: PathBuf,
    layout: ThemeLayout,
    runtime: &'a dyn SystemRuntime,
}

impl std::fmt::Debug for ThemeSources<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThemeSources")
            .field("root", &self.root)
            .field("layout", &self.layout)
            .finish_non_exhaustive()
    }
}

impl<'a> ThemeSources<'a> {
    pub fn new(root: impl Into<PathBuf>, layout: ThemeLayout, runtime: &'a dyn SystemRuntime) -> Self {
        Self {
            root: root.into(),
            layout,
            runtime,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn layout(&self) -> &ThemeLayout {
        &self.layout
    }

    pub fn runtime(&self) -> &'a dyn SystemRuntime {
        self.runtime
    }

    /// Absolute path of a unit's rule-body file.
    pub fn unit_path(&self, unit: &str) -> PathBuf {
        self.root.join(self.layout.unit_path(unit))
    }

    /// Read an optional shared layer. A missing file is `None`.
    fn read_optional(&self, relative: &Path) -> Result<Option<String>, LessError> {
        let path = self.root.join(relative);
        if !self.runtime.is_file(&path)? {
            debug!(path = %path.display(), "shared layer missing");
            return Ok(None);
        }
        Ok(Some(self.runtime.file_read_string(&path)?))
    }

    pub fn base(&self) -> Result<Option<String>, LessError> {
        self.read_optional(&self.layout.base)
    }

    pub fn mixins(&self) -> Result<Option<String>, LessError> {
        self.read_optional(&self.layout.mixins)
    }

    pub fn theme(&self) -> Result<Option<String>, LessError> {
        self.read_optional(&self.layout.theme)
    }

    pub fn global(&self) -> Result<Option<String>, LessError> {
        self.read_optional(&self.layout.unit_path(&self.layout.global_unit))
    }

    pub fn inverse(&self) -> Result<Option<String>, LessError> {
        self.read_optional(&self.layout.unit_path(&self.layout.inverse_unit))
    }

    /// Read a unit's rule-body file.
    ///
    /// # Errors
    ///
    /// Returns `LessError::UnitNotFound` for invalid names and missing files.
    pub fn unit(&self, unit: &str) -> Result<String, LessError> {
        let path = self.unit_path(unit);
        if !is_valid_unit_name(unit) || !self.runtime.is_file(&path)? {
            return Err(LessError::UnitNotFound {
                unit: unit.to_string(),
                path: path.display().to_string(),
            });
        }
        Ok(self.runtime.file_read_string(&path)?)
    }

    /// Compilable units, sorted. Shared layers are excluded.
    pub fn units(&self) -> Result<Vec<String>, LessError> {
        let dir = self.root.join(&self.layout.components);
        if !self.runtime.is_dir(&dir)? {
            return Ok(Vec::new());
        }
        let mut units: Vec<String> = self
            .runtime
            .dir_list(&dir)?
            .into_iter()
            .filter(|path| path.extension().is_some_and(|ext| ext == UNIT_EXTENSION))
            .filter_map(|path| {
                path.file_stem()
                    .and_then(|stem| stem.to_str())
                    .map(str::to_string)
            })
            .filter(|unit| is_valid_unit_name(unit) && !self.layout.is_shared_unit(unit))
            .collect();
        units.sort();
        Ok(units)
    }
}
