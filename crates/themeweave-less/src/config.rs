//! Theme configuration (`themeweave.toml`).
//!
//! Copyright (c) 2025 Posit, PBC
//!
//! ```toml
//! [layout]
//! components = "src/less/components"
//! global_unit = "variables"
//!
//! [fallback]
//! variables = ["global-font-size", "global-primary-background"]
//! max_passes = 10
//!
//! [store]
//! path = ".themeweave/overrides.json"
//! ```
//!
//! Every section and key is optional. A missing file is the default
//! configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use themeweave_system_runtime::SystemRuntime;

use crate::error::LessError;
use crate::fallback::FallbackGenerator;
use crate::layout::ThemeLayout;
use crate::resolve::DEFAULT_MAX_PASSES;

/// File name looked up in the theme root.
pub const CONFIG_FILE_NAME: &str = "themeweave.toml";

/// Default override store location, relative to the theme root.
pub const DEFAULT_STORE_PATH: &str = "overrides.json";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ThemeConfig {
    pub layout: ThemeLayout,
    pub fallback: FallbackConfig,
    pub store: StoreConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FallbackConfig {
    /// Allow list; `None` uses the built-in list
    pub variables: Option<Vec<String>>,
    pub max_passes: usize,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            variables: None,
            max_passes: DEFAULT_MAX_PASSES,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_STORE_PATH),
        }
    }
}

impl ThemeConfig {
    /// Parse configuration text. `hint` names the file in error messages.
    pub fn from_toml_str(text: &str, hint: Option<&str>) -> Result<Self, LessError> {
        let config: ThemeConfig = toml::from_str(text).map_err(|e| LessError::InvalidConfig {
            message: e.message().to_string(),
            hint: hint.map(str::to_string),
        })?;
        config.validate(hint)?;
        Ok(config)
    }

    /// Load a configuration file; a missing file yields the defaults.
    pub fn load(runtime: &dyn SystemRuntime, path: &Path) -> Result<Self, LessError> {
        if !runtime.is_file(path)? {
            debug!(path = %path.display(), "no configuration file, using defaults");
            return Ok(Self::default());
        }
        let text = runtime.file_read_string(path)?;
        Self::from_toml_str(&text, Some(&path.display().to_string()))
    }

    fn validate(&self, hint: Option<&str>) -> Result<(), LessError> {
        let invalid = |message: String| LessError::InvalidConfig {
            message,
            hint: hint.map(str::to_string),
        };
        if self.fallback.max_passes == 0 {
            return Err(invalid("fallback.max_passes must be at least 1".to_string()));
        }
        if self.layout.global_unit.is_empty() {
            return Err(invalid("layout.global_unit must not be empty".to_string()));
        }
        Ok(())
    }

    /// Fallback generator for this configuration.
    pub fn fallback_generator(&self) -> FallbackGenerator {
        let generator = match &self.fallback.variables {
            Some(variables) => FallbackGenerator::new(variables.iter().cloned()),
            None => FallbackGenerator::default(),
        };
        generator.with_max_passes(self.fallback.max_passes)
    }

    /// Store path, resolved against the theme root when relative.
    pub fn store_path(&self, root: &Path) -> PathBuf {
        if self.store.path.is_absolute() {
            self.store.path.clone()
        } else {
            root.join(&self.store.path)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fallback::DEFAULT_FALLBACK_VARIABLES;
    use themeweave_system_runtime::NativeRuntime;

    #[test]
    fn test_empty_config_is_default() {
        let config = ThemeConfig::from_toml_str("", None).unwrap();
        assert_eq!(config, ThemeConfig::default());
        assert_eq!(config.store.path, PathBuf::from("overrides.json"));
        assert_eq!(config.fallback.max_passes, DEFAULT_MAX_PASSES);
    }

    #[test]
    fn test_full_config() {
        let config = ThemeConfig::from_toml_str(
            r#"
[layout]
components = "src/components"
global_unit = "variables"

[fallback]
variables = ["global-font-size"]
max_passes = 4

[store]
path = "state/overrides.json"
"#,
            None,
        )
        .unwrap();

        assert_eq!(config.layout.components, PathBuf::from("src/components"));
        assert_eq!(config.layout.global_unit, "variables");
        assert_eq!(config.layout.inverse_unit, "inverse");

        let generator = config.fallback_generator();
        assert_eq!(generator.variables, vec!["global-font-size"]);
        assert_eq!(generator.max_passes, 4);

        assert_eq!(
            config.store_path(Path::new("/theme")),
            PathBuf::from("/theme/state/overrides.json")
        );
    }

    #[test]
    fn test_default_fallback_list() {
        let generator = ThemeConfig::default().fallback_generator();
        assert_eq!(generator.variables.len(), DEFAULT_FALLBACK_VARIABLES.len());
    }

    #[test]
    fn test_invalid_config_errors() {
        let err = ThemeConfig::from_toml_str("[layout]\nbogus = 1\n", Some("themeweave.toml")).unwrap_err();
        assert!(matches!(err, LessError::InvalidConfig { .. }));
        assert!(err.to_string().contains("themeweave.toml"));

        let err = ThemeConfig::from_toml_str("[fallback]\nmax_passes = 0\n", None).unwrap_err();
        assert!(err.to_string().contains("max_passes"));
    }

    #[test]
    fn test_load_missing_and_present() {
        let temp = tempfile::tempdir().unwrap();
        let runtime = NativeRuntime::new();
        let path = temp.path().join(CONFIG_FILE_NAME);

        assert_eq!(ThemeConfig::load(&runtime, &path).unwrap(), ThemeConfig::default());

        std::fs::write(&path, "[store]\npath = \"custom.json\"\n").unwrap();
        let config = ThemeConfig::load(&runtime, &path).unwrap();
        assert_eq!(config.store.path, PathBuf::from("custom.json"));
    }
}
