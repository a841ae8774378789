//! Command implementations for the themeweave CLI
//!
//! Each command module handles the CLI interface and delegates to
//! themeweave-less for the actual work.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use tracing::debug;

use themeweave_less::{CONFIG_FILE_NAME, ThemeConfig, ThemeEngine};
use themeweave_system_runtime::{
    JsonOverrideStore, NativeRuntime, OverrideMap, SystemRuntime, default_runtime,
};

use crate::ThemeArgs;

pub mod assemble;
pub mod compile;
pub mod export;
pub mod fallback;
pub mod import;
pub mod preprocess;
pub mod reset;
pub mod resolve;
pub mod set;
pub mod units;
pub mod vars;

/// An opened theme root: configuration, runtime and override store.
pub struct Theme {
    pub root: PathBuf,
    pub config: ThemeConfig,
    pub runtime: NativeRuntime,
    pub store: JsonOverrideStore,
}

impl Theme {
    pub fn open(args: &ThemeArgs) -> Result<Self> {
        let runtime = default_runtime();
        if !runtime
            .is_dir(&args.root)
            .with_context(|| format!("Failed to check theme root {}", args.root.display()))?
        {
            bail!("Theme root does not exist: {}", args.root.display());
        }

        let config_path = args
            .config
            .clone()
            .unwrap_or_else(|| args.root.join(CONFIG_FILE_NAME));
        let config = ThemeConfig::load(&runtime, &config_path)
            .with_context(|| format!("Failed to load {}", config_path.display()))?;

        let store_path = match &args.store {
            Some(path) => path.clone(),
            None => config.store_path(&args.root),
        };
        debug!(
            root = %args.root.display(),
            store = %store_path.display(),
            "opened theme"
        );

        Ok(Self {
            root: args.root.clone(),
            config,
            runtime,
            store: JsonOverrideStore::new(store_path),
        })
    }

    pub fn engine(&self) -> ThemeEngine<'_> {
        ThemeEngine::from_config(&self.root, &self.config, &self.runtime, &self.store)
    }
}

/// Parse `NAME=VALUE` arguments. The value may be empty.
pub fn parse_assignments(values: &[String]) -> Result<OverrideMap> {
    let mut map = OverrideMap::new();
    for value in values {
        let Some((name, value)) = value.split_once('=') else {
            bail!("Expected NAME=VALUE, got '{}'", value);
        };
        let name = name.trim().trim_start_matches('@');
        if name.is_empty() {
            bail!("Missing variable name in '{}'", value);
        }
        map.insert(name.to_string(), value.to_string());
    }
    Ok(map)
}

/// Write `text` to `output`, or to stdout when no file is given.
pub fn write_output(runtime: &dyn SystemRuntime, output: Option<&Path>, text: &str) -> Result<()> {
    match output {
        Some(path) => {
            runtime
                .file_write(path, text.as_bytes())
                .with_context(|| format!("Failed to write {}", path.display()))?;
            tracing::info!(path = %path.display(), bytes = text.len(), "wrote output");
        }
        None => print!("{}", text),
    }
    Ok(())
}
