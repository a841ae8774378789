/*
 * store.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * OverrideStore implementations: an in-process map and a JSON file.
 */

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::debug;

use crate::native::NativeRuntime;
use crate::traits::{OverrideMap, OverrideStore, RuntimeError, RuntimeResult, SystemRuntime};

/// Every unit's overrides, keyed by unit name.
pub type OverrideTable = BTreeMap<String, OverrideMap>;

/// In-process override store.
///
/// Useful for previews (unsaved edits) and tests.
#[derive(Debug, Default)]
pub struct MemoryOverrideStore {
    units: Mutex<OverrideTable>,
}

impl MemoryOverrideStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with existing data.
    pub fn from_table(table: OverrideTable) -> Self {
        Self {
            units: Mutex::new(table),
        }
    }

    /// Copy of everything currently stored.
    pub fn snapshot(&self) -> RuntimeResult<OverrideTable> {
        Ok(self.lock()?.clone())
    }

    fn lock(&self) -> RuntimeResult<std::sync::MutexGuard<'_, OverrideTable>> {
        self.units
            .lock()
            .map_err(|_| RuntimeError::Store("override store lock poisoned".to_string()))
    }
}

impl OverrideStore for MemoryOverrideStore {
    fn get(&self, unit: &str) -> RuntimeResult<OverrideMap> {
        Ok(self.lock()?.get(unit).cloned().unwrap_or_default())
    }

    fn put(&self, unit: &str, values: &OverrideMap) -> RuntimeResult<()> {
        self.lock()?.insert(unit.to_string(), values.clone());
        Ok(())
    }

    fn delete(&self, unit: &str) -> RuntimeResult<()> {
        self.lock()?.remove(unit);
        Ok(())
    }
}

/// Override store persisted as a single JSON document:
///
/// ```json
/// { "button": { "button-background": "#1e87f0" } }
/// ```
///
/// The file is read on every access and rewritten whole on every mutation.
/// A missing file is an empty store.
#[derive(Debug)]
pub struct JsonOverrideStore<R: SystemRuntime = NativeRuntime> {
    path: PathBuf,
    runtime: R,
}

impl JsonOverrideStore<NativeRuntime> {
    /// Store backed by a file on the local filesystem.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_runtime(path, NativeRuntime::new())
    }
}

impl<R: SystemRuntime> JsonOverrideStore<R> {
    pub fn with_runtime(path: impl Into<PathBuf>, runtime: R) -> Self {
        Self {
            path: path.into(),
            runtime,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the whole table.
    pub fn load(&self) -> RuntimeResult<OverrideTable> {
        if !self.runtime.is_file(&self.path)? {
            return Ok(OverrideTable::new());
        }
        let text = self.runtime.file_read_string(&self.path)?;
        if text.trim().is_empty() {
            return Ok(OverrideTable::new());
        }
        serde_json::from_str(&text).map_err(|e| {
            RuntimeError::Store(format!("{}: {}", self.path.display(), e))
        })
    }

    fn save(&self, table: &OverrideTable) -> RuntimeResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !self.runtime.is_dir(parent)? {
                self.runtime.dir_create(parent, true)?;
            }
        }
        let json = serde_json::to_string_pretty(table)
            .map_err(|e| RuntimeError::Store(e.to_string()))?;
        debug!(path = %self.path.display(), units = table.len(), "writing override store");
        self.runtime.file_write(&self.path, json.as_bytes())
    }
}

impl<R: SystemRuntime> OverrideStore for JsonOverrideStore<R> {
    fn get(&self, unit: &str) -> RuntimeResult<OverrideMap> {
        Ok(self.load()?.remove(unit).unwrap_or_default())
    }

    fn put(&self, unit: &str, values: &OverrideMap) -> RuntimeResult<()> {
        let mut table = self.load()?;
        table.insert(unit.to_string(), values.clone());
        self.save(&table)
    }

    fn delete(&self, unit: &str) -> RuntimeResult<()> {
        let mut table = self.load()?;
        if table.remove(unit).is_some() {
            self.save(&table)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> OverrideMap {
        OverrideMap::from([
            ("button-background".to_string(), "#1e87f0".to_string()),
            ("button-radius".to_string(), "2px".to_string()),
        ])
    }

    #[test]
    fn test_memory_store_put_get_delete() {
        let store = MemoryOverrideStore::new();
        assert!(store.get("button").unwrap().is_empty());

        store.put("button", &sample()).unwrap();
        assert_eq!(store.get("button").unwrap(), sample());
        assert!(store.get("card").unwrap().is_empty());

        store.delete("button").unwrap();
        assert!(store.get("button").unwrap().is_empty());
    }

    #[test]
    fn test_memory_store_put_replaces() {
        let store = MemoryOverrideStore::new();
        store.put("button", &sample()).unwrap();

        let replacement = OverrideMap::from([("button-color".to_string(), "#fff".to_string())]);
        store.put("button", &replacement).unwrap();

        assert_eq!(store.get("button").unwrap(), replacement);
    }

    #[test]
    fn test_json_store_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonOverrideStore::new(dir.path().join("overrides.json"));
        assert!(store.get("button").unwrap().is_empty());
        // Deleting from an absent file must not create it.
        store.delete("button").unwrap();
        assert!(!store.path().exists());
    }

    #[test]
    fn test_json_store_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("overrides.json");

        JsonOverrideStore::new(&path).put("button", &sample()).unwrap();
        JsonOverrideStore::new(&path)
            .put("global", &OverrideMap::from([("global-color".to_string(), "#222".to_string())]))
            .unwrap();

        let reopened = JsonOverrideStore::new(&path);
        assert_eq!(reopened.get("button").unwrap(), sample());
        assert_eq!(reopened.load().unwrap().len(), 2);

        reopened.delete("button").unwrap();
        assert!(reopened.get("button").unwrap().is_empty());
        assert_eq!(reopened.get("global").unwrap().len(), 1);
    }

    #[test]
    fn test_json_store_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("overrides.json");
        std::fs::write(&path, "{ not json").unwrap();

        let store = JsonOverrideStore::new(&path);
        let err = store.get("button").unwrap_err();
        assert!(matches!(err, RuntimeError::Store(_)));
        assert!(err.to_string().contains("overrides.json"));
    }
}
