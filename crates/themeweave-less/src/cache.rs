//! Parsed catalog cache.
//!
//! Copyright (c) 2025 Posit, PBC

use std::collections::HashMap;

use tracing::debug;

use crate::catalog::parse_catalog;
use crate::types::Catalog;

/// Memoized catalogs keyed by unit name.
///
/// Owned by the caller; entries live until [`CatalogCache::invalidate`] or
/// [`CatalogCache::clear`] is called.
#[derive(Debug, Default)]
pub struct CatalogCache {
    entries: HashMap<String, Catalog>,
}

impl CatalogCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached catalog, parsing the source produced by `source` on a miss.
    ///
    /// `source` is only called on a miss. An error from it is returned and
    /// nothing is cached.
    pub fn get_or_parse<E>(
        &mut self,
        unit: &str,
        source: impl FnOnce() -> Result<String, E>,
    ) -> Result<&Catalog, E> {
        if !self.entries.contains_key(unit) {
            let text = source()?;
            debug!(unit, "parsing catalog");
            self.entries
                .insert(unit.to_string(), parse_catalog(unit, &text));
        }
        Ok(&self.entries[unit])
    }

    pub fn get(&self, unit: &str) -> Option<&Catalog> {
        self.entries.get(unit)
    }

    pub fn insert(&mut self, catalog: Catalog) {
        self.entries.insert(catalog.unit.clone(), catalog);
    }

    /// Drop one unit's entry. Returns whether it was cached.
    pub fn invalidate(&mut self, unit: &str) -> bool {
        let removed = self.entries.remove(unit).is_some();
        if removed {
            debug!(unit, "invalidated cached catalog");
        }
        removed
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
