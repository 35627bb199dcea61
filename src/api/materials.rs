//! Known material handles.
//!
//! The remote ships a fixed set of built-in materials and allocates further
//! handles through `createMaterials`. The catalog is built once when the
//! client is assembled and extended as materials are created, so the façade
//! can refuse handles the remote never issued.

use std::collections::{BTreeMap, HashSet};
use std::sync::RwLock;

/// Built-in materials and their handles.
pub const BUILTIN_MATERIALS: [(&str, u32); 4] =
    [("default", 0), ("glass", 1), ("metal", 2), ("highlight", 3)];

/// Handles the remote is known to accept for `setMaterials`.
#[derive(Debug)]
pub struct MaterialCatalog {
    named: BTreeMap<String, u32>,
    known: RwLock<HashSet<u32>>,
}

impl MaterialCatalog {
    /// A catalog with no materials at all.
    pub fn empty() -> Self {
        Self {
            named: BTreeMap::new(),
            known: RwLock::new(HashSet::new()),
        }
    }

    /// Add a named material, replacing any previous handle for the name.
    pub fn with_named(mut self, name: impl Into<String>, handle: u32) -> Self {
        self.named.insert(name.into(), handle);
        self.known_mut().insert(handle);
        self
    }

    /// Handle of a named material.
    pub fn by_name(&self, name: &str) -> Option<u32> {
        self.named.get(name).copied()
    }

    /// Names of all named materials, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.named.keys().map(String::as_str)
    }

    pub fn contains(&self, handle: u32) -> bool {
        match self.known.read() {
            Ok(known) => known.contains(&handle),
            Err(poisoned) => poisoned.into_inner().contains(&handle),
        }
    }

    /// First handle in `handles` the catalog does not know.
    pub fn first_unknown(&self, handles: &[u32]) -> Option<u32> {
        handles.iter().copied().find(|h| !self.contains(*h))
    }

    /// Record handles allocated by the remote.
    pub fn register<I: IntoIterator<Item = u32>>(&self, handles: I) {
        let mut known = match self.known.write() {
            Ok(known) => known,
            Err(poisoned) => poisoned.into_inner(),
        };
        known.extend(handles);
    }

    fn known_mut(&mut self) -> &mut HashSet<u32> {
        match self.known.get_mut() {
            Ok(known) => known,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl Default for MaterialCatalog {
    fn default() -> Self {
        BUILTIN_MATERIALS
            .iter()
            .fold(Self::empty(), |catalog, (name, handle)| {
                catalog.with_named(*name, *handle)
            })
    }
}
