//! Generation-stamped attribute lookup cache
//!
//! Resolution walks a type's MRO and returns the first definition found.
//! The result is memoized together with the generation of every node the
//! walk visited, not just the owner: a later mutation anywhere along the
//! visited prefix, including adding an attribute on a node closer in the
//! MRO, invalidates the entry on its next use. "Not found" is a valid,
//! cacheable result.
//!
//! Each node's generation is read before its attribute table, so a racing
//! mutation can only leave a stale stamp behind; it can never let a torn
//! result survive revalidation.

use crate::registry::TypeRegistry;
use dashmap::DashMap;
use graft_types::{AttributeDef, TypeNodeId};

#[derive(Clone)]
struct CacheEntry {
    /// Resolved definition, or None for a cached miss
    result: Option<AttributeDef>,
    /// (node, generation) for every node visited during the walk
    stamps: Vec<(TypeNodeId, u64)>,
}

/// Memoized attribute resolution along the MRO
pub struct LookupCache {
    entries: DashMap<(TypeNodeId, String), CacheEntry>,
}

impl LookupCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Resolve `name` on `ty` along its MRO
    ///
    /// Returns `None` when `ty` is unknown or no ancestor defines the
    /// attribute. Never fails: a miss is an answer.
    pub fn resolve(
        &self,
        registry: &TypeRegistry,
        ty: TypeNodeId,
        name: &str,
    ) -> Option<AttributeDef> {
        if let Some(entry) = self.entries.get(&(ty, name.to_string())) {
            if entry
                .stamps
                .iter()
                .all(|&(id, gen)| registry.get(id).is_some_and(|n| n.generation() == gen))
            {
                return entry.result.clone();
            }
        }

        let node = registry.get(ty)?;
        let mut stamps = Vec::new();
        let mut result = None;
        for &ancestor_id in node.mro() {
            let Some(ancestor) = registry.get(ancestor_id) else {
                continue;
            };
            let generation = ancestor.generation();
            let found = ancestor.own_attribute(name);
            stamps.push((ancestor_id, generation));
            if let Some(def) = found {
                result = Some(def);
                break;
            }
        }

        self.entries
            .insert((ty, name.to_string()), CacheEntry { result: result.clone(), stamps });
        result
    }

    /// Number of memoized entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for LookupCache {
    fn default() -> Self {
        Self::new()
    }
}
