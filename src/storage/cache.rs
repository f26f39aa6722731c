//! A shared, read-through cache for composition text and S³ positions.
//! Populated lazily (or via an explicit preload pass) and immutable after
//! population, per the "shared resources" contract: reads are lock-free,
//! writes only ever add an entry once.

use crate::geometry::S3Point;
use crate::hash::Hash32;
use dashmap::DashMap;

#[derive(Debug, Clone)]
pub struct PositionTextEntry {
    pub text: String,
    pub position: S3Point,
}

/// Flat `hash → (point, text)` map, built once per session as walks and
/// searches touch compositions. Never evicts; the working set is bounded by
/// the relation graph reachable in one session, which is assumed to fit in
/// memory (matching the teacher's in-process `DashMap` caches).
#[derive(Default)]
pub struct PositionTextCache {
    entries: DashMap<Hash32, PositionTextEntry>,
}

impl PositionTextCache {
    pub fn new() -> Self {
        Self { entries: DashMap::new() }
    }

    pub fn get(&self, composition_id: &Hash32) -> Option<PositionTextEntry> {
        self.entries.get(composition_id).map(|r| r.clone())
    }

    /// Insert only if absent; once a composition's text/position is known
    /// it never changes.
    pub fn put_if_absent(&self, composition_id: Hash32, entry: PositionTextEntry) {
        self.entries.entry(composition_id).or_insert(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_if_absent_does_not_overwrite() {
        let cache = PositionTextCache::new();
        let id = [1u8; 32];
        cache.put_if_absent(
            id,
            PositionTextEntry { text: "first".into(), position: [1.0, 0.0, 0.0, 0.0] },
        );
        cache.put_if_absent(
            id,
            PositionTextEntry { text: "second".into(), position: [0.0, 1.0, 0.0, 0.0] },
        );
        assert_eq!(cache.get(&id).unwrap().text, "first");
    }

    #[test]
    fn unknown_id_returns_none() {
        let cache = PositionTextCache::new();
        assert!(cache.get(&[9u8; 32]).is_none());
    }
}
