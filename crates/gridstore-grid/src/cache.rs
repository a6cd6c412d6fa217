//! Read-through snapshot cache
//!
//! The cache holds either nothing or a snapshot of every sheet of the
//! resource. There is no row-level granularity: any mutation clears the
//! whole snapshot, and the next read refetches it in full.

use crate::snapshot::Snapshot;
use parking_lot::RwLock;
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
enum CacheState {
    #[default]
    Empty,
    Populated(Arc<Snapshot>),
}

/// Snapshot cache shared by every operation of one adapter
#[derive(Debug, Default)]
pub struct SnapshotCache {
    state: RwLock<CacheState>,
}

impl SnapshotCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached snapshot, if populated
    pub fn get(&self) -> Option<Arc<Snapshot>> {
        match &*self.state.read() {
            CacheState::Empty => None,
            CacheState::Populated(snapshot) => Some(Arc::clone(snapshot)),
        }
    }

    /// Replace the cached snapshot
    pub fn populate(&self, snapshot: Snapshot) -> Arc<Snapshot> {
        let snapshot = Arc::new(snapshot);
        *self.state.write() = CacheState::Populated(Arc::clone(&snapshot));
        snapshot
    }

    /// Drop the cached snapshot; called after every mutation
    pub fn invalidate(&self) {
        *self.state.write() = CacheState::Empty;
    }

    pub fn is_populated(&self) -> bool {
        matches!(&*self.state.read(), CacheState::Populated(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> Snapshot {
        Snapshot {
            spreadsheet_id: "abc".to_string(),
            title: "Test".to_string(),
            sheets: Vec::new(),
        }
    }

    #[test]
    fn test_cache_starts_empty() {
        let cache = SnapshotCache::new();
        assert!(!cache.is_populated());
        assert!(cache.get().is_none());
    }

    #[test]
    fn test_populate_and_invalidate() {
        let cache = SnapshotCache::new();
        let stored = cache.populate(snapshot());
        assert!(cache.is_populated());
        assert!(Arc::ptr_eq(&stored, &cache.get().unwrap()));

        cache.invalidate();
        assert!(!cache.is_populated());
        assert!(cache.get().is_none());
    }

    #[test]
    fn test_outstanding_snapshot_survives_invalidate() {
        let cache = SnapshotCache::new();
        let held = cache.populate(snapshot());
        cache.invalidate();
        assert_eq!(held.spreadsheet_id, "abc");
    }
}
