use moka::sync::Cache;
use std::time::Duration;
use tracing::info;

/// Content of a room that has just closed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CachedSnapshot {
    pub content: String,
    pub version: i64,
    /// Still differs from what the store holds
    pub dirty: bool,
}

/// Recently closed room snapshots, evicted after a period of inactivity.
///
/// A quick rejoin gets the latest text without a store round trip, and a
/// snapshot whose write-back failed is not lost until it idles out.
#[derive(Clone)]
pub struct SnapshotCache {
    cache: Cache<String, CachedSnapshot>,
}

impl SnapshotCache {
    pub fn new(max_capacity: u64, time_to_idle: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_capacity)
            .time_to_idle(time_to_idle)
            .build();
        info!("Snapshot cache initialized");
        Self { cache }
    }

    pub fn put(&self, document_id: &str, snapshot: CachedSnapshot) {
        self.cache.insert(document_id.to_string(), snapshot);
    }

    /// Remove and return a cached snapshot.
    pub fn take(&self, document_id: &str) -> Option<CachedSnapshot> {
        self.cache.remove(document_id)
    }

    pub fn entry_count(&self) -> u64 {
        self.cache.run_pending_tasks();
        self.cache.entry_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_removes_entry() {
        let cache = SnapshotCache::new(10, Duration::from_secs(60));
        cache.put("d1", CachedSnapshot { content: "abc".to_string(), version: 3, dirty: true });
        assert_eq!(cache.entry_count(), 1);
        let snap = cache.take("d1").unwrap();
        assert_eq!(snap.version, 3);
        assert!(cache.take("d1").is_none());
        assert_eq!(cache.entry_count(), 0);
    }
}
