//! Time-bounded in-memory store for page snapshots

use crate::types::CatalogSnapshot;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Snapshots are keyed by `(page, page_size)`
type PageKey = (u32, u32);

/// In-memory store for catalog snapshots
///
/// Only consulted when a TTL is configured. Entries older than the TTL are
/// never returned and are evicted on the next write.
#[derive(Clone)]
pub struct SnapshotStore {
    ttl_secs: u64,
    snapshots: Arc<RwLock<HashMap<PageKey, CatalogSnapshot>>>,
}

impl SnapshotStore {
    /// Creates a store that serves snapshots younger than `ttl_secs`
    pub fn new(ttl_secs: u64) -> Self {
        Self {
            ttl_secs,
            snapshots: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Gets a fresh snapshot for a page, if one is stored
    pub async fn get_fresh(&self, page: u32, page_size: u32) -> Option<CatalogSnapshot> {
        let snapshots = self.snapshots.read().await;
        snapshots
            .get(&(page, page_size))
            .filter(|snapshot| !snapshot.is_stale(self.ttl_secs))
            .cloned()
    }

    /// Stores a snapshot, replacing whatever was there for the same page
    pub async fn insert(&self, snapshot: CatalogSnapshot) {
        let mut snapshots = self.snapshots.write().await;
        snapshots.retain(|_, existing| !existing.is_stale(self.ttl_secs));
        tracing::debug!(
            page = snapshot.page,
            count = snapshot.len(),
            "Stored snapshot"
        );
        snapshots.insert((snapshot.page, snapshot.page_size), snapshot);
    }

    pub async fn len(&self) -> usize {
        self.snapshots.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MarketEntry;
    use chrono::{Duration, Utc};

    fn snapshot(page: u32) -> CatalogSnapshot {
        CatalogSnapshot::new(
            page,
            2,
            vec![
                MarketEntry::new("bitcoin", "Bitcoin", "btc", 1.0),
                MarketEntry::new("ethereum", "Ethereum", "eth", 2.0),
            ],
        )
    }

    #[tokio::test]
    async fn test_fresh_snapshot_is_served() {
        let store = SnapshotStore::new(60);
        store.insert(snapshot(1)).await;

        assert!(store.get_fresh(1, 2).await.is_some());
        assert!(store.get_fresh(1, 3).await.is_none());
        assert!(store.get_fresh(2, 2).await.is_none());
    }

    #[tokio::test]
    async fn test_stale_snapshot_is_not_served_and_evicted() {
        let store = SnapshotStore::new(60);
        let mut old = snapshot(1);
        old.fetched_at = Utc::now() - Duration::seconds(120);
        store.insert(old).await;
        assert!(store.get_fresh(1, 2).await.is_none());

        store.insert(snapshot(2)).await;
        assert_eq!(store.len().await, 1);
        assert!(store.get_fresh(2, 2).await.is_some());
    }
}
