//! Favorites: a durable set of coins shared by every page through a storage medium

use crate::{
    error::CatalogError,
    storage::FavoritesStorage,
    types::{CatalogEvent, FavoriteEntry},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

/// Ordered favorites, unique by id
///
/// Equality is membership: two sets are equal when they hold the same
/// entries for the same ids, whatever the display order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FavoritesSet {
    entries: Vec<FavoriteEntry>,
}

impl FavoritesSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a set; a repeated id replaces the earlier entry in place
    pub fn from_entries(entries: impl IntoIterator<Item = FavoriteEntry>) -> Self {
        let mut set = Self::new();
        for entry in entries {
            set.insert(entry);
        }
        set
    }

    pub fn is_favorite(&self, id: &str) -> bool {
        self.entries.iter().any(|entry| entry.id == id)
    }

    pub fn get(&self, id: &str) -> Option<&FavoriteEntry> {
        self.entries.iter().find(|entry| entry.id == id)
    }

    /// Adds the entry if absent, removes it if present
    pub fn toggle(&self, entry: impl Into<FavoriteEntry>) -> Self {
        let entry = entry.into();
        let mut next = self.clone();
        if next.remove(&entry.id).is_none() {
            next.entries.push(entry);
        }
        next
    }

    /// Adds an entry, replacing any entry with the same id in place
    pub fn insert(&mut self, entry: FavoriteEntry) {
        match self.entries.iter_mut().find(|existing| existing.id == entry.id) {
            Some(existing) => *existing = entry,
            None => self.entries.push(entry),
        }
    }

    /// Removes an entry by id, returning it
    pub fn remove(&mut self, id: &str) -> Option<FavoriteEntry> {
        let position = self.entries.iter().position(|entry| entry.id == id)?;
        Some(self.entries.remove(position))
    }

    pub fn iter(&self) -> impl Iterator<Item = &FavoriteEntry> {
        self.entries.iter()
    }

    pub fn ids(&self) -> Vec<&str> {
        self.entries.iter().map(|entry| entry.id.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl PartialEq for FavoritesSet {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .entries
                .iter()
                .all(|entry| other.get(&entry.id) == Some(entry))
    }
}

impl<'a> IntoIterator for &'a FavoritesSet {
    type Item = &'a FavoriteEntry;
    type IntoIter = std::slice::Iter<'a, FavoriteEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// A page's view of the favorites
///
/// Holds a transient copy of the set loaded from the storage medium. The
/// copy is only refreshed by [`reload`](Self::reload); another page writing
/// the same slot in the meantime is not noticed, and whichever page saves
/// last wins.
pub struct FavoritesStore {
    storage: Arc<dyn FavoritesStorage>,
    key: String,
    set: FavoritesSet,
    events: Option<broadcast::Sender<CatalogEvent>>,
}

impl FavoritesStore {
    /// Opens the slot `key` and loads its current contents
    pub fn open(storage: Arc<dyn FavoritesStorage>, key: impl Into<String>) -> Self {
        let mut store = Self {
            storage,
            key: key.into(),
            set: FavoritesSet::new(),
            events: None,
        };
        store.reload();
        store
    }

    /// Announce every change on this channel
    pub fn with_events(mut self, events: broadcast::Sender<CatalogEvent>) -> Self {
        self.events = Some(events);
        self
    }

    /// Reads the set from the medium. Missing or unreadable data is an empty set.
    pub fn load(&self) -> FavoritesSet {
        let raw = match self.storage.read(&self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return FavoritesSet::new(),
            Err(e) => {
                tracing::warn!(
                    key = %self.key,
                    storage = self.storage.storage_name(),
                    error = %e,
                    "Favorites unreadable, starting empty"
                );
                return FavoritesSet::new();
            }
        };

        let values: Vec<serde_json::Value> = match serde_json::from_str(&raw) {
            Ok(values) => values,
            Err(e) => {
                tracing::warn!(key = %self.key, error = %e, "Favorites corrupt, starting empty");
                return FavoritesSet::new();
            }
        };

        let total = values.len();
        let set = FavoritesSet::from_entries(
            values
                .into_iter()
                .filter_map(|value| serde_json::from_value::<FavoriteEntry>(value).ok()),
        );
        if set.len() != total {
            tracing::warn!(
                key = %self.key,
                skipped = total - set.len(),
                "Skipped malformed or duplicate favorites"
            );
        }
        set
    }

    /// Writes a set to the medium, replacing what is there
    pub fn save(&self, set: &FavoritesSet) -> Result<(), CatalogError> {
        let raw = serde_json::to_string(set)
            .map_err(|e| CatalogError::persist_failed(e.to_string()))?;
        self.storage.write(&self.key, &raw)?;
        Ok(())
    }

    /// Replaces the in-memory copy with what the medium holds now
    pub fn reload(&mut self) {
        self.set = self.load();
        tracing::debug!(key = %self.key, count = self.set.len(), "Loaded favorites");
    }

    /// The in-memory copy
    pub fn favorites(&self) -> &FavoritesSet {
        &self.set
    }

    pub fn is_favorite(&self, id: &str) -> bool {
        self.set.is_favorite(id)
    }

    /// Toggles an entry and saves the result
    ///
    /// # Returns
    /// Whether the entry is a favorite now. On `PersistFailed` the in-memory
    /// copy has still changed; the change just will not survive the session.
    pub fn toggle_favorite(
        &mut self,
        entry: impl Into<FavoriteEntry>,
    ) -> Result<bool, CatalogError> {
        let entry = entry.into();
        let id = entry.id.clone();
        self.set = self.set.toggle(entry);
        let now_favorite = self.set.is_favorite(&id);
        self.commit(&id, now_favorite).map(|_| now_favorite)
    }

    /// Removes an entry by id and saves. Returns false if it was not a favorite.
    pub fn remove_favorite(&mut self, id: &str) -> Result<bool, CatalogError> {
        if self.set.remove(id).is_none() {
            return Ok(false);
        }
        self.commit(id, false).map(|_| true)
    }

    fn commit(&self, id: &str, now_favorite: bool) -> Result<(), CatalogError> {
        let result = self.save(&self.set);

        match &result {
            Ok(()) => tracing::info!(id, favorite = now_favorite, "Favorites saved"),
            Err(e) => tracing::warn!(
                id,
                favorite = now_favorite,
                error = %e,
                "Favorites change kept for this session only"
            ),
        }

        if let Some(events) = &self.events {
            let _ = events.send(CatalogEvent::favorites_changed(
                id,
                now_favorite,
                result.is_ok(),
            ));
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{FileStorage, MemoryStorage};
    use crate::types::MarketEntry;

    fn btc() -> MarketEntry {
        MarketEntry::new("btc", "Bitcoin", "btc", 65000.12)
    }

    fn eth() -> MarketEntry {
        MarketEntry::new("eth", "Ethereum", "eth", 3400.5)
    }

    #[test]
    fn test_toggle_twice_restores_set() {
        let empty = FavoritesSet::new();
        let with_eth = empty.toggle(&eth());

        for set in [&empty, &with_eth] {
            for entry in [btc(), eth()] {
                let round_trip = set.toggle(&entry).toggle(&entry);
                assert_eq!(&round_trip, set);
            }
        }
    }

    #[test]
    fn test_toggle_flips_membership() {
        let set = FavoritesSet::new().toggle(&eth());
        for entry in [btc(), eth()] {
            let before = set.is_favorite(&entry.id);
            assert_eq!(set.toggle(&entry).is_favorite(&entry.id), !before);
        }
    }

    #[test]
    fn test_insert_replaces_in_place() {
        let mut set =
            FavoritesSet::from_entries([FavoriteEntry::from(&btc()), FavoriteEntry::from(&eth())]);
        let mut newer = btc();
        newer.current_price = 70000.0;
        set.insert(newer.into());

        assert_eq!(set.ids(), vec!["btc", "eth"]);
        assert_eq!(set.get("btc").unwrap().current_price, 70000.0);
    }

    #[test]
    fn test_favorite_survives_reload() {
        let storage = Arc::new(MemoryStorage::new());
        let mut store = FavoritesStore::open(storage.clone(), "favorites");
        assert!(store.toggle_favorite(&btc()).unwrap());

        let reopened = FavoritesStore::open(storage, "favorites");
        let set = reopened.favorites();
        assert_eq!(set.len(), 1);
        let entry = set.get("btc").unwrap();
        assert_eq!(entry.name, "Bitcoin");
        assert_eq!(entry.symbol, "btc");
        assert_eq!(entry.current_price, 65000.12);
    }

    #[test]
    fn test_stored_format_is_json_array() {
        let storage = Arc::new(MemoryStorage::new());
        let mut store = FavoritesStore::open(storage.clone(), "favorites");
        store.toggle_favorite(&btc()).unwrap();

        let raw = storage.read("favorites").unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(
            value,
            serde_json::json!([
                {"id": "btc", "name": "Bitcoin", "symbol": "btc", "current_price": 65000.12}
            ])
        );
    }

    #[test]
    fn test_unreadable_value_is_empty_set() {
        let storage = Arc::new(MemoryStorage::new());
        storage.put_raw("favorites", "not json {").unwrap();
        let store = FavoritesStore::open(storage.clone(), "favorites");
        assert!(store.favorites().is_empty());

        storage
            .put_raw(
                "favorites",
                r#"[{"id": "btc", "name": "Bitcoin", "symbol": "btc", "current_price": 1.0}, {"name": "no id"}, 42]"#,
            )
            .unwrap();
        let store = FavoritesStore::open(storage, "favorites");
        assert_eq!(store.favorites().ids(), vec!["btc"]);
    }

    #[test]
    fn test_persist_failure_keeps_session_state() {
        let storage = Arc::new(MemoryStorage::with_quota(8));
        let (tx, mut rx) = broadcast::channel(4);
        let mut store = FavoritesStore::open(storage.clone(), "favorites").with_events(tx);

        let err = store.toggle_favorite(&btc()).unwrap_err();
        assert!(matches!(err, CatalogError::PersistFailed(_)));
        assert!(store.is_favorite("btc"));
        assert!(storage.read("favorites").unwrap().is_none());

        match rx.try_recv().unwrap() {
            CatalogEvent::FavoritesChanged {
                coin_id, persisted, ..
            } => {
                assert_eq!(coin_id, "btc");
                assert!(!persisted);
            }
            other => panic!("unexpected event {other}"),
        }
    }

    #[test]
    fn test_last_write_wins_between_pages() {
        let storage = Arc::new(MemoryStorage::new());
        let mut listing = FavoritesStore::open(storage.clone(), "favorites");
        let mut watchlist = FavoritesStore::open(storage.clone(), "favorites");

        listing.toggle_favorite(&btc()).unwrap();
        // The watchlist copy is stale and overwrites the listing's write
        watchlist.toggle_favorite(&eth()).unwrap();

        let fresh = FavoritesStore::open(storage, "favorites");
        assert_eq!(fresh.favorites().ids(), vec!["eth"]);

        listing.reload();
        assert!(!listing.is_favorite("btc"));
        assert!(listing.is_favorite("eth"));
    }

    #[test]
    fn test_remove_favorite() {
        let storage = Arc::new(MemoryStorage::new());
        let mut store = FavoritesStore::open(storage, "favorites");
        store.toggle_favorite(&btc()).unwrap();
        store.toggle_favorite(&eth()).unwrap();

        assert!(store.remove_favorite("btc").unwrap());
        assert!(!store.remove_favorite("btc").unwrap());
        assert_eq!(store.favorites().ids(), vec!["eth"]);
    }

    #[test]
    fn test_file_backed_favorites() {
        let dir = tempfile::tempdir().expect("temp dir");
        let storage = Arc::new(FileStorage::new(dir.path()));
        let mut store = FavoritesStore::open(storage.clone(), "favorites");
        store.toggle_favorite(&btc()).unwrap();

        let reopened = FavoritesStore::open(storage, "favorites");
        assert_eq!(reopened.favorites().get("btc").unwrap().current_price, 65000.12);
    }
}
