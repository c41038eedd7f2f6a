//! Coin catalog engine
//!
//! Wires a market data provider, the favorites medium and the event channel
//! together, and hands out per-page sessions.

use crate::{
    catalog::CatalogCache,
    config::EngineConfig,
    constants::EVENT_CHANNEL_CAPACITY,
    error::ProviderError,
    favorites::FavoritesStore,
    provider::MarketDataProvider,
    providers::CoinGeckoProvider,
    search::SearchOptions,
    session::{DetailPage, ListingPage, SearchPage},
    storage::{FavoritesStorage, FileStorage},
    types::CatalogEvent,
};
use std::sync::Arc;
use tokio::sync::broadcast;

/// Coin catalog engine
///
/// Owns nothing page-specific: every page asks for its own session, and
/// sessions never share request state with each other.
///
/// # Example
/// ```no_run
/// use coin_catalog_sdk::{CoinCatalog, Resolution};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let catalog = CoinCatalog::from_env()?;
/// let listing = catalog.listing_page();
/// if let Ok(Resolution::Applied(Ok(snapshot))) = listing.list_page(1).await {
///     for entry in &snapshot.entries {
///         println!("{} {}", entry.display_symbol(), entry.format_price());
///     }
/// }
/// # Ok(())
/// # }
/// ```
pub struct CoinCatalog {
    config: EngineConfig,
    catalog: CatalogCache,
    storage: Arc<dyn FavoritesStorage>,
    events: broadcast::Sender<CatalogEvent>,
}

impl CoinCatalog {
    /// Creates an engine from `COIN_CATALOG_*` environment variables
    ///
    /// Uses the CoinGecko API and stores favorites under the configured directory.
    pub fn from_env() -> Result<Self, ProviderError> {
        Self::new(EngineConfig::from_env())
    }

    /// Creates an engine against CoinGecko with file-backed favorites
    pub fn new(config: EngineConfig) -> Result<Self, ProviderError> {
        let provider = Arc::new(CoinGeckoProvider::from_config(&config)?);
        let storage = Arc::new(FileStorage::new(config.favorites_dir.clone()));
        Ok(Self::with_parts(config, provider, storage))
    }

    /// Creates an engine with a custom provider and favorites medium
    ///
    /// This is primarily for testing with mock providers.
    pub fn with_parts(
        config: EngineConfig,
        provider: Arc<dyn MarketDataProvider>,
        storage: Arc<dyn FavoritesStorage>,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        let mut catalog = CatalogCache::new(provider)
            .with_history_days(config.history_days)
            .with_events(events.clone());
        if let Some(ttl) = config.cache_ttl_secs {
            catalog = catalog.with_ttl(ttl);
        }

        tracing::info!(
            provider = catalog.provider_name(),
            storage = storage.storage_name(),
            page_size = config.page_size,
            max_pages = config.max_pages,
            cache_ttl_secs = ?config.cache_ttl_secs,
            "Coin catalog ready"
        );

        Self {
            config,
            catalog,
            storage,
            events,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Returns the name of the current provider
    pub fn provider_name(&self) -> &'static str {
        self.catalog.provider_name()
    }

    /// Direct access to the catalog cache, bypassing page sessions
    pub fn catalog(&self) -> &CatalogCache {
        &self.catalog
    }

    /// Subscribes to snapshot, failure and favorites events
    pub fn subscribe(&self) -> broadcast::Receiver<CatalogEvent> {
        self.events.subscribe()
    }

    /// A fresh listing session, starting idle on page 1
    pub fn listing_page(&self) -> ListingPage {
        ListingPage::new(
            self.catalog.clone(),
            self.config.page_size,
            self.config.max_pages,
        )
    }

    /// A fresh search session. Call [`SearchPage::load`] before searching.
    pub fn search_page(&self) -> SearchPage {
        SearchPage::new(
            self.catalog.clone(),
            self.config.search_snapshot_size,
            SearchOptions::from(&self.config),
        )
    }

    pub fn detail_page(&self) -> DetailPage {
        DetailPage::new(self.catalog.clone())
    }

    /// Loads the favorites slot for a page
    ///
    /// Each call reads the medium again; stores handed out earlier keep
    /// their own copy.
    pub fn favorites(&self) -> FavoritesStore {
        FavoritesStore::open(self.storage.clone(), self.config.favorites_key.clone())
            .with_events(self.events.clone())
    }
}
