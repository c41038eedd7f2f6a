//! # Coin Catalog SDK
//!
//! Client-side engine for browsing a cryptocurrency market catalog served by
//! CoinGecko: paged listings, fuzzy search over a snapshot of the top coins,
//! single-coin details with price history, and a persisted favorites list.
//!
//! Every view gets its own session. A session applies only the outcome of
//! the request issued last, so a slow earlier page never overwrites a later
//! one, and nothing is applied after the session is closed.
//!
//! ## Usage
//!
//! ```no_run
//! use coin_catalog_sdk::{CoinCatalog, Resolution};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let catalog = CoinCatalog::from_env()?;
//!
//! // Paged listing
//! let listing = catalog.listing_page();
//! if let Ok(Resolution::Applied(Ok(snapshot))) = listing.list_page(1).await {
//!     for entry in &snapshot.entries {
//!         println!("{}: {}", entry.display_symbol(), entry.format_price());
//!     }
//! }
//!
//! // Fuzzy search
//! let search = catalog.search_page();
//! search.load().await;
//! for entry in search.search("bitcon").await {
//!     println!("{}", entry.name);
//! }
//!
//! // Favorites
//! let mut favorites = catalog.favorites();
//! if let Some(first) = search.search("bitcoin").await.first() {
//!     favorites.toggle_favorite(first)?;
//! }
//! # Ok(())
//! # }
//! ```

pub mod catalog;
pub mod config;
pub mod constants;
pub mod engine;
pub mod error;
pub mod favorites;
pub mod pager;
pub mod provider;
pub mod providers;
pub mod search;
pub mod session;
pub mod storage;
pub mod store;
pub mod types;

// Re-export commonly used types
pub use catalog::CatalogCache;
pub use config::EngineConfig;
pub use engine::CoinCatalog;
pub use error::{CatalogError, ProviderError, StorageError};
pub use favorites::{FavoritesSet, FavoritesStore};
pub use pager::{Boundary, RequestState, Resolution};
pub use provider::MarketDataProvider;
pub use search::{SearchIndex, SearchOptions};
pub use session::{DetailPage, ListingPage, SearchPage};
pub use storage::{FavoritesStorage, FileStorage, MemoryStorage};
pub use types::{
    CatalogEvent, CatalogSnapshot, ChartSeries, CoinDetail, FavoriteEntry, MarketEntry,
    MarketPage, PricePoint, PriceSeries,
};
