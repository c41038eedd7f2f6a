//! Constants for the coin catalog engine
//!
//! These are the compile-time defaults behind [`EngineConfig`](crate::config::EngineConfig).
//! Every value here can be overridden at runtime through `COIN_CATALOG_*`
//! environment variables.

/// CoinGecko API base URL
pub const COINGECKO_API_URL: &str = "https://api.coingecko.com/api/v3";

/// CoinGecko endpoint for paged market listings
pub const COINGECKO_MARKETS_ENDPOINT: &str = "/coins/markets";

/// CoinGecko endpoint prefix for single coin lookups (`/coins/{id}`)
pub const COINGECKO_COINS_ENDPOINT: &str = "/coins";

/// Quote currency for every request
pub const VS_CURRENCY: &str = "usd";

/// HTTP request timeout (in seconds)
pub const REQUEST_TIMEOUT_SECS: u64 = 10;

/// User agent for HTTP requests
pub const USER_AGENT: &str = "coin-catalog-sdk/0.1.0";

/// Entries per listing page
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Highest page the listing will navigate to
pub const DEFAULT_MAX_PAGES: u32 = 5;

/// Size of the flat snapshot the search page indexes
pub const SEARCH_SNAPSHOT_SIZE: u32 = 60;

/// Field score above which an entry is not a match (0 = exact, 1 = anything)
pub const DEFAULT_SEARCH_THRESHOLD: f64 = 0.4;

/// How far from the start of a field a match may drift before it scores as a miss
pub const DEFAULT_MATCH_DISTANCE: usize = 100;

/// Trailing window for the detail chart (in days)
pub const PRICE_HISTORY_DAYS: u32 = 7;

/// Storage slot holding the serialized favorites
pub const FAVORITES_KEY: &str = "favorites";

/// Directory the file-backed favorites storage writes to
pub const DEFAULT_FAVORITES_DIR: &str = ".coin-catalog";

/// Capacity of the catalog event broadcast channel
pub const EVENT_CHANNEL_CAPACITY: usize = 64;
