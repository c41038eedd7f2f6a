//! Runtime configuration for the coin catalog engine
//!
//! Defaults come from [`constants`](crate::constants). Any of them can be
//! overridden through environment variables:
//!
//! | Variable | Field |
//! |---|---|
//! | `COIN_CATALOG_API_URL` | `api_base_url` |
//! | `COIN_CATALOG_TIMEOUT_SECS` | `request_timeout_secs` |
//! | `COIN_CATALOG_PAGE_SIZE` | `page_size` |
//! | `COIN_CATALOG_MAX_PAGES` | `max_pages` |
//! | `COIN_CATALOG_SEARCH_SIZE` | `search_snapshot_size` |
//! | `COIN_CATALOG_SEARCH_THRESHOLD` | `search_threshold` |
//! | `COIN_CATALOG_HISTORY_DAYS` | `history_days` |
//! | `COIN_CATALOG_FAVORITES_DIR` | `favorites_dir` |
//! | `COIN_CATALOG_CACHE_TTL_SECS` | `cache_ttl_secs` |

use crate::constants::{
    COINGECKO_API_URL, DEFAULT_FAVORITES_DIR, DEFAULT_MATCH_DISTANCE, DEFAULT_MAX_PAGES,
    DEFAULT_PAGE_SIZE, DEFAULT_SEARCH_THRESHOLD, FAVORITES_KEY, PRICE_HISTORY_DAYS,
    REQUEST_TIMEOUT_SECS, SEARCH_SNAPSHOT_SIZE,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

/// Engine settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Base URL of the CoinGecko-compatible API
    pub api_base_url: String,
    /// HTTP timeout in seconds
    pub request_timeout_secs: u64,
    /// Entries per listing page
    pub page_size: u32,
    /// Page ceiling for the listing
    pub max_pages: u32,
    /// Entries fetched for the search snapshot
    pub search_snapshot_size: u32,
    /// Fuzzy match threshold in `[0, 1]`
    pub search_threshold: f64,
    /// Proximity distance for fuzzy matching
    pub match_distance: usize,
    /// Detail chart window in days
    pub history_days: u32,
    /// Directory for the file-backed favorites slot
    pub favorites_dir: PathBuf,
    /// Slot name holding the favorites
    pub favorites_key: String,
    /// Reuse page snapshots younger than this many seconds. `None` disables caching.
    pub cache_ttl_secs: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            api_base_url: COINGECKO_API_URL.to_string(),
            request_timeout_secs: REQUEST_TIMEOUT_SECS,
            page_size: DEFAULT_PAGE_SIZE,
            max_pages: DEFAULT_MAX_PAGES,
            search_snapshot_size: SEARCH_SNAPSHOT_SIZE,
            search_threshold: DEFAULT_SEARCH_THRESHOLD,
            match_distance: DEFAULT_MATCH_DISTANCE,
            history_days: PRICE_HISTORY_DAYS,
            favorites_dir: PathBuf::from(DEFAULT_FAVORITES_DIR),
            favorites_key: FAVORITES_KEY.to_string(),
            cache_ttl_secs: None,
        }
    }
}

impl EngineConfig {
    /// Builds a config from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds a config from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup("COIN_CATALOG_API_URL") {
            config.api_base_url = url.trim_end_matches('/').to_string();
        }
        override_parsed(&lookup, "COIN_CATALOG_TIMEOUT_SECS", &mut config.request_timeout_secs);
        override_parsed(&lookup, "COIN_CATALOG_PAGE_SIZE", &mut config.page_size);
        override_parsed(&lookup, "COIN_CATALOG_MAX_PAGES", &mut config.max_pages);
        override_parsed(&lookup, "COIN_CATALOG_SEARCH_SIZE", &mut config.search_snapshot_size);
        override_parsed(&lookup, "COIN_CATALOG_SEARCH_THRESHOLD", &mut config.search_threshold);
        override_parsed(&lookup, "COIN_CATALOG_HISTORY_DAYS", &mut config.history_days);
        if let Some(dir) = lookup("COIN_CATALOG_FAVORITES_DIR") {
            config.favorites_dir = PathBuf::from(dir);
        }
        let mut ttl = 0u64;
        if override_parsed(&lookup, "COIN_CATALOG_CACHE_TTL_SECS", &mut ttl) {
            config.cache_ttl_secs = (ttl > 0).then_some(ttl);
        }

        config.sanitize();
        config
    }

    /// Clamps values that would make the engine misbehave
    fn sanitize(&mut self) {
        if self.page_size == 0 {
            tracing::warn!("page_size of 0 is not usable, falling back to default");
            self.page_size = DEFAULT_PAGE_SIZE;
        }
        if self.max_pages == 0 {
            self.max_pages = 1;
        }
        if !self.search_threshold.is_finite() {
            tracing::warn!(
                threshold = self.search_threshold,
                "search_threshold is not a number, falling back to default"
            );
            self.search_threshold = DEFAULT_SEARCH_THRESHOLD;
        } else if !(0.0..=1.0).contains(&self.search_threshold) {
            tracing::warn!(
                threshold = self.search_threshold,
                "search_threshold outside [0, 1], clamping"
            );
            self.search_threshold = self.search_threshold.clamp(0.0, 1.0);
        }
    }
}

/// Replaces `target` when the variable is set and parses. Returns true on override.
fn override_parsed<F, T>(lookup: &F, name: &str, target: &mut T) -> bool
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    let Some(raw) = lookup(name) else {
        return false;
    };
    match raw.trim().parse::<T>() {
        Ok(value) => {
            *target = value;
            true
        }
        Err(_) => {
            tracing::warn!(variable = name, value = %raw, "Ignoring unparsable config value");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::{SearchIndex, SearchOptions};
    use crate::types::MarketEntry;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults_match_constants() {
        let config = EngineConfig::default();
        assert_eq!(config.page_size, 10);
        assert_eq!(config.max_pages, 5);
        assert_eq!(config.search_snapshot_size, 60);
        assert_eq!(config.history_days, 7);
        assert!(config.cache_ttl_secs.is_none());
    }

    #[test]
    fn test_env_overrides() {
        let config = EngineConfig::from_lookup(lookup_from(&[
            ("COIN_CATALOG_API_URL", "http://localhost:9000/api/"),
            ("COIN_CATALOG_PAGE_SIZE", "25"),
            ("COIN_CATALOG_MAX_PAGES", "8"),
            ("COIN_CATALOG_CACHE_TTL_SECS", "30"),
        ]));
        assert_eq!(config.api_base_url, "http://localhost:9000/api");
        assert_eq!(config.page_size, 25);
        assert_eq!(config.max_pages, 8);
        assert_eq!(config.cache_ttl_secs, Some(30));
    }

    #[test]
    fn test_bad_values_are_ignored_or_clamped() {
        let config = EngineConfig::from_lookup(lookup_from(&[
            ("COIN_CATALOG_PAGE_SIZE", "ten"),
            ("COIN_CATALOG_SEARCH_THRESHOLD", "3.5"),
            ("COIN_CATALOG_CACHE_TTL_SECS", "0"),
        ]));
        assert_eq!(config.page_size, 10);
        assert_eq!(config.search_threshold, 1.0);
        assert!(config.cache_ttl_secs.is_none());
    }

    #[test]
    fn test_non_finite_threshold_falls_back_to_default() {
        for raw in ["NaN", "inf", "-inf"] {
            let config =
                EngineConfig::from_lookup(lookup_from(&[("COIN_CATALOG_SEARCH_THRESHOLD", raw)]));
            assert_eq!(config.search_threshold, DEFAULT_SEARCH_THRESHOLD, "value {raw}");
        }

        let config =
            EngineConfig::from_lookup(lookup_from(&[("COIN_CATALOG_SEARCH_THRESHOLD", "NaN")]));
        let index = SearchIndex::build_with(
            &[MarketEntry::new("bitcoin", "Bitcoin", "btc", 65000.0)],
            SearchOptions::from(&config),
        );
        assert!(index.query("zzzzzz").is_empty());
        assert_eq!(index.query("bitcoin").len(), 1);
    }

    #[test]
    fn test_deserialize_partial_json() {
        let config: EngineConfig = serde_json::from_str(r#"{"max_pages": 3}"#).unwrap();
        assert_eq!(config.max_pages, 3);
        assert_eq!(config.page_size, 10);
    }
}
