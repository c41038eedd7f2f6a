//! Provider abstraction for fetching market data from external APIs

use crate::{
    error::ProviderError,
    types::{MarketEntry, MarketPage, PriceSeries},
};
use async_trait::async_trait;

/// Trait for market data providers
///
/// Implementations talk to a CoinGecko-shaped API. Each method is one
/// network request; callers decide how to combine them.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Fetches one page of the market listing, ordered by market cap descending
    ///
    /// # Arguments
    /// * `page` - 1-based page number
    /// * `per_page` - Maximum number of entries to return
    ///
    /// # Returns
    /// Up to `per_page` entries. Fewer (or none) past the end of the listing.
    /// `received` reports every row the API sent, usable or not.
    async fn fetch_markets(&self, page: u32, per_page: u32)
        -> Result<MarketPage, ProviderError>;

    /// Fetches a single coin with its extended fields and description
    ///
    /// Returns `ProviderError::NotFound` when the id is unknown.
    async fn fetch_coin(&self, id: &str) -> Result<MarketEntry, ProviderError>;

    /// Fetches the trailing price history for a coin
    async fn fetch_market_chart(&self, id: &str, days: u32)
        -> Result<PriceSeries, ProviderError>;

    /// Returns the name of this provider
    fn provider_name(&self) -> &'static str;
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    /// Mock provider for testing
    #[derive(Clone, Default)]
    pub struct MockProvider {
        pages: Arc<Mutex<HashMap<u32, Vec<MarketEntry>>>>,
        failing_pages: Arc<Mutex<HashMap<u32, String>>>,
        delays: Arc<Mutex<HashMap<u32, Duration>>>,
        coins: Arc<Mutex<HashMap<String, MarketEntry>>>,
        charts: Arc<Mutex<HashMap<String, Vec<(i64, f64)>>>>,
        failing_charts: Arc<Mutex<Vec<String>>>,
        call_count: Arc<Mutex<usize>>,
    }

    impl MockProvider {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn set_page(&self, page: u32, entries: Vec<MarketEntry>) {
            self.pages.lock().unwrap().insert(page, entries);
        }

        pub fn set_page_error(&self, page: u32, message: &str) {
            self.failing_pages
                .lock()
                .unwrap()
                .insert(page, message.to_string());
        }

        pub fn clear_page_error(&self, page: u32) {
            self.failing_pages.lock().unwrap().remove(&page);
        }

        pub fn set_delay(&self, page: u32, delay: Duration) {
            self.delays.lock().unwrap().insert(page, delay);
        }

        pub fn set_coin(&self, entry: MarketEntry) {
            self.coins.lock().unwrap().insert(entry.id.clone(), entry);
        }

        pub fn set_chart(&self, id: &str, pairs: Vec<(i64, f64)>) {
            self.charts.lock().unwrap().insert(id.to_string(), pairs);
        }

        pub fn fail_chart(&self, id: &str) {
            self.failing_charts.lock().unwrap().push(id.to_string());
        }

        pub fn call_count(&self) -> usize {
            *self.call_count.lock().unwrap()
        }
    }

    #[async_trait]
    impl MarketDataProvider for MockProvider {
        async fn fetch_markets(
            &self,
            page: u32,
            per_page: u32,
        ) -> Result<MarketPage, ProviderError> {
            *self.call_count.lock().unwrap() += 1;

            let delay = self.delays.lock().unwrap().get(&page).copied();
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }

            if let Some(message) = self.failing_pages.lock().unwrap().get(&page) {
                return Err(ProviderError::ApiError(message.clone()));
            }

            let pages = self.pages.lock().unwrap();
            let entries: Vec<MarketEntry> = pages
                .get(&page)
                .map(|entries| entries.iter().take(per_page as usize).cloned().collect())
                .unwrap_or_default();
            Ok(MarketPage::from(entries))
        }

        async fn fetch_coin(&self, id: &str) -> Result<MarketEntry, ProviderError> {
            *self.call_count.lock().unwrap() += 1;
            self.coins
                .lock()
                .unwrap()
                .get(id)
                .cloned()
                .ok_or_else(|| ProviderError::NotFound(id.to_string()))
        }

        async fn fetch_market_chart(
            &self,
            id: &str,
            days: u32,
        ) -> Result<PriceSeries, ProviderError> {
            *self.call_count.lock().unwrap() += 1;
            if self.failing_charts.lock().unwrap().iter().any(|c| c == id) {
                return Err(ProviderError::Timeout);
            }
            let charts = self.charts.lock().unwrap();
            match charts.get(id) {
                Some(pairs) => Ok(PriceSeries::from_millis(id, days, pairs)),
                None => Err(ProviderError::NotFound(id.to_string())),
            }
        }

        fn provider_name(&self) -> &'static str {
            "mock"
        }
    }
}
