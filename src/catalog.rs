//! Catalog cache: pages of market entries and single-coin details

use crate::{
    constants::PRICE_HISTORY_DAYS,
    error::CatalogError,
    provider::MarketDataProvider,
    store::SnapshotStore,
    types::{CatalogEvent, CatalogSnapshot, CoinDetail},
};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::broadcast;

/// Fetches snapshots from a market data provider
///
/// Each page fetch is independent and produces a brand-new snapshot. When a
/// TTL is configured, snapshots younger than the TTL are served from memory
/// instead. Failures are never retried here; they go back to the caller.
#[derive(Clone)]
pub struct CatalogCache {
    provider: Arc<dyn MarketDataProvider>,
    store: Option<SnapshotStore>,
    history_days: u32,
    events: Option<broadcast::Sender<CatalogEvent>>,
}

impl CatalogCache {
    /// Creates a cache without snapshot reuse
    pub fn new(provider: Arc<dyn MarketDataProvider>) -> Self {
        Self {
            provider,
            store: None,
            history_days: PRICE_HISTORY_DAYS,
            events: None,
        }
    }

    /// Reuse snapshots younger than `ttl_secs`
    pub fn with_ttl(mut self, ttl_secs: u64) -> Self {
        self.store = Some(SnapshotStore::new(ttl_secs));
        self
    }

    /// Window for the price history returned by [`fetch_one`](Self::fetch_one)
    pub fn with_history_days(mut self, days: u32) -> Self {
        self.history_days = days;
        self
    }

    /// Publish fetch outcomes on this channel
    pub fn with_events(mut self, events: broadcast::Sender<CatalogEvent>) -> Self {
        self.events = Some(events);
        self
    }

    /// Returns the name of the underlying provider
    pub fn provider_name(&self) -> &'static str {
        self.provider.provider_name()
    }

    /// Fetches one page of the listing
    ///
    /// # Arguments
    /// * `page` - 1-based page number
    /// * `page_size` - Maximum entries in the page
    ///
    /// # Returns
    /// A snapshot tagged with `page`. A short or empty snapshot marks the end
    /// of the data; it is not an error.
    pub async fn fetch_page(
        &self,
        page: u32,
        page_size: u32,
    ) -> Result<CatalogSnapshot, CatalogError> {
        if page == 0 || page_size == 0 {
            return Err(CatalogError::fetch_failed(format!(
                "invalid page request: page {page}, size {page_size}"
            )));
        }

        if let Some(store) = &self.store {
            if let Some(snapshot) = store.get_fresh(page, page_size).await {
                tracing::debug!(
                    page,
                    age_secs = snapshot.age().as_secs(),
                    "Serving cached snapshot"
                );
                return Ok(snapshot);
            }
        }

        let start = Instant::now();
        match self.provider.fetch_markets(page, page_size).await {
            Ok(market) => {
                let snapshot = CatalogSnapshot::from_market_page(page, page_size, market);
                tracing::debug!(
                    page,
                    count = snapshot.len(),
                    end_of_data = snapshot.is_end_of_data(),
                    provider = self.provider.provider_name(),
                    latency_ms = start.elapsed().as_millis() as u64,
                    "Fetched catalog page"
                );
                if let Some(store) = &self.store {
                    store.insert(snapshot.clone()).await;
                }
                self.publish(CatalogEvent::snapshot_loaded(&snapshot));
                Ok(snapshot)
            }
            Err(e) => {
                tracing::warn!(page, error = %e, "Failed to fetch catalog page");
                self.publish(CatalogEvent::fetch_failed(format!("page {page}"), e.to_string()));
                Err(CatalogError::fetch_failed(e.to_string()))
            }
        }
    }

    /// Fetches one coin with its extended fields and recent price history
    ///
    /// Both requests are in flight together. If either fails the whole
    /// detail fails; an unknown id is reported as `NotFound`.
    pub async fn fetch_one(&self, id: &str) -> Result<CoinDetail, CatalogError> {
        let id = id.trim();
        if id.is_empty() {
            return Err(CatalogError::not_found(id));
        }

        let (coin, history) = futures::future::join(
            self.provider.fetch_coin(id),
            self.provider.fetch_market_chart(id, self.history_days),
        )
        .await;

        let result = match (coin, history) {
            (Ok(entry), Ok(history)) => Ok(CoinDetail { entry, history }),
            (Err(e), _) | (Ok(_), Err(e)) => Err(CatalogError::from(e)),
        };

        match &result {
            Ok(detail) => tracing::debug!(
                id,
                samples = detail.history.points.len(),
                "Fetched coin detail"
            ),
            Err(e) => {
                tracing::warn!(id, error = %e, "Failed to fetch coin detail");
                self.publish(CatalogEvent::fetch_failed(id, e.to_string()));
            }
        }

        result
    }

    fn publish(&self, event: CatalogEvent) {
        if let Some(events) = &self.events {
            // No subscribers is fine
            let _ = events.send(event);
        }
    }
}
