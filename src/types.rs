//! Types for the coin catalog engine

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

/// One row of a market listing
///
/// Immutable once fetched; a new fetch produces new entries rather than
/// patching old ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketEntry {
    /// Provider identifier (e.g. "bitcoin")
    pub id: String,

    /// Display name. Empty when the provider omitted it.
    #[serde(default)]
    pub name: String,

    /// Ticker symbol, lowercase as the provider reports it
    #[serde(default)]
    pub symbol: String,

    /// Price in USD
    pub current_price: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub market_cap: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_volume: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub market_cap_rank: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub circulating_supply: Option<f64>,

    /// Absent for coins with no supply cap reported
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_supply: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub high_24h: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub low_24h: Option<f64>,

    /// English description, only present on detail lookups
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl MarketEntry {
    /// Create an entry with only the listing fields set
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        symbol: impl Into<String>,
        current_price: f64,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            symbol: symbol.into(),
            current_price,
            market_cap: None,
            total_volume: None,
            market_cap_rank: None,
            circulating_supply: None,
            total_supply: None,
            high_24h: None,
            low_24h: None,
            description: None,
        }
    }

    /// Symbol as shown to users ("btc" -> "BTC")
    pub fn display_symbol(&self) -> String {
        self.symbol.to_uppercase()
    }

    /// Price with two decimals ("$65000.12")
    pub fn format_price(&self) -> String {
        format!("${:.2}", self.current_price)
    }

    /// Total supply, or "N/A" when the provider has none
    pub fn format_total_supply(&self) -> String {
        match self.total_supply {
            Some(supply) => format!("{supply}"),
            None => "N/A".to_string(),
        }
    }
}

/// A provider's answer to a listing request
///
/// `received` counts the rows the provider sent, including rows that were
/// unusable and left out of `entries`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MarketPage {
    pub entries: Vec<MarketEntry>,
    pub received: usize,
}

impl From<Vec<MarketEntry>> for MarketPage {
    fn from(entries: Vec<MarketEntry>) -> Self {
        Self {
            received: entries.len(),
            entries,
        }
    }
}

/// An ordered page of market entries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogSnapshot {
    /// 1-based page number this snapshot represents
    pub page: u32,

    /// Page size that was requested
    pub page_size: u32,

    /// Entries in market cap order, unique by id
    pub entries: Vec<MarketEntry>,

    /// Rows the provider returned before cleanup
    #[serde(default)]
    pub received: usize,

    /// When the provider answered
    pub fetched_at: DateTime<Utc>,
}

impl CatalogSnapshot {
    /// Create a snapshot, dropping repeated ids (first occurrence wins)
    pub fn new(page: u32, page_size: u32, entries: Vec<MarketEntry>) -> Self {
        Self::from_market_page(page, page_size, MarketPage::from(entries))
    }

    /// Create a snapshot from a provider answer, keeping its raw row count
    pub fn from_market_page(page: u32, page_size: u32, market: MarketPage) -> Self {
        let MarketPage { entries, received } = market;
        let mut seen = HashSet::with_capacity(entries.len());
        let total = entries.len();
        let entries: Vec<MarketEntry> = entries
            .into_iter()
            .filter(|entry| seen.insert(entry.id.clone()))
            .collect();

        if entries.len() != total {
            tracing::warn!(
                page,
                dropped = total - entries.len(),
                "Dropped duplicate ids from snapshot"
            );
        }

        Self {
            page,
            page_size,
            entries,
            received: received.max(total),
            fetched_at: Utc::now(),
        }
    }

    /// A page shorter than requested means there is nothing after it
    ///
    /// Judged on what the provider sent, so rows dropped during cleanup do
    /// not end the listing early.
    pub fn is_end_of_data(&self) -> bool {
        self.received < self.page_size as usize
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Check if the snapshot is older than threshold seconds
    pub fn is_stale(&self, threshold_seconds: u64) -> bool {
        let age = Utc::now().signed_duration_since(self.fetched_at);
        age.num_seconds() >= threshold_seconds as i64
    }

    /// Get the age of the snapshot
    pub fn age(&self) -> std::time::Duration {
        let duration = Utc::now().signed_duration_since(self.fetched_at);
        std::time::Duration::from_secs(duration.num_seconds().max(0) as u64)
    }
}

/// One sample of a price history
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub timestamp: DateTime<Utc>,
    pub price: f64,
}

/// Trailing price history for one coin
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSeries {
    pub coin_id: String,
    pub days: u32,
    pub points: Vec<PricePoint>,
}

impl PriceSeries {
    /// Build a series from `[timestamp_millis, price]` pairs.
    ///
    /// Samples with an unrepresentable timestamp are skipped.
    pub fn from_millis(coin_id: impl Into<String>, days: u32, pairs: &[(i64, f64)]) -> Self {
        let points = pairs
            .iter()
            .filter_map(|&(millis, price)| {
                DateTime::<Utc>::from_timestamp_millis(millis)
                    .map(|timestamp| PricePoint { timestamp, price })
            })
            .collect();

        Self {
            coin_id: coin_id.into(),
            days,
            points,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Chart-ready labels and values, `None` when there is nothing to draw
    pub fn chart(&self) -> Option<ChartSeries> {
        if self.points.is_empty() {
            return None;
        }

        Some(ChartSeries {
            label: "Price (USD)".to_string(),
            labels: self
                .points
                .iter()
                .map(|p| p.timestamp.format("%m/%d").to_string())
                .collect(),
            values: self.points.iter().map(|p| p.price).collect(),
        })
    }
}

/// Parallel label/value arrays for a line chart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSeries {
    pub label: String,
    pub labels: Vec<String>,
    pub values: Vec<f64>,
}

/// Everything the detail page shows for one coin
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoinDetail {
    /// Entry with the extended fields and description filled in
    pub entry: MarketEntry,
    /// Recent price history
    pub history: PriceSeries,
}

/// The part of a [`MarketEntry`] kept in the favorites slot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FavoriteEntry {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub symbol: String,
    /// Price when the entry was favorited
    #[serde(default)]
    pub current_price: f64,
}

impl From<&MarketEntry> for FavoriteEntry {
    fn from(entry: &MarketEntry) -> Self {
        Self {
            id: entry.id.clone(),
            name: entry.name.clone(),
            symbol: entry.symbol.clone(),
            current_price: entry.current_price,
        }
    }
}

impl From<MarketEntry> for FavoriteEntry {
    fn from(entry: MarketEntry) -> Self {
        Self {
            id: entry.id,
            name: entry.name,
            symbol: entry.symbol,
            current_price: entry.current_price,
        }
    }
}

/// Events published by the engine
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CatalogEvent {
    /// A listing or search snapshot arrived
    SnapshotLoaded {
        id: Uuid,
        page: u32,
        entries: usize,
        end_of_data: bool,
        timestamp: DateTime<Utc>,
    },

    /// A fetch failed
    FetchFailed {
        id: Uuid,
        target: String,
        error_message: String,
        timestamp: DateTime<Utc>,
    },

    /// Favorites were written by some page. Other pages' copies are stale.
    FavoritesChanged {
        id: Uuid,
        coin_id: String,
        is_favorite: bool,
        persisted: bool,
        timestamp: DateTime<Utc>,
    },
}

impl CatalogEvent {
    pub fn snapshot_loaded(snapshot: &CatalogSnapshot) -> Self {
        Self::SnapshotLoaded {
            id: Uuid::new_v4(),
            page: snapshot.page,
            entries: snapshot.len(),
            end_of_data: snapshot.is_end_of_data(),
            timestamp: Utc::now(),
        }
    }

    pub fn fetch_failed(target: impl Into<String>, error_message: impl Into<String>) -> Self {
        Self::FetchFailed {
            id: Uuid::new_v4(),
            target: target.into(),
            error_message: error_message.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn favorites_changed(coin_id: &str, is_favorite: bool, persisted: bool) -> Self {
        Self::FavoritesChanged {
            id: Uuid::new_v4(),
            coin_id: coin_id.to_string(),
            is_favorite,
            persisted,
            timestamp: Utc::now(),
        }
    }

    /// Get the event ID
    pub fn id(&self) -> Uuid {
        match self {
            CatalogEvent::SnapshotLoaded { id, .. } => *id,
            CatalogEvent::FetchFailed { id, .. } => *id,
            CatalogEvent::FavoritesChanged { id, .. } => *id,
        }
    }

    /// Get the event type as string
    pub fn event_type(&self) -> &'static str {
        match self {
            CatalogEvent::SnapshotLoaded { .. } => "SNAPSHOT_LOADED",
            CatalogEvent::FetchFailed { .. } => "FETCH_FAILED",
            CatalogEvent::FavoritesChanged { .. } => "FAVORITES_CHANGED",
        }
    }
}

impl std::fmt::Display for CatalogEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CatalogEvent::SnapshotLoaded { page, entries, .. } => {
                write!(f, "Snapshot loaded: page {} ({} entries)", page, entries)
            }
            CatalogEvent::FetchFailed {
                target,
                error_message,
                ..
            } => {
                write!(f, "Fetch failed for {}: {}", target, error_message)
            }
            CatalogEvent::FavoritesChanged {
                coin_id,
                is_favorite,
                persisted,
                ..
            } => {
                let action = if *is_favorite { "added" } else { "removed" };
                let suffix = if *persisted { "" } else { " (session only)" };
                write!(f, "Favorite {} {}{}", coin_id, action, suffix)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_drops_duplicate_ids() {
        let snapshot = CatalogSnapshot::new(
            1,
            10,
            vec![
                MarketEntry::new("bitcoin", "Bitcoin", "btc", 1.0),
                MarketEntry::new("ethereum", "Ethereum", "eth", 2.0),
                MarketEntry::new("bitcoin", "Bitcoin (dup)", "btc", 3.0),
            ],
        );
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.entries[0].name, "Bitcoin");
        assert_eq!(snapshot.received, 3);
        assert!(snapshot.is_end_of_data());
    }

    #[test]
    fn test_dropped_rows_do_not_end_a_full_page() {
        let mut entries: Vec<MarketEntry> = (0..9)
            .map(|i| MarketEntry::new(format!("c{i}"), format!("Coin {i}"), "c", 1.0))
            .collect();
        entries.push(MarketEntry::new("c0", "Coin 0 again", "c", 1.0));

        let snapshot = CatalogSnapshot::new(1, 10, entries);
        assert_eq!(snapshot.len(), 9);
        assert!(!snapshot.is_end_of_data());

        let market = MarketPage {
            entries: vec![MarketEntry::new("bitcoin", "Bitcoin", "btc", 1.0)],
            received: 2,
        };
        let snapshot = CatalogSnapshot::from_market_page(1, 2, market);
        assert_eq!(snapshot.len(), 1);
        assert!(!snapshot.is_end_of_data());
    }

    #[test]
    fn test_full_page_is_not_end_of_data() {
        let entries = (0..3)
            .map(|i| MarketEntry::new(format!("c{i}"), format!("Coin {i}"), "c", 1.0))
            .collect();
        let snapshot = CatalogSnapshot::new(2, 3, entries);
        assert!(!snapshot.is_end_of_data());
        assert!(!snapshot.is_stale(60));
    }

    #[test]
    fn test_chart_labels() {
        // 2024-03-01T12:00:00Z and 2024-03-02T12:00:00Z
        let series = PriceSeries::from_millis(
            "bitcoin",
            7,
            &[(1_709_294_400_000, 61000.5), (1_709_380_800_000, 62000.25)],
        );
        let chart = series.chart().unwrap();
        assert_eq!(chart.label, "Price (USD)");
        assert_eq!(chart.labels, vec!["03/01", "03/02"]);
        assert_eq!(chart.values, vec![61000.5, 62000.25]);
    }

    #[test]
    fn test_empty_series_has_no_chart() {
        let series = PriceSeries::from_millis("bitcoin", 7, &[]);
        assert!(series.chart().is_none());
    }

    #[test]
    fn test_display_helpers() {
        let mut entry = MarketEntry::new("btc", "Bitcoin", "btc", 65000.123);
        assert_eq!(entry.display_symbol(), "BTC");
        assert_eq!(entry.format_price(), "$65000.12");
        assert_eq!(entry.format_total_supply(), "N/A");
        entry.total_supply = Some(21000000.0);
        assert_eq!(entry.format_total_supply(), "21000000");
    }

    #[test]
    fn test_event_display() {
        let event = CatalogEvent::favorites_changed("bitcoin", true, false);
        assert_eq!(event.event_type(), "FAVORITES_CHANGED");
        assert_eq!(event.to_string(), "Favorite bitcoin added (session only)");
    }
}
