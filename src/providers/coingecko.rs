//! CoinGecko market data provider implementation

use crate::{
    config::EngineConfig,
    constants::{
        COINGECKO_API_URL, COINGECKO_COINS_ENDPOINT, COINGECKO_MARKETS_ENDPOINT,
        REQUEST_TIMEOUT_SECS, USER_AGENT, VS_CURRENCY,
    },
    error::ProviderError,
    provider::MarketDataProvider,
    types::{MarketEntry, MarketPage, PriceSeries},
};
use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

/// One row of `/coins/markets`
#[derive(Debug, Deserialize)]
struct MarketRow {
    id: Option<String>,
    name: Option<String>,
    symbol: Option<String>,
    current_price: Option<f64>,
    market_cap: Option<f64>,
    total_volume: Option<f64>,
    market_cap_rank: Option<u32>,
    circulating_supply: Option<f64>,
    total_supply: Option<f64>,
    high_24h: Option<f64>,
    low_24h: Option<f64>,
}

/// Per-currency values such as `{"usd": 65000.0, "eur": 60000.0}`
type CurrencyMap = HashMap<String, Option<f64>>;

/// `/coins/{id}` response
#[derive(Debug, Deserialize)]
struct CoinResponse {
    id: String,
    name: Option<String>,
    symbol: Option<String>,
    description: Option<CoinDescription>,
    market_data: Option<CoinMarketData>,
}

#[derive(Debug, Deserialize)]
struct CoinDescription {
    en: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CoinMarketData {
    current_price: Option<CurrencyMap>,
    market_cap: Option<CurrencyMap>,
    total_volume: Option<CurrencyMap>,
    market_cap_rank: Option<u32>,
    circulating_supply: Option<f64>,
    total_supply: Option<f64>,
    high_24h: Option<CurrencyMap>,
    low_24h: Option<CurrencyMap>,
}

/// `/coins/{id}/market_chart` response
#[derive(Debug, Deserialize)]
struct MarketChartResponse {
    prices: Vec<(f64, f64)>,
}

fn in_usd(map: &Option<CurrencyMap>) -> Option<f64> {
    map.as_ref()
        .and_then(|values| values.get(VS_CURRENCY).copied().flatten())
}

/// Parses a `/coins/markets` body. Rows without an id are skipped but counted.
fn parse_markets(body: &str) -> Result<MarketPage, ProviderError> {
    let rows: Vec<MarketRow> = serde_json::from_str(body).map_err(|e| {
        ProviderError::InvalidResponse(format!("Failed to parse CoinGecko markets: {}", e))
    })?;

    let received = rows.len();
    let entries = rows
        .into_iter()
        .filter_map(|row| {
            let id = row.id.filter(|id| !id.is_empty())?;
            Some(MarketEntry {
                id,
                name: row.name.unwrap_or_default(),
                symbol: row.symbol.unwrap_or_default(),
                current_price: row.current_price.unwrap_or_default(),
                market_cap: row.market_cap,
                total_volume: row.total_volume,
                market_cap_rank: row.market_cap_rank,
                circulating_supply: row.circulating_supply,
                total_supply: row.total_supply,
                high_24h: row.high_24h,
                low_24h: row.low_24h,
                description: None,
            })
        })
        .collect();

    Ok(MarketPage { entries, received })
}

/// Parses a `/coins/{id}` body
fn parse_coin(body: &str) -> Result<MarketEntry, ProviderError> {
    let coin: CoinResponse = serde_json::from_str(body).map_err(|e| {
        ProviderError::InvalidResponse(format!("Failed to parse CoinGecko coin: {}", e))
    })?;

    let market = coin.market_data.ok_or_else(|| {
        ProviderError::InvalidResponse(format!("Coin {} has no market data", coin.id))
    })?;

    Ok(MarketEntry {
        name: coin.name.unwrap_or_default(),
        symbol: coin.symbol.unwrap_or_default(),
        current_price: in_usd(&market.current_price).unwrap_or_default(),
        market_cap: in_usd(&market.market_cap),
        total_volume: in_usd(&market.total_volume),
        market_cap_rank: market.market_cap_rank,
        circulating_supply: market.circulating_supply,
        total_supply: market.total_supply,
        high_24h: in_usd(&market.high_24h),
        low_24h: in_usd(&market.low_24h),
        description: coin.description.and_then(|d| d.en),
        id: coin.id,
    })
}

/// Parses a `/coins/{id}/market_chart` body
fn parse_market_chart(id: &str, days: u32, body: &str) -> Result<PriceSeries, ProviderError> {
    let chart: MarketChartResponse = serde_json::from_str(body).map_err(|e| {
        ProviderError::InvalidResponse(format!("Failed to parse CoinGecko market chart: {}", e))
    })?;

    let pairs: Vec<(i64, f64)> = chart
        .prices
        .into_iter()
        .map(|(millis, price)| (millis as i64, price))
        .collect();

    Ok(PriceSeries::from_millis(id, days, &pairs))
}

/// CoinGecko market data provider
pub struct CoinGeckoProvider {
    client: Client,
    base_url: Url,
}

impl CoinGeckoProvider {
    /// Creates a provider against the public CoinGecko API
    pub fn new() -> Result<Self, ProviderError> {
        Self::with_base_url(COINGECKO_API_URL, Duration::from_secs(REQUEST_TIMEOUT_SECS))
    }

    /// Creates a provider from engine settings
    pub fn from_config(config: &EngineConfig) -> Result<Self, ProviderError> {
        Self::with_base_url(
            &config.api_base_url,
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    /// Creates a provider against any CoinGecko-compatible base URL
    pub fn with_base_url(base_url: &str, timeout: Duration) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(ProviderError::NetworkError)?;

        let parsed = Url::parse(base_url.trim_end_matches('/'))
            .map_err(|e| ProviderError::InvalidConfig(format!("base URL {base_url:?}: {e}")))?;
        if parsed.cannot_be_a_base() {
            return Err(ProviderError::InvalidConfig(format!(
                "base URL {base_url:?} cannot carry a path"
            )));
        }

        Ok(Self {
            client,
            base_url: parsed,
        })
    }

    /// Base URL with `endpoint` and `segments` appended. Each segment is
    /// percent-encoded, so a coin id can never escape its path segment.
    fn endpoint(&self, endpoint: &str, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty()
                .extend(endpoint.split('/').filter(|s| !s.is_empty()))
                .extend(segments);
        }
        url
    }

    fn markets_url(&self, page: u32, per_page: u32) -> Url {
        let mut url = self.endpoint(COINGECKO_MARKETS_ENDPOINT, &[]);
        url.query_pairs_mut()
            .append_pair("vs_currency", VS_CURRENCY)
            .append_pair("order", "market_cap_desc")
            .append_pair("per_page", &per_page.to_string())
            .append_pair("page", &page.to_string())
            .append_pair("sparkline", "false");
        url
    }

    fn coin_url(&self, id: &str) -> Url {
        self.endpoint(COINGECKO_COINS_ENDPOINT, &[id])
    }

    fn market_chart_url(&self, id: &str, days: u32) -> Url {
        let mut url = self.endpoint(COINGECKO_COINS_ENDPOINT, &[id, "market_chart"]);
        url.query_pairs_mut()
            .append_pair("vs_currency", VS_CURRENCY)
            .append_pair("days", &days.to_string());
        url
    }

    /// GETs a URL and returns the body, mapping HTTP failures.
    ///
    /// `coin_id` is reported in `NotFound` when the server answers 404.
    async fn get_body(&self, url: Url, coin_id: Option<&str>) -> Result<String, ProviderError> {
        log::debug!("Fetching from CoinGecko: {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(ProviderError::from_transport)?;

        let status = response.status();

        // Check for rate limiting
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(ProviderError::RateLimitExceeded);
        }

        if status == StatusCode::NOT_FOUND {
            if let Some(id) = coin_id {
                return Err(ProviderError::NotFound(id.to_string()));
            }
        }

        // Check for other errors
        if !status.is_success() {
            return Err(ProviderError::ApiError(format!(
                "HTTP {}: {}",
                status,
                response.text().await.unwrap_or_default()
            )));
        }

        response.text().await.map_err(ProviderError::from_transport)
    }
}

#[async_trait]
impl MarketDataProvider for CoinGeckoProvider {
    async fn fetch_markets(
        &self,
        page: u32,
        per_page: u32,
    ) -> Result<MarketPage, ProviderError> {
        let body = self.get_body(self.markets_url(page, per_page), None).await?;
        let market = parse_markets(&body)?;

        log::debug!(
            "Fetched {} market entries from CoinGecko (page {}, {} rows received)",
            market.entries.len(),
            page,
            market.received
        );

        Ok(market)
    }

    async fn fetch_coin(&self, id: &str) -> Result<MarketEntry, ProviderError> {
        let body = self.get_body(self.coin_url(id), Some(id)).await?;
        parse_coin(&body)
    }

    async fn fetch_market_chart(
        &self,
        id: &str,
        days: u32,
    ) -> Result<PriceSeries, ProviderError> {
        let body = self
            .get_body(self.market_chart_url(id, days), Some(id))
            .await?;
        let series = parse_market_chart(id, days, &body)?;

        log::debug!(
            "Fetched {} price samples for {} from CoinGecko",
            series.points.len(),
            id
        );

        Ok(series)
    }

    fn provider_name(&self) -> &'static str {
        "coingecko"
    }
}
