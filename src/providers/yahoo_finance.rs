use super::util::{http_client, with_retry};
use crate::core::cache::KeyValueCollection;
use crate::core::price::{PriceProvider, PriceResult};
use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

const PRICE_TTL: Duration = Duration::from_secs(5 * 60);

/// Last-traded prices from the Yahoo Finance chart API.
pub struct YahooFinanceProvider {
    base_url: String,
    cache: Arc<dyn KeyValueCollection>,
}

impl YahooFinanceProvider {
    pub fn new(base_url: &str, cache: Arc<dyn KeyValueCollection>) -> Self {
        YahooFinanceProvider {
            base_url: base_url.trim_end_matches('/').to_string(),
            cache,
        }
    }
}

#[derive(Deserialize, Debug)]
struct YahooPriceResponse {
    chart: PriceChartResult,
}

#[derive(Deserialize, Debug)]
struct PriceChartResult {
    result: Option<Vec<PriceChartItem>>,
}

#[derive(Deserialize, Debug)]
struct Indicators {
    quote: Vec<Quote>,
}

#[derive(Deserialize, Debug)]
struct Quote {
    close: Option<Vec<Option<f64>>>,
}

#[derive(Deserialize, Debug)]
struct PriceChartItem {
    meta: PriceChartMeta,
    indicators: Option<Indicators>,
}

#[derive(Deserialize, Debug)]
struct PriceChartMeta {
    #[serde(alias = "regularMarketPrice")]
    regular_market_price: Option<f64>,
    currency: Option<String>,
}

fn is_valid_price(price: f64) -> bool {
    price.is_finite() && price > 0.0
}

/// Most recent valid daily close, falling back to the regular market price.
fn last_price(item: &PriceChartItem) -> Option<f64> {
    item.indicators
        .as_ref()
        .and_then(|inds| inds.quote.first())
        .and_then(|q| q.close.as_ref())
        .and_then(|closes| closes.iter().rev().flatten().copied().find(|p| is_valid_price(*p)))
        .or(item.meta.regular_market_price.filter(|p| is_valid_price(*p)))
}

#[async_trait]
impl PriceProvider for YahooFinanceProvider {
    #[instrument(
        name = "YahooPriceFetch",
        skip(self),
        fields(symbol = %symbol)
    )]
    async fn fetch_price(&self, symbol: &str) -> Result<PriceResult> {
        if let Some(cached) = self.cache.get(symbol.as_bytes()).await {
            return Ok(serde_json::from_slice(&cached)?);
        }

        let url = format!(
            "{}/v8/finance/chart/{}?interval=1d&range=5d",
            self.base_url, symbol
        );
        debug!("Requesting price data from {}", url);

        let client = http_client()?;
        let response = with_retry(|| client.get(&url).send(), 2, 500)
            .await
            .with_context(|| format!("Request error for symbol: {symbol}"))?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "HTTP error: {} for symbol: {}",
                response.status(),
                symbol
            ));
        }

        let text = response.text().await?;
        let data: YahooPriceResponse = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse JSON response for {symbol}"))?;

        let item = data
            .chart
            .result
            .as_ref()
            .and_then(|items| items.first())
            .ok_or_else(|| anyhow!("No price data found for symbol: {}", symbol))?;
        let price =
            last_price(item).ok_or_else(|| anyhow!("No price data found for symbol: {}", symbol))?;

        let result = PriceResult {
            price,
            currency: item.meta.currency.clone().unwrap_or_default(),
        };
        debug!(price, "Fetched price");

        self.cache
            .put(symbol.as_bytes(), &serde_json::to_vec(&result)?, Some(PRICE_TTL))
            .await;

        Ok(result)
    }
}
