//! Pricing abstractions and snapshot collection

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceResult {
    pub price: f64,
    pub currency: String,
}

#[async_trait]
pub trait PriceProvider: Send + Sync {
    /// Last traded price for `symbol`. An `Err` means no price is available.
    async fn fetch_price(&self, symbol: &str) -> Result<PriceResult>;
}

/// Most recent price per symbol. Only positive finite prices are admitted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceSnapshot {
    prices: BTreeMap<String, f64>,
}

impl PriceSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, symbol: impl Into<String>, price: f64) -> Result<()> {
        let symbol = symbol.into();
        if !price.is_finite() || price <= 0.0 {
            return Err(anyhow!("Invalid price {} for symbol: {}", price, symbol));
        }
        self.prices.insert(symbol, price);
        Ok(())
    }

    /// Builds a snapshot, failing on the first invalid price.
    pub fn from_prices<S, I>(items: I) -> Result<Self>
    where
        S: Into<String>,
        I: IntoIterator<Item = (S, f64)>,
    {
        let mut snapshot = Self::new();
        for (symbol, price) in items {
            snapshot.insert(symbol, price)?;
        }
        Ok(snapshot)
    }

    pub fn get(&self, symbol: &str) -> Option<f64> {
        self.prices.get(symbol).copied()
    }

    /// Iterates in symbol order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.prices.iter().map(|(s, p)| (s.as_str(), *p))
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }

    pub fn mean_price(&self) -> Option<f64> {
        if self.prices.is_empty() {
            return None;
        }
        Some(self.prices.values().sum::<f64>() / self.prices.len() as f64)
    }
}

/// A symbol that was requested but could not be priced.
#[derive(Debug, Clone, PartialEq)]
pub struct Unpriced {
    pub symbol: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default)]
pub struct SnapshotReport {
    pub snapshot: PriceSnapshot,
    pub unpriced: Vec<Unpriced>,
}

/// Looks up every symbol concurrently. Failed lookups and invalid prices
/// are dropped from the snapshot and reported in `unpriced`.
pub async fn collect_snapshot<'a, I>(
    provider: &dyn PriceProvider,
    symbols: I,
    on_progress: &(dyn Fn() + Sync),
) -> SnapshotReport
where
    I: IntoIterator<Item = &'a String>,
{
    let lookups = symbols.into_iter().map(|symbol| async move {
        let result = provider.fetch_price(symbol).await;
        on_progress();
        (symbol, result)
    });

    let mut report = SnapshotReport::default();
    for (symbol, result) in join_all(lookups).await {
        let outcome = result.and_then(|quote| report.snapshot.insert(symbol.clone(), quote.price));
        if let Err(e) = outcome {
            debug!(%symbol, error = %e, "Dropping unpriced symbol");
            report.unpriced.push(Unpriced {
                symbol: symbol.clone(),
                reason: e.to_string(),
            });
        }
    }
    report
}

/// Advisory classification of a snapshot's mean price.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceLevel {
    Elevated,
    Moderate,
}

impl PriceLevel {
    pub fn classify(snapshot: &PriceSnapshot, threshold: f64) -> Option<Self> {
        snapshot.mean_price().map(|mean| {
            if mean > threshold {
                PriceLevel::Elevated
            } else {
                PriceLevel::Moderate
            }
        })
    }

    pub fn advice(&self) -> &'static str {
        match self {
            PriceLevel::Elevated => {
                "Market prices are high, consider increasing your investment next cycle."
            }
            PriceLevel::Moderate => "Market prices are moderate, sticking to your base amount.",
        }
    }
}
