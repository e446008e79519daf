//! Equal-weight budget split over a price snapshot.

use crate::core::price::PriceSnapshot;
use anyhow::{Result, ensure};
use serde::{Deserialize, Serialize};

/// One instrument's share of a cycle's budget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Allocation {
    pub symbol: String,
    pub price: f64,
    pub amount: f64,
    pub shares: f64,
}

/// Splits `budget` evenly across every priced instrument.
///
/// The denominator is the number of instruments in `snapshot`, not the
/// number originally requested, so the amounts always sum to `budget`.
/// An empty snapshot yields an empty allocation. Values are not rounded.
/// A price so small that the share count overflows rejects the whole split.
pub fn allocate(snapshot: &PriceSnapshot, budget: f64) -> Result<Vec<Allocation>> {
    ensure!(
        budget.is_finite() && budget >= 0.0,
        "Budget must be a non-negative number, got {}",
        budget
    );
    if snapshot.is_empty() {
        return Ok(Vec::new());
    }

    let per_instrument = budget / snapshot.len() as f64;
    snapshot
        .iter()
        .map(|(symbol, price)| {
            let shares = per_instrument / price;
            ensure!(
                shares.is_finite(),
                "Share count for {} at price {} is not representable",
                symbol,
                price
            );
            Ok(Allocation {
                symbol: symbol.to_string(),
                price,
                amount: per_instrument,
                shares,
            })
        })
        .collect()
}

pub fn total_amount(allocations: &[Allocation]) -> f64 {
    allocations.iter().map(|a| a.amount).sum()
}
