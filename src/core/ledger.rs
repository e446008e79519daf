//! Cumulative holdings and the append-only transaction log.
//!
//! Both are loaded in full at startup and rewritten in full after each
//! cycle. The log is the only record of invested capital; the ledger is
//! the only record of shares held. The two are never reconciled.

use crate::core::allocation::Allocation;
use anyhow::{Result, bail};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Display;
use tracing::warn;

/// Symbol to cumulative shares. Additive only.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PortfolioLedger {
    holdings: BTreeMap<String, f64>,
}

impl PortfolioLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds every allocation's shares to the running totals.
    pub fn apply(&mut self, allocations: &[Allocation]) {
        for allocation in allocations {
            *self
                .holdings
                .entry(allocation.symbol.clone())
                .or_insert(0.0) += allocation.shares;
        }
    }

    pub fn shares(&self, symbol: &str) -> Option<f64> {
        self.holdings.get(symbol).copied()
    }

    pub fn holdings(&self) -> impl Iterator<Item = (&str, f64)> {
        self.holdings.iter().map(|(s, n)| (s.as_str(), *n))
    }

    pub fn symbols(&self) -> impl Iterator<Item = &String> {
        self.holdings.keys()
    }

    pub fn len(&self) -> usize {
        self.holdings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.holdings.is_empty()
    }

    /// Rejects share counts that no sequence of purchases could produce.
    pub fn validate(&self) -> Result<()> {
        for (symbol, shares) in &self.holdings {
            if !shares.is_finite() || *shares < 0.0 {
                bail!("Invalid share count {} for symbol: {}", shares, symbol);
            }
        }
        Ok(())
    }
}

/// A single fill recorded by a cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionEntry {
    pub date: NaiveDate,
    #[serde(alias = "stock")]
    pub symbol: String,
    pub amount: f64,
    pub price: f64,
    pub shares: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionLog {
    entries: Vec<TransactionEntry>,
}

impl TransactionLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one entry per allocation, all stamped with `date`.
    pub fn record(&mut self, date: NaiveDate, allocations: &[Allocation]) {
        self.entries
            .extend(allocations.iter().map(|a| TransactionEntry {
                date,
                symbol: a.symbol.clone(),
                amount: a.amount,
                price: a.price,
                shares: a.shares,
            }));
    }

    pub fn entries(&self) -> &[TransactionEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total_invested(&self) -> f64 {
        self.entries.iter().map(|e| e.amount).sum()
    }

    pub fn last_run(&self) -> Option<NaiveDate> {
        self.entries.iter().map(|e| e.date).max()
    }

    /// Number of distinct dates on which a cycle recorded fills.
    pub fn run_days(&self) -> usize {
        self.entries
            .iter()
            .map(|e| e.date)
            .collect::<BTreeSet<_>>()
            .len()
    }

    /// Rejects entries no cycle could have recorded.
    pub fn validate(&self) -> Result<()> {
        for entry in &self.entries {
            let valid = entry.amount.is_finite()
                && entry.amount >= 0.0
                && entry.price.is_finite()
                && entry.price > 0.0
                && entry.shares.is_finite()
                && entry.shares > 0.0;
            if !valid {
                bail!(
                    "Invalid entry on {} for symbol: {} (amount {}, price {}, shares {})",
                    entry.date,
                    entry.symbol,
                    entry.amount,
                    entry.price,
                    entry.shares
                );
            }
        }
        Ok(())
    }
}

/// Durable home of the ledger and the log.
///
/// `load_*` returns an empty value when nothing has been stored yet and an
/// error when stored data exists but cannot be read.
pub trait LedgerStore: Send + Sync {
    fn load_portfolio(&self) -> Result<PortfolioLedger>;
    fn save_portfolio(&self, ledger: &PortfolioLedger) -> Result<()>;
    fn load_transactions(&self) -> Result<TransactionLog>;
    fn save_transactions(&self, log: &TransactionLog) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    Portfolio,
    Transactions,
}

impl Display for StoreKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreKind::Portfolio => write!(f, "portfolio"),
            StoreKind::Transactions => write!(f, "transaction log"),
        }
    }
}

/// An unreadable store that was replaced by an empty one.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreWarning {
    pub store: StoreKind,
    pub reason: String,
}

impl Display for StoreWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "The {} store could not be read and was reset to empty: {}",
            self.store, self.reason
        )
    }
}

/// Loads a store, substituting an empty value and a warning on failure.
pub fn load_or_empty<T: Default>(
    kind: StoreKind,
    load: impl FnOnce() -> Result<T>,
    warnings: &mut Vec<StoreWarning>,
) -> T {
    match load() {
        Ok(value) => value,
        Err(e) => {
            let warning = StoreWarning {
                store: kind,
                reason: format!("{e:#}"),
            };
            warn!("{}", warning);
            warnings.push(warning);
            T::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn allocations() -> Vec<Allocation> {
        vec![
            Allocation {
                symbol: "INFY".to_string(),
                price: 2000.0,
                amount: 5000.0,
                shares: 2.5,
            },
            Allocation {
                symbol: "TCS".to_string(),
                price: 4000.0,
                amount: 5000.0,
                shares: 1.25,
            },
        ]
    }

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    #[test]
    fn test_apply_is_additive() {
        let mut ledger = PortfolioLedger::new();
        ledger.apply(&allocations());
        assert_eq!(ledger.shares("TCS"), Some(1.25));
        assert_eq!(ledger.shares("INFY"), Some(2.5));

        let single = ledger.clone();
        ledger.apply(&allocations());
        for (symbol, shares) in single.holdings() {
            assert_eq!(ledger.shares(symbol), Some(shares * 2.0));
        }
        assert_eq!(ledger.shares("TCS"), Some(2.5));
        assert_eq!(ledger.shares("INFY"), Some(5.0));
    }

    #[test]
    fn test_apply_keeps_untouched_holdings() {
        let mut ledger: PortfolioLedger = serde_json::from_str(r#"{"LT.NS": 3.0}"#).unwrap();
        ledger.apply(&allocations());
        assert_eq!(ledger.len(), 3);
        assert_eq!(ledger.shares("LT.NS"), Some(3.0));
    }

    #[test]
    fn test_total_invested_across_cycles() {
        let mut log = TransactionLog::new();
        log.record(date(1), &allocations());
        log.record(date(2), &allocations());

        assert_eq!(log.len(), 4);
        assert_eq!(log.total_invested(), 20000.0);
        assert_eq!(log.last_run(), Some(date(2)));
        assert_eq!(log.run_days(), 2);
        assert_eq!(log.entries()[3].symbol, "TCS");
    }

    #[test]
    fn test_empty_log() {
        let log = TransactionLog::new();
        assert_eq!(log.total_invested(), 0.0);
        assert_eq!(log.last_run(), None);
    }

    #[test]
    fn test_legacy_history_format_loads() {
        let legacy = r#"[
            {"date": "2024-03-01", "stock": "TCS.NS", "amount": 5000.0, "price": 4000.0, "shares": 1.25}
        ]"#;
        let log: TransactionLog = serde_json::from_str(legacy).unwrap();
        assert_eq!(log.entries()[0].symbol, "TCS.NS");
        assert_eq!(log.total_invested(), 5000.0);
    }

    #[test]
    fn test_validate_rejects_negative_shares() {
        let ledger: PortfolioLedger = serde_json::from_str(r#"{"TCS": -1.0}"#).unwrap();
        assert!(ledger.validate().is_err());
        assert!(PortfolioLedger::new().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_impossible_entries() {
        for entry in [
            r#"{"date": "2024-03-01", "symbol": "TCS", "amount": -5000.0, "price": 4000.0, "shares": 1.25}"#,
            r#"{"date": "2024-03-01", "symbol": "TCS", "amount": 5000.0, "price": 0.0, "shares": 1.25}"#,
            r#"{"date": "2024-03-01", "symbol": "TCS", "amount": 5000.0, "price": 4000.0, "shares": -1.25}"#,
        ] {
            let log: TransactionLog = serde_json::from_str(&format!("[{entry}]")).unwrap();
            assert!(log.validate().is_err(), "accepted {entry}");
        }

        let mut log = TransactionLog::new();
        log.record(date(1), &allocations());
        assert!(log.validate().is_ok());
        assert!(TransactionLog::new().validate().is_ok());
    }

    #[test]
    fn test_load_or_empty_records_warning() {
        let mut warnings = Vec::new();
        let log: TransactionLog = load_or_empty(
            StoreKind::Transactions,
            || Err(anyhow::anyhow!("expected value at line 1 column 1")),
            &mut warnings,
        );
        assert!(log.is_empty());
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].store, StoreKind::Transactions);
        assert!(warnings[0].to_string().contains("transaction log"));

        let ledger = load_or_empty(StoreKind::Portfolio, || Ok(PortfolioLedger::new()), &mut warnings);
        assert!(ledger.is_empty());
        assert_eq!(warnings.len(), 1);
    }
}
