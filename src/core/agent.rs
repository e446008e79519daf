//! The allocation agent: one cycle is resolve, price, allocate, persist.

use crate::core::allocation::{Allocation, allocate};
use crate::core::config::DEFAULT_PRICE_ALERT_THRESHOLD;
use crate::core::ledger::{
    LedgerStore, PortfolioLedger, StoreKind, StoreWarning, TransactionLog, load_or_empty,
};
use crate::core::price::{PriceLevel, PriceProvider, Unpriced, collect_snapshot};
use crate::core::taxonomy::ResolvedTaxonomy;
use crate::core::universe::{InstrumentUniverse, TopPicks, resolve_universe};
use anyhow::{Context, Result, ensure};
use chrono::NaiveDate;
use std::sync::Arc;
use tracing::{debug, info};

/// Inputs to a single cycle. Nothing else influences the allocation.
#[derive(Debug, Clone)]
pub struct CycleRequest {
    pub budget: f64,
    pub sectors: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoActionReason {
    /// Every selected sector was unknown.
    EmptyUniverse,
    /// No instrument in the universe could be priced.
    NoPrices,
    ZeroBudget,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleStatus {
    Invested,
    NoAction(NoActionReason),
}

#[derive(Debug, Clone)]
pub struct CycleOutcome {
    pub date: NaiveDate,
    pub budget: f64,
    pub universe: InstrumentUniverse,
    pub allocations: Vec<Allocation>,
    pub unpriced: Vec<Unpriced>,
    pub price_level: Option<PriceLevel>,
    pub status: CycleStatus,
    pub warnings: Vec<StoreWarning>,
}

#[derive(Debug, Clone)]
pub struct HoldingValue {
    pub symbol: String,
    pub shares: f64,
    pub price: Option<f64>,
    pub value: Option<f64>,
    pub error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PortfolioSummary {
    pub holdings: Vec<HoldingValue>,
    /// Market value of the holdings that could be priced.
    pub total_value: f64,
    /// Symbol and share count of the largest position by shares.
    pub largest_holding: Option<(String, f64)>,
    pub transactions: usize,
    pub run_days: usize,
    pub total_invested: f64,
    pub last_run: Option<NaiveDate>,
    pub warnings: Vec<StoreWarning>,
}

pub struct Agent {
    taxonomy: ResolvedTaxonomy,
    top_picks: TopPicks,
    price_provider: Arc<dyn PriceProvider>,
    store: Box<dyn LedgerStore>,
    ledger: PortfolioLedger,
    log: TransactionLog,
    warnings: Vec<StoreWarning>,
    price_alert_threshold: f64,
}

impl Agent {
    /// Loads both stores. Unreadable stores start empty and are reported
    /// through [`Agent::warnings`].
    pub fn open(
        taxonomy: ResolvedTaxonomy,
        top_picks: TopPicks,
        price_provider: Arc<dyn PriceProvider>,
        store: Box<dyn LedgerStore>,
    ) -> Self {
        let mut warnings = Vec::new();
        let ledger = load_or_empty(StoreKind::Portfolio, || store.load_portfolio(), &mut warnings);
        let log = load_or_empty(
            StoreKind::Transactions,
            || store.load_transactions(),
            &mut warnings,
        );
        debug!(
            holdings = ledger.len(),
            transactions = log.len(),
            "Loaded agent state"
        );

        Self {
            taxonomy,
            top_picks,
            price_provider,
            store,
            ledger,
            log,
            warnings,
            price_alert_threshold: DEFAULT_PRICE_ALERT_THRESHOLD,
        }
    }

    pub fn with_price_alert_threshold(mut self, threshold: f64) -> Self {
        self.price_alert_threshold = threshold;
        self
    }

    pub fn taxonomy(&self) -> &ResolvedTaxonomy {
        &self.taxonomy
    }

    pub fn ledger(&self) -> &PortfolioLedger {
        &self.ledger
    }

    pub fn log(&self) -> &TransactionLog {
        &self.log
    }

    pub fn warnings(&self) -> &[StoreWarning] {
        &self.warnings
    }

    pub fn resolve_universe(&self, sectors: &[String]) -> InstrumentUniverse {
        resolve_universe(self.taxonomy.taxonomy(), sectors, &self.top_picks)
    }

    /// Runs one cycle stamped with `date`.
    ///
    /// Only an invalid budget or a failed write is an error. An empty
    /// universe or snapshot ends the cycle with `CycleStatus::NoAction`
    /// and leaves both stores untouched.
    pub async fn run_cycle(
        &mut self,
        request: &CycleRequest,
        date: NaiveDate,
        on_progress: &(dyn Fn() + Sync),
    ) -> Result<CycleOutcome> {
        ensure!(
            request.budget.is_finite() && request.budget >= 0.0,
            "Budget must be a non-negative number, got {}",
            request.budget
        );

        let universe = self.resolve_universe(&request.sectors);
        let mut outcome = CycleOutcome {
            date,
            budget: request.budget,
            universe,
            allocations: Vec::new(),
            unpriced: Vec::new(),
            price_level: None,
            status: CycleStatus::Invested,
            warnings: self.warnings.clone(),
        };

        if outcome.universe.is_empty() {
            info!("No instruments matched the selected sectors");
            outcome.status = CycleStatus::NoAction(NoActionReason::EmptyUniverse);
            return Ok(outcome);
        }
        if request.budget == 0.0 {
            info!("Budget is zero, nothing to invest");
            outcome.status = CycleStatus::NoAction(NoActionReason::ZeroBudget);
            return Ok(outcome);
        }

        let report = collect_snapshot(
            self.price_provider.as_ref(),
            &outcome.universe.symbols,
            on_progress,
        )
        .await;
        outcome.unpriced = report.unpriced;
        if report.snapshot.is_empty() {
            info!("No price data fetched for any instrument");
            outcome.status = CycleStatus::NoAction(NoActionReason::NoPrices);
            return Ok(outcome);
        }
        outcome.price_level = PriceLevel::classify(&report.snapshot, self.price_alert_threshold);

        let allocations = allocate(&report.snapshot, request.budget)?;
        self.commit(date, &allocations)?;
        info!(
            instruments = allocations.len(),
            budget = request.budget,
            "Cycle complete"
        );
        outcome.allocations = allocations;
        Ok(outcome)
    }

    /// Writes the log first, then the ledger. In-memory state follows each
    /// successful write, so a failure part way leaves memory matching disk.
    fn commit(&mut self, date: NaiveDate, allocations: &[Allocation]) -> Result<()> {
        let mut log = self.log.clone();
        log.record(date, allocations);
        self.store
            .save_transactions(&log)
            .context("Failed to persist transaction log")?;
        self.log = log;

        let mut ledger = self.ledger.clone();
        ledger.apply(allocations);
        self.store
            .save_portfolio(&ledger)
            .context("Failed to persist portfolio")?;
        self.ledger = ledger;
        Ok(())
    }

    /// Values every holding at current prices and totals the log.
    pub async fn summary(&self, on_progress: &(dyn Fn() + Sync)) -> PortfolioSummary {
        let report =
            collect_snapshot(self.price_provider.as_ref(), self.ledger.symbols(), on_progress)
                .await;

        let mut total_value = 0.0;
        let mut largest_holding: Option<(String, f64)> = None;
        let holdings = self
            .ledger
            .holdings()
            .map(|(symbol, shares)| {
                if largest_holding.as_ref().is_none_or(|(_, top)| shares > *top) {
                    largest_holding = Some((symbol.to_string(), shares));
                }
                let price = report.snapshot.get(symbol);
                let value = price.map(|p| p * shares);
                total_value += value.unwrap_or(0.0);
                let error = report
                    .unpriced
                    .iter()
                    .find(|u| u.symbol == symbol)
                    .map(|u| u.reason.clone());
                HoldingValue {
                    symbol: symbol.to_string(),
                    shares,
                    price,
                    value,
                    error,
                }
            })
            .collect();

        PortfolioSummary {
            holdings,
            total_value,
            largest_holding,
            transactions: self.log.len(),
            run_days: self.log.run_days(),
            total_invested: self.log.total_invested(),
            last_run: self.log.last_run(),
            warnings: self.warnings.clone(),
        }
    }
}
