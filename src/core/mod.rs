//! Core business logic: universe resolution, allocation and the ledger

pub mod agent;
pub mod allocation;
pub mod cache;
pub mod config;
pub mod ledger;
pub mod log;
pub mod price;
pub mod taxonomy;
pub mod universe;

// Re-export main types for cleaner imports
pub use agent::{Agent, CycleOutcome, CycleRequest, CycleStatus, PortfolioSummary};
pub use allocation::{Allocation, allocate};
pub use ledger::{LedgerStore, PortfolioLedger, StoreWarning, TransactionLog};
pub use price::{PriceProvider, PriceResult, PriceSnapshot};
pub use taxonomy::{ResolvedTaxonomy, SectorTaxonomy, TaxonomySource};
pub use universe::{InstrumentUniverse, TopPicks};
