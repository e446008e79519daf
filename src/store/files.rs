use crate::core::ledger::{LedgerStore, PortfolioLedger, TransactionLog};
use anyhow::{Context, Result};
use serde::{Serialize, de::DeserializeOwned};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const PORTFOLIO_FILE: &str = "portfolio.json";
pub const HISTORY_FILE: &str = "history.json";

/// Ledger and transaction log kept as two pretty-printed JSON files.
///
/// Each save rewrites the whole file through a temp file and a rename.
pub struct JsonFileStore {
    portfolio_path: PathBuf,
    history_path: PathBuf,
}

impl JsonFileStore {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            portfolio_path: data_dir.join(PORTFOLIO_FILE),
            history_path: data_dir.join(HISTORY_FILE),
        }
    }

    pub fn portfolio_path(&self) -> &Path {
        &self.portfolio_path
    }

    pub fn history_path(&self) -> &Path {
        &self.history_path
    }
}

fn read_json<T: DeserializeOwned + Default>(path: &Path) -> Result<T> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!("No store at {}, starting empty", path.display());
            return Ok(T::default());
        }
        Err(e) => {
            return Err(e).with_context(|| format!("Failed to read {}", path.display()));
        }
    };
    serde_json::from_str(&text).with_context(|| format!("Failed to parse {}", path.display()))
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    let body = serde_json::to_string_pretty(value)?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, body).with_context(|| format!("Failed to write {}", tmp.display()))?;
    fs::rename(&tmp, path).with_context(|| format!("Failed to replace {}", path.display()))?;
    debug!("Saved {}", path.display());
    Ok(())
}

impl LedgerStore for JsonFileStore {
    fn load_portfolio(&self) -> Result<PortfolioLedger> {
        let ledger: PortfolioLedger = read_json(&self.portfolio_path)?;
        ledger
            .validate()
            .with_context(|| format!("Corrupt portfolio in {}", self.portfolio_path.display()))?;
        Ok(ledger)
    }

    fn save_portfolio(&self, ledger: &PortfolioLedger) -> Result<()> {
        ledger
            .validate()
            .with_context(|| format!("Refusing to write {}", self.portfolio_path.display()))?;
        write_json(&self.portfolio_path, ledger)
    }

    fn load_transactions(&self) -> Result<TransactionLog> {
        let log: TransactionLog = read_json(&self.history_path)?;
        log.validate()
            .with_context(|| format!("Corrupt history in {}", self.history_path.display()))?;
        Ok(log)
    }

    fn save_transactions(&self, log: &TransactionLog) -> Result<()> {
        log.validate()
            .with_context(|| format!("Refusing to write {}", self.history_path.display()))?;
        write_json(&self.history_path, log)
    }
}
