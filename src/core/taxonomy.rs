//! Sector taxonomy discovery with a bundled fallback table.
//!
//! A remote CSV (e.g. an index constituent list) is parsed into a map from
//! lower-cased sector name to symbols. Column headers vary between sources,
//! so the symbol and sector columns are chosen by the fixed priority lists
//! below rather than by exact name.

use anyhow::{Result, anyhow, bail};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, info, warn};

/// Candidate headers for the symbol column, most preferred first.
pub const SYMBOL_COLUMNS: &[&str] = &[
    "symbol",
    "ticker",
    "nse symbol",
    "trading symbol",
    "tradingsymbol",
    "scrip",
    "code",
];

/// Candidate headers for the sector column, most preferred first.
pub const SECTOR_COLUMNS: &[&str] = &[
    "industry",
    "sector",
    "basic industry",
    "macro economic sector",
    "industry group",
    "gics sector",
];

pub const FALLBACK_VERSION: &str = "2024.1";

/// Hand-curated taxonomy used whenever discovery fails.
pub const FALLBACK_SECTORS: &[(&str, &[&str])] = &[
    (
        "banking",
        &["HDFCBANK.NS", "ICICIBANK.NS", "SBIN.NS", "AXISBANK.NS"],
    ),
    (
        "metals",
        &["TATASTEEL.NS", "HINDALCO.NS", "VEDL.NS", "JSWSTEEL.NS"],
    ),
    (
        "automobiles",
        &["MARUTI.NS", "TATAMOTORS.NS", "M&M.NS", "EICHERMOT.NS"],
    ),
    ("technology", &["INFY.NS", "TCS.NS", "WIPRO.NS", "HCLTECH.NS"]),
    (
        "pharma",
        &["SUNPHARMA.NS", "CIPLA.NS", "DRREDDY.NS", "DIVISLAB.NS"],
    ),
    ("industrials", &["LT.NS", "BEL.NS", "ABB.NS", "SIEMENS.NS"]),
    (
        "consumer discretionary",
        &["DMART.NS", "TRENT.NS", "PAGEIND.NS", "JUBLFOOD.NS"],
    ),
];

/// Returns true for symbols made of ASCII alphanumerics and `&-._^=`.
pub fn is_well_formed_symbol(symbol: &str) -> bool {
    !symbol.is_empty()
        && symbol
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '&' | '-' | '.' | '_' | '^' | '='))
}

pub fn normalize_sector(name: &str) -> String {
    name.trim().to_lowercase()
}

fn normalize_header(header: &str) -> String {
    header
        .trim()
        .to_lowercase()
        .replace(['_', '-'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Finds the column for the first candidate that matches a header exactly,
/// then, failing that, the first candidate contained as a whole word.
fn pick_column(headers: &[String], candidates: &[&str]) -> Option<usize> {
    candidates
        .iter()
        .find_map(|c| headers.iter().position(|h| h == c))
        .or_else(|| {
            candidates.iter().find_map(|c| {
                headers.iter().position(|h| {
                    let padded = format!(" {h} ");
                    padded.contains(&format!(" {c} "))
                })
            })
        })
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SectorTaxonomy {
    sectors: BTreeMap<String, Vec<String>>,
}

impl SectorTaxonomy {
    /// Builds a taxonomy from `(sector, symbol)` pairs, dropping blank
    /// sectors and malformed symbols.
    pub fn from_pairs<I, S, T>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, T)>,
        S: AsRef<str>,
        T: AsRef<str>,
    {
        let mut sectors: BTreeMap<String, Vec<String>> = BTreeMap::new();
        let mut seen: HashSet<(String, String)> = HashSet::new();
        for (sector, symbol) in pairs {
            let sector = normalize_sector(sector.as_ref());
            let symbol = symbol.as_ref().trim();
            if sector.is_empty() || !is_well_formed_symbol(symbol) {
                continue;
            }
            if seen.insert((sector.clone(), symbol.to_string())) {
                sectors.entry(sector).or_default().push(symbol.to_string());
            }
        }
        Self { sectors }
    }

    pub fn fallback() -> Self {
        Self::from_pairs(
            FALLBACK_SECTORS
                .iter()
                .flat_map(|(sector, symbols)| symbols.iter().map(move |s| (*sector, *s))),
        )
    }

    /// Parses a CSV table. `symbol_suffix` (e.g. `.NS`) is appended to symbols
    /// that do not already carry it.
    pub fn from_csv(text: &str, symbol_suffix: Option<&str>) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(text.as_bytes());

        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| anyhow!("Failed to read taxonomy header: {}", e))?
            .iter()
            .map(normalize_header)
            .collect();
        debug!(?headers, "Taxonomy table headers");

        let symbol_idx = pick_column(&headers, SYMBOL_COLUMNS)
            .ok_or_else(|| anyhow!("No symbol column in taxonomy table"))?;
        let sector_idx = pick_column(&headers, SECTOR_COLUMNS)
            .ok_or_else(|| anyhow!("No sector column in taxonomy table"))?;
        if symbol_idx == sector_idx {
            bail!("Symbol and sector resolve to the same taxonomy column");
        }

        let mut pairs = Vec::new();
        for record in reader.records() {
            let record = match record {
                Ok(record) => record,
                Err(e) => {
                    debug!("Skipping unreadable taxonomy row: {}", e);
                    continue;
                }
            };
            let (Some(symbol), Some(sector)) = (record.get(symbol_idx), record.get(sector_idx))
            else {
                continue;
            };
            let symbol = match symbol_suffix {
                Some(suffix) if !symbol.is_empty() && !symbol.ends_with(suffix) => {
                    format!("{symbol}{suffix}")
                }
                _ => symbol.to_string(),
            };
            pairs.push((sector.to_string(), symbol));
        }

        let taxonomy = Self::from_pairs(pairs);
        if taxonomy.is_empty() {
            bail!("Taxonomy table has no usable rows");
        }
        Ok(taxonomy)
    }

    /// Case-insensitive, whitespace-tolerant lookup.
    pub fn symbols(&self, sector: &str) -> Option<&[String]> {
        self.sectors.get(&normalize_sector(sector)).map(Vec::as_slice)
    }

    pub fn sectors(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.sectors
            .iter()
            .map(|(name, symbols)| (name.as_str(), symbols.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.sectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sectors.is_empty()
    }
}

/// A taxonomy tagged with where it came from.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedTaxonomy {
    Discovered(SectorTaxonomy),
    Fallback(SectorTaxonomy),
}

impl ResolvedTaxonomy {
    pub fn taxonomy(&self) -> &SectorTaxonomy {
        match self {
            ResolvedTaxonomy::Discovered(t) | ResolvedTaxonomy::Fallback(t) => t,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, ResolvedTaxonomy::Fallback(_))
    }
}

/// Remote source of a raw taxonomy table.
#[async_trait]
pub trait TaxonomySource: Send + Sync {
    async fn fetch_table(&self) -> Result<String>;

    fn symbol_suffix(&self) -> Option<&str> {
        None
    }
}

/// Discovers the taxonomy from `source`, degrading to the bundled table on
/// any failure. Never fails.
pub async fn resolve_taxonomy(source: Option<&dyn TaxonomySource>) -> ResolvedTaxonomy {
    let Some(source) = source else {
        debug!("No taxonomy source configured, using fallback v{FALLBACK_VERSION}");
        return ResolvedTaxonomy::Fallback(SectorTaxonomy::fallback());
    };

    let discovered = match source.fetch_table().await {
        Ok(text) => SectorTaxonomy::from_csv(&text, source.symbol_suffix()),
        Err(e) => Err(e),
    };

    match discovered {
        Ok(taxonomy) => {
            info!(sectors = taxonomy.len(), "Discovered sector taxonomy");
            ResolvedTaxonomy::Discovered(taxonomy)
        }
        Err(e) => {
            warn!("Sector discovery failed: {e:#}. Using fallback v{FALLBACK_VERSION}");
            ResolvedTaxonomy::Fallback(SectorTaxonomy::fallback())
        }
    }
}
