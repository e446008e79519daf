//! Instrument universe resolution from sector selections.

use crate::core::taxonomy::{SectorTaxonomy, is_well_formed_symbol, normalize_sector};
use std::collections::BTreeSet;
use tracing::debug;

/// A versioned list of instruments bought when no sector is selected.
#[derive(Debug, Clone, PartialEq)]
pub struct TopPicks {
    pub version: String,
    pub symbols: Vec<String>,
}

pub const DEFAULT_TOP_PICKS_VERSION: &str = "2024.1";

pub const DEFAULT_TOP_PICKS: &[&str] = &[
    "NMDC.NS",
    "GLENMARK.NS",
    "BHEL.NS",
    "HDFCBANK.NS",
    "ICICIBANK.NS",
    "TATASTEEL.NS",
    "JSWSTEEL.NS",
    "INFY.NS",
    "SUNPHARMA.NS",
    "LT.NS",
];

impl Default for TopPicks {
    fn default() -> Self {
        Self {
            version: DEFAULT_TOP_PICKS_VERSION.to_string(),
            symbols: DEFAULT_TOP_PICKS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl TopPicks {
    /// A user-supplied list, versioned as `custom`. Blank and malformed
    /// symbols are dropped.
    pub fn custom(symbols: Vec<String>) -> Self {
        let symbols = symbols
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| {
                let ok = is_well_formed_symbol(s);
                if !ok {
                    debug!(symbol = %s, "Ignoring malformed top pick");
                }
                ok
            })
            .collect();
        Self {
            version: "custom".to_string(),
            symbols,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum UniverseSource {
    /// Sector names (normalized) that matched the taxonomy.
    Sectors(Vec<String>),
    TopPicks { version: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct InstrumentUniverse {
    pub symbols: BTreeSet<String>,
    pub source: UniverseSource,
}

impl InstrumentUniverse {
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    /// Human readable label for what drove the selection.
    pub fn label(&self) -> String {
        match &self.source {
            UniverseSource::Sectors(names) if names.is_empty() => "no matching".to_string(),
            UniverseSource::Sectors(names) => names.join(", "),
            UniverseSource::TopPicks { version } => format!("top picks ({version})"),
        }
    }
}

/// Unions the taxonomy entries for `selected` sectors, or returns
/// `top_picks` when nothing is selected. Unknown names are ignored.
pub fn resolve_universe(
    taxonomy: &SectorTaxonomy,
    selected: &[String],
    top_picks: &TopPicks,
) -> InstrumentUniverse {
    if selected.is_empty() {
        debug!(version = %top_picks.version, "No sectors selected, using top picks");
        return InstrumentUniverse {
            symbols: top_picks.symbols.iter().cloned().collect(),
            source: UniverseSource::TopPicks {
                version: top_picks.version.clone(),
            },
        };
    }

    let mut symbols = BTreeSet::new();
    let mut matched = Vec::new();
    for name in selected {
        let key = normalize_sector(name);
        match taxonomy.symbols(&key) {
            Some(entries) => {
                symbols.extend(entries.iter().cloned());
                if !matched.contains(&key) {
                    matched.push(key);
                }
            }
            None => debug!(sector = %name, "Ignoring unknown sector"),
        }
    }

    InstrumentUniverse {
        symbols,
        source: UniverseSource::Sectors(matched),
    }
}
