use crate::core::universe::TopPicks;
use anyhow::{Context, Result};
use chrono::{Days, Months, NaiveDate};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::{fs, path::PathBuf};
use tracing::debug;

pub const DEFAULT_YAHOO_URL: &str = "https://query1.finance.yahoo.com";
pub const DEFAULT_PRICE_ALERT_THRESHOLD: f64 = 500.0;

/// How often the investor intends to run a cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Daily,
    Weekly,
    #[default]
    Monthly,
}

impl Frequency {
    /// Date the next cycle is due after a run on `last_run`. Month ends are
    /// clamped, so Jan 31 is followed by the last day of February.
    pub fn next_due(&self, last_run: NaiveDate) -> Option<NaiveDate> {
        match self {
            Frequency::Daily => last_run.checked_add_days(Days::new(1)),
            Frequency::Weekly => last_run.checked_add_days(Days::new(7)),
            Frequency::Monthly => last_run.checked_add_months(Months::new(1)),
        }
    }
}

impl Display for Frequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Frequency::Daily => "Daily",
                Frequency::Weekly => "Weekly",
                Frequency::Monthly => "Monthly",
            }
        )
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct YahooProviderConfig {
    pub base_url: String,
}

fn default_cache_ttl_hours() -> u64 {
    24
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct TaxonomyProviderConfig {
    /// CSV with a symbol column and an industry or sector column.
    pub url: String,
    pub symbol_suffix: Option<String>,
    #[serde(default = "default_cache_ttl_hours")]
    pub cache_ttl_hours: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProvidersConfig {
    pub yahoo: Option<YahooProviderConfig>,
    pub taxonomy: Option<TaxonomyProviderConfig>,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        ProvidersConfig {
            yahoo: Some(YahooProviderConfig {
                base_url: DEFAULT_YAHOO_URL.to_string(),
            }),
            taxonomy: None,
        }
    }
}

fn default_currency() -> String {
    "INR".to_string()
}

fn default_price_alert_threshold() -> f64 {
    DEFAULT_PRICE_ALERT_THRESHOLD
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    pub budget: Option<f64>,
    #[serde(default)]
    pub sectors: Vec<String>,
    #[serde(default)]
    pub frequency: Frequency,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default = "default_price_alert_threshold")]
    pub price_alert_threshold: f64,
    pub top_picks: Option<Vec<String>>,
    #[serde(default)]
    pub providers: ProvidersConfig,
    pub data_path: Option<String>,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        Self::load_from_path(&config_path)
    }

    fn project_dirs() -> Result<ProjectDirs> {
        ProjectDirs::from("in", "sectorsip", "sectorsip")
            .context("Could not determine project directories")
    }

    pub fn default_config_path() -> Result<PathBuf> {
        Ok(Self::project_dirs()?.config_dir().join("config.yaml"))
    }

    /// Directory holding the ledger files and the cache.
    pub fn data_dir(&self) -> Result<PathBuf> {
        if let Some(custom_path) = &self.data_path {
            return Ok(PathBuf::from(custom_path));
        }
        Ok(Self::project_dirs()?.data_dir().to_path_buf())
    }

    pub fn yahoo_base_url(&self) -> &str {
        self.providers
            .yahoo
            .as_ref()
            .map_or(DEFAULT_YAHOO_URL, |p| &p.base_url)
    }

    pub fn top_picks(&self) -> TopPicks {
        match &self.top_picks {
            Some(symbols) => {
                let picks = TopPicks::custom(symbols.clone());
                if picks.symbols.is_empty() {
                    TopPicks::default()
                } else {
                    picks
                }
            }
            None => TopPicks::default(),
        }
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::universe::DEFAULT_TOP_PICKS_VERSION;

    #[test]
    fn test_config_deserialization() {
        let yaml_str = r#"
budget: 10000
sectors: ["Banking", "technology"]
frequency: weekly
providers:
  yahoo:
    base_url: "http://example.com/yahoo"
  taxonomy:
    url: "http://example.com/nifty500.csv"
    symbol_suffix: ".NS"
data_path: "/tmp/sectorsip"
"#;

        let config: AppConfig = serde_yaml::from_str(yaml_str).expect("Failed to deserialize");
        assert_eq!(config.budget, Some(10000.0));
        assert_eq!(config.sectors, vec!["Banking", "technology"]);
        assert_eq!(config.frequency, Frequency::Weekly);
        assert_eq!(config.currency, "INR");
        assert_eq!(config.price_alert_threshold, 500.0);
        assert_eq!(config.yahoo_base_url(), "http://example.com/yahoo");
        let taxonomy = config.providers.taxonomy.as_ref().unwrap();
        assert_eq!(taxonomy.symbol_suffix.as_deref(), Some(".NS"));
        assert_eq!(taxonomy.cache_ttl_hours, 24);
        assert_eq!(config.data_dir().unwrap(), PathBuf::from("/tmp/sectorsip"));
        assert_eq!(config.top_picks().version, DEFAULT_TOP_PICKS_VERSION);
    }

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config: AppConfig = serde_yaml::from_str("top_picks: [AAPL, MSFT]\n").unwrap();
        assert!(config.budget.is_none());
        assert!(config.sectors.is_empty());
        assert_eq!(config.frequency, Frequency::Monthly);
        assert_eq!(config.yahoo_base_url(), DEFAULT_YAHOO_URL);
        assert!(config.providers.taxonomy.is_none());
        assert_eq!(config.top_picks().symbols, vec!["AAPL", "MSFT"]);
    }

    #[test]
    fn test_blank_top_picks_use_default() {
        let config: AppConfig = serde_yaml::from_str("top_picks: [\"\", \" \"]\n").unwrap();
        assert_eq!(config.top_picks().version, DEFAULT_TOP_PICKS_VERSION);

        let config: AppConfig = serde_yaml::from_str("top_picks: [\"\", TCS.NS]\n").unwrap();
        assert_eq!(config.top_picks().symbols, vec!["TCS.NS"]);
    }

    #[test]
    fn test_invalid_frequency_is_rejected() {
        let result = serde_yaml::from_str::<AppConfig>("frequency: hourly\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_next_due() {
        let jan_31 = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        assert_eq!(
            Frequency::Daily.next_due(jan_31),
            NaiveDate::from_ymd_opt(2024, 2, 1)
        );
        assert_eq!(
            Frequency::Weekly.next_due(jan_31),
            NaiveDate::from_ymd_opt(2024, 2, 7)
        );
        assert_eq!(
            Frequency::Monthly.next_due(jan_31),
            NaiveDate::from_ymd_opt(2024, 2, 29)
        );
    }
}
