pub mod cli;
pub mod core;
pub mod providers;
pub mod store;

use crate::core::cache::{KeyValueCollection, Store};
use crate::core::config::AppConfig;
use crate::core::taxonomy::{ResolvedTaxonomy, TaxonomySource, resolve_taxonomy};
use crate::core::{Agent, CycleRequest};
use crate::providers::taxonomy::CsvTaxonomyProvider;
use crate::providers::yahoo_finance::YahooFinanceProvider;
use crate::store::KeyValueStore;
use crate::store::files::JsonFileStore;
use crate::store::memory::MemoryCollection;
use anyhow::{Result, bail};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

pub enum AppCommand {
    Invest {
        budget: Option<f64>,
        sectors: Vec<String>,
        /// Ignore any configured sectors and buy the top picks.
        top_picks: bool,
    },
    Summary,
    Sectors,
}

fn collection(store: &KeyValueStore, name: &str, persist: bool) -> Arc<dyn KeyValueCollection> {
    store
        .get_collection(name, persist, true)
        .unwrap_or_else(|| Arc::new(MemoryCollection::new()))
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("sectorsip starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    let data_dir = config.data_dir()?;
    let store = match &config.providers.taxonomy {
        Some(_) => KeyValueStore::open(&data_dir.join("cache")),
        None => KeyValueStore::in_memory(),
    };

    let taxonomy_provider = config.providers.taxonomy.as_ref().map(|t| {
        CsvTaxonomyProvider::new(
            &t.url,
            t.symbol_suffix.clone(),
            collection(&store, "taxonomy", true),
            Duration::from_secs(t.cache_ttl_hours.saturating_mul(3600)),
        )
    });
    let taxonomy = resolve_taxonomy(
        taxonomy_provider
            .as_ref()
            .map(|p| p as &dyn TaxonomySource),
    )
    .await;

    match command {
        AppCommand::Sectors => {
            cli::sectors::run(&taxonomy);
            Ok(())
        }
        AppCommand::Invest {
            budget,
            sectors,
            top_picks,
        } => {
            let Some(budget) = budget.or(config.budget) else {
                bail!("No budget given: pass --budget or set `budget` in the config file");
            };
            let sectors = if top_picks {
                Vec::new()
            } else if sectors.is_empty() {
                config.sectors.clone()
            } else {
                sectors
            };
            let request = CycleRequest { budget, sectors };
            let today = chrono::Local::now().date_naive();

            let mut agent = open_agent(taxonomy, &config, &store, &data_dir);
            cli::invest::run(
                &mut agent,
                &request,
                today,
                config.frequency,
                &config.currency,
            )
            .await
        }
        AppCommand::Summary => {
            let agent = open_agent(taxonomy, &config, &store, &data_dir);
            cli::summary::run(&agent, config.frequency, &config.currency).await
        }
    }
}

fn open_agent(
    taxonomy: ResolvedTaxonomy,
    config: &AppConfig,
    store: &KeyValueStore,
    data_dir: &Path,
) -> Agent {
    let price_provider = Arc::new(YahooFinanceProvider::new(
        config.yahoo_base_url(),
        collection(store, "prices", false),
    ));
    Agent::open(
        taxonomy,
        config.top_picks(),
        price_provider,
        Box::new(JsonFileStore::new(data_dir)),
    )
    .with_price_alert_threshold(config.price_alert_threshold)
}
