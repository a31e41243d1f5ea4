use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::info;

use carteira::categories::CategoryLevel;
use carteira::cli::{Cli, Commands};
use carteira::config::Config;
use carteira::dashboard::collections;
use carteira::store::MemoryStore;
use carteira::Dashboard;

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    if let Some(data) = &cli.data {
        config.data_dir = data.clone();
    }

    let store = load_store(&config)?;
    let dashboard = Dashboard::new(store)
        .with_ttl(config.cache_ttl())
        .with_cache_capacity(config.cache_capacity);

    match cli.command {
        Commands::Summary => print_json(&dashboard.summary()?),
        Commands::DividendsMonthly { month } => match month {
            Some(month) => print_json(&dashboard.dividends_monthly_filtered(&month)?),
            None => print_json(&dashboard.dividends_monthly()?),
        },
        Commands::DividendsStats => print_json(&dashboard.dividends_stats()?),
        Commands::Composition { level, filter } => {
            let level = parse_level(&level)?;
            print_json(&dashboard.composition_drill(level, &filter)?)
        }
        Commands::YearlyAverages => print_json(&dashboard.yearly_investment_average()?),
    }
}

fn parse_level(level: &str) -> Result<CategoryLevel> {
    match level {
        "macro" => Ok(CategoryLevel::Macro),
        "l1" => Ok(CategoryLevel::L1),
        other => bail!("unsupported composition level: {other} (expected macro or l1)"),
    }
}

/// Load every collection the dashboard knows about; collections without
/// a file are registered empty so derivations still run.
fn load_store(config: &Config) -> Result<MemoryStore> {
    let mut store = MemoryStore::new();
    let names = [
        collections::ASSETS,
        collections::DIVIDENDS,
        collections::TRANSACTIONS,
        collections::ASSET_CATEGORIES,
        collections::PORTFOLIO_EVOLUTION,
        collections::PERFORMANCE_SUMMARY,
    ];
    for name in names {
        let path = config.data_dir.join(format!("{name}.json"));
        if path.exists() {
            store
                .load_collection(name, &path)
                .with_context(|| format!("failed to load {}", path.display()))?;
        } else {
            info!(collection = name, "no data file, registering empty");
            store.insert_collection(name, Vec::new());
        }
    }
    Ok(store)
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
