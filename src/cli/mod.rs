use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "carteira")]
#[command(
    version,
    about = "Brazilian investment portfolio dashboard aggregations"
)]
#[command(
    long_about = "Derive dashboard metrics (totals, monthly series, percentage compositions, paid/pending dividend splits) from flat JSON record collections."
)]
pub struct Cli {
    /// Path to a TOML config file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Directory with the JSON record collections (overrides config)
    #[arg(long, global = true)]
    pub data: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Dashboard summary: patrimony, cost, performance, dividend totals
    Summary,

    /// Monthly paid/pending dividend series, or one month's breakdown
    DividendsMonthly {
        /// Restrict to a single month (YYYY-MM)
        #[arg(long)]
        month: Option<String>,
    },

    /// Trailing dividend statistics (12-month average and totals)
    DividendsStats,

    /// Portfolio composition with drill-down
    Composition {
        /// Hierarchy level to group by: macro or l1
        #[arg(long, default_value = "macro")]
        level: String,

        /// "all" or a specific category label to drill into
        #[arg(long, default_value = "all")]
        filter: String,
    },

    /// Per-year purchase totals averaged over contributing months
    YearlyAverages,
}
