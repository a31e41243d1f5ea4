//! Portfolio composition derivations
//!
//! Compositions fold asset market values into category buckets at the
//! requested hierarchy level, with drill-down from a macro bucket to the
//! individual tickers inside it.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::aggregate::{composition, value_or_zero, GroupedTotals, Share};
use crate::cache::CacheKey;
use crate::categories::{CategoryLevel, DEFAULT_LOCATION, OTHER_BUCKET};
use crate::error::{DashboardError, Result};
use crate::store::{AssetRow, DividendRow, EvolutionRow, Filter, PerformanceRow, Query, RecordStore};

use super::{collections, Dashboard};

/// Market restriction for the location composition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarketFilter {
    All,
    Brazil,
    External,
}

impl MarketFilter {
    pub fn as_str(&self) -> &'static str {
        match self {
            MarketFilter::All => "all",
            MarketFilter::Brazil => "BR",
            MarketFilter::External => "EXT",
        }
    }
}

impl FromStr for MarketFilter {
    type Err = DashboardError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "all" => Ok(MarketFilter::All),
            "BR" => Ok(MarketFilter::Brazil),
            "EXT" => Ok(MarketFilter::External),
            other => Err(DashboardError::InvalidParam {
                name: "market",
                value: other.to_string(),
            }),
        }
    }
}

/// Brazil vs external market value totals
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationComposition {
    pub brazil: Decimal,
    pub external: Decimal,
    pub market_filter: String,
}

/// Drill-down composition plus the filter labels available to the caller
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DrillComposition {
    pub composition: Vec<Share>,
    pub categories: Vec<String>,
    pub current_filter: String,
}

/// Compositions at every hierarchy level, for the analytical view
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MultiCategoryComposition {
    pub macro_category: Vec<Share>,
    pub category_l1: Vec<Share>,
    pub category_l2: Vec<Share>,
    pub category_l3: Vec<Share>,
}

/// One asset joined with its category and location
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetDetail {
    pub ticker: String,
    pub category: String,
    pub location: String,
    pub total_symbols: Option<Decimal>,
    pub average_price: Option<Decimal>,
    pub market_price: Option<Decimal>,
    pub total_cost: Option<Decimal>,
    pub total_market_value: Option<Decimal>,
    pub performance_value: Option<Decimal>,
    pub performance_perc: Option<Decimal>,
    pub updated_at: Option<String>,
}

/// Performance summary row, asset rows enriched with dividend totals
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceEntry {
    #[serde(flatten)]
    pub row: PerformanceRow,
    pub total_dividends: Option<Decimal>,
    pub total_profit_with_dividends: Option<Decimal>,
    pub total_profit_perc_with_dividends: Option<Decimal>,
}

/// Performance listing plus the portfolio-wide total row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceReport {
    pub data: Vec<PerformanceEntry>,
    pub summary: Option<PerformanceRow>,
    pub aggregation_type: String,
}

impl<S: RecordStore> Dashboard<S> {
    fn assets(&self) -> Result<Vec<AssetRow>> {
        self.rows(&Query::new(collections::ASSETS))
    }

    /// Brazil vs external totals, optionally restricted to one market.
    pub fn composition_by_location(&self, market: MarketFilter) -> Result<LocationComposition> {
        let key = CacheKey::new("composition_by_location")
            .arg("market", market.as_str());
        self.memoize(key, move || {
            let categories = self.category_map()?;
            let assets = self.assets()?;

            let mut brazil = Decimal::ZERO;
            let mut external = Decimal::ZERO;
            for asset in &assets {
                let location = categories.resolve(&asset.ticker, CategoryLevel::Location);
                let is_brazil = location == DEFAULT_LOCATION;
                match market {
                    MarketFilter::Brazil if !is_brazil => continue,
                    MarketFilter::External if is_brazil => continue,
                    _ => {}
                }
                let value = value_or_zero(&asset.total_market_value);
                if is_brazil {
                    brazil += value;
                } else {
                    external += value;
                }
            }

            Ok(LocationComposition {
                brazil,
                external,
                market_filter: market.as_str().to_string(),
            })
        })
    }

    /// Market-value totals grouped by one category hierarchy level.
    pub fn composition_by_category(&self, level: CategoryLevel) -> Result<GroupedTotals> {
        let key = CacheKey::new("composition_by_category").arg("level", level.as_str());
        self.memoize(key, move || {
            let categories = self.category_map()?;
            let assets = self.assets()?;

            let mut totals = GroupedTotals::new();
            for asset in &assets {
                let label = categories.resolve(&asset.ticker, level);
                totals.add(label, value_or_zero(&asset.total_market_value));
            }
            Ok(totals)
        })
    }

    /// Compositions for every hierarchy level in one pass. L2/L3 rows
    /// without a label at that depth are skipped rather than bucketed.
    pub fn composition_multi_category(&self) -> Result<MultiCategoryComposition> {
        let key = CacheKey::new("composition_multi_category");
        self.memoize(key, || {
            let categories = self.category_map()?;
            let assets = self.assets()?;

            let mut macro_totals = GroupedTotals::new();
            let mut l1_totals = GroupedTotals::new();
            let mut l2_totals = GroupedTotals::new();
            let mut l3_totals = GroupedTotals::new();

            for asset in &assets {
                let value = value_or_zero(&asset.total_market_value);
                macro_totals.add(categories.resolve(&asset.ticker, CategoryLevel::Macro), value);
                l1_totals.add(categories.resolve(&asset.ticker, CategoryLevel::L1), value);
                if let Some(label) = categories.label(&asset.ticker, CategoryLevel::L2) {
                    l2_totals.add(label, value);
                }
                if let Some(label) = categories.label(&asset.ticker, CategoryLevel::L3) {
                    l3_totals.add(label, value);
                }
            }

            Ok(MultiCategoryComposition {
                macro_category: composition(macro_totals),
                category_l1: composition(l1_totals),
                category_l2: composition(l2_totals),
                category_l3: composition(l3_totals),
            })
        })
    }

    /// Drill-down composition at `level` (macro or L1). `"all"` groups
    /// by the level's labels; a named label narrows to the tickers
    /// inside that bucket.
    pub fn composition_drill(&self, level: CategoryLevel, filter: &str) -> Result<DrillComposition> {
        if !matches!(level, CategoryLevel::Macro | CategoryLevel::L1) {
            return Err(DashboardError::InvalidParam {
                name: "level",
                value: level.as_str().to_string(),
            });
        }

        let key = CacheKey::new("composition_drill")
            .arg("level", level.as_str())
            .arg("filter", filter);
        let filter = filter.to_string();
        self.memoize(key, move || {
            let categories = self.category_map()?;
            let assets = self.assets()?;

            let mut totals = GroupedTotals::new();
            for asset in &assets {
                let label = categories.resolve(&asset.ticker, level);
                let value = value_or_zero(&asset.total_market_value);
                if filter == "all" {
                    totals.add(label, value);
                } else if label == filter {
                    totals.add(&asset.ticker, value);
                }
            }

            let available = match level {
                CategoryLevel::Macro => {
                    // Labels known to the category map, "Outros" always
                    // offered last
                    let mut labels = categories.distinct_labels(CategoryLevel::Macro);
                    labels.retain(|l| l != OTHER_BUCKET);
                    labels.sort();
                    labels.push(OTHER_BUCKET.to_string());
                    labels
                }
                _ => {
                    // Labels actually observed across the assets
                    let mut labels: Vec<String> = Vec::new();
                    for asset in &assets {
                        let label = categories.resolve(&asset.ticker, level);
                        if !labels.iter().any(|l| l == label) {
                            labels.push(label.to_string());
                        }
                    }
                    labels.sort();
                    labels
                }
            };

            Ok(DrillComposition {
                composition: composition(totals),
                categories: available,
                current_filter: filter.clone(),
            })
        })
    }

    /// Assets joined with their L1 category and location.
    pub fn portfolio_details(&self) -> Result<Vec<AssetDetail>> {
        let categories = self.category_map()?;
        let assets = self.assets()?;

        Ok(assets
            .into_iter()
            .map(|asset| {
                let category = categories.resolve(&asset.ticker, CategoryLevel::L1).to_string();
                let location = categories
                    .resolve(&asset.ticker, CategoryLevel::Location)
                    .to_string();
                AssetDetail {
                    category,
                    location,
                    ticker: asset.ticker,
                    total_symbols: asset.total_symbols,
                    average_price: asset.average_price,
                    market_price: asset.market_price,
                    total_cost: asset.total_cost,
                    total_market_value: asset.total_market_value,
                    performance_value: asset.performance_value,
                    performance_perc: asset.performance_perc,
                    updated_at: asset.updated_at,
                }
            })
            .collect())
    }

    /// Historical portfolio-value series, oldest first.
    pub fn portfolio_evolution(&self) -> Result<Vec<EvolutionRow>> {
        self.rows(
            &Query::new(collections::PORTFOLIO_EVOLUTION).order_by("reference_date", false),
        )
    }

    /// Performance summary at the requested aggregation granularity.
    /// Asset-level rows are enriched with per-ticker dividend totals.
    pub fn performance(&self, aggregation_type: &str) -> Result<PerformanceReport> {
        const KNOWN: [&str; 5] = ["asset", "category", "group", "sector", "location"];
        let agg = if KNOWN.contains(&aggregation_type) {
            aggregation_type
        } else {
            "asset"
        };

        let rows: Vec<PerformanceRow> = self.rows(
            &Query::new(collections::PERFORMANCE_SUMMARY)
                .filter(Filter::eq("aggregation_type", agg))
                .order_by("total_profit_perc", true),
        )?;
        let total_rows: Vec<PerformanceRow> = self.rows(
            &Query::new(collections::PERFORMANCE_SUMMARY)
                .filter(Filter::eq("aggregation_type", "total")),
        )?;

        let dividends_by_ticker = if agg == "asset" && !rows.is_empty() {
            let dividends: Vec<DividendRow> = self.rows(&Query::new(collections::DIVIDENDS))?;
            let mut totals = GroupedTotals::new();
            for dividend in &dividends {
                totals.add(&dividend.ticker, value_or_zero(&dividend.net_value));
            }
            Some(totals)
        } else {
            None
        };

        let data = rows
            .into_iter()
            .map(|row| match &dividends_by_ticker {
                Some(totals) => {
                    let total_dividends =
                        totals.get(&row.aggregation_label).unwrap_or(Decimal::ZERO);
                    let profit_with = value_or_zero(&row.total_profit_value) + total_dividends;
                    let buy_value = value_or_zero(&row.total_buy_value);
                    let perc_with = if buy_value > Decimal::ZERO {
                        profit_with / buy_value * Decimal::ONE_HUNDRED
                    } else {
                        Decimal::ZERO
                    };
                    PerformanceEntry {
                        row,
                        total_dividends: Some(total_dividends),
                        total_profit_with_dividends: Some(profit_with),
                        total_profit_perc_with_dividends: Some(perc_with),
                    }
                }
                None => PerformanceEntry {
                    row,
                    total_dividends: None,
                    total_profit_with_dividends: None,
                    total_profit_perc_with_dividends: None,
                },
            })
            .collect();

        Ok(PerformanceReport {
            data,
            summary: total_rows.into_iter().next(),
            aggregation_type: agg.to_string(),
        })
    }
}
