//! Dashboard derivation service
//!
//! [`Dashboard`] ties the pieces together: it fetches flat records
//! through the [`RecordStore`] boundary, resolves category hierarchies,
//! classifies records against the as-of date, folds them with the
//! aggregation helpers, and memoizes each derivation in the TTL cache
//! under an explicit semantic key.
//!
//! Every request observes the store independently; two fetches inside
//! one derivation may see the store at different instants. Derived
//! metrics are approximately current, not atomic snapshots.

mod dividends;
mod portfolio;
mod transactions;

pub use dividends::{
    DividendDetail, DividendStats, DividendsSummary, PeriodBreakdown, YearTotal,
};
pub use portfolio::{
    AssetDetail, DrillComposition, LocationComposition, MarketFilter, MultiCategoryComposition,
    PerformanceEntry, PerformanceReport,
};
pub use transactions::{MonthlyInvestment, PURCHASE, SALE};

use std::time::Duration;

use chrono::{Datelike, Local, NaiveDate};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::aggregate::value_or_zero;
use crate::cache::{CacheKey, TtlCache, DEFAULT_CAPACITY, DEFAULT_TTL};
use crate::categories::CategoryMap;
use crate::classify::{classify_status, PaymentStatus};
use crate::error::{DashboardError, Result};
use crate::store::{self, AssetRow, CategoryRow, DividendRow, Query, RecordStore};

/// Record collection names exposed by the backing store
pub mod collections {
    pub const ASSETS: &str = "assets";
    pub const DIVIDENDS: &str = "dividends";
    pub const TRANSACTIONS: &str = "transactions";
    pub const ASSET_CATEGORIES: &str = "asset_categories";
    pub const PORTFOLIO_EVOLUTION: &str = "portfolio_evolution";
    pub const PERFORMANCE_SUMMARY: &str = "performance_summary";
}

/// L1 category excluded from the contribution series
pub(crate) const FIXED_INCOME_L1: &str = "Renda Fixa";

/// Top-level dashboard summary card
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryReport {
    pub total_patrimony: Decimal,
    pub total_cost: Decimal,
    pub performance_value: Decimal,
    pub performance_perc: Decimal,
    /// Paid dividends in the current year
    pub total_dividends_year: Decimal,
    /// Paid dividends in the current month
    pub total_dividends_month: Decimal,
}

/// Derivation service over one record store
pub struct Dashboard<S> {
    store: S,
    cache: TtlCache,
    ttl: Duration,
    as_of: Option<NaiveDate>,
}

impl<S: RecordStore> Dashboard<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            cache: TtlCache::new(DEFAULT_CAPACITY),
            ttl: DEFAULT_TTL,
            as_of: None,
        }
    }

    /// Pin the as-of date instead of using the local calendar date.
    /// Deterministic tests depend on this; production callers normally
    /// do not.
    pub fn with_as_of(mut self, as_of: NaiveDate) -> Self {
        self.as_of = Some(as_of);
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache = TtlCache::new(capacity);
        self
    }

    /// Date every settled/pending decision is made against.
    pub fn as_of(&self) -> NaiveDate {
        self.as_of.unwrap_or_else(|| Local::now().date_naive())
    }

    pub(crate) fn current_month(&self) -> String {
        self.as_of().format("%Y-%m").to_string()
    }

    pub(crate) fn memoize<T, F>(&self, key: CacheKey, compute: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Result<T>,
    {
        self.cache.get_or_compute(&key, self.ttl, compute)
    }

    /// Keys for as-of-dependent derivations carry the date, so a pinned
    /// or rolled-over date never replays another day's classification.
    pub(crate) fn dated_key(&self, operation: &'static str) -> CacheKey {
        CacheKey::new(operation).arg("as_of", self.as_of())
    }

    pub(crate) fn rows<T: DeserializeOwned>(&self, query: &Query) -> Result<Vec<T>> {
        store::fetch_rows(&self.store, query).map_err(|err| {
            error!(collection = %query.collection, %err, "store fetch failed");
            DashboardError::from(err)
        })
    }

    pub(crate) fn category_map(&self) -> Result<CategoryMap> {
        let rows: Vec<CategoryRow> = self.rows(&Query::new(collections::ASSET_CATEGORIES))?;
        Ok(CategoryMap::from_rows(rows))
    }

    /// Paid dividend total for the given `YYYY-MM` or `YYYY-..` date
    /// range, excluding records without a valid payment date.
    fn paid_dividends_between(&self, from: &str, to: &str) -> Result<Decimal> {
        let as_of = self.as_of();
        let rows: Vec<DividendRow> = self.rows(
            &Query::new(collections::DIVIDENDS)
                .filter(store::Filter::gte("payment_date", from))
                .filter(store::Filter::lte("payment_date", to)),
        )?;

        let mut total = Decimal::ZERO;
        for row in &rows {
            if classify_status(row.payment_date.as_deref(), as_of)
                == Some(PaymentStatus::Settled)
            {
                total += value_or_zero(&row.net_value);
            }
        }
        Ok(total)
    }

    /// Dashboard summary: patrimony, cost, overall performance, and
    /// paid dividend totals for the current year and month.
    pub fn summary(&self) -> Result<SummaryReport> {
        let key = self.dated_key("summary");
        self.memoize(key, || {
            let assets: Vec<AssetRow> = self.rows(&Query::new(collections::ASSETS))?;

            let mut total_patrimony = Decimal::ZERO;
            let mut total_cost = Decimal::ZERO;
            for asset in &assets {
                total_patrimony += value_or_zero(&asset.total_market_value);
                total_cost += value_or_zero(&asset.total_cost);
            }

            let performance_value = total_patrimony - total_cost;
            let performance_perc = if total_cost > Decimal::ZERO {
                performance_value / total_cost * Decimal::ONE_HUNDRED
            } else {
                Decimal::ZERO
            };

            let year = self.as_of().year();
            let total_dividends_year = self
                .paid_dividends_between(&format!("{year}-01-01"), &format!("{year}-12-31"))?;

            let month = self.current_month();
            let total_dividends_month =
                self.paid_dividends_between(&format!("{month}-01"), &format!("{month}-31"))?;

            Ok(SummaryReport {
                total_patrimony,
                total_cost,
                performance_value,
                performance_perc,
                total_dividends_year,
                total_dividends_month,
            })
        })
    }

    /// Number of resident cache entries; exposed for capacity tests and
    /// operational visibility.
    pub fn cached_entries(&self) -> usize {
        self.cache.len()
    }

    /// Drop every memoized derivation.
    pub fn invalidate_cache(&self) {
        self.cache.clear();
    }
}
