//! Transaction derivations: contribution series and listings
//!
//! "Compra" / "Venda" are the transaction type tags stored by the
//! importer. Contribution metrics fold purchase totals into month/year
//! buckets; the purchase/sale series exclude fixed-income assets, whose
//! rolling reinvestment would dwarf the real contribution flow.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::aggregate::{paginate, value_or_zero, GroupedTotals, Page, YearlyAverage};
use crate::cache::CacheKey;
use crate::categories::CategoryLevel;
use crate::classify::{bucket_key, Granularity};
use crate::error::{DashboardError, Result};
use crate::store::{Filter, Query, RecordStore, TransactionRow};

use super::{collections, Dashboard, FIXED_INCOME_L1};

/// Transaction type tag for purchases
pub const PURCHASE: &str = "Compra";
/// Transaction type tag for sales
pub const SALE: &str = "Venda";

/// Current-month investment card
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MonthlyInvestment {
    pub monthly_investment: Decimal,
}

fn purchases_query() -> Query {
    Query::new(collections::TRANSACTIONS)
        .filter(Filter::eq("type", PURCHASE))
        .order_by("transaction_date", false)
}

impl<S: RecordStore> Dashboard<S> {
    /// Purchase totals bucketed by month across all history.
    pub fn monthly_contributions(&self) -> Result<GroupedTotals> {
        let key = CacheKey::new("monthly_contributions");
        self.memoize(key, || {
            let rows: Vec<TransactionRow> = self.rows(&purchases_query())?;
            Ok(month_buckets(&rows))
        })
    }

    /// Total purchased in the current month.
    pub fn monthly_investment(&self) -> Result<MonthlyInvestment> {
        let month = self.current_month();
        let key = CacheKey::new("monthly_investment").arg("month", &month);
        self.memoize(key, move || {
            let rows: Vec<TransactionRow> = self.rows(
                &Query::new(collections::TRANSACTIONS)
                    .filter(Filter::eq("type", PURCHASE))
                    .month_range("transaction_date", &month),
            )?;
            let total = rows.iter().map(|r| value_or_zero(&r.total_value)).sum();
            Ok(MonthlyInvestment {
                monthly_investment: total,
            })
        })
    }

    /// Per-year purchase totals averaged over the distinct months that
    /// had purchases, newest year first.
    pub fn yearly_investment_average(&self) -> Result<Vec<YearlyAverage>> {
        let key = CacheKey::new("yearly_investment_average");
        self.memoize(key, || {
            let rows: Vec<TransactionRow> = self.rows(&purchases_query())?;
            let records = rows.iter().filter_map(|row| {
                row.transaction_date
                    .as_deref()
                    .map(|date| (date, value_or_zero(&row.total_value)))
            });
            Ok(crate::aggregate::yearly_averages(records))
        })
    }

    /// Purchases made in the current month, newest first, capped at 10.
    pub fn recent_transactions(&self) -> Result<Vec<TransactionRow>> {
        let month = self.current_month();
        self.rows(
            &Query::new(collections::TRANSACTIONS)
                .filter(Filter::eq("type", PURCHASE))
                .month_range("transaction_date", &month)
                .order_by("transaction_date", true)
                .limit(10),
        )
    }

    /// Filtered, paginated transaction listing, newest first.
    pub fn transactions_paginated(
        &self,
        page: usize,
        per_page: usize,
        kind: Option<&str>,
        ticker: Option<&str>,
    ) -> Result<Page<TransactionRow>> {
        if page == 0 {
            return Err(DashboardError::InvalidParam {
                name: "page",
                value: page.to_string(),
            });
        }
        if per_page == 0 {
            return Err(DashboardError::InvalidParam {
                name: "per_page",
                value: per_page.to_string(),
            });
        }

        let mut query =
            Query::new(collections::TRANSACTIONS).order_by("transaction_date", true);
        if let Some(kind) = kind.filter(|k| !k.is_empty()) {
            query = query.filter(Filter::eq("type", kind));
        }
        if let Some(ticker) = ticker.filter(|t| !t.is_empty()) {
            query = query.filter(Filter::ilike("ticker", format!("%{ticker}%")));
        }

        let rows: Vec<TransactionRow> = self.rows(&query)?;
        Ok(paginate(rows, page, per_page))
    }

    /// Purchase totals per month, fixed-income assets excluded.
    pub fn monthly_purchases(&self) -> Result<GroupedTotals> {
        let key = CacheKey::new("monthly_purchases");
        self.memoize(key, || self.monthly_by_type_excluding_fixed_income(PURCHASE))
    }

    /// Sale totals per month, fixed-income assets excluded.
    pub fn monthly_sales(&self) -> Result<GroupedTotals> {
        let key = CacheKey::new("monthly_sales");
        self.memoize(key, || self.monthly_by_type_excluding_fixed_income(SALE))
    }

    fn monthly_by_type_excluding_fixed_income(&self, kind: &str) -> Result<GroupedTotals> {
        let categories = self.category_map()?;
        let rows: Vec<TransactionRow> = self.rows(
            &Query::new(collections::TRANSACTIONS)
                .filter(Filter::eq("type", kind))
                .order_by("transaction_date", false),
        )?;

        let kept: Vec<TransactionRow> = rows
            .into_iter()
            .filter(|row| {
                categories.resolve(&row.ticker, CategoryLevel::L1) != FIXED_INCOME_L1
            })
            .collect();
        Ok(month_buckets(&kept))
    }
}

fn month_buckets(rows: &[TransactionRow]) -> GroupedTotals {
    let mut totals = GroupedTotals::new();
    for row in rows {
        let Some(date) = row.transaction_date.as_deref() else {
            continue;
        };
        let Some(month) = bucket_key(date, Granularity::Month) else {
            continue;
        };
        totals.add(month, value_or_zero(&row.total_value));
    }
    totals
}
