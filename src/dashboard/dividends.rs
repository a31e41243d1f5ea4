//! Dividend derivations
//!
//! Every dividend metric classifies records against the as-of date via
//! the payment date; records without a parseable payment date are
//! excluded. Labels on the wire are the original Portuguese ones
//! ("Pago"/"A Pagar").

use chrono::{Datelike, Duration as ChronoDuration, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::aggregate::{paginate, value_or_zero, GroupedTotals, Page, StatusSeries, StatusTotals};
use crate::categories::CategoryLevel;
use crate::classify::{bucket_key, classify_status, Granularity, PaymentStatus};
use crate::error::{DashboardError, Result};
use crate::store::{CategoryRow, DividendRow, Filter, Query, RecordStore};

use super::{collections, Dashboard};

/// One dividend with its settled/pending status resolved
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DividendDetail {
    pub id: Option<i64>,
    pub ticker: String,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub payment_date: String,
    pub com_date: Option<String>,
    pub net_value: Decimal,
    pub status: String,
}

/// Paid/pending breakdown for one period
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PeriodBreakdown {
    pub paid: Decimal,
    pub pending: Decimal,
    pub total: Decimal,
}

impl From<StatusTotals> for PeriodBreakdown {
    fn from(totals: StatusTotals) -> Self {
        Self {
            paid: totals.paid,
            pending: totals.pending,
            total: totals.total(),
        }
    }
}

/// Current year and month dividend breakdowns
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DividendsSummary {
    pub current_year: PeriodBreakdown,
    pub current_month: PeriodBreakdown,
}

/// Trailing statistics for the dividend cards
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DividendStats {
    /// Paid total over the trailing 12 months divided by the distinct
    /// months that actually paid
    pub monthly_average_12m: Decimal,
    pub total_last_12m: Decimal,
    /// Paid total in the current month
    pub total_current_month: Decimal,
    /// Everything scheduled for the next month
    pub total_next_month: Decimal,
}

/// Paid total for one year
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearTotal {
    pub year: String,
    pub total: Decimal,
}

fn all_dividends_query() -> Query {
    Query::new(collections::DIVIDENDS).order_by("payment_date", false)
}

/// `YYYY-MM` of the month after `as_of`.
fn next_month_key(as_of: NaiveDate) -> String {
    let (year, month) = if as_of.month() == 12 {
        (as_of.year() + 1, 1)
    } else {
        (as_of.year(), as_of.month() + 1)
    };
    format!("{year:04}-{month:02}")
}

impl<S: RecordStore> Dashboard<S> {
    /// Month key -> paid/pending dividend totals across all history.
    pub fn dividends_monthly(&self) -> Result<StatusSeries> {
        let key = self.dated_key("dividends_monthly");
        self.memoize(key, || self.dividend_status_series(Granularity::Month))
    }

    /// Year key -> paid/pending dividend totals across all history.
    pub fn dividends_annual_summary(&self) -> Result<StatusSeries> {
        let key = self.dated_key("dividends_annual_summary");
        self.memoize(key, || self.dividend_status_series(Granularity::Year))
    }

    fn dividend_status_series(&self, granularity: Granularity) -> Result<StatusSeries> {
        let as_of = self.as_of();
        let rows: Vec<DividendRow> = self.rows(&all_dividends_query())?;

        let mut series = StatusSeries::new();
        for row in &rows {
            let Some(status) = classify_status(row.payment_date.as_deref(), as_of) else {
                continue;
            };
            let date = row.payment_date.as_deref().unwrap_or_default();
            let Some(bucket) = bucket_key(date, granularity) else {
                continue;
            };
            series.add(bucket, status, value_or_zero(&row.net_value));
        }
        Ok(series)
    }

    /// Paid/pending totals for one `YYYY-MM` month. The month filter is
    /// required; absent input is rejected before any fetch.
    pub fn dividends_monthly_filtered(&self, month: &str) -> Result<StatusTotals> {
        if month.is_empty() {
            return Err(DashboardError::MissingParam("month"));
        }
        let key = self.dated_key("dividends_monthly_filtered").arg("month", month);
        let month = month.to_string();
        self.memoize(key, move || {
            let as_of = self.as_of();
            let rows: Vec<DividendRow> = self.rows(
                &Query::new(collections::DIVIDENDS)
                    .month_range("payment_date", &month)
                    .order_by("payment_date", false),
            )?;

            let mut totals = StatusTotals::default();
            for row in &rows {
                if let Some(status) = classify_status(row.payment_date.as_deref(), as_of) {
                    totals.add(status, value_or_zero(&row.net_value));
                }
            }
            Ok(totals)
        })
    }

    /// Every dividend with its status resolved, newest first. Records
    /// without a payment date cannot be classified and are omitted.
    pub fn dividends_detailed(&self) -> Result<Vec<DividendDetail>> {
        let as_of = self.as_of();
        let rows: Vec<DividendRow> =
            self.rows(&Query::new(collections::DIVIDENDS).order_by("payment_date", true))?;
        Ok(detail_rows(rows, as_of))
    }

    /// Filtered, paginated dividend listing. All filters (month, ticker,
    /// status) apply before pagination so `total` counts what matches.
    pub fn dividends_detailed_paginated(
        &self,
        page: usize,
        per_page: usize,
        status: Option<&str>,
        ticker: Option<&str>,
        month: Option<&str>,
    ) -> Result<Page<DividendDetail>> {
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

        let mut query = Query::new(collections::DIVIDENDS).order_by("payment_date", true);
        if let Some(month) = month.filter(|m| !m.is_empty()) {
            query = query.month_range("payment_date", month);
        }
        if let Some(ticker) = ticker.filter(|t| !t.is_empty()) {
            query = query.filter(Filter::ilike("ticker", format!("%{ticker}%")));
        }

        let as_of = self.as_of();
        let rows: Vec<DividendRow> = self.rows(&query)?;
        let mut details = detail_rows(rows, as_of);
        if let Some(status) = status.filter(|s| !s.is_empty()) {
            details.retain(|d| d.status == status);
        }
        Ok(paginate(details, page, per_page))
    }

    /// Paid dividend totals grouped by meta category.
    pub fn dividends_by_category(&self) -> Result<GroupedTotals> {
        let key = self.dated_key("dividends_by_category");
        self.memoize(key, || {
            let as_of = self.as_of();
            let categories = self.category_map()?;
            let rows: Vec<DividendRow> = self.rows(&Query::new(collections::DIVIDENDS))?;

            let mut totals = GroupedTotals::new();
            for row in &rows {
                if classify_status(row.payment_date.as_deref(), as_of)
                    == Some(PaymentStatus::Settled)
                {
                    let label = categories.resolve(&row.ticker, CategoryLevel::Meta);
                    totals.add(label, value_or_zero(&row.net_value));
                }
            }
            Ok(totals)
        })
    }

    /// Paid dividend totals per ticker, optionally restricted to one
    /// meta category.
    pub fn dividends_by_asset(&self, category: Option<&str>) -> Result<GroupedTotals> {
        let key = self
            .dated_key("dividends_by_asset")
            .arg("category", category.unwrap_or(""));
        let category = category.map(str::to_string);
        self.memoize(key, move || {
            let as_of = self.as_of();
            let allowed: Option<Vec<String>> = match category.as_deref().filter(|c| !c.is_empty())
            {
                Some(category) => {
                    let rows: Vec<CategoryRow> = self.rows(
                        &Query::new(collections::ASSET_CATEGORIES)
                            .filter(Filter::eq("meta_category", category)),
                    )?;
                    Some(rows.into_iter().map(|r| r.ticker).collect())
                }
                None => None,
            };

            let rows: Vec<DividendRow> = self.rows(&Query::new(collections::DIVIDENDS))?;
            let mut totals = GroupedTotals::new();
            for row in &rows {
                if classify_status(row.payment_date.as_deref(), as_of)
                    != Some(PaymentStatus::Settled)
                {
                    continue;
                }
                if let Some(allowed) = &allowed {
                    if !allowed.iter().any(|t| t == &row.ticker) {
                        continue;
                    }
                }
                totals.add(&row.ticker, value_or_zero(&row.net_value));
            }
            Ok(totals)
        })
    }

    /// Trailing dividend statistics for the stat cards.
    pub fn dividends_stats(&self) -> Result<DividendStats> {
        let key = self.dated_key("dividends_stats");
        self.memoize(key, || {
            let as_of = self.as_of();
            let current_month = self.current_month();
            let next_month = next_month_key(as_of);
            let twelve_months_ago = as_of - ChronoDuration::days(365);

            let rows: Vec<DividendRow> = self.rows(&Query::new(collections::DIVIDENDS))?;

            let mut last_12m = GroupedTotals::new();
            let mut total_current_month = Decimal::ZERO;
            let mut total_next_month = Decimal::ZERO;

            for row in &rows {
                let Some(raw_date) = row.payment_date.as_deref() else {
                    continue;
                };
                let Ok(date) = NaiveDate::parse_from_str(raw_date, "%Y-%m-%d") else {
                    continue;
                };
                let Some(month_key) = bucket_key(raw_date, Granularity::Month) else {
                    continue;
                };
                let value = value_or_zero(&row.net_value);

                if month_key == next_month {
                    total_next_month += value;
                }
                if month_key == current_month && date <= as_of {
                    total_current_month += value;
                }
                if date <= as_of && date >= twelve_months_ago {
                    last_12m.add(month_key, value);
                }
            }

            let total_last_12m = last_12m.sum();
            let months_with_data = last_12m.len();
            let monthly_average_12m = if months_with_data > 0 {
                total_last_12m / Decimal::from(months_with_data as u64)
            } else {
                Decimal::ZERO
            };

            Ok(DividendStats {
                monthly_average_12m,
                total_last_12m,
                total_current_month,
                total_next_month,
            })
        })
    }

    /// Paid dividend totals per year, newest year first.
    pub fn dividends_yearly_summary(&self) -> Result<Vec<YearTotal>> {
        let key = self.dated_key("dividends_yearly_summary");
        self.memoize(key, || {
            let as_of = self.as_of();
            let rows: Vec<DividendRow> = self.rows(&all_dividends_query())?;

            let mut totals = GroupedTotals::new();
            for row in &rows {
                if classify_status(row.payment_date.as_deref(), as_of)
                    != Some(PaymentStatus::Settled)
                {
                    continue;
                }
                let date = row.payment_date.as_deref().unwrap_or_default();
                if let Some(year) = bucket_key(date, Granularity::Year) {
                    totals.add(year, value_or_zero(&row.net_value));
                }
            }

            Ok(totals
                .sorted_by_label_desc()
                .into_iter()
                .map(|(year, total)| YearTotal { year, total })
                .collect())
        })
    }

    /// Paid/pending breakdowns for the current year and current month.
    pub fn dividends_summary(&self) -> Result<DividendsSummary> {
        let key = self.dated_key("dividends_summary");
        self.memoize(key, || {
            let year = self.as_of().year();
            let current_year = self.period_breakdown(&format!("{year}-01-01"), &format!("{year}-12-31"))?;

            let month = self.current_month();
            let current_month =
                self.period_breakdown(&format!("{month}-01"), &format!("{month}-31"))?;

            Ok(DividendsSummary {
                current_year,
                current_month,
            })
        })
    }

    fn period_breakdown(&self, from: &str, to: &str) -> Result<PeriodBreakdown> {
        let as_of = self.as_of();
        let rows: Vec<DividendRow> = self.rows(
            &Query::new(collections::DIVIDENDS)
                .filter(Filter::gte("payment_date", from))
                .filter(Filter::lte("payment_date", to)),
        )?;

        let mut totals = StatusTotals::default();
        for row in &rows {
            if let Some(status) = classify_status(row.payment_date.as_deref(), as_of) {
                totals.add(status, value_or_zero(&row.net_value));
            }
        }
        Ok(totals.into())
    }
}

fn detail_rows(rows: Vec<DividendRow>, as_of: NaiveDate) -> Vec<DividendDetail> {
    rows.into_iter()
        .filter_map(|row| {
            let status = classify_status(row.payment_date.as_deref(), as_of)?;
            Some(DividendDetail {
                id: row.id,
                ticker: row.ticker,
                kind: row.kind,
                payment_date: row.payment_date.unwrap_or_default(),
                com_date: row.com_date,
                net_value: value_or_zero(&row.net_value),
                status: status.as_str().to_string(),
            })
        })
        .collect()
}
