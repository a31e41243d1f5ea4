//! Aggregation folds
//!
//! Shared fold helpers for the dashboard derivations: insertion-ordered
//! grouped totals, percentage compositions, paid/pending splits, yearly
//! averages over distinct contributing months, and pagination math.
//! Missing numeric values coerce to zero; percentage rounding is
//! half-away-from-zero to two decimals.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::classify::PaymentStatus;

/// Treat a missing numeric field as zero.
pub fn value_or_zero(value: &Option<Decimal>) -> Decimal {
    value.unwrap_or(Decimal::ZERO)
}

/// Label -> total accumulator preserving first-insertion order, so that
/// downstream stable sorts break ties deterministically by encounter
/// order. Group counts are small; linear label lookup is fine.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GroupedTotals {
    entries: Vec<(String, Decimal)>,
}

impl GroupedTotals {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, label: &str, amount: Decimal) {
        match self.entries.iter_mut().find(|(l, _)| l.as_str() == label) {
            Some((_, total)) => *total += amount,
            None => self.entries.push((label.to_string(), amount)),
        }
    }

    pub fn get(&self, label: &str) -> Option<Decimal> {
        self.entries
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, t)| *t)
    }

    pub fn sum(&self) -> Decimal {
        self.entries.iter().map(|(_, t)| *t).sum()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Decimal)> {
        self.entries.iter().map(|(l, t)| (l.as_str(), *t))
    }

    pub fn into_entries(self) -> Vec<(String, Decimal)> {
        self.entries
    }

    /// Entries sorted by label descending (period keys: newest first).
    pub fn sorted_by_label_desc(mut self) -> Vec<(String, Decimal)> {
        self.entries.sort_by(|a, b| b.0.cmp(&a.0));
        self.entries
    }
}

/// One slice of a percentage composition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Share {
    pub name: String,
    pub value: Decimal,
    pub percentage: Decimal,
}

/// Round the way the dashboard displays percentages.
pub fn round_percentage(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Express grouped totals as percentages of their sum, sorted by value
/// descending (stable, ties keep encounter order). A zero overall total
/// yields zero for every percentage.
pub fn composition(totals: GroupedTotals) -> Vec<Share> {
    let total = totals.sum();
    let mut shares: Vec<Share> = totals
        .into_entries()
        .into_iter()
        .map(|(name, value)| {
            let percentage = if total > Decimal::ZERO {
                round_percentage(value / total * Decimal::ONE_HUNDRED)
            } else {
                Decimal::ZERO
            };
            Share {
                name,
                value,
                percentage,
            }
        })
        .collect();
    shares.sort_by(|a, b| b.value.cmp(&a.value));
    shares
}

/// Paid/pending split of a total
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusTotals {
    #[serde(rename = "Pago")]
    pub paid: Decimal,
    #[serde(rename = "A Pagar")]
    pub pending: Decimal,
}

impl StatusTotals {
    pub fn add(&mut self, status: PaymentStatus, amount: Decimal) {
        match status {
            PaymentStatus::Settled => self.paid += amount,
            PaymentStatus::Pending => self.pending += amount,
        }
    }

    pub fn total(&self) -> Decimal {
        self.paid + self.pending
    }
}

/// Bucket key -> paid/pending split, insertion-ordered like
/// [`GroupedTotals`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatusSeries {
    entries: Vec<(String, StatusTotals)>,
}

impl StatusSeries {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, bucket: &str, status: PaymentStatus, amount: Decimal) {
        match self.entries.iter_mut().find(|(k, _)| k.as_str() == bucket) {
            Some((_, totals)) => totals.add(status, amount),
            None => {
                let mut totals = StatusTotals::default();
                totals.add(status, amount);
                self.entries.push((bucket.to_string(), totals));
            }
        }
    }

    pub fn get(&self, bucket: &str) -> Option<StatusTotals> {
        self.entries
            .iter()
            .find(|(k, _)| k == bucket)
            .map(|(_, t)| *t)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, StatusTotals)> {
        self.entries.iter().map(|(k, t)| (k.as_str(), *t))
    }
}

/// Yearly total with its monthly average over contributing months
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearlyAverage {
    pub year: String,
    pub total: Decimal,
    pub average: Decimal,
    /// Count of distinct months with at least one contributing record
    pub months: usize,
}

/// Fold `(date, value)` pairs into per-year totals averaged over the
/// distinct months that actually had records (not divided by 12).
/// Records without a usable date are excluded. Output is sorted by year
/// descending.
pub fn yearly_averages<'a, I>(records: I) -> Vec<YearlyAverage>
where
    I: IntoIterator<Item = (&'a str, Decimal)>,
{
    // (year, total, distinct months), insertion-ordered
    let mut years: Vec<(String, Decimal, Vec<String>)> = Vec::new();

    for (date, value) in records {
        let (Some(year), Some(month)) = (
            crate::classify::bucket_key(date, crate::classify::Granularity::Year),
            crate::classify::bucket_key(date, crate::classify::Granularity::Month),
        ) else {
            continue;
        };

        let idx = match years.iter().position(|(y, _, _)| y.as_str() == year) {
            Some(idx) => idx,
            None => {
                years.push((year.to_string(), Decimal::ZERO, Vec::new()));
                years.len() - 1
            }
        };
        let entry = &mut years[idx];
        entry.1 += value;
        if !entry.2.iter().any(|m| m == month) {
            entry.2.push(month.to_string());
        }
    }

    let mut out: Vec<YearlyAverage> = years
        .into_iter()
        .map(|(year, total, months)| {
            let count = months.len();
            let average = if count > 0 {
                total / Decimal::from(count as u64)
            } else {
                Decimal::ZERO
            };
            YearlyAverage {
                year,
                total,
                average,
                months: count,
            }
        })
        .collect();
    out.sort_by(|a, b| b.year.cmp(&a.year));
    out
}

/// One page of a filtered listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub total: usize,
    pub page: usize,
    pub per_page: usize,
    pub total_pages: usize,
}

/// Slice an already-filtered listing into page `page` (1-based).
pub fn paginate<T>(rows: Vec<T>, page: usize, per_page: usize) -> Page<T> {
    let total = rows.len();
    let total_pages = total.div_ceil(per_page.max(1));
    let offset = page.saturating_sub(1).saturating_mul(per_page);
    let data: Vec<T> = rows.into_iter().skip(offset).take(per_page).collect();
    Page {
        data,
        total,
        page,
        per_page,
        total_pages,
    }
}
