//! Settled/pending classification and date bucket keys
//!
//! Monetary records carry their dates as plain `YYYY-MM-DD` strings. A
//! record is settled ("Pago") once its reference date has passed relative
//! to the as-of date, pending ("A Pagar") otherwise. Records without a
//! parseable date are excluded from status-bucketed totals entirely rather
//! than defaulted to either side.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Settlement status of a monetary record relative to an as-of date
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum PaymentStatus {
    Settled,
    Pending,
}

impl PaymentStatus {
    /// Wire label used by the dashboard ("Pago" / "A Pagar")
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Settled => "Pago",
            PaymentStatus::Pending => "A Pagar",
        }
    }
}

/// Classify a record's reference date against `as_of`.
///
/// Returns `None` when the date is absent or unparseable; such records
/// contribute to no status-bucketed total.
pub fn classify_status(reference_date: Option<&str>, as_of: NaiveDate) -> Option<PaymentStatus> {
    let raw = reference_date?;
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()?;
    if date <= as_of {
        Some(PaymentStatus::Settled)
    } else {
        Some(PaymentStatus::Pending)
    }
}

/// Time-bucket granularity for grouped series
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Granularity {
    /// `YYYY-MM` keys
    Month,
    /// `YYYY` keys
    Year,
}

impl Granularity {
    fn prefix_len(&self) -> usize {
        match self {
            Granularity::Month => 7,
            Granularity::Year => 4,
        }
    }
}

/// Truncate a `YYYY-MM-DD` date string to its month (`YYYY-MM`) or year
/// (`YYYY`) bucket key. Returns `None` when the input is too short to
/// carry the requested prefix; callers exclude such records from the
/// bucketed aggregate.
pub fn bucket_key(date: &str, granularity: Granularity) -> Option<&str> {
    date.get(..granularity.prefix_len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_settled_iff_date_not_after_as_of() {
        let as_of = d(2024, 6, 1);
        assert_eq!(
            classify_status(Some("2024-03-01"), as_of),
            Some(PaymentStatus::Settled)
        );
        // Same-day payments count as settled
        assert_eq!(
            classify_status(Some("2024-06-01"), as_of),
            Some(PaymentStatus::Settled)
        );
        assert_eq!(
            classify_status(Some("2024-06-02"), as_of),
            Some(PaymentStatus::Pending)
        );
    }

    #[test]
    fn test_missing_or_malformed_dates_are_excluded() {
        let as_of = d(2024, 6, 1);
        assert_eq!(classify_status(None, as_of), None);
        assert_eq!(classify_status(Some(""), as_of), None);
        assert_eq!(classify_status(Some("15/01/2024"), as_of), None);
        assert_eq!(classify_status(Some("2024-13-40"), as_of), None);
    }

    #[test]
    fn test_status_labels() {
        assert_eq!(PaymentStatus::Settled.as_str(), "Pago");
        assert_eq!(PaymentStatus::Pending.as_str(), "A Pagar");
    }

    #[test]
    fn test_bucket_key_prefixes() {
        assert_eq!(bucket_key("2024-01-15", Granularity::Month), Some("2024-01"));
        assert_eq!(bucket_key("2024-01-15", Granularity::Year), Some("2024"));
        assert_eq!(bucket_key("2024-01", Granularity::Month), Some("2024-01"));
    }

    #[test]
    fn test_bucket_key_rejects_short_input() {
        assert_eq!(bucket_key("2024", Granularity::Month), None);
        assert_eq!(bucket_key("202", Granularity::Year), None);
        assert_eq!(bucket_key("", Granularity::Month), None);
    }
}
