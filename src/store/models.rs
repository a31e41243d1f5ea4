//! Flat record row models
//!
//! Rows arrive from the store as flat mappings; every field the
//! aggregation layer does not strictly need is optional. Numeric fields
//! deserialize into `Decimal` and coerce to zero at fold time; date
//! fields stay strings until classification parses them.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Consolidated position for one asset
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetRow {
    pub ticker: String,
    #[serde(default)]
    pub total_symbols: Option<Decimal>,
    #[serde(default)]
    pub average_price: Option<Decimal>,
    #[serde(default)]
    pub market_price: Option<Decimal>,
    #[serde(default)]
    pub total_cost: Option<Decimal>,
    #[serde(default)]
    pub total_market_value: Option<Decimal>,
    #[serde(default)]
    pub performance_value: Option<Decimal>,
    #[serde(default)]
    pub performance_perc: Option<Decimal>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// One dividend (or JCP/rendimento) event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DividendRow {
    #[serde(default)]
    pub id: Option<i64>,
    pub ticker: String,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    /// Declaration ("com") date
    #[serde(default)]
    pub com_date: Option<String>,
    #[serde(default)]
    pub payment_date: Option<String>,
    #[serde(default)]
    pub net_value: Option<Decimal>,
}

/// One buy/sell transaction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionRow {
    #[serde(default)]
    pub id: Option<i64>,
    pub ticker: String,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub transaction_date: Option<String>,
    #[serde(default)]
    pub quantity: Option<Decimal>,
    #[serde(default)]
    pub unit_price: Option<Decimal>,
    #[serde(default)]
    pub total_value: Option<Decimal>,
}

/// Per-ticker category hierarchy record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryRow {
    pub ticker: String,
    #[serde(default)]
    pub macro_category: Option<String>,
    #[serde(default)]
    pub category_l1: Option<String>,
    #[serde(default)]
    pub category_l2: Option<String>,
    #[serde(default)]
    pub category_l3: Option<String>,
    #[serde(default)]
    pub meta_category: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
}

/// One point of the historical portfolio-value series
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvolutionRow {
    #[serde(default)]
    pub reference_date: Option<String>,
    #[serde(default)]
    pub total_value: Option<Decimal>,
}

/// Precomputed performance summary row (one per aggregation label)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceRow {
    pub aggregation_type: String,
    pub aggregation_label: String,
    #[serde(default)]
    pub total_buy_value: Option<Decimal>,
    #[serde(default)]
    pub total_profit_value: Option<Decimal>,
    #[serde(default)]
    pub total_profit_perc: Option<Decimal>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_dividend_row_tolerates_missing_fields() {
        let row: DividendRow = serde_json::from_value(json!({"ticker": "PETR4"})).unwrap();
        assert_eq!(row.ticker, "PETR4");
        assert!(row.payment_date.is_none());
        assert!(row.net_value.is_none());
    }

    #[test]
    fn test_type_field_renames() {
        let row: TransactionRow = serde_json::from_value(json!({
            "ticker": "VALE3",
            "type": "Compra",
            "transaction_date": "2024-02-25",
            "total_value": 5500.00
        }))
        .unwrap();
        assert_eq!(row.kind.as_deref(), Some("Compra"));
    }

    #[test]
    fn test_null_numeric_deserializes_as_none() {
        let row: AssetRow =
            serde_json::from_value(json!({"ticker": "XYZ3", "total_market_value": null}))
                .unwrap();
        assert!(row.total_market_value.is_none());
    }
}
