//! Category hierarchy resolution
//!
//! Each ticker maps to a category hierarchy (macro category down to L3,
//! plus a meta category and a market location). The map is rebuilt per
//! request from the raw category records; lookups are total functions
//! falling back to the "Outros" bucket at every level independently, so
//! an unclassified asset still lands somewhere visible.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::store::CategoryRow;

/// Sentinel bucket for assets without a category at some level
pub const OTHER_BUCKET: &str = "Outros";

/// Default market location when a ticker has no location record
pub const DEFAULT_LOCATION: &str = "BR";

/// Category hierarchy for one ticker; every field optional
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CategoryInfo {
    pub macro_category: Option<String>,
    pub category_l1: Option<String>,
    pub category_l2: Option<String>,
    pub category_l3: Option<String>,
    pub meta_category: Option<String>,
    pub location: Option<String>,
}

/// Hierarchy level selector for lookups
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryLevel {
    Macro,
    L1,
    L2,
    L3,
    Meta,
    Location,
}

impl CategoryLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            CategoryLevel::Macro => "macro_category",
            CategoryLevel::L1 => "category_l1",
            CategoryLevel::L2 => "category_l2",
            CategoryLevel::L3 => "category_l3",
            CategoryLevel::Meta => "meta_category",
            CategoryLevel::Location => "location",
        }
    }

    fn fallback(&self) -> &'static str {
        match self {
            CategoryLevel::Location => DEFAULT_LOCATION,
            _ => OTHER_BUCKET,
        }
    }
}

/// Ticker -> category hierarchy lookup, built once per request
#[derive(Debug, Default)]
pub struct CategoryMap {
    entries: HashMap<String, CategoryInfo>,
}

impl CategoryMap {
    /// Build the lookup from raw category records. Duplicate tickers are
    /// tolerated, last write wins; missing fields stay absent.
    pub fn from_rows(rows: Vec<CategoryRow>) -> Self {
        let mut entries = HashMap::with_capacity(rows.len());
        for row in rows {
            entries.insert(
                row.ticker,
                CategoryInfo {
                    macro_category: row.macro_category,
                    category_l1: row.category_l1,
                    category_l2: row.category_l2,
                    category_l3: row.category_l3,
                    meta_category: row.meta_category,
                    location: row.location,
                },
            );
        }
        Self { entries }
    }

    pub fn get(&self, ticker: &str) -> Option<&CategoryInfo> {
        self.entries.get(ticker)
    }

    /// Raw label at `level`, without fallback. Empty strings count as
    /// absent.
    pub fn label(&self, ticker: &str, level: CategoryLevel) -> Option<&str> {
        let info = self.entries.get(ticker)?;
        let value = match level {
            CategoryLevel::Macro => &info.macro_category,
            CategoryLevel::L1 => &info.category_l1,
            CategoryLevel::L2 => &info.category_l2,
            CategoryLevel::L3 => &info.category_l3,
            CategoryLevel::Meta => &info.meta_category,
            CategoryLevel::Location => &info.location,
        };
        value.as_deref().filter(|s| !s.is_empty())
    }

    /// Total lookup: every ticker resolves to a label, falling back to
    /// "Outros" ("BR" for location) when the level is absent.
    pub fn resolve(&self, ticker: &str, level: CategoryLevel) -> &str {
        self.label(ticker, level).unwrap_or_else(|| level.fallback())
    }

    /// Distinct non-empty labels observed at `level`, in arbitrary order.
    pub fn distinct_labels(&self, level: CategoryLevel) -> Vec<String> {
        let mut labels: Vec<String> = Vec::new();
        for ticker in self.entries.keys() {
            if let Some(label) = self.label(ticker, level) {
                if !labels.iter().any(|l| l == label) {
                    labels.push(label.to_string());
                }
            }
        }
        labels
    }
}
