//! Record store boundary
//!
//! The dashboard consumes already-fetched, ordered collections of flat
//! records from a remote store that exposes a simple
//! filter/sort/paginate query capability. This module defines that
//! boundary: the [`Query`] description, the closed [`Filter`] operator
//! set, the [`RecordStore`] trait, typed row models, and an in-memory
//! implementation used by the CLI and the test suites.

pub mod memory;
pub mod models;

use serde::de::DeserializeOwned;
use serde_json::Value;

pub use memory::MemoryStore;
pub use models::{
    AssetRow, CategoryRow, DividendRow, EvolutionRow, PerformanceRow, TransactionRow,
};

use crate::error::StoreError;

/// Closed set of filter operators understood by the query boundary.
///
/// `Gte`/`Lte` compare values as strings, which is exactly right for the
/// `YYYY-MM-DD` date fields they are used on. `ILike` is a
/// case-insensitive match with `%` wildcards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    Eq { field: String, value: String },
    Gte { field: String, value: String },
    Lte { field: String, value: String },
    ILike { field: String, pattern: String },
}

impl Filter {
    pub fn eq(field: &str, value: impl Into<String>) -> Self {
        Filter::Eq {
            field: field.to_string(),
            value: value.into(),
        }
    }

    pub fn gte(field: &str, value: impl Into<String>) -> Self {
        Filter::Gte {
            field: field.to_string(),
            value: value.into(),
        }
    }

    pub fn lte(field: &str, value: impl Into<String>) -> Self {
        Filter::Lte {
            field: field.to_string(),
            value: value.into(),
        }
    }

    pub fn ilike(field: &str, pattern: impl Into<String>) -> Self {
        Filter::ILike {
            field: field.to_string(),
            pattern: pattern.into(),
        }
    }
}

/// Sort direction plus field for query ordering
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub field: String,
    pub descending: bool,
}

/// Description of one fetch against a named record collection
#[derive(Debug, Clone)]
pub struct Query {
    pub collection: String,
    pub filters: Vec<Filter>,
    pub order_by: Option<OrderBy>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn new(collection: &str) -> Self {
        Self {
            collection: collection.to_string(),
            filters: Vec::new(),
            order_by: None,
            limit: None,
        }
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn order_by(mut self, field: &str, descending: bool) -> Self {
        self.order_by = Some(OrderBy {
            field: field.to_string(),
            descending,
        });
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Restrict both bounds of a date field to one `YYYY-MM` month.
    /// `-31` as the upper bound is safe for lexicographic comparison on
    /// `YYYY-MM-DD` strings even in shorter months.
    pub fn month_range(self, field: &str, month: &str) -> Self {
        self.filter(Filter::gte(field, format!("{month}-01")))
            .filter(Filter::lte(field, format!("{month}-31")))
    }
}

/// External collaborator: fetches flat records from a named collection.
pub trait RecordStore {
    fn fetch(&self, query: &Query) -> Result<Vec<Value>, StoreError>;
}

/// Fetch and deserialize a collection into typed rows.
///
/// Unknown fields are ignored and missing fields default, so a shape
/// anomaly in one optional field never fails the whole fetch.
pub fn fetch_rows<T, S>(store: &S, query: &Query) -> Result<Vec<T>, StoreError>
where
    T: DeserializeOwned,
    S: RecordStore + ?Sized,
{
    let raw = store.fetch(query)?;
    let mut rows = Vec::with_capacity(raw.len());
    for value in raw {
        rows.push(serde_json::from_value(value)?);
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_builder_accumulates() {
        let q = Query::new("dividends")
            .filter(Filter::eq("type", "Dividendo"))
            .month_range("payment_date", "2024-03")
            .order_by("payment_date", true)
            .limit(10);

        assert_eq!(q.collection, "dividends");
        assert_eq!(q.filters.len(), 3);
        assert_eq!(
            q.filters[1],
            Filter::gte("payment_date", "2024-03-01")
        );
        assert_eq!(
            q.filters[2],
            Filter::lte("payment_date", "2024-03-31")
        );
        assert_eq!(
            q.order_by,
            Some(OrderBy {
                field: "payment_date".to_string(),
                descending: true
            })
        );
        assert_eq!(q.limit, Some(10));
    }
}
