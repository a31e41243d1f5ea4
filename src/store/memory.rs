//! In-memory record store
//!
//! Holds named collections of flat JSON rows and answers queries with
//! the same operator semantics as the remote store: `eq` exact match,
//! `gte`/`lte` lexicographic string comparison (dates sort correctly),
//! `ilike` case-insensitive with `%` wildcards. Used by the CLI (rows
//! loaded from JSON files) and by the test suites.

use std::collections::HashMap;
use std::path::Path;

use serde_json::Value;
use tracing::info;

use crate::error::StoreError;
use crate::store::{Filter, Query, RecordStore};

#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: HashMap<String, Vec<Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a collection's rows.
    pub fn insert_collection(&mut self, name: &str, rows: Vec<Value>) {
        self.collections.insert(name.to_string(), rows);
    }

    /// Load a collection from a JSON file containing an array of rows.
    pub fn load_collection(&mut self, name: &str, path: &Path) -> Result<(), StoreError> {
        let raw = std::fs::read_to_string(path)?;
        let rows: Vec<Value> = serde_json::from_str(&raw)?;
        info!(collection = name, rows = rows.len(), "loaded collection");
        self.collections.insert(name.to_string(), rows);
        Ok(())
    }

    fn field_text(row: &Value, field: &str) -> Option<String> {
        match row.get(field)? {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    fn matches(row: &Value, filter: &Filter) -> bool {
        match filter {
            Filter::Eq { field, value } => {
                Self::field_text(row, field).as_deref() == Some(value.as_str())
            }
            Filter::Gte { field, value } => {
                matches!(Self::field_text(row, field), Some(v) if v.as_str() >= value.as_str())
            }
            Filter::Lte { field, value } => {
                matches!(Self::field_text(row, field), Some(v) if v.as_str() <= value.as_str())
            }
            Filter::ILike { field, pattern } => match Self::field_text(row, field) {
                Some(v) => ilike(&v, pattern),
                None => false,
            },
        }
    }
}

/// Case-insensitive LIKE with `%` matching any run of characters.
fn ilike(value: &str, pattern: &str) -> bool {
    let value = value.to_lowercase();
    let pattern = pattern.to_lowercase();

    let parts: Vec<&str> = pattern.split('%').collect();
    if parts.len() == 1 {
        return value == pattern;
    }

    let mut rest = value.as_str();
    for (i, part) in parts.iter().enumerate() {
        if part.is_empty() {
            continue;
        }
        if i == 0 {
            // Pattern does not start with %: anchor at the beginning
            match rest.strip_prefix(part) {
                Some(r) => rest = r,
                None => return false,
            }
        } else if i == parts.len() - 1 {
            // Pattern does not end with %: anchor at the end
            return rest.ends_with(part);
        } else {
            match rest.find(part) {
                Some(pos) => rest = &rest[pos + part.len()..],
                None => return false,
            }
        }
    }
    true
}

impl RecordStore for MemoryStore {
    fn fetch(&self, query: &Query) -> Result<Vec<Value>, StoreError> {
        let rows = self
            .collections
            .get(&query.collection)
            .ok_or_else(|| StoreError::UnknownCollection(query.collection.clone()))?;

        let mut out: Vec<Value> = rows
            .iter()
            .filter(|row| query.filters.iter().all(|f| Self::matches(row, f)))
            .cloned()
            .collect();

        if let Some(order) = &query.order_by {
            out.sort_by(|a, b| {
                let ka = Self::field_text(a, &order.field);
                let kb = Self::field_text(b, &order.field);
                let ord = ka.cmp(&kb);
                if order.descending {
                    ord.reverse()
                } else {
                    ord
                }
            });
        }

        if let Some(limit) = query.limit {
            out.truncate(limit);
        }

        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn store() -> MemoryStore {
        let mut store = MemoryStore::new();
        store.insert_collection(
            "transactions",
            vec![
                json!({"ticker": "PETR4", "type": "Compra", "transaction_date": "2024-01-15"}),
                json!({"ticker": "VALE3", "type": "Venda", "transaction_date": "2024-02-25"}),
                json!({"ticker": "HGLG11", "type": "Compra", "transaction_date": "2024-03-10"}),
                json!({"ticker": "PETR3", "type": "Compra", "transaction_date": null}),
            ],
        );
        store
    }

    #[test]
    fn test_eq_filter() {
        let store = store();
        let rows = store
            .fetch(&Query::new("transactions").filter(Filter::eq("type", "Compra")))
            .unwrap();
        assert_eq!(rows.len(), 3);
    }

    #[test]
    fn test_date_range_is_lexicographic() {
        let store = store();
        let rows = store
            .fetch(&Query::new("transactions").month_range("transaction_date", "2024-02"))
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["ticker"], "VALE3");
    }

    #[test]
    fn test_null_fields_never_match_range_filters() {
        let store = store();
        let rows = store
            .fetch(&Query::new("transactions").filter(Filter::gte("transaction_date", "2024-01-01")))
            .unwrap();
        assert_eq!(rows.len(), 3);
    }

    #[test]
    fn test_ilike_wildcards() {
        assert!(ilike("PETR4", "%petr%"));
        assert!(ilike("PETR4", "petr%"));
        assert!(ilike("PETR4", "%TR4"));
        assert!(ilike("PETR4", "petr4"));
        assert!(!ilike("PETR4", "%vale%"));
        assert!(!ilike("PETR4", "petr"));
    }

    #[test]
    fn test_order_and_limit() {
        let store = store();
        let rows = store
            .fetch(
                &Query::new("transactions")
                    .order_by("transaction_date", true)
                    .limit(2),
            )
            .unwrap();
        assert_eq!(rows[0]["ticker"], "HGLG11");
        assert_eq!(rows[1]["ticker"], "VALE3");
    }

    #[test]
    fn test_unknown_collection_is_an_error() {
        let store = store();
        let err = store.fetch(&Query::new("nope")).unwrap_err();
        assert!(matches!(err, StoreError::UnknownCollection(_)));
    }
}
