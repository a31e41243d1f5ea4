//! Carteira - Brazilian investment portfolio dashboard core
//!
//! This library derives presentation-ready aggregates (totals,
//! month/year series, percentage compositions, paid/pending splits)
//! from flat records of transactions, dividends, and per-asset category
//! metadata, deduplicating repeated derivations through a short-lived
//! in-process TTL cache.

pub mod aggregate;
pub mod cache;
pub mod categories;
pub mod classify;
pub mod cli;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod store;

pub use dashboard::Dashboard;
pub use error::{DashboardError, Result, StoreError};
