//! Integration tests for the dashboard derivations
//!
//! Tests:
//! - Summary totals and paid-only dividend counting
//! - Month/year bucketing and the paid/pending split
//! - Compositions, drill-down, and percentage math
//! - Yearly averages over distinct contributing months
//! - Pagination, input rejection, and upstream failure propagation
//! - Memoization across repeated derivations

use std::cell::Cell;
use std::rc::Rc;

use carteira::categories::CategoryLevel;
use carteira::dashboard::{collections, MarketFilter};
use carteira::error::{DashboardError, StoreError};
use carteira::store::{MemoryStore, Query, RecordStore};
use carteira::Dashboard;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::{json, Value};

// =============================================================================
// Test Helpers
// =============================================================================

fn as_of() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
}

/// Store with a representative slice of every collection
fn fixture_store() -> MemoryStore {
    let mut store = MemoryStore::new();
    store.insert_collection(
        collections::ASSETS,
        vec![
            json!({"ticker": "PETR4", "total_market_value": 1000, "total_cost": 800}),
            json!({"ticker": "HGLG11", "total_market_value": 500, "total_cost": 550}),
            json!({"ticker": "XYZ3", "total_market_value": 0, "total_cost": 0}),
        ],
    );
    store.insert_collection(
        collections::ASSET_CATEGORIES,
        vec![
            json!({"ticker": "PETR4", "macro_category": "Ações", "category_l1": "Ações BR",
                   "meta_category": "Renda Variável", "location": "BR"}),
            json!({"ticker": "HGLG11", "macro_category": "FIIs", "category_l1": "FIIs",
                   "meta_category": "Renda Variável", "location": "BR"}),
            json!({"ticker": "TESOURO-2029", "macro_category": "Renda Fixa",
                   "category_l1": "Renda Fixa", "location": "BR"}),
            json!({"ticker": "VT", "macro_category": "Ações", "category_l1": "Ações EXT",
                   "location": "EXT"}),
        ],
    );
    store.insert_collection(
        collections::DIVIDENDS,
        vec![
            json!({"id": 1, "ticker": "PETR4", "type": "Dividendo",
                   "payment_date": "2024-03-01", "net_value": 125.30}),
            json!({"id": 2, "ticker": "HGLG11", "type": "Rendimento",
                   "payment_date": "2024-05-10", "net_value": 80.00}),
            json!({"id": 3, "ticker": "PETR4", "type": "JCP",
                   "payment_date": "2024-07-15", "net_value": 40.00}),
            json!({"id": 4, "ticker": "HGLG11", "type": "Rendimento",
                   "payment_date": null, "net_value": 999.00}),
        ],
    );
    store.insert_collection(
        collections::TRANSACTIONS,
        vec![
            json!({"id": 1, "ticker": "PETR4", "type": "Compra",
                   "transaction_date": "2024-01-15", "total_value": 60.00}),
            json!({"id": 2, "ticker": "HGLG11", "type": "Compra",
                   "transaction_date": "2024-02-25", "total_value": 5500.00}),
            json!({"id": 3, "ticker": "TESOURO-2029", "type": "Compra",
                   "transaction_date": "2024-02-10", "total_value": 1000.00}),
            json!({"id": 4, "ticker": "PETR4", "type": "Venda",
                   "transaction_date": "2024-03-08", "total_value": 30.00}),
            json!({"id": 5, "ticker": "PETR4", "type": "Compra",
                   "transaction_date": "2024-06-01", "total_value": 200.00}),
        ],
    );
    store.insert_collection(
        collections::PORTFOLIO_EVOLUTION,
        vec![
            json!({"reference_date": "2024-02-29", "total_value": 1100}),
            json!({"reference_date": "2024-01-31", "total_value": 900}),
        ],
    );
    store.insert_collection(
        collections::PERFORMANCE_SUMMARY,
        vec![
            json!({"aggregation_type": "asset", "aggregation_label": "PETR4",
                   "total_buy_value": 800, "total_profit_value": 200, "total_profit_perc": 25.0}),
            json!({"aggregation_type": "total", "aggregation_label": "total",
                   "total_buy_value": 1350, "total_profit_value": 150, "total_profit_perc": 11.1}),
        ],
    );
    store
}

fn fixture_dashboard() -> Dashboard<MemoryStore> {
    Dashboard::new(fixture_store()).with_as_of(as_of())
}

/// Store wrapper counting fetches, for memoization assertions
struct CountingStore {
    inner: MemoryStore,
    fetches: Rc<Cell<usize>>,
}

impl RecordStore for CountingStore {
    fn fetch(&self, query: &Query) -> Result<Vec<Value>, StoreError> {
        self.fetches.set(self.fetches.get() + 1);
        self.inner.fetch(query)
    }
}

/// Store whose every fetch fails
struct FailingStore;

impl RecordStore for FailingStore {
    fn fetch(&self, _query: &Query) -> Result<Vec<Value>, StoreError> {
        Err(StoreError::QueryFailed("connection reset".to_string()))
    }
}

// =============================================================================
// Summary
// =============================================================================

#[test]
fn test_summary_totals_and_performance() {
    let summary = fixture_dashboard().summary().unwrap();

    assert_eq!(summary.total_patrimony, dec!(1500));
    assert_eq!(summary.total_cost, dec!(1350));
    assert_eq!(summary.performance_value, dec!(150));
    // 150 / 1350 * 100
    assert_eq!(
        summary.performance_perc.round_dp(2),
        dec!(11.11)
    );
}

#[test]
fn test_summary_counts_only_paid_dividends() {
    let summary = fixture_dashboard().summary().unwrap();

    // 2024 dividends: 125.30 + 80.00 paid; 40.00 pending (July); the
    // dateless 999.00 row contributes nowhere
    assert_eq!(summary.total_dividends_year, dec!(205.30));
    // Nothing paid in June 2024
    assert_eq!(summary.total_dividends_month, Decimal::ZERO);
}

#[test]
fn test_summary_with_zero_cost_has_zero_performance_pct() {
    let mut store = MemoryStore::new();
    store.insert_collection(
        collections::ASSETS,
        vec![json!({"ticker": "XYZ3", "total_market_value": 100})],
    );
    store.insert_collection(collections::DIVIDENDS, Vec::new());
    let dashboard = Dashboard::new(store).with_as_of(as_of());

    let summary = dashboard.summary().unwrap();
    assert_eq!(summary.total_cost, Decimal::ZERO);
    assert_eq!(summary.performance_perc, Decimal::ZERO);
}

// =============================================================================
// Dividend series and status classification
// =============================================================================

#[test]
fn test_dividends_monthly_splits_paid_and_pending() {
    let series = fixture_dashboard().dividends_monthly().unwrap();

    let march = series.get("2024-03").unwrap();
    assert_eq!(march.paid, dec!(125.30));
    assert_eq!(march.pending, Decimal::ZERO);

    let july = series.get("2024-07").unwrap();
    assert_eq!(july.paid, Decimal::ZERO);
    assert_eq!(july.pending, dec!(40.00));

    // The dateless row lands in no bucket
    assert_eq!(series.len(), 3);
}

#[test]
fn test_dividends_annual_summary_buckets_by_year() {
    let series = fixture_dashboard().dividends_annual_summary().unwrap();
    let year = series.get("2024").unwrap();
    assert_eq!(year.paid, dec!(205.30));
    assert_eq!(year.pending, dec!(40.00));
}

#[test]
fn test_dividends_yearly_summary_is_paid_only() {
    let years = fixture_dashboard().dividends_yearly_summary().unwrap();
    assert_eq!(years.len(), 1);
    assert_eq!(years[0].year, "2024");
    assert_eq!(years[0].total, dec!(205.30));
}

#[test]
fn test_dividends_monthly_filtered_requires_month() {
    let err = fixture_dashboard()
        .dividends_monthly_filtered("")
        .unwrap_err();
    assert!(matches!(err, DashboardError::MissingParam("month")));
    assert!(!err.is_retryable());
}

#[test]
fn test_dividends_monthly_filtered_single_month() {
    let totals = fixture_dashboard()
        .dividends_monthly_filtered("2024-03")
        .unwrap();
    assert_eq!(totals.paid, dec!(125.30));
    assert_eq!(totals.pending, Decimal::ZERO);
}

#[test]
fn test_dividends_by_category_groups_paid_by_meta() {
    let totals = fixture_dashboard().dividends_by_category().unwrap();
    assert_eq!(totals.get("Renda Variável"), Some(dec!(205.30)));
    assert_eq!(totals.len(), 1);
}

#[test]
fn test_dividends_by_asset_with_category_filter() {
    let dashboard = fixture_dashboard();

    let all = dashboard.dividends_by_asset(None).unwrap();
    assert_eq!(all.get("PETR4"), Some(dec!(125.30)));
    assert_eq!(all.get("HGLG11"), Some(dec!(80.00)));

    let filtered = dashboard.dividends_by_asset(Some("Renda Variável")).unwrap();
    assert_eq!(filtered.len(), 2);

    let none = dashboard.dividends_by_asset(Some("Cripto")).unwrap();
    assert!(none.is_empty());
}

#[test]
fn test_dividends_stats_trailing_window() {
    let stats = fixture_dashboard().dividends_stats().unwrap();

    // Paid within the trailing year across two distinct months
    assert_eq!(stats.total_last_12m, dec!(205.30));
    assert_eq!(stats.monthly_average_12m, dec!(102.65));
    // Nothing paid in June; July's 40.00 is next month's schedule
    assert_eq!(stats.total_current_month, Decimal::ZERO);
    assert_eq!(stats.total_next_month, dec!(40.00));

    let july_view = Dashboard::new(fixture_store())
        .with_as_of(NaiveDate::from_ymd_opt(2024, 7, 20).unwrap());
    let stats = july_view.dividends_stats().unwrap();
    assert_eq!(stats.total_current_month, dec!(40.00));
}

#[test]
fn test_dividends_detailed_resolves_status_labels() {
    let details = fixture_dashboard().dividends_detailed().unwrap();

    // Dateless record is omitted entirely
    assert_eq!(details.len(), 3);
    // Newest first
    assert_eq!(details[0].payment_date, "2024-07-15");
    assert_eq!(details[0].status, "A Pagar");
    assert_eq!(details[2].payment_date, "2024-03-01");
    assert_eq!(details[2].status, "Pago");
}

#[test]
fn test_dividends_paginated_filters_before_slicing() {
    let dashboard = fixture_dashboard();

    let page = dashboard
        .dividends_detailed_paginated(1, 2, Some("Pago"), None, None)
        .unwrap();
    assert_eq!(page.total, 2);
    assert_eq!(page.total_pages, 1);
    assert!(page.data.iter().all(|d| d.status == "Pago"));

    let by_ticker = dashboard
        .dividends_detailed_paginated(1, 10, None, Some("petr"), None)
        .unwrap();
    assert_eq!(by_ticker.total, 2);
    assert!(by_ticker.data.iter().all(|d| d.ticker == "PETR4"));

    let err = dashboard
        .dividends_detailed_paginated(0, 10, None, None, None)
        .unwrap_err();
    assert!(matches!(
        err,
        DashboardError::InvalidParam { name: "page", .. }
    ));
}

// =============================================================================
// Compositions
// =============================================================================

#[test]
fn test_drill_all_groups_by_macro_with_outros_sentinel() {
    let drill = fixture_dashboard()
        .composition_drill(CategoryLevel::Macro, "all")
        .unwrap();

    // Value-descending: Ações 1000, FIIs 500, Outros 0 (XYZ3 has no
    // category record)
    let names: Vec<&str> = drill.composition.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["Ações", "FIIs", "Outros"]);
    assert_eq!(drill.composition[0].value, dec!(1000));
    assert_eq!(drill.composition[0].percentage, dec!(66.67));
    assert_eq!(drill.composition[2].value, Decimal::ZERO);
    assert_eq!(drill.composition[2].percentage, Decimal::ZERO);

    let sum: Decimal = drill.composition.iter().map(|s| s.percentage).sum();
    assert!((sum - Decimal::ONE_HUNDRED).abs() <= dec!(0.1));

    // "Outros" offered exactly once, last
    assert_eq!(
        drill.categories,
        vec!["Ações", "FIIs", "Renda Fixa", "Outros"]
    );
}

#[test]
fn test_drill_named_filter_lists_tickers() {
    let drill = fixture_dashboard()
        .composition_drill(CategoryLevel::Macro, "Ações")
        .unwrap();

    assert_eq!(drill.composition.len(), 1);
    assert_eq!(drill.composition[0].name, "PETR4");
    assert_eq!(drill.composition[0].percentage, dec!(100.00));
    assert_eq!(drill.current_filter, "Ações");
}

#[test]
fn test_drill_scenario_single_asset_all_of_total() {
    // Category map with only PETR4; XYZ3 resolves to Outros with zero value
    let mut store = MemoryStore::new();
    store.insert_collection(
        collections::ASSETS,
        vec![
            json!({"ticker": "PETR4", "total_market_value": 1000}),
            json!({"ticker": "XYZ3", "total_market_value": 0}),
        ],
    );
    store.insert_collection(
        collections::ASSET_CATEGORIES,
        vec![json!({"ticker": "PETR4", "macro_category": "Ações"})],
    );
    let dashboard = Dashboard::new(store).with_as_of(as_of());

    let drill = dashboard
        .composition_drill(CategoryLevel::Macro, "all")
        .unwrap();
    assert_eq!(drill.composition.len(), 2);
    assert_eq!(drill.composition[0].name, "Ações");
    assert_eq!(drill.composition[0].value, dec!(1000));
    assert_eq!(drill.composition[0].percentage, dec!(100.00));
    assert_eq!(drill.composition[1].name, "Outros");
    assert_eq!(drill.composition[1].value, Decimal::ZERO);
    assert_eq!(drill.composition[1].percentage, Decimal::ZERO);
}

#[test]
fn test_zero_total_composition_is_all_zero() {
    let mut store = MemoryStore::new();
    store.insert_collection(
        collections::ASSETS,
        vec![
            json!({"ticker": "PETR4", "total_market_value": 0}),
            json!({"ticker": "XYZ3"}),
        ],
    );
    store.insert_collection(collections::ASSET_CATEGORIES, Vec::new());
    let dashboard = Dashboard::new(store).with_as_of(as_of());

    let drill = dashboard
        .composition_drill(CategoryLevel::Macro, "all")
        .unwrap();
    assert!(drill
        .composition
        .iter()
        .all(|s| s.percentage == Decimal::ZERO));
}

#[test]
fn test_composition_by_location_respects_market_filter() {
    let dashboard = fixture_dashboard();

    let all = dashboard
        .composition_by_location(MarketFilter::All)
        .unwrap();
    assert_eq!(all.brazil, dec!(1500));
    assert_eq!(all.external, Decimal::ZERO);

    let brazil = dashboard
        .composition_by_location(MarketFilter::Brazil)
        .unwrap();
    assert_eq!(brazil.brazil, dec!(1500));
    assert_eq!(brazil.market_filter, "BR");
}

#[test]
fn test_composition_multi_category_skips_absent_deep_levels() {
    let multi = fixture_dashboard().composition_multi_category().unwrap();

    // Every asset resolves at the macro level
    let macro_total: Decimal = multi.macro_category.iter().map(|s| s.value).sum();
    assert_eq!(macro_total, dec!(1500));

    // No fixture has L2/L3 labels
    assert!(multi.category_l2.is_empty());
    assert!(multi.category_l3.is_empty());
}

#[test]
fn test_portfolio_details_joins_categories() {
    let details = fixture_dashboard().portfolio_details().unwrap();

    let petr = details.iter().find(|d| d.ticker == "PETR4").unwrap();
    assert_eq!(petr.category, "Ações BR");
    assert_eq!(petr.location, "BR");

    let xyz = details.iter().find(|d| d.ticker == "XYZ3").unwrap();
    assert_eq!(xyz.category, "Outros");
    assert_eq!(xyz.location, "BR");
}

#[test]
fn test_portfolio_evolution_is_ordered_by_date() {
    let evolution = fixture_dashboard().portfolio_evolution().unwrap();
    assert_eq!(evolution.len(), 2);
    assert_eq!(evolution[0].reference_date.as_deref(), Some("2024-01-31"));
    assert_eq!(evolution[1].total_value, Some(dec!(1100)));
}

// =============================================================================
// Transactions
// =============================================================================

#[test]
fn test_monthly_contributions_scenario() {
    let totals = fixture_dashboard().monthly_contributions().unwrap();

    assert_eq!(totals.get("2024-01"), Some(dec!(60.00)));
    // Includes the fixed-income purchase: contributions do not exclude it
    assert_eq!(totals.get("2024-02"), Some(dec!(6500.00)));
    assert_eq!(totals.get("2024-06"), Some(dec!(200.00)));
}

#[test]
fn test_monthly_purchases_excludes_fixed_income() {
    let totals = fixture_dashboard().monthly_purchases().unwrap();

    assert_eq!(totals.get("2024-02"), Some(dec!(5500.00)));
    assert_eq!(totals.get("2024-01"), Some(dec!(60.00)));
}

#[test]
fn test_monthly_sales_series() {
    let totals = fixture_dashboard().monthly_sales().unwrap();
    assert_eq!(totals.get("2024-03"), Some(dec!(30.00)));
    assert_eq!(totals.len(), 1);
}

#[test]
fn test_monthly_investment_for_current_month() {
    let investment = fixture_dashboard().monthly_investment().unwrap();
    assert_eq!(investment.monthly_investment, dec!(200.00));
}

#[test]
fn test_yearly_investment_average_uses_distinct_months() {
    let mut store = fixture_store();
    store.insert_collection(
        collections::TRANSACTIONS,
        vec![
            json!({"ticker": "PETR4", "type": "Compra",
                   "transaction_date": "2024-01-10", "total_value": 100.00}),
            json!({"ticker": "PETR4", "type": "Compra",
                   "transaction_date": "2024-03-05", "total_value": 200.00}),
        ],
    );
    let dashboard = Dashboard::new(store).with_as_of(as_of());

    let averages = dashboard.yearly_investment_average().unwrap();
    assert_eq!(averages.len(), 1);
    assert_eq!(averages[0].total, dec!(300.00));
    assert_eq!(averages[0].months, 2);
    // Divided by 2 contributing months, not 3 elapsed ones
    assert_eq!(averages[0].average, dec!(150.00));
}

#[test]
fn test_recent_transactions_limited_to_current_month() {
    let recent = fixture_dashboard().recent_transactions().unwrap();
    assert_eq!(recent.len(), 1);
    assert_eq!(recent[0].transaction_date.as_deref(), Some("2024-06-01"));
}

#[test]
fn test_transactions_paginated_with_filters() {
    let dashboard = fixture_dashboard();

    let page = dashboard
        .transactions_paginated(1, 2, Some("Compra"), None)
        .unwrap();
    assert_eq!(page.total, 4);
    assert_eq!(page.total_pages, 2);
    assert_eq!(page.data.len(), 2);
    // Newest first
    assert_eq!(page.data[0].transaction_date.as_deref(), Some("2024-06-01"));

    let by_ticker = dashboard
        .transactions_paginated(1, 10, None, Some("hglg"))
        .unwrap();
    assert_eq!(by_ticker.total, 1);
}

// =============================================================================
// Performance
// =============================================================================

#[test]
fn test_performance_enriches_assets_with_dividends() {
    let report = fixture_dashboard().performance("asset").unwrap();

    assert_eq!(report.data.len(), 1);
    let petr = &report.data[0];
    // All PETR4 dividends regardless of status: 125.30 + 40.00
    assert_eq!(petr.total_dividends, Some(dec!(165.30)));
    assert_eq!(petr.total_profit_with_dividends, Some(dec!(365.30)));

    let summary = report.summary.as_ref().unwrap();
    assert_eq!(summary.aggregation_label, "total");
}

#[test]
fn test_performance_unknown_type_falls_back_to_asset() {
    let report = fixture_dashboard().performance("galaxy").unwrap();
    assert_eq!(report.aggregation_type, "asset");
}

// =============================================================================
// Memoization and failure propagation
// =============================================================================

#[test]
fn test_repeated_derivations_hit_the_cache() {
    let fetches = Rc::new(Cell::new(0));
    let store = CountingStore {
        inner: fixture_store(),
        fetches: Rc::clone(&fetches),
    };
    let dashboard = Dashboard::new(store).with_as_of(as_of());

    let first = dashboard.dividends_monthly().unwrap();
    let fetches_after_first = fetches.get();
    let second = dashboard.dividends_monthly().unwrap();

    // The second call served from cache without touching the store
    assert_eq!(fetches.get(), fetches_after_first);
    assert_eq!(first.get("2024-03"), second.get("2024-03"));
    assert_eq!(dashboard.cached_entries(), 1);
}

#[test]
fn test_upstream_failure_is_retryable_and_uncached() {
    let dashboard = Dashboard::new(FailingStore).with_as_of(as_of());

    let err = dashboard.summary().unwrap_err();
    assert!(err.is_retryable());
    assert!(matches!(err, DashboardError::Upstream(_)));
    // The failed derivation left no cache entry
    assert_eq!(dashboard.cached_entries(), 0);
}
