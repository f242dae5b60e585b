//! Prometheus metrics for the holdings ledger.
//!
//! Covers:
//! - Claims granted (full/partial) and rejected
//! - Releases by kind (free/pending/reduce)
//! - Reconciliation runs and invalid-holdings detections
//! - Waiting deliveries
//! - Free balance per holding
//!
//! # Panics
//!
//! Metric registration uses `unwrap()`. A registration failure means a
//! duplicate metric name, which is a programming error caught on first use.

use once_cell::sync::Lazy;
use prometheus::{register_counter_vec, register_gauge_vec, CounterVec, GaugeVec};

/// Claims granted against a holding.
/// Labels: exchange, outcome (full/partial)
pub static CLAIMS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "vault_claims_total",
        "Total claims granted",
        &["exchange", "outcome"]
    )
    .unwrap()
});

/// Claims refused.
/// Labels: exchange, reason (no_balance/exceeds_holdings)
pub static CLAIMS_REJECTED_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "vault_claims_rejected_total",
        "Total claims rejected",
        &["exchange", "reason"]
    )
    .unwrap()
});

/// Claims leaving the active set.
/// Labels: exchange, kind (free/pending/reduce)
pub static RELEASES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "vault_releases_total",
        "Total claims released",
        &["exchange", "kind"]
    )
    .unwrap()
});

/// Reconciliation runs against an exchange snapshot.
pub static RECONCILIATIONS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "vault_reconciliations_total",
        "Total balance reconciliations",
        &["exchange"]
    )
    .unwrap()
});

/// Reconciliations that left free balance negative.
pub static INVALID_HOLDINGS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "vault_invalid_holdings_total",
        "Total reconciliations resulting in negative free balance",
        &["exchange"]
    )
    .unwrap()
});

/// Waiting requests satisfied with a fresh claim.
pub static WAITING_DELIVERED_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "vault_waiting_delivered_total",
        "Total waiting requests satisfied",
        &["exchange"]
    )
    .unwrap()
});

/// Free balance per holding.
pub static HOLDING_FREE: Lazy<GaugeVec> = Lazy::new(|| {
    register_gauge_vec!(
        "vault_holding_free",
        "Free balance available for new claims",
        &["exchange", "account", "asset", "currency"]
    )
    .unwrap()
});

/// Metrics facade.
pub struct Metrics;

impl Metrics {
    /// Record a granted claim.
    pub fn claim_granted(exchange: &str, partial: bool) {
        let outcome = if partial { "partial" } else { "full" };
        CLAIMS_TOTAL.with_label_values(&[exchange, outcome]).inc();
    }

    /// Record a refused claim.
    pub fn claim_rejected(exchange: &str, reason: &str) {
        CLAIMS_REJECTED_TOTAL
            .with_label_values(&[exchange, reason])
            .inc();
    }

    /// Record a claim leaving the active set.
    pub fn claim_released(exchange: &str, kind: &str) {
        RELEASES_TOTAL.with_label_values(&[exchange, kind]).inc();
    }

    /// Record a reconciliation run.
    pub fn reconciliation(exchange: &str) {
        RECONCILIATIONS_TOTAL.with_label_values(&[exchange]).inc();
    }

    /// Record a negative free balance after reconciliation.
    pub fn invalid_holdings(exchange: &str) {
        INVALID_HOLDINGS_TOTAL.with_label_values(&[exchange]).inc();
    }

    /// Record a waiting request satisfied.
    pub fn waiting_delivered(exchange: &str) {
        WAITING_DELIVERED_TOTAL.with_label_values(&[exchange]).inc();
    }

    /// Set the free balance gauge for a holding.
    pub fn holding_free(exchange: &str, account: &str, asset: &str, currency: &str, free: f64) {
        HOLDING_FREE
            .with_label_values(&[exchange, account, asset, currency])
            .set(free);
    }
}
