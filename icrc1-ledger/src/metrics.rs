//! Metrics collection for observability
//!
//! This module provides Prometheus metrics for monitoring the ledger.
//!
//! # Metrics
//!
//! - `icrc1_transfers_total` - Total number of applied transfers
//! - `icrc1_transfer_errors_total{reason}` - Rejected transfers by reason
//! - `icrc1_transferred_tokens_total` - Sum of transferred amounts
//! - `icrc1_accounts` - Number of materialized balance entries
//! - `icrc1_halted` - 1 once the ledger halted on an invariant fault

use prometheus::{IntCounter, IntCounterVec, IntGauge, Opts, Registry};
use std::fmt;
use std::sync::Arc;

/// Metrics collector
#[derive(Clone)]
pub struct Metrics {
    /// Applied transfers
    pub transfers_total: IntCounter,

    /// Rejected transfers by reason
    pub transfer_errors: IntCounterVec,

    /// Transferred tokens (saturating at u64::MAX)
    pub transferred_tokens: IntCounter,

    /// Materialized balance entries
    pub accounts: IntGauge,

    /// Halt flag
    pub halted: IntGauge,

    /// Prometheus registry
    pub registry: Arc<Registry>,
}

impl Metrics {
    /// Create new metrics collector with its own registry
    pub fn new() -> prometheus::Result<Self> {
        let registry = Arc::new(Registry::new());

        let transfers_total =
            IntCounter::new("icrc1_transfers_total", "Total number of applied transfers")?;
        registry.register(Box::new(transfers_total.clone()))?;

        let transfer_errors = IntCounterVec::new(
            Opts::new("icrc1_transfer_errors_total", "Rejected transfers by reason"),
            &["reason"],
        )?;
        registry.register(Box::new(transfer_errors.clone()))?;

        let transferred_tokens = IntCounter::new(
            "icrc1_transferred_tokens_total",
            "Sum of transferred amounts in atomic units",
        )?;
        registry.register(Box::new(transferred_tokens.clone()))?;

        let accounts = IntGauge::new("icrc1_accounts", "Number of materialized balance entries")?;
        registry.register(Box::new(accounts.clone()))?;

        let halted = IntGauge::new("icrc1_halted", "1 once the ledger halted")?;
        registry.register(Box::new(halted.clone()))?;

        Ok(Self {
            transfers_total,
            transfer_errors,
            transferred_tokens,
            accounts,
            halted,
            registry,
        })
    }

    /// Record an applied transfer
    pub fn record_transfer(&self, amount: u128, accounts: usize) {
        self.transfers_total.inc();
        self.transferred_tokens
            .inc_by(u64::try_from(amount).unwrap_or(u64::MAX));
        self.accounts.set(i64::try_from(accounts).unwrap_or(i64::MAX));
    }

    /// Record a rejected transfer
    pub fn record_rejection(&self, reason: &str) {
        self.transfer_errors.with_label_values(&[reason]).inc();
    }

    /// Record the halt
    pub fn record_halt(&self) {
        self.halted.set(1);
    }

    /// Get metrics registry
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}

impl fmt::Debug for Metrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Metrics")
            .field("transfers_total", &self.transfers_total.get())
            .field("transferred_tokens", &self.transferred_tokens.get())
            .field("accounts", &self.accounts.get())
            .field("halted", &self.halted.get())
            .finish_non_exhaustive()
    }
}
