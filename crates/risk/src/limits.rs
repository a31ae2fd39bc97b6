//! Risk limit configuration
//!
//! Loaded once per orchestrator lifetime and read-only during a cycle.

use std::collections::HashSet;

use meridian_core::InstrumentId;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Hard limits the validator enforces on every candidate order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskLimits {
    /// Maximum notional value (quantity x reference price) per order
    pub max_notional_per_order: Decimal,
    /// Maximum absolute signed position per (agent, instrument)
    pub max_position_size_per_instrument: Decimal,
    /// Cap on aggregate open notional as a fraction of account equity
    pub max_total_risk_fraction: Decimal,
    /// Account equity the total-risk fraction is measured against
    pub account_equity: Decimal,
    /// Maximum accepted orders per agent in a trailing 60s window
    pub max_orders_per_rolling_minute: usize,
    /// Minimum order quantity
    pub min_lot: Decimal,
    /// If non-empty, only these instruments may trade
    pub allowed_instruments: HashSet<InstrumentId>,
    /// These instruments may never trade
    pub denied_instruments: HashSet<InstrumentId>,
}

impl Default for RiskLimits {
    fn default() -> Self {
        Self {
            max_notional_per_order: dec!(50_000),
            max_position_size_per_instrument: dec!(1_000),
            max_total_risk_fraction: dec!(0.5),
            account_equity: dec!(100_000),
            max_orders_per_rolling_minute: 30,
            min_lot: dec!(1),
            allowed_instruments: HashSet::new(),
            denied_instruments: HashSet::new(),
        }
    }
}

impl RiskLimits {
    /// Whether the instrument passes the allow/deny lists
    pub fn instrument_permitted(&self, instrument_id: &InstrumentId) -> bool {
        if self.denied_instruments.contains(instrument_id) {
            return false;
        }
        self.allowed_instruments.is_empty() || self.allowed_instruments.contains(instrument_id)
    }

    /// Aggregate notional ceiling derived from equity and risk fraction
    pub fn max_total_notional(&self) -> Decimal {
        self.account_equity * self.max_total_risk_fraction
    }
}
