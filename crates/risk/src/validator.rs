//! The pre-trade risk validator
//!
//! Checks run in a fixed order and short-circuit on the first failure:
//! (a) instrument allow/deny lists, (b) per-order notional,
//! (c) resulting position size, (d) rolling-minute order rate,
//! (e) minimum lot, (f) aggregate exposure fraction.

use chrono::Duration;
use log::warn;
use meridian_core::{Order, Position, Timestamp};
use rust_decimal::Decimal;

use crate::limits::RiskLimits;

/// Which check produced a rejection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiskCheck {
    InstrumentDenied,
    InstrumentNotAllowed,
    NotionalLimit,
    PositionLimit,
    OrderRate,
    MinLot,
    ExposureLimit,
}

/// A rejection with its failing check and a human-readable message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RiskRejection {
    pub check: RiskCheck,
    pub message: String,
}

/// Accept, or reject with a reason
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RiskDecision {
    Accept,
    Reject(RiskRejection),
}

impl RiskDecision {
    pub fn is_accept(&self) -> bool {
        matches!(self, RiskDecision::Accept)
    }

    fn reject(check: RiskCheck, message: String) -> Self {
        warn!("[risk] rejected ({check:?}): {message}");
        RiskDecision::Reject(RiskRejection { check, message })
    }
}

/// Validates candidate orders against configured limits
///
/// Stateless and side-effect free: it only reads the snapshot it is
/// given. The caller records the timestamps of accepted orders that feed
/// the rolling-window check.
pub struct RiskValidator {
    limits: RiskLimits,
}

impl RiskValidator {
    pub fn new(limits: RiskLimits) -> Self {
        Self { limits }
    }

    pub fn limits(&self) -> &RiskLimits {
        &self.limits
    }

    /// Validate one candidate order
    ///
    /// `positions` is the snapshot of the requesting agent's open
    /// positions; `recent_order_timestamps` holds the agent's accepted
    /// order times (any order; stale entries are ignored here).
    pub fn validate(
        &self,
        order: &Order,
        reference_price: Decimal,
        positions: &[Position],
        recent_order_timestamps: &[Timestamp],
        now: Timestamp,
    ) -> RiskDecision {
        // (a) instrument allow/deny lists
        if self.limits.denied_instruments.contains(&order.instrument_id) {
            return RiskDecision::reject(
                RiskCheck::InstrumentDenied,
                format!("instrument {} is denied", order.instrument_id),
            );
        }
        if !self.limits.allowed_instruments.is_empty()
            && !self.limits.allowed_instruments.contains(&order.instrument_id)
        {
            return RiskDecision::reject(
                RiskCheck::InstrumentNotAllowed,
                format!("instrument {} is not on the allow list", order.instrument_id),
            );
        }

        // (b) per-order notional cap
        let order_notional = (order.quantity * reference_price).abs();
        if order_notional > self.limits.max_notional_per_order {
            return RiskDecision::reject(
                RiskCheck::NotionalLimit,
                format!(
                    "order notional {} exceeds limit {}",
                    order_notional, self.limits.max_notional_per_order
                ),
            );
        }

        // (c) resulting signed position cap
        let current = positions
            .iter()
            .find(|p| p.instrument_id == order.instrument_id)
            .map(|p| p.quantity)
            .unwrap_or(Decimal::ZERO);
        let resulting = current + order.side.signed(order.quantity);
        if resulting.abs() > self.limits.max_position_size_per_instrument {
            return RiskDecision::reject(
                RiskCheck::PositionLimit,
                format!(
                    "resulting position {} for {} exceeds limit {}",
                    resulting, order.instrument_id, self.limits.max_position_size_per_instrument
                ),
            );
        }

        // (d) rolling-minute order rate
        let window_start = now - Duration::seconds(60);
        let recent = recent_order_timestamps
            .iter()
            .filter(|t| **t > window_start && **t <= now)
            .count();
        if recent >= self.limits.max_orders_per_rolling_minute {
            return RiskDecision::reject(
                RiskCheck::OrderRate,
                format!(
                    "too many orders: {} in trailing 60s (limit {})",
                    recent, self.limits.max_orders_per_rolling_minute
                ),
            );
        }

        // (e) minimum lot
        if order.quantity < self.limits.min_lot {
            return RiskDecision::reject(
                RiskCheck::MinLot,
                format!(
                    "quantity {} below minimum lot {}",
                    order.quantity, self.limits.min_lot
                ),
            );
        }

        // (f) aggregate exposure fraction, at book value for open positions
        let open_notional: Decimal = positions
            .iter()
            .map(|p| p.quantity.abs() * p.avg_entry_price)
            .sum();
        let total = open_notional + order_notional;
        if total > self.limits.max_total_notional() {
            return RiskDecision::reject(
                RiskCheck::ExposureLimit,
                format!(
                    "aggregate notional {} exceeds {} ({} x equity {})",
                    total,
                    self.limits.max_total_notional(),
                    self.limits.max_total_risk_fraction,
                    self.limits.account_equity
                ),
            );
        }

        RiskDecision::Accept
    }
}
