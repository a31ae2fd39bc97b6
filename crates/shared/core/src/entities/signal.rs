use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::Side;
use crate::instrument::InstrumentId;

/// Why an exit signal closes its position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExitReason {
    StopLoss,
    TakeProfit,
    Manual,
}

/// Whether a signal opens a position or closes one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignalIntent {
    Entry,
    Exit(ExitReason),
}

/// A candidate trade proposed by an agent
///
/// Ephemeral: produced each cycle, consumed immediately or discarded.
/// Only the orders it generates reach the audit trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub agent_id: String,
    pub instrument_id: InstrumentId,
    pub side: Side,
    /// Model confidence, clamped to [0, 1]
    pub confidence: Decimal,
    pub entry_price: Decimal,
    pub stop_loss: Decimal,
    pub take_profit: Decimal,
    /// Unsigned quantity to trade
    pub position_size: Decimal,
    /// Money at risk if the stop is hit: |entry - stop| * size
    pub risk_amount: Decimal,
    /// Money gained if the target is hit: |target - entry| * size
    pub expected_reward: Decimal,
    pub intent: SignalIntent,
}

impl Signal {
    pub fn entry(
        agent_id: impl Into<String>,
        instrument_id: impl Into<InstrumentId>,
        side: Side,
        confidence: Decimal,
    ) -> Self {
        Self {
            agent_id: agent_id.into(),
            instrument_id: instrument_id.into(),
            side,
            confidence: confidence.clamp(Decimal::ZERO, Decimal::ONE),
            entry_price: Decimal::ZERO,
            stop_loss: Decimal::ZERO,
            take_profit: Decimal::ZERO,
            position_size: Decimal::ZERO,
            risk_amount: Decimal::ZERO,
            expected_reward: Decimal::ZERO,
            intent: SignalIntent::Entry,
        }
    }

    /// A full-close exit for an open position: side inverted, quantity
    /// equal to the open quantity
    pub fn exit(
        agent_id: impl Into<String>,
        instrument_id: impl Into<InstrumentId>,
        closing_side: Side,
        quantity: Decimal,
        reason: ExitReason,
    ) -> Self {
        Self {
            agent_id: agent_id.into(),
            instrument_id: instrument_id.into(),
            side: closing_side,
            confidence: Decimal::ONE,
            entry_price: Decimal::ZERO,
            stop_loss: Decimal::ZERO,
            take_profit: Decimal::ZERO,
            position_size: quantity,
            risk_amount: Decimal::ZERO,
            expected_reward: Decimal::ZERO,
            intent: SignalIntent::Exit(reason),
        }
    }

    /// Builder: set entry, stop, and target prices
    pub fn with_levels(mut self, entry: Decimal, stop: Decimal, target: Decimal) -> Self {
        self.entry_price = entry;
        self.stop_loss = stop;
        self.take_profit = target;
        self
    }

    /// Builder: set size and derived risk/reward amounts
    pub fn with_size(mut self, size: Decimal) -> Self {
        self.position_size = size;
        self.risk_amount = (self.entry_price - self.stop_loss).abs() * size;
        self.expected_reward = (self.take_profit - self.entry_price).abs() * size;
        self
    }

    /// Reward per unit of risk; zero when no risk is defined
    pub fn risk_reward_ratio(&self) -> Decimal {
        if self.risk_amount.is_zero() {
            Decimal::ZERO
        } else {
            self.expected_reward / self.risk_amount
        }
    }

    pub fn is_exit(&self) -> bool {
        matches!(self.intent, SignalIntent::Exit(_))
    }
}
