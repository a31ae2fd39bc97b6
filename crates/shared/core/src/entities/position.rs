use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::Signed;
use serde::{Deserialize, Serialize};

use super::Side;
use crate::instrument::InstrumentId;

/// Positions are keyed per (agent, instrument)
pub type PositionKey = (String, InstrumentId);

/// Net position for one (agent, instrument) pair
///
/// Quantity is signed: positive = long, negative = short. Owned
/// exclusively by the order book; everyone else sees cloned snapshots.
/// Every field is derived from the fill stream, so replaying the audit
/// log reproduces positions exactly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub agent_id: String,
    pub instrument_id: InstrumentId,
    /// Signed quantity (positive = long, negative = short)
    pub quantity: Decimal,
    /// Volume-weighted average entry price
    pub avg_entry_price: Decimal,
    /// Realized P&L from closed portions, net of nothing (commissions
    /// are tracked separately in `total_commission`)
    pub realized_pnl: Decimal,
    pub total_commission: Decimal,
    pub fill_count: u64,
    pub opened_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Position {
    /// Create an empty position for a key
    pub fn new(
        agent_id: impl Into<String>,
        instrument_id: impl Into<InstrumentId>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            agent_id: agent_id.into(),
            instrument_id: instrument_id.into(),
            quantity: Decimal::ZERO,
            avg_entry_price: Decimal::ZERO,
            realized_pnl: Decimal::ZERO,
            total_commission: Decimal::ZERO,
            fill_count: 0,
            opened_at: timestamp,
            updated_at: timestamp,
        }
    }

    /// Apply a fill to this position, returning realized P&L from this fill
    ///
    /// Adding to a position updates the weighted average entry; reducing
    /// realizes P&L against the average entry; crossing through zero
    /// resets the average entry to the fill price for the residual.
    pub fn apply_fill(
        &mut self,
        side: Side,
        quantity: Decimal,
        price: Decimal,
        commission: Decimal,
        timestamp: DateTime<Utc>,
    ) -> Decimal {
        let signed_qty = side.signed(quantity);
        let mut realized_pnl = Decimal::ZERO;

        // Realize P&L on the closing portion
        if (self.quantity > Decimal::ZERO && signed_qty < Decimal::ZERO)
            || (self.quantity < Decimal::ZERO && signed_qty > Decimal::ZERO)
        {
            let close_qty = signed_qty.abs().min(self.quantity.abs());
            realized_pnl = if self.quantity > Decimal::ZERO {
                close_qty * (price - self.avg_entry_price)
            } else {
                close_qty * (self.avg_entry_price - price)
            };
        }

        let new_quantity = self.quantity + signed_qty;

        if new_quantity.is_zero() {
            self.avg_entry_price = Decimal::ZERO;
        } else if (self.quantity >= Decimal::ZERO && signed_qty > Decimal::ZERO)
            || (self.quantity <= Decimal::ZERO && signed_qty < Decimal::ZERO)
        {
            // Adding to the position: weighted average entry
            let total_cost = self.quantity.abs() * self.avg_entry_price + quantity * price;
            self.avg_entry_price = total_cost / new_quantity.abs();
        } else if new_quantity.signum() != self.quantity.signum() {
            // Flipped through zero: residual opens at the fill price
            self.avg_entry_price = price;
        }
        // Reducing without flipping keeps the average entry

        self.quantity = new_quantity;
        self.realized_pnl += realized_pnl;
        self.total_commission += commission;
        self.fill_count += 1;
        self.updated_at = timestamp;

        realized_pnl
    }

    /// Unrealized P&L at a mark price
    pub fn unrealized_pnl(&self, mark_price: Decimal) -> Decimal {
        self.quantity * (mark_price - self.avg_entry_price)
    }

    /// Notional exposure at a mark price
    pub fn notional(&self, mark_price: Decimal) -> Decimal {
        self.quantity.abs() * mark_price
    }

    pub fn is_long(&self) -> bool {
        self.quantity > Decimal::ZERO
    }

    pub fn is_short(&self) -> bool {
        self.quantity < Decimal::ZERO
    }

    /// Whether the position has returned to (near) zero and can be removed
    pub fn is_flat(&self) -> bool {
        self.quantity.abs() < Decimal::new(1, 9)
    }
}
