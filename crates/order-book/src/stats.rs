use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Read-only aggregates over the order and trade state
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionStats {
    /// Orders that reached the book (any outcome)
    pub orders_submitted: u64,
    pub orders_filled: u64,
    pub orders_rejected: u64,
    pub orders_cancelled: u64,
    /// Orders still working at the venue
    pub working_orders: u64,
    pub total_fills: u64,
    /// Total unsigned quantity traded
    pub total_volume: Decimal,
    pub total_commission: Decimal,
    /// Realized P&L across all closed portions, before commissions
    pub realized_pnl: Decimal,
    pub open_positions: u64,
}
