use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{OrderId, Side};
use crate::instrument::InstrumentId;

/// Unique identifier for a trade record
pub type TradeId = Uuid;

/// Immutable audit record of one fill
///
/// One record per completed fill, linking the order to its execution
/// details and the resulting position delta. Never mutated after write;
/// the audit trail of these records replays to the live position state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub id: TradeId,
    pub order_id: OrderId,
    pub agent_id: String,
    pub instrument_id: InstrumentId,
    pub side: Side,
    pub quantity: Decimal,
    pub price: Decimal,
    pub commission: Decimal,
    /// Signed change applied to the (agent, instrument) position
    pub position_delta: Decimal,
    /// Realized P&L attributed to this fill (zero on opens)
    pub realized_pnl: Decimal,
    pub executed_at: DateTime<Utc>,
}

impl TradeRecord {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        order_id: OrderId,
        agent_id: impl Into<String>,
        instrument_id: impl Into<InstrumentId>,
        side: Side,
        quantity: Decimal,
        price: Decimal,
        commission: Decimal,
        realized_pnl: Decimal,
        executed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            order_id,
            agent_id: agent_id.into(),
            instrument_id: instrument_id.into(),
            side,
            quantity,
            price,
            commission,
            position_delta: side.signed(quantity),
            realized_pnl,
            executed_at,
        }
    }

    /// Notional value of the fill
    pub fn notional(&self) -> Decimal {
        self.price * self.quantity
    }
}
