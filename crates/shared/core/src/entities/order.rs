use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{OrderStatus, OrderType, Side};
use crate::instrument::InstrumentId;

/// Unique identifier for an order
pub type OrderId = Uuid;

/// A candidate order, before the gateway assigns it an id
///
/// Agents and operators build requests; the order book turns an accepted
/// request into an [`Order`] at submission time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRequest {
    pub instrument_id: InstrumentId,
    pub side: Side,
    pub quantity: Decimal,
    pub order_type: OrderType,
    pub limit_price: Option<Decimal>,
    pub stop_price: Option<Decimal>,
    /// Agent that originated the request
    pub agent_id: String,
    /// Free-form strategy attribution tag
    pub strategy_tag: String,
}

impl OrderRequest {
    /// Market order request
    pub fn market(
        instrument_id: impl Into<InstrumentId>,
        side: Side,
        quantity: Decimal,
        agent_id: impl Into<String>,
    ) -> Self {
        Self {
            instrument_id: instrument_id.into(),
            side,
            quantity,
            order_type: OrderType::Market,
            limit_price: None,
            stop_price: None,
            agent_id: agent_id.into(),
            strategy_tag: String::new(),
        }
    }

    /// Limit order request
    pub fn limit(
        instrument_id: impl Into<InstrumentId>,
        side: Side,
        quantity: Decimal,
        limit_price: Decimal,
        agent_id: impl Into<String>,
    ) -> Self {
        Self {
            instrument_id: instrument_id.into(),
            side,
            quantity,
            order_type: OrderType::Limit,
            limit_price: Some(limit_price),
            stop_price: None,
            agent_id: agent_id.into(),
            strategy_tag: String::new(),
        }
    }

    /// Builder: set the order type
    pub fn with_order_type(mut self, order_type: OrderType) -> Self {
        self.order_type = order_type;
        self
    }

    /// Builder: set the stop price
    pub fn with_stop_price(mut self, stop_price: Decimal) -> Self {
        self.stop_price = Some(stop_price);
        self
    }

    /// Builder: set the strategy tag
    pub fn with_strategy_tag(mut self, tag: impl Into<String>) -> Self {
        self.strategy_tag = tag.into();
        self
    }

    /// Validate the request based on order type requirements
    pub fn validate(&self) -> bool {
        if self.quantity <= Decimal::ZERO {
            return false;
        }
        match self.order_type {
            OrderType::Market => true,
            OrderType::Limit | OrderType::TakeProfit => self.limit_price.is_some(),
            OrderType::StopLoss => self.stop_price.is_some(),
        }
    }
}

/// Full order details, owned by the order book
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub instrument_id: InstrumentId,
    pub side: Side,
    pub quantity: Decimal,
    pub order_type: OrderType,
    /// Required for Limit and TakeProfit orders
    pub limit_price: Option<Decimal>,
    /// Required for StopLoss orders
    pub stop_price: Option<Decimal>,
    pub agent_id: String,
    pub strategy_tag: String,
    pub status: OrderStatus,
    pub filled_quantity: Decimal,
    /// Volume-weighted average fill price, zero until the first fill
    pub average_fill_price: Decimal,
    pub commission_paid: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Materialize a request into a pending order with a fresh id
    pub fn from_request(request: OrderRequest, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            instrument_id: request.instrument_id,
            side: request.side,
            quantity: request.quantity,
            order_type: request.order_type,
            limit_price: request.limit_price,
            stop_price: request.stop_price,
            agent_id: request.agent_id,
            strategy_tag: request.strategy_tag,
            status: OrderStatus::Pending,
            filled_quantity: Decimal::ZERO,
            average_fill_price: Decimal::ZERO,
            commission_paid: Decimal::ZERO,
            created_at: timestamp,
            updated_at: timestamp,
        }
    }

    /// Returns remaining quantity to be filled
    pub fn remaining_quantity(&self) -> Decimal {
        self.quantity - self.filled_quantity
    }

    /// Returns true if the order is completely filled
    pub fn is_filled(&self) -> bool {
        self.filled_quantity >= self.quantity
    }

    /// Notional value at a reference price
    pub fn notional(&self, reference_price: Decimal) -> Decimal {
        (self.quantity * reference_price).abs()
    }

    /// Record a fill, updating filled quantity, VWAP, and commission
    ///
    /// Callers are responsible for the status transition; this only
    /// maintains the fill aggregates and the `filled_quantity <= quantity`
    /// invariant (quantities are never over-applied).
    pub fn record_fill(
        &mut self,
        quantity: Decimal,
        price: Decimal,
        commission: Decimal,
        timestamp: DateTime<Utc>,
    ) {
        let applied = quantity.min(self.remaining_quantity());
        let filled_notional = self.average_fill_price * self.filled_quantity + price * applied;
        self.filled_quantity += applied;
        if self.filled_quantity > Decimal::ZERO {
            self.average_fill_price = filled_notional / self.filled_quantity;
        }
        self.commission_paid += commission;
        self.updated_at = timestamp;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn request() -> OrderRequest {
        OrderRequest::market("AAPL", Side::Buy, dec!(10), "agent-1")
    }

    #[test]
    fn test_request_validation() {
        assert!(request().validate());

        let no_price = OrderRequest {
            order_type: OrderType::Limit,
            ..request()
        };
        assert!(!no_price.validate());

        let zero_qty = OrderRequest {
            quantity: Decimal::ZERO,
            ..request()
        };
        assert!(!zero_qty.validate());
    }

    #[test]
    fn test_fill_vwap() {
        let mut order = Order::from_request(request(), Utc::now());
        order.status = OrderStatus::Submitted;

        order.record_fill(dec!(4), dec!(100), dec!(0.4), Utc::now());
        assert_eq!(order.filled_quantity, dec!(4));
        assert_eq!(order.average_fill_price, dec!(100));

        order.record_fill(dec!(6), dec!(110), dec!(0.66), Utc::now());
        assert_eq!(order.filled_quantity, dec!(10));
        // (4*100 + 6*110) / 10 = 106
        assert_eq!(order.average_fill_price, dec!(106));
        assert_eq!(order.commission_paid, dec!(1.06));
        assert!(order.is_filled());
    }

    #[test]
    fn test_fill_never_exceeds_quantity() {
        let mut order = Order::from_request(request(), Utc::now());
        order.record_fill(dec!(25), dec!(100), dec!(1), Utc::now());
        assert_eq!(order.filled_quantity, order.quantity);
        assert_eq!(order.remaining_quantity(), Decimal::ZERO);
    }
}
