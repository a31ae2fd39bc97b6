//! Audit log replay
//!
//! Folds the append-only audit trail back into live state. The fold is
//! pure: replaying the same records always yields the same orders,
//! positions, and trades, which is how the book recovers after a
//! restart and how reconciliation tests verify the live state.

use std::collections::{HashMap, VecDeque};

use meridian_core::{
    AuditEvent, AuditRecord, Order, OrderId, OrderStatus, Position, PositionKey, Timestamp,
    TradeRecord,
};

/// State reconstructed from an audit log
#[derive(Debug, Default)]
pub struct ReplayState {
    pub orders: HashMap<OrderId, Order>,
    pub positions: HashMap<PositionKey, Position>,
    pub trades: Vec<TradeRecord>,
    /// Accepted-order timestamps per agent, feeding the rate limiter
    pub accepted_at: HashMap<String, VecDeque<Timestamp>>,
    pub next_seq: u64,
}

/// Fold audit records into state
///
/// Records are trusted: the book only appends events it has already
/// decided are legal, so the fold applies them without re-validating.
pub fn replay(records: &[AuditRecord]) -> ReplayState {
    let mut state = ReplayState::default();

    for record in records {
        state.next_seq = state.next_seq.max(record.seq + 1);
        match &record.event {
            AuditEvent::SubmitRequested { order } => {
                state.orders.insert(order.id, order.clone());
            }
            AuditEvent::RiskRejected { order_id, .. }
            | AuditEvent::VenueRejected { order_id, .. } => {
                if let Some(order) = state.orders.get_mut(order_id) {
                    order.status = OrderStatus::Rejected;
                    order.updated_at = record.recorded_at;
                }
            }
            AuditEvent::Submitted { order_id } => {
                if let Some(order) = state.orders.get_mut(order_id) {
                    order.status = OrderStatus::Submitted;
                    order.updated_at = record.recorded_at;
                    state
                        .accepted_at
                        .entry(order.agent_id.clone())
                        .or_default()
                        .push_back(record.recorded_at);
                }
            }
            AuditEvent::Fill { trade } => {
                apply_fill(&mut state, trade, record.recorded_at);
            }
            AuditEvent::Cancelled { order_id } => {
                if let Some(order) = state.orders.get_mut(order_id) {
                    order.status = OrderStatus::Cancelled;
                    order.updated_at = record.recorded_at;
                }
            }
            AuditEvent::VenuePending { .. }
            | AuditEvent::CancelRequested { .. }
            | AuditEvent::CancelRejected { .. } => {}
        }
    }

    state
}

fn apply_fill(state: &mut ReplayState, trade: &TradeRecord, recorded_at: Timestamp) {
    if let Some(order) = state.orders.get_mut(&trade.order_id) {
        order.record_fill(trade.quantity, trade.price, trade.commission, recorded_at);
        order.status = if order.is_filled() {
            OrderStatus::Filled
        } else {
            OrderStatus::PartiallyFilled
        };
    }

    let key: PositionKey = (trade.agent_id.clone(), trade.instrument_id.clone());
    let position = state.positions.entry(key.clone()).or_insert_with(|| {
        Position::new(trade.agent_id.clone(), trade.instrument_id.clone(), recorded_at)
    });
    position.apply_fill(
        trade.side,
        trade.quantity,
        trade.price,
        trade.commission,
        recorded_at,
    );
    if position.is_flat() {
        state.positions.remove(&key);
    }

    state.trades.push(trade.clone());
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use meridian_core::{OrderRequest, Side};
    use rust_decimal_macros::dec;

    fn records_for_filled_buy() -> (Vec<AuditRecord>, OrderId) {
        let now = Utc::now();
        let mut order = Order::from_request(
            OrderRequest::market("AAPL", Side::Buy, dec!(10), "agent-1"),
            now,
        );
        let order_id = order.id;
        order.status = OrderStatus::Pending;

        let trade = TradeRecord::new(
            order_id,
            "agent-1",
            "AAPL",
            Side::Buy,
            dec!(10),
            dec!(100),
            dec!(1),
            dec!(0),
            now,
        );

        let records = vec![
            AuditRecord {
                seq: 0,
                recorded_at: now,
                event: AuditEvent::SubmitRequested { order },
            },
            AuditRecord {
                seq: 1,
                recorded_at: now,
                event: AuditEvent::Submitted { order_id },
            },
            AuditRecord {
                seq: 2,
                recorded_at: now,
                event: AuditEvent::Fill { trade },
            },
        ];
        (records, order_id)
    }

    #[test]
    fn test_replay_rebuilds_filled_order() {
        let (records, order_id) = records_for_filled_buy();
        let state = replay(&records);

        let order = &state.orders[&order_id];
        assert_eq!(order.status, OrderStatus::Filled);
        assert_eq!(order.filled_quantity, dec!(10));
        assert_eq!(order.average_fill_price, dec!(100));

        let position = &state.positions[&("agent-1".to_string(), "AAPL".into())];
        assert_eq!(position.quantity, dec!(10));
        assert_eq!(state.trades.len(), 1);
        assert_eq!(state.next_seq, 3);
    }

    #[test]
    fn test_replay_is_idempotent() {
        let (records, _) = records_for_filled_buy();
        let a = replay(&records);
        let b = replay(&records);

        assert_eq!(a.orders, b.orders);
        assert_eq!(a.positions, b.positions);
        assert_eq!(a.trades, b.trades);
    }

    #[test]
    fn test_replay_tracks_accepted_timestamps() {
        let (records, _) = records_for_filled_buy();
        let state = replay(&records);
        assert_eq!(state.accepted_at["agent-1"].len(), 1);
    }
}
