use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Order, OrderId, TradeRecord};

/// One entry in the append-only audit trail
///
/// Every submit and cancel is recorded before its result is returned to
/// the caller, so the full order/position state can be reconstructed
/// from the log alone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    /// Monotonic sequence number assigned by the order book
    pub seq: u64,
    pub recorded_at: DateTime<Utc>,
    pub event: AuditEvent,
}

/// Order lifecycle events, in the order the gateway emits them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AuditEvent {
    /// Submission requested; the order is in `Pending` state
    SubmitRequested { order: Order },
    /// Risk validation rejected the order
    RiskRejected { order_id: OrderId, reason: String },
    /// Risk validation accepted; the order was forwarded to the venue
    Submitted { order_id: OrderId },
    /// The venue filled all or part of the order
    Fill { trade: TradeRecord },
    /// The venue left the order working (e.g. limit not reached)
    VenuePending { order_id: OrderId, reason: String },
    /// The venue rejected the order (includes timeouts)
    VenueRejected { order_id: OrderId, reason: String },
    /// Cancellation requested
    CancelRequested { order_id: OrderId },
    /// The order was cancelled
    Cancelled { order_id: OrderId },
    /// Cancellation refused (terminal or already filled)
    CancelRejected { order_id: OrderId, reason: String },
}

impl AuditEvent {
    /// The order this event is attributed to
    pub fn order_id(&self) -> OrderId {
        match self {
            AuditEvent::SubmitRequested { order } => order.id,
            AuditEvent::RiskRejected { order_id, .. }
            | AuditEvent::Submitted { order_id }
            | AuditEvent::VenuePending { order_id, .. }
            | AuditEvent::VenueRejected { order_id, .. }
            | AuditEvent::CancelRequested { order_id }
            | AuditEvent::Cancelled { order_id }
            | AuditEvent::CancelRejected { order_id, .. } => *order_id,
            AuditEvent::Fill { trade } => trade.order_id,
        }
    }
}
