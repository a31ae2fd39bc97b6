//! Order book errors
//!
//! Every failure is attributed to a specific order, never aggregated
//! into an opaque error. `Validation` covers risk-limit breaches
//! (recoverable), `VenueRejected`/`VenueTimeout`/`Venue` cover execution
//! backend failures (recoverable, order marked Rejected), `NoMarketData`
//! blocks the affected instrument only, and `NotCancellable`/
//! `IllegalTransition` are contract violations surfaced to the caller.

use meridian_core::{InstrumentId, OrderId, OrderStatus};
use meridian_ports::{PersistenceError, VenueError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("validation failed for order {order_id}: {reason}")]
    Validation { order_id: OrderId, reason: String },

    #[error("no market data for {instrument_id} (order {order_id})")]
    NoMarketData {
        order_id: OrderId,
        instrument_id: InstrumentId,
    },

    #[error("venue rejected order {order_id}: {reason}")]
    VenueRejected { order_id: OrderId, reason: String },

    #[error("venue timeout for order {order_id}")]
    VenueTimeout { order_id: OrderId },

    #[error("venue error for order {order_id}: {source}")]
    Venue {
        order_id: OrderId,
        source: VenueError,
    },

    #[error("order {0} not found")]
    UnknownOrder(OrderId),

    #[error("order {order_id} is not cancellable: {reason}")]
    NotCancellable { order_id: OrderId, reason: String },

    #[error("illegal status transition for order {order_id}: {from} -> {to}")]
    IllegalTransition {
        order_id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
    },

    #[error("persistence error: {0}")]
    Persistence(#[from] PersistenceError),
}

pub type Result<T> = std::result::Result<T, Error>;
