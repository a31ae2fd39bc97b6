use async_trait::async_trait;
use meridian_core::{Order, Quote};
use rust_decimal::Decimal;

use crate::error::VenueError;

/// Result of presenting an order to the venue
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionOutcome {
    /// The venue executed `quantity` at `price`
    Filled {
        quantity: Decimal,
        price: Decimal,
        commission: Decimal,
    },
    /// The order rests at the venue (e.g. limit price not reached)
    Pending { reason: String },
    /// The venue refused the order
    Rejected { reason: String },
}

/// Port for the execution backend
///
/// The simulated venue and any real broker adapter implement the same
/// contract; the order book never depends on simulation specifics.
/// Callers bound the call with a timeout — an elapsed timeout is treated
/// as a rejection, never an ambiguous `Submitted`.
#[async_trait]
pub trait ExecutionVenue: Send + Sync {
    /// Execute an order against the current quote
    ///
    /// `quote` is `None` when the feed has no market data for the
    /// instrument; the venue must reject in that case.
    async fn execute(
        &self,
        order: &Order,
        quote: Option<&Quote>,
    ) -> Result<ExecutionOutcome, VenueError>;

    /// Venue name for logging
    fn name(&self) -> &str {
        "Venue"
    }
}
