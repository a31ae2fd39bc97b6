//! Meridian Ports
//!
//! Port definitions (traits) for the Meridian pipeline. These define the
//! boundaries between the core and its external collaborators: the
//! execution venue, the market data feed, the persistence sink, and the
//! clock. Swapping a simulated collaborator for a real one never touches
//! the core contracts.

mod clock;
mod error;
mod market_data;
mod persistence;
mod venue;

pub use clock::Clock;
pub use error::{FeedError, PersistenceError, VenueError};
pub use market_data::MarketDataFeed;
pub use persistence::PersistenceSink;
pub use venue::{ExecutionOutcome, ExecutionVenue};
