//! Meridian Simulated Venue
//!
//! Simulation-side collaborators behind the pipeline's ports:
//! - [`SimulatedVenue`] — fills orders against quotes with slippage and
//!   commission, optionally with simulated latency
//! - [`SimulatedFeed`] — seeded random-walk quote generator
//! - [`StaticFeed`] — fixed quotes for tests and embedding
//!
//! Swapping these for real broker/feed adapters only means implementing
//! the same port traits.

mod feed;
mod venue;

pub use feed::{FeedConfig, SimulatedFeed, StaticFeed};
pub use venue::{SimulatedVenue, VenueConfig};
