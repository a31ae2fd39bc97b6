use async_trait::async_trait;
use meridian_core::{InstrumentId, Quote};

use crate::error::FeedError;

/// Port for the market data feed
///
/// Polled once per orchestrator cycle. A failed refresh aborts the
/// cycle; an absent quote blocks submissions for that instrument only.
#[async_trait]
pub trait MarketDataFeed: Send + Sync {
    /// Pull fresh quotes from the upstream source
    async fn refresh(&self) -> Result<(), FeedError>;

    /// Latest quote for an instrument, if one exists
    fn quote(&self, instrument_id: &InstrumentId) -> Option<Quote>;

    /// Instruments this feed covers
    fn instruments(&self) -> Vec<InstrumentId>;
}
