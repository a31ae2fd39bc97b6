use meridian_core::InstrumentId;
use thiserror::Error;

/// Transport-level failure talking to the execution venue
///
/// Venue-side rejections of a specific order are not errors; they come
/// back as [`crate::ExecutionOutcome::Rejected`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VenueError {
    #[error("venue unavailable: {0}")]
    Unavailable(String),

    #[error("malformed order: {0}")]
    MalformedOrder(String),
}

/// Failure refreshing or reading the market data feed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FeedError {
    #[error("feed refresh failed: {0}")]
    RefreshFailed(String),

    #[error("unknown instrument: {0}")]
    UnknownInstrument(InstrumentId),
}

/// Failure writing to or reading from the persistence sink
#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("append failed: {0}")]
    AppendFailed(String),

    #[error("load failed: {0}")]
    LoadFailed(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
