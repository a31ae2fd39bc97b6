//! Orchestrator errors

use meridian_ports::FeedError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Market data refresh failed; the cycle was aborted before any
    /// submission
    #[error("market data refresh failed: {0}")]
    StaleData(#[from] FeedError),

    #[error("order book error: {0}")]
    Book(#[from] meridian_order_book::Error),

    #[error("unknown agent: {0}")]
    UnknownAgent(String),
}

pub type Result<T> = std::result::Result<T, Error>;
