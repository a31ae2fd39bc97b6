//! Agent errors
//!
//! Caught and logged by the orchestrator; one agent failing never
//! aborts the cycle for the others.

use meridian_core::InstrumentId;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AgentError {
    #[error("model {model} failed: {reason}")]
    Model { model: String, reason: String },

    #[error("no open position for {0}")]
    NoOpenPosition(InstrumentId),

    #[error("position for {0} is already closed")]
    AlreadyClosed(InstrumentId),
}

pub type Result<T> = std::result::Result<T, AgentError>;
