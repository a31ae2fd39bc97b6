//! Meridian Trading Agents
//!
//! A trading agent wraps one predictive model and turns feature
//! snapshots into at most N ranked entry signals, sized so a stopped-out
//! trade loses no more than its configured risk budget. Each agent also
//! monitors its own open positions and emits full-close exit signals
//! when stops or targets are breached.
//!
//! Agents never touch the order book's state directly: they read market
//! snapshots, emit signals, and are told about their fills by the
//! orchestrator.

mod agent;
mod error;
mod features;
mod model;
mod position;

pub use agent::{AgentConfig, TradingAgent};
pub use error::{AgentError, Result};
pub use features::{Bar, FeatureFrame};
pub use model::{MeanReversionModel, MomentumModel, Prediction, SignalModel};
pub use position::{AgentPosition, PositionState};
