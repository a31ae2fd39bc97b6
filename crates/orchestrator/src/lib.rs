//! Meridian Orchestrator
//!
//! Drives the periodic signal-to-execution cycle and arbitrates scarce
//! capacity across agents:
//!
//! 1. Refresh market data (a stale cycle never submits orders)
//! 2. Sweep working orders against fresh quotes
//! 3. Process exits — closing never competes with opening for capacity
//! 4. Collect entry signals from every agent, isolating per-agent errors
//! 5. Merge into one ranked list (confidence/risk-reward weighted)
//! 6. Submit the top `available_slots` signals and report fills back to
//!    the originating agents
//!
//! The orchestrator also exposes the minimal operational surface
//! (`run_cycle`, `cancel`, `positions`, `execution_stats`) so the core
//! can sit behind any transport.

mod config;
mod error;
mod orchestrator;
mod ranking;

pub use config::OrchestratorConfig;
pub use error::{Error, Result};
pub use orchestrator::{CycleReport, Orchestrator};
pub use ranking::{RankWeights, priority_score, rank_signals};
