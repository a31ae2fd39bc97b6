//! The cycle driver
//!
//! One tick fully completes before the next begins; all cross-cycle
//! state lives in the order book. Agents and this module only hold
//! snapshots.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use log::{error, info, warn};
use meridian_agent::{FeatureFrame, TradingAgent};
use meridian_core::{
    InstrumentId, OrderId, OrderRequest, Position, Quote, Signal, SignalIntent, TradeRecord,
};
use meridian_order_book::{Error as BookError, ExecutionStats, OrderBook};
use meridian_ports::MarketDataFeed;

use crate::config::OrchestratorConfig;
use crate::error::{Error, Result};
use crate::ranking::rank_signals;

/// What one cycle did
#[derive(Debug, Clone, Default)]
pub struct CycleReport {
    pub cycle: u64,
    /// Fills from the working-order sweep
    pub sweep_fills: usize,
    pub exits_submitted: usize,
    pub entries_submitted: usize,
    /// Entry signals discarded by risk or the venue
    pub entries_rejected: usize,
    /// Entry signals collected before ranking
    pub signals_considered: usize,
    pub available_slots: usize,
    /// Per-agent signal generation failures (cycle continued)
    pub agent_errors: Vec<String>,
}

/// Drives the signal-to-execution cycle across all agents
pub struct Orchestrator {
    config: OrchestratorConfig,
    agents: Vec<TradingAgent>,
    book: OrderBook,
    feed: Arc<dyn MarketDataFeed>,
    features: FeatureFrame,
    cycle: u64,
}

impl Orchestrator {
    pub fn new(
        config: OrchestratorConfig,
        agents: Vec<TradingAgent>,
        book: OrderBook,
        feed: Arc<dyn MarketDataFeed>,
    ) -> Self {
        let features = FeatureFrame::with_capacity(config.history_bars);
        Self {
            config,
            agents,
            book,
            feed,
            features,
            cycle: 0,
        }
    }

    /// Run one full cycle
    ///
    /// A failed market data refresh aborts the cycle before anything is
    /// submitted; the caller logs and retries on the next tick.
    pub async fn run_cycle(&mut self) -> Result<CycleReport> {
        self.cycle += 1;
        let mut report = CycleReport {
            cycle: self.cycle,
            ..CycleReport::default()
        };

        // 1. Market data first; stale data must never submit orders
        self.feed.refresh().await?;
        let quotes = self.snapshot_quotes();

        // 2. Retry limit/stop orders resting at the venue
        let sweep_fills = self.book.sweep_working().await?;
        report.sweep_fills = sweep_fills.len();

        // 3. Exits before entries, so closing never competes for slots
        self.process_exits(&quotes, &mut report).await?;

        // 4. Entry signals, one agent's failure isolated from the rest
        let mut signals = Vec::new();
        for agent in &self.agents {
            match agent.generate_signals(&self.features) {
                Ok(batch) => signals.extend(batch),
                Err(e) => {
                    warn!("[orchestrator] agent {} failed: {e}", agent.agent_id());
                    report.agent_errors.push(format!("{}: {e}", agent.agent_id()));
                }
            }
        }
        report.signals_considered = signals.len();

        // 5. One ranked list across all agents
        let ranked = rank_signals(signals, &self.config.weights);

        // 6. Allocate remaining capacity
        let open = self.book.open_position_count();
        let available_slots = self
            .config
            .max_concurrent_positions
            .saturating_sub(open);
        report.available_slots = available_slots;

        for signal in ranked.into_iter().take(available_slots) {
            self.submit_entry(&signal, &mut report).await?;
        }

        info!(
            "[orchestrator] cycle {}: {} exits, {} entries ({} rejected), {} slots",
            report.cycle,
            report.exits_submitted,
            report.entries_submitted,
            report.entries_rejected,
            report.available_slots
        );
        Ok(report)
    }

    /// Run `ticks` cycles, sleeping `interval` between them
    ///
    /// Cycle failures are logged and retried on the next tick.
    pub async fn run_ticks(&mut self, ticks: u64, interval: Duration) -> Vec<CycleReport> {
        let mut reports = Vec::new();
        for _ in 0..ticks {
            match self.run_cycle().await {
                Ok(report) => reports.push(report),
                Err(e) => error!("[orchestrator] cycle aborted: {e}"),
            }
            if interval > Duration::ZERO {
                tokio::time::sleep(interval).await;
            }
        }
        reports
    }

    // ---- operational surface ----

    /// Cancel an order by id
    pub fn cancel(&mut self, order_id: OrderId) -> Result<()> {
        self.book.cancel(order_id)?;
        Ok(())
    }

    /// Snapshot of an agent's authoritative positions
    pub fn positions(&self, agent_id: &str) -> Vec<Position> {
        self.book.positions_for(agent_id)
    }

    pub fn execution_stats(&self) -> ExecutionStats {
        self.book.execution_stats()
    }

    pub fn trade_history(&self, limit: usize) -> Vec<TradeRecord> {
        self.book.trade_history(limit)
    }

    /// Submit manual full-close exits for everything an agent holds
    pub async fn flatten(&mut self, agent_id: &str) -> Result<usize> {
        let index = self
            .agents
            .iter()
            .position(|a| a.agent_id() == agent_id)
            .ok_or_else(|| Error::UnknownAgent(agent_id.to_string()))?;

        let exits = self.agents[index].flatten_all();
        let mut closed = 0;
        for exit in exits {
            if self.submit_exit(index, &exit).await? {
                closed += 1;
            }
        }
        Ok(closed)
    }

    /// Direct access to the book for embedding and inspection
    pub fn order_book(&self) -> &OrderBook {
        &self.book
    }

    // ---- internals ----

    /// Latest quotes, folded into the rolling feature history
    fn snapshot_quotes(&mut self) -> HashMap<InstrumentId, Quote> {
        let mut quotes = HashMap::new();
        for instrument_id in self.feed.instruments() {
            if let Some(quote) = self.feed.quote(&instrument_id) {
                self.features.push_last(instrument_id.clone(), quote.last);
                quotes.insert(instrument_id, quote);
            }
        }
        quotes
    }

    async fn process_exits(
        &mut self,
        quotes: &HashMap<InstrumentId, Quote>,
        report: &mut CycleReport,
    ) -> Result<()> {
        for index in 0..self.agents.len() {
            let exits = self.agents[index].exit_signals(quotes);
            for exit in exits {
                if self.submit_exit(index, &exit).await? {
                    report.exits_submitted += 1;
                }
            }
        }
        Ok(())
    }

    /// Submit one exit signal; returns whether the close filled
    async fn submit_exit(&mut self, agent_index: usize, exit: &Signal) -> Result<bool> {
        let SignalIntent::Exit(reason) = exit.intent else {
            return Ok(false);
        };
        let request = OrderRequest::market(
            exit.instrument_id.clone(),
            exit.side,
            exit.position_size,
            exit.agent_id.clone(),
        )
        .with_strategy_tag(self.agents[agent_index].config().strategy_tag.clone());

        match self.book.submit(request).await {
            Ok((_, outcome)) => {
                if outcome.trade().is_some() {
                    if let Err(e) = self.agents[agent_index].record_exit(&exit.instrument_id, reason)
                    {
                        warn!("[orchestrator] exit bookkeeping failed: {e}");
                    }
                    Ok(true)
                } else {
                    // Market exits either fill or reject; a resting exit
                    // stays open and retries next cycle
                    Ok(false)
                }
            }
            Err(e) if is_recoverable(&e) => {
                warn!(
                    "[orchestrator] exit for {} rejected: {e}; retrying next cycle",
                    exit.instrument_id
                );
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Submit one entry signal and report the fill to its agent
    async fn submit_entry(&mut self, signal: &Signal, report: &mut CycleReport) -> Result<()> {
        let Some(agent_index) = self
            .agents
            .iter()
            .position(|a| a.agent_id() == signal.agent_id)
        else {
            warn!("[orchestrator] dropping signal from unknown agent {}", signal.agent_id);
            return Ok(());
        };

        let request = OrderRequest::market(
            signal.instrument_id.clone(),
            signal.side,
            signal.position_size,
            signal.agent_id.clone(),
        )
        .with_strategy_tag(self.agents[agent_index].config().strategy_tag.clone());

        match self.book.submit(request).await {
            Ok((_, outcome)) => {
                if let Some(trade) = outcome.trade() {
                    self.agents[agent_index].record_entry(signal, trade.price, trade.quantity);
                }
                report.entries_submitted += 1;
                Ok(())
            }
            Err(e) if is_recoverable(&e) => {
                // No retry within the cycle; eligible again next tick
                warn!("[orchestrator] entry for {} discarded: {e}", signal.instrument_id);
                report.entries_rejected += 1;
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Rejections that discard one signal but keep the cycle going
fn is_recoverable(error: &BookError) -> bool {
    matches!(
        error,
        BookError::Validation { .. }
            | BookError::VenueRejected { .. }
            | BookError::VenueTimeout { .. }
            | BookError::Venue { .. }
            | BookError::NoMarketData { .. }
    )
}
