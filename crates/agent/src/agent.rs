//! The trading agent
//!
//! Pipeline per cycle: model scores -> confidence threshold -> ATR (or
//! fallback) stop/target -> risk-budget sizing -> capacity-ranked slice.
//! Exit monitoring runs separately and always emits full closes.

use std::collections::HashMap;

use chrono::Utc;
use log::{debug, info, warn};
use meridian_core::{ExitReason, InstrumentId, Quote, Signal};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::error::{AgentError, Result};
use crate::features::FeatureFrame;
use crate::model::SignalModel;
use crate::position::AgentPosition;

/// Per-agent tuning
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub agent_id: String,
    pub strategy_tag: String,
    /// Universe this agent scores each cycle
    pub instruments: Vec<InstrumentId>,
    /// Candidates below this confidence are discarded
    pub confidence_threshold: Decimal,
    /// Open-position budget
    pub max_positions: usize,
    /// Cap on signals emitted per cycle
    pub max_signals_per_cycle: usize,
    pub account_balance: Decimal,
    /// Fraction of the account risked per trade if the stop is hit
    pub max_risk_per_trade: Decimal,
    /// Cap on a single position's value as a fraction of the account
    pub max_position_value_fraction: Decimal,
    pub atr_window: usize,
    /// Stop distance in ATR multiples
    pub atr_stop_multiple: Decimal,
    /// Target distance as a multiple of the stop distance
    pub reward_multiple: Decimal,
    /// Stop distance as a fraction of entry when ATR is unavailable
    pub fallback_stop_fraction: Decimal,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            agent_id: "agent".to_string(),
            strategy_tag: "default".to_string(),
            instruments: Vec::new(),
            confidence_threshold: dec!(0.55),
            max_positions: 5,
            max_signals_per_cycle: 3,
            account_balance: dec!(100_000),
            max_risk_per_trade: dec!(0.02),
            max_position_value_fraction: dec!(0.25),
            atr_window: 14,
            atr_stop_multiple: dec!(2),
            reward_multiple: dec!(2),
            fallback_stop_fraction: dec!(0.05),
        }
    }
}

/// One strategy agent wrapping one predictive model
pub struct TradingAgent {
    config: AgentConfig,
    model: Box<dyn SignalModel>,
    /// Open positions by instrument
    positions: HashMap<InstrumentId, AgentPosition>,
    /// Closed positions, kept for attribution; terminal forever
    closed: Vec<AgentPosition>,
}

impl TradingAgent {
    pub fn new(config: AgentConfig, model: Box<dyn SignalModel>) -> Self {
        Self {
            config,
            model,
            positions: HashMap::new(),
            closed: Vec::new(),
        }
    }

    pub fn agent_id(&self) -> &str {
        &self.config.agent_id
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn open_position_count(&self) -> usize {
        self.positions.len()
    }

    /// Snapshot of open positions (owned copies)
    pub fn open_positions(&self) -> Vec<AgentPosition> {
        self.positions.values().cloned().collect()
    }

    /// Snapshot of closed positions
    pub fn closed_positions(&self) -> &[AgentPosition] {
        &self.closed
    }

    /// Produce ranked entry signals for this cycle
    ///
    /// Instruments already held are skipped; candidates are ranked by
    /// confidence (ties broken by instrument id) and cut to the
    /// remaining position budget.
    pub fn generate_signals(&self, features: &FeatureFrame) -> Result<Vec<Signal>> {
        let remaining = self
            .config
            .max_positions
            .saturating_sub(self.positions.len());
        if remaining == 0 {
            debug!(
                "[{}] position budget exhausted ({})",
                self.config.agent_id, self.config.max_positions
            );
            return Ok(Vec::new());
        }

        let mut candidates = Vec::new();
        for instrument_id in &self.config.instruments {
            if self.positions.contains_key(instrument_id) {
                continue;
            }
            let Some(prediction) = self.model.predict(instrument_id, features)? else {
                continue;
            };
            if prediction.confidence < self.config.confidence_threshold {
                continue;
            }
            let Some(entry) = features.last_price(instrument_id) else {
                continue;
            };

            let Some(signal) = self.build_entry(instrument_id, prediction, entry, features) else {
                continue;
            };
            candidates.push(signal);
        }

        candidates.sort_by(|a, b| {
            b.confidence
                .cmp(&a.confidence)
                .then_with(|| a.instrument_id.cmp(&b.instrument_id))
        });
        candidates.truncate(remaining.min(self.config.max_signals_per_cycle));

        if !candidates.is_empty() {
            info!(
                "[{}] {} entry signal(s): {}",
                self.config.agent_id,
                candidates.len(),
                candidates
                    .iter()
                    .map(|s| format!("{} {} x{}", s.side, s.instrument_id, s.position_size))
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        }
        Ok(candidates)
    }

    /// Derive stop/target and size for one candidate
    fn build_entry(
        &self,
        instrument_id: &InstrumentId,
        prediction: crate::model::Prediction,
        entry: Decimal,
        features: &FeatureFrame,
    ) -> Option<Signal> {
        let risk_distance = match features.atr(instrument_id, self.config.atr_window) {
            Some(atr) if atr > Decimal::ZERO => atr * self.config.atr_stop_multiple,
            _ => entry * self.config.fallback_stop_fraction,
        };
        if risk_distance <= Decimal::ZERO {
            return None;
        }

        let reward_distance = risk_distance * self.config.reward_multiple;
        let (stop, target) = match prediction.side {
            meridian_core::Side::Buy => (entry - risk_distance, entry + reward_distance),
            meridian_core::Side::Sell => (entry + risk_distance, entry - reward_distance),
        };

        // Size so a stop-out loses at most the per-trade risk budget,
        // additionally capped by the max position value
        let risk_budget = self.config.account_balance * self.config.max_risk_per_trade;
        let risk_sized = (risk_budget / risk_distance).floor();
        let value_cap =
            (self.config.account_balance * self.config.max_position_value_fraction / entry).floor();
        let size = risk_sized.min(value_cap);
        if size <= Decimal::ZERO {
            return None;
        }

        Some(
            Signal::entry(
                self.config.agent_id.clone(),
                instrument_id.clone(),
                prediction.side,
                prediction.confidence,
            )
            .with_levels(entry, stop, target)
            .with_size(size),
        )
    }

    /// Full-close exit signals for breached stops/targets
    ///
    /// Partial exits are never generated here; quantity always equals
    /// the open quantity, side inverted.
    pub fn exit_signals(&self, quotes: &HashMap<InstrumentId, Quote>) -> Vec<Signal> {
        let mut exits = Vec::new();
        for position in self.positions.values() {
            let Some(quote) = quotes.get(&position.instrument_id) else {
                continue;
            };
            if let Some(reason) = position.breached_exit(quote.last) {
                info!(
                    "[{}] exit {} {:?} at {} (stop {}, target {})",
                    self.config.agent_id,
                    position.instrument_id,
                    reason,
                    quote.last,
                    position.stop_loss,
                    position.take_profit
                );
                exits.push(Signal::exit(
                    self.config.agent_id.clone(),
                    position.instrument_id.clone(),
                    position.side.opposite(),
                    position.quantity,
                    reason,
                ));
            }
        }
        exits
    }

    /// Manual full-close signals for every open position
    pub fn flatten_all(&self) -> Vec<Signal> {
        self.positions
            .values()
            .map(|p| {
                Signal::exit(
                    self.config.agent_id.clone(),
                    p.instrument_id.clone(),
                    p.side.opposite(),
                    p.quantity,
                    ExitReason::Manual,
                )
            })
            .collect()
    }

    /// Record an entry fill reported back by the orchestrator
    pub fn record_entry(&mut self, signal: &Signal, fill_price: Decimal, quantity: Decimal) {
        if self.positions.contains_key(&signal.instrument_id) {
            warn!(
                "[{}] entry fill for already-held {}; ignoring",
                self.config.agent_id, signal.instrument_id
            );
            return;
        }
        let position = AgentPosition::open(
            signal.instrument_id.clone(),
            signal.side,
            quantity,
            fill_price,
            signal.stop_loss,
            signal.take_profit,
            Utc::now(),
        );
        debug!(
            "[{}] opened {} {} x{} @ {}",
            self.config.agent_id, signal.side, signal.instrument_id, quantity, fill_price
        );
        self.positions.insert(signal.instrument_id.clone(), position);
    }

    /// Record an exit fill: the position becomes terminally closed
    pub fn record_exit(
        &mut self,
        instrument_id: &InstrumentId,
        reason: ExitReason,
    ) -> Result<()> {
        let mut position = self
            .positions
            .remove(instrument_id)
            .ok_or_else(|| AgentError::NoOpenPosition(instrument_id.clone()))?;
        position.close(reason)?;
        self.closed.push(position);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Prediction, SignalModel};
    use chrono::Utc;
    use meridian_core::Side;
    use rust_decimal_macros::dec;

    /// Model returning pre-canned predictions
    struct FixedModel(HashMap<InstrumentId, Prediction>);

    impl SignalModel for FixedModel {
        fn name(&self) -> &str {
            "fixed"
        }

        fn predict(
            &self,
            instrument_id: &InstrumentId,
            _features: &FeatureFrame,
        ) -> Result<Option<Prediction>> {
            Ok(self.0.get(instrument_id).copied())
        }
    }

    fn fixed(predictions: &[(&str, Side, Decimal)]) -> Box<FixedModel> {
        Box::new(FixedModel(
            predictions
                .iter()
                .map(|(id, side, conf)| {
                    (
                        InstrumentId::new(*id),
                        Prediction {
                            side: *side,
                            confidence: *conf,
                        },
                    )
                })
                .collect(),
        ))
    }

    fn frame(prices: &[(&str, Decimal)]) -> FeatureFrame {
        let mut frame = FeatureFrame::new();
        for (id, price) in prices {
            frame.push_last(*id, *price);
        }
        frame
    }

    fn config(instruments: &[&str]) -> AgentConfig {
        AgentConfig {
            agent_id: "agent-1".to_string(),
            instruments: instruments.iter().map(|i| InstrumentId::new(*i)).collect(),
            confidence_threshold: dec!(0.5),
            // Only one bar of history, so sizing uses the fallback stop
            account_balance: dec!(10_000),
            max_risk_per_trade: dec!(0.02),
            max_position_value_fraction: dec!(0.5),
            fallback_stop_fraction: dec!(0.05),
            ..AgentConfig::default()
        }
    }

    #[test]
    fn test_risk_budget_sizing() {
        // Entry 100, fallback stop 5% -> stop 95, risk/share 5.
        // Budget 10_000 * 2% = 200 -> 40 shares; value cap 5000/100 = 50.
        let agent = TradingAgent::new(
            config(&["AAPL"]),
            fixed(&[("AAPL", Side::Buy, dec!(0.8))]),
        );
        let signals = agent
            .generate_signals(&frame(&[("AAPL", dec!(100))]))
            .unwrap();

        assert_eq!(signals.len(), 1);
        let s = &signals[0];
        assert_eq!(s.position_size, dec!(40));
        assert_eq!(s.stop_loss, dec!(95.00));
        assert_eq!(s.take_profit, dec!(110.00));
        assert_eq!(s.risk_amount, dec!(200.00));
        assert_eq!(s.risk_reward_ratio(), dec!(2));
    }

    #[test]
    fn test_value_cap_binds_first() {
        let mut cfg = config(&["AAPL"]);
        cfg.max_position_value_fraction = dec!(0.25); // cap = 2500/100 = 25

        let agent = TradingAgent::new(cfg, fixed(&[("AAPL", Side::Buy, dec!(0.8))]));
        let signals = agent
            .generate_signals(&frame(&[("AAPL", dec!(100))]))
            .unwrap();

        assert_eq!(signals[0].position_size, dec!(25));
    }

    #[test]
    fn test_confidence_threshold_filters() {
        let agent = TradingAgent::new(
            config(&["AAPL", "MSFT"]),
            fixed(&[
                ("AAPL", Side::Buy, dec!(0.4)),
                ("MSFT", Side::Buy, dec!(0.9)),
            ]),
        );
        let signals = agent
            .generate_signals(&frame(&[("AAPL", dec!(100)), ("MSFT", dec!(50))]))
            .unwrap();

        assert_eq!(signals.len(), 1);
        assert_eq!(signals[0].instrument_id, InstrumentId::new("MSFT"));
    }

    #[test]
    fn test_ranking_and_cycle_cap() {
        let mut cfg = config(&["A", "B", "C", "D"]);
        cfg.max_signals_per_cycle = 2;

        let agent = TradingAgent::new(
            cfg,
            fixed(&[
                ("A", Side::Buy, dec!(0.6)),
                ("B", Side::Buy, dec!(0.9)),
                ("C", Side::Buy, dec!(0.7)),
                ("D", Side::Buy, dec!(0.9)),
            ]),
        );
        let signals = agent
            .generate_signals(&frame(&[
                ("A", dec!(10)),
                ("B", dec!(10)),
                ("C", dec!(10)),
                ("D", dec!(10)),
            ]))
            .unwrap();

        // Top two by confidence; B before D on the instrument tie-break
        assert_eq!(signals.len(), 2);
        assert_eq!(signals[0].instrument_id, InstrumentId::new("B"));
        assert_eq!(signals[1].instrument_id, InstrumentId::new("D"));
    }

    #[test]
    fn test_position_budget_blocks_entries() {
        let mut cfg = config(&["AAPL", "MSFT"]);
        cfg.max_positions = 1;

        let mut agent = TradingAgent::new(
            cfg,
            fixed(&[
                ("AAPL", Side::Buy, dec!(0.9)),
                ("MSFT", Side::Buy, dec!(0.9)),
            ]),
        );
        let features = frame(&[("AAPL", dec!(100)), ("MSFT", dec!(50))]);

        let signals = agent.generate_signals(&features).unwrap();
        assert_eq!(signals.len(), 1);

        agent.record_entry(&signals[0], dec!(100), signals[0].position_size);
        assert!(agent.generate_signals(&features).unwrap().is_empty());
    }

    #[test]
    fn test_held_instrument_skipped() {
        let mut agent = TradingAgent::new(
            config(&["AAPL", "MSFT"]),
            fixed(&[
                ("AAPL", Side::Buy, dec!(0.9)),
                ("MSFT", Side::Buy, dec!(0.8)),
            ]),
        );
        let features = frame(&[("AAPL", dec!(100)), ("MSFT", dec!(50))]);

        let signals = agent.generate_signals(&features).unwrap();
        agent.record_entry(&signals[0], dec!(100), signals[0].position_size);

        let next = agent.generate_signals(&features).unwrap();
        assert_eq!(next.len(), 1);
        assert_eq!(next[0].instrument_id, InstrumentId::new("MSFT"));
    }

    #[test]
    fn test_exit_signals_full_close_inverted() {
        let mut agent = TradingAgent::new(
            config(&["AAPL"]),
            fixed(&[("AAPL", Side::Buy, dec!(0.9))]),
        );
        let features = frame(&[("AAPL", dec!(100))]);
        let signals = agent.generate_signals(&features).unwrap();
        agent.record_entry(&signals[0], dec!(100), dec!(40));

        // Price collapses through the 95 stop
        let mut quotes = HashMap::new();
        quotes.insert(
            InstrumentId::new("AAPL"),
            Quote::new(dec!(94), dec!(94), dec!(94), Utc::now()),
        );

        let exits = agent.exit_signals(&quotes);
        assert_eq!(exits.len(), 1);
        assert_eq!(exits[0].side, Side::Sell);
        assert_eq!(exits[0].position_size, dec!(40));
        assert!(exits[0].is_exit());
    }

    #[test]
    fn test_record_exit_is_terminal() {
        let mut agent = TradingAgent::new(
            config(&["AAPL"]),
            fixed(&[("AAPL", Side::Buy, dec!(0.9))]),
        );
        let features = frame(&[("AAPL", dec!(100))]);
        let signals = agent.generate_signals(&features).unwrap();
        agent.record_entry(&signals[0], dec!(100), dec!(40));

        let aapl = InstrumentId::new("AAPL");
        agent.record_exit(&aapl, ExitReason::StopLoss).unwrap();
        assert_eq!(agent.open_position_count(), 0);
        assert_eq!(agent.closed_positions().len(), 1);

        // Closing again is an error, not a silent no-op
        assert!(matches!(
            agent.record_exit(&aapl, ExitReason::Manual),
            Err(AgentError::NoOpenPosition(_))
        ));
    }

    #[test]
    fn test_flatten_all() {
        let mut agent = TradingAgent::new(
            config(&["AAPL", "MSFT"]),
            fixed(&[
                ("AAPL", Side::Buy, dec!(0.9)),
                ("MSFT", Side::Sell, dec!(0.8)),
            ]),
        );
        let features = frame(&[("AAPL", dec!(100)), ("MSFT", dec!(50))]);
        for signal in agent.generate_signals(&features).unwrap() {
            agent.record_entry(&signal, signal.entry_price, signal.position_size);
        }

        let exits = agent.flatten_all();
        assert_eq!(exits.len(), 2);
        assert!(exits.iter().all(|e| e.is_exit()));
    }
}
