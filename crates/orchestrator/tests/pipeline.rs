//! End-to-end pipeline tests
//!
//! Full wiring: scripted or real models inside trading agents, the
//! simulated venue and feeds, the order book, and the orchestrator
//! driving cycles.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Duration as ChronoDuration;
use meridian_agent::{
    AgentConfig, FeatureFrame, MeanReversionModel, MomentumModel, Prediction, SignalModel,
    TradingAgent,
};
use meridian_clock::ManualClock;
use meridian_core::{InstrumentId, Position, Quote, Side};
use meridian_orchestrator::{Orchestrator, OrchestratorConfig};
use meridian_order_book::{MemorySink, OrderBook, OrderBookConfig};
use meridian_ports::{Clock, FeedError, MarketDataFeed};
use meridian_risk::{RiskLimits, RiskValidator};
use meridian_venue::{FeedConfig, SimulatedFeed, SimulatedVenue, StaticFeed, VenueConfig};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Model whose views the test rewrites between cycles
#[derive(Clone, Default)]
struct ScriptedModel {
    views: Arc<Mutex<HashMap<InstrumentId, Prediction>>>,
}

impl ScriptedModel {
    fn set(&self, instrument: &str, side: Side, confidence: Decimal) {
        self.views.lock().unwrap().insert(
            InstrumentId::new(instrument),
            Prediction { side, confidence },
        );
    }

    fn clear(&self) {
        self.views.lock().unwrap().clear();
    }
}

impl SignalModel for ScriptedModel {
    fn name(&self) -> &str {
        "scripted"
    }

    fn predict(
        &self,
        instrument_id: &InstrumentId,
        _features: &FeatureFrame,
    ) -> meridian_agent::Result<Option<Prediction>> {
        Ok(self.views.lock().unwrap().get(instrument_id).copied())
    }
}

/// Model that always fails, for error-isolation tests
struct BrokenModel;

impl SignalModel for BrokenModel {
    fn name(&self) -> &str {
        "broken"
    }

    fn predict(
        &self,
        _instrument_id: &InstrumentId,
        _features: &FeatureFrame,
    ) -> meridian_agent::Result<Option<Prediction>> {
        Err(meridian_agent::AgentError::Model {
            model: "broken".to_string(),
            reason: "synthetic failure".to_string(),
        })
    }
}

/// Feed whose refresh always fails
struct DownFeed;

#[async_trait]
impl MarketDataFeed for DownFeed {
    async fn refresh(&self) -> Result<(), FeedError> {
        Err(FeedError::RefreshFailed("upstream down".to_string()))
    }

    fn quote(&self, _instrument_id: &InstrumentId) -> Option<Quote> {
        None
    }

    fn instruments(&self) -> Vec<InstrumentId> {
        Vec::new()
    }
}

fn agent_config(agent_id: &str, instruments: &[&str]) -> AgentConfig {
    AgentConfig {
        agent_id: agent_id.to_string(),
        strategy_tag: "test".to_string(),
        instruments: instruments.iter().map(|i| InstrumentId::new(*i)).collect(),
        confidence_threshold: dec!(0.5),
        account_balance: dec!(10_000),
        max_risk_per_trade: dec!(0.02),
        max_position_value_fraction: dec!(0.5),
        fallback_stop_fraction: dec!(0.05),
        max_positions: 5,
        max_signals_per_cycle: 5,
        ..AgentConfig::default()
    }
}

fn book_with_feed(feed: Arc<dyn MarketDataFeed>, clock: Arc<dyn Clock>) -> OrderBook {
    OrderBook::new(
        OrderBookConfig {
            venue_timeout: Duration::from_secs(1),
            max_quote_age: ChronoDuration::seconds(60),
        },
        RiskValidator::new(RiskLimits::default()),
        Arc::new(SimulatedVenue::new(VenueConfig {
            slippage_fraction: dec!(0),
            commission_rate: dec!(0),
            latency: Duration::ZERO,
        })),
        feed,
        Arc::new(MemorySink::new()),
        clock,
    )
}

fn sorted_positions(mut positions: Vec<Position>) -> Vec<Position> {
    positions.sort_by(|a, b| {
        (&a.agent_id, &a.instrument_id).cmp(&(&b.agent_id, &b.instrument_id))
    });
    positions
}

#[tokio::test]
async fn test_entry_then_stop_loss_exit() {
    let clock: Arc<ManualClock> = Arc::new(ManualClock::default_epoch());
    let feed = StaticFeed::new(clock.clone() as Arc<dyn Clock>);
    feed.set_last("AAPL", dec!(100));

    let model = ScriptedModel::default();
    model.set("AAPL", Side::Buy, dec!(0.9));

    let agent = TradingAgent::new(
        agent_config("alpha", &["AAPL"]),
        Box::new(model.clone()),
    );
    let book = book_with_feed(Arc::new(feed.clone()), clock.clone());
    let mut orchestrator = Orchestrator::new(
        OrchestratorConfig::default(),
        vec![agent],
        book,
        Arc::new(feed.clone()),
    );

    // Cycle 1: entry fills at 100; fallback stop 5% -> 95, size 40
    let report = orchestrator.run_cycle().await.unwrap();
    assert_eq!(report.entries_submitted, 1);

    let positions = orchestrator.positions("alpha");
    assert_eq!(positions.len(), 1);
    assert_eq!(positions[0].quantity, dec!(40));
    assert_eq!(positions[0].avg_entry_price, dec!(100));

    // Cycle 2: price breaches the stop; the exit closes the full
    // quantity and the book position disappears
    model.clear();
    feed.set_last("AAPL", dec!(94));
    let report = orchestrator.run_cycle().await.unwrap();
    assert_eq!(report.exits_submitted, 1);
    assert_eq!(report.entries_submitted, 0);

    assert!(orchestrator.positions("alpha").is_empty());
    let stats = orchestrator.execution_stats();
    // 40 * (94 - 100)
    assert_eq!(stats.realized_pnl, dec!(-240));
}

#[tokio::test]
async fn test_capacity_takes_top_ranked_signals_only() {
    let clock: Arc<ManualClock> = Arc::new(ManualClock::default_epoch());
    let feed = StaticFeed::new(clock.clone() as Arc<dyn Clock>);
    for name in ["A", "B", "C", "D", "E"] {
        feed.set_last(name, dec!(10));
    }

    let model = ScriptedModel::default();
    model.set("A", Side::Buy, dec!(0.9));
    model.set("B", Side::Buy, dec!(0.8));
    model.set("C", Side::Buy, dec!(0.7));
    model.set("D", Side::Buy, dec!(0.65));
    model.set("E", Side::Buy, dec!(0.6));

    let agent = TradingAgent::new(
        agent_config("alpha", &["A", "B", "C", "D", "E"]),
        Box::new(model),
    );
    let book = book_with_feed(Arc::new(feed.clone()), clock.clone());
    let mut orchestrator = Orchestrator::new(
        OrchestratorConfig {
            max_concurrent_positions: 2,
            ..OrchestratorConfig::default()
        },
        vec![agent],
        book,
        Arc::new(feed),
    );

    let report = orchestrator.run_cycle().await.unwrap();
    assert_eq!(report.signals_considered, 5);
    assert_eq!(report.available_slots, 2);
    assert_eq!(report.entries_submitted, 2);

    // Exactly the top two by priority, and no side effects from the rest
    let positions = sorted_positions(orchestrator.positions("alpha"));
    let held: Vec<&str> = positions
        .iter()
        .map(|p| p.instrument_id.as_str())
        .collect();
    assert_eq!(held, vec!["A", "B"]);
    assert_eq!(orchestrator.execution_stats().orders_submitted, 2);
}

#[tokio::test]
async fn test_exits_free_slots_before_entries() {
    let clock: Arc<ManualClock> = Arc::new(ManualClock::default_epoch());
    let feed = StaticFeed::new(clock.clone() as Arc<dyn Clock>);
    feed.set_last("A", dec!(100));
    feed.set_last("B", dec!(100));
    feed.set_last("C", dec!(100));

    let model = ScriptedModel::default();
    model.set("A", Side::Buy, dec!(0.9));
    model.set("B", Side::Buy, dec!(0.8));

    let agent = TradingAgent::new(agent_config("alpha", &["A", "B", "C"]), Box::new(model.clone()));
    let book = book_with_feed(Arc::new(feed.clone()), clock.clone());
    let mut orchestrator = Orchestrator::new(
        OrchestratorConfig {
            max_concurrent_positions: 2,
            ..OrchestratorConfig::default()
        },
        vec![agent],
        book,
        Arc::new(feed.clone()),
    );

    // Fill both slots
    orchestrator.run_cycle().await.unwrap();
    assert_eq!(orchestrator.positions("alpha").len(), 2);

    // A's stop breaches while a new candidate C appears; the exit runs
    // first, so the freed slot is available to C in the same cycle
    model.clear();
    model.set("C", Side::Buy, dec!(0.9));
    feed.set_last("A", dec!(94));
    let report = orchestrator.run_cycle().await.unwrap();
    assert_eq!(report.exits_submitted, 1);
    assert_eq!(report.available_slots, 1);
    assert_eq!(report.entries_submitted, 1);

    let held: Vec<String> = sorted_positions(orchestrator.positions("alpha"))
        .iter()
        .map(|p| p.instrument_id.to_string())
        .collect();
    assert_eq!(held, vec!["B".to_string(), "C".to_string()]);
}

#[tokio::test]
async fn test_agent_failure_does_not_abort_cycle() {
    let clock: Arc<ManualClock> = Arc::new(ManualClock::default_epoch());
    let feed = StaticFeed::new(clock.clone() as Arc<dyn Clock>);
    feed.set_last("AAPL", dec!(100));

    let model = ScriptedModel::default();
    model.set("AAPL", Side::Buy, dec!(0.9));

    let broken = TradingAgent::new(agent_config("broken", &["AAPL"]), Box::new(BrokenModel));
    let healthy = TradingAgent::new(agent_config("healthy", &["AAPL"]), Box::new(model));

    let book = book_with_feed(Arc::new(feed.clone()), clock.clone());
    let mut orchestrator = Orchestrator::new(
        OrchestratorConfig::default(),
        vec![broken, healthy],
        book,
        Arc::new(feed),
    );

    let report = orchestrator.run_cycle().await.unwrap();
    assert_eq!(report.agent_errors.len(), 1);
    assert!(report.agent_errors[0].contains("broken"));
    assert_eq!(report.entries_submitted, 1);
    assert_eq!(orchestrator.positions("healthy").len(), 1);
}

#[tokio::test]
async fn test_failed_refresh_aborts_before_submitting() {
    let clock: Arc<ManualClock> = Arc::new(ManualClock::default_epoch());
    let book = book_with_feed(Arc::new(DownFeed), clock.clone());
    let agent = TradingAgent::new(agent_config("alpha", &["AAPL"]), Box::new(ScriptedModel::default()));

    let mut orchestrator = Orchestrator::new(
        OrchestratorConfig::default(),
        vec![agent],
        book,
        Arc::new(DownFeed),
    );

    assert!(orchestrator.run_cycle().await.is_err());
    assert_eq!(orchestrator.execution_stats().orders_submitted, 0);
}

#[tokio::test]
async fn test_flatten_agent() {
    let clock: Arc<ManualClock> = Arc::new(ManualClock::default_epoch());
    let feed = StaticFeed::new(clock.clone() as Arc<dyn Clock>);
    feed.set_last("AAPL", dec!(100));
    feed.set_last("MSFT", dec!(50));

    let model = ScriptedModel::default();
    model.set("AAPL", Side::Buy, dec!(0.9));
    model.set("MSFT", Side::Sell, dec!(0.8));

    let agent = TradingAgent::new(agent_config("alpha", &["AAPL", "MSFT"]), Box::new(model));
    let book = book_with_feed(Arc::new(feed.clone()), clock.clone());
    let mut orchestrator = Orchestrator::new(
        OrchestratorConfig::default(),
        vec![agent],
        book,
        Arc::new(feed),
    );

    orchestrator.run_cycle().await.unwrap();
    assert_eq!(orchestrator.positions("alpha").len(), 2);

    let closed = orchestrator.flatten("alpha").await.unwrap();
    assert_eq!(closed, 2);
    assert!(orchestrator.positions("alpha").is_empty());

    assert!(orchestrator.flatten("ghost").await.is_err());
}

#[tokio::test]
async fn test_seeded_simulation_is_deterministic() {
    async fn run_once() -> (meridian_order_book::ExecutionStats, Vec<Position>) {
        let clock: Arc<ManualClock> = Arc::new(ManualClock::default_epoch());
        let feed = Arc::new(SimulatedFeed::new(
            FeedConfig {
                volatility: dec!(0.01),
                seed: 7,
                ..FeedConfig::default()
            },
            clock.clone() as Arc<dyn Clock>,
        ));

        let mut momo_config = agent_config("momo", &["AAPL", "MSFT"]);
        momo_config.confidence_threshold = dec!(0.05);
        let momo = TradingAgent::new(
            momo_config,
            Box::new(MomentumModel {
                lookback: 3,
                sensitivity: dec!(50),
            }),
        );

        let mut reversion_config = agent_config("reversion", &["AAPL", "MSFT"]);
        reversion_config.confidence_threshold = dec!(0.05);
        let reversion = TradingAgent::new(
            reversion_config,
            Box::new(MeanReversionModel {
                lookback: 4,
                sensitivity: dec!(50),
            }),
        );

        let book = book_with_feed(feed.clone(), clock.clone());
        let mut orchestrator = Orchestrator::new(
            OrchestratorConfig::default(),
            vec![momo, reversion],
            book,
            feed,
        );

        for _ in 0..10 {
            orchestrator.run_cycle().await.unwrap();
            clock.advance(ChronoDuration::seconds(10));
        }
        let mut positions = orchestrator.positions("momo");
        positions.extend(orchestrator.positions("reversion"));
        (orchestrator.execution_stats(), sorted_positions(positions))
    }

    let (stats_a, positions_a) = run_once().await;
    let (stats_b, positions_b) = run_once().await;

    assert_eq!(stats_a, stats_b);
    assert_eq!(positions_a, positions_b);
}
