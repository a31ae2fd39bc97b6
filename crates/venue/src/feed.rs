//! Market data feeds
//!
//! [`SimulatedFeed`] walks each instrument's last price with a seeded
//! RNG so whole simulations are reproducible. [`StaticFeed`] serves
//! whatever quotes a test puts into it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use dashmap::DashMap;
use log::debug;
use meridian_core::{InstrumentId, Quote};
use meridian_ports::{Clock, FeedError, MarketDataFeed};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal_macros::dec;

/// Configuration for the simulated feed
#[derive(Debug, Clone)]
pub struct FeedConfig {
    /// Starting last price per instrument
    pub initial_prices: HashMap<InstrumentId, Decimal>,
    /// Per-refresh random-walk amplitude (e.g. 0.002 = 0.2%)
    pub volatility: Decimal,
    /// Half-spread applied around last to derive bid/ask
    pub spread_fraction: Decimal,
    /// RNG seed for reproducible runs
    pub seed: u64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        let mut initial_prices = HashMap::new();
        initial_prices.insert(InstrumentId::new("AAPL"), dec!(180));
        initial_prices.insert(InstrumentId::new("MSFT"), dec!(410));

        Self {
            initial_prices,
            volatility: dec!(0.002),
            spread_fraction: dec!(0.0005),
            seed: 42,
        }
    }
}

/// Seeded random-walk quote generator
pub struct SimulatedFeed {
    config: FeedConfig,
    quotes: DashMap<InstrumentId, Quote>,
    rng: Mutex<StdRng>,
    clock: Arc<dyn Clock>,
}

impl SimulatedFeed {
    pub fn new(config: FeedConfig, clock: Arc<dyn Clock>) -> Self {
        let rng = StdRng::seed_from_u64(config.seed);
        Self {
            config,
            quotes: DashMap::new(),
            rng: Mutex::new(rng),
            clock,
        }
    }

    fn quote_around(&self, last: Decimal) -> Quote {
        let spread = last * self.config.spread_fraction;
        Quote::new(last - spread, last + spread, last, self.clock.now())
    }
}

#[async_trait]
impl MarketDataFeed for SimulatedFeed {
    async fn refresh(&self) -> Result<(), FeedError> {
        let mut rng = self
            .rng
            .lock()
            .map_err(|e| FeedError::RefreshFailed(e.to_string()))?;

        let vol = self.config.volatility.to_f64().unwrap_or(0.002);
        for (instrument_id, initial) in &self.config.initial_prices {
            let last = self
                .quotes
                .get(instrument_id)
                .map(|q| q.last)
                .unwrap_or(*initial);

            let change: f64 = rng.gen_range(-1.0..1.0);
            let multiplier = Decimal::from_f64(1.0 + vol * change).unwrap_or(Decimal::ONE);
            let next = (last * multiplier).round_dp(6);

            debug!("[feed] {} last {} -> {}", instrument_id, last, next);
            self.quotes
                .insert(instrument_id.clone(), self.quote_around(next));
        }
        Ok(())
    }

    fn quote(&self, instrument_id: &InstrumentId) -> Option<Quote> {
        self.quotes.get(instrument_id).map(|q| *q)
    }

    fn instruments(&self) -> Vec<InstrumentId> {
        self.config.initial_prices.keys().cloned().collect()
    }
}

/// Fixed-quote feed for tests and embedding
///
/// `refresh` re-stamps every quote with the current clock time, so
/// staleness gates see the quotes as fresh after each cycle.
#[derive(Clone)]
pub struct StaticFeed {
    quotes: Arc<DashMap<InstrumentId, Quote>>,
    clock: Arc<dyn Clock>,
}

impl StaticFeed {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            quotes: Arc::new(DashMap::new()),
            clock,
        }
    }

    /// Set the last price for an instrument; bid/ask default to last
    pub fn set_last(&self, instrument_id: impl Into<InstrumentId>, last: Decimal) {
        let quote = Quote::new(last, last, last, self.clock.now());
        self.quotes.insert(instrument_id.into(), quote);
    }

    /// Install a full quote
    pub fn set_quote(&self, instrument_id: impl Into<InstrumentId>, quote: Quote) {
        self.quotes.insert(instrument_id.into(), quote);
    }

    /// Drop an instrument's quote entirely
    pub fn clear(&self, instrument_id: &InstrumentId) {
        self.quotes.remove(instrument_id);
    }
}

#[async_trait]
impl MarketDataFeed for StaticFeed {
    async fn refresh(&self) -> Result<(), FeedError> {
        let now = self.clock.now();
        for mut entry in self.quotes.iter_mut() {
            entry.timestamp = now;
        }
        Ok(())
    }

    fn quote(&self, instrument_id: &InstrumentId) -> Option<Quote> {
        self.quotes.get(instrument_id).map(|q| *q)
    }

    fn instruments(&self) -> Vec<InstrumentId> {
        self.quotes.iter().map(|e| e.key().clone()).collect()
    }
}
