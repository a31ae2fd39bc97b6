//! Feature history and volatility
//!
//! A [`FeatureFrame`] holds a rolling window of bars per instrument.
//! The orchestrator folds each cycle's quote into a bar; agents read
//! last prices and average true range from the frame.

use std::collections::HashMap;

use meridian_core::InstrumentId;
use rust_decimal::Decimal;

/// One price bar
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bar {
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
}

impl Bar {
    pub fn new(high: Decimal, low: Decimal, close: Decimal) -> Self {
        Self { high, low, close }
    }

    /// True range against the previous close
    fn true_range(&self, prev_close: Decimal) -> Decimal {
        let hl = self.high - self.low;
        let hc = (self.high - prev_close).abs();
        let lc = (self.low - prev_close).abs();
        hl.max(hc).max(lc)
    }
}

/// Rolling per-instrument bar history, oldest first
#[derive(Debug, Clone, Default)]
pub struct FeatureFrame {
    bars: HashMap<InstrumentId, Vec<Bar>>,
    /// Bars retained per instrument (0 = unbounded)
    max_bars: usize,
}

impl FeatureFrame {
    pub fn new() -> Self {
        Self::default()
    }

    /// Retain at most `max_bars` bars per instrument
    pub fn with_capacity(max_bars: usize) -> Self {
        Self {
            bars: HashMap::new(),
            max_bars,
        }
    }

    /// Append a full bar
    pub fn push_bar(&mut self, instrument_id: impl Into<InstrumentId>, bar: Bar) {
        let series = self.bars.entry(instrument_id.into()).or_default();
        series.push(bar);
        if self.max_bars > 0 && series.len() > self.max_bars {
            series.remove(0);
        }
    }

    /// Fold a tick's last price into a bar against the previous close
    pub fn push_last(&mut self, instrument_id: impl Into<InstrumentId>, last: Decimal) {
        let instrument_id = instrument_id.into();
        let prev_close = self
            .bars
            .get(&instrument_id)
            .and_then(|s| s.last())
            .map(|b| b.close)
            .unwrap_or(last);
        let bar = Bar::new(last.max(prev_close), last.min(prev_close), last);
        self.push_bar(instrument_id, bar);
    }

    pub fn bars(&self, instrument_id: &InstrumentId) -> Option<&[Bar]> {
        self.bars.get(instrument_id).map(|s| s.as_slice())
    }

    /// Latest close for an instrument
    pub fn last_price(&self, instrument_id: &InstrumentId) -> Option<Decimal> {
        self.bars
            .get(instrument_id)
            .and_then(|s| s.last())
            .map(|b| b.close)
    }

    /// Average true range over the trailing `window` bars
    ///
    /// Needs `window + 1` bars (each true range references the previous
    /// close); returns `None` until enough history accumulates.
    pub fn atr(&self, instrument_id: &InstrumentId, window: usize) -> Option<Decimal> {
        if window == 0 {
            return None;
        }
        let series = self.bars.get(instrument_id)?;
        if series.len() < window + 1 {
            return None;
        }

        let start = series.len() - window;
        let mut sum = Decimal::ZERO;
        for i in start..series.len() {
            sum += series[i].true_range(series[i - 1].close);
        }
        Some(sum / Decimal::from(window))
    }

    pub fn instruments(&self) -> Vec<InstrumentId> {
        self.bars.keys().cloned().collect()
    }
}
