//! Predictive model port and reference implementations
//!
//! A model only scores direction and confidence; stops, targets, and
//! sizing are the agent's job.

use meridian_core::{InstrumentId, Side};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::error::{AgentError, Result};
use crate::features::FeatureFrame;

/// Directional view with a confidence in [0, 1]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    pub side: Side,
    pub confidence: Decimal,
}

/// Port for the wrapped predictive model
pub trait SignalModel: Send + Sync {
    /// Model name for logging and attribution
    fn name(&self) -> &str;

    /// Score one instrument; `None` when the model has no view
    fn predict(
        &self,
        instrument_id: &InstrumentId,
        features: &FeatureFrame,
    ) -> Result<Option<Prediction>>;
}

/// Trailing-return momentum
///
/// Goes with the recent move: confidence scales with the magnitude of
/// the return over the lookback window.
pub struct MomentumModel {
    pub lookback: usize,
    /// Confidence per unit of absolute return (e.g. 20 -> a 2% move
    /// scores 0.4)
    pub sensitivity: Decimal,
}

impl Default for MomentumModel {
    fn default() -> Self {
        Self {
            lookback: 5,
            sensitivity: dec!(20),
        }
    }
}

impl SignalModel for MomentumModel {
    fn name(&self) -> &str {
        "momentum"
    }

    fn predict(
        &self,
        instrument_id: &InstrumentId,
        features: &FeatureFrame,
    ) -> Result<Option<Prediction>> {
        let Some(bars) = features.bars(instrument_id) else {
            return Ok(None);
        };
        if self.lookback == 0 || bars.len() < self.lookback + 1 {
            return Ok(None);
        }

        let last = bars[bars.len() - 1].close;
        let base = bars[bars.len() - 1 - self.lookback].close;
        if base.is_zero() {
            return Err(AgentError::Model {
                model: self.name().to_string(),
                reason: format!("zero base price for {instrument_id}"),
            });
        }

        let ret = (last - base) / base;
        if ret.is_zero() {
            return Ok(None);
        }

        let side = if ret > Decimal::ZERO {
            Side::Buy
        } else {
            Side::Sell
        };
        let confidence = (ret.abs() * self.sensitivity).min(Decimal::ONE);
        Ok(Some(Prediction { side, confidence }))
    }
}

/// Reversion toward the trailing mean
///
/// Fades the deviation: buys below the mean, sells above it.
pub struct MeanReversionModel {
    pub lookback: usize,
    /// Confidence per unit of absolute deviation from the mean
    pub sensitivity: Decimal,
}

impl Default for MeanReversionModel {
    fn default() -> Self {
        Self {
            lookback: 10,
            sensitivity: dec!(25),
        }
    }
}

impl SignalModel for MeanReversionModel {
    fn name(&self) -> &str {
        "mean-reversion"
    }

    fn predict(
        &self,
        instrument_id: &InstrumentId,
        features: &FeatureFrame,
    ) -> Result<Option<Prediction>> {
        let Some(bars) = features.bars(instrument_id) else {
            return Ok(None);
        };
        if self.lookback == 0 || bars.len() < self.lookback {
            return Ok(None);
        }

        let window = &bars[bars.len() - self.lookback..];
        let mean: Decimal =
            window.iter().map(|b| b.close).sum::<Decimal>() / Decimal::from(self.lookback);
        if mean.is_zero() {
            return Err(AgentError::Model {
                model: self.name().to_string(),
                reason: format!("zero mean price for {instrument_id}"),
            });
        }

        let last = bars[bars.len() - 1].close;
        let deviation = (last - mean) / mean;
        if deviation.is_zero() {
            return Ok(None);
        }

        let side = if deviation < Decimal::ZERO {
            Side::Buy
        } else {
            Side::Sell
        };
        let confidence = (deviation.abs() * self.sensitivity).min(Decimal::ONE);
        Ok(Some(Prediction { side, confidence }))
    }
}
