//! Simulated execution venue
//!
//! Market orders fill immediately at the slippage-adjusted ask (buy) or
//! bid (sell). Limit and take-profit orders fill only when the adjusted
//! quote reaches the limit price; stop-loss orders trigger when the
//! adjusted quote crosses the stop price and then fill like market
//! orders. Untriggered orders come back `Pending` and rest in the book.

use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use meridian_core::{Order, OrderType, Quote, Side};
use meridian_ports::{ExecutionOutcome, ExecutionVenue, VenueError};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Simulation parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VenueConfig {
    /// Fraction of the last price applied as half-spread slippage
    pub slippage_fraction: Decimal,
    /// Commission as a fraction of fill notional
    pub commission_rate: Decimal,
    /// Simulated round-trip latency
    pub latency: Duration,
}

impl Default for VenueConfig {
    fn default() -> Self {
        Self {
            slippage_fraction: dec!(0.0005),
            commission_rate: dec!(0.001),
            latency: Duration::ZERO,
        }
    }
}

/// Simulated venue implementing the `ExecutionVenue` port
pub struct SimulatedVenue {
    config: VenueConfig,
}

impl SimulatedVenue {
    pub fn new(config: VenueConfig) -> Self {
        Self { config }
    }

    /// Price a fill for `order` against an adjusted quote, if it fills
    fn fill_price(&self, order: &Order, bid: Decimal, ask: Decimal) -> FillRule {
        match order.order_type {
            OrderType::Market => FillRule::Fill(match order.side {
                Side::Buy => ask,
                Side::Sell => bid,
            }),
            OrderType::Limit | OrderType::TakeProfit => {
                let Some(limit) = order.limit_price else {
                    return FillRule::Reject("limit order without limit price".to_string());
                };
                match order.side {
                    Side::Buy if ask <= limit => FillRule::Fill(ask),
                    Side::Sell if bid >= limit => FillRule::Fill(bid),
                    _ => FillRule::Rest("limit price not reached".to_string()),
                }
            }
            OrderType::StopLoss => {
                let Some(stop) = order.stop_price else {
                    return FillRule::Reject("stop order without stop price".to_string());
                };
                match order.side {
                    Side::Sell if bid <= stop => FillRule::Fill(bid),
                    Side::Buy if ask >= stop => FillRule::Fill(ask),
                    _ => FillRule::Rest("stop price not triggered".to_string()),
                }
            }
        }
    }
}

enum FillRule {
    Fill(Decimal),
    Rest(String),
    Reject(String),
}

#[async_trait]
impl ExecutionVenue for SimulatedVenue {
    async fn execute(
        &self,
        order: &Order,
        quote: Option<&Quote>,
    ) -> Result<ExecutionOutcome, VenueError> {
        if self.config.latency > Duration::ZERO {
            tokio::time::sleep(self.config.latency).await;
        }

        let Some(quote) = quote else {
            return Ok(ExecutionOutcome::Rejected {
                reason: "no market data".to_string(),
            });
        };

        let slip = quote.last * self.config.slippage_fraction;
        let ask = quote.last + slip;
        let bid = quote.last - slip;

        match self.fill_price(order, bid, ask) {
            FillRule::Fill(price) => {
                let quantity = order.remaining_quantity();
                let commission = (quantity * price).abs() * self.config.commission_rate;
                debug!(
                    "[venue] fill {} {} {} @ {} (commission {})",
                    order.side, quantity, order.instrument_id, price, commission
                );
                Ok(ExecutionOutcome::Filled {
                    quantity,
                    price,
                    commission,
                })
            }
            FillRule::Rest(reason) => Ok(ExecutionOutcome::Pending { reason }),
            FillRule::Reject(reason) => Ok(ExecutionOutcome::Rejected { reason }),
        }
    }

    fn name(&self) -> &str {
        "SimulatedVenue"
    }
}
