//! The order gateway
//!
//! Sequences validate -> submit -> execute -> settle for every order,
//! with write-ahead auditing: the request event is appended before any
//! processing, and each outcome event is appended before the in-memory
//! state is committed or the result returned.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use chrono::Duration as ChronoDuration;
use log::{debug, info, warn};
use meridian_core::{
    AuditEvent, AuditRecord, InstrumentId, Order, OrderId, OrderRequest, OrderStatus, Position,
    PositionKey, Quote, Timestamp, TradeRecord,
};
use meridian_ports::{Clock, ExecutionOutcome, ExecutionVenue, MarketDataFeed, PersistenceSink};
use meridian_risk::{RiskDecision, RiskValidator};
use rust_decimal::Decimal;

use crate::error::{Error, Result};
use crate::replay::replay;
use crate::stats::ExecutionStats;

/// Gateway tuning knobs
#[derive(Debug, Clone)]
pub struct OrderBookConfig {
    /// Bound on a single venue call; elapsed means Rejected, never an
    /// ambiguous Submitted
    pub venue_timeout: Duration,
    /// Quotes older than this block submission for their instrument
    pub max_quote_age: ChronoDuration,
}

impl Default for OrderBookConfig {
    fn default() -> Self {
        Self {
            venue_timeout: Duration::from_secs(2),
            max_quote_age: ChronoDuration::seconds(30),
        }
    }
}

/// Successful result of a submit call
#[derive(Debug, Clone)]
pub enum SubmitOutcome {
    /// Fully filled; the trade carries execution details
    Filled { trade: TradeRecord },
    /// Partially filled; the remainder keeps working
    PartiallyFilled { trade: TradeRecord },
    /// Accepted but resting at the venue (limit/stop not reached)
    Working { reason: String },
}

impl SubmitOutcome {
    /// The fill behind this outcome, if any
    pub fn trade(&self) -> Option<&TradeRecord> {
        match self {
            SubmitOutcome::Filled { trade } | SubmitOutcome::PartiallyFilled { trade } => {
                Some(trade)
            }
            SubmitOutcome::Working { .. } => None,
        }
    }
}

/// The authoritative owner of order and position state
///
/// Single writer: all mutation goes through `&mut self`, so submissions
/// for the same position key can never race. Readers get clones.
pub struct OrderBook {
    config: OrderBookConfig,
    validator: RiskValidator,
    venue: Arc<dyn ExecutionVenue>,
    feed: Arc<dyn MarketDataFeed>,
    sink: Arc<dyn PersistenceSink>,
    clock: Arc<dyn Clock>,
    orders: HashMap<OrderId, Order>,
    positions: HashMap<PositionKey, Position>,
    trades: Vec<TradeRecord>,
    /// Accepted-order timestamps per agent for the rolling-minute gate
    accepted_at: HashMap<String, VecDeque<Timestamp>>,
    seq: u64,
}

impl OrderBook {
    pub fn new(
        config: OrderBookConfig,
        validator: RiskValidator,
        venue: Arc<dyn ExecutionVenue>,
        feed: Arc<dyn MarketDataFeed>,
        sink: Arc<dyn PersistenceSink>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            config,
            validator,
            venue,
            feed,
            sink,
            clock,
            orders: HashMap::new(),
            positions: HashMap::new(),
            trades: Vec::new(),
            accepted_at: HashMap::new(),
            seq: 0,
        }
    }

    /// Rebuild a book from the sink's audit log
    ///
    /// Orders, positions, trades, and the rate-limiter window are all
    /// reconstructed from the log alone.
    pub fn recover(
        config: OrderBookConfig,
        validator: RiskValidator,
        venue: Arc<dyn ExecutionVenue>,
        feed: Arc<dyn MarketDataFeed>,
        sink: Arc<dyn PersistenceSink>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let records = sink.load_audit()?;
        let state = replay(&records);
        info!(
            "[book] recovered {} orders, {} positions, {} trades from audit log",
            state.orders.len(),
            state.positions.len(),
            state.trades.len()
        );
        Ok(Self {
            config,
            validator,
            venue,
            feed,
            sink,
            clock,
            orders: state.orders,
            positions: state.positions,
            trades: state.trades,
            accepted_at: state.accepted_at,
            seq: state.next_seq,
        })
    }

    /// Submit a candidate order through the full pipeline
    ///
    /// Returns fill details on execution, `Working` when the order rests
    /// at the venue, and an attributed error on any rejection. Whatever
    /// the outcome, the order ends in a well-defined state and every
    /// step is audit-logged before this returns.
    pub async fn submit(&mut self, request: OrderRequest) -> Result<(OrderId, SubmitOutcome)> {
        let now = self.clock.now();
        let shape_ok = request.validate();
        let mut order = Order::from_request(request, now);
        let order_id = order.id;

        // Write-ahead: the request is on the log before any processing
        self.append(now, AuditEvent::SubmitRequested { order: order.clone() })?;

        if !shape_ok {
            let reason = "malformed order: bad quantity or missing price".to_string();
            return self.reject_pending(order, now, reason);
        }

        // Market data precondition: a fresh quote must exist
        let quote = match self.fresh_quote(&order.instrument_id, now) {
            Some(quote) => quote,
            None => {
                let instrument_id = order.instrument_id.clone();
                self.append(
                    now,
                    AuditEvent::VenueRejected {
                        order_id,
                        reason: "no market data".to_string(),
                    },
                )?;
                self.transition(&mut order, OrderStatus::Rejected)?;
                order.updated_at = now;
                self.orders.insert(order_id, order);
                return Err(Error::NoMarketData {
                    order_id,
                    instrument_id,
                });
            }
        };

        // Risk gate
        let agent_positions = self.positions_for(&order.agent_id);
        let recent: Vec<Timestamp> = self
            .accepted_at
            .get(&order.agent_id)
            .map(|q| q.iter().copied().collect())
            .unwrap_or_default();
        let decision =
            self.validator
                .validate(&order, quote.last, &agent_positions, &recent, now);
        if let RiskDecision::Reject(rejection) = decision {
            return self.reject_pending(order, now, rejection.message);
        }

        // Accepted: record the timestamp that feeds the rolling window
        self.record_accepted(&order.agent_id, now);
        self.transition(&mut order, OrderStatus::Submitted)?;
        self.append(now, AuditEvent::Submitted { order_id })?;
        debug!(
            "[book] order {} submitted: {} {} {} ({:?})",
            order_id, order.side, order.quantity, order.instrument_id, order.order_type
        );

        // Venue call, bounded
        let outcome = self.execute_at_venue(&order, &quote).await;
        match outcome {
            Ok(ExecutionOutcome::Filled {
                quantity,
                price,
                commission,
            }) => {
                let trade = self.settle_fill(&mut order, quantity, price, commission, now)?;
                let outcome = if order.status == OrderStatus::Filled {
                    SubmitOutcome::Filled { trade }
                } else {
                    SubmitOutcome::PartiallyFilled { trade }
                };
                self.orders.insert(order_id, order);
                Ok((order_id, outcome))
            }
            Ok(ExecutionOutcome::Pending { reason }) => {
                self.append(
                    now,
                    AuditEvent::VenuePending {
                        order_id,
                        reason: reason.clone(),
                    },
                )?;
                self.orders.insert(order_id, order);
                Ok((order_id, SubmitOutcome::Working { reason }))
            }
            Ok(ExecutionOutcome::Rejected { reason }) => {
                self.append(
                    now,
                    AuditEvent::VenueRejected {
                        order_id,
                        reason: reason.clone(),
                    },
                )?;
                self.transition(&mut order, OrderStatus::Rejected)?;
                order.updated_at = now;
                self.orders.insert(order_id, order);
                warn!("[book] venue rejected order {order_id}: {reason}");
                Err(Error::VenueRejected { order_id, reason })
            }
            Err(err) => {
                let (reason, mapped) = match err {
                    VenueCallError::Timeout => (
                        "venue timeout".to_string(),
                        Error::VenueTimeout { order_id },
                    ),
                    VenueCallError::Venue(source) => (
                        format!("venue unavailable: {source}"),
                        Error::Venue { order_id, source },
                    ),
                };
                self.append(
                    now,
                    AuditEvent::VenueRejected {
                        order_id,
                        reason: reason.clone(),
                    },
                )?;
                self.transition(&mut order, OrderStatus::Rejected)?;
                order.updated_at = now;
                self.orders.insert(order_id, order);
                warn!("[book] order {order_id} rejected: {reason}");
                Err(mapped)
            }
        }
    }

    /// Cancel a working order
    ///
    /// Fails with `NotCancellable` once the order is terminal or has any
    /// filled quantity; the attempt is audit-logged either way.
    pub fn cancel(&mut self, order_id: OrderId) -> Result<()> {
        let now = self.clock.now();
        self.append(now, AuditEvent::CancelRequested { order_id })?;

        let (status, filled) = match self.orders.get(&order_id) {
            Some(order) => (order.status, order.filled_quantity),
            None => {
                self.append(
                    now,
                    AuditEvent::CancelRejected {
                        order_id,
                        reason: "unknown order".to_string(),
                    },
                )?;
                return Err(Error::UnknownOrder(order_id));
            }
        };

        if status.is_terminal() || filled > Decimal::ZERO {
            let reason = if filled > Decimal::ZERO {
                format!("order has filled quantity {filled}")
            } else {
                format!("order is already {status}")
            };
            self.append(
                now,
                AuditEvent::CancelRejected {
                    order_id,
                    reason: reason.clone(),
                },
            )?;
            return Err(Error::NotCancellable { order_id, reason });
        }

        self.append(now, AuditEvent::Cancelled { order_id })?;
        if let Some(order) = self.orders.get_mut(&order_id) {
            order.status = OrderStatus::Cancelled;
            order.updated_at = now;
        }
        info!("[book] order {order_id} cancelled");
        Ok(())
    }

    /// Retry working (venue-pending) orders against fresh quotes
    ///
    /// Called once per cycle before exits and entries. Fills settle
    /// exactly like first-pass fills; still-unreached orders keep
    /// resting without extra audit noise.
    pub async fn sweep_working(&mut self) -> Result<Vec<TradeRecord>> {
        let working: Vec<OrderId> = self
            .orders
            .values()
            .filter(|o| {
                matches!(
                    o.status,
                    OrderStatus::Submitted | OrderStatus::PartiallyFilled
                )
            })
            .map(|o| o.id)
            .collect();

        let mut fills = Vec::new();
        for order_id in working {
            let now = self.clock.now();
            let Some(mut order) = self.orders.get(&order_id).cloned() else {
                continue;
            };
            let Some(quote) = self.fresh_quote(&order.instrument_id, now) else {
                continue;
            };

            match self.execute_at_venue(&order, &quote).await {
                Ok(ExecutionOutcome::Filled {
                    quantity,
                    price,
                    commission,
                }) => {
                    let trade = self.settle_fill(&mut order, quantity, price, commission, now)?;
                    self.orders.insert(order_id, order);
                    fills.push(trade);
                }
                Ok(ExecutionOutcome::Pending { .. }) => {}
                Ok(ExecutionOutcome::Rejected { reason }) => {
                    self.reject_working(order, reason, now)?;
                }
                Err(err) => {
                    let reason = match err {
                        VenueCallError::Timeout => "venue timeout".to_string(),
                        VenueCallError::Venue(source) => format!("venue unavailable: {source}"),
                    };
                    self.reject_working(order, reason, now)?;
                }
            }
        }
        Ok(fills)
    }

    /// Snapshot of one agent's open positions (owned copies)
    pub fn positions_for(&self, agent_id: &str) -> Vec<Position> {
        self.positions
            .values()
            .filter(|p| p.agent_id == agent_id)
            .cloned()
            .collect()
    }

    /// Snapshot of one (agent, instrument) position
    pub fn position(&self, agent_id: &str, instrument_id: &InstrumentId) -> Option<Position> {
        self.positions
            .get(&(agent_id.to_string(), instrument_id.clone()))
            .cloned()
    }

    /// Count of open positions across all agents
    pub fn open_position_count(&self) -> usize {
        self.positions.len()
    }

    /// Snapshot of an order by id
    pub fn order(&self, order_id: OrderId) -> Option<Order> {
        self.orders.get(&order_id).cloned()
    }

    /// The most recent `limit` trades, oldest first
    pub fn trade_history(&self, limit: usize) -> Vec<TradeRecord> {
        let start = self.trades.len().saturating_sub(limit);
        self.trades[start..].to_vec()
    }

    /// Read-only aggregates over orders, trades, and positions
    pub fn execution_stats(&self) -> ExecutionStats {
        let mut stats = ExecutionStats {
            orders_submitted: self.orders.len() as u64,
            open_positions: self.positions.len() as u64,
            total_fills: self.trades.len() as u64,
            ..ExecutionStats::default()
        };
        for order in self.orders.values() {
            match order.status {
                OrderStatus::Filled => stats.orders_filled += 1,
                OrderStatus::Rejected => stats.orders_rejected += 1,
                OrderStatus::Cancelled => stats.orders_cancelled += 1,
                OrderStatus::Submitted | OrderStatus::PartiallyFilled => {
                    stats.working_orders += 1
                }
                OrderStatus::Pending => {}
            }
        }
        for trade in &self.trades {
            stats.total_volume += trade.quantity;
            stats.total_commission += trade.commission;
            stats.realized_pnl += trade.realized_pnl;
        }
        stats
    }

    // ---- internals ----

    fn append(&mut self, now: Timestamp, event: AuditEvent) -> Result<()> {
        let record = AuditRecord {
            seq: self.seq,
            recorded_at: now,
            event,
        };
        self.sink.append_audit(&record)?;
        self.seq += 1;
        Ok(())
    }

    fn fresh_quote(&self, instrument_id: &InstrumentId, now: Timestamp) -> Option<Quote> {
        self.feed
            .quote(instrument_id)
            .filter(|q| q.is_fresh(now, self.config.max_quote_age))
    }

    fn record_accepted(&mut self, agent_id: &str, now: Timestamp) {
        let window = self.accepted_at.entry(agent_id.to_string()).or_default();
        window.push_back(now);
        // Prune anything that can no longer affect the trailing minute
        let cutoff = now - ChronoDuration::seconds(120);
        while window.front().is_some_and(|t| *t < cutoff) {
            window.pop_front();
        }
    }

    fn transition(&self, order: &mut Order, to: OrderStatus) -> Result<()> {
        if !order.status.can_transition_to(to) {
            return Err(Error::IllegalTransition {
                order_id: order.id,
                from: order.status,
                to,
            });
        }
        order.status = to;
        Ok(())
    }

    /// Reject a working order on sweep
    ///
    /// An order with any filled quantity can no longer become Rejected;
    /// it stays working and the rejection is only logged.
    fn reject_working(&mut self, mut order: Order, reason: String, now: Timestamp) -> Result<()> {
        let order_id = order.id;
        if order.status != OrderStatus::Submitted {
            warn!(
                "[book] venue rejected partially filled order {order_id}; leaving it working: {reason}"
            );
            return Ok(());
        }
        self.append(
            now,
            AuditEvent::VenueRejected {
                order_id,
                reason: reason.clone(),
            },
        )?;
        self.transition(&mut order, OrderStatus::Rejected)?;
        order.updated_at = now;
        self.orders.insert(order_id, order);
        warn!("[book] working order {order_id} rejected on sweep: {reason}");
        Ok(())
    }

    /// Reject an order still in `Pending` (shape or risk failure)
    fn reject_pending(
        &mut self,
        mut order: Order,
        now: Timestamp,
        reason: String,
    ) -> Result<(OrderId, SubmitOutcome)> {
        let order_id = order.id;
        self.append(
            now,
            AuditEvent::RiskRejected {
                order_id,
                reason: reason.clone(),
            },
        )?;
        self.transition(&mut order, OrderStatus::Rejected)?;
        order.updated_at = now;
        self.orders.insert(order_id, order);
        Err(Error::Validation { order_id, reason })
    }

    async fn execute_at_venue(
        &self,
        order: &Order,
        quote: &Quote,
    ) -> std::result::Result<ExecutionOutcome, VenueCallError> {
        match tokio::time::timeout(
            self.config.venue_timeout,
            self.venue.execute(order, Some(quote)),
        )
        .await
        {
            Ok(Ok(outcome)) => Ok(outcome),
            Ok(Err(source)) => Err(VenueCallError::Venue(source)),
            Err(_elapsed) => Err(VenueCallError::Timeout),
        }
    }

    /// Settle a fill: audit first, then commit order/position/trade state
    fn settle_fill(
        &mut self,
        order: &mut Order,
        quantity: Decimal,
        price: Decimal,
        commission: Decimal,
        now: Timestamp,
    ) -> Result<TradeRecord> {
        let key: PositionKey = (order.agent_id.clone(), order.instrument_id.clone());
        let mut position = self
            .positions
            .get(&key)
            .cloned()
            .unwrap_or_else(|| Position::new(key.0.clone(), key.1.clone(), now));
        let realized_pnl = position.apply_fill(order.side, quantity, price, commission, now);

        order.record_fill(quantity, price, commission, now);
        let next = if order.is_filled() {
            OrderStatus::Filled
        } else {
            OrderStatus::PartiallyFilled
        };
        self.transition(order, next)?;

        let trade = TradeRecord::new(
            order.id,
            order.agent_id.clone(),
            order.instrument_id.clone(),
            order.side,
            quantity,
            price,
            commission,
            realized_pnl,
            now,
        );

        // Write-ahead: the fill is durable before the in-memory commit
        self.append(now, AuditEvent::Fill { trade: trade.clone() })?;

        if position.is_flat() {
            self.positions.remove(&key);
        } else {
            self.positions.insert(key, position);
        }
        self.trades.push(trade.clone());
        info!(
            "[book] fill: {} {} {} @ {} (order {}, realized {})",
            order.side, quantity, order.instrument_id, price, order.id, realized_pnl
        );
        Ok(trade)
    }
}

enum VenueCallError {
    Timeout,
    Venue(meridian_ports::VenueError),
}
