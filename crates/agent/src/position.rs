//! Agent-side position view
//!
//! Independent of the order book's authoritative positions: this is the
//! agent's record of what it holds and where its exits sit. The state
//! machine is `Open -> Closed(reason)`, terminal once closed; a closed
//! position never reopens under the same id.

use chrono::{DateTime, Utc};
use meridian_core::{ExitReason, InstrumentId, Side};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AgentError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PositionState {
    Open,
    Closed(ExitReason),
}

/// One open (or historical) position as the agent sees it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentPosition {
    pub id: Uuid,
    pub instrument_id: InstrumentId,
    /// Entry direction
    pub side: Side,
    /// Unsigned quantity
    pub quantity: Decimal,
    pub entry_price: Decimal,
    pub stop_loss: Decimal,
    pub take_profit: Decimal,
    pub state: PositionState,
    pub opened_at: DateTime<Utc>,
}

impl AgentPosition {
    pub fn open(
        instrument_id: InstrumentId,
        side: Side,
        quantity: Decimal,
        entry_price: Decimal,
        stop_loss: Decimal,
        take_profit: Decimal,
        opened_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            instrument_id,
            side,
            quantity,
            entry_price,
            stop_loss,
            take_profit,
            state: PositionState::Open,
            opened_at,
        }
    }

    pub fn is_open(&self) -> bool {
        self.state == PositionState::Open
    }

    /// Close the position; closing twice is a contract violation
    pub fn close(&mut self, reason: ExitReason) -> Result<(), AgentError> {
        if !self.is_open() {
            return Err(AgentError::AlreadyClosed(self.instrument_id.clone()));
        }
        self.state = PositionState::Closed(reason);
        Ok(())
    }

    /// Which exit, if any, the current price has breached
    pub fn breached_exit(&self, last: Decimal) -> Option<ExitReason> {
        if !self.is_open() {
            return None;
        }
        match self.side {
            Side::Buy => {
                if last <= self.stop_loss {
                    Some(ExitReason::StopLoss)
                } else if last >= self.take_profit {
                    Some(ExitReason::TakeProfit)
                } else {
                    None
                }
            }
            Side::Sell => {
                if last >= self.stop_loss {
                    Some(ExitReason::StopLoss)
                } else if last <= self.take_profit {
                    Some(ExitReason::TakeProfit)
                } else {
                    None
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn long_position() -> AgentPosition {
        AgentPosition::open(
            InstrumentId::new("AAPL"),
            Side::Buy,
            dec!(10),
            dec!(100),
            dec!(95),
            dec!(110),
            Utc::now(),
        )
    }

    #[test]
    fn test_long_exit_levels() {
        let pos = long_position();

        assert_eq!(pos.breached_exit(dec!(100)), None);
        assert_eq!(pos.breached_exit(dec!(95)), Some(ExitReason::StopLoss));
        assert_eq!(pos.breached_exit(dec!(110)), Some(ExitReason::TakeProfit));
    }

    #[test]
    fn test_short_exit_levels() {
        let pos = AgentPosition::open(
            InstrumentId::new("AAPL"),
            Side::Sell,
            dec!(10),
            dec!(100),
            dec!(105),
            dec!(90),
            Utc::now(),
        );

        assert_eq!(pos.breached_exit(dec!(100)), None);
        assert_eq!(pos.breached_exit(dec!(105)), Some(ExitReason::StopLoss));
        assert_eq!(pos.breached_exit(dec!(90)), Some(ExitReason::TakeProfit));
    }

    #[test]
    fn test_close_is_terminal() {
        let mut pos = long_position();

        pos.close(ExitReason::StopLoss).unwrap();
        assert!(!pos.is_open());
        assert!(pos.close(ExitReason::Manual).is_err());
        // A closed position no longer reports exits
        assert_eq!(pos.breached_exit(dec!(0)), None);
    }
}
