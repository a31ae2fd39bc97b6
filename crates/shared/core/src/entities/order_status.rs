use serde::{Deserialize, Serialize};

/// Order lifecycle status
///
/// Transitions are monotonic:
///
/// ```text
/// Pending ──► Submitted ──► PartiallyFilled ──► Filled
///    │            │               │
///    │            ├──► Filled     └──► (no Cancelled/Rejected after a fill)
///    │            ├──► Rejected
///    │            └──► Cancelled
///    ├──► Rejected
///    └──► Cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderStatus {
    /// Construction state, before risk validation
    Pending,
    /// Passed risk validation, forwarded to the venue
    Submitted,
    /// Venue filled part of the quantity
    PartiallyFilled,
    /// Completely filled
    Filled,
    /// Rejected by risk validation or by the venue
    Rejected,
    /// Cancelled before any fill
    Cancelled,
}

impl OrderStatus {
    /// Returns true if the order is in a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Filled | OrderStatus::Rejected | OrderStatus::Cancelled
        )
    }

    /// Returns true if the order is still working
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            OrderStatus::Pending | OrderStatus::Submitted | OrderStatus::PartiallyFilled
        )
    }

    /// Whether a transition from `self` to `next` is legal
    ///
    /// Cancellation is only reachable before any fill; fills are only
    /// reachable through `Submitted`.
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        match (self, next) {
            (Pending, Submitted) | (Pending, Rejected) | (Pending, Cancelled) => true,
            (Submitted, PartiallyFilled)
            | (Submitted, Filled)
            | (Submitted, Rejected)
            | (Submitted, Cancelled) => true,
            (PartiallyFilled, PartiallyFilled) | (PartiallyFilled, Filled) => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            OrderStatus::Pending => "Pending",
            OrderStatus::Submitted => "Submitted",
            OrderStatus::PartiallyFilled => "PartiallyFilled",
            OrderStatus::Filled => "Filled",
            OrderStatus::Rejected => "Rejected",
            OrderStatus::Cancelled => "Cancelled",
        };
        write!(f, "{s}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fills_require_submitted() {
        assert!(!OrderStatus::Pending.can_transition_to(OrderStatus::Filled));
        assert!(!OrderStatus::Pending.can_transition_to(OrderStatus::PartiallyFilled));
        assert!(OrderStatus::Submitted.can_transition_to(OrderStatus::Filled));
        assert!(OrderStatus::Submitted.can_transition_to(OrderStatus::PartiallyFilled));
    }

    #[test]
    fn test_no_cancel_after_fill() {
        assert!(!OrderStatus::PartiallyFilled.can_transition_to(OrderStatus::Cancelled));
        assert!(!OrderStatus::Filled.can_transition_to(OrderStatus::Cancelled));
        assert!(OrderStatus::Pending.can_transition_to(OrderStatus::Cancelled));
        assert!(OrderStatus::Submitted.can_transition_to(OrderStatus::Cancelled));
    }

    #[test]
    fn test_terminal_states_are_final() {
        for terminal in [
            OrderStatus::Filled,
            OrderStatus::Rejected,
            OrderStatus::Cancelled,
        ] {
            for next in [
                OrderStatus::Pending,
                OrderStatus::Submitted,
                OrderStatus::PartiallyFilled,
                OrderStatus::Filled,
                OrderStatus::Rejected,
                OrderStatus::Cancelled,
            ] {
                assert!(!terminal.can_transition_to(next));
            }
        }
    }
}
