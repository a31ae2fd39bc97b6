//! Signal ranking
//!
//! All agents' signals merge into one list ordered by
//! `priority_score = confidence * w1 + risk_reward_ratio * w2`.
//! The weights are named configuration so reweighting is testable
//! independently of the ranking mechanics. Exact ties break
//! deterministically by ascending (agent_id, instrument_id), making the
//! merge a total order that replays identically.

use meridian_core::{InstrumentId, Signal};
use priority_queue::PriorityQueue;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Named ranking weights
#[derive(Debug, Clone)]
pub struct RankWeights {
    pub confidence_weight: Decimal,
    pub reward_weight: Decimal,
}

impl Default for RankWeights {
    fn default() -> Self {
        Self {
            confidence_weight: dec!(0.6),
            reward_weight: dec!(0.4),
        }
    }
}

/// Blended priority of one signal
pub fn priority_score(signal: &Signal, weights: &RankWeights) -> Decimal {
    signal.confidence * weights.confidence_weight
        + signal.risk_reward_ratio() * weights.reward_weight
}

/// Ranking key: higher score wins; ties go to the lexicographically
/// smaller (agent_id, instrument_id)
#[derive(Debug, PartialEq, Eq)]
struct Priority {
    score: Decimal,
    agent_id: String,
    instrument_id: InstrumentId,
}

impl Ord for Priority {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.score.cmp(&other.score).then_with(|| {
            // Reversed: smaller ids take priority on equal scores
            (&other.agent_id, &other.instrument_id).cmp(&(&self.agent_id, &self.instrument_id))
        })
    }
}

impl PartialOrd for Priority {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// Merge signals from all agents into one ranked list, best first
pub fn rank_signals(signals: Vec<Signal>, weights: &RankWeights) -> Vec<Signal> {
    let mut queue: PriorityQueue<usize, Priority> = PriorityQueue::new();
    for (index, signal) in signals.iter().enumerate() {
        queue.push(
            index,
            Priority {
                score: priority_score(signal, weights),
                agent_id: signal.agent_id.clone(),
                instrument_id: signal.instrument_id.clone(),
            },
        );
    }
    let mut slots: Vec<Option<Signal>> = signals.into_iter().map(Some).collect();

    let mut ranked = Vec::with_capacity(slots.len());
    while let Some((index, _)) = queue.pop() {
        if let Some(signal) = slots[index].take() {
            ranked.push(signal);
        }
    }
    ranked
}
