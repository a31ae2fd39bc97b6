use crate::ranking::RankWeights;

/// Orchestrator tuning
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Weights for the merged signal ranking
    pub weights: RankWeights,
    /// System-wide cap on concurrently open positions
    pub max_concurrent_positions: usize,
    /// Bars of price history retained per instrument
    pub history_bars: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            weights: RankWeights::default(),
            max_concurrent_positions: 10,
            history_bars: 64,
        }
    }
}
