use std::collections::HashMap;

use meridian_core::{AuditEvent, AuditRecord, InstrumentId, Position};

use crate::error::PersistenceError;

/// Port for the durable audit store
///
/// The order book appends every lifecycle event before reporting its
/// result (write-ahead), and reconstructs open positions and working
/// orders from `load_audit` after a restart.
pub trait PersistenceSink: Send + Sync {
    /// Append one record to the audit log
    fn append_audit(&self, record: &AuditRecord) -> Result<(), PersistenceError>;

    /// Load the full audit log in append order
    fn load_audit(&self) -> Result<Vec<AuditRecord>, PersistenceError>;

    /// Fold the log's fills into one agent's open positions
    ///
    /// Convenience for startup recovery; sinks with a faster index may
    /// override it.
    fn load_positions(&self, agent_id: &str) -> Result<Vec<Position>, PersistenceError> {
        let mut positions: HashMap<InstrumentId, Position> = HashMap::new();
        for record in self.load_audit()? {
            let AuditEvent::Fill { trade } = record.event else {
                continue;
            };
            if trade.agent_id != agent_id {
                continue;
            }
            let position = positions
                .entry(trade.instrument_id.clone())
                .or_insert_with(|| {
                    Position::new(agent_id, trade.instrument_id.clone(), record.recorded_at)
                });
            position.apply_fill(
                trade.side,
                trade.quantity,
                trade.price,
                trade.commission,
                record.recorded_at,
            );
        }
        Ok(positions.into_values().filter(|p| !p.is_flat()).collect())
    }
}
