//! Persistence sink adapters
//!
//! [`MemorySink`] keeps the audit trail in memory for tests and
//! short-lived embedding; [`JsonlSink`] appends one JSON object per
//! line to a file and reloads it on recovery.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::sync::Mutex;

use meridian_core::AuditRecord;
use meridian_ports::{PersistenceError, PersistenceSink};

/// In-memory audit store
#[derive(Default)]
pub struct MemorySink {
    records: Mutex<Vec<AuditRecord>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records appended so far
    pub fn len(&self) -> usize {
        self.records.lock().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl PersistenceSink for MemorySink {
    fn append_audit(&self, record: &AuditRecord) -> Result<(), PersistenceError> {
        let mut records = self
            .records
            .lock()
            .map_err(|e| PersistenceError::AppendFailed(e.to_string()))?;
        records.push(record.clone());
        Ok(())
    }

    fn load_audit(&self) -> Result<Vec<AuditRecord>, PersistenceError> {
        let records = self
            .records
            .lock()
            .map_err(|e| PersistenceError::LoadFailed(e.to_string()))?;
        Ok(records.clone())
    }
}

/// JSON-lines file audit store
///
/// Appends are flushed per record; partial trailing lines (from a crash
/// mid-write) are skipped on load rather than failing recovery.
pub struct JsonlSink {
    path: PathBuf,
    file: Mutex<File>,
}

impl JsonlSink {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, PersistenceError> {
        let path = path.into();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)?;
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

impl PersistenceSink for JsonlSink {
    fn append_audit(&self, record: &AuditRecord) -> Result<(), PersistenceError> {
        let line = serde_json::to_string(record)
            .map_err(|e| PersistenceError::AppendFailed(e.to_string()))?;
        let mut file = self
            .file
            .lock()
            .map_err(|e| PersistenceError::AppendFailed(e.to_string()))?;
        writeln!(file, "{line}")?;
        file.flush()?;
        Ok(())
    }

    fn load_audit(&self) -> Result<Vec<AuditRecord>, PersistenceError> {
        let file = File::open(&self.path)?;
        let reader = BufReader::new(file);

        let mut records = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<AuditRecord>(&line) {
                Ok(record) => records.push(record),
                Err(e) => {
                    log::warn!("[sink] skipping unreadable audit line: {e}");
                }
            }
        }
        Ok(records)
    }
}
