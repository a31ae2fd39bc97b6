use std::sync::Mutex;

use chrono::{DateTime, Duration};
use meridian_core::Timestamp;
use meridian_ports::Clock;

/// Manually driven clock for deterministic tests
///
/// Time only moves when `advance` or `set` is called, so rolling-window
/// checks and replays behave identically on every run.
pub struct ManualClock {
    now: Mutex<Timestamp>,
}

impl ManualClock {
    /// Create a clock frozen at the given time
    pub fn new(start: Timestamp) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    /// Create a clock frozen at the Unix epoch, useful for tests
    pub fn default_epoch() -> Self {
        Self::new(DateTime::UNIX_EPOCH)
    }

    /// Move time forward
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap();
        *now += by;
    }

    /// Jump to an absolute time
    pub fn set(&self, to: Timestamp) {
        let mut now = self.now.lock().unwrap();
        *now = to;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        *self.now.lock().unwrap()
    }

    fn name(&self) -> &str {
        "ManualClock"
    }
}
