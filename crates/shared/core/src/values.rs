//! Value type aliases shared across the pipeline.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// A price expressed in the quote currency
pub type Price = Decimal;

/// A quantity of the traded instrument
pub type Quantity = Decimal;

/// All timestamps in the pipeline are UTC
pub type Timestamp = DateTime<Utc>;
