mod audit;
mod order;
mod order_status;
mod order_type;
mod position;
mod quote;
mod side;
mod signal;
mod trade;

pub use audit::{AuditEvent, AuditRecord};
pub use order::{Order, OrderId, OrderRequest};
pub use order_status::OrderStatus;
pub use order_type::OrderType;
pub use position::{Position, PositionKey};
pub use quote::Quote;
pub use side::Side;
pub use signal::{ExitReason, Signal, SignalIntent};
pub use trade::{TradeId, TradeRecord};
