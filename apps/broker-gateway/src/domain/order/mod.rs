//! Order records, status lifecycle, and transition rules.

mod order;
mod state_machine;
mod status;
mod types;

pub use order::{NewOrder, Order, OrderStatusUpdate};
pub use state_machine::{Transition, advance, cancel};
pub use status::OrderStatus;
pub use types::{OrderSide, OrderType};
