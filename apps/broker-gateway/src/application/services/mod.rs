//! Application services.

mod connections;
mod orders;
mod reconciler;

pub use connections::{ConnectRequest, ConnectionService};
pub use orders::{CancelOutcome, OrderRequest, OrderService};
pub use reconciler::ReconciliationScheduler;
