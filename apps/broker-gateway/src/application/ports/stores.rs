//! Persistence ports for connections and orders.
//!
//! The gateway depends only on these narrow operations; all mutation goes
//! through them. Durable backends plug in behind the same traits.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::broker::{AssetClass, BrokerConnection, Vendor};
use crate::domain::order::{Order, OrderStatusUpdate};
use crate::error::GatewayError;

/// Errors from store operations.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// The referenced record does not exist.
    #[error("{0} not found")]
    NotFound(String),

    /// Backend failure.
    #[error("store backend error: {0}")]
    Backend(String),
}

impl From<StoreError> for GatewayError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(what) => Self::NotFound(what),
            StoreError::Backend(msg) => Self::Internal(msg),
        }
    }
}

/// Persistence port for broker connections.
#[async_trait]
pub trait ConnectionStore: Send + Sync {
    /// Insert a new connection.
    async fn insert(&self, connection: BrokerConnection) -> Result<(), StoreError>;

    /// Fetch a connection by id.
    async fn get(&self, id: &str) -> Result<Option<BrokerConnection>, StoreError>;

    /// All connections for an owner, active or not.
    async fn list_by_owner(&self, owner_id: &str) -> Result<Vec<BrokerConnection>, StoreError>;

    /// Active connections for an owner.
    async fn active_for_owner(&self, owner_id: &str) -> Result<Vec<BrokerConnection>, StoreError>;

    /// Deactivate a connection by id. Returns the updated record.
    async fn deactivate(&self, id: &str) -> Result<BrokerConnection, StoreError>;

    /// Deactivate any active connection for (owner, vendor, asset class).
    ///
    /// Keeps the one-active-connection-per-triple invariant when a user
    /// reconnects. Returns how many records were deactivated.
    async fn deactivate_matching(
        &self,
        owner_id: &str,
        vendor: Vendor,
        asset_class: AssetClass,
    ) -> Result<usize, StoreError>;
}

/// Persistence port for orders.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Insert a new order.
    async fn insert(&self, order: Order) -> Result<(), StoreError>;

    /// Fetch an order by id.
    async fn get(&self, id: &str) -> Result<Option<Order>, StoreError>;

    /// All orders for an owner, newest first.
    async fn list_by_owner(&self, owner_id: &str) -> Result<Vec<Order>, StoreError>;

    /// Every order not yet in a terminal state, across all owners.
    ///
    /// Drives the startup recovery sweep.
    async fn list_open(&self) -> Result<Vec<Order>, StoreError>;

    /// Apply one reconciliation poll atomically. Returns the updated order.
    ///
    /// Writes for the same order are serialized by the store, which keeps
    /// racing polls from corrupting the record.
    async fn apply_update(&self, id: &str, update: &OrderStatusUpdate)
    -> Result<Order, StoreError>;

    /// Mark an order canceled atomically. Returns the updated order.
    async fn mark_canceled(&self, id: &str) -> Result<Order, StoreError>;
}
