//! In-memory store implementations.
//!
//! Process-local stores behind the persistence ports. Suitable for tests and
//! single-node deployments; a durable backend slots in behind the same
//! traits. Writes are serialized per store by the lock, which is what keeps
//! racing reconciliation passes from corrupting a record.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::application::ports::{ConnectionStore, OrderStore, StoreError};
use crate::domain::broker::{AssetClass, BrokerConnection, Vendor};
use crate::domain::order::{Order, OrderStatusUpdate};

fn poisoned(_: impl std::fmt::Debug) -> StoreError {
    StoreError::Backend("store lock poisoned".to_string())
}

/// In-memory implementation of [`ConnectionStore`].
#[derive(Debug, Default)]
pub struct InMemoryConnectionStore {
    connections: RwLock<HashMap<String, BrokerConnection>>,
}

impl InMemoryConnectionStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored connections.
    #[must_use]
    pub fn len(&self) -> usize {
        self.connections.read().map(|m| m.len()).unwrap_or(0)
    }

    /// Whether the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ConnectionStore for InMemoryConnectionStore {
    async fn insert(&self, connection: BrokerConnection) -> Result<(), StoreError> {
        let mut connections = self.connections.write().map_err(poisoned)?;
        connections.insert(connection.id.clone(), connection);
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<BrokerConnection>, StoreError> {
        let connections = self.connections.read().map_err(poisoned)?;
        Ok(connections.get(id).cloned())
    }

    async fn list_by_owner(&self, owner_id: &str) -> Result<Vec<BrokerConnection>, StoreError> {
        let connections = self.connections.read().map_err(poisoned)?;
        let mut result: Vec<BrokerConnection> = connections
            .values()
            .filter(|c| c.owner_id == owner_id)
            .cloned()
            .collect();
        result.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(result)
    }

    async fn active_for_owner(&self, owner_id: &str) -> Result<Vec<BrokerConnection>, StoreError> {
        let connections = self.connections.read().map_err(poisoned)?;
        let mut result: Vec<BrokerConnection> = connections
            .values()
            .filter(|c| c.owner_id == owner_id && c.is_active)
            .cloned()
            .collect();
        result.sort_by(|a, b| b.last_connected_at.cmp(&a.last_connected_at));
        Ok(result)
    }

    async fn deactivate(&self, id: &str) -> Result<BrokerConnection, StoreError> {
        let mut connections = self.connections.write().map_err(poisoned)?;
        let connection = connections
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(format!("connection {id}")))?;
        connection.deactivate();
        Ok(connection.clone())
    }

    async fn deactivate_matching(
        &self,
        owner_id: &str,
        vendor: Vendor,
        asset_class: AssetClass,
    ) -> Result<usize, StoreError> {
        let mut connections = self.connections.write().map_err(poisoned)?;
        let mut count = 0;
        for connection in connections.values_mut() {
            if connection.is_active
                && connection.owner_id == owner_id
                && connection.vendor == vendor
                && connection.asset_class == asset_class
            {
                connection.deactivate();
                count += 1;
            }
        }
        Ok(count)
    }
}

/// In-memory implementation of [`OrderStore`].
#[derive(Debug, Default)]
pub struct InMemoryOrderStore {
    orders: RwLock<HashMap<String, Order>>,
}

impl InMemoryOrderStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored orders.
    #[must_use]
    pub fn len(&self) -> usize {
        self.orders.read().map(|m| m.len()).unwrap_or(0)
    }

    /// Whether the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn insert(&self, order: Order) -> Result<(), StoreError> {
        let mut orders = self.orders.write().map_err(poisoned)?;
        orders.insert(order.id.clone(), order);
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<Order>, StoreError> {
        let orders = self.orders.read().map_err(poisoned)?;
        Ok(orders.get(id).cloned())
    }

    async fn list_by_owner(&self, owner_id: &str) -> Result<Vec<Order>, StoreError> {
        let orders = self.orders.read().map_err(poisoned)?;
        let mut result: Vec<Order> = orders
            .values()
            .filter(|o| o.owner_id == owner_id)
            .cloned()
            .collect();
        result.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(result)
    }

    async fn list_open(&self) -> Result<Vec<Order>, StoreError> {
        let orders = self.orders.read().map_err(poisoned)?;
        Ok(orders
            .values()
            .filter(|o| !o.status.is_terminal())
            .cloned()
            .collect())
    }

    async fn apply_update(
        &self,
        id: &str,
        update: &OrderStatusUpdate,
    ) -> Result<Order, StoreError> {
        let mut orders = self.orders.write().map_err(poisoned)?;
        let order = orders
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(format!("order {id}")))?;
        order.record_update(update);
        Ok(order.clone())
    }

    async fn mark_canceled(&self, id: &str) -> Result<Order, StoreError> {
        let mut orders = self.orders.write().map_err(poisoned)?;
        let order = orders
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(format!("order {id}")))?;
        order.mark_canceled();
        Ok(order.clone())
    }
}
