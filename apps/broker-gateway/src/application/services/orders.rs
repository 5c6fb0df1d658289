//! Caller-facing order submission and cancellation.

use std::sync::Arc;

use rust_decimal::Decimal;

use crate::application::ports::{
    AdapterFactory, BrokerApiError, ConnectionStore, OrderStore, OrderTicketRequest,
};
use crate::domain::order::{NewOrder, Order, OrderSide, OrderType};
use crate::error::GatewayError;

use super::reconciler::ReconciliationScheduler;

/// An order as a caller requests it.
#[derive(Debug, Clone)]
pub struct OrderRequest {
    /// Instrument symbol in the vendor's notation.
    pub symbol: String,
    /// Buy or sell.
    pub side: OrderSide,
    /// Execution type.
    pub order_type: OrderType,
    /// Requested quantity.
    pub quantity: Decimal,
    /// Limit price, required for limit and stop-limit orders.
    pub limit_price: Option<Decimal>,
    /// Stop price, required for stop and stop-limit orders.
    pub stop_price: Option<Decimal>,
}

impl OrderRequest {
    fn validate(&self) -> Result<(), GatewayError> {
        if self.symbol.trim().is_empty() {
            return Err(GatewayError::InvalidRequest("symbol is required".into()));
        }
        if self.quantity <= Decimal::ZERO {
            return Err(GatewayError::InvalidRequest(
                "quantity must be positive".into(),
            ));
        }
        if matches!(self.order_type, OrderType::Limit | OrderType::StopLimit)
            && self.limit_price.is_none()
        {
            return Err(GatewayError::InvalidRequest(format!(
                "{} orders require a limit price",
                self.order_type
            )));
        }
        if matches!(self.order_type, OrderType::Stop | OrderType::StopLimit)
            && self.stop_price.is_none()
        {
            return Err(GatewayError::InvalidRequest(format!(
                "{} orders require a stop price",
                self.order_type
            )));
        }
        Ok(())
    }
}

/// Outcome of a cancel request.
#[derive(Debug, Clone)]
pub struct CancelOutcome {
    /// Whether the vendor acknowledged the cancel. False means the order was
    /// already terminal at the vendor; the next poll lands its final state.
    pub canceled: bool,
    /// The order as stored after the attempt.
    pub order: Order,
}

/// Order submission, lookup, and cancellation against the owner's active
/// connection.
pub struct OrderService {
    factory: Arc<dyn AdapterFactory>,
    connections: Arc<dyn ConnectionStore>,
    orders: Arc<dyn OrderStore>,
    scheduler: ReconciliationScheduler,
}

impl OrderService {
    /// Create the service.
    pub fn new(
        factory: Arc<dyn AdapterFactory>,
        connections: Arc<dyn ConnectionStore>,
        orders: Arc<dyn OrderStore>,
        scheduler: ReconciliationScheduler,
    ) -> Self {
        Self {
            factory,
            connections,
            orders,
            scheduler,
        }
    }

    /// Submit an order through the owner's active connection.
    ///
    /// The most recently connected active connection is used when several
    /// exist. On success the order is persisted in `Submitted` state and
    /// registered for reconciliation.
    pub async fn submit(
        &self,
        owner_id: &str,
        request: OrderRequest,
    ) -> Result<Order, GatewayError> {
        request.validate()?;

        let connection = self
            .connections
            .active_for_owner(owner_id)
            .await?
            .into_iter()
            .next()
            .ok_or(GatewayError::NoActiveConnection)?;

        let adapter = self
            .factory
            .create_adapter(connection.vendor, &connection.credentials);

        let ticket = match adapter
            .submit_order(&OrderTicketRequest {
                symbol: request.symbol.clone(),
                side: request.side,
                order_type: request.order_type,
                quantity: request.quantity,
                limit_price: request.limit_price,
                stop_price: request.stop_price,
            })
            .await
        {
            Ok(ticket) => ticket,
            // A credential rejection means the connection is dead, not just
            // this order; retire it so later submits fail fast.
            Err(BrokerApiError::AuthRejected) => {
                tracing::warn!(
                    connection_id = %connection.id,
                    vendor = %connection.vendor,
                    "vendor rejected credentials; deactivating connection"
                );
                self.connections.deactivate(&connection.id).await?;
                return Err(GatewayError::InvalidCredentials);
            }
            Err(e) => return Err(e.into()),
        };

        let order = Order::new(NewOrder {
            owner_id: owner_id.to_string(),
            connection_id: connection.id.clone(),
            vendor_order_id: ticket.vendor_order_id,
            symbol: request.symbol,
            side: request.side,
            order_type: request.order_type,
            asset_class: connection.asset_class,
            quantity: request.quantity,
            limit_price: request.limit_price,
            stop_price: request.stop_price,
        });

        self.orders.insert(order.clone()).await?;
        self.scheduler.watch(&order.id);

        tracing::info!(
            order_id = %order.id,
            vendor = %connection.vendor,
            symbol = %order.symbol,
            side = %order.side,
            "order submitted"
        );

        Ok(order)
    }

    /// Cancel an order the owner holds.
    ///
    /// Ownership and state are checked before any vendor call: a terminal
    /// order is refused with `InvalidState` and never reaches the vendor.
    pub async fn cancel(
        &self,
        owner_id: &str,
        order_id: &str,
    ) -> Result<CancelOutcome, GatewayError> {
        let order = self
            .orders
            .get(order_id)
            .await?
            .ok_or_else(|| GatewayError::NotFound(format!("order {order_id}")))?;

        if order.owner_id != owner_id {
            return Err(GatewayError::Forbidden);
        }
        if order.status.is_terminal() {
            return Err(GatewayError::InvalidState(format!(
                "order is already {}",
                order.status
            )));
        }

        let connection = self
            .connections
            .get(&order.connection_id)
            .await?
            .ok_or_else(|| {
                GatewayError::Internal(format!("connection {} missing", order.connection_id))
            })?;

        let adapter = self
            .factory
            .create_adapter(connection.vendor, &connection.credentials);

        let acknowledged = adapter.cancel_order(&order.vendor_order_id).await?;

        if acknowledged {
            let updated = self.orders.mark_canceled(order_id).await?;
            self.scheduler.unwatch(order_id);
            tracing::info!(order_id, "order canceled");
            Ok(CancelOutcome {
                canceled: true,
                order: updated,
            })
        } else {
            // Already terminal at the vendor; reconciliation will land the
            // authoritative final state.
            tracing::info!(order_id, "vendor reported nothing to cancel");
            Ok(CancelOutcome {
                canceled: false,
                order,
            })
        }
    }

    /// Fetch an order the owner holds.
    pub async fn get(&self, owner_id: &str, order_id: &str) -> Result<Order, GatewayError> {
        let order = self
            .orders
            .get(order_id)
            .await?
            .ok_or_else(|| GatewayError::NotFound(format!("order {order_id}")))?;
        if order.owner_id != owner_id {
            return Err(GatewayError::Forbidden);
        }
        Ok(order)
    }

    /// All orders for an owner, newest first.
    pub async fn list(&self, owner_id: &str) -> Result<Vec<Order>, GatewayError> {
        Ok(self.orders.list_by_owner(owner_id).await?)
    }
}
